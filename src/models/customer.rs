// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Customer document and per-restaurant progress.

use super::{DocId, RewardRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A goal completed at a board position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGoal {
    pub goal_id: DocId,
    pub position: usize,
    pub date_completed: DateTime<Utc>,
}

/// A customer's progress at one restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub restaurant_id: DocId,
    #[serde(default)]
    pub completed_goals: Vec<CompletedGoal>,
    #[serde(default)]
    pub completed_rewards: Vec<RewardRecord>,
    /// Lines already rewarded in the current pass over the board
    #[serde(default)]
    pub earned_lines: Vec<usize>,
    /// Restaurant board generation the goals were recorded against
    #[serde(default)]
    pub board_generation: u64,
}

impl Progress {
    pub fn new(restaurant_id: DocId, board_generation: u64) -> Self {
        Self {
            restaurant_id,
            completed_goals: Vec::new(),
            completed_rewards: Vec::new(),
            earned_lines: Vec::new(),
            board_generation,
        }
    }

    /// Whether this progress predates the restaurant's current board.
    pub fn is_stale(&self, board_generation: u64) -> bool {
        self.board_generation < board_generation
    }

    pub fn has_goal(&self, goal_id: &DocId, position: usize) -> bool {
        self.completed_goals
            .iter()
            .any(|g| &g.goal_id == goal_id && g.position == position)
    }

    pub fn reward_index(&self, code: &str) -> Option<usize> {
        self.completed_rewards
            .iter()
            .position(|r| r.redemption_code == code)
    }
}

/// Customer account document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub username: String,
    #[serde(default)]
    pub progress: Vec<Progress>,
    /// Favourite restaurant ids
    #[serde(default)]
    pub favourite: Vec<DocId>,
}

impl Customer {
    pub fn new(username: &str) -> Self {
        Self {
            id: DocId::generate(),
            username: username.to_string(),
            progress: Vec::new(),
            favourite: Vec::new(),
        }
    }

    /// Progress entry for a restaurant, with its index in `progress`.
    pub fn progress_for(&self, restaurant_id: &DocId) -> Option<(usize, &Progress)> {
        self.progress
            .iter()
            .enumerate()
            .find(|(_, p)| &p.restaurant_id == restaurant_id)
    }
}
