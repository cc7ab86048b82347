// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Bingo board model.
//!
//! A board of side `size` holds `size²` positional goal references and one
//! reward reference per line: rows, then columns, then the main and anti
//! diagonals (`2 * size + 2` entries).

use super::DocId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side length reported for a restaurant that has no board yet.
pub const DEFAULT_BOARD_SIZE: usize = 4;

/// Supported board side lengths.
pub const MIN_BOARD_SIZE: usize = 3;
pub const MAX_BOARD_SIZE: usize = 5;

fn default_size() -> usize {
    DEFAULT_BOARD_SIZE
}

/// Stored board: goal and reward references by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_size")]
    pub size: usize,
    /// Goal id per grid position (row-major)
    #[serde(default)]
    pub board: Vec<DocId>,
    /// Reward id per bingo line
    #[serde(default)]
    pub board_reward: Vec<DocId>,
    /// Last instant the board is valid
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: DEFAULT_BOARD_SIZE,
            board: Vec::new(),
            board_reward: Vec::new(),
            expiry_date: None,
        }
    }
}

impl Board {
    /// Number of bingo lines (and reward slots) for a board side.
    pub fn line_count(size: usize) -> usize {
        2 * size + 2
    }

    /// Number of grid positions for a board side.
    pub fn cell_count(size: usize) -> usize {
        size * size
    }

    pub fn goal_at(&self, position: usize) -> Option<&DocId> {
        self.board.get(position)
    }

    pub fn reward_for_line(&self, line: usize) -> Option<&DocId> {
        self.board_reward.get(line)
    }
}

/// A board goal resolved to its label, annotated with customer progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardGoal {
    pub id: DocId,
    pub goal: String,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub is_bingo: bool,
}

/// A line reward resolved to its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardReward {
    pub id: DocId,
    pub reward: String,
    #[serde(default)]
    pub is_earned: bool,
}

/// Board with goal and reward text, as served to views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBoard {
    pub name: String,
    pub size: usize,
    pub expiry_date: Option<DateTime<Utc>>,
    pub board: Vec<BoardGoal>,
    pub board_reward: Vec<BoardReward>,
}

impl Default for ResolvedBoard {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: DEFAULT_BOARD_SIZE,
            expiry_date: None,
            board: Vec::new(),
            board_reward: Vec::new(),
        }
    }
}
