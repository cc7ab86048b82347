// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customer progress against a board: completed cells and bingo lines.
//!
//! Line indices double as reward indices: rows `0..size`, columns
//! `size..2*size`, then the main diagonal (`2*size`) and the anti-diagonal
//! (`2*size + 1`).

use crate::db::{collections, document::Condition, DocumentStore, Filter, StoreError, Update};
use crate::models::{CompletedGoal, DocId, ResolvedBoard, RestaurantRef};
use crate::services::{load_customer, load_restaurant};
use std::collections::HashSet;
use std::sync::Arc;

/// Positions of every bingo line on a `size × size` board, indexed by line.
pub fn bingo_lines(size: usize) -> Vec<Vec<usize>> {
    let mut lines = Vec::with_capacity(2 * size + 2);
    for row in 0..size {
        lines.push((0..size).map(|c| row * size + c).collect());
    }
    for col in 0..size {
        lines.push((0..size).map(|r| r * size + col).collect());
    }
    lines.push((0..size).map(|i| i * (size + 1)).collect());
    lines.push((0..size).map(|i| (i + 1) * (size - 1)).collect());
    lines
}

/// Indices of lines whose positions are all completed.
pub fn completed_lines(size: usize, completed: &HashSet<usize>) -> Vec<usize> {
    if size == 0 {
        return Vec::new();
    }
    bingo_lines(size)
        .iter()
        .enumerate()
        .filter(|(_, line)| line.iter().all(|p| completed.contains(p)))
        .map(|(index, _)| index)
        .collect()
}

/// Positions whose recorded goal matches the goal currently at that position.
pub fn completed_positions(board: &[DocId], completed: &[CompletedGoal]) -> HashSet<usize> {
    completed
        .iter()
        .filter(|g| board.get(g.position) == Some(&g.goal_id))
        .map(|g| g.position)
        .collect()
}

/// Clear a customer's progress entry recorded against an earlier board.
///
/// The entry is moved to `board_generation` with no completed goals or
/// earned lines. Returns `true` if this call reset it.
pub(crate) async fn reset_stale_progress(
    store: &dyn DocumentStore,
    customer: &str,
    restaurant_id: &DocId,
    board_generation: u64,
) -> Result<bool, StoreError> {
    store
        .update_one(
            collections::CUSTOMERS,
            &Filter::new().eq("username", customer).elem_match(
                "progress",
                Filter::new()
                    .eq("restaurant_id", restaurant_id)
                    .not(Condition::Eq(
                        "board_generation".into(),
                        board_generation.into(),
                    )),
            ),
            &Update::new()
                .set("progress.$.completed_goals", serde_json::json!([]))
                .set("progress.$.earned_lines", serde_json::json!([]))
                .set("progress.$.board_generation", board_generation),
        )
        .await
}

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn DocumentStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Mark bingo cells and earned rewards on a resolved board.
    ///
    /// Returns the completed line indices.
    pub fn check_bingo(board: &mut ResolvedBoard, completed: &HashSet<usize>) -> Vec<usize> {
        let lines = completed_lines(board.size, completed);
        let all_lines = bingo_lines(board.size);

        for goal in board.board.iter_mut() {
            goal.is_bingo = false;
        }
        for reward in board.board_reward.iter_mut() {
            reward.is_earned = false;
        }

        for &line in &lines {
            for &position in &all_lines[line] {
                if let Some(goal) = board.board.get_mut(position) {
                    goal.is_bingo = true;
                }
            }
            if let Some(reward) = board.board_reward.get_mut(line) {
                reward.is_earned = true;
            }
        }
        lines
    }

    /// Annotate a resolved board with a customer's progress at a restaurant.
    ///
    /// Every flag is recomputed. A customer without progress gets a clean board,
    /// and progress left over from an earlier board is reset first.
    pub async fn set_board_progress(
        &self,
        board: &mut ResolvedBoard,
        customer: &str,
        restaurant_id: &DocId,
    ) {
        let completed_goals = match self.current_goals(customer, restaurant_id).await {
            Ok(goals) => goals,
            Err(e) => {
                tracing::error!(customer, error = %e, "Failed to load customer progress");
                Vec::new()
            }
        };

        let ids: Vec<DocId> = board.board.iter().map(|g| g.id.clone()).collect();
        let completed = completed_positions(&ids, &completed_goals);
        for (position, goal) in board.board.iter_mut().enumerate() {
            goal.is_complete = completed.contains(&position);
        }
        Self::check_bingo(board, &completed);
    }

    /// Completed goals that count against the restaurant's current board.
    async fn current_goals(
        &self,
        customer: &str,
        restaurant_id: &DocId,
    ) -> Result<Vec<CompletedGoal>, StoreError> {
        let Some(customer_doc) = load_customer(&*self.store, customer).await? else {
            return Ok(Vec::new());
        };
        let Some((_, progress)) = customer_doc.progress_for(restaurant_id) else {
            return Ok(Vec::new());
        };

        let generation = load_restaurant(&*self.store, RestaurantRef::Id(restaurant_id))
            .await?
            .map_or(0, |r| r.board_generation);
        if progress.is_stale(generation) {
            if reset_stale_progress(&*self.store, customer, restaurant_id, generation).await? {
                tracing::info!(customer, restaurant_id = %restaurant_id, "Stale progress reset");
            }
            return Ok(Vec::new());
        }
        Ok(progress.completed_goals.clone())
    }

    /// Clear a customer's completed goals at a restaurant, keeping reward history.
    pub async fn reset_complete_board(&self, customer: &str, restaurant_id: &DocId) -> bool {
        match self.try_reset(customer, restaurant_id).await {
            Ok(reset) => reset,
            Err(e) => {
                tracing::error!(customer, restaurant_id = %restaurant_id, error = %e, "Failed to reset board");
                false
            }
        }
    }

    async fn try_reset(&self, customer: &str, restaurant_id: &DocId) -> Result<bool, StoreError> {
        let reset = self
            .store
            .update_one(
                collections::CUSTOMERS,
                &Filter::new().eq("username", customer).elem_match(
                    "progress",
                    Filter::new().eq("restaurant_id", restaurant_id),
                ),
                &Update::new()
                    .set("progress.$.completed_goals", serde_json::json!([]))
                    .set("progress.$.earned_lines", serde_json::json!([])),
            )
            .await?;

        if reset {
            tracing::info!(customer, restaurant_id = %restaurant_id, "Board progress reset");
        }
        Ok(reset)
    }
}
