// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod board;
pub mod codes;
pub mod customer;
pub mod ids;
pub mod restaurant;

pub use board::{Board, BoardGoal, BoardReward, ResolvedBoard};
pub use codes::{GoalCode, RewardCode};
pub use customer::{CompletedGoal, Customer, Progress};
pub use ids::{DocId, InvalidId};
pub use restaurant::{
    CatalogGoal, CatalogReward, Restaurant, RestaurantProfile, RestaurantRef, RewardRecord,
};
