// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Bingo Rewards: restaurant loyalty bingo boards.
//!
//! Restaurant owners build bingo boards out of goals and rewards. Customers
//! complete goals by having a QR code scanned, earn a reward for every row,
//! column or diagonal they finish, and redeem rewards with one-time codes.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{BoardService, CatalogService, ProfileService, ProgressTracker, Verifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub catalog: CatalogService,
    pub boards: BoardService,
    pub progress: ProgressTracker,
    pub verifier: Verifier,
    pub profiles: ProfileService,
}

impl AppState {
    /// Wire every service to one store.
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let catalog = CatalogService::new(store.clone());
        let boards = BoardService::new(store.clone(), catalog.clone(), config.board_extension_days);
        let progress = ProgressTracker::new(store.clone());
        let verifier = Verifier::new(store.clone(), catalog.clone(), &config);
        let profiles = ProfileService::new(store.clone());

        Self {
            config,
            store,
            catalog,
            boards,
            progress,
            verifier,
            profiles,
        }
    }
}
