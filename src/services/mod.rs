// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod board;
pub mod catalog;
pub mod profiles;
pub mod progress;
pub mod verification;

pub use board::{BoardDraft, BoardError, BoardService};
pub use catalog::{CatalogItem, CatalogService, RemovalOutcome};
pub use profiles::{ProfileService, PublicRestaurant, RewardEntry, RewardHistory};
pub use progress::ProgressTracker;
pub use verification::{VerificationOutcome, Verifier};

use crate::db::{collections, find_one_as, DocumentStore, Filter, StoreError};
use crate::models::{Customer, Restaurant, RestaurantRef};

/// Load a restaurant document.
pub(crate) async fn load_restaurant(
    store: &dyn DocumentStore,
    restaurant: RestaurantRef<'_>,
) -> Result<Option<Restaurant>, StoreError> {
    find_one_as(store, collections::RESTAURANT_USERS, &restaurant.filter()).await
}

/// Load a customer document by username.
pub(crate) async fn load_customer(
    store: &dyn DocumentStore,
    username: &str,
) -> Result<Option<Customer>, StoreError> {
    find_one_as(
        store,
        collections::CUSTOMERS,
        &Filter::new().eq("username", username),
    )
    .await
}
