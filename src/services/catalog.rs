// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal and reward catalog access.
//!
//! A restaurant can use its own custom entries plus the shared catalog.
//! Custom labels are unique across that combined list at insertion time.

use crate::db::{collections, encode, find_as, DocumentStore, Filter, StoreError, Update};
use crate::models::{Board, CatalogGoal, CatalogReward, DocId, Restaurant, RestaurantRef};
use crate::services::load_restaurant;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A catalog entry kind (goal or reward).
pub trait CatalogItem: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name used in log fields
    const KIND: &'static str;
    /// Collection holding the shared entries
    const SHARED_COLLECTION: &'static str;
    /// Restaurant field holding custom entries
    const CUSTOM_FIELD: &'static str;

    fn new(id: DocId, text: String) -> Self;
    fn id(&self) -> &DocId;
    fn text(&self) -> &str;
    fn custom(restaurant: &Restaurant) -> &[Self];
    /// References to entries of this kind on a board.
    fn board_refs(board: &Board) -> &[DocId];
}

impl CatalogItem for CatalogGoal {
    const KIND: &'static str = "goal";
    const SHARED_COLLECTION: &'static str = collections::GOALS;
    const CUSTOM_FIELD: &'static str = "goals";

    fn new(id: DocId, text: String) -> Self {
        CatalogGoal { id, goal: text }
    }
    fn id(&self) -> &DocId {
        &self.id
    }
    fn text(&self) -> &str {
        &self.goal
    }
    fn custom(restaurant: &Restaurant) -> &[Self] {
        &restaurant.goals
    }
    fn board_refs(board: &Board) -> &[DocId] {
        &board.board
    }
}

impl CatalogItem for CatalogReward {
    const KIND: &'static str = "reward";
    const SHARED_COLLECTION: &'static str = collections::REWARDS;
    const CUSTOM_FIELD: &'static str = "rewards";

    fn new(id: DocId, text: String) -> Self {
        CatalogReward { id, reward: text }
    }
    fn id(&self) -> &DocId {
        &self.id
    }
    fn text(&self) -> &str {
        &self.reward
    }
    fn custom(restaurant: &Restaurant) -> &[Self] {
        &restaurant.rewards
    }
    fn board_refs(board: &Board) -> &[DocId] {
        &board.board_reward
    }
}

/// Result of removing a custom catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    /// Referenced by the live board
    BlockedCurrent,
    /// Referenced by the upcoming board
    BlockedFuture,
    Failed,
}

/// Read access to shared + custom catalogs and custom-entry management.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Shared catalog entries. Empty on store failure.
    pub async fn shared<T: CatalogItem>(&self) -> Vec<T> {
        find_as(&*self.store, T::SHARED_COLLECTION, &Filter::new())
            .await
            .unwrap_or_else(|e| {
                tracing::error!(kind = T::KIND, error = %e, "Failed to load shared catalog");
                Vec::new()
            })
    }

    /// A restaurant's custom entries. Empty for unknown restaurants.
    pub async fn custom<T: CatalogItem>(&self, restaurant: RestaurantRef<'_>) -> Vec<T> {
        match load_restaurant(&*self.store, restaurant).await {
            Ok(Some(r)) => T::custom(&r).to_vec(),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(kind = T::KIND, error = %e, "Failed to load custom catalog");
                Vec::new()
            }
        }
    }

    /// Custom entries followed by the shared catalog.
    pub async fn entries<T: CatalogItem>(&self, restaurant: RestaurantRef<'_>) -> Vec<T> {
        let mut entries = self.custom::<T>(restaurant).await;
        entries.extend(self.shared::<T>().await);
        entries
    }

    /// Like [`entries`](Self::entries) for an already loaded restaurant.
    pub async fn entries_of<T: CatalogItem>(&self, restaurant: &Restaurant) -> Vec<T> {
        let mut entries = T::custom(restaurant).to_vec();
        entries.extend(self.shared::<T>().await);
        entries
    }

    pub async fn goals(&self, restaurant: RestaurantRef<'_>) -> Vec<CatalogGoal> {
        self.entries(restaurant).await
    }

    pub async fn rewards(&self, restaurant: RestaurantRef<'_>) -> Vec<CatalogReward> {
        self.entries(restaurant).await
    }

    /// Add a custom entry. Returns `false` if the label is already in use or the write fails.
    pub async fn add_custom<T: CatalogItem>(&self, owner: &str, text: &str) -> bool {
        match self.try_add_custom::<T>(owner, text).await {
            Ok(added) => added,
            Err(e) => {
                tracing::error!(kind = T::KIND, owner, error = %e, "Failed to add custom entry");
                false
            }
        }
    }

    async fn try_add_custom<T: CatalogItem>(
        &self,
        owner: &str,
        text: &str,
    ) -> Result<bool, StoreError> {
        let Some(restaurant) = load_restaurant(&*self.store, RestaurantRef::Username(owner)).await?
        else {
            tracing::warn!(kind = T::KIND, owner, "Restaurant not found");
            return Ok(false);
        };

        let existing = self.entries_of::<T>(&restaurant).await;
        if existing.iter().any(|e| e.text() == text) {
            tracing::debug!(kind = T::KIND, owner, "Catalog label already in use");
            return Ok(false);
        }

        let entry = T::new(DocId::generate(), text.to_string());
        let added = self
            .store
            .update_one(
                collections::RESTAURANT_USERS,
                &RestaurantRef::Id(&restaurant.id).filter(),
                &Update::new().push(T::CUSTOM_FIELD, encode(&entry)?),
            )
            .await?;

        if added {
            tracing::info!(kind = T::KIND, owner, id = %entry.id(), "Custom entry added");
        }
        Ok(added)
    }

    /// Remove a custom entry unless a board still references it.
    pub async fn remove_custom<T: CatalogItem>(&self, owner: &str, id: &DocId) -> RemovalOutcome {
        match self.try_remove_custom::<T>(owner, id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(kind = T::KIND, owner, error = %e, "Failed to remove custom entry");
                RemovalOutcome::Failed
            }
        }
    }

    async fn try_remove_custom<T: CatalogItem>(
        &self,
        owner: &str,
        id: &DocId,
    ) -> Result<RemovalOutcome, StoreError> {
        let Some(restaurant) = load_restaurant(&*self.store, RestaurantRef::Username(owner)).await?
        else {
            tracing::warn!(kind = T::KIND, owner, "Restaurant not found");
            return Ok(RemovalOutcome::Failed);
        };

        let referenced = |board: &Option<Board>| {
            board
                .as_ref()
                .is_some_and(|b| T::board_refs(b).contains(id))
        };
        if referenced(&restaurant.bingo_board) {
            return Ok(RemovalOutcome::BlockedCurrent);
        }
        if referenced(&restaurant.future_board) {
            return Ok(RemovalOutcome::BlockedFuture);
        }

        let by_id = Filter::new().eq("_id", id);
        let removed = self
            .store
            .update_one(
                collections::RESTAURANT_USERS,
                &RestaurantRef::Id(&restaurant.id)
                    .filter()
                    .elem_match(T::CUSTOM_FIELD, by_id.clone()),
                &Update::new().pull(T::CUSTOM_FIELD, by_id),
            )
            .await?;
        if !removed {
            tracing::warn!(kind = T::KIND, owner, id = %id, "Not a custom entry of this restaurant");
            return Ok(RemovalOutcome::Failed);
        }

        tracing::info!(kind = T::KIND, owner, id = %id, "Custom entry removed");
        Ok(RemovalOutcome::Removed)
    }

    pub async fn add_custom_goal(&self, owner: &str, text: &str) -> bool {
        self.add_custom::<CatalogGoal>(owner, text).await
    }

    pub async fn remove_custom_goal(&self, owner: &str, id: &DocId) -> RemovalOutcome {
        self.remove_custom::<CatalogGoal>(owner, id).await
    }

    pub async fn add_custom_reward(&self, owner: &str, text: &str) -> bool {
        self.add_custom::<CatalogReward>(owner, text).await
    }

    pub async fn remove_custom_reward(&self, owner: &str, id: &DocId) -> RemovalOutcome {
        self.remove_custom::<CatalogReward>(owner, id).await
    }

    /// Add an entry to the shared catalog.
    pub async fn add_shared<T: CatalogItem>(&self, text: &str) -> Result<DocId, StoreError> {
        let entry = T::new(DocId::generate(), text.to_string());
        let document = serde_json::to_value(&entry)
            .map_err(|e| StoreError::InsertFailure(e.to_string()))?;
        self.store
            .insert_one(T::SHARED_COLLECTION, document)
            .await?;
        Ok(entry.id().clone())
    }
}

/// Label for `id` in `entries`, if present.
pub fn text_for<'a, T: CatalogItem>(entries: &'a [T], id: &DocId) -> Option<&'a str> {
    entries.iter().find(|e| e.id() == id).map(|e| e.text())
}
