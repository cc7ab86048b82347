// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (document store).
//!
//! Engine services talk to a [`DocumentStore`] trait object; the concrete
//! backend (in-memory or Firestore) is chosen at startup.

pub mod document;
pub mod firestore;
pub mod memory;

pub use document::{Condition, Filter, Update, UpdateOp};
pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Collection names as constants.
pub mod collections {
    pub const RESTAURANT_USERS: &str = "restaurant_users";
    pub const CUSTOMERS: &str = "customers";
    /// Shared goal catalog
    pub const GOALS: &str = "goals";
    /// Shared reward catalog
    pub const REWARDS: &str = "rewards";
}

/// Field holding a document's identifier.
pub const ID_FIELD: &str = "_id";

/// Store-level failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    QueryFailure(String),

    #[error("Update failed: {0}")]
    UpdateFailure(String),

    #[error("Insert failed: {0}")]
    InsertFailure(String),
}

/// Document collection abstraction used by every engine service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return all documents in `collection` matching `filter`.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    /// Apply `update` to the first document matching `filter`.
    ///
    /// Returns `true` if a document matched and was modified.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<bool, StoreError>;

    /// Insert a document. A missing `_id` is generated.
    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError>;
}

/// Rewrite every id-shaped string within a nested structure to the stored id form.
///
/// Stored ids are simple-format (unhyphenated, lowercase) UUIDs, so a caller
/// passing `"67E5504410B1426F9247BB680E5FE0C8"` or the hyphenated form still
/// matches.
pub fn to_native_id(value: &Value) -> Value {
    match value {
        Value::String(s) => match uuid::Uuid::try_parse(s) {
            Ok(id) => Value::String(id.simple().to_string()),
            Err(_) => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(to_native_id).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_native_id(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Encode a typed model as a document value for an update.
pub fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::UpdateFailure(format!("Failed to encode document: {}", e)))
}

/// Find documents and deserialize them into a typed model.
pub async fn find_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Vec<T>, StoreError> {
    store
        .find(collection, filter)
        .await?
        .into_iter()
        .map(|doc| {
            serde_json::from_value(doc).map_err(|e| {
                StoreError::QueryFailure(format!("Malformed document in {}: {}", collection, e))
            })
        })
        .collect()
}

/// Find the first document matching `filter` as a typed model.
pub async fn find_one_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    filter: &Filter,
) -> Result<Option<T>, StoreError> {
    Ok(find_as(store, collection, filter).await?.into_iter().next())
}
