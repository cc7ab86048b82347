// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Used for local development and tests. Each collection lives in one
//! `DashMap` entry; an update holds that entry while it matches and
//! modifies, so conditional updates never interleave.

use super::{DocumentStore, Filter, StoreError, Update, ID_FIELD};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

/// In-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let filter = filter.to_native();
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<bool, StoreError> {
        let filter = filter.to_native();
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return Ok(false);
        };

        let matched = docs
            .iter()
            .enumerate()
            .find_map(|(index, doc)| filter.evaluate(doc).map(|pos| (index, pos)));
        let Some((index, positional)) = matched else {
            return Ok(false);
        };

        let mut updated = docs[index].clone();
        update
            .apply(&mut updated, positional)
            .map_err(StoreError::UpdateFailure)?;
        docs[index] = updated;
        Ok(true)
    }

    async fn insert_one(&self, collection: &str, mut document: Value) -> Result<(), StoreError> {
        let Some(fields) = document.as_object_mut() else {
            return Err(StoreError::InsertFailure(
                "Document must be a JSON object".to_string(),
            ));
        };
        fields
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()));

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }
}
