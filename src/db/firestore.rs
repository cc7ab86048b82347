// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Documents are stored under their `_id` field. Scalar equality conditions
//! are sent to Firestore; the rest of a filter is evaluated on the fetched
//! documents. A conditional update reads, checks and writes its document in
//! one Firestore transaction.

use super::{DocumentStore, Filter, StoreError, Update, ID_FIELD};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::{FirestoreConsistencySelector, FirestoreDb};
use serde_json::Value;

/// Attempts at a contended transaction before giving up.
const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// Firestore document store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<FirestoreDb>,
}

impl FirestoreStore {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::QueryFailure(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::QueryFailure(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline store for testing.
    ///
    /// All operations fail with the matching store error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Option<&FirestoreDb> {
        self.client.as_ref()
    }

    /// Documents that may match `filter`, with the full filter applied.
    ///
    /// An `_id` equality is a direct lookup; other scalar equalities become
    /// Firestore field filters.
    async fn candidates(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let client = self.get_client().ok_or_else(|| {
            StoreError::QueryFailure("Database not connected (offline mode)".to_string())
        })?;

        let by_id = filter
            .equalities()
            .find(|(path, _)| *path == ID_FIELD)
            .and_then(|(_, value)| value.as_str());
        if let Some(id) = by_id {
            let doc: Option<Value> = client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| StoreError::QueryFailure(e.to_string()))?;
            return Ok(doc.into_iter().filter(|d| filter.matches(d)).collect());
        }

        let equalities = server_equalities(filter);
        let query = client.fluent().select().from(collection);
        let query = if equalities.is_empty() {
            query
        } else {
            query.filter(move |q| {
                q.for_all(
                    equalities
                        .iter()
                        .map(|(path, value)| q.field(path).eq(value.clone())),
                )
            })
        };

        let docs: Vec<Value> = query
            .obj()
            .query()
            .await
            .map_err(|e| StoreError::QueryFailure(e.to_string()))?;
        Ok(docs.into_iter().filter(|doc| filter.matches(doc)).collect())
    }

    /// Apply `update` to one document if it still matches `filter`.
    ///
    /// The read registers the document with the transaction, so a concurrent
    /// writer (in this process or another) makes the commit fail and the
    /// check is repeated against fresh data.
    async fn update_document(
        &self,
        client: &FirestoreDb,
        collection: &str,
        id: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<bool, StoreError> {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let mut transaction = client.begin_transaction().await.map_err(|e| {
                StoreError::UpdateFailure(format!("Failed to begin transaction: {}", e))
            })?;

            let current: Option<Value> = client
                .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ))
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(id)
                .await
                .map_err(|e| {
                    StoreError::UpdateFailure(format!("Failed to read in transaction: {}", e))
                })?;

            let Some(mut doc) = current else {
                let _ = transaction.rollback().await;
                return Ok(false);
            };
            let Some(positional) = filter.evaluate(&doc) else {
                tracing::debug!(collection, id, "Document changed before update, no match");
                let _ = transaction.rollback().await;
                return Ok(false);
            };
            if let Err(e) = update.apply(&mut doc, positional) {
                let _ = transaction.rollback().await;
                return Err(StoreError::UpdateFailure(e));
            }

            client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(id)
                .object(&doc)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    StoreError::UpdateFailure(format!("Failed to add update to transaction: {}", e))
                })?;

            match transaction.commit().await {
                Ok(_) => return Ok(true),
                Err(FirestoreError::DatabaseError(ref e)) if e.retry_possible => {
                    tracing::warn!(collection, id, attempt, error = %e, "Transaction contended, retrying");
                }
                Err(e) => {
                    return Err(StoreError::UpdateFailure(format!(
                        "Transaction commit failed: {}",
                        e
                    )))
                }
            }
        }

        Err(StoreError::UpdateFailure(format!(
            "Update of {}/{} still contended after {} attempts",
            collection, id, MAX_TRANSACTION_ATTEMPTS
        )))
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
    ) -> Result<(), StoreError> {
        let client = self.get_client().ok_or_else(|| {
            StoreError::InsertFailure("Database not connected (offline mode)".to_string())
        })?;

        let _: () = client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(document)
            .execute()
            .await
            .map_err(|e| StoreError::InsertFailure(e.to_string()))?;
        Ok(())
    }
}

/// Equality conditions Firestore can evaluate as field filters.
///
/// Null (which also matches a missing field) and array index segments are
/// left to in-process evaluation.
fn server_equalities(filter: &Filter) -> Vec<(String, Value)> {
    filter
        .equalities()
        .filter(|(path, _)| !path.split('.').any(|s| s.parse::<usize>().is_ok()))
        .filter(|(_, value)| {
            matches!(value, Value::String(_) | Value::Bool(_) | Value::Number(_))
        })
        .map(|(path, value)| (path.to_string(), value.clone()))
        .collect()
}

fn document_id(doc: &Value) -> Option<String> {
    doc.get(ID_FIELD).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.candidates(collection, &filter.to_native()).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<bool, StoreError> {
        let client = self.get_client().ok_or_else(|| {
            StoreError::UpdateFailure("Database not connected (offline mode)".to_string())
        })?;
        let filter = filter.to_native();

        // Candidates are re-checked inside the transaction
        let candidates = self
            .candidates(collection, &filter)
            .await
            .map_err(|e| StoreError::UpdateFailure(e.to_string()))?;
        for id in candidates.iter().filter_map(document_id) {
            if self
                .update_document(client, collection, &id, &filter, update)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn insert_one(&self, collection: &str, mut document: Value) -> Result<(), StoreError> {
        let Some(fields) = document.as_object_mut() else {
            return Err(StoreError::InsertFailure(
                "Document must be a JSON object".to_string(),
            ));
        };
        let id = fields
            .entry(ID_FIELD)
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()))
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StoreError::InsertFailure("Document id must be a string".to_string()))?;

        self.write(collection, &id, &document).await
    }
}
