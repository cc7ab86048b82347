// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use bingo_rewards::config::Config;
use bingo_rewards::db::{
    collections, find_one_as, DocumentStore, Filter, MemoryStore, StoreError, Update,
};
use bingo_rewards::models::{Board, CatalogGoal, CatalogReward, Customer, DocId, Restaurant};
use bingo_rewards::routes::create_router;
use bingo_rewards::services::BoardDraft;
use bingo_rewards::AppState;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Expiry far enough ahead that boards never rotate during a test.
#[allow(dead_code)]
pub const FAR_EXPIRY: &str = "12/31/2099";

/// Expiry already in the past.
#[allow(dead_code)]
pub const PAST_EXPIRY: &str = "01/01/2020";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create state backed by a fresh in-memory store.
#[allow(dead_code)]
pub fn test_state(config: Config) -> Arc<AppState> {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    Arc::new(AppState::new(config, store))
}

/// In-memory store that fails updates writing `path` in `collection` while
/// its failure budget lasts.
#[allow(dead_code)]
pub struct FaultyStore {
    inner: MemoryStore,
    collection: &'static str,
    path: &'static str,
    failures: AtomicUsize,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new(collection: &'static str, path: &'static str, failures: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            collection,
            path,
            failures: AtomicUsize::new(failures),
        }
    }

    pub fn set_failures(&self, failures: usize) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    fn should_fail(&self, collection: &str, update: &Update) -> bool {
        collection == self.collection
            && update.ops().iter().any(|op| op.path() == self.path)
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.inner.find(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<bool, StoreError> {
        if self.should_fail(collection, update) {
            return Err(StoreError::UpdateFailure("injected failure".to_string()));
        }
        self.inner.update_one(collection, filter, update).await
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        self.inner.insert_one(collection, document).await
    }
}

/// Create state backed by a [`FaultyStore`].
#[allow(dead_code)]
pub fn faulty_state(
    collection: &'static str,
    path: &'static str,
    failures: usize,
) -> (Arc<AppState>, Arc<FaultyStore>) {
    let faulty = Arc::new(FaultyStore::new(collection, path, failures));
    let store: Arc<dyn DocumentStore> = faulty.clone();
    (Arc::new(AppState::new(Config::default(), store)), faulty)
}

/// Create state with strict atomic writes enabled.
#[allow(dead_code)]
pub fn strict_state() -> Arc<AppState> {
    test_state(Config {
        strict_atomic_writes: true,
        ..Config::default()
    })
}

/// Create a test app with an in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(Config::default());
    (create_router(state.clone()), state)
}

/// Register a restaurant owner.
#[allow(dead_code)]
pub async fn seed_restaurant(state: &AppState, owner: &str) -> Restaurant {
    state
        .profiles
        .register_restaurant(owner)
        .await
        .expect("register restaurant")
}

/// Register a customer.
#[allow(dead_code)]
pub async fn seed_customer(state: &AppState, username: &str) -> Customer {
    state
        .profiles
        .register_customer(username)
        .await
        .expect("register customer")
}

/// Add `count` shared goals labelled `"{prefix} {i}"`.
#[allow(dead_code)]
pub async fn seed_shared_goals(state: &AppState, prefix: &str, count: usize) -> Vec<DocId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        ids.push(
            state
                .catalog
                .add_shared::<CatalogGoal>(&format!("{} {}", prefix, i))
                .await
                .expect("seed goal"),
        );
    }
    ids
}

/// Add `count` shared rewards labelled `"{prefix} {i}"`.
#[allow(dead_code)]
pub async fn seed_shared_rewards(state: &AppState, prefix: &str, count: usize) -> Vec<DocId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        ids.push(
            state
                .catalog
                .add_shared::<CatalogReward>(&format!("{} {}", prefix, i))
                .await
                .expect("seed reward"),
        );
    }
    ids
}

/// Build a board draft from ids.
#[allow(dead_code)]
pub fn draft(name: &str, size: usize, expiry: &str, goals: &[DocId], rewards: &[DocId]) -> BoardDraft {
    BoardDraft {
        name: name.to_string(),
        size,
        expiry_date: expiry.to_string(),
        board: goals.iter().map(|id| id.to_string()).collect(),
        board_reward: rewards.iter().map(|id| id.to_string()).collect(),
    }
}

/// Ids placed on a seeded board.
#[allow(dead_code)]
pub struct SeededBoard {
    pub goals: Vec<DocId>,
    pub rewards: Vec<DocId>,
}

/// Seed shared goals/rewards and save a board of `size` with distinct goals.
#[allow(dead_code)]
pub async fn seed_board(state: &AppState, owner: &str, size: usize, expiry: &str) -> SeededBoard {
    let goals = seed_shared_goals(state, "Goal", Board::cell_count(size)).await;
    let rewards = seed_shared_rewards(state, "Reward", Board::line_count(size)).await;
    state
        .boards
        .set_board(owner, draft("Seeded", size, expiry, &goals, &rewards))
        .await
        .expect("set board");
    SeededBoard { goals, rewards }
}

/// Read a restaurant document.
#[allow(dead_code)]
pub async fn restaurant_doc(state: &AppState, owner: &str) -> Restaurant {
    find_one_as(
        &*state.store,
        collections::RESTAURANT_USERS,
        &Filter::new().eq("username", owner),
    )
    .await
    .expect("query")
    .expect("restaurant exists")
}

/// Read a customer document.
#[allow(dead_code)]
pub async fn customer_doc(state: &AppState, username: &str) -> Customer {
    find_one_as(
        &*state.store,
        collections::CUSTOMERS,
        &Filter::new().eq("username", username),
    )
    .await
    .expect("query")
    .expect("customer exists")
}

/// Build a request with an identity header.
#[allow(dead_code)]
pub fn request_as(method: &str, uri: &str, user: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Bingo-User", user);
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
