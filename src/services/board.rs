// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Board manager: the current/future board pair of each restaurant.
//!
//! A restaurant has up to two boards. `bingo_board` is live; `future_board`
//! takes over when the live board expires. Rotation is lazy: it runs when a
//! board is viewed, not on a schedule. Each rotation bumps the restaurant's
//! `board_generation`; customer progress from an older generation is reset.

use crate::db::{collections, encode, find_as, DocumentStore, Filter, StoreError, Update};
use crate::models::board::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::models::{
    Board, BoardGoal, BoardReward, CatalogGoal, CatalogReward, Customer, DocId, InvalidId,
    ResolvedBoard, Restaurant, RestaurantRef,
};
use crate::services::catalog::{text_for, CatalogItem, CatalogService};
use crate::services::load_restaurant;
use crate::services::progress::reset_stale_progress;
use crate::time_utils::parse_expiry_date;
use chrono::{DateTime, Duration, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

/// Maximum concurrent customer writes during rotation.
const MAX_CONCURRENT_RESETS: usize = 10;

/// Board submitted by an owner, with ids still in textual form.
#[derive(Debug, Clone)]
pub struct BoardDraft {
    pub name: String,
    pub size: usize,
    /// `MM/DD/YYYY`
    pub expiry_date: String,
    pub board: Vec<String>,
    pub board_reward: Vec<String>,
}

/// Reasons a board cannot be saved.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Restaurant not found")]
    RestaurantNotFound,

    #[error("Unsupported board size: {0}")]
    InvalidSize(usize),

    #[error("Expiry date must be MM/DD/YYYY, got {0:?}")]
    InvalidExpiry(String),

    #[error("Expected {expected} goals, got {actual}")]
    GoalCount { expected: usize, actual: usize },

    #[error("Expected {expected} rewards, got {actual}")]
    RewardCount { expected: usize, actual: usize },

    #[error(transparent)]
    InvalidId(#[from] InvalidId),

    #[error("Unknown goal: {0}")]
    UnknownGoal(DocId),

    #[error("Unknown reward: {0}")]
    UnknownReward(DocId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn DocumentStore>,
    catalog: CatalogService,
    extension: Duration,
}

impl BoardService {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: CatalogService, extension_days: i64) -> Self {
        Self {
            store,
            catalog,
            extension: Duration::days(extension_days),
        }
    }

    async fn restaurant(&self, restaurant: RestaurantRef<'_>) -> Option<Restaurant> {
        load_restaurant(&*self.store, restaurant)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to load restaurant");
                None
            })
    }

    /// Current board, or an empty size-4 board if none is set.
    pub async fn board(&self, restaurant: RestaurantRef<'_>) -> Board {
        self.restaurant(restaurant)
            .await
            .and_then(|r| r.bingo_board)
            .unwrap_or_default()
    }

    /// Future board, or an empty size-4 board if none is set.
    pub async fn future_board(&self, restaurant: RestaurantRef<'_>) -> Board {
        self.restaurant(restaurant)
            .await
            .and_then(|r| r.future_board)
            .unwrap_or_default()
    }

    /// Expiry of the current board.
    pub async fn current_expiry(&self, restaurant: RestaurantRef<'_>) -> Option<DateTime<Utc>> {
        self.restaurant(restaurant)
            .await
            .and_then(|r| r.bingo_board)
            .and_then(|b| b.expiry_date)
    }

    /// Save a board.
    ///
    /// The future slot is always replaced. A restaurant without a current
    /// board also gets the same board as current, and the future copy expires
    /// one extension period after it.
    pub async fn set_board(&self, owner: &str, draft: BoardDraft) -> Result<(), BoardError> {
        let restaurant = load_restaurant(&*self.store, RestaurantRef::Username(owner))
            .await?
            .ok_or(BoardError::RestaurantNotFound)?;

        let board = self.validate(&restaurant, draft).await?;
        let filter = RestaurantRef::Id(&restaurant.id).filter();

        if restaurant.bingo_board.is_none() {
            let mut future = board.clone();
            future.expiry_date = board.expiry_date.map(|e| e + self.extension);

            let first_save = self
                .store
                .update_one(
                    collections::RESTAURANT_USERS,
                    &filter.clone().exists("bingo_board", false),
                    &Update::new()
                        .set("bingo_board", encode(&board)?)
                        .set("future_board", encode(&future)?),
                )
                .await?;
            if first_save {
                tracing::info!(owner, name = %board.name, "First board saved as current and future");
                return Ok(());
            }
            // Another save created the current board first
        }

        self.store
            .update_one(
                collections::RESTAURANT_USERS,
                &filter,
                &Update::new().set("future_board", encode(&board)?),
            )
            .await?;

        tracing::info!(owner, name = %board.name, "Future board saved");
        Ok(())
    }

    async fn validate(&self, restaurant: &Restaurant, draft: BoardDraft) -> Result<Board, BoardError> {
        let size = draft.size;
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(BoardError::InvalidSize(size));
        }

        let expected = Board::cell_count(size);
        if draft.board.len() != expected {
            return Err(BoardError::GoalCount {
                expected,
                actual: draft.board.len(),
            });
        }
        let expected = Board::line_count(size);
        if draft.board_reward.len() != expected {
            return Err(BoardError::RewardCount {
                expected,
                actual: draft.board_reward.len(),
            });
        }

        let expiry_date = parse_expiry_date(&draft.expiry_date)
            .ok_or_else(|| BoardError::InvalidExpiry(draft.expiry_date.clone()))?;

        let board = parse_ids(&draft.board)?;
        let board_reward = parse_ids(&draft.board_reward)?;

        let goals = self.catalog.entries_of::<CatalogGoal>(restaurant).await;
        if let Some(id) = first_unknown(&board, &goals) {
            return Err(BoardError::UnknownGoal(id.clone()));
        }
        let rewards = self.catalog.entries_of::<CatalogReward>(restaurant).await;
        if let Some(id) = first_unknown(&board_reward, &rewards) {
            return Err(BoardError::UnknownReward(id.clone()));
        }

        Ok(Board {
            name: draft.name,
            size,
            board,
            board_reward,
            expiry_date: Some(expiry_date),
        })
    }

    /// Promote the future board if the current one has expired.
    ///
    /// Returns `true` if this call rotated the board.
    pub async fn rotate(&self, restaurant_id: &DocId) -> bool {
        self.rotate_at(restaurant_id, Utc::now()).await
    }

    /// [`rotate`](Self::rotate) the board of the restaurant owned by `owner`.
    pub async fn rotate_owned(&self, owner: &str) -> bool {
        let Some(restaurant) = self.restaurant(RestaurantRef::Username(owner)).await else {
            return false;
        };
        self.rotate(&restaurant.id).await
    }

    /// [`rotate`](Self::rotate) with an explicit clock.
    pub async fn rotate_at(&self, restaurant_id: &DocId, now: DateTime<Utc>) -> bool {
        match self.try_rotate(restaurant_id, now).await {
            Ok(rotated) => rotated,
            Err(e) => {
                tracing::error!(restaurant_id = %restaurant_id, error = %e, "Board rotation failed");
                false
            }
        }
    }

    async fn try_rotate(&self, restaurant_id: &DocId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(restaurant) = load_restaurant(&*self.store, RestaurantRef::Id(restaurant_id)).await?
        else {
            return Ok(false);
        };
        let Some(current) = restaurant.bingo_board else {
            return Ok(false);
        };
        let Some(current_expiry) = current.expiry_date else {
            return Ok(false);
        };
        if now < current_expiry {
            return Ok(false);
        }

        let mut promoted = restaurant.future_board.unwrap_or_else(|| current.clone());
        let promoted_expiry = match promoted.expiry_date {
            Some(expiry) if expiry > now => expiry,
            _ => now + self.extension,
        };
        promoted.expiry_date = Some(promoted_expiry);

        let mut next = promoted.clone();
        next.expiry_date = Some(promoted_expiry + self.extension);
        let generation = restaurant.board_generation + 1;

        // Only the viewer that still sees the expired board rotates it
        let rotated = self
            .store
            .update_one(
                collections::RESTAURANT_USERS,
                &RestaurantRef::Id(restaurant_id)
                    .filter()
                    .eq("bingo_board.expiry_date", encode(&current_expiry)?),
                &Update::new()
                    .set("bingo_board", encode(&promoted)?)
                    .set("future_board", encode(&next)?)
                    .set("board_generation", generation),
            )
            .await?;
        if !rotated {
            tracing::debug!(restaurant_id = %restaurant_id, "Board already rotated");
            return Ok(false);
        }

        tracing::info!(
            restaurant_id = %restaurant_id,
            expiry = %promoted_expiry,
            generation,
            "Board rotated"
        );

        // Progress missed here is reset when it is next read
        if let Err(e) = self.clear_customer_progress(restaurant_id, generation).await {
            tracing::error!(
                restaurant_id = %restaurant_id,
                error = %e,
                "Failed to clear customer progress after rotation"
            );
        }
        Ok(true)
    }

    /// Reset every customer's progress at a restaurant recorded against an
    /// earlier board generation.
    async fn clear_customer_progress(
        &self,
        restaurant_id: &DocId,
        generation: u64,
    ) -> Result<(), StoreError> {
        let customers: Vec<Customer> = find_as(
            &*self.store,
            collections::CUSTOMERS,
            &Filter::new().elem_match("progress", Filter::new().eq("restaurant_id", restaurant_id)),
        )
        .await?;

        let stale: Vec<Customer> = customers
            .into_iter()
            .filter(|c| {
                c.progress_for(restaurant_id)
                    .is_some_and(|(_, p)| p.is_stale(generation))
            })
            .collect();

        let store = &self.store;
        let results = stream::iter(stale)
            .map(|customer| async move {
                reset_stale_progress(&**store, &customer.username, restaurant_id, generation).await
            })
            .buffer_unordered(MAX_CONCURRENT_RESETS)
            .collect::<Vec<Result<bool, StoreError>>>()
            .await;

        let cleared = results
            .into_iter()
            .collect::<Result<Vec<bool>, StoreError>>()?
            .into_iter()
            .filter(|c| *c)
            .count();
        tracing::info!(restaurant_id = %restaurant_id, cleared, "Customer progress cleared");
        Ok(())
    }

    /// Current board with goal and reward labels.
    ///
    /// `include_custom` also resolves the restaurant's custom entries;
    /// otherwise only the shared catalog is used.
    pub async fn board_with_text(
        &self,
        restaurant: RestaurantRef<'_>,
        include_custom: bool,
    ) -> ResolvedBoard {
        let Some(r) = self.restaurant(restaurant).await else {
            return ResolvedBoard::default();
        };
        let board = r.bingo_board.clone().unwrap_or_default();
        self.resolve(&r, &board, include_custom).await
    }

    /// Future board with goal and reward labels.
    pub async fn future_board_with_text(
        &self,
        restaurant: RestaurantRef<'_>,
        include_custom: bool,
    ) -> ResolvedBoard {
        let Some(r) = self.restaurant(restaurant).await else {
            return ResolvedBoard::default();
        };
        let board = r.future_board.clone().unwrap_or_default();
        self.resolve(&r, &board, include_custom).await
    }

    async fn resolve(
        &self,
        restaurant: &Restaurant,
        board: &Board,
        include_custom: bool,
    ) -> ResolvedBoard {
        let (goals, rewards) = if include_custom {
            (
                self.catalog.entries_of::<CatalogGoal>(restaurant).await,
                self.catalog.entries_of::<CatalogReward>(restaurant).await,
            )
        } else {
            (
                self.catalog.shared::<CatalogGoal>().await,
                self.catalog.shared::<CatalogReward>().await,
            )
        };

        ResolvedBoard {
            name: board.name.clone(),
            size: board.size,
            expiry_date: board.expiry_date,
            board: board
                .board
                .iter()
                .map(|id| BoardGoal {
                    id: id.clone(),
                    goal: label(&goals, id, restaurant),
                    is_complete: false,
                    is_bingo: false,
                })
                .collect(),
            board_reward: board
                .board_reward
                .iter()
                .map(|id| BoardReward {
                    id: id.clone(),
                    reward: label(&rewards, id, restaurant),
                    is_earned: false,
                })
                .collect(),
        }
    }
}

fn parse_ids(raw: &[String]) -> Result<Vec<DocId>, InvalidId> {
    raw.iter().map(|id| DocId::parse(id)).collect()
}

fn first_unknown<'a, T: CatalogItem>(ids: &'a [DocId], entries: &[T]) -> Option<&'a DocId> {
    ids.iter().find(|id| text_for(entries, id).is_none())
}

/// Label for a board reference. Unresolved ids keep their slot with empty text.
fn label<T: CatalogItem>(entries: &[T], id: &DocId, restaurant: &Restaurant) -> String {
    match text_for(entries, id) {
        Some(text) => text.to_string(),
        None => {
            tracing::warn!(
                kind = T::KIND,
                id = %id,
                restaurant = %restaurant.username,
                "Board references unknown catalog entry"
            );
            String::new()
        }
    }
}
