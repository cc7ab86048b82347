// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customer routes: restaurant listing, boards with progress, favourites and rewards.

use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::{DocId, ResolvedBoard, RestaurantRef};
use crate::services::{PublicRestaurant, RewardHistory};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Customer routes (require identity).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/restaurants", get(list_restaurants))
        .route("/api/restaurants/{id}/board", get(get_board))
        .route("/api/restaurants/{id}/reset-board", post(reset_board))
        .route("/api/restaurants/{id}/favourite", post(toggle_favourite))
        .route("/api/favourites", get(list_favourites))
        .route("/api/rewards", get(list_rewards))
}

fn parse_restaurant_id(raw: &str) -> Result<DocId> {
    DocId::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Extension(customer): Extension<Identity>,
) -> Result<StatusCode> {
    state.profiles.register_customer(&customer.username).await?;
    Ok(StatusCode::CREATED)
}

async fn list_restaurants(State(state): State<Arc<AppState>>) -> Json<Vec<PublicRestaurant>> {
    Json(state.profiles.public_profiles().await)
}

/// Current board of a restaurant annotated with the caller's progress.
///
/// An expired board is rotated before it is served.
async fn get_board(
    State(state): State<Arc<AppState>>,
    Extension(customer): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<ResolvedBoard>> {
    let id = parse_restaurant_id(&id)?;
    if state.profiles.restaurant_name(&id).await.is_none() {
        return Err(AppError::NotFound(format!("Restaurant {}", id)));
    }

    state.boards.rotate(&id).await;
    let mut board = state
        .boards
        .board_with_text(RestaurantRef::Id(&id), true)
        .await;
    state
        .progress
        .set_board_progress(&mut board, &customer.username, &id)
        .await;
    Ok(Json(board))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ResetResponse {
    pub success: bool,
}

async fn reset_board(
    State(state): State<Arc<AppState>>,
    Extension(customer): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>> {
    let id = parse_restaurant_id(&id)?;
    let success = state
        .progress
        .reset_complete_board(&customer.username, &id)
        .await;
    Ok(Json(ResetResponse { success }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FavouriteResponse {
    pub favourite: bool,
}

async fn toggle_favourite(
    State(state): State<Arc<AppState>>,
    Extension(customer): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<FavouriteResponse>> {
    let id = parse_restaurant_id(&id)?;
    let favourite = state
        .profiles
        .toggle_favourite(&customer.username, &id)
        .await?;
    Ok(Json(FavouriteResponse { favourite }))
}

async fn list_favourites(
    State(state): State<Arc<AppState>>,
    Extension(customer): Extension<Identity>,
) -> Json<Vec<DocId>> {
    Json(state.profiles.favourites(&customer.username).await)
}

async fn list_rewards(
    State(state): State<Arc<AppState>>,
    Extension(customer): Extension<Identity>,
) -> Result<Json<RewardHistory>> {
    Ok(Json(state.profiles.reward_history(&customer.username).await?))
}
