// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Restaurant owner routes: boards, catalog, profile and code scanning.

use super::validated;
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::{
    CatalogGoal, CatalogReward, DocId, GoalCode, ResolvedBoard, RestaurantProfile, RestaurantRef,
    RewardCode,
};
use crate::services::{BoardDraft, BoardError, CatalogItem, RemovalOutcome, VerificationOutcome};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Owner routes (require identity).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/owner/register", post(register))
        .route("/api/owner/board", get(get_board).put(put_board))
        .route("/api/owner/board/future", get(get_future_board))
        .route("/api/owner/goals", get(list_goals).post(add_goal))
        .route("/api/owner/goals/{id}", delete(remove_goal))
        .route("/api/owner/rewards", get(list_rewards).post(add_reward))
        .route("/api/owner/rewards/{id}", delete(remove_reward))
        .route("/api/owner/profile", get(get_profile).put(put_profile))
        .route("/api/owner/verify/goal/preview", post(preview_goal))
        .route("/api/owner/verify/goal", post(verify_goal))
        .route("/api/owner/verify/reward", post(verify_reward))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
) -> Result<StatusCode> {
    state.profiles.register_restaurant(&owner.username).await?;
    Ok(StatusCode::CREATED)
}

// ─── Boards ──────────────────────────────────────────────────

/// The owner's current board. An expired board is rotated first.
async fn get_board(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
) -> Json<ResolvedBoard> {
    state.boards.rotate_owned(&owner.username).await;
    Json(
        state
            .boards
            .board_with_text(RestaurantRef::Username(&owner.username), true)
            .await,
    )
}

async fn get_future_board(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
) -> Json<ResolvedBoard> {
    state.boards.rotate_owned(&owner.username).await;
    Json(
        state
            .boards
            .future_board_with_text(RestaurantRef::Username(&owner.username), true)
            .await,
    )
}

/// Board save request.
#[derive(Debug, Deserialize, Validate)]
pub struct BoardRequest {
    #[validate(length(max = 100))]
    pub name: String,
    pub size: usize,
    /// `MM/DD/YYYY`
    #[validate(length(equal = 10))]
    pub expiry_date: String,
    pub board: Vec<String>,
    pub board_reward: Vec<String>,
}

async fn put_board(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<BoardRequest>,
) -> Result<StatusCode> {
    let body = validated(body)?;
    let draft = BoardDraft {
        name: body.name,
        size: body.size,
        expiry_date: body.expiry_date,
        board: body.board,
        board_reward: body.board_reward,
    };

    state
        .boards
        .set_board(&owner.username, draft)
        .await
        .map_err(|e| match e {
            BoardError::RestaurantNotFound => AppError::NotFound("Restaurant".to_string()),
            BoardError::Store(e) => e.into(),
            other => AppError::BadRequest(other.to_string()),
        })?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Catalog ─────────────────────────────────────────────────

/// New custom goal or reward.
#[derive(Debug, Deserialize, Validate)]
pub struct CatalogEntryRequest {
    #[validate(length(min = 1, max = 200))]
    pub text: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RemovalResponse {
    pub outcome: RemovalOutcome,
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
) -> Json<Vec<CatalogGoal>> {
    Json(
        state
            .catalog
            .goals(RestaurantRef::Username(&owner.username))
            .await,
    )
}

async fn list_rewards(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
) -> Json<Vec<CatalogReward>> {
    Json(
        state
            .catalog
            .rewards(RestaurantRef::Username(&owner.username))
            .await,
    )
}

async fn add_goal(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<CatalogEntryRequest>,
) -> Result<StatusCode> {
    add_entry::<CatalogGoal>(&state, &owner, body).await
}

async fn add_reward(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<CatalogEntryRequest>,
) -> Result<StatusCode> {
    add_entry::<CatalogReward>(&state, &owner, body).await
}

async fn add_entry<T: CatalogItem>(
    state: &AppState,
    owner: &Identity,
    body: CatalogEntryRequest,
) -> Result<StatusCode> {
    let body = validated(body)?;
    if state
        .catalog
        .add_custom::<T>(&owner.username, body.text.trim())
        .await
    {
        Ok(StatusCode::CREATED)
    } else {
        Err(AppError::Conflict(format!("Could not add {}", T::KIND)))
    }
}

async fn remove_goal(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RemovalResponse>)> {
    remove_entry::<CatalogGoal>(&state, &owner, &id).await
}

async fn remove_reward(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RemovalResponse>)> {
    remove_entry::<CatalogReward>(&state, &owner, &id).await
}

async fn remove_entry<T: CatalogItem>(
    state: &AppState,
    owner: &Identity,
    id: &str,
) -> Result<(StatusCode, Json<RemovalResponse>)> {
    let id = DocId::parse(id).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let outcome = state.catalog.remove_custom::<T>(&owner.username, &id).await;
    let status = match outcome {
        RemovalOutcome::Removed => StatusCode::OK,
        RemovalOutcome::BlockedCurrent | RemovalOutcome::BlockedFuture => StatusCode::CONFLICT,
        RemovalOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(RemovalResponse { outcome })))
}

// ─── Profile ─────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 30))]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
) -> Result<Json<RestaurantProfile>> {
    let profile = state
        .profiles
        .profile(RestaurantRef::Username(&owner.username))
        .await?;
    Ok(Json(profile))
}

async fn put_profile(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<ProfileRequest>,
) -> Result<StatusCode> {
    let body = validated(body)?;
    let profile = RestaurantProfile {
        name: body.name,
        description: body.description,
        category: body.category,
        phone_number: body.phone_number,
        is_public: body.is_public,
    };
    state
        .profiles
        .update_profile(&owner.username, &profile)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Scanning ────────────────────────────────────────────────

/// A scanned QR code payload.
#[derive(Debug, Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 512))]
    pub code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GoalPreviewResponse {
    pub goal: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VerificationResponse {
    pub outcome: VerificationOutcome,
}

async fn preview_goal(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<ScanRequest>,
) -> Result<Json<GoalPreviewResponse>> {
    let body = validated(body)?;
    let goal = state
        .verifier
        .goal_text_for_code(&owner.username, &body.code)
        .await;
    Ok(Json(GoalPreviewResponse { goal }))
}

async fn verify_goal(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<ScanRequest>,
) -> Result<Json<VerificationResponse>> {
    let body = validated(body)?;
    let outcome = match GoalCode::parse(&body.code) {
        Some(code) => {
            state
                .verifier
                .complete_goal(&owner.username, &code.customer, &code.goal_id, &code.position)
                .await
        }
        None => VerificationOutcome::InvalidCode,
    };
    Ok(Json(VerificationResponse { outcome }))
}

async fn verify_reward(
    State(state): State<Arc<AppState>>,
    Extension(owner): Extension<Identity>,
    Json(body): Json<ScanRequest>,
) -> Result<Json<VerificationResponse>> {
    let body = validated(body)?;
    let outcome = match RewardCode::customer(&body.code) {
        Some(customer) => {
            state
                .verifier
                .complete_reward(&owner.username, &customer, &body.code)
                .await
        }
        None => VerificationOutcome::InvalidCode,
    };
    Ok(Json(VerificationResponse { outcome }))
}
