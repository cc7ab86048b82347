// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Board manager: saving, rotation and label resolution.

use bingo_rewards::config::Config;
use bingo_rewards::db::collections;
use bingo_rewards::models::{DocId, RestaurantRef};
use bingo_rewards::services::{BoardError, VerificationOutcome};
use bingo_rewards::time_utils::parse_expiry_date;
use chrono::{Duration, Utc};

mod common;
use common::{
    customer_doc, draft, faulty_state, restaurant_doc, seed_board, seed_customer,
    seed_restaurant, test_state, FAR_EXPIRY, PAST_EXPIRY,
};

#[tokio::test]
async fn test_board_defaults_when_absent() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;

    for board in [
        state.boards.board(RestaurantRef::Username("owner")).await,
        state.boards.board(RestaurantRef::Username("missing")).await,
        state.boards.future_board(RestaurantRef::Username("owner")).await,
    ] {
        assert_eq!(board.name, "");
        assert_eq!(board.size, 4);
        assert!(board.board.is_empty());
        assert!(board.board_reward.is_empty());
        assert!(board.expiry_date.is_none());
    }
    assert!(state
        .boards
        .current_expiry(RestaurantRef::Username("owner"))
        .await
        .is_none());
}

#[tokio::test]
async fn test_first_board_sets_current_and_future() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let seeded = seed_board(&state, "owner", 3, "06/30/2030").await;

    let current = state.boards.board(RestaurantRef::Username("owner")).await;
    let future = state.boards.future_board(RestaurantRef::Username("owner")).await;

    let expiry = parse_expiry_date("06/30/2030").unwrap();
    assert_eq!(current.expiry_date, Some(expiry));
    assert_eq!(future.expiry_date, Some(expiry + Duration::days(90)));
    assert_eq!(current.board, seeded.goals);
    assert_eq!(future.board, seeded.goals);
    assert_eq!(current.board_reward, seeded.rewards);
    assert_eq!(
        state
            .boards
            .current_expiry(RestaurantRef::Username("owner"))
            .await,
        Some(expiry)
    );
}

#[tokio::test]
async fn test_later_save_only_replaces_future() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let seeded = seed_board(&state, "owner", 3, FAR_EXPIRY).await;
    let before = state.boards.board(RestaurantRef::Username("owner")).await;

    let mut goals = seeded.goals.clone();
    goals.reverse();
    state
        .boards
        .set_board("owner", draft("Autumn", 3, "10/01/2031", &goals, &seeded.rewards))
        .await
        .unwrap();

    let current = state.boards.board(RestaurantRef::Username("owner")).await;
    let future = state.boards.future_board(RestaurantRef::Username("owner")).await;
    assert_eq!(current, before);
    assert_eq!(future.name, "Autumn");
    assert_eq!(future.board, goals);
    assert_eq!(future.expiry_date, parse_expiry_date("10/01/2031"));
}

#[tokio::test]
async fn test_set_board_accepts_hyphenated_ids() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let goals = common::seed_shared_goals(&state, "Goal", 9).await;
    let rewards = common::seed_shared_rewards(&state, "Reward", 8).await;

    let mut board = draft("Hyphens", 3, FAR_EXPIRY, &goals, &rewards);
    board.board = goals
        .iter()
        .map(|id| uuid::Uuid::parse_str(id.as_str()).unwrap().hyphenated().to_string())
        .collect();
    state.boards.set_board("owner", board).await.unwrap();

    let current = state.boards.board(RestaurantRef::Username("owner")).await;
    assert_eq!(current.board, goals);
}

#[tokio::test]
async fn test_set_board_validation() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let goals = common::seed_shared_goals(&state, "Goal", 9).await;
    let rewards = common::seed_shared_rewards(&state, "Reward", 8).await;

    let err = state
        .boards
        .set_board("owner", draft("Tiny", 2, FAR_EXPIRY, &goals[..4], &rewards[..6]))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::InvalidSize(2)));

    let err = state
        .boards
        .set_board("owner", draft("Short", 3, FAR_EXPIRY, &goals[..8], &rewards))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::GoalCount { expected: 9, actual: 8 }));

    let err = state
        .boards
        .set_board("owner", draft("Short", 3, FAR_EXPIRY, &goals, &rewards[..7]))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::RewardCount { expected: 8, actual: 7 }));

    let err = state
        .boards
        .set_board("owner", draft("Date", 3, "2030-01-01", &goals, &rewards))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::InvalidExpiry(_)));

    let mut unknown = goals.clone();
    unknown[4] = DocId::generate();
    let err = state
        .boards
        .set_board("owner", draft("Unknown", 3, FAR_EXPIRY, &unknown, &rewards))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::UnknownGoal(_)));

    let err = state
        .boards
        .set_board("nobody", draft("Owner", 3, FAR_EXPIRY, &goals, &rewards))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::RestaurantNotFound));

    // Nothing was saved
    assert!(restaurant_doc(&state, "owner").await.bingo_board.is_none());
}

#[tokio::test]
async fn test_rotate_unexpired_board_is_noop() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_board(&state, "owner", 3, FAR_EXPIRY).await;
    let before = restaurant_doc(&state, "owner").await;

    assert!(!state.boards.rotate(&restaurant.id).await);
    assert_eq!(restaurant_doc(&state, "owner").await, before);
}

#[tokio::test]
async fn test_rotate_promotes_future_board() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    let seeded = seed_board(&state, "owner", 3, PAST_EXPIRY).await;

    let mut next_goals = seeded.goals.clone();
    next_goals.rotate_left(1);
    state
        .boards
        .set_board("owner", draft("Next", 3, "12/31/2098", &next_goals, &seeded.rewards))
        .await
        .unwrap();

    assert!(state.boards.rotate(&restaurant.id).await);

    let current = state.boards.board(RestaurantRef::Username("owner")).await;
    let future = state.boards.future_board(RestaurantRef::Username("owner")).await;
    let promoted_expiry = parse_expiry_date("12/31/2098").unwrap();
    assert_eq!(current.name, "Next");
    assert_eq!(current.board, next_goals);
    assert_eq!(current.expiry_date, Some(promoted_expiry));
    assert_eq!(future.board, next_goals);
    assert_eq!(future.expiry_date, Some(promoted_expiry + Duration::days(90)));
}

#[tokio::test]
async fn test_rotate_with_stale_future_extends_from_now() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_board(&state, "owner", 3, PAST_EXPIRY).await;
    let now = Utc::now();

    assert!(state.boards.rotate_at(&restaurant.id, now).await);

    let current = state.boards.board(RestaurantRef::Username("owner")).await;
    let future = state.boards.future_board(RestaurantRef::Username("owner")).await;
    assert_eq!(current.expiry_date, Some(now + Duration::days(90)));
    assert_eq!(future.expiry_date, Some(now + Duration::days(180)));
}

#[tokio::test]
async fn test_rotate_is_idempotent() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_board(&state, "owner", 3, PAST_EXPIRY).await;
    let now = Utc::now();

    assert!(state.boards.rotate_at(&restaurant.id, now).await);
    let after_first = restaurant_doc(&state, "owner").await;

    assert!(!state.boards.rotate_at(&restaurant.id, now).await);
    assert_eq!(restaurant_doc(&state, "owner").await, after_first);
}

#[tokio::test]
async fn test_rotate_clears_completed_goals_but_keeps_rewards() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_customer(&state, "alice").await;
    seed_customer(&state, "bob").await;
    let seeded = seed_board(&state, "owner", 3, PAST_EXPIRY).await;

    for position in 0..3 {
        let outcome = state
            .verifier
            .complete_goal(
                "owner",
                "alice",
                seeded.goals[position].as_str(),
                &position.to_string(),
            )
            .await;
        assert_eq!(outcome, VerificationOutcome::Completed);
    }
    let before = customer_doc(&state, "alice").await;
    assert_eq!(before.progress[0].completed_goals.len(), 3);
    assert_eq!(before.progress[0].completed_rewards.len(), 1);

    assert!(state.boards.rotate(&restaurant.id).await);

    let after = customer_doc(&state, "alice").await;
    assert!(after.progress[0].completed_goals.is_empty());
    assert!(after.progress[0].earned_lines.is_empty());
    assert_eq!(after.progress[0].completed_rewards, before.progress[0].completed_rewards);
    assert!(customer_doc(&state, "bob").await.progress.is_empty());
}

#[tokio::test]
async fn test_board_with_text_resolves_labels() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    let seeded = seed_board(&state, "owner", 3, FAR_EXPIRY).await;

    let by_name = state
        .boards
        .board_with_text(RestaurantRef::Username("owner"), true)
        .await;
    let by_id = state
        .boards
        .board_with_text(RestaurantRef::Id(&restaurant.id), true)
        .await;

    assert_eq!(by_name, by_id);
    assert_eq!(by_name.board.len(), 9);
    assert_eq!(by_name.board[4].id, seeded.goals[4]);
    assert_eq!(by_name.board[4].goal, "Goal 4");
    assert_eq!(by_name.board_reward[7].reward, "Reward 7");
    assert!(by_name.board.iter().all(|g| !g.is_complete && !g.is_bingo));
}

#[tokio::test]
async fn test_board_with_text_without_custom_keeps_positions() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    assert!(state.catalog.add_custom_goal("owner", "House special").await);
    let custom = state
        .catalog
        .custom::<bingo_rewards::models::CatalogGoal>(RestaurantRef::Username("owner"))
        .await;

    let mut goals = common::seed_shared_goals(&state, "Goal", 8).await;
    goals.insert(0, custom[0].id.clone());
    let rewards = common::seed_shared_rewards(&state, "Reward", 8).await;
    state
        .boards
        .set_board("owner", draft("Mixed", 3, FAR_EXPIRY, &goals, &rewards))
        .await
        .unwrap();

    let with_custom = state
        .boards
        .board_with_text(RestaurantRef::Username("owner"), true)
        .await;
    let shared_only = state
        .boards
        .board_with_text(RestaurantRef::Username("owner"), false)
        .await;

    assert_eq!(with_custom.board[0].goal, "House special");
    assert_eq!(shared_only.board.len(), 9);
    assert_eq!(shared_only.board[0].goal, "");
    assert_eq!(shared_only.board[1].goal, "Goal 0");
}

#[tokio::test]
async fn test_future_board_with_text() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let seeded = seed_board(&state, "owner", 4, FAR_EXPIRY).await;

    let future = state
        .boards
        .future_board_with_text(RestaurantRef::Username("owner"), true)
        .await;

    assert_eq!(future.size, 4);
    assert_eq!(future.board.len(), 16);
    assert_eq!(future.board_reward.len(), 10);
    assert_eq!(future.board[15].id, seeded.goals[15]);
}

async fn complete_row_zero(state: &bingo_rewards::AppState, goals: &[DocId]) {
    for position in 0..3 {
        let outcome = state
            .verifier
            .complete_goal("owner", "alice", goals[position].as_str(), &position.to_string())
            .await;
        assert_eq!(outcome, VerificationOutcome::Completed);
    }
}

#[tokio::test]
async fn test_rotation_bumps_board_generation() {
    let state = test_state(Config::default());
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_customer(&state, "alice").await;
    let seeded = seed_board(&state, "owner", 3, PAST_EXPIRY).await;
    complete_row_zero(&state, &seeded.goals).await;
    assert_eq!(customer_doc(&state, "alice").await.progress[0].board_generation, 0);

    assert!(state.boards.rotate(&restaurant.id).await);

    assert_eq!(restaurant_doc(&state, "owner").await.board_generation, 1);
    assert_eq!(customer_doc(&state, "alice").await.progress[0].board_generation, 1);
}

#[tokio::test]
async fn test_progress_left_by_failed_clear_is_reset_on_view() {
    let (state, store) =
        faulty_state(collections::CUSTOMERS, "progress.$.board_generation", usize::MAX);
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_customer(&state, "alice").await;
    let seeded = seed_board(&state, "owner", 3, PAST_EXPIRY).await;
    complete_row_zero(&state, &seeded.goals).await;

    // Promotion still commits when clearing fails
    assert!(state.boards.rotate(&restaurant.id).await);
    assert_eq!(restaurant_doc(&state, "owner").await.board_generation, 1);
    let stuck = customer_doc(&state, "alice").await;
    assert_eq!(stuck.progress[0].completed_goals.len(), 3);
    assert_eq!(stuck.progress[0].earned_lines, vec![0]);

    store.set_failures(0);
    let mut board = state
        .boards
        .board_with_text(RestaurantRef::Id(&restaurant.id), true)
        .await;
    state
        .progress
        .set_board_progress(&mut board, "alice", &restaurant.id)
        .await;

    assert!(board.board.iter().all(|g| !g.is_complete && !g.is_bingo));
    assert!(board.board_reward.iter().all(|r| !r.is_earned));
    let after = customer_doc(&state, "alice").await;
    assert!(after.progress[0].completed_goals.is_empty());
    assert!(after.progress[0].earned_lines.is_empty());
    assert_eq!(after.progress[0].board_generation, 1);
    assert_eq!(after.progress[0].completed_rewards.len(), 1);
}

#[tokio::test]
async fn test_scan_after_failed_clear_earns_line_on_new_board() {
    let (state, store) =
        faulty_state(collections::CUSTOMERS, "progress.$.board_generation", usize::MAX);
    let restaurant = seed_restaurant(&state, "owner").await;
    seed_customer(&state, "alice").await;
    let seeded = seed_board(&state, "owner", 3, PAST_EXPIRY).await;
    complete_row_zero(&state, &seeded.goals).await;

    assert!(state.boards.rotate(&restaurant.id).await);
    store.set_failures(0);

    // Same goals on the promoted board count as new completions
    complete_row_zero(&state, &seeded.goals).await;

    let after = customer_doc(&state, "alice").await;
    assert_eq!(after.progress[0].completed_goals.len(), 3);
    assert_eq!(after.progress[0].earned_lines, vec![0]);
    assert_eq!(after.progress[0].completed_rewards.len(), 2);
    assert_eq!(restaurant_doc(&state, "owner").await.client_rewards.len(), 2);
}
