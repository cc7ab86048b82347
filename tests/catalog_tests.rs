// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog access: custom goals/rewards and removal guards.

use bingo_rewards::config::Config;
use bingo_rewards::models::{CatalogGoal, CatalogReward, DocId, RestaurantRef};
use bingo_rewards::services::RemovalOutcome;

mod common;
use common::{draft, seed_board, seed_restaurant, test_state, FAR_EXPIRY};

#[tokio::test]
async fn test_goals_list_custom_before_shared() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    common::seed_shared_goals(&state, "Shared", 2).await;

    assert!(state.catalog.add_custom_goal("owner", "Eat 3 desserts").await);

    let goals = state.catalog.goals(RestaurantRef::Username("owner")).await;
    let labels: Vec<&str> = goals.iter().map(|g| g.goal.as_str()).collect();
    assert_eq!(labels, vec!["Eat 3 desserts", "Shared 0", "Shared 1"]);
}

#[tokio::test]
async fn test_duplicate_custom_goal_rejected() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;

    assert!(state.catalog.add_custom_goal("owner", "Eat 3 desserts").await);
    assert!(!state.catalog.add_custom_goal("owner", "Eat 3 desserts").await);

    let custom = state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await;
    assert_eq!(custom.len(), 1);
}

#[tokio::test]
async fn test_custom_label_is_case_sensitive_and_checked_against_shared() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    common::seed_shared_goals(&state, "Shared", 1).await;

    assert!(!state.catalog.add_custom_goal("owner", "Shared 0").await);
    assert!(state.catalog.add_custom_goal("owner", "shared 0").await);
}

#[tokio::test]
async fn test_custom_entries_are_per_restaurant() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "first").await;
    seed_restaurant(&state, "second").await;

    assert!(state.catalog.add_custom_reward("first", "Free coffee").await);
    assert!(state.catalog.add_custom_reward("second", "Free coffee").await);

    let rewards = state
        .catalog
        .rewards(RestaurantRef::Username("second"))
        .await;
    assert_eq!(rewards.len(), 1);
}

#[tokio::test]
async fn test_unknown_owner() {
    let state = test_state(Config::default());

    assert!(!state.catalog.add_custom_goal("nobody", "Anything").await);
    assert_eq!(
        state
            .catalog
            .remove_custom_goal("nobody", &DocId::generate())
            .await,
        RemovalOutcome::Failed
    );
    assert!(state
        .catalog
        .goals(RestaurantRef::Username("nobody"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_remove_goal_on_current_board_is_blocked() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    assert!(state.catalog.add_custom_goal("owner", "Try the special").await);
    let custom = state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await;
    let goal_id = custom[0].id.clone();

    let rewards = common::seed_shared_rewards(&state, "Reward", 8).await;
    let mut goals = common::seed_shared_goals(&state, "Goal", 8).await;
    goals.push(goal_id.clone());
    state
        .boards
        .set_board("owner", draft("First", 3, FAR_EXPIRY, &goals, &rewards))
        .await
        .unwrap();

    let outcome = state.catalog.remove_custom_goal("owner", &goal_id).await;

    assert_eq!(outcome, RemovalOutcome::BlockedCurrent);
    let custom = state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await;
    assert_eq!(custom.len(), 1);
}

#[tokio::test]
async fn test_remove_goal_on_future_board_is_blocked() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let seeded = seed_board(&state, "owner", 3, FAR_EXPIRY).await;

    assert!(state.catalog.add_custom_goal("owner", "Bring a friend").await);
    let goal_id = state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await[0]
        .id
        .clone();

    let mut goals = seeded.goals[..8].to_vec();
    goals.push(goal_id.clone());
    state
        .boards
        .set_board("owner", draft("Next", 3, FAR_EXPIRY, &goals, &seeded.rewards))
        .await
        .unwrap();

    assert_eq!(
        state.catalog.remove_custom_goal("owner", &goal_id).await,
        RemovalOutcome::BlockedFuture
    );
}

#[tokio::test]
async fn test_remove_unused_custom_entries() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    seed_board(&state, "owner", 3, FAR_EXPIRY).await;

    assert!(state.catalog.add_custom_goal("owner", "Unused goal").await);
    assert!(state.catalog.add_custom_reward("owner", "Unused reward").await);
    let goal = state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await[0]
        .id
        .clone();
    let reward = state
        .catalog
        .custom::<CatalogReward>(RestaurantRef::Username("owner"))
        .await[0]
        .id
        .clone();

    assert_eq!(
        state.catalog.remove_custom_goal("owner", &goal).await,
        RemovalOutcome::Removed
    );
    assert_eq!(
        state.catalog.remove_custom_reward("owner", &reward).await,
        RemovalOutcome::Removed
    );
    assert!(state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await
        .is_empty());
    assert!(state
        .catalog
        .custom::<CatalogReward>(RestaurantRef::Username("owner"))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_remove_reward_on_current_board_is_blocked() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    assert!(state.catalog.add_custom_reward("owner", "Free fries").await);
    let reward_id = state
        .catalog
        .custom::<CatalogReward>(RestaurantRef::Username("owner"))
        .await[0]
        .id
        .clone();

    let goals = common::seed_shared_goals(&state, "Goal", 9).await;
    let mut rewards = common::seed_shared_rewards(&state, "Reward", 7).await;
    rewards.insert(0, reward_id.clone());
    state
        .boards
        .set_board("owner", draft("First", 3, FAR_EXPIRY, &goals, &rewards))
        .await
        .unwrap();

    assert_eq!(
        state.catalog.remove_custom_reward("owner", &reward_id).await,
        RemovalOutcome::BlockedCurrent
    );
}

#[tokio::test]
async fn test_remove_entry_not_in_custom_list_fails() {
    let state = test_state(Config::default());
    seed_restaurant(&state, "owner").await;
    let shared = common::seed_shared_goals(&state, "Shared", 1).await;
    assert!(state.catalog.add_custom_goal("owner", "Keep me").await);

    assert_eq!(
        state.catalog.remove_custom_goal("owner", &shared[0]).await,
        RemovalOutcome::Failed
    );
    assert_eq!(
        state
            .catalog
            .remove_custom_goal("owner", &DocId::generate())
            .await,
        RemovalOutcome::Failed
    );

    let custom = state
        .catalog
        .custom::<CatalogGoal>(RestaurantRef::Username("owner"))
        .await;
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].goal, "Keep me");
}
