// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Restaurant owner document and catalog entries.

use super::{Board, DocId};
use crate::db::Filter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A goal in the shared catalog or a restaurant's custom list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogGoal {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub goal: String,
}

/// A reward in the shared catalog or a restaurant's custom list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogReward {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub reward: String,
}

/// An issued reward, stored on both the restaurant and the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub redemption_code: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_redeemed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redemption_date: Option<DateTime<Utc>>,
}

impl RewardRecord {
    pub fn issued(redemption_code: String, text: String) -> Self {
        Self {
            redemption_code,
            text,
            is_redeemed: false,
            redemption_date: None,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.is_redeemed || self.redemption_date.is_some()
    }
}

/// Public-facing restaurant information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Restaurant owner account document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<RestaurantProfile>,
    /// Current (live) board
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bingo_board: Option<Board>,
    /// Board that replaces the current one on expiry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future_board: Option<Board>,
    /// Custom goals
    #[serde(default)]
    pub goals: Vec<CatalogGoal>,
    /// Custom rewards
    #[serde(default)]
    pub rewards: Vec<CatalogReward>,
    #[serde(default)]
    pub client_rewards: Vec<RewardRecord>,
    /// Number of times the future board has been promoted
    #[serde(default)]
    pub board_generation: u64,
}

impl Restaurant {
    pub fn new(username: &str) -> Self {
        Self {
            id: DocId::generate(),
            username: username.to_string(),
            profile: None,
            bingo_board: None,
            future_board: None,
            goals: Vec::new(),
            rewards: Vec::new(),
            client_rewards: Vec::new(),
            board_generation: 0,
        }
    }
}

/// How a restaurant is addressed: by its owner's username or by document id.
#[derive(Debug, Clone, Copy)]
pub enum RestaurantRef<'a> {
    Username(&'a str),
    Id(&'a DocId),
}

impl RestaurantRef<'_> {
    pub fn filter(&self) -> Filter {
        match self {
            RestaurantRef::Username(username) => Filter::new().eq("username", *username),
            RestaurantRef::Id(id) => Filter::new().eq(crate::db::ID_FIELD, *id),
        }
    }
}
