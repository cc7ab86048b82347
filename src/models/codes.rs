// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! QR code payloads.
//!
//! Goal codes are `customer+goalId+position`; reward redemption codes are
//! `customer+rewardId+lineIndex+timestamp`.

use super::DocId;
use crate::time_utils::format_code_timestamp;
use chrono::{DateTime, Utc};
use std::fmt;

const SEPARATOR: char = '+';

/// A scanned goal code, split into its raw parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCode {
    pub customer: String,
    pub goal_id: String,
    pub position: String,
}

impl GoalCode {
    pub fn new(customer: &str, goal_id: &DocId, position: usize) -> Self {
        Self {
            customer: customer.to_string(),
            goal_id: goal_id.to_string(),
            position: position.to_string(),
        }
    }

    /// Split a scanned code. Returns `None` unless it has exactly three non-empty parts.
    pub fn parse(code: &str) -> Option<Self> {
        let parts: Vec<&str> = code.trim().split(SEPARATOR).collect();
        match parts.as_slice() {
            [customer, goal_id, position]
                if !customer.is_empty() && !goal_id.is_empty() && !position.is_empty() =>
            {
                Some(Self {
                    customer: customer.to_lowercase(),
                    goal_id: goal_id.to_string(),
                    position: position.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for GoalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.customer,
            self.goal_id,
            self.position,
            sep = SEPARATOR
        )
    }
}

/// Reward redemption codes.
pub struct RewardCode;

impl RewardCode {
    pub fn mint(customer: &str, reward_id: &DocId, line: usize, at: DateTime<Utc>) -> String {
        format!(
            "{customer}{sep}{reward_id}{sep}{line}{sep}{}",
            format_code_timestamp(at),
            sep = SEPARATOR
        )
    }

    /// Customer username encoded in a redemption code.
    pub fn customer(code: &str) -> Option<String> {
        let mut parts = code.trim().split(SEPARATOR);
        let customer = parts.next().filter(|c| !c.is_empty())?;
        (parts.count() == 3).then(|| customer.to_lowercase())
    }
}
