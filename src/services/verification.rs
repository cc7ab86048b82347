// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Goal verification and reward redemption.
//!
//! An owner scans a customer's goal code to record a completed goal. A goal
//! that closes a bingo line mints a reward redemption code, stored both on the
//! restaurant (`client_rewards`) and on the customer's progress. Scanning a
//! redemption code later marks both copies redeemed.
//!
//! With strict writes enabled, every write is conditional on the state that
//! was checked, and a lost race is retried from a fresh read.

use crate::config::Config;
use crate::db::{collections, document::Condition, encode, DocumentStore, Filter, StoreError, Update};
use crate::models::{
    Board, CatalogGoal, CatalogReward, CompletedGoal, DocId, GoalCode, Progress, Restaurant,
    RestaurantRef, RewardCode, RewardRecord,
};
use crate::services::catalog::{text_for, CatalogService};
use crate::services::progress::{
    bingo_lines, completed_lines, completed_positions, reset_stale_progress,
};
use crate::services::{load_customer, load_restaurant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Result of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    Completed,
    AlreadyCompleted,
    AlreadyRedeemed,
    InvalidCode,
    /// Store failure or unknown restaurant
    Failed,
}

#[derive(Clone)]
pub struct Verifier {
    store: Arc<dyn DocumentStore>,
    catalog: CatalogService,
    strict: bool,
    retry_limit: u32,
}

/// Outcome of one attempt at a conditional write.
enum Attempt {
    Done(VerificationOutcome),
    /// A guarded write matched nothing
    Conflict,
}

/// Parse a board position: one or two ASCII digits.
fn parse_position(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl Verifier {
    pub fn new(store: Arc<dyn DocumentStore>, catalog: CatalogService, config: &Config) -> Self {
        Self {
            store,
            catalog,
            strict: config.strict_atomic_writes,
            retry_limit: config.write_retry_limit,
        }
    }

    /// Run `attempt` until it completes, retrying conflicts in strict mode.
    async fn with_retries<F, Fut>(&self, operation: &str, attempt: F) -> VerificationOutcome
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Attempt, StoreError>>,
    {
        let attempts = if self.strict { self.retry_limit + 1 } else { 1 };
        for n in 1..=attempts {
            match attempt().await {
                Ok(Attempt::Done(outcome)) => return outcome,
                Ok(Attempt::Conflict) => {
                    tracing::debug!(operation, attempt = n, "Conditional write lost a race");
                }
                Err(e) => {
                    tracing::error!(operation, error = %e, "Verification failed");
                    return VerificationOutcome::Failed;
                }
            }
        }
        tracing::warn!(operation, attempts, "Giving up after repeated write conflicts");
        VerificationOutcome::Failed
    }

    /// Record a completed goal at a board position for a customer.
    pub async fn complete_goal(
        &self,
        owner: &str,
        customer: &str,
        goal_id: &str,
        position: &str,
    ) -> VerificationOutcome {
        let outcome = self
            .with_retries("complete_goal", || {
                self.try_complete_goal(owner, customer, goal_id, position)
            })
            .await;
        tracing::info!(owner, customer, goal_id, position, ?outcome, "Goal scan");
        outcome
    }

    async fn try_complete_goal(
        &self,
        owner: &str,
        customer: &str,
        goal_id: &str,
        position: &str,
    ) -> Result<Attempt, StoreError> {
        let Some(restaurant) = load_restaurant(&*self.store, RestaurantRef::Username(owner)).await?
        else {
            tracing::warn!(owner, "Restaurant not found");
            return Ok(Attempt::Done(VerificationOutcome::Failed));
        };
        let Some(board) = restaurant.bingo_board.as_ref() else {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        };
        let (Ok(goal_id), Some(position)) = (DocId::parse(goal_id), parse_position(position))
        else {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        };
        let Some(mut customer_doc) = load_customer(&*self.store, customer).await? else {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        };

        let generation = restaurant.board_generation;
        if customer_doc
            .progress_for(&restaurant.id)
            .is_some_and(|(_, p)| p.is_stale(generation))
        {
            reset_stale_progress(&*self.store, customer, &restaurant.id, generation).await?;
            let Some(fresh) = load_customer(&*self.store, customer).await? else {
                return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
            };
            customer_doc = fresh;
        }

        let progress = customer_doc.progress_for(&restaurant.id).map(|(_, p)| p);
        if progress.is_some_and(|p| p.has_goal(&goal_id, position)) {
            // An earlier scan of this cell may have stopped short of its rewards
            self.settle_rewards(&restaurant, board, customer, position)
                .await;
            return Ok(Attempt::Done(VerificationOutcome::AlreadyCompleted));
        }
        if position >= Board::cell_count(board.size) || board.goal_at(position) != Some(&goal_id) {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        }

        let completed = CompletedGoal {
            goal_id: goal_id.clone(),
            position,
            date_completed: Utc::now(),
        };
        let in_restaurant = Filter::new().eq("restaurant_id", &restaurant.id);
        let by_customer = Filter::new().eq("username", customer);

        let written = if progress.is_some() {
            let mut entry = in_restaurant;
            if self.strict {
                entry = entry.not(Condition::ElemMatch(
                    "completed_goals".into(),
                    Filter::new()
                        .eq("goal_id", &goal_id)
                        .eq("position", position),
                ));
            }
            self.store
                .update_one(
                    collections::CUSTOMERS,
                    &by_customer.elem_match("progress", entry),
                    &Update::new().push("progress.$.completed_goals", encode(&completed)?),
                )
                .await?
        } else {
            let mut filter = by_customer;
            if self.strict {
                filter = filter.not(Condition::ElemMatch("progress".into(), in_restaurant));
            }
            let mut entry = Progress::new(restaurant.id.clone(), generation);
            entry.completed_goals.push(completed);
            self.store
                .update_one(
                    collections::CUSTOMERS,
                    &filter,
                    &Update::new().push("progress", encode(&entry)?),
                )
                .await?
        };

        if !written {
            return Ok(if self.strict {
                Attempt::Conflict
            } else {
                Attempt::Done(VerificationOutcome::Failed)
            });
        }

        // The goal is recorded; a failed issuance is picked up by a rescan
        self.settle_rewards(&restaurant, board, customer, position)
            .await;
        Ok(Attempt::Done(VerificationOutcome::Completed))
    }

    async fn settle_rewards(
        &self,
        restaurant: &Restaurant,
        board: &Board,
        customer: &str,
        position: usize,
    ) {
        if let Err(e) = self
            .issue_closed_lines(restaurant, board, customer, position)
            .await
        {
            tracing::error!(
                restaurant = %restaurant.username,
                customer,
                position,
                error = %e,
                "Reward issuance incomplete"
            );
        }
    }

    /// Issue rewards for lines through `position` that are now complete.
    async fn issue_closed_lines(
        &self,
        restaurant: &Restaurant,
        board: &Board,
        customer: &str,
        position: usize,
    ) -> Result<(), StoreError> {
        let Some(customer_doc) = load_customer(&*self.store, customer).await? else {
            return Ok(());
        };
        let Some((_, progress)) = customer_doc.progress_for(&restaurant.id) else {
            return Ok(());
        };

        for record in &progress.completed_rewards {
            let recorded = restaurant
                .client_rewards
                .iter()
                .any(|r| r.redemption_code == record.redemption_code);
            if !recorded {
                tracing::warn!(customer, "Restoring reward missing from restaurant records");
                self.push_restaurant_copy(&restaurant.id, record).await?;
            }
        }

        let completed = completed_positions(&board.board, &progress.completed_goals);
        let lines = bingo_lines(board.size);
        for line in completed_lines(board.size, &completed) {
            if !lines[line].contains(&position) || progress.earned_lines.contains(&line) {
                continue;
            }
            self.issue_line(restaurant, board, customer, line).await?;
        }
        Ok(())
    }

    /// Mint a redemption code for a bingo line of the owner's current board.
    ///
    /// Returns `None` if the line was already rewarded in this pass over the
    /// board, or the reward cannot be issued.
    pub async fn issue_reward_code(&self, owner: &str, customer: &str, line: usize) -> Option<String> {
        let result = async {
            let Some(restaurant) =
                load_restaurant(&*self.store, RestaurantRef::Username(owner)).await?
            else {
                return Ok(None);
            };
            let Some(board) = restaurant.bingo_board.as_ref() else {
                return Ok(None);
            };
            self.issue_line(&restaurant, board, customer, line).await
        }
        .await;

        result.unwrap_or_else(|e: StoreError| {
            tracing::error!(owner, customer, line, error = %e, "Failed to issue reward");
            None
        })
    }

    async fn issue_line(
        &self,
        restaurant: &Restaurant,
        board: &Board,
        customer: &str,
        line: usize,
    ) -> Result<Option<String>, StoreError> {
        let Some(reward_id) = board.reward_for_line(line) else {
            tracing::warn!(restaurant = %restaurant.username, line, "No reward for line");
            return Ok(None);
        };
        let rewards = self.catalog.entries_of::<CatalogReward>(restaurant).await;
        let text = text_for(&rewards, reward_id).unwrap_or_else(|| {
            tracing::warn!(reward_id = %reward_id, "Issuing reward with unknown label");
            ""
        });

        let code = RewardCode::mint(customer, reward_id, line, Utc::now());
        let record = RewardRecord::issued(code.clone(), text.to_string());

        // The customer write claims the line; a line already claimed is skipped
        let claimed = self
            .store
            .update_one(
                collections::CUSTOMERS,
                &Filter::new().eq("username", customer).elem_match(
                    "progress",
                    Filter::new()
                        .eq("restaurant_id", &restaurant.id)
                        .not(Condition::Contains("earned_lines".into(), line.into())),
                ),
                &Update::new()
                    .push("progress.$.earned_lines", line)
                    .push("progress.$.completed_rewards", encode(&record)?),
            )
            .await?;
        if !claimed {
            tracing::debug!(customer, line, "Line already rewarded");
            return Ok(None);
        }

        self.push_restaurant_copy(&restaurant.id, &record).await?;

        tracing::info!(restaurant = %restaurant.username, customer, line, "Reward issued");
        Ok(Some(code))
    }

    /// Add a reward record to the restaurant's `client_rewards` unless it is
    /// already there. Store errors are retried up to the retry limit.
    async fn push_restaurant_copy(
        &self,
        restaurant_id: &DocId,
        record: &RewardRecord,
    ) -> Result<(), StoreError> {
        let filter = RestaurantRef::Id(restaurant_id).filter().not(Condition::ElemMatch(
            "client_rewards".into(),
            Filter::new().eq("redemption_code", record.redemption_code.as_str()),
        ));
        let update = Update::new().push("client_rewards", encode(record)?);

        let attempts = self.retry_limit + 1;
        let mut attempt = 1;
        loop {
            match self
                .store
                .update_one(collections::RESTAURANT_USERS, &filter, &update)
                .await
            {
                Ok(_) => return Ok(()),
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, error = %e, "Retrying restaurant reward copy");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Redeem a reward code presented by a customer.
    pub async fn complete_reward(&self, owner: &str, customer: &str, code: &str) -> VerificationOutcome {
        let outcome = self
            .with_retries("complete_reward", || self.try_complete_reward(owner, customer, code))
            .await;
        tracing::info!(owner, customer, ?outcome, "Reward scan");
        outcome
    }

    async fn try_complete_reward(
        &self,
        owner: &str,
        customer: &str,
        code: &str,
    ) -> Result<Attempt, StoreError> {
        let code = code.trim();
        let Some(restaurant) = load_restaurant(&*self.store, RestaurantRef::Username(owner)).await?
        else {
            tracing::warn!(owner, "Restaurant not found");
            return Ok(Attempt::Done(VerificationOutcome::Failed));
        };
        if RewardCode::customer(code).as_deref() != Some(customer) {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        }
        let Some(customer_doc) = load_customer(&*self.store, customer).await? else {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        };
        let Some((pi, progress)) = customer_doc.progress_for(&restaurant.id) else {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        };
        let Some(ri) = progress.reward_index(code) else {
            return Ok(Attempt::Done(VerificationOutcome::InvalidCode));
        };
        if progress.completed_rewards[ri].is_spent() {
            return Ok(Attempt::Done(VerificationOutcome::AlreadyRedeemed));
        }

        let now = Utc::now();
        let path = format!("progress.{pi}.completed_rewards.{ri}");
        let mut filter = Filter::new()
            .eq("username", customer)
            .eq(format!("{path}.redemption_code"), code);
        if self.strict {
            filter = filter
                .eq(format!("{path}.is_redeemed"), false)
                .exists(format!("{path}.redemption_date"), false);
        }

        let written = self
            .store
            .update_one(
                collections::CUSTOMERS,
                &filter,
                &redeem(&format!("{path}."), now)?,
            )
            .await?;
        if !written {
            return Ok(if self.strict {
                Attempt::Conflict
            } else {
                Attempt::Done(VerificationOutcome::Failed)
            });
        }

        let restaurant_copy = self
            .store
            .update_one(
                collections::RESTAURANT_USERS,
                &RestaurantRef::Id(&restaurant.id)
                    .filter()
                    .elem_match("client_rewards", Filter::new().eq("redemption_code", code)),
                &redeem("client_rewards.$.", now)?,
            )
            .await?;
        if !restaurant_copy {
            tracing::warn!(owner, customer, "Redeemed reward missing from restaurant records");
        }

        Ok(Attempt::Done(VerificationOutcome::Completed))
    }

    /// Goal label a scanned goal code refers to on the owner's current board.
    pub async fn goal_text_for_code(&self, owner: &str, code: &str) -> Option<String> {
        let code = GoalCode::parse(code)?;
        let goal_id = DocId::parse(&code.goal_id).ok()?;
        let position = parse_position(&code.position)?;

        let restaurant = load_restaurant(&*self.store, RestaurantRef::Username(owner))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(owner, error = %e, "Failed to load restaurant");
                None
            })?;
        let board = restaurant.bingo_board.as_ref()?;
        if board.goal_at(position) != Some(&goal_id) {
            return None;
        }

        let goals = self.catalog.entries_of::<CatalogGoal>(&restaurant).await;
        text_for(&goals, &goal_id).map(str::to_string)
    }
}

/// Update marking a reward record under `prefix` as redeemed.
fn redeem(prefix: &str, at: DateTime<Utc>) -> Result<Update, StoreError> {
    Ok(Update::new()
        .set(format!("{prefix}is_redeemed"), true)
        .set(format!("{prefix}redemption_date"), encode(&at)?))
}
