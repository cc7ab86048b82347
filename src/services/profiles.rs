// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account documents, restaurant profiles, favourites and reward history.

use crate::db::{collections, encode, find_as, DocumentStore, Filter, StoreError, Update};
use crate::error::{AppError, Result};
use crate::models::{Customer, DocId, Restaurant, RestaurantProfile, RestaurantRef, RewardRecord};
use crate::services::{load_customer, load_restaurant};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A public restaurant listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRestaurant {
    pub id: DocId,
    #[serde(flatten)]
    pub profile: RestaurantProfile,
}

/// An issued reward with the restaurant it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardEntry {
    pub restaurant_id: DocId,
    pub restaurant_name: String,
    #[serde(flatten)]
    pub record: RewardRecord,
}

/// A customer's rewards split by state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardHistory {
    pub active: Vec<RewardEntry>,
    /// Most recently redeemed first
    pub redeemed: Vec<RewardEntry>,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a restaurant owner account.
    pub async fn register_restaurant(&self, username: &str) -> Result<Restaurant> {
        let username = normalize_username(username)?;
        if load_restaurant(&*self.store, RestaurantRef::Username(&username))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!("Restaurant {} exists", username)));
        }

        let restaurant = Restaurant::new(&username);
        self.store
            .insert_one(collections::RESTAURANT_USERS, to_document(&restaurant)?)
            .await?;

        tracing::info!(username = %username, id = %restaurant.id, "Restaurant registered");
        Ok(restaurant)
    }

    /// Create a customer account.
    pub async fn register_customer(&self, username: &str) -> Result<Customer> {
        let username = normalize_username(username)?;
        if load_customer(&*self.store, &username).await?.is_some() {
            return Err(AppError::Conflict(format!("Customer {} exists", username)));
        }

        let customer = Customer::new(&username);
        self.store
            .insert_one(collections::CUSTOMERS, to_document(&customer)?)
            .await?;

        tracing::info!(username = %username, "Customer registered");
        Ok(customer)
    }

    /// A restaurant's profile. Restaurants without one get an empty profile.
    pub async fn profile(&self, restaurant: RestaurantRef<'_>) -> Result<RestaurantProfile> {
        let restaurant = load_restaurant(&*self.store, restaurant)
            .await?
            .ok_or_else(|| AppError::NotFound("Restaurant".to_string()))?;
        Ok(restaurant.profile.unwrap_or_default())
    }

    pub async fn update_profile(&self, owner: &str, profile: &RestaurantProfile) -> Result<()> {
        let updated = self
            .store
            .update_one(
                collections::RESTAURANT_USERS,
                &RestaurantRef::Username(owner).filter(),
                &Update::new().set("profile", encode(profile)?),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound("Restaurant".to_string()));
        }

        tracing::info!(owner, is_public = profile.is_public, "Profile updated");
        Ok(())
    }

    /// Every restaurant that has opted into the public listing.
    pub async fn public_profiles(&self) -> Vec<PublicRestaurant> {
        let restaurants: Vec<Restaurant> = find_as(
            &*self.store,
            collections::RESTAURANT_USERS,
            &Filter::new().eq("profile.is_public", true),
        )
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to list restaurants");
            Vec::new()
        });

        restaurants
            .into_iter()
            .filter_map(|r| {
                r.profile.map(|profile| PublicRestaurant {
                    id: r.id,
                    profile,
                })
            })
            .collect()
    }

    /// Display name of a restaurant, falling back to the owner's username.
    pub async fn restaurant_name(&self, restaurant_id: &DocId) -> Option<String> {
        let restaurant = load_restaurant(&*self.store, RestaurantRef::Id(restaurant_id))
            .await
            .ok()
            .flatten()?;
        Some(display_name(&restaurant))
    }

    pub async fn favourites(&self, customer: &str) -> Vec<DocId> {
        match load_customer(&*self.store, customer).await {
            Ok(Some(c)) => c.favourite,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(customer, error = %e, "Failed to load favourites");
                Vec::new()
            }
        }
    }

    /// Add or remove a restaurant from a customer's favourites.
    ///
    /// Returns whether the restaurant is a favourite afterwards.
    pub async fn toggle_favourite(&self, customer: &str, restaurant_id: &DocId) -> Result<bool> {
        let customer_doc = load_customer(&*self.store, customer)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;
        if load_restaurant(&*self.store, RestaurantRef::Id(restaurant_id))
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("Restaurant".to_string()));
        }

        let mut favourite = customer_doc.favourite;
        let now_favourite = match favourite.iter().position(|id| id == restaurant_id) {
            Some(index) => {
                favourite.remove(index);
                false
            }
            None => {
                favourite.push(restaurant_id.clone());
                true
            }
        };

        self.store
            .update_one(
                collections::CUSTOMERS,
                &Filter::new().eq("username", customer),
                &Update::new().set("favourite", encode(&favourite)?),
            )
            .await?;
        Ok(now_favourite)
    }

    /// Rewards a customer has earned across all restaurants.
    pub async fn reward_history(&self, customer: &str) -> Result<RewardHistory> {
        let Some(customer_doc) = load_customer(&*self.store, customer).await? else {
            return Ok(RewardHistory::default());
        };

        let mut history = RewardHistory::default();
        for progress in customer_doc.progress {
            if progress.completed_rewards.is_empty() {
                continue;
            }
            let restaurant_name = self
                .restaurant_name(&progress.restaurant_id)
                .await
                .unwrap_or_default();

            for record in progress.completed_rewards {
                let entry = RewardEntry {
                    restaurant_id: progress.restaurant_id.clone(),
                    restaurant_name: restaurant_name.clone(),
                    record,
                };
                if entry.record.is_spent() {
                    history.redeemed.push(entry);
                } else {
                    history.active.push(entry);
                }
            }
        }

        history
            .redeemed
            .sort_by(|a, b| b.record.redemption_date.cmp(&a.record.redemption_date));
        Ok(history)
    }
}

fn display_name(restaurant: &Restaurant) -> String {
    restaurant
        .profile
        .as_ref()
        .map(|p| p.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(&restaurant.username)
        .to_string()
}

/// Lowercase and trim a username.
///
/// `+` separates the fields of a reward code, and id-shaped names would be
/// rewritten to stored id form by store filters.
fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();
    if username.is_empty() || username.contains('+') || uuid::Uuid::try_parse(&username).is_ok() {
        return Err(AppError::BadRequest(format!("Invalid username: {:?}", raw)));
    }
    Ok(username)
}

fn to_document<T: Serialize>(value: &T) -> std::result::Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::InsertFailure(e.to_string()))
}
