// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity middleware.
//!
//! Authentication happens upstream; the authenticator forwards the signed-in
//! username in the `X-Bingo-User` header.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// Header carrying the authenticated username.
pub const IDENTITY_HEADER: &str = "x-bingo-user";

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Middleware that requires an identity header.
pub async fn require_identity(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let username = request
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    request.extensions_mut().insert(Identity { username });
    Ok(next.run(request).await)
}
