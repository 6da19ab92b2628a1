//! Manager credentials and invite codes.
//!
//! Managers authenticate with an opaque bearer token issued when their
//! account is created. Participants never authenticate; they join a group
//! with its invite code.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use rand::{distributions::Alphanumeric, Rng, RngCore};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::{Result, SantaError};
use crate::models::AppManager;

const TOKEN_BYTES: usize = 32;
const INVITE_CODE_LEN: usize = 8;

/// 256-bit random token, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_invite_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the manager behind the request's `Authorization: Bearer` header.
pub async fn authenticate(pool: &SqlitePool, headers: &HeaderMap) -> Result<AppManager> {
    let token = bearer_token(headers).ok_or(SantaError::Unauthorized)?;
    db::get_manager_by_token(pool, token)
        .await?
        .ok_or(SantaError::Unauthorized)
}
