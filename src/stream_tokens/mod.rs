//! Short-lived, single-use stream tokens bound to one encoded variant.
//!
//! A token is a capability: whoever holds it may fetch that variant's audio
//! until it expires or is consumed. Expiry is checked on every read, so rows
//! left behind by a missed sweep never resolve.

use crate::survey_store::{CatalogReader, StreamTokenRow, StreamTokenStore};
use anyhow::Result;
use chrono::Utc;
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TOKEN_LENGTH: usize = 48;

/// Lifetime of the two tokens handed out for a comparison.
pub const COMPARISON_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Lifetime of preview and post-answer playback tokens.
pub const PREVIEW_TOKEN_TTL: Duration = Duration::from_secs(2 * 60);

/// Attempts per issue, in case a generated token collides.
const MAX_ISSUE_ATTEMPTS: usize = 3;

/// A random A-z0-9 string from the thread-local CSPRNG.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Mints a token for `variant_id`, valid for `ttl`.
/// Returns Ok(None) when the store refused every insert.
pub fn issue<S: StreamTokenStore + ?Sized>(
    store: &S,
    variant_id: &str,
    ttl: Duration,
) -> Result<Option<String>> {
    issue_at(store, variant_id, ttl, now_ms())
}

pub fn issue_at<S: StreamTokenStore + ?Sized>(
    store: &S,
    variant_id: &str,
    ttl: Duration,
    now_ms: i64,
) -> Result<Option<String>> {
    let expires_at = now_ms + ttl.as_millis() as i64;
    for _ in 0..MAX_ISSUE_ATTEMPTS {
        let row = StreamTokenRow {
            token: generate_token(),
            variant_id: variant_id.to_string(),
            expires_at,
        };
        if store.insert_stream_token(&row)? {
            return Ok(Some(row.token));
        }
        debug!("Stream token insert for variant {} returned nothing", variant_id);
    }
    warn!(
        "Giving up issuing a stream token for variant {} after {} attempts",
        variant_id, MAX_ISSUE_ATTEMPTS
    );
    Ok(None)
}

/// Returns the variant id the token grants access to, or None if the token
/// never existed, was consumed, or has expired.
pub fn resolve<S: StreamTokenStore + ?Sized>(store: &S, token: &str) -> Result<Option<String>> {
    resolve_at(store, token, now_ms())
}

pub fn resolve_at<S: StreamTokenStore + ?Sized>(
    store: &S,
    token: &str,
    now_ms: i64,
) -> Result<Option<String>> {
    Ok(store
        .get_stream_token(token)?
        .filter(|row| row.expires_at > now_ms)
        .map(|row| row.variant_id))
}

/// Deletes the token and reports whether this call was the one that removed
/// it. Of any number of claims on one token, at most one returns true.
pub fn claim<S: StreamTokenStore + ?Sized>(store: &S, token: &str) -> Result<bool> {
    store.delete_stream_token(token)
}

/// Deletes the token. Consuming a missing token is a no-op.
pub fn consume<S: StreamTokenStore + ?Sized>(store: &S, token: &str) -> Result<()> {
    if !store.delete_stream_token(token)? {
        debug!("Stream token already gone");
    }
    Ok(())
}

/// Deletes every expired row. Returns how many were removed.
pub fn sweep_expired<S: StreamTokenStore + ?Sized>(store: &S) -> Result<usize> {
    let deleted = store.delete_expired_stream_tokens(now_ms())?;
    if deleted > 0 {
        info!("Swept {} expired stream tokens", deleted);
    }
    Ok(deleted)
}

/// What the storage layer needs to serve one playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackGrant {
    pub variant_id: String,
    pub codec: String,
    pub bitrate: u32,
    pub storage_key: String,
}

/// Resolves and consumes the token in one step.
/// Returns None under the same conditions as [`resolve`], and when another
/// redemption claimed the token first.
pub fn redeem_for_playback<S>(store: &S, token: &str) -> Result<Option<PlaybackGrant>>
where
    S: StreamTokenStore + CatalogReader + ?Sized,
{
    let Some(variant_id) = resolve(store, token)? else {
        return Ok(None);
    };
    if !claim(store, token)? {
        debug!("Stream token was redeemed by another request");
        return Ok(None);
    }

    Ok(store.get_variant(&variant_id)?.map(|variant| PlaybackGrant {
        variant_id: variant.id,
        codec: variant.codec,
        bitrate: variant.bitrate,
        storage_key: variant.storage_key,
    }))
}
