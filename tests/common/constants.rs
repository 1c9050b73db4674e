//! Shared constants for end-to-end tests
//!
//! When the seeded catalog changes, update only this file.

// ============================================================================
// Admin
// ============================================================================

/// Shared secret configured on servers spawned with admin routes
pub const ADMIN_API_KEY: &str = "test-admin-key";

// ============================================================================
// Test Catalog IDs
// ============================================================================

/// Approved recording "Midnight Drive" by The Test Band
pub const RECORDING_1_ID: &str = "recording-1";
pub const RECORDING_1_TITLE: &str = "Midnight Drive";
pub const RECORDING_1_ARTIST: &str = "The Test Band";
pub const RECORDING_1_DURATION_MS: i64 = 180_000;

/// Approved recording "Blue Hour" by Jazz Ensemble
pub const RECORDING_2_ID: &str = "recording-2";
pub const RECORDING_2_TITLE: &str = "Blue Hour";
pub const RECORDING_2_ARTIST: &str = "Jazz Ensemble";
pub const RECORDING_2_DURATION_MS: i64 = 90_000;

/// Uploaded but never approved, must never show up in a round
pub const PENDING_RECORDING_ID: &str = "recording-pending";
pub const PENDING_RECORDING_TITLE: &str = "Unreleased Demo";

/// Renditions produced for every recording, all enabled
pub const ENABLED_VARIANTS: [(&str, u32); 3] = [("flac", 0), ("opus", 128), ("mp3", 320)];

/// Rendition option that exists but is switched off
pub const DISABLED_VARIANT: (&str, u32) = ("aac", 256);

/// Variant id convention used by the fixtures
pub fn variant_id(recording_id: &str, codec: &str, bitrate: u32) -> String {
    format!("{}-{}-{}", recording_id, codec, bitrate)
}

// ============================================================================
// Test Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Default request timeout (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
