//! A/B Survey Server Library
//!
//! Blind listening trials over a catalog of encoded recordings: round
//! generation, single-use stream tokens, listening device registration and
//! answer recording.

pub mod config;
pub mod game;
pub mod listening_devices;
pub mod server;
pub mod sqlite_persistence;
pub mod stream_tokens;
pub mod survey_config;
pub mod survey_store;

// Re-export commonly used types for convenience
pub use game::{generate_round, submit_answer};
pub use listening_devices::register_device;
pub use server::{run_server, RequestsLoggingLevel, ServerConfig};
pub use survey_store::{SqliteSurveyStore, SurveyStore};
