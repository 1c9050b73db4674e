mod file_config;

pub use file_config::FileConfig;

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// CLI arguments that take part in config resolution.
/// Every field here can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub token_sweep_interval_secs: u64,
    pub admin_api_key: Option<String>,
    pub draw_round_mode: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// 0 disables the expired token sweep.
    pub token_sweep_interval_secs: u64,
    /// Admin routes are only mounted when this is set.
    pub admin_api_key: Option<String>,
    pub draw_round_mode: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let token_sweep_interval_secs = file
            .token_sweep_interval_secs
            .unwrap_or(cli.token_sweep_interval_secs);

        let admin_api_key = file
            .admin_api_key
            .or_else(|| cli.admin_api_key.clone())
            .filter(|key| !key.trim().is_empty());

        let draw_round_mode = file.draw_round_mode.unwrap_or(cli.draw_round_mode);

        Ok(Self {
            db_dir,
            port,
            logging_level,
            token_sweep_interval_secs,
            admin_api_key,
            draw_round_mode,
        })
    }

    pub fn survey_db_path(&self) -> PathBuf {
        self.db_dir.join("survey.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
