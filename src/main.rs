use ab_survey_server::config::{AppConfig, CliConfig, FileConfig};
use ab_survey_server::server::state::GuardedSurveyStore;
use ab_survey_server::{run_server, stream_tokens, RequestsLoggingLevel, ServerConfig};
use ab_survey_server::SqliteSurveyStore;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the survey database (survey.db).
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3100)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Seconds between sweeps of expired stream tokens. Set to 0 to disable.
    #[clap(long, default_value_t = 300)]
    pub token_sweep_interval_secs: u64,

    /// Shared secret for the admin config routes. Admin routes are disabled if unset.
    #[clap(long)]
    pub admin_api_key: Option<String>,

    /// Label rounds with a drawn round mode instead of always "mixtape".
    #[clap(long)]
    pub draw_round_mode: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            token_sweep_interval_secs: self.token_sweep_interval_secs,
            admin_api_key: self.admin_api_key.clone(),
            draw_round_mode: self.draw_round_mode,
        }
    }
}

fn spawn_token_sweeper(store: GuardedSurveyStore, interval_secs: u64) {
    if interval_secs == 0 {
        info!("Expired token sweep disabled");
        return;
    }
    info!("Sweeping expired stream tokens every {}s", interval_secs);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = stream_tokens::sweep_expired(&*store) {
                error!("Failed to sweep expired stream tokens: {:#}", e);
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let db_path = app_config.survey_db_path();
    info!("Opening SQLite survey database at {:?}...", db_path);
    let survey_store: GuardedSurveyStore = Arc::new(SqliteSurveyStore::new(&db_path)?);

    spawn_token_sweeper(survey_store.clone(), app_config.token_sweep_interval_secs);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level,
        port: app_config.port,
        admin_api_key: app_config.admin_api_key,
        draw_round_mode: app_config.draw_round_mode,
    };

    info!("Ready to serve at port {}!", server_config.port);
    run_server(server_config, survey_store).await
}
