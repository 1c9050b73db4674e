use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Shared secret for the admin routes. They are not mounted when unset.
    pub admin_api_key: Option<String>,
    /// If true, rounds carry a drawn round mode instead of always mixtape.
    pub draw_round_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3100,
            admin_api_key: None,
            draw_round_mode: false,
        }
    }
}
