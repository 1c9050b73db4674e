use axum::extract::FromRef;

use crate::survey_store::SurveyStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSurveyStore = Arc<dyn SurveyStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub survey_store: GuardedSurveyStore,
}

impl ServerState {
    pub fn new(config: ServerConfig, survey_store: GuardedSurveyStore) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            survey_store,
        }
    }
}

impl FromRef<ServerState> for GuardedSurveyStore {
    fn from_ref(input: &ServerState) -> Self {
        input.survey_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
