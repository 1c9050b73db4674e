//! Operator endpoints for reading and tuning the survey configuration.

use axum::{
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info, warn};

use super::state::{GuardedSurveyStore, ServerState};
use super::ServerConfig;
use crate::survey_config::{
    self, ModeWeights, PairingWeights, PermutationWeights, SurveyConfig, TradeoffGapConfig,
    TransitionWeights, MAX_SEGMENT_DURATION_MS, MIN_SEGMENT_DURATION_MS,
};
use crate::survey_store::{SurveyStore, VariantKey, VariantOption};

#[derive(Debug, Error)]
enum AdminConfigError {
    #[error("Unknown config section: {0}")]
    UnknownSection(String),

    #[error("{0}")]
    Invalid(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AdminConfigError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminConfigError::UnknownSection(_) => StatusCode::NOT_FOUND,
            AdminConfigError::Invalid(_) => StatusCode::BAD_REQUEST,
            AdminConfigError::Internal(err) => {
                error!("Failed to update survey config: {:#}", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SurveyConfigResponse {
    config: SurveyConfig,
    variant_options: Vec<VariantOption>,
}

#[derive(Deserialize, Debug)]
struct PlaceboBody {
    probability: f64,
}

#[derive(Deserialize, Debug)]
struct SegmentBody {
    duration_ms: f64,
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AdminConfigError> {
    serde_json::from_slice(body).map_err(|err| AdminConfigError::Invalid(err.to_string()))
}

fn parse_permutation_weights(body: &[u8]) -> Result<PermutationWeights, AdminConfigError> {
    let entries: BTreeMap<String, f64> = parse_body(body)?;
    for (key, weight) in &entries {
        if key.parse::<VariantKey>().is_err() {
            return Err(AdminConfigError::Invalid(format!(
                "Invalid variant key: {}",
                key
            )));
        }
        if !weight.is_finite() || *weight < 0.0 {
            return Err(AdminConfigError::Invalid(format!(
                "Invalid weight for {}",
                key
            )));
        }
    }
    let weights =
        PermutationWeights::from_string_keys(entries.iter().map(|(k, v)| (k.as_str(), *v)));
    // An empty map resets every rendition to the default weight.
    if !weights.is_empty() {
        weights.validate().map_err(AdminConfigError::Invalid)?;
    }
    Ok(weights)
}

fn apply_section(
    store: &dyn SurveyStore,
    section: &str,
    body: &[u8],
) -> Result<(), AdminConfigError> {
    match section {
        "pairing" => {
            let weights: PairingWeights = parse_body(body)?;
            weights.validate().map_err(AdminConfigError::Invalid)?;
            survey_config::set_pairing_weights(store, &weights)?;
        }
        "placebo" => {
            let PlaceboBody { probability } = parse_body(body)?;
            if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
                return Err(AdminConfigError::Invalid(
                    "Placebo probability must be between 0 and 1".to_string(),
                ));
            }
            survey_config::set_placebo_probability(store, probability)?;
        }
        "permutation" => {
            let weights = parse_permutation_weights(body)?;
            survey_config::set_permutation_weights(store, &weights)?;
        }
        "transition" => {
            let weights: TransitionWeights = parse_body(body)?;
            weights.validate().map_err(AdminConfigError::Invalid)?;
            survey_config::set_transition_weights(store, &weights)?;
        }
        "mode" => {
            let weights: ModeWeights = parse_body(body)?;
            weights.validate().map_err(AdminConfigError::Invalid)?;
            survey_config::set_mode_weights(store, &weights)?;
        }
        "tradeoff" => {
            let config: TradeoffGapConfig = parse_body(body)?;
            config.validate().map_err(AdminConfigError::Invalid)?;
            survey_config::set_tradeoff_gap_config(store, &config)?;
        }
        "segment" => {
            let SegmentBody { duration_ms } = parse_body(body)?;
            let range = MIN_SEGMENT_DURATION_MS as f64..=MAX_SEGMENT_DURATION_MS as f64;
            if !duration_ms.is_finite() || !range.contains(&duration_ms) {
                return Err(AdminConfigError::Invalid(format!(
                    "Segment duration must be between {} and {} ms",
                    MIN_SEGMENT_DURATION_MS, MAX_SEGMENT_DURATION_MS
                )));
            }
            survey_config::set_segment_duration_ms(store, duration_ms)?;
        }
        other => return Err(AdminConfigError::UnknownSection(other.to_string())),
    }
    Ok(())
}

fn config_snapshot(store: &dyn SurveyStore) -> Response {
    match store.get_variant_options() {
        Ok(variant_options) => Json(SurveyConfigResponse {
            config: SurveyConfig::load(store),
            variant_options,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to read variant options: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_survey_config(State(store): State<GuardedSurveyStore>) -> Response {
    config_snapshot(store.as_ref())
}

async fn put_survey_config(
    State(store): State<GuardedSurveyStore>,
    Path(section): Path<String>,
    body: Bytes,
) -> Response {
    match apply_section(store.as_ref(), &section, &body) {
        Ok(()) => {
            info!("Updated survey config section '{}'", section);
            config_snapshot(store.as_ref())
        }
        Err(err) => {
            if let AdminConfigError::Invalid(reason) = &err {
                warn!("Rejected survey config '{}' update: {}", section, reason);
            }
            err.into_response()
        }
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn require_admin_key(
    State(config): State<ServerConfig>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = matches!(
        (config.admin_api_key.as_deref(), bearer_token(&request)),
        (Some(expected), Some(provided)) if expected == provided
    );
    if !authorized {
        return StatusCode::FORBIDDEN.into_response();
    }
    next.run(request).await
}

pub fn make_admin_routes(state: ServerState) -> Option<Router> {
    state.config.admin_api_key.as_ref()?;

    Some(
        Router::new()
            .route("/survey-config", get(get_survey_config))
            .route("/survey-config/{section}", put(put_survey_config))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_admin_key,
            ))
            .with_state(state),
    )
}
