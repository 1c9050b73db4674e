//! Public survey endpoints: device registration, round generation and answer
//! submission.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use super::state::{GuardedSurveyStore, ServerState};
use super::ServerConfig;
use crate::game::{
    generate_round, submit_answer, AnswerError, AnswerSubmission, ComparisonRound, RoundFilters,
    RoundOptions,
};
use crate::listening_devices::{device_options, register_device, DeviceError, DeviceRegistration};
use crate::survey_store::DeviceStore;

pub const NO_ROUND_AVAILABLE_MESSAGE: &str =
    "No audio comparisons available yet. Check back soon!";

#[derive(Deserialize, Debug, Default)]
struct RoundQuery {
    transition_modes: Option<String>,
    pairing_types: Option<String>,
}

#[derive(Serialize)]
struct RoundResponse {
    round: Option<ComparisonRound>,
    error: Option<&'static str>,
}

impl IntoResponse for AnswerError {
    fn into_response(self) -> Response {
        let status = match &self {
            AnswerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AnswerError::Gone => StatusCode::GONE,
            AnswerError::Internal(err) => {
                error!("Failed to record answer: {:#}", err);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl IntoResponse for DeviceError {
    fn into_response(self) -> Response {
        match &self {
            DeviceError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": self.to_string() })))
                    .into_response()
            }
            DeviceError::Internal(err) => {
                error!("Failed to register device: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn get_device_options() -> impl IntoResponse {
    Json(device_options())
}

async fn post_device(State(store): State<GuardedSurveyStore>, body: Bytes) -> Response {
    let registration: DeviceRegistration = match serde_json::from_slice(&body) {
        Ok(registration) => registration,
        Err(err) => {
            debug!("Rejecting malformed device body: {}", err);
            return DeviceError::BadRequest("Invalid request body".to_string()).into_response();
        }
    };

    match register_device(&*store, &registration) {
        Ok(device) => (StatusCode::CREATED, Json(device)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_device(
    State(store): State<GuardedSurveyStore>,
    Path(device_id): Path<String>,
) -> Response {
    match store.get_device(&device_id) {
        Ok(Some(device)) => Json(device).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to load device {}: {:#}", device_id, err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_round(
    State(store): State<GuardedSurveyStore>,
    State(config): State<ServerConfig>,
    Query(query): Query<RoundQuery>,
) -> Response {
    let options = RoundOptions {
        filters: RoundFilters::from_query(
            query.transition_modes.as_deref(),
            query.pairing_types.as_deref(),
        ),
        draw_round_mode: config.draw_round_mode,
    };

    match generate_round(&*store, &options, &mut rand::rng()) {
        Ok(Some(round)) => Json(RoundResponse {
            round: Some(round),
            error: None,
        })
        .into_response(),
        Ok(None) => Json(RoundResponse {
            round: None,
            error: Some(NO_ROUND_AVAILABLE_MESSAGE),
        })
        .into_response(),
        Err(err) => {
            error!("Failed to generate round: {:#}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn post_answer(State(store): State<GuardedSurveyStore>, body: Bytes) -> Response {
    let submission: AnswerSubmission = match serde_json::from_slice(&body) {
        Ok(submission) => submission,
        Err(err) => {
            debug!("Rejecting malformed answer body: {}", err);
            return AnswerError::BadRequest("Invalid request body".to_string()).into_response();
        }
    };

    match submit_answer(&*store, &submission) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn make_survey_routes(state: ServerState) -> Router {
    Router::new()
        .route("/device-options", get(get_device_options))
        .route("/devices", post(post_device))
        .route("/devices/{device_id}", get(get_device))
        .route("/round", get(get_round))
        .route("/answers", post(post_answer))
        .with_state(state)
}
