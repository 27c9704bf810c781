//! API v0 endpoints.
//!
//! Version 0 signals an unstable API -- breaking changes are expected
//! until the server reaches 1.0.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::server::SharedState;
use crate::api_client::types::{
    AlarmState, CreateAlarmRequest, CreateAlarmResponse, ErrorResponse, RingingState,
    StatusResponse,
};
use crate::registry::{DEFAULT_LABEL, DEFAULT_SOUND};

/// Build the v0 API routes with OpenAPI metadata.
pub fn routes() -> OpenApiRouter<SharedState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(get_alarms, create_alarm))
        .routes(routes!(delete_alarm))
        .routes(routes!(toggle_alarm))
        .routes(routes!(stop_alarm))
        .routes(routes!(get_ringing))
}

fn bad_request(error: String) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = OK, description = "Server is running", body = String),
    ),
)]
async fn health() -> &'static str {
    "OK"
}

/// List all alarms with their ringing annotation.
#[utoipa::path(
    get,
    path = "/api/alarms",
    tag = "alarms",
    responses(
        (status = OK, description = "Current alarm set", body = Vec<AlarmState>),
    ),
)]
async fn get_alarms(State(state): State<SharedState>) -> Json<Vec<AlarmState>> {
    Json(state.registry.list())
}

/// Create an alarm.
///
/// Hour and minute ranges are validated here; the registry stores
/// whatever it is handed.
#[utoipa::path(
    post,
    path = "/api/alarms",
    tag = "alarms",
    request_body = CreateAlarmRequest,
    responses(
        (status = OK, description = "Alarm created", body = CreateAlarmResponse),
        (status = BAD_REQUEST, description = "Malformed or out-of-range request", body = ErrorResponse),
    ),
)]
async fn create_alarm(
    State(state): State<SharedState>,
    body: Result<Json<CreateAlarmRequest>, JsonRejection>,
) -> Result<Json<CreateAlarmResponse>, (StatusCode, Json<ErrorResponse>)> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    if request.hour > 23 {
        return Err(bad_request(format!(
            "hour {} out of range 0-23",
            request.hour
        )));
    }
    if request.minute > 59 {
        return Err(bad_request(format!(
            "minute {} out of range 0-59",
            request.minute
        )));
    }

    let id = state.registry.create(
        request.hour,
        request.minute,
        request.label.unwrap_or_else(|| DEFAULT_LABEL.to_owned()),
        request.vibrate.unwrap_or(true),
        request.sound_file.unwrap_or_else(|| DEFAULT_SOUND.to_owned()),
    );
    Ok(Json(CreateAlarmResponse { success: true, id }))
}

/// Delete an alarm. Unknown ids report `success: false`.
#[utoipa::path(
    delete,
    path = "/api/alarms/{id}",
    tag = "alarms",
    params(
        ("id" = String, Path, description = "Alarm id"),
    ),
    responses(
        (status = OK, description = "Deletion outcome", body = StatusResponse),
    ),
)]
async fn delete_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: state.registry.delete(&id),
    })
}

/// Flip an alarm's enabled flag. Unknown ids report `success: false`.
#[utoipa::path(
    put,
    path = "/api/alarms/{id}/toggle",
    tag = "alarms",
    params(
        ("id" = String, Path, description = "Alarm id"),
    ),
    responses(
        (status = OK, description = "Toggle outcome", body = StatusResponse),
    ),
)]
async fn toggle_alarm(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<StatusResponse> {
    Json(StatusResponse {
        success: state.registry.toggle(&id),
    })
}

/// Stop whatever is ringing. Always succeeds; stopping silence is a
/// no-op.
#[utoipa::path(
    post,
    path = "/api/alarms/stop",
    tag = "alarms",
    responses(
        (status = OK, description = "Stopped", body = StatusResponse),
    ),
)]
async fn stop_alarm(State(state): State<SharedState>) -> Json<StatusResponse> {
    state.registry.stop_ringing().await;
    Json(StatusResponse { success: true })
}

/// Current ringing state and label, for UI polling.
#[utoipa::path(
    get,
    path = "/api/alarms/ringing",
    tag = "alarms",
    responses(
        (status = OK, description = "Ringing slot", body = RingingState),
    ),
)]
async fn get_ringing(State(state): State<SharedState>) -> Json<RingingState> {
    Json(RingingState {
        ringing: state.registry.is_ringing(),
        label: state.registry.current_ringing_label(),
    })
}
