//! HTTP request handlers
//!
//! Every trigger endpoint answers with a [`TriggerResponse`]: 200 on
//! success, 400 when the request was rejected (including unparseable JSON
//! bodies), 500 when the player or the config store failed.

use super::AppContext;
use crate::error::Error;
use aa_common::api::{
    HealthResponse, PlayFileRequest, StatusResponse, TriggerAction, TriggerQuery, TriggerResponse,
};
use aa_common::{ConfigDocument, DuckLevelResolver};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::{debug, warn};

type ApiError = (StatusCode, Json<TriggerResponse>);

fn error_response(err: &Error) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(TriggerResponse::error(err.code(), err.to_string())),
    )
}

/// Malformed or incomplete JSON body
fn rejection_response(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(TriggerResponse::error("InvalidRequest", rejection.body_text())),
    )
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "aa-dispatch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: Some(env!("GIT_HASH").to_string()),
    })
}

/// POST /announcements/:slot/play
///
/// A non-numeric slot is reported as an invalid slot rather than a routing error.
pub async fn play_slot(
    State(ctx): State<AppContext>,
    Path(slot): Path<String>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let slot = slot.trim().parse::<i64>().unwrap_or(-1);
    play(&ctx, slot).await
}

/// POST /announcements/stop
pub async fn stop(State(ctx): State<AppContext>) -> Result<Json<TriggerResponse>, ApiError> {
    match ctx.dispatcher.stop().await {
        Ok(outcome) => Ok(Json(outcome.to_response())),
        Err(e) => Err(error_response(&e)),
    }
}

/// GET|POST /trigger?action=play|stop&slot=N
pub async fn trigger(
    State(ctx): State<AppContext>,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<TriggerResponse>, ApiError> {
    match query.action() {
        Some(TriggerAction::Play) => play(&ctx, query.slot()).await,
        Some(TriggerAction::Stop) => stop(State(ctx)).await,
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(TriggerResponse::error(
                "InvalidAction",
                format!(
                    "Unknown action: {}",
                    query.action.as_deref().unwrap_or_default()
                ),
            )),
        )),
    }
}

/// POST /announcements/play-file
pub async fn play_file(
    State(ctx): State<AppContext>,
    body: Result<Json<PlayFileRequest>, JsonRejection>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let Json(request) = body.map_err(rejection_response)?;
    let duck = request.duck.as_ref().and_then(DuckLevelResolver::parse_value);
    match ctx.dispatcher.play_file(&request.file, duck).await {
        Ok(outcome) => Ok(Json(outcome.to_response())),
        Err(e) => Err(error_response(&e)),
    }
}

/// GET /announcements/status
pub async fn status(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    Json(ctx.dispatcher.status().await)
}

/// GET /config
pub async fn get_config(
    State(ctx): State<AppContext>,
) -> Result<Json<ConfigDocument>, ApiError> {
    match ctx.dispatcher.load_config().await {
        Ok(doc) => Ok(Json(doc)),
        Err(e) => Err(error_response(&e)),
    }
}

/// PUT /config
///
/// Accepts any JSON object (current or legacy layout); the normalized
/// document that was written is returned.
pub async fn put_config(
    State(ctx): State<AppContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ConfigDocument>, ApiError> {
    let Json(body) = body.map_err(rejection_response)?;
    if !body.is_object() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(TriggerResponse::error(
                "InvalidConfig",
                "Config document must be a JSON object",
            )),
        ));
    }

    let doc = ConfigDocument::from_value(&body);
    match ctx.dispatcher.save_config(doc).await {
        Ok(saved) => Ok(Json(saved)),
        Err(e) => Err(error_response(&e)),
    }
}

async fn play(ctx: &AppContext, slot: i64) -> Result<Json<TriggerResponse>, ApiError> {
    debug!("Play requested for slot {}", slot);
    match ctx.dispatcher.play(slot).await {
        Ok(outcome) => Ok(Json(outcome.to_response())),
        Err(e) => {
            let (status, Json(mut response)) = error_response(&e);
            if let Ok(slot) = usize::try_from(slot) {
                response = response.with_slot(slot);
            }
            Err((status, Json(response)))
        }
    }
}
