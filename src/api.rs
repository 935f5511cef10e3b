use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use crate::auth::{require_operator, Operator};
use crate::error::ApiError;
use crate::models::{Event, EventQuery, EventStatus};
use crate::scheduler::{Trigger, TriggerOutcome};
use crate::scraping::{self, SourceInfo};
use crate::AppState;

const PUBLIC_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

/// Builds the HTTP surface.
///
/// Public: health, sources, the event listing, single events and ticket
/// interest. Operator (bearer token): dashboard, import, scrape trigger and
/// scrape status.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/sources", get(list_sources))
        .route("/api/events", get(list_events))
        .route("/api/events/{id}", get(get_event))
        .route("/api/tickets", post(record_ticket_interest));

    let operator = Router::new()
        .route("/api/events/dashboard", get(dashboard_events))
        .route("/api/events/{id}/import", post(import_event))
        .route("/api/scrape", post(trigger_scrape))
        .route("/api/scrape/status", get(scrape_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_operator));

    Router::new()
        .merge(public)
        .merge(operator)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceInfo>> {
    Json(scraping::list_sources(&state.config.sources))
}

#[derive(Debug, Deserialize)]
struct PublicQuery {
    city: Option<String>,
    limit: Option<u32>,
}

/// Upcoming, still-active events for the configured city.
async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<PublicQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let query = EventQuery {
        city: Some(params.city.unwrap_or_else(|| state.config.city.clone())),
        upcoming: true,
        limit: Some(params.limit.unwrap_or(PUBLIC_LIMIT).clamp(1, MAX_LIMIT)),
        ..EventQuery::default()
    };
    Ok(Json(read_catalog(&state, query).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DashboardQuery {
    city: Option<String>,
    keyword: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    status: Option<String>,
}

async fn dashboard_events(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(EventStatus::from_str)
        .transpose()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    let query = EventQuery {
        city: params.city,
        keyword: params.keyword,
        date_from: params
            .date_from
            .as_deref()
            .map(|v| parse_bound(v, false))
            .transpose()?,
        date_to: params
            .date_to
            .as_deref()
            .map(|v| parse_bound(v, true))
            .transpose()?,
        status,
        ..EventQuery::default()
    };
    Ok(Json(read_catalog(&state, query).await?))
}

async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let store = state.store.clone();
    let lookup = id.clone();
    let event = tokio::task::spawn_blocking(move || store.get_event(&lookup)).await??;
    event
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("event {id}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportRequest {
    import_notes: Option<String>,
}

async fn import_event(
    State(state): State<AppState>,
    Extension(Operator(actor)): Extension<Operator>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Event>, ApiError> {
    let request: ImportRequest = parse_body(&body)?;
    let event = state
        .pipeline
        .import_event(id, actor, request.import_notes)
        .await?;
    Ok(Json(event))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketRequest {
    email: Option<String>,
    event_id: Option<String>,
    opt_in: Option<bool>,
}

async fn record_ticket_interest(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: TicketRequest = parse_body(&body)?;
    let email = non_empty(request.email);
    let event_id = non_empty(request.event_id);
    let (Some(email), Some(event_id)) = (email, event_id) else {
        return Err(ApiError::BadRequest("Email and eventId required".to_string()));
    };
    let opt_in = request.opt_in.unwrap_or(false);

    let store = state.store.clone();
    tokio::task::spawn_blocking(move || {
        store.record_ticket_interest(&email, &event_id, opt_in, Utc::now())
    })
    .await??;
    Ok(Json(json!({ "ok": true })))
}

/// Starts a run in the background and answers straight away.
async fn trigger_scrape(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.scheduler.trigger(Trigger::OnDemand);
    let message = match outcome {
        TriggerOutcome::Started => "Scrape started",
        TriggerOutcome::AlreadyRunning => "Scrape already running",
    };
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": message, "outcome": outcome })),
    )
}

async fn scrape_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "running": state.pipeline.is_running(),
        "lastRun": state.scheduler.last_run(),
    }))
}

async fn read_catalog(state: &AppState, query: EventQuery) -> Result<Vec<Event>, ApiError> {
    let store = state.store.clone();
    let events =
        tokio::task::spawn_blocking(move || store.list_events(&query, Utc::now())).await??;
    Ok(events)
}

/// An empty body reads as all-defaults; anything else must be valid JSON.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(err.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates; a plain date
/// covers the whole day when used as an upper bound.
fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date: {value}")))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ApiError::BadRequest(format!("invalid date: {value}")))?;
    Ok(date.and_time(time).and_utc())
}
