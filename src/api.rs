use crate::{
    db::{
        models::{NewReading, SensorReading, TimeRange},
        DatabaseTrait,
    },
    error::AppError,
    mailbox::{MailboxError, WateringCommand},
    state::AppState,
    utils::{display_time, ux_secs_to_utc},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use axum_server::Handle;
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tracing::{debug, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Envelope shared by the JSON routes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiResponse<T = ()> {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<WateringCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self { status: "success".to_owned(), message: message.to_owned(), error: None, command: None, data: Some(data) }
    }
}

impl ApiResponse {
    pub fn error(message: &str, error: &AppError) -> Self {
        Self {
            status: "error".to_owned(),
            message: message.to_owned(),
            error: Some(error.to_string()),
            command: None,
            data: None,
        }
    }

    pub fn ignored(message: &str) -> Self {
        Self { status: "ignored".to_owned(), message: message.to_owned(), error: None, command: None, data: None }
    }

    pub fn command_stored(command: WateringCommand) -> Self {
        Self {
            status: "success".to_owned(),
            message: "Command stored".to_owned(),
            error: None,
            command: Some(command),
            data: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub active_sessions: usize,
    pub feed_subscribers: usize,
    pub command_pending: bool,
}

/// Payload posted by the sensor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingBody {
    pub raw_value: i64,
    pub moisture_percentage: i64,
    /// epoch milliseconds, defaults to the time of arrival
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ReadingBody {
    pub fn into_new_reading(self, now: DateTime<Utc>) -> Result<NewReading, AppError> {
        let moisture_percentage = u8::try_from(self.moisture_percentage)
            .ok()
            .filter(|pct| *pct <= 100)
            .ok_or_else(|| {
                AppError::InvalidReading(format!("moisturePercentage {} is outside 0..=100", self.moisture_percentage))
            })?;
        let timestamp = match self.timestamp {
            Some(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| AppError::InvalidReading(format!("timestamp {} is out of range", ms)))?,
            None => now,
        };
        Ok(NewReading { timestamp, raw_value: self.raw_value, moisture_percentage })
    }
}

/// `start` and `end` are unix seconds, fractions allowed. The window applies only when
/// both are given and non-empty.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct HistoryParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl HistoryParams {
    pub fn to_range(&self) -> Result<Option<TimeRange>, AppError> {
        let (Some(start), Some(end)) = (query_bound(self.start.as_deref()), query_bound(self.end.as_deref())) else {
            return Ok(None);
        };
        Ok(Some(TimeRange { start: parse_bound(start)?, end: parse_bound(end)? }))
    }
}

fn query_bound(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|raw| !raw.is_empty())
}

fn parse_bound(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let secs: f64 =
        raw.parse().map_err(|_| AppError::InvalidQuery(format!("`{}` is not a number of seconds", raw)))?;
    ux_secs_to_utc(secs).ok_or_else(|| AppError::InvalidQuery(format!("timestamp {} is out of range", raw)))
}

/// Runs a store call on the blocking pool; store calls wait on the store thread.
async fn with_store<T, F>(app_state: &AppState, call: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&dyn DatabaseTrait) -> Result<T, AppError> + Send + 'static,
{
    let db = app_state.db.clone();
    tokio::task::spawn_blocking(move || call(db.as_ref())).await?
}

pub async fn stream_readings(
    State(app_state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let feed = app_state.feed.clone();
    let session = tokio::task::spawn_blocking(move || feed.open()).await??;
    let stream = session.into_stream().map(|frame| Ok::<_, Infallible>(frame.into_event()));
    Ok(Sse::new(stream))
}

pub async fn ingest_reading(
    State(app_state): State<Arc<AppState>>, body: Result<Json<ReadingBody>, JsonRejection>,
) -> Result<Json<ApiResponse<SensorReading>>, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::InvalidReading(rejection.body_text()))?;
    let reading = body.into_new_reading(app_state.time_provider.now_utc())?;
    let stored = with_store(&app_state, move |db| db.insert_reading(reading)).await?;
    info!(
        id = stored.id,
        moisture = stored.moisture_percentage,
        raw = stored.raw_value,
        at = %display_time(stored.timestamp),
        "Reading stored."
    );
    Ok(Json(ApiResponse::success("Moisture data saved successfully", stored)))
}

pub async fn reading_history(
    State(app_state): State<Arc<AppState>>, params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<SensorReading>>>, AppError> {
    let Query(params) = params.map_err(|rejection| AppError::InvalidQuery(rejection.body_text()))?;
    let range = params.to_range()?;
    let readings = with_store(&app_state, move |db| db.readings_between(range)).await?;
    debug!(count = readings.len(), ?range, "History fetched.");
    Ok(Json(ApiResponse::success("Moisture data fetched", readings)))
}

pub async fn submit_command(
    State(app_state): State<Arc<AppState>>, body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiResponse>, AppError> {
    let Json(body) = body.map_err(|rejection| MailboxError::Invalid(rejection.body_text()))?;
    let command = app_state.mailbox.submit_json(&body).await?;
    Ok(Json(ApiResponse::command_stored(command)))
}

/// Device side. Empty mailbox answers 204 with no body.
pub async fn poll_command(State(app_state): State<Arc<AppState>>) -> Response {
    match app_state.mailbox.poll().await {
        Some(command) => Json(command).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn get_status(State(app_state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, AppError> {
    let feed_subscribers = with_store(&app_state, |db| {
        db.ping()?;
        db.watch_count()
    })
    .await?;
    Ok(Json(StatusResponse {
        status: "success".to_owned(),
        message: "Connected to the data store".to_owned(),
        active_sessions: app_state.feed.live_sessions(),
        feed_subscribers,
        command_pending: app_state.mailbox.is_pending().await,
    }))
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/soil-moisture", get(stream_readings).post(ingest_reading))
        .route("/api/soil-moisture/history", get(reading_history))
        .route("/api/command", get(poll_command).post(submit_command))
        // path flashed into deployed devices
        .route("/api/test-data", get(poll_command).post(submit_command))
        .route("/api/status", get(get_status))
        .with_state(app_state)
}

/// Serves until the app state signals shutdown, then drains open connections.
pub async fn run_web_server(app_state: Arc<AppState>, addr: SocketAddr, handle: Handle) -> Result<(), AppError> {
    let mut shutdown = app_state.shutdown_signal();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        let _ = shutdown.wait_for(|stop| *stop).await;
        info!("Stopping HTTP server.");
        shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!(%addr, "Starting HTTP server.");
    axum_server::bind(addr).handle(handle).serve(router(app_state).into_make_service()).await?;
    info!("HTTP server stopped.");
    Ok(())
}
