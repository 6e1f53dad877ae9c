use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, Request, State, rejection::QueryRejection},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use command_abi::{ChannelRef, StreamTarget};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Number, Value};
use tracing::{info, warn};

use crate::{
    config::GatewayConfig,
    config_client::DeviceConfigClient,
    error::{GatewayError, ValidationError},
    logging::{category_access, category_config, category_stream, method_label, status_label},
    model::DeviceSerial,
    stream_client::StreamControlClient,
    upstream::{UpstreamDispatcher, UpstreamReply},
};

/// Read-only per-process state. Handlers share nothing mutable, so
/// concurrent calls for the same serial are independent.
#[derive(Clone)]
pub struct SharedState {
    pub config_client: DeviceConfigClient,
    pub stream_client: StreamControlClient,
}

impl SharedState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &GatewayConfig, client: reqwest::Client) -> Self {
        let dispatcher = UpstreamDispatcher::new(
            client,
            config.upstream.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        );
        Self {
            config_client: DeviceConfigClient::new(dispatcher.clone()),
            stream_client: StreamControlClient::new(dispatcher),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct DeviceConfigQuery {
    serial: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateConfigRequest {
    serial: Option<String>,
    updates: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamRequest {
    serial: Option<String>,
    camera: Option<Value>,
    profile: Option<Value>,
    period: Option<Value>,
}

impl StreamRequest {
    fn into_parts(self) -> Result<(DeviceSerial, StreamTarget, Option<Number>), ValidationError> {
        let serial = DeviceSerial::parse(self.serial.as_deref())?;
        let camera = channel_field(
            self.camera,
            ValidationError::MissingCamera,
            ValidationError::InvalidCamera,
        )?;
        let profile = channel_field(
            self.profile,
            ValidationError::MissingProfile,
            ValidationError::InvalidProfile,
        )?;
        let period = match self.period {
            None | Some(Value::Null) => None,
            Some(Value::Number(period)) => Some(period),
            Some(_) => return Err(ValidationError::InvalidPeriod),
        };
        Ok((serial, StreamTarget { camera, profile }, period))
    }
}

fn channel_field(
    value: Option<Value>,
    missing: ValidationError,
    invalid: ValidationError,
) -> Result<ChannelRef, ValidationError> {
    let value = match value {
        None | Some(Value::Null) => return Err(missing),
        Some(value) => value,
    };
    match ChannelRef::from_json(value) {
        Some(channel) if channel.is_blank() => Err(missing),
        Some(channel) => Ok(channel),
        None => Err(invalid),
    }
}

/// Dashboard-facing router. Every action is served both at the root and
/// under `/api`.
pub fn build_gateway_app(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .merge(action_routes())
        .nest("/api", action_routes())
        .layer(middleware::from_fn(access_log_middleware))
        .with_state(state)
}

fn action_routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/device-config",
            get(request_config_handler).patch(update_config_handler),
        )
        .route("/stream/start", post(stream_start_handler))
        .route("/stream/status", post(stream_status_handler))
        .route("/stream/stop", post(stream_stop_handler))
}

async fn healthz_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

async fn request_config_handler(
    State(state): State<SharedState>,
    query: Result<Query<DeviceConfigQuery>, QueryRejection>,
) -> Response {
    respond("request_config", request_config(&state, query).await)
}

async fn update_config_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    respond("update_config", update_config(&state, &body).await)
}

async fn stream_start_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    respond("stream_start", stream_start(&state, &body).await)
}

async fn stream_status_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    respond("stream_status", stream_status(&state, &body).await)
}

async fn stream_stop_handler(State(state): State<SharedState>, body: Bytes) -> Response {
    respond("stream_stop", stream_stop(&state, &body).await)
}

async fn request_config(
    state: &SharedState,
    query: Result<Query<DeviceConfigQuery>, QueryRejection>,
) -> Result<UpstreamReply, GatewayError> {
    let Query(query) = query.map_err(|err| ValidationError::MalformedQuery(err.body_text()))?;
    let serial = DeviceSerial::parse(query.serial.as_deref())?;
    info!("{} request_config serial={serial}", category_config());
    state.config_client.request_config(&serial).await
}

async fn update_config(state: &SharedState, body: &[u8]) -> Result<UpstreamReply, GatewayError> {
    let request: UpdateConfigRequest = parse_body(body)?;
    let serial = DeviceSerial::parse(request.serial.as_deref())?;
    let updates = match request.updates {
        Some(Value::Object(updates)) if !updates.is_empty() => updates,
        None | Some(Value::Null) | Some(Value::Object(_)) => {
            return Err(ValidationError::EmptyUpdates.into());
        }
        Some(_) => return Err(ValidationError::UpdatesNotObject.into()),
    };
    info!(
        "{} update_config serial={serial} sections={:?}",
        category_config(),
        updates.keys().collect::<Vec<_>>()
    );
    state.config_client.update_config(&serial, updates).await
}

// Stream operations check the credential before looking at the body, so an
// unconfigured gateway answers 500 regardless of input.
async fn stream_start(state: &SharedState, body: &[u8]) -> Result<UpstreamReply, GatewayError> {
    state.stream_client.require_credential()?;
    let (serial, target, period) = parse_body::<StreamRequest>(body)?.into_parts()?;
    info!(
        "{} start serial={serial} camera={} profile={} period={:?}",
        category_stream(),
        target.camera,
        target.profile,
        period
    );
    state.stream_client.start(&serial, target, period).await
}

async fn stream_status(state: &SharedState, body: &[u8]) -> Result<UpstreamReply, GatewayError> {
    state.stream_client.require_credential()?;
    let (serial, target, _) = parse_body::<StreamRequest>(body)?.into_parts()?;
    info!(
        "{} status serial={serial} camera={} profile={}",
        category_stream(),
        target.camera,
        target.profile
    );
    state.stream_client.status(&serial, &target).await
}

async fn stream_stop(state: &SharedState, body: &[u8]) -> Result<UpstreamReply, GatewayError> {
    state.stream_client.require_credential()?;
    let (serial, target, _) = parse_body::<StreamRequest>(body)?.into_parts()?;
    info!(
        "{} stop serial={serial} camera={} profile={}",
        category_stream(),
        target.camera,
        target.profile
    );
    state.stream_client.stop(&serial, &target).await
}

/// A literal `null` body reads as `{}`, so it fails on the missing fields instead.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ValidationError> {
    let malformed = |err: serde_json::Error| ValidationError::MalformedBody(err.to_string());
    let value = match serde_json::from_slice::<Value>(body).map_err(malformed)? {
        Value::Null => Value::Object(Default::default()),
        value => value,
    };
    serde_json::from_value(value).map_err(malformed)
}

/// Upstream replies pass through with their own status; local failures
/// become `{ok: false, error}`.
fn respond(action: &str, result: Result<UpstreamReply, GatewayError>) -> Response {
    match result {
        Ok(reply) => reply.into_response(),
        Err(err) => {
            if err.is_validation() {
                info!("{action} rejected: {err}");
            } else if err.is_timeout() {
                warn!("{action} timed out waiting for fleet-command: {err}");
            } else {
                warn!("{action} failed: {err}");
            }
            err.into_response()
        }
    }
}

async fn access_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis();

    info!(
        "{} {} {} {} {}ms",
        category_access(),
        method_label(method.as_str()),
        status_label(response.status().as_u16()),
        path,
        elapsed_ms
    );

    response
}
