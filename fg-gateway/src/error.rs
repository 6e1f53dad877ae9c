use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::address::AddressError;

/// Input rejected before any outbound call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("serial is required")]
    MissingSerial,
    #[error("serial cannot be a relative path segment")]
    DotSegmentSerial,
    #[error("updates payload is empty")]
    EmptyUpdates,
    #[error("updates must be an object")]
    UpdatesNotObject,
    #[error("camera is required")]
    MissingCamera,
    #[error("profile is required")]
    MissingProfile,
    #[error("camera must be a string or number")]
    InvalidCamera,
    #[error("profile must be a string or number")]
    InvalidProfile,
    #[error("period must be a number")]
    InvalidPeriod,
    #[error("invalid request body: {0}")]
    MalformedBody(String),
    #[error("invalid query string: {0}")]
    MalformedQuery(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("API key not configured")]
    MissingCredential,
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("failed to encode upstream request: {0}")]
    Encode(#[from] serde_json::Error),
    /// The outbound call did not complete: connect, timeout, or unreadable body.
    #[error("{message}")]
    Transport { message: String, timed_out: bool },
}

impl GatewayError {
    /// The upstream URL is stripped so the dashboard never sees the internal host.
    pub fn transport(err: reqwest::Error) -> Self {
        let timed_out = err.is_timeout();
        GatewayError::Transport {
            message: error_chain(&err.without_url()),
            timed_out,
        }
    }

    /// The fleet-command reply completed but was not JSON.
    pub fn unreadable_reply(err: &serde_json::Error) -> Self {
        GatewayError::Transport {
            message: format!("invalid upstream response body: {err}"),
            timed_out: false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::MissingCredential
            | GatewayError::Address(_)
            | GatewayError::Encode(_)
            | GatewayError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Transport { timed_out: true, .. })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
