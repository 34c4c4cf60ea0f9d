//! Forwarding failures and their HTTP shapes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::util::timestamp;

/// The two ways a forward can fail. Neither is retried.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// No `{SERVICE}_WEBHOOK_URL` exists for the requested service.
    #[error("service '{service}' is not configured")]
    UnconfiguredService {
        service: String,
        available: Vec<String>,
    },

    /// The single outbound attempt failed before a full response was read.
    #[error("forwarding to service '{service}' failed: {message}")]
    ForwardingFailed {
        service: String,
        message: String,
        timed_out: bool,
    },
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::UnconfiguredService { .. } => StatusCode::NOT_FOUND,
            ForwardError::ForwardingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn from_reqwest(service: &str, error: reqwest::Error) -> Self {
        ForwardError::ForwardingFailed {
            service: service.to_string(),
            message: error.to_string(),
            timed_out: error.is_timeout(),
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ForwardError::UnconfiguredService { service, available } => json!({
                "error": "Service not configured",
                "message": self.to_string(),
                "service": service,
                "availableServices": available,
                "timestamp": timestamp(),
            }),
            ForwardError::ForwardingFailed { message, .. } => json!({
                "error": "Failed to forward webhook",
                "message": message,
                "timestamp": timestamp(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
