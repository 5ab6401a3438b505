//! Response envelope and request outcomes
//!
//! Every response body is one of:
//!
//! ```text
//! { "data": <payload> }
//! { "errors": ["SOME_ERROR_CODE"] }
//! ```
//!
//! An [`Outcome`] is the single terminal result of a request. It is consumed by
//! value when written, so a response can only be produced once per outcome.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code returned for unclassified failures
pub const INTERNAL_SERVER_ERROR: &str = "INTERNAL_SERVER_ERROR";

/// Code returned when the request deadline elapses
pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";

/// Code returned for an unsupported method on a known route
pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";

/// Code returned when the query string cannot be read at all
pub const INVALID_QUERY: &str = "INVALID_QUERY";

const INTERNAL_BODY: &[u8] = br#"{"errors":["INTERNAL_SERVER_ERROR"]}"#;

/// Terminal result of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Serialized payload with a 2xx status
    Success {
        /// Payload written under `data`
        payload: Value,
        /// Response status, 200 unless the endpoint says otherwise
        status: StatusCode,
    },
    /// Expected failure with a public code
    ClientError {
        /// Code written under `errors`
        code: &'static str,
        /// Status assigned by the endpoint or its classification table
        status: StatusCode,
    },
    /// Unclassified failure; details are only ever logged
    InternalError,
    /// Deadline elapsed before the worker reported
    Timeout,
}

impl Outcome {
    /// Successful outcome with status 200
    ///
    /// Falls back to [`Outcome::InternalError`] if the payload cannot be serialized.
    pub fn success<T: Serialize>(payload: &T) -> Self {
        Self::success_with_status(payload, StatusCode::OK)
    }

    /// Successful outcome with a caller-chosen 2xx status
    pub fn success_with_status<T: Serialize>(payload: &T, status: StatusCode) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => Self::Success { payload, status },
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response payload");
                Self::InternalError
            }
        }
    }

    /// Client error with a public code
    pub fn client_error(code: &'static str, status: StatusCode) -> Self {
        Self::ClientError { code, status }
    }

    /// HTTP status for this outcome
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success { status, .. } | Self::ClientError { status, .. } => *status,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Uniform JSON wrapper for all responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    /// Payload on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error codes on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> Envelope<T> {
    /// Envelope carrying a payload
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    /// Envelope carrying error codes
    pub fn errors(errors: Vec<String>) -> Self {
        Self {
            data: None,
            errors: Some(errors),
        }
    }
}

/// Serialize an outcome into its status and body
pub fn write(outcome: Outcome) -> (StatusCode, Vec<u8>) {
    let status = outcome.status();
    let body = match outcome {
        Outcome::Success { payload, .. } => serde_json::to_vec(&Envelope::data(payload)),
        Outcome::ClientError { code, .. } => {
            serde_json::to_vec(&Envelope::<Value>::errors(vec![code.to_string()]))
        }
        Outcome::InternalError => return (status, INTERNAL_BODY.to_vec()),
        Outcome::Timeout => {
            serde_json::to_vec(&Envelope::<Value>::errors(vec![REQUEST_TIMEOUT.to_string()]))
        }
    };

    match body {
        Ok(body) => (status, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response envelope");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_BODY.to_vec())
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let (status, body) = write(self);
        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
