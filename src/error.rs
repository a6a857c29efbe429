use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Malformed geocoding response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
    #[error("Response has no body")]
    EmptyBody,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Request body is not a valid address query: {0}")]
    InvalidBody(#[source] serde_json::Error),
    #[error("Address is required")]
    MissingAddress,
    #[error("Geocoding returned status {status} with {results} result(s): {}", .message.as_deref().unwrap_or("no message"))]
    NoMatch {
        status: String,
        results: usize,
        message: Option<String>,
    },
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),
}

#[derive(Error, Debug)]
pub enum PermitError {
    #[error("Request body is not a valid permit query: {0}")]
    InvalidBody(#[source] serde_json::Error),
    #[error("Location details are required")]
    MissingLocation,
    /// The chat service answered, but not with a usable stream.
    #[error("Chat service rejected the request: {0}")]
    Upstream(#[source] ChatError),
    /// The chat request never produced a response.
    #[error("Chat request failed: {0}")]
    Transport(#[source] ChatError),
}

impl From<ChatError> for PermitError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Http(_) => Self::Transport(err),
            other => Self::Upstream(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unreadable event stream line: {0}")]
    Lines(#[from] tokio_util::codec::LinesCodecError),
    #[error("Malformed event payload: {0}. Raw payload: {1}")]
    Json(#[source] serde_json::Error, String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Error returned by the HTTP routes. Every variant carries the fixed message
/// shown to the browser; the underlying cause is logged when converting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: &'static str,
    },
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Upstream { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match *self {
            Self::Validation(message) | Self::Internal(message) => message,
            Self::Upstream { message, .. } => message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message() }));
        (self.status(), body).into_response()
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::MissingAddress => Self::Validation("Address is required"),
            ResolveError::NoMatch { .. } => {
                warn!(error = %err, "Address did not resolve");
                Self::Upstream {
                    status: StatusCode::BAD_REQUEST,
                    message: "Invalid address or API error",
                }
            }
            ResolveError::InvalidBody(_) | ResolveError::Geocode(_) => {
                error!(error = %err, "Location lookup failed");
                Self::Internal("Failed to retrieve location data")
            }
        }
    }
}

impl From<PermitError> for ApiError {
    fn from(err: PermitError) -> Self {
        match err {
            PermitError::MissingLocation => Self::Validation("Location details are required"),
            PermitError::Upstream(_) => {
                error!(error = %err, "Permit query rejected upstream");
                Self::Upstream {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "Failed to get permit info",
                }
            }
            PermitError::InvalidBody(_) | PermitError::Transport(_) => {
                error!(error = %err, "Permit query failed");
                Self::Internal("Failed to retrieve permit information")
            }
        }
    }
}
