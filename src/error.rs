// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Only two of them end a run: `ConfigurationMissing` (before any remote
//! call) and `RemoteUnavailable` (while the inventory is being fetched).
//! Everything else is recovered at the granularity of a single entity and
//! reported through the progress sink.

use std::fmt;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
///
/// Instead of matching against magic strings like `"rate_limited"`,
/// the domain vocabulary is encoded in the type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded; back off and retry
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            401 => Self::Unauthorized,
            404 => Self::ObjectNotFound,
            503 => Self::ServiceUnavailable,
            _ => Self::HttpStatus(status),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError | Self::Conflict => {
                true
            }
            Self::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// The remote API call an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    ListEntities,
    ListEntityContent,
    CreateEntity,
    AppendContent,
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListEntities => write!(f, "list entities"),
            Self::ListEntityContent => write!(f, "list entity content"),
            Self::CreateEntity => write!(f, "create entity"),
            Self::AppendContent => write!(f, "append content"),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Remote service unavailable during {call}: {source}")]
    RemoteUnavailable {
        call: RemoteCall,
        #[source]
        source: Box<AppError>,
    },

    #[error("Failed to {call} for \"{entity}\": {message}")]
    EntityWriteFailed {
        call: RemoteCall,
        entity: String,
        message: String,
    },

    #[error("Inconsistent remote record {entity}: {reason}")]
    InconsistentRemoteRecord { entity: String, reason: String },

    #[error("Sync session is not current: {0}")]
    StaleSession(&'static str),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Remote call timed out: {call}")]
    Timeout { call: RemoteCall },

    #[error("Notion API returned an error ({code}): {message}")]
    NotionService {
        code: NotionErrorCode,
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),

    #[error(transparent)]
    NotionClient(#[from] NotionClientError),
}

impl AppError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Timeout { .. } => true,
            AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AppError::NotionService { code, .. } => code.is_retryable(),
            AppError::NotionClient(NotionClientError::NotionApi { code, .. }) => {
                NotionErrorCode::from_api_response(code).is_retryable()
            }
            AppError::NotionClient(NotionClientError::Transport { .. }) => true,
            _ => false,
        }
    }

    /// Whether the remote refused the request outright because of rate limiting.
    ///
    /// A rejected request was never applied, so even non-idempotent writes
    /// may be retried on this error.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AppError::NotionService { code, .. } => *code == NotionErrorCode::RateLimited,
            AppError::NotionClient(NotionClientError::NotionApi { code, .. }) => {
                NotionErrorCode::from_api_response(code) == NotionErrorCode::RateLimited
            }
            _ => false,
        }
    }

    /// Whether this error ends a run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            AppError::ConfigurationMissing(_) | AppError::RemoteUnavailable { .. }
        )
    }

    /// Wraps a transport-level error as an inventory failure.
    pub fn remote_unavailable(call: RemoteCall, source: AppError) -> Self {
        match source {
            already @ AppError::RemoteUnavailable { .. } => already,
            other => AppError::RemoteUnavailable {
                call,
                source: Box::new(other),
            },
        }
    }

    /// Maps a reqwest failure to a timeout for `call` when it is one.
    pub fn from_transport(call: RemoteCall, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout { call }
        } else {
            AppError::NetworkFailure(err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Notion client error mapping
#[derive(Error, Debug)]
pub enum NotionClientError {
    #[error("Failed to deserialize response: {source}\nBody: {body}")]
    Deserialization {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("HTTP transport error: {message}")]
    Transport { message: String },

    #[error("Notion API error ({status}): {code} - {message}")]
    NotionApi {
        status: u32,
        code: String,
        message: String,
        request_id: Option<String>,
    },
}

impl From<notion_client::objects::error::Error> for NotionClientError {
    fn from(error: notion_client::objects::error::Error) -> Self {
        Self::NotionApi {
            status: error.status,
            code: error.code,
            message: error.message,
            request_id: error.request_id,
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;
