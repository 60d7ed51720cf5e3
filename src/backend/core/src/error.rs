//! Error handling for the panel API.
//!
//! This module provides:
//! - A single crate-wide error type carrying a machine-readable code
//! - HTTP status and exception-name mapping for API responses
//! - User-facing messages kept apart from internal diagnostics
//! - Logging and metrics hooks invoked when an error becomes a response
//!
//! Every failure leaves the API in the same envelope:
//!
//! ```json
//! {"errors":[{"code":"NotFoundHttpException","status":"404","detail":"..."}]}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Result Type Alias
// ═══════════════════════════════════════════════════════════════════════════════

/// A specialized Result type for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Detail rendered for every 404, whatever the missing resource was.
pub const NOT_FOUND_DETAIL: &str = "The requested resource could not be found on the server.";

/// Detail rendered for every 403.
pub const ACCESS_DENIED_DETAIL: &str = "This action is unauthorized.";

/// Detail rendered for every 401.
pub const UNAUTHENTICATED_DETAIL: &str = "Unauthenticated.";

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup
    NotFound,

    // Authentication / authorization
    Unauthenticated,
    AccessDenied,

    // Request validation
    ValidationError,
    InvalidFilterQuery,
    InvalidSortQuery,

    // Storage
    DatabaseError,
    DatabaseConnectionFailed,

    // Serialization
    SerializationError,

    // Configuration
    ConfigurationError,
    InvalidConfiguration,

    // Internal
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidFilterQuery | Self::InvalidSortQuery => StatusCode::BAD_REQUEST,
            Self::DatabaseConnectionFailed => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError
            | Self::SerializationError
            | Self::ConfigurationError
            | Self::InvalidConfiguration
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Exception name rendered in the `code` field of an error body.
    pub const fn exception_name(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFoundHttpException",
            Self::Unauthenticated => "AuthenticationException",
            Self::AccessDenied => "AccessDeniedHttpException",
            Self::ValidationError => "ValidationException",
            Self::InvalidFilterQuery => "InvalidFilterQuery",
            Self::InvalidSortQuery => "InvalidSortQuery",
            Self::DatabaseConnectionFailed => "ServiceUnavailableHttpException",
            Self::DatabaseError
            | Self::SerializationError
            | Self::ConfigurationError
            | Self::InvalidConfiguration
            | Self::InternalError => "HttpException",
        }
    }

    /// Get the error category for grouping.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::NotFound => "lookup",
            Self::Unauthenticated | Self::AccessDenied => "authentication",
            Self::ValidationError | Self::InvalidFilterQuery | Self::InvalidSortQuery => {
                "validation"
            }
            Self::DatabaseError | Self::DatabaseConnectionFailed => "database",
            Self::SerializationError => "serialization",
            Self::ConfigurationError | Self::InvalidConfiguration => "configuration",
            Self::InternalError => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Severity
// ═══════════════════════════════════════════════════════════════════════════════

/// Severity level for errors (affects logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Caller errors (bad input, missing records, denied scopes)
    Low,
    /// Authentication failures worth watching
    Medium,
    /// System errors (database failures, serialization bugs)
    High,
    /// Errors requiring immediate attention
    Critical,
}

impl ErrorSeverity {
    /// Get severity based on error code.
    pub const fn from_code(code: &ErrorCode) -> Self {
        match code {
            ErrorCode::NotFound
            | ErrorCode::AccessDenied
            | ErrorCode::ValidationError
            | ErrorCode::InvalidFilterQuery
            | ErrorCode::InvalidSortQuery => Self::Low,

            ErrorCode::Unauthenticated => Self::Medium,

            ErrorCode::DatabaseError
            | ErrorCode::SerializationError
            | ErrorCode::ConfigurationError
            | ErrorCode::InvalidConfiguration => Self::High,

            ErrorCode::DatabaseConnectionFailed | ErrorCode::InternalError => Self::Critical,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Details
// ═══════════════════════════════════════════════════════════════════════════════

/// Validation metadata attached to an error body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMeta {
    /// Request field that failed validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_field: Option<String>,

    /// Rule the field violated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl ErrorMeta {
    pub fn new(source_field: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            source_field: Some(source_field.into()),
            rule: Some(rule.into()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The main error type for the panel API.
///
/// The user message is the only text that reaches clients; the internal
/// message and source chain are for logs.
#[derive(Error, Debug)]
pub struct PanelError {
    /// Machine-readable error code
    code: ErrorCode,

    /// User-facing message (safe to expose to clients)
    user_message: Cow<'static, str>,

    /// Detailed internal message (for logging only)
    internal_message: Option<String>,

    /// Validation metadata
    meta: Option<ErrorMeta>,

    /// The source error that caused this error
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl PanelError {
    // ─────────────────────────────────────────────────────────────────────────
    // Constructors
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new error with code and user message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            meta: None,
            source: None,
        }
    }

    /// Create an error with both user and internal messages.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Create an internal error (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An unexpected error was encountered while processing this request, please try again.",
            message,
        )
    }

    /// Create a not found error.
    ///
    /// The entity description only reaches the logs; the client always
    /// sees the same detail.
    pub fn not_found(entity_type: &str, entity_id: impl fmt::Display) -> Self {
        Self::with_internal(
            ErrorCode::NotFound,
            NOT_FOUND_DETAIL,
            format!("{} {} does not exist", entity_type, entity_id),
        )
    }

    /// Create an access denied error (403).
    pub fn access_denied(reason: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::AccessDenied, ACCESS_DENIED_DETAIL, reason)
    }

    /// Create an unauthenticated error (401).
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::Unauthenticated, UNAUTHENTICATED_DETAIL, reason)
    }

    /// Create a validation error for a single request field.
    pub fn validation(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorCode::ValidationError, message).with_meta(ErrorMeta::new(field, rule))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach validation metadata.
    pub fn with_meta(mut self, meta: ErrorMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Add internal message.
    pub fn with_internal_message(mut self, message: impl Into<String>) -> Self {
        self.internal_message = Some(message.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    pub fn meta(&self) -> Option<&ErrorMeta> {
        self.meta.as_ref()
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::from_code(&self.code)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Logging
    // ─────────────────────────────────────────────────────────────────────────

    /// Log this error with appropriate severity.
    pub fn log(&self) {
        let code = self.code.to_string();
        let category = self.code.category();
        let status = self.http_status().as_u16();

        match self.severity() {
            ErrorSeverity::Critical => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "CRITICAL ERROR"
                );
            }
            ErrorSeverity::High => {
                error!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "High severity error"
                );
            }
            ErrorSeverity::Medium => {
                warn!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    internal_message = ?self.internal_message,
                    "Medium severity error"
                );
            }
            ErrorSeverity::Low => {
                tracing::debug!(
                    error_code = %code,
                    category = category,
                    http_status = status,
                    internal_message = ?self.internal_message,
                    "Low severity error"
                );
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metrics
    // ─────────────────────────────────────────────────────────────────────────

    fn record_metrics(&self) {
        counter!(
            "panel_errors_total",
            "code" => self.code.to_string(),
            "category" => self.code.category(),
            "status" => self.http_status().as_u16().to_string(),
        )
        .increment(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error body returned to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorInfo>,
}

/// One entry of the `errors` array.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Exception name, e.g. `NotFoundHttpException`
    pub code: String,

    /// HTTP status rendered as a string
    pub status: String,

    /// User-facing detail
    pub detail: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ErrorMeta>,
}

impl From<&PanelError> for ErrorResponse {
    fn from(error: &PanelError) -> Self {
        Self {
            errors: vec![ErrorInfo {
                code: error.code.exception_name().to_string(),
                status: error.http_status().as_u16().to_string(),
                detail: error.user_message.to_string(),
                meta: error.meta.clone(),
            }],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Integration
// ═══════════════════════════════════════════════════════════════════════════════

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        self.log();
        self.record_metrics();

        let status = self.http_status();
        let response = ErrorResponse::from(&self);

        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Error Context Extension Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Wrap the failure as an internal error with the given message.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Wrap the failure with a specific error code.
    fn with_error_code(self, code: ErrorCode) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| PanelError::internal(message.into()).with_source(e))
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.map_err(|e| PanelError::new(code, e.to_string()).with_source(e))
    }
}

impl<T> ErrorContext<T> for Option<T> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| {
            PanelError::with_internal(ErrorCode::NotFound, NOT_FOUND_DETAIL, message.into())
        })
    }

    fn with_error_code(self, code: ErrorCode) -> Result<T> {
        self.ok_or_else(|| PanelError::new(code, NOT_FOUND_DETAIL))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations for Common Error Types
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for PanelError {
    fn from(error: sqlx::Error) -> Self {
        let (code, user_msg) = match &error {
            sqlx::Error::RowNotFound => (ErrorCode::NotFound, NOT_FOUND_DETAIL),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => (
                ErrorCode::DatabaseConnectionFailed,
                "The panel is temporarily unable to reach its database.",
            ),
            _ => (ErrorCode::DatabaseError, "A database error occurred."),
        };

        Self::with_internal(code, user_msg, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for PanelError {
    fn from(error: serde_json::Error) -> Self {
        Self::with_internal(
            ErrorCode::SerializationError,
            "Failed to process JSON data.",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<std::io::Error> for PanelError {
    fn from(error: std::io::Error) -> Self {
        Self::with_internal(
            ErrorCode::InternalError,
            "An I/O error occurred.",
            error.to_string(),
        )
        .with_source(error)
    }
}

impl From<anyhow::Error> for PanelError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<PanelError>() {
            Ok(panel_error) => panel_error,
            Err(error) => Self::internal(error.to_string()),
        }
    }
}

impl From<config::ConfigError> for PanelError {
    fn from(error: config::ConfigError) -> Self {
        let code = match &error {
            config::ConfigError::PathParse(_) | config::ConfigError::FileParse { .. } => {
                ErrorCode::InvalidConfiguration
            }
            _ => ErrorCode::ConfigurationError,
        };

        Self::with_internal(code, "Configuration error occurred.", error.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::AccessDenied.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::Unauthenticated.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorCode::ValidationError.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::InvalidFilterQuery.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_hides_entity() {
        let error = PanelError::not_found("location", 42);
        let body = ErrorResponse::from(&error);

        assert_eq!(body.errors.len(), 1);
        assert_eq!(body.errors[0].code, "NotFoundHttpException");
        assert_eq!(body.errors[0].status, "404");
        assert_eq!(body.errors[0].detail, NOT_FOUND_DETAIL);
        assert_eq!(error.internal_message(), Some("location 42 does not exist"));
    }

    #[test]
    fn test_access_denied_body() {
        let error = PanelError::access_denied("key lacks r_locations");
        let body = serde_json::to_value(ErrorResponse::from(&error)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "errors": [{
                    "code": "AccessDeniedHttpException",
                    "status": "403",
                    "detail": "This action is unauthorized."
                }]
            })
        );
    }

    #[test]
    fn test_validation_error_carries_meta() {
        let error = PanelError::validation("per_page", "integer", "The per page must be an integer.");
        let body = serde_json::to_value(ErrorResponse::from(&error)).unwrap();

        assert_eq!(body["errors"][0]["status"], "422");
        assert_eq!(body["errors"][0]["meta"]["source_field"], "per_page");
        assert_eq!(body["errors"][0]["meta"]["rule"], "integer");
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(ErrorSeverity::from_code(&ErrorCode::NotFound), ErrorSeverity::Low);
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::Unauthenticated),
            ErrorSeverity::Medium
        );
        assert_eq!(
            ErrorSeverity::from_code(&ErrorCode::DatabaseConnectionFailed),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn test_option_context() {
        let missing: Option<u32> = None;
        let error = missing.context("server 7").unwrap_err();

        assert_eq!(error.code(), ErrorCode::NotFound);
        assert_eq!(error.user_message(), NOT_FOUND_DETAIL);
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_code() {
        let original = PanelError::access_denied("nope");
        let wrapped: anyhow::Error = original.into();
        let recovered = PanelError::from(wrapped);

        assert_eq!(recovered.code(), ErrorCode::AccessDenied);
    }

    #[test]
    fn test_display_includes_internal() {
        let error = PanelError::internal("pool exhausted");
        let text = error.to_string();

        assert!(text.contains("InternalError"));
        assert!(text.contains("pool exhausted"));
    }
}
