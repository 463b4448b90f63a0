//! Error Taxonomy
//!
//! `ApiError` is the only error shape exposed to HTTP callers. Its `code`
//! fixes the status; validation errors additionally carry field violations.
//! `ContractError` covers host-level failures (policy loading).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::messages::Locale;
use crate::model::{iso8601, ErrorCode, ImageFormat};

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Policy requires contract >= {0}, current is {1}")]
    ContractVersionMismatch(String, String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ContractError>;

/// One failed field check. `field` is a dotted path such as `items[0].name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    #[serde(default)]
    pub value: Value,
    pub constraint: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, value: Value, constraint: impl Into<String>) -> Self {
        Self { field: field.into(), value, constraint: constraint.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status_code: code.http_status(),
            details: None,
            timestamp: Utc::now(),
            request_id: None,
            violations: vec![],
        }
    }

    /// Error for `code` carrying the default locale's user-facing message.
    pub fn from_code(code: ErrorCode, request_id: Option<&str>) -> Self {
        Self::new(code, Locale::default().message(code)).with_request_id(request_id)
    }

    pub fn with_request_id(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_string);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    /// Invalid-request error listing every failed field, in order.
    pub fn validation(violations: Vec<FieldViolation>, request_id: Option<&str>) -> Self {
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        let message = if fields.is_empty() {
            "Request validation failed".to_string()
        } else {
            format!("Request validation failed: {}", fields.join(", "))
        };

        let mut error = Self::new(ErrorCode::InvalidRequest, message).with_request_id(request_id);
        error.violations = violations;
        error
    }

    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::InvalidRequest && !self.violations.is_empty()
    }

    pub fn localized_message(&self) -> &'static str {
        Locale::default().message(self.code)
    }

    pub fn detailed_message(&self) -> String {
        Locale::default().detailed_message(self.code, self.details.as_ref())
    }

    pub fn suggestion(&self) -> &'static str {
        Locale::default().suggestion(self.code)
    }

    // --- Factories ---

    pub fn invalid_format(received_format: &str, request_id: Option<&str>) -> Self {
        let supported: Vec<&str> = ImageFormat::ALL.iter().map(|f| f.as_str()).collect();
        Self::new(
            ErrorCode::InvalidFormat,
            format!(
                "Unsupported image format '{}'. Supported formats: {}",
                received_format,
                supported.join(", ")
            ),
        )
        .with_detail("receivedFormat", received_format)
        .with_detail("supportedFormats", json!(supported))
        .with_request_id(request_id)
    }

    pub fn file_too_large(file_size: u64, max_size: u64, request_id: Option<&str>) -> Self {
        Self::new(
            ErrorCode::FileTooLarge,
            format!(
                "File size {} bytes exceeds the maximum of {} bytes",
                file_size, max_size
            ),
        )
        .with_detail("fileSize", file_size)
        .with_detail("maxSize", max_size)
        .with_request_id(request_id)
    }

    pub fn poor_image_quality(
        quality_score: Option<f64>,
        issues: &[String],
        request_id: Option<&str>,
    ) -> Self {
        let mut message = "Image quality is too low for reliable text extraction".to_string();
        if !issues.is_empty() {
            message.push_str(&format!(": {}", issues.join(", ")));
        }

        let mut error = Self::new(ErrorCode::PoorImageQuality, message)
            .with_detail("issues", json!(issues));
        if let Some(score) = quality_score {
            error = error.with_detail("qualityScore", score);
        }
        error.with_request_id(request_id)
    }

    pub fn no_text_detected(request_id: Option<&str>) -> Self {
        Self::new(ErrorCode::NoTextDetected, "No text could be detected in the image")
            .with_request_id(request_id)
    }

    pub fn rate_limit_exceeded(limit: u32, retry_after_secs: u64, request_id: Option<&str>) -> Self {
        Self::new(
            ErrorCode::RateLimitExceeded,
            format!(
                "Rate limit of {} requests exceeded. Retry after {} seconds",
                limit, retry_after_secs
            ),
        )
        .with_detail("limit", limit)
        .with_detail("retryAfter", retry_after_secs)
        .with_request_id(request_id)
    }

    /// `cause` may contain internal diagnostics; the HTTP layer redacts it.
    pub fn processing_error(stage: &str, cause: Option<&str>, request_id: Option<&str>) -> Self {
        let message = match cause {
            Some(cause) => format!("Processing failed during {}: {}", stage, cause),
            None => format!("Processing failed during {}", stage),
        };

        let mut error = Self::new(ErrorCode::ProcessingError, message).with_detail("stage", stage);
        if let Some(cause) = cause {
            error = error.with_detail("cause", cause);
        }
        error.with_request_id(request_id)
    }

    pub fn service_unavailable(service: &str, request_id: Option<&str>) -> Self {
        Self::new(
            ErrorCode::ServiceUnavailable,
            format!("Service '{}' is temporarily unavailable", service),
        )
        .with_detail("service", service)
        .with_request_id(request_id)
    }

    pub fn unauthorized(reason: Option<&str>, request_id: Option<&str>) -> Self {
        let mut error = Self::new(
            ErrorCode::Unauthorized,
            match reason {
                Some(reason) => format!("Unauthorized: {}", reason),
                None => "Missing or invalid credentials".to_string(),
            },
        );
        if let Some(reason) = reason {
            error = error.with_detail("reason", reason);
        }
        error.with_request_id(request_id)
    }
}

/// Status for a raw code token. Tokens outside the enumeration map to 500.
pub fn http_status_from_code(code: &str) -> u16 {
    match code.parse::<ErrorCode>() {
        Ok(code) => code.http_status(),
        Err(err) => {
            tracing::warn!(%err, "Falling back to status 500");
            500
        }
    }
}
