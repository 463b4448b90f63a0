//! Domain Model - Closed Enumerations and Contract Records
//!
//! Every record is an immutable value. Changing a field means building a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ApiError;

/// Error returned when a token is not a member of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub enumeration: &'static str,
    pub token: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {}: '{}'", self.enumeration, self.token)
    }
}

impl std::error::Error for UnknownVariant {}

// --- Enumerations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReceiptStatus {
    pub const ALL: [ReceiptStatus; 4] = [
        ReceiptStatus::Pending,
        ReceiptStatus::Processing,
        ReceiptStatus::Completed,
        ReceiptStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptStatus::Pending => "pending",
            ReceiptStatus::Processing => "processing",
            ReceiptStatus::Completed => "completed",
            ReceiptStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReceiptStatus::Completed | ReceiptStatus::Failed)
    }

    /// Lifecycle only moves forward: pending -> processing -> completed | failed.
    pub fn can_transition_to(self, next: ReceiptStatus) -> bool {
        matches!(
            (self, next),
            (ReceiptStatus::Pending, ReceiptStatus::Processing)
                | (ReceiptStatus::Processing, ReceiptStatus::Completed)
                | (ReceiptStatus::Processing, ReceiptStatus::Failed)
        )
    }
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReceiptStatus::Pending),
            "processing" => Ok(ReceiptStatus::Processing),
            "completed" => Ok(ReceiptStatus::Completed),
            "failed" => Ok(ReceiptStatus::Failed),
            other => Err(UnknownVariant { enumeration: "receipt status", token: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptType {
    Retail,
    CardPayment,
    CashRegister,
    Unknown,
}

impl ReceiptType {
    pub const ALL: [ReceiptType; 4] = [
        ReceiptType::Retail,
        ReceiptType::CardPayment,
        ReceiptType::CashRegister,
        ReceiptType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptType::Retail => "retail",
            ReceiptType::CardPayment => "card_payment",
            ReceiptType::CashRegister => "cash_register",
            ReceiptType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiptType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retail" => Ok(ReceiptType::Retail),
            "card_payment" => Ok(ReceiptType::CardPayment),
            "cash_register" => Ok(ReceiptType::CashRegister),
            "unknown" => Ok(ReceiptType::Unknown),
            other => Err(UnknownVariant { enumeration: "receipt type", token: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Pdf,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Pdf];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "pdf" => Ok(ImageFormat::Pdf),
            other => Err(UnknownVariant { enumeration: "image format", token: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidFormat,
    FileTooLarge,
    InvalidRequest,
    Unauthorized,
    PoorImageQuality,
    NoTextDetected,
    RateLimitExceeded,
    ProcessingError,
    ServiceUnavailable,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::InvalidFormat,
        ErrorCode::FileTooLarge,
        ErrorCode::InvalidRequest,
        ErrorCode::Unauthorized,
        ErrorCode::PoorImageQuality,
        ErrorCode::NoTextDetected,
        ErrorCode::RateLimitExceeded,
        ErrorCode::ProcessingError,
        ErrorCode::ServiceUnavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidFormat => "invalid_format",
            ErrorCode::FileTooLarge => "file_too_large",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::PoorImageQuality => "poor_image_quality",
            ErrorCode::NoTextDetected => "no_text_detected",
            ErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            ErrorCode::ProcessingError => "processing_error",
            ErrorCode::ServiceUnavailable => "service_unavailable",
        }
    }

    /// Canonical HTTP status for the code.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::InvalidFormat | ErrorCode::FileTooLarge | ErrorCode::InvalidRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::PoorImageQuality | ErrorCode::NoTextDetected => 422,
            ErrorCode::RateLimitExceeded => 429,
            ErrorCode::ProcessingError => 500,
            ErrorCode::ServiceUnavailable => 503,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownVariant { enumeration: "error code", token: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

impl HealthStatus {
    pub const ALL: [HealthStatus; 3] = [HealthStatus::Healthy, HealthStatus::Unhealthy, HealthStatus::Degraded];

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Degraded => "degraded",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthStatus::Healthy),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            "degraded" => Ok(HealthStatus::Degraded),
            other => Err(UnknownVariant { enumeration: "health status", token: other.to_string() }),
        }
    }
}

// --- Timestamps ---

/// Canonical ISO-8601 timestamps: `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Timelike, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(instant: &DateTime<Utc>) -> String {
        instant.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Leap seconds (`:60`) are not instants and are rejected.
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .filter(|dt| dt.nanosecond() < 1_000_000_000)
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(instant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid ISO-8601 timestamp: {raw}")))
    }
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub format: ImageFormat,
    /// Size in bytes.
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptAnalysisRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub image_url: String,
    pub image_metadata: ImageMetadata,
    pub status: ReceiptStatus,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    pub updated_at: DateTime<Utc>,
}

/// A single extracted value with the engine's confidence (0.0-1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField<T> {
    pub value: T,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountField {
    pub value: f64,
    pub currency: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(default)]
    pub total_amount: Option<AmountField>,
    #[serde(default)]
    pub date: Option<ExtractedField<String>>,
    #[serde(default)]
    pub merchant_name: Option<ExtractedField<String>>,
    pub items: Vec<ReceiptItem>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    /// Elapsed milliseconds.
    pub processing_time: f64,
    pub ocr_confidence: f64,
    pub ai_confidence: f64,
    pub image_preprocessed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedReceiptData {
    pub request_id: Uuid,
    pub receipt_type: ReceiptType,
    pub extracted_fields: ExtractedFields,
    pub processing_metadata: ProcessingMetadata,
    #[serde(with = "iso8601")]
    pub extracted_at: DateTime<Utc>,
}

/// Response envelope. `error` is present iff `success` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub request_id: String,
    pub processing_time: f64,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
}

impl<T> AnalysisResponse<T> {
    pub fn success(request_id: impl Into<String>, data: T, processing_time: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: request_id.into(),
            processing_time,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(request_id: impl Into<String>, error: ApiError, processing_time: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            request_id: request_id.into(),
            processing_time,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub database: bool,
    pub cache: bool,
    pub ocr: bool,
    pub storage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub services: ServiceHealth,
    pub version: String,
    /// Seconds since start.
    pub uptime: f64,
}

impl HealthCheckResponse {
    /// Database and OCR are required for analysis; the rest only degrade it.
    pub fn from_services(services: ServiceHealth, version: impl Into<String>, uptime: f64) -> Self {
        let status = if services.database && services.cache && services.ocr && services.storage {
            HealthStatus::Healthy
        } else if !services.database || !services.ocr {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        };

        Self { status, services, version: version.into(), uptime }
    }
}
