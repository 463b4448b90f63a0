//! Structural Guards - Parse, Don't Just Check
//!
//! Each guard walks an untyped JSON value field by field and either builds
//! the typed record or returns every violation found, with dotted paths.
//! No field is skipped once an earlier one fails.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{ApiError, FieldViolation};
use crate::model::{
    iso8601, AmountField, AnalysisResponse, ErrorCode, ExtractedField, ExtractedFields,
    ExtractedReceiptData, HealthCheckResponse, HealthStatus, ImageFormat, ImageMetadata,
    ProcessingMetadata, ReceiptAnalysisRequest, ReceiptItem, ReceiptStatus, ReceiptType,
    ServiceHealth,
};
use crate::policy::ValidationPolicy;
use crate::validation::{
    is_valid_confidence, is_valid_currency, is_valid_iso_date, is_valid_mime_type, is_valid_uuid,
    normalize_currency,
};

pub type Parsed<T> = std::result::Result<T, Vec<FieldViolation>>;

const ROOT: &str = "$";

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Accumulates violations while a guard walks a value.
pub(crate) struct Checker<'p> {
    policy: &'p ValidationPolicy,
    violations: Vec<FieldViolation>,
}

impl<'p> Checker<'p> {
    pub(crate) fn new(policy: &'p ValidationPolicy) -> Self {
        Self { policy, violations: vec![] }
    }

    pub(crate) fn push(&mut self, path: &str, value: &Value, constraint: impl Into<String>) {
        let field = if path.is_empty() { ROOT } else { path };
        self.violations.push(FieldViolation::new(field, value.clone(), constraint));
    }

    pub(crate) fn finish<T>(mut self, root: &Value, parsed: Option<T>, type_name: &str) -> Parsed<T> {
        match parsed {
            Some(value) if self.violations.is_empty() => Ok(value),
            _ => {
                if self.violations.is_empty() {
                    self.push("", root, format!("must be a valid {}", type_name));
                }
                tracing::debug!(
                    type_name,
                    violations = self.violations.len(),
                    "Structural guard rejected value"
                );
                Err(self.violations)
            }
        }
    }

    // --- Field access ---

    pub(crate) fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.push(path, value, "must be an object");
        }
        obj
    }

    /// Missing and `null` both count as absent.
    pub(crate) fn required<'v, T>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
        check: impl FnOnce(&mut Self, &'v Value, &str) -> Option<T>,
    ) -> Option<T> {
        let field_path = join(path, key);
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.push(&field_path, &Value::Null, "is required");
                None
            }
            Some(value) => check(self, value, &field_path),
        }
    }

    /// `Some(None)` when absent, `None` when present but invalid.
    pub(crate) fn optional<'v, T>(
        &mut self,
        obj: &'v Map<String, Value>,
        path: &str,
        key: &str,
        check: impl FnOnce(&mut Self, &'v Value, &str) -> Option<T>,
    ) -> Option<Option<T>> {
        match obj.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(value) => check(self, value, &join(path, key)).map(Some),
        }
    }

    fn array<T>(
        &mut self,
        value: &Value,
        path: &str,
        mut each: impl FnMut(&mut Self, &Value, &str) -> Option<T>,
    ) -> Option<Vec<T>> {
        let Some(items) = value.as_array() else {
            self.push(path, value, "must be an array");
            return None;
        };

        let parsed: Vec<Option<T>> = items
            .iter()
            .enumerate()
            .map(|(idx, item)| each(self, item, &format!("{}[{}]", path, idx)))
            .collect();
        parsed.into_iter().collect()
    }

    // --- Primitive checks ---

    pub(crate) fn string(&mut self, value: &Value, path: &str) -> Option<String> {
        match value.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.push(path, value, "must be a string");
                None
            }
        }
    }

    pub(crate) fn non_empty_string(&mut self, value: &Value, path: &str) -> Option<String> {
        let s = self.string(value, path)?;
        if s.trim().is_empty() {
            self.push(path, value, "must not be empty");
            return None;
        }
        Some(s)
    }

    fn boolean(&mut self, value: &Value, path: &str) -> Option<bool> {
        let b = value.as_bool();
        if b.is_none() {
            self.push(path, value, "must be a boolean");
        }
        b
    }

    fn number(&mut self, value: &Value, path: &str) -> Option<f64> {
        let n = value.as_f64();
        if n.is_none() {
            self.push(path, value, "must be a number");
        }
        n
    }

    fn non_negative(&mut self, value: &Value, path: &str) -> Option<f64> {
        let n = self.number(value, path)?;
        if n < 0.0 {
            self.push(path, value, "must be greater than or equal to 0");
            return None;
        }
        Some(n)
    }

    fn confidence(&mut self, value: &Value, path: &str) -> Option<f64> {
        let n = self.number(value, path)?;
        if !is_valid_confidence(n) {
            self.push(path, value, "must be between 0 and 1");
            return None;
        }
        Some(n)
    }

    fn amount(&mut self, value: &Value, path: &str) -> Option<f64> {
        let n = self.number(value, path)?;
        if !self.policy.accepts_amount(n) {
            let constraint = format!("must be between 0 and {}", self.policy.max_amount);
            self.push(path, value, constraint);
            return None;
        }
        Some(n)
    }

    fn quantity(&mut self, value: &Value, path: &str) -> Option<f64> {
        let n = self.number(value, path)?;
        if n <= 0.0 {
            self.push(path, value, "must be greater than 0");
            return None;
        }
        Some(n)
    }

    fn image_size(&mut self, value: &Value, path: &str) -> Option<u64> {
        let size = value.as_u64().filter(|&s| self.policy.accepts_image_size(s as f64));
        if size.is_none() {
            let constraint = format!(
                "must be an integer between 1 and {} bytes",
                self.policy.max_image_size_bytes
            );
            self.push(path, value, constraint);
        }
        size
    }

    fn dimension(&mut self, value: &Value, path: &str) -> Option<u32> {
        let dim = value
            .as_u64()
            .filter(|&d| d > 0)
            .and_then(|d| u32::try_from(d).ok());
        if dim.is_none() {
            self.push(path, value, "must be a positive integer");
        }
        dim
    }

    pub(crate) fn uuid(&mut self, value: &Value, path: &str) -> Option<Uuid> {
        let parsed = value
            .as_str()
            .filter(|s| is_valid_uuid(s))
            .and_then(|s| Uuid::parse_str(s).ok());
        if parsed.is_none() {
            self.push(path, value, "must be a valid UUID");
        }
        parsed
    }

    fn timestamp(&mut self, value: &Value, path: &str) -> Option<DateTime<Utc>> {
        let parsed = value
            .as_str()
            .filter(|s| is_valid_iso_date(s))
            .and_then(iso8601::parse);
        if parsed.is_none() {
            self.push(path, value, "must be an ISO-8601 timestamp (YYYY-MM-DDTHH:MM:SS.sssZ)");
        }
        parsed
    }

    pub(crate) fn token<E: FromStr>(&mut self, value: &Value, path: &str, allowed: &[&str]) -> Option<E> {
        let parsed = value.as_str().and_then(|s| s.parse::<E>().ok());
        if parsed.is_none() {
            self.push(path, value, format!("must be one of: {}", allowed.join(", ")));
        }
        parsed
    }

    fn mime_type(&mut self, value: &Value, path: &str) -> Option<String> {
        let mime = self.string(value, path)?;
        if !is_valid_mime_type(&mime) {
            self.push(path, value, "must be a supported MIME type");
            return None;
        }
        Some(mime)
    }

    fn currency(&mut self, value: &Value, path: &str) -> Option<String> {
        let currency = self.string(value, path)?;
        if !is_valid_currency(&currency) {
            self.push(path, value, "must be one of: EUR, USD, GBP, CAD, CHF");
            return None;
        }
        Some(normalize_currency(&currency))
    }
}

fn receipt_status_tokens() -> [&'static str; 4] {
    ReceiptStatus::ALL.map(ReceiptStatus::as_str)
}

pub(crate) fn receipt_type_tokens() -> [&'static str; 4] {
    ReceiptType::ALL.map(ReceiptType::as_str)
}

fn image_format_tokens() -> [&'static str; 3] {
    ImageFormat::ALL.map(ImageFormat::as_str)
}

fn error_code_tokens() -> [&'static str; 9] {
    ErrorCode::ALL.map(ErrorCode::as_str)
}

// --- Composite checks ---

fn image_metadata(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ImageMetadata> {
    let obj = c.object(value, path)?;
    let format = c.required(obj, path, "format", |c, v, p| c.token::<ImageFormat>(v, p, &image_format_tokens()));
    let size = c.required(obj, path, "size", Checker::image_size);
    let width = c.required(obj, path, "width", Checker::dimension);
    let height = c.required(obj, path, "height", Checker::dimension);
    let mime_type = c.required(obj, path, "mimeType", Checker::mime_type);

    Some(ImageMetadata {
        format: format?,
        size: size?,
        width: width?,
        height: height?,
        mime_type: mime_type?,
    })
}

fn extracted_field(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ExtractedField<Value>> {
    let obj = c.object(value, path)?;
    let field_value = c.required(obj, path, "value", |_, v, _| Some(v.clone()));
    let confidence = c.required(obj, path, "confidence", Checker::confidence);

    Some(ExtractedField { value: field_value?, confidence: confidence? })
}

fn text_field(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ExtractedField<String>> {
    let obj = c.object(value, path)?;
    let text = c.required(obj, path, "value", Checker::non_empty_string);
    let confidence = c.required(obj, path, "confidence", Checker::confidence);

    Some(ExtractedField { value: text?, confidence: confidence? })
}

fn amount_field(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<AmountField> {
    let obj = c.object(value, path)?;
    let amount = c.required(obj, path, "value", Checker::amount);
    let currency = c.required(obj, path, "currency", Checker::currency);
    let confidence = c.required(obj, path, "confidence", Checker::confidence);

    Some(AmountField { value: amount?, currency: currency?, confidence: confidence? })
}

fn receipt_item(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ReceiptItem> {
    let obj = c.object(value, path)?;
    let name = c.required(obj, path, "name", Checker::non_empty_string);
    let quantity = c.optional(obj, path, "quantity", Checker::quantity);
    let unit_price = c.optional(obj, path, "unitPrice", Checker::amount);
    let total_price = c.optional(obj, path, "totalPrice", Checker::amount);

    Some(ReceiptItem {
        name: name?,
        quantity: quantity?,
        unit_price: unit_price?,
        total_price: total_price?,
    })
}

fn extracted_fields(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ExtractedFields> {
    let obj = c.object(value, path)?;
    let total_amount = c.optional(obj, path, "totalAmount", amount_field);
    let date = c.optional(obj, path, "date", text_field);
    let merchant_name = c.optional(obj, path, "merchantName", text_field);
    let items = c.required(obj, path, "items", |c, v, p| c.array(v, p, receipt_item));
    let summary = c.required(obj, path, "summary", Checker::string);

    Some(ExtractedFields {
        total_amount: total_amount?,
        date: date?,
        merchant_name: merchant_name?,
        items: items?,
        summary: summary?,
    })
}

fn processing_metadata(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ProcessingMetadata> {
    let obj = c.object(value, path)?;
    let processing_time = c.required(obj, path, "processingTime", Checker::non_negative);
    let ocr_confidence = c.required(obj, path, "ocrConfidence", Checker::confidence);
    let ai_confidence = c.required(obj, path, "aiConfidence", Checker::confidence);
    let image_preprocessed = c.required(obj, path, "imagePreprocessed", Checker::boolean);

    Some(ProcessingMetadata {
        processing_time: processing_time?,
        ocr_confidence: ocr_confidence?,
        ai_confidence: ai_confidence?,
        image_preprocessed: image_preprocessed?,
    })
}

fn receipt_analysis_request(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ReceiptAnalysisRequest> {
    let obj = c.object(value, path)?;
    let id = c.required(obj, path, "id", Checker::uuid);
    let client_id = c.required(obj, path, "clientId", Checker::uuid);
    let image_url = c.required(obj, path, "imageUrl", Checker::non_empty_string);
    let metadata = c.required(obj, path, "imageMetadata", image_metadata);
    let status = c.required(obj, path, "status", |c, v, p| c.token::<ReceiptStatus>(v, p, &receipt_status_tokens()));
    let created_at = c.required(obj, path, "createdAt", Checker::timestamp);
    let updated_at = c.required(obj, path, "updatedAt", Checker::timestamp);

    if let (Some(created), Some(updated)) = (created_at, updated_at) {
        if updated < created {
            let field_path = join(path, "updatedAt");
            c.push(&field_path, &obj["updatedAt"], "must not precede createdAt");
            return None;
        }
    }

    Some(ReceiptAnalysisRequest {
        id: id?,
        client_id: client_id?,
        image_url: image_url?,
        image_metadata: metadata?,
        status: status?,
        created_at: created_at?,
        updated_at: updated_at?,
    })
}

fn extracted_receipt_data(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<ExtractedReceiptData> {
    let obj = c.object(value, path)?;
    let request_id = c.required(obj, path, "requestId", Checker::uuid);
    let receipt_type = c.required(obj, path, "receiptType", |c, v, p| c.token::<ReceiptType>(v, p, &receipt_type_tokens()));
    let fields = c.required(obj, path, "extractedFields", extracted_fields);
    let metadata = c.required(obj, path, "processingMetadata", processing_metadata);
    let extracted_at = c.required(obj, path, "extractedAt", Checker::timestamp);

    Some(ExtractedReceiptData {
        request_id: request_id?,
        receipt_type: receipt_type?,
        extracted_fields: fields?,
        processing_metadata: metadata?,
        extracted_at: extracted_at?,
    })
}

fn field_violation(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<FieldViolation> {
    let obj = c.object(value, path)?;
    let field = c.required(obj, path, "field", Checker::non_empty_string);
    let constraint = c.required(obj, path, "constraint", Checker::non_empty_string);

    Some(FieldViolation {
        field: field?,
        value: obj.get("value").cloned().unwrap_or(Value::Null),
        constraint: constraint?,
    })
}

fn api_error(c: &mut Checker<'_>, value: &Value, path: &str, require_violations: bool) -> Option<ApiError> {
    let obj = c.object(value, path)?;
    let code = c.required(obj, path, "code", |c, v, p| c.token::<ErrorCode>(v, p, &error_code_tokens()));
    let message = c.required(obj, path, "message", Checker::string);
    let status_code = c.optional(obj, path, "statusCode", |c, v, p| {
        let status = v.as_u64().and_then(|s| u16::try_from(s).ok());
        if status.is_none() {
            c.push(p, v, "must be an integer HTTP status");
        }
        status
    });
    let details = c.optional(obj, path, "details", |c, v, p| c.object(v, p).cloned());
    let timestamp = c.required(obj, path, "timestamp", Checker::timestamp);
    let request_id = c.optional(obj, path, "requestId", Checker::string);
    let violations = if require_violations {
        c.required(obj, path, "violations", |c, v, p| c.array(v, p, field_violation)).map(Some)
    } else {
        c.optional(obj, path, "violations", |c, v, p| c.array(v, p, field_violation))
    };

    if let (Some(code), Some(Some(status))) = (code, status_code) {
        if status != code.http_status() {
            let constraint = format!("must be {} for code {}", code.http_status(), code);
            c.push(&join(path, "statusCode"), &obj["statusCode"], constraint);
        }
    }
    if require_violations {
        if let Some(code) = code.filter(|&code| code != ErrorCode::InvalidRequest) {
            c.push(&join(path, "code"), &Value::String(code.to_string()), "must be invalid_request");
        }
        if let Some(Some(list)) = &violations {
            if list.is_empty() {
                c.push(&join(path, "violations"), &obj["violations"], "must not be empty");
            }
        }
    }

    let code = code?;
    Some(ApiError {
        code,
        message: message?,
        status_code: code.http_status(),
        details: details?,
        timestamp: timestamp?,
        request_id: request_id?,
        violations: violations?.unwrap_or_default(),
    })
}

fn health_check_response(c: &mut Checker<'_>, value: &Value, path: &str) -> Option<HealthCheckResponse> {
    let obj = c.object(value, path)?;
    let status = c.required(obj, path, "status", |c, v, p| {
        c.token::<HealthStatus>(v, p, &HealthStatus::ALL.map(HealthStatus::as_str))
    });
    let services = c.required(obj, path, "services", |c, v, p| {
        let services = c.object(v, p)?;
        let database = c.required(services, p, "database", Checker::boolean);
        let cache = c.required(services, p, "cache", Checker::boolean);
        let ocr = c.required(services, p, "ocr", Checker::boolean);
        let storage = c.required(services, p, "storage", Checker::boolean);
        Some(ServiceHealth { database: database?, cache: cache?, ocr: ocr?, storage: storage? })
    });
    let version = c.required(obj, path, "version", Checker::non_empty_string);
    let uptime = c.required(obj, path, "uptime", Checker::non_negative);

    Some(HealthCheckResponse {
        status: status?,
        services: services?,
        version: version?,
        uptime: uptime?,
    })
}

// --- Public guards ---

pub fn parse_image_metadata(value: &Value) -> Parsed<ImageMetadata> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);
    let parsed = image_metadata(&mut c, value, "");
    c.finish(value, parsed, "ImageMetadata")
}

pub fn parse_extracted_field(value: &Value) -> Parsed<ExtractedField<Value>> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);
    let parsed = extracted_field(&mut c, value, "");
    c.finish(value, parsed, "ExtractedField")
}

pub fn parse_receipt_item(value: &Value) -> Parsed<ReceiptItem> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);
    let parsed = receipt_item(&mut c, value, "");
    c.finish(value, parsed, "ReceiptItem")
}

pub fn parse_receipt_analysis_request(value: &Value) -> Parsed<ReceiptAnalysisRequest> {
    parse_receipt_analysis_request_with_policy(value, &ValidationPolicy::default())
}

pub fn parse_receipt_analysis_request_with_policy(
    value: &Value,
    policy: &ValidationPolicy,
) -> Parsed<ReceiptAnalysisRequest> {
    let mut c = Checker::new(policy);
    let parsed = receipt_analysis_request(&mut c, value, "");
    c.finish(value, parsed, "ReceiptAnalysisRequest")
}

pub fn parse_extracted_receipt_data(value: &Value) -> Parsed<ExtractedReceiptData> {
    parse_extracted_receipt_data_with_policy(value, &ValidationPolicy::default())
}

pub fn parse_extracted_receipt_data_with_policy(
    value: &Value,
    policy: &ValidationPolicy,
) -> Parsed<ExtractedReceiptData> {
    let mut c = Checker::new(policy);
    let parsed = extracted_receipt_data(&mut c, value, "");
    c.finish(value, parsed, "ExtractedReceiptData")
}

pub fn parse_api_error(value: &Value) -> Parsed<ApiError> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);
    let parsed = api_error(&mut c, value, "", false);
    c.finish(value, parsed, "ApiError")
}

pub fn parse_validation_error(value: &Value) -> Parsed<ApiError> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);
    let parsed = api_error(&mut c, value, "", true);
    c.finish(value, parsed, "ValidationError")
}

/// Envelope with an unchecked payload.
pub fn parse_analysis_response(value: &Value) -> Parsed<AnalysisResponse<Value>> {
    parse_analysis_response_with(value, |data| Ok(data.clone()))
}

/// Envelope whose `data` is checked by `parse_data`; its violations are
/// reported under `data.`.
pub fn parse_analysis_response_with<T>(
    value: &Value,
    parse_data: impl FnOnce(&Value) -> Parsed<T>,
) -> Parsed<AnalysisResponse<T>> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);

    let parsed = (|| {
        let obj = c.object(value, "")?;
        let success = c.required(obj, "", "success", Checker::boolean);
        let request_id = c.required(obj, "", "requestId", Checker::string);
        let processing_time = c.required(obj, "", "processingTime", Checker::non_negative);
        let timestamp = c.required(obj, "", "timestamp", Checker::timestamp);
        let error = c.optional(obj, "", "error", |c, v, p| api_error(c, v, p, false));
        let data = c.optional(obj, "", "data", |c, v, _| match parse_data(v) {
            Ok(data) => Some(data),
            Err(violations) => {
                for violation in violations {
                    let field = if violation.field == ROOT {
                        "data".to_string()
                    } else {
                        join("data", &violation.field)
                    };
                    c.violations.push(FieldViolation { field, ..violation });
                }
                None
            }
        });

        if let (Some(success), Some(error)) = (success, error.as_ref()) {
            if success == error.is_some() {
                let value = obj.get("error").cloned().unwrap_or(Value::Null);
                c.push("error", &value, "must be present if and only if success is false");
                return None;
            }
        }

        Some(AnalysisResponse {
            success: success?,
            data: data?,
            error: error?,
            request_id: request_id?,
            processing_time: processing_time?,
            timestamp: timestamp?,
        })
    })();

    c.finish(value, parsed, "AnalysisResponse")
}

pub fn parse_health_check_response(value: &Value) -> Parsed<HealthCheckResponse> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);
    let parsed = health_check_response(&mut c, value, "");
    c.finish(value, parsed, "HealthCheckResponse")
}

pub fn is_image_metadata(value: &Value) -> bool {
    parse_image_metadata(value).is_ok()
}

pub fn is_extracted_field(value: &Value) -> bool {
    parse_extracted_field(value).is_ok()
}

pub fn is_receipt_item(value: &Value) -> bool {
    parse_receipt_item(value).is_ok()
}

pub fn is_receipt_analysis_request(value: &Value) -> bool {
    parse_receipt_analysis_request(value).is_ok()
}

pub fn is_extracted_receipt_data(value: &Value) -> bool {
    parse_extracted_receipt_data(value).is_ok()
}

pub fn is_api_error(value: &Value) -> bool {
    parse_api_error(value).is_ok()
}

pub fn is_validation_error(value: &Value) -> bool {
    parse_validation_error(value).is_ok()
}

pub fn is_analysis_response(value: &Value) -> bool {
    parse_analysis_response(value).is_ok()
}

pub fn is_health_check_response(value: &Value) -> bool {
    parse_health_check_response(value).is_ok()
}
