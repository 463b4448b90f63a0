//! Validation & Normalization - Primitive Checks
//!
//! Predicates never fail on malformed input: they answer `false` / `None`
//! so callers can branch. Errors are only built by the caller.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::errors::ApiError;
use crate::model::{iso8601, ErrorCode, ImageFormat, ReceiptStatus, ReceiptType};
use crate::policy::ValidationPolicy;

pub const SUPPORTED_CURRENCIES: [&str; 5] = ["EUR", "USD", "GBP", "CAD", "CHF"];
pub const SUPPORTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "application/pdf"];

fn uuid_pattern() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            .expect("invalid regex")
    })
}

// --- Membership guards ---

pub fn is_receipt_status(value: &Value) -> bool {
    value.as_str().map_or(false, |s| s.parse::<ReceiptStatus>().is_ok())
}

pub fn is_receipt_type(value: &Value) -> bool {
    value.as_str().map_or(false, |s| s.parse::<ReceiptType>().is_ok())
}

pub fn is_image_format(value: &Value) -> bool {
    value.as_str().map_or(false, |s| s.parse::<ImageFormat>().is_ok())
}

pub fn is_error_code(value: &Value) -> bool {
    value.as_str().map_or(false, |s| s.parse::<ErrorCode>().is_ok())
}

// --- Primitive validators ---

/// RFC-4122 textual layout, versions 1 through 5.
pub fn is_valid_uuid(value: &str) -> bool {
    uuid_pattern().is_match(value)
}

/// Parseable AND already in canonical `YYYY-MM-DDTHH:MM:SS.sssZ` form.
pub fn is_valid_iso_date(value: &str) -> bool {
    iso8601::parse(value).map_or(false, |instant| iso8601::format(&instant) == value)
}

pub fn is_valid_currency(value: &str) -> bool {
    SUPPORTED_CURRENCIES.iter().any(|c| c.eq_ignore_ascii_case(value))
}

pub fn is_valid_confidence(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

pub fn is_valid_amount(value: f64) -> bool {
    ValidationPolicy::default().accepts_amount(value)
}

pub fn is_valid_image_size(size: f64) -> bool {
    ValidationPolicy::default().accepts_image_size(size)
}

pub fn is_valid_mime_type(value: &str) -> bool {
    SUPPORTED_MIME_TYPES.iter().any(|m| m.eq_ignore_ascii_case(value))
}

// --- Normalization ---

/// Resolves extension aliases (`.JPG`, `jpg`, `jpeg`) to a format.
pub fn normalize_image_format(value: &str) -> Option<ImageFormat> {
    let stripped = value.strip_prefix('.').unwrap_or(value);
    match stripped.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        "png" => Some(ImageFormat::Png),
        "pdf" => Some(ImageFormat::Pdf),
        _ => None,
    }
}

/// Upper-cases only. Membership is `is_valid_currency`'s job.
pub fn normalize_currency(value: &str) -> String {
    value.to_uppercase()
}

pub fn round_confidence(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub fn round_amount(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Collapses whitespace runs, trims, then truncates to `max_length` characters.
pub fn sanitize_string(value: &str, max_length: Option<usize>) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    match max_length {
        Some(max) if collapsed.chars().count() > max => {
            let truncated: String = collapsed.chars().take(max).collect();
            truncated.trim_end().to_string()
        }
        _ => collapsed,
    }
}

/// Lower-cased text after the last `.`, or `None` when there is no dot.
pub fn extract_file_extension(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|idx| filename[idx + 1..].to_lowercase())
}

/// Checks raw upload metadata and resolves the image format.
pub fn validate_upload(
    filename: &str,
    mime_type: &str,
    size: u64,
    policy: &ValidationPolicy,
) -> Result<ImageFormat, ApiError> {
    let extension = extract_file_extension(filename).unwrap_or_default();
    let format = match normalize_image_format(&extension) {
        Some(format) if is_valid_mime_type(mime_type) => format,
        Some(_) => return Err(ApiError::invalid_format(mime_type, None)),
        None => {
            let received = if extension.is_empty() { mime_type } else { extension.as_str() };
            return Err(ApiError::invalid_format(received, None));
        }
    };

    if !policy.accepts_image_size(size as f64) {
        return Err(ApiError::file_too_large(size, policy.max_image_size_bytes, None));
    }

    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_membership_guards() {
        for token in ["pending", "processing", "completed", "failed"] {
            assert!(is_receipt_status(&json!(token)));
        }
        assert!(!is_receipt_status(&json!("PENDING")));
        assert!(!is_receipt_status(&json!(1)));
        assert!(is_receipt_type(&json!("card_payment")));
        assert!(!is_receipt_type(&json!("cardPayment")));
        assert!(is_image_format(&json!("pdf")));
        assert!(!is_image_format(&json!("jpg")));
        assert!(is_error_code(&json!("no_text_detected")));
        assert!(!is_error_code(&Value::Null));
    }

    #[test]
    fn test_is_valid_uuid() {
        assert!(is_valid_uuid("123e4567-e89b-12d3-a456-426614174000"));
        assert!(is_valid_uuid("123E4567-E89B-42D3-A456-426614174000"));
        assert!(!is_valid_uuid("invalid-uuid"));
        // version nibble 6 and variant nibble c are outside the accepted layout
        assert!(!is_valid_uuid("123e4567-e89b-62d3-a456-426614174000"));
        assert!(!is_valid_uuid("123e4567-e89b-12d3-c456-426614174000"));
        assert!(!is_valid_uuid("{123e4567-e89b-12d3-a456-426614174000}"));
    }

    #[test]
    fn test_is_valid_iso_date_requires_canonical_form() {
        assert!(is_valid_iso_date("2024-01-15T10:30:00.000Z"));
        assert!(!is_valid_iso_date("2024-01-15T10:30:00Z"));
        assert!(!is_valid_iso_date("2024-01-15T11:30:00.000+01:00"));
        assert!(!is_valid_iso_date("2024-01-15"));
        assert!(!is_valid_iso_date("not a date"));
    }

    #[test]
    fn test_is_valid_iso_date_rejects_leap_second() {
        assert!(!is_valid_iso_date("2016-12-31T23:59:60.000Z"));
        assert!(is_valid_iso_date("2016-12-31T23:59:59.000Z"));
    }

    #[test]
    fn test_currency() {
        assert!(is_valid_currency("EUR"));
        assert!(is_valid_currency("chf"));
        assert!(!is_valid_currency("JPY"));
        assert_eq!(normalize_currency("eur"), "EUR");
        assert_eq!(normalize_currency("xyz"), "XYZ");
    }

    #[test]
    fn test_confidence_and_amount_bounds() {
        assert!(is_valid_confidence(0.0));
        assert!(is_valid_confidence(1.0));
        assert!(!is_valid_confidence(1.01));
        assert!(!is_valid_confidence(f64::NAN));

        assert!(is_valid_amount(10.50));
        assert!(is_valid_amount(0.0));
        assert!(is_valid_amount(999_999.99));
        assert!(!is_valid_amount(-5.0));
        assert!(!is_valid_amount(1_000_000.0));
        assert!(!is_valid_amount(999_999.999));
        assert!(!is_valid_amount(f64::INFINITY));
    }

    #[test]
    fn test_image_size_and_mime() {
        assert!(is_valid_image_size(1024.0));
        assert!(!is_valid_image_size(0.0));
        assert!(!is_valid_image_size(11.0 * 1024.0 * 1024.0));
        assert!(is_valid_mime_type("image/JPG"));
        assert!(is_valid_mime_type("application/pdf"));
        assert!(!is_valid_mime_type("image/gif"));
    }

    #[test]
    fn test_normalize_image_format() {
        assert_eq!(normalize_image_format("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(normalize_image_format(".jpeg"), Some(ImageFormat::Jpeg));
        assert_eq!(normalize_image_format("png"), Some(ImageFormat::Png));
        assert_eq!(normalize_image_format("invalid"), None);

        for format in ImageFormat::ALL {
            assert_eq!(normalize_image_format(format.as_str()), Some(format));
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_amount(25.999), 26.0);
        assert_eq!(round_amount(12.344), 12.34);
        assert_eq!(round_amount(12.346), 12.35);
        assert_eq!(round_confidence(0.9876), 0.988);
        assert_eq!(round_confidence(0.5), 0.5);
    }

    #[test]
    fn test_sanitize_string() {
        assert_eq!(sanitize_string("  a   b  ", None), "a b");
        assert_eq!(sanitize_string("  a   b  ", Some(3)), "a b");
        assert_eq!(sanitize_string("a b c", Some(2)), "a");
        assert_eq!(sanitize_string("Café\t\nDupont", Some(6)), "Café D");
        assert_eq!(sanitize_string("", Some(4)), "");
    }

    #[test]
    fn test_extract_file_extension() {
        assert_eq!(extract_file_extension("a.b.JPG").as_deref(), Some("jpg"));
        assert_eq!(extract_file_extension("noext"), None);
        assert_eq!(extract_file_extension(".gitignore").as_deref(), Some("gitignore"));
        assert_eq!(extract_file_extension("trailing.").as_deref(), Some(""));
    }

    #[test]
    fn test_validate_upload() {
        let policy = ValidationPolicy::default();
        assert_eq!(validate_upload("scan.JPG", "image/jpeg", 2048, &policy).unwrap(), ImageFormat::Jpeg);

        let err = validate_upload("scan.bmp", "image/bmp", 2048, &policy).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);

        let err = validate_upload("scan.png", "image/png", 20 * 1024 * 1024, &policy).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileTooLarge);
        assert_eq!(err.status_code, 400);
    }
}
