//! Contract Invariant Tests
//!
//! These tests exercise the public contract the way the HTTP, ingestion and
//! persistence services consume it.

use receipt_contract::{
    guards::{
        is_analysis_response, is_api_error, is_extracted_receipt_data, is_receipt_analysis_request,
        is_validation_error, parse_analysis_response_with, parse_extracted_receipt_data,
        parse_receipt_analysis_request, parse_receipt_analysis_request_with_policy,
    },
    http_status_from_code,
    messages::{detailed_error_message, error_suggestion, localized_message},
    model::{ExtractedReceiptData, ReceiptStatus},
    validation::{is_receipt_status, is_valid_uuid},
    AnalysisResponse, ApiError, ErrorCode, ValidationPolicy,
};
use serde_json::{json, Value};

fn request_fixture() -> Value {
    json!({
        "id": "123e4567-e89b-12d3-a456-426614174000",
        "clientId": "9b2d5f1e-3c4a-4b6d-8e7f-0a1b2c3d4e5f",
        "imageUrl": "https://storage.example.com/receipts/abc.jpg",
        "imageMetadata": {
            "format": "jpeg",
            "size": 1048576,
            "width": 1200,
            "height": 1600,
            "mimeType": "image/jpeg"
        },
        "status": "processing",
        "createdAt": "2024-01-15T10:30:00.000Z",
        "updatedAt": "2024-01-15T10:30:05.250Z"
    })
}

fn extracted_fixture() -> Value {
    json!({
        "requestId": "123e4567-e89b-12d3-a456-426614174000",
        "receiptType": "retail",
        "extractedFields": {
            "totalAmount": {"value": 42.5, "currency": "EUR", "confidence": 0.95},
            "date": {"value": "2024-01-15", "confidence": 0.9},
            "merchantName": {"value": "Boulangerie Martin", "confidence": 0.87},
            "items": [
                {"name": "Baguette", "quantity": 2, "unitPrice": 1.25, "totalPrice": 2.5},
                {"name": "Croissant"}
            ],
            "summary": "Achat en boulangerie"
        },
        "processingMetadata": {
            "processingTime": 1834,
            "ocrConfidence": 0.91,
            "aiConfidence": 0.88,
            "imagePreprocessed": true
        },
        "extractedAt": "2024-01-15T10:30:05.250Z"
    })
}

fn set(value: &mut Value, pointer: &str, new: Value) {
    *value.pointer_mut(pointer).unwrap() = new;
}

fn remove(value: &mut Value, parent: &str, key: &str) {
    value.pointer_mut(parent).unwrap().as_object_mut().unwrap().remove(key);
}

#[test]
fn invariant_status_guard_exact_match() {
    for status in ReceiptStatus::ALL {
        assert!(is_receipt_status(&json!(status.as_str())));
    }
    for other in ["Pending", "done", "", " pending"] {
        assert!(!is_receipt_status(&json!(other)));
    }
}

#[test]
fn invariant_uuid_examples() {
    assert!(is_valid_uuid("123e4567-e89b-12d3-a456-426614174000"));
    assert!(!is_valid_uuid("invalid-uuid"));
}

#[test]
fn invariant_valid_request_parses() {
    let request = parse_receipt_analysis_request(&request_fixture()).unwrap();
    assert_eq!(request.status, ReceiptStatus::Processing);
    assert_eq!(request.image_metadata.width, 1200);
    assert!(request.updated_at >= request.created_at);
}

#[test]
fn invariant_request_nested_fields_not_skipped() {
    // Every nested field must be checked independently: break each one in turn.
    let breakages: Vec<(&str, Value, &str)> = vec![
        ("/id", json!("not-a-uuid"), "id"),
        ("/clientId", json!(42), "clientId"),
        ("/imageUrl", json!(""), "imageUrl"),
        ("/imageMetadata/format", json!("bmp"), "imageMetadata.format"),
        ("/imageMetadata/size", json!(0), "imageMetadata.size"),
        ("/imageMetadata/width", json!(0), "imageMetadata.width"),
        ("/imageMetadata/height", json!(1.5), "imageMetadata.height"),
        ("/imageMetadata/mimeType", json!("image/gif"), "imageMetadata.mimeType"),
        ("/status", json!("done"), "status"),
        ("/createdAt", json!("2024-01-15T10:30:00Z"), "createdAt"),
        ("/updatedAt", json!("yesterday"), "updatedAt"),
    ];

    for (pointer, bad, field) in breakages {
        let mut value = request_fixture();
        set(&mut value, pointer, bad);
        let violations = parse_receipt_analysis_request(&value).unwrap_err();
        assert_eq!(violations.len(), 1, "pointer {}", pointer);
        assert_eq!(violations[0].field, field);
    }
}

#[test]
fn invariant_request_collects_all_violations() {
    let mut value = request_fixture();
    set(&mut value, "/id", json!("x"));
    set(&mut value, "/status", json!("PENDING"));
    remove(&mut value, "/imageMetadata", "mimeType");

    let violations = parse_receipt_analysis_request(&value).unwrap_err();
    let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["id", "imageMetadata.mimeType", "status"]);
}

#[test]
fn invariant_updated_not_before_created() {
    let mut value = request_fixture();
    set(&mut value, "/updatedAt", json!("2024-01-15T10:29:59.999Z"));
    let violations = parse_receipt_analysis_request(&value).unwrap_err();
    assert_eq!(violations[0].field, "updatedAt");
    assert_eq!(violations[0].constraint, "must not precede createdAt");
}

#[test]
fn invariant_policy_limits_apply() {
    let policy = ValidationPolicy { max_image_size_bytes: 1024, ..Default::default() };
    let violations = parse_receipt_analysis_request_with_policy(&request_fixture(), &policy).unwrap_err();
    assert_eq!(violations[0].field, "imageMetadata.size");
}

#[test]
fn invariant_serialized_records_pass_their_guards() {
    let request = parse_receipt_analysis_request(&request_fixture()).unwrap();
    assert!(is_receipt_analysis_request(&serde_json::to_value(&request).unwrap()));

    let data = parse_extracted_receipt_data(&extracted_fixture()).unwrap();
    assert!(is_extracted_receipt_data(&serde_json::to_value(&data).unwrap()));
}

#[test]
fn invariant_extracted_data_bounds() {
    assert!(is_extracted_receipt_data(&extracted_fixture()));

    let mut value = extracted_fixture();
    set(&mut value, "/extractedFields/totalAmount/value", json!(1000000));
    set(&mut value, "/extractedFields/merchantName/confidence", json!(1.2));
    set(&mut value, "/extractedFields/items/1/name", json!(""));
    set(&mut value, "/processingMetadata/aiConfidence", json!(-0.1));

    let violations = parse_extracted_receipt_data(&value).unwrap_err();
    let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(
        fields,
        vec![
            "extractedFields.totalAmount.value",
            "extractedFields.merchantName.confidence",
            "extractedFields.items[1].name",
            "processingMetadata.aiConfidence",
        ]
    );
}

#[test]
fn invariant_missing_extractions_are_allowed() {
    let mut value = extracted_fixture();
    remove(&mut value, "/extractedFields", "totalAmount");
    set(&mut value, "/extractedFields/merchantName", Value::Null);
    assert!(is_extracted_receipt_data(&value));

    remove(&mut value, "/extractedFields", "summary");
    assert!(!is_extracted_receipt_data(&value));
}

#[test]
fn invariant_invalid_format_error_contract() {
    let err = ApiError::invalid_format("bmp", Some("req-1"));
    assert_eq!(err.code, ErrorCode::InvalidFormat);
    assert_eq!(err.status_code, 400);
    assert_eq!(err.request_id.as_deref(), Some("req-1"));
    assert_eq!(err.details.as_ref().unwrap()["receivedFormat"], "bmp");

    let body = serde_json::to_value(&err).unwrap();
    assert!(is_api_error(&body));
    assert!(!is_validation_error(&body));
}

#[test]
fn invariant_status_mapping_by_group() {
    let expected = [
        ("invalid_format", 400),
        ("file_too_large", 400),
        ("invalid_request", 400),
        ("unauthorized", 401),
        ("poor_image_quality", 422),
        ("no_text_detected", 422),
        ("rate_limit_exceeded", 429),
        ("processing_error", 500),
        ("service_unavailable", 503),
    ];
    assert_eq!(expected.len(), ErrorCode::ALL.len());
    for (code, status) in expected {
        assert_eq!(http_status_from_code(code), status, "{}", code);
    }
    assert_eq!(http_status_from_code("INVALID_FORMAT"), 500);
    assert_eq!(http_status_from_code(""), 500);
}

#[test]
fn invariant_api_error_status_must_match_code() {
    let mut body = serde_json::to_value(ApiError::no_text_detected(None)).unwrap();
    assert!(is_api_error(&body));
    body["statusCode"] = json!(400);
    assert!(!is_api_error(&body));
}

#[test]
fn invariant_validation_error_contract() {
    let mut value = request_fixture();
    set(&mut value, "/clientId", json!("nope"));
    let violations = parse_receipt_analysis_request(&value).unwrap_err();
    let err = ApiError::validation(violations, Some("req-2"));

    let body = serde_json::to_value(&err).unwrap();
    assert!(is_validation_error(&body));
    assert_eq!(body["violations"][0]["field"], "clientId");
    assert_eq!(body["violations"][0]["value"], "nope");

    let mut relabeled = body.clone();
    relabeled["code"] = json!("processing_error");
    relabeled["statusCode"] = json!(500);
    assert!(!is_validation_error(&relabeled));
}

#[test]
fn invariant_response_error_iff_failure() {
    let data: ExtractedReceiptData = parse_extracted_receipt_data(&extracted_fixture()).unwrap();
    let ok = serde_json::to_value(AnalysisResponse::success("req-3", data, 1834.0)).unwrap();
    assert!(is_analysis_response(&ok));

    let typed = parse_analysis_response_with(&ok, parse_extracted_receipt_data).unwrap();
    assert!(typed.success);
    assert_eq!(typed.data.unwrap().extracted_fields.items.len(), 2);

    let failed: AnalysisResponse<Value> =
        AnalysisResponse::failure("req-4", ApiError::no_text_detected(Some("req-4")), 250.0);
    let failed = serde_json::to_value(failed).unwrap();
    assert!(is_analysis_response(&failed));

    let mut inconsistent = ok.clone();
    inconsistent["success"] = json!(false);
    assert!(!is_analysis_response(&inconsistent));

    let mut inconsistent = failed.clone();
    inconsistent["success"] = json!(true);
    assert!(!is_analysis_response(&inconsistent));
}

#[test]
fn invariant_constructed_responses_pass_their_guard() {
    let data: ExtractedReceiptData = parse_extracted_receipt_data(&extracted_fixture()).unwrap();
    let ok = serde_json::to_value(AnalysisResponse::success("", data, 12.0)).unwrap();
    assert!(is_analysis_response(&ok));

    let failed: AnalysisResponse<Value> =
        AnalysisResponse::failure("", ApiError::no_text_detected(None), 3.0);
    assert!(is_analysis_response(&serde_json::to_value(failed).unwrap()));

    let mut missing = ok.clone();
    missing.as_object_mut().unwrap().remove("requestId");
    assert!(!is_analysis_response(&missing));
}

#[test]
fn invariant_response_data_violations_are_prefixed() {
    let mut bad_data = extracted_fixture();
    set(&mut bad_data, "/receiptType", json!("grocery"));
    let envelope = json!({
        "success": true,
        "data": bad_data,
        "requestId": "req-5",
        "processingTime": 12,
        "timestamp": "2024-01-15T10:30:05.250Z"
    });

    let violations = parse_analysis_response_with(&envelope, parse_extracted_receipt_data).unwrap_err();
    assert_eq!(violations[0].field, "data.receiptType");
}

#[test]
fn invariant_messages_total_over_codes() {
    for code in ErrorCode::ALL {
        assert!(!localized_message(code.as_str()).is_empty());
        assert!(!error_suggestion(code.as_str()).is_empty());
        assert!(!detailed_error_message(code.as_str(), None).is_empty());
    }
    assert_eq!(localized_message("unknown_code"), "Une erreur inattendue est survenue.");
}
