//! Request schema for the analyze endpoint body.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::guards::{receipt_type_tokens, Checker, Parsed};
use crate::model::ReceiptType;
use crate::policy::ValidationPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<ReceiptType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequestBody {
    pub client_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RequestMetadata>,
}

pub fn parse_analyze_request(value: &Value) -> Parsed<AnalyzeRequestBody> {
    let policy = ValidationPolicy::default();
    let mut c = Checker::new(&policy);

    let parsed = c.object(value, "").and_then(|obj| {
        let client_id = c.required(obj, "", "clientId", Checker::uuid);
        let metadata = c.optional(obj, "", "metadata", |c, v, p| {
            let meta = c.object(v, p)?;
            let expected_type = c.optional(meta, p, "expectedType", |c, v, p| {
                c.token::<ReceiptType>(v, p, &receipt_type_tokens())
            });
            let source = c.optional(meta, p, "source", Checker::string);
            Some(RequestMetadata { expected_type: expected_type?, source: source? })
        });

        Some(AnalyzeRequestBody { client_id: client_id?, metadata: metadata? })
    });

    c.finish(value, parsed, "AnalyzeRequestBody")
}

/// Same check, packaged as the 400 response the HTTP layer sends back.
pub fn validate_analyze_request(value: &Value, request_id: Option<&str>) -> Result<AnalyzeRequestBody, ApiError> {
    parse_analyze_request(value).map_err(|violations| ApiError::validation(violations, request_id))
}
