//! Receipt Contract - Data Contract for the Receipt Analysis API
//!
//! # Guarantees
//! 1. Enumerations Are Closed
//! 2. Guards Report Every Violation
//! 3. Predicates Never Fail On Bad Input
//! 4. Every Error Code Has One Status
//! 5. Messages Never Leak Internal Details

pub mod model;
pub mod validation;
pub mod guards;
pub mod schema;
pub mod errors;
pub mod messages;
pub mod policy;
pub mod logging;

pub use model::{
    AnalysisResponse, ErrorCode, ExtractedReceiptData, HealthCheckResponse, ImageFormat,
    ReceiptAnalysisRequest, ReceiptStatus, ReceiptType,
};
pub use errors::{http_status_from_code, ApiError, ContractError, FieldViolation};
pub use guards::Parsed;
pub use messages::Locale;
pub use policy::ValidationPolicy;

pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");
