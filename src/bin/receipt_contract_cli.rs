//! Receipt Contract CLI - JSON bridge for non-Rust services
//!
//! Commands: validate, normalize, error
//! Outputs JSON to stdout
//! Returns 2 on validation failure

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

use receipt_contract::{
    guards, logging, schema,
    validation::{normalize_currency, normalize_image_format},
    ApiError, ErrorCode, FieldViolation, ValidationPolicy,
};

#[derive(Parser)]
#[command(name = "receipt-contract-cli")]
#[command(about = "Receipt Contract CLI - validate and normalize receipt analysis payloads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a validation policy JSON file
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Request,
    Extracted,
    ApiError,
    ValidationError,
    Response,
    Health,
    AnalyzeBody,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON payload against a contract shape
    Validate {
        /// Contract shape to check
        #[arg(short, long, value_enum)]
        kind: Kind,

        /// JSON payload
        #[arg(short = 'd', long)]
        payload: String,
    },

    /// Normalize a format alias or currency code
    Normalize {
        #[arg(long)]
        format: Option<String>,

        #[arg(long)]
        currency: Option<String>,
    },

    /// Render the error body and texts for an error code
    Error {
        #[arg(short, long)]
        code: String,

        #[arg(short, long)]
        request_id: Option<String>,
    },
}

fn violations_only<T>(result: Result<T, Vec<FieldViolation>>) -> Vec<FieldViolation> {
    result.err().unwrap_or_default()
}

fn check(kind: Kind, payload: &Value, policy: &ValidationPolicy) -> Vec<FieldViolation> {
    match kind {
        Kind::Request => violations_only(guards::parse_receipt_analysis_request_with_policy(payload, policy)),
        Kind::Extracted => violations_only(guards::parse_extracted_receipt_data_with_policy(payload, policy)),
        Kind::ApiError => violations_only(guards::parse_api_error(payload)),
        Kind::ValidationError => violations_only(guards::parse_validation_error(payload)),
        Kind::Response => violations_only(guards::parse_analysis_response(payload)),
        Kind::Health => violations_only(guards::parse_health_check_response(payload)),
        Kind::AnalyzeBody => violations_only(schema::parse_analyze_request(payload)),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => println!(r#"{{"error": "Failed to serialize output: {}"}}"#, e),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);

    let policy = match &cli.policy {
        Some(path) => match ValidationPolicy::load(path) {
            Ok(p) => p,
            Err(e) => {
                print_json(&json!({"error": format!("Failed to load policy: {}", e)}));
                return ExitCode::FAILURE;
            }
        },
        None => ValidationPolicy::default(),
    };

    match cli.command {
        Commands::Validate { kind, payload } => {
            let payload: Value = match serde_json::from_str(&payload) {
                Ok(v) => v,
                Err(e) => {
                    print_json(&json!({"valid": false, "error": format!("Invalid payload: {}", e)}));
                    return ExitCode::FAILURE;
                }
            };

            let violations = check(kind, &payload, &policy);
            let valid = violations.is_empty();
            print_json(&json!({"valid": valid, "violations": violations}));

            if valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }

        Commands::Normalize { format, currency } => {
            if format.is_none() && currency.is_none() {
                print_json(&json!({"error": "Nothing to normalize: pass --format or --currency"}));
                return ExitCode::FAILURE;
            }

            let mut output = serde_json::Map::new();
            if let Some(raw) = format {
                let normalized = normalize_image_format(&raw);
                output.insert("format".into(), json!(normalized));
            }
            if let Some(raw) = currency {
                output.insert("currency".into(), json!(normalize_currency(&raw)));
            }
            print_json(&Value::Object(output));
            ExitCode::SUCCESS
        }

        Commands::Error { code, request_id } => {
            let code: ErrorCode = match code.parse() {
                Ok(c) => c,
                Err(e) => {
                    print_json(&json!({"error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };

            let error = ApiError::from_code(code, request_id.as_deref());
            print_json(&json!({
                "body": error,
                "localizedMessage": error.localized_message(),
                "detailedMessage": error.detailed_message(),
                "suggestion": error.suggestion(),
            }));
            ExitCode::SUCCESS
        }
    }
}
