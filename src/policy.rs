//! Validation Policy - Domain Limits as Configuration
//!
//! The amount ceiling and the upload size limit are business policy.
//! Defaults match the published contract; deployments may load overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{ContractError, Result};
use crate::CONTRACT_VERSION;

pub const DEFAULT_MAX_AMOUNT: f64 = 999_999.99;
pub const DEFAULT_MAX_IMAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPolicy {
    #[serde(default = "default_max_amount")]
    pub max_amount: f64,
    #[serde(default = "default_max_image_size")]
    pub max_image_size_bytes: u64,
    #[serde(default = "default_min_contract_version")]
    pub min_contract_version: String,
}

fn default_max_amount() -> f64 { DEFAULT_MAX_AMOUNT }
fn default_max_image_size() -> u64 { DEFAULT_MAX_IMAGE_SIZE_BYTES }
fn default_min_contract_version() -> String { "1.0.0".to_string() }

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_amount: DEFAULT_MAX_AMOUNT,
            max_image_size_bytes: DEFAULT_MAX_IMAGE_SIZE_BYTES,
            min_contract_version: default_min_contract_version(),
        }
    }
}

impl ValidationPolicy {
    /// Load a policy from a JSON file. Absent keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let policy: ValidationPolicy = serde_json::from_str(&content)?;
        policy.verify()?;

        tracing::info!(
            path = %path.display(),
            max_amount = policy.max_amount,
            max_image_size_bytes = policy.max_image_size_bytes,
            "Loaded validation policy"
        );
        Ok(policy)
    }

    /// True iff finite and within `[0, max_amount]`.
    pub fn accepts_amount(&self, value: f64) -> bool {
        value.is_finite() && (0.0..=self.max_amount).contains(&value)
    }

    /// True iff `0 < size <= max_image_size_bytes`.
    pub fn accepts_image_size(&self, size: f64) -> bool {
        size > 0.0 && size <= self.max_image_size_bytes as f64
    }

    fn verify(&self) -> Result<()> {
        let current = semver::Version::parse(CONTRACT_VERSION)
            .map_err(|_| ContractError::InvalidPolicy("Invalid contract version".into()))?;
        let required = semver::Version::parse(&self.min_contract_version)
            .map_err(|_| ContractError::InvalidPolicy(format!(
                "Invalid minContractVersion: {}", self.min_contract_version
            )))?;

        if current < required {
            return Err(ContractError::ContractVersionMismatch(
                self.min_contract_version.clone(),
                CONTRACT_VERSION.to_string(),
            ));
        }

        if !(self.max_amount.is_finite() && self.max_amount >= 0.0) {
            return Err(ContractError::InvalidPolicy(format!(
                "maxAmount must be a non-negative finite number, got {}", self.max_amount
            )));
        }

        Ok(())
    }
}
