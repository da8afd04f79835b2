//! Prover configuration

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ProverError;

/// STARK parameters. Prover and verifier must agree on every field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    /// Log2 of the FRI blowup factor
    pub log_blowup: usize,
    /// Number of FRI query rounds
    pub num_queries: usize,
    /// Proof-of-work grinding bits
    pub proof_of_work_bits: usize,
    /// Trace height: the assignment row plus random masking rows. Must
    /// exceed the number of openings per column, `num_queries + 2`.
    pub trace_rows: usize,
    /// Seed for the Poseidon2 round constants shared by prover and verifier
    pub permutation_seed: u64,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            log_blowup: 2,
            num_queries: 40,
            proof_of_work_bits: 8,
            trace_rows: 64,
            permutation_seed: 0x7a6b_7769_7265,
        }
    }
}

impl ProverConfig {
    /// Load a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading prover config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("parsing prover config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProverError> {
        if self.log_blowup == 0 {
            return Err(ProverError::InvalidConfig(
                "log_blowup must be at least 1 for degree-2 constraints".into(),
            ));
        }
        if self.num_queries == 0 {
            return Err(ProverError::InvalidConfig("num_queries must be positive".into()));
        }
        if self.trace_rows < 2 || !self.trace_rows.is_power_of_two() {
            return Err(ProverError::InvalidConfig(format!(
                "trace_rows must be a power of two >= 2, got {}",
                self.trace_rows
            )));
        }
        if self.trace_rows <= self.num_queries + 2 {
            return Err(ProverError::InvalidConfig(format!(
                "{} trace rows cannot mask {} query openings",
                self.trace_rows, self.num_queries
            )));
        }
        Ok(())
    }

    /// Conjectured soundness in bits
    pub fn security_bits(&self) -> usize {
        self.log_blowup * self.num_queries + self.proof_of_work_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.security_bits(), 88);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ProverConfig = serde_json::from_str(r#"{ "num_queries": 20 }"#).unwrap();
        assert_eq!(config.num_queries, 20);
        assert_eq!(config.trace_rows, 64);
    }

    #[test]
    fn test_rejects_bad_trace_height() {
        let config = ProverConfig {
            trace_rows: 6,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProverError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_too_few_masking_rows() {
        let config = ProverConfig {
            num_queries: 40,
            trace_rows: 32,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProverError::InvalidConfig(_))));

        let config = ProverConfig {
            num_queries: 29,
            trace_rows: 32,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
