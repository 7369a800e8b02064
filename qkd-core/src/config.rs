// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Configuration management for simulation runs

use crate::{
    channel::BackendKind, protocol::ProtocolKind, session::validate_length, Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "QKD_";

/// Simulation run configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Protocol family to simulate
    #[serde(default)]
    pub protocol: ProtocolKind,

    /// Units (photons or pairs) per session
    #[serde(default = "default_length")]
    pub length: usize,

    /// Independent sessions to average over
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Fixed seed for reproducible runs, OS entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Measurement backend
    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolKind::default(),
            length: default_length(),
            trials: default_trials(),
            seed: None,
            backend: BackendKind::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        Ok(config)
    }

    /// Load configuration from a file, with `QKD_` environment variables taking precedence
    ///
    /// The format (YAML, TOML, JSON) follows the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX.trim_end_matches('_')).try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(format!("Failed to read '{}': {}", path.display(), e)))?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_length(self.length, "message length")?;
        validate_length(self.trials, "trial count")?;
        Ok(())
    }
}

// Default value functions
fn default_length() -> usize {
    crate::DEFAULT_LENGTH
}

fn default_trials() -> usize {
    crate::DEFAULT_TRIALS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("qkd-core-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_validate() {
        let config = SimulationConfig::default();
        assert_eq!(config.protocol, ProtocolKind::Bb84);
        assert_eq!(config.length, 10);
        assert_eq!(config.trials, 1);
        assert_eq!(config.backend, BackendKind::Ideal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_length_is_invalid_length() {
        let config = SimulationConfig {
            length: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_length());

        let config = SimulationConfig {
            trials: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_invalid_length());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let config = SimulationConfig {
            length: crate::MAX_UNITS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let path = write_temp(
            "run.yaml",
            "protocol: e91\nlength: 300\ntrials: 4\nseed: 42\nbackend: statevector\n",
        );
        let config = SimulationConfig::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.protocol, ProtocolKind::E91);
        assert_eq!(config.length, 300);
        assert_eq!(config.trials, 4);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.backend, BackendKind::StateVector);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = write_temp("partial.yaml", "length: 25\n");
        let config = SimulationConfig::from_file(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.length, 25);
        assert_eq!(config.trials, 1);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = SimulationConfig::from_file("/nonexistent/qkd.yaml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        let path = write_temp("bad.yaml", "protocol: b92\n");
        let result = SimulationConfig::from_file(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
