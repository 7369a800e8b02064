// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Error types for the QKD engine
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for QKD operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Requested message or trial length is not positive, or sequences disagree in length
    #[error("Invalid length: {0}")]
    InvalidLength(String),

    /// Measurement backend or random source failed to produce a usable result
    #[error("Backend failure: {0}")]
    Backend(String),

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if error rejects a non-positive or mismatched length
    pub fn is_invalid_length(&self) -> bool {
        matches!(self, Error::InvalidLength(_))
    }

    /// Check if error comes from the measurement backend or random source
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}

// Conversions for configuration loaders
impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<envy::Error> for Error {
    fn from(e: envy::Error) -> Self {
        Error::Config(format!("Failed to parse environment variables: {}", e))
    }
}
