// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! QKD Core Library
//!
//! This crate provides the protocol simulation engine for quantum key distribution.
//! A sender and a receiver agree on a shared bit string by exchanging single qubits
//! (BB84) or halves of entangled pairs (E91), discarding every position where their
//! independently chosen bases disagree.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `state`: Encoding bases, prepared photon states and the canonical mapping table
//! - `random`: Randomness sources (seeded, OS-backed and scripted)
//! - `channel`: Quantum channel interface and the ideal analytic backend
//! - `statevector`: Complex-amplitude register backend
//! - `protocol`: Preparer and measurer roles for both protocol families
//! - `reconcile`: Basis reconciliation and key extraction
//! - `session`: Session driver and trial averaging
//! - `simulator`: Configuration-driven facade used by the CLI
//! - `config`, `metrics`, `crypto`, `error`: Ambient concerns
//!
//! # Design Principles
//!
//! 1. **One engine**: protocol families are strategies over a single pipeline
//! 2. **Type safety**: states, bases and analyzer settings are closed enums
//! 3. **Testability**: every random draw goes through an injectable source
//! 4. **Opaque backends**: gate sequences never leak past the channel interface

pub mod channel;
pub mod config;
pub mod crypto;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod random;
pub mod reconcile;
pub mod session;
pub mod simulator;
pub mod state;
pub mod statevector;

pub use channel::{AnalyzerBasis, BackendKind, EntangledPair, IdealChannel, QuantumChannel};
pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use protocol::{Bb84, Protocol, ProtocolKind, E91};
pub use random::{RandomSource, RngSource, ScriptedSource};
pub use reconcile::{reconcile, Reconciliation};
pub use metrics::Metrics;
pub use session::{run_session, run_trials, TransmissionRecord, TrialSummary};
pub use simulator::{SessionReport, SimulationReport, Simulator};
pub use state::{Bit, EncodingBasis, PreparedState};
pub use statevector::StateVectorChannel;

/// Library version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum units per session to prevent OOM
pub const MAX_UNITS: usize = 1_000_000;

/// Default units per session
pub const DEFAULT_LENGTH: usize = 10;

/// Default number of averaged trials
pub const DEFAULT_TRIALS: usize = 1;
