// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Configuration-driven simulation facade
//!
//! Resolves the protocol and backend named in a `SimulationConfig`, wires up the
//! random streams, runs the trials and wraps the outcome in a report.

use crate::{
    channel::BackendKind,
    config::SimulationConfig,
    crypto::key_fingerprint,
    metrics::Metrics,
    protocol::{Bb84, Protocol, ProtocolKind, E91},
    random::RngSource,
    session::{run_trials, TrialSummary},
    Result,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Mixed into a fixed seed to derive the channel's independent stream
const CHANNEL_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Outcome of one configured run
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "P::Unit: Serialize, P::Basis: Serialize"))]
pub struct SessionReport<P: Protocol> {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub protocol: ProtocolKind,
    pub backend: BackendKind,
    pub seed: Option<u64>,
    /// Fingerprint of the last trial's sender key
    pub key_fingerprint: String,
    pub summary: TrialSummary<P>,
}

/// Report for whichever protocol the configuration selected
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SimulationReport {
    Bb84(SessionReport<Bb84>),
    E91(SessionReport<E91>),
}

impl SimulationReport {
    pub fn protocol(&self) -> ProtocolKind {
        match self {
            SimulationReport::Bb84(report) => report.protocol,
            SimulationReport::E91(report) => report.protocol,
        }
    }

    pub fn mean_key_length(&self) -> f64 {
        match self {
            SimulationReport::Bb84(report) => report.summary.mean_key_length,
            SimulationReport::E91(report) => report.summary.mean_key_length,
        }
    }

    pub fn key_fingerprint(&self) -> &str {
        match self {
            SimulationReport::Bb84(report) => &report.key_fingerprint,
            SimulationReport::E91(report) => &report.key_fingerprint,
        }
    }
}

/// Runs simulations described by a validated configuration
pub struct Simulator {
    config: SimulationConfig,
    metrics: Metrics,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Self::with_metrics(config, Metrics::new())
    }

    /// Share an existing metrics handle
    pub fn with_metrics(config: SimulationConfig, metrics: Metrics) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, metrics })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run the configured trials
    pub fn run(&self) -> Result<SimulationReport> {
        match self.config.protocol {
            ProtocolKind::Bb84 => self.run_protocol(Bb84).map(SimulationReport::Bb84),
            ProtocolKind::E91 => self.run_protocol(E91).map(SimulationReport::E91),
        }
    }

    fn run_protocol<P: Protocol>(&self, protocol: P) -> Result<SessionReport<P>> {
        let started_at = Utc::now();
        let (mut parties, channel_source) = self.random_sources();
        let mut channel = self.config.backend.build(channel_source);

        info!(
            protocol = %P::KIND,
            backend = %self.config.backend,
            length = self.config.length,
            trials = self.config.trials,
            seeded = self.config.seed.is_some(),
            "Starting simulation"
        );

        let summary = match run_trials(
            protocol,
            &mut channel,
            &mut parties,
            self.config.length,
            self.config.trials,
        ) {
            Ok(summary) => summary,
            Err(e) => {
                self.metrics.record_failure(&e);
                warn!("Simulation aborted: {}", e);
                return Err(e);
            }
        };

        for &matches in &summary.match_counts {
            self.metrics.record_session(summary.units_per_trial, matches);
        }

        let fingerprint = key_fingerprint(summary.last.sender_key());
        info!(
            mean_key_length = summary.mean_key_length,
            key_bits = summary.last.sender_key().len(),
            fingerprint = &fingerprint[..16],
            "Simulation complete"
        );

        Ok(SessionReport {
            id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            protocol: P::KIND,
            backend: self.config.backend,
            seed: self.config.seed,
            key_fingerprint: fingerprint,
            summary,
        })
    }

    /// Party and channel streams, independent of each other
    fn random_sources(&self) -> (RngSource, RngSource) {
        match self.config.seed {
            Some(seed) => (
                RngSource::seeded(seed),
                RngSource::seeded(seed ^ CHANNEL_SEED_MIX),
            ),
            None => (RngSource::from_entropy(), RngSource::from_entropy()),
        }
    }
}
