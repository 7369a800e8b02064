// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Quantum channel interface
//!
//! The channel is the only place where a prepared unit turns into a classical bit.
//! Protocol logic sees nothing but `(unit, basis) -> bit`; how the probabilities are
//! computed (analytic rule or amplitude simulation) stays behind this trait.

use crate::{
    random::RandomSource,
    state::{Bit, EncodingBasis, PreparedState},
    statevector::StateVectorChannel,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analyzer orientation for one half of an entangled pair
///
/// The three settings are mutually unbiased: two stations using the same setting see
/// perfectly correlated outcomes, different settings see independent outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerBasis {
    /// Computational (Z) axis
    Rectilinear,
    /// Hadamard (X) axis
    Diagonal,
    /// Circular (Y) axis
    Circular,
}

impl AnalyzerBasis {
    /// All settings, indexed by the value a random draw selects
    pub const ALL: [AnalyzerBasis; 3] = [
        AnalyzerBasis::Rectilinear,
        AnalyzerBasis::Diagonal,
        AnalyzerBasis::Circular,
    ];

    /// Draw a setting uniformly at random
    pub fn random(rng: &mut dyn RandomSource) -> Result<Self> {
        let index = rng.draw(Self::ALL.len() as u8)?;
        Ok(Self::ALL[index as usize])
    }

    /// Short notation used in reports
    pub fn symbol(self) -> char {
        match self {
            AnalyzerBasis::Rectilinear => '+',
            AnalyzerBasis::Diagonal => 'x',
            AnalyzerBasis::Circular => 'o',
        }
    }
}

impl fmt::Display for AnalyzerBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One emitted entangled pair
///
/// The sender's station sits next to the source, so its analyzer setting is fixed
/// when the pair is emitted. The pair is measured exactly once by each station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntangledPair {
    sender_analyzer: AnalyzerBasis,
}

impl EntangledPair {
    pub fn new(sender_analyzer: AnalyzerBasis) -> Self {
        Self { sender_analyzer }
    }

    pub fn sender_analyzer(&self) -> AnalyzerBasis {
        self.sender_analyzer
    }
}

/// Transmission and measurement of prepared units
pub trait QuantumChannel {
    /// Measure a single prepared photon in `basis`
    fn measure(&mut self, state: PreparedState, basis: EncodingBasis) -> Result<Bit>;

    /// Measure both halves of `pair` in one joint computation
    ///
    /// Returns `(sender_bit, receiver_bit)`. Both outcomes come from the same draw so
    /// that matching analyzer settings always agree.
    fn measure_pair(&mut self, pair: &EntangledPair, receiver: AnalyzerBasis) -> Result<(Bit, Bit)>;

    /// Backend label for logs
    fn backend(&self) -> BackendKind;
}

impl<T: QuantumChannel + ?Sized> QuantumChannel for Box<T> {
    fn measure(&mut self, state: PreparedState, basis: EncodingBasis) -> Result<Bit> {
        (**self).measure(state, basis)
    }

    fn measure_pair(&mut self, pair: &EntangledPair, receiver: AnalyzerBasis) -> Result<(Bit, Bit)> {
        (**self).measure_pair(pair, receiver)
    }

    fn backend(&self) -> BackendKind {
        (**self).backend()
    }
}

/// Measurement backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Analytic matched/mismatched rule
    #[default]
    Ideal,
    /// Complex-amplitude register simulation
    StateVector,
}

impl BackendKind {
    /// Build a channel of this kind drawing collapse outcomes from `rng`
    pub fn build<R>(self, rng: R) -> Box<dyn QuantumChannel>
    where
        R: RandomSource + 'static,
    {
        match self {
            BackendKind::Ideal => Box::new(IdealChannel::new(rng)),
            BackendKind::StateVector => Box::new(StateVectorChannel::new(rng)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Ideal => f.write_str("ideal"),
            BackendKind::StateVector => f.write_str("statevector"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ideal" => Ok(BackendKind::Ideal),
            "statevector" | "state-vector" => Ok(BackendKind::StateVector),
            other => Err(Error::Config(format!(
                "unknown backend '{}', expected 'ideal' or 'statevector'",
                other
            ))),
        }
    }
}

/// Noiseless channel applying the measurement rule directly
#[derive(Debug, Clone)]
pub struct IdealChannel<R> {
    rng: R,
}

impl<R: RandomSource> IdealChannel<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RandomSource> QuantumChannel for IdealChannel<R> {
    fn measure(&mut self, state: PreparedState, basis: EncodingBasis) -> Result<Bit> {
        state.measure(basis, &mut self.rng)
    }

    fn measure_pair(&mut self, pair: &EntangledPair, receiver: AnalyzerBasis) -> Result<(Bit, Bit)> {
        let shared = self.rng.bit()?;
        let receiver_bit = if pair.sender_analyzer() == receiver {
            shared
        } else {
            self.rng.bit()?
        };
        Ok((shared, receiver_bit))
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Ideal
    }
}
