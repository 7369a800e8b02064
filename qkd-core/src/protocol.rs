// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Protocol families
//!
//! BB84 and E91 run through the same pipeline (prepare, receive, reconcile) and differ
//! only in what a transmitted unit is, which bases each party may pick, and how a unit
//! is detected. `Protocol` captures exactly those differences.

use crate::{
    channel::{AnalyzerBasis, EntangledPair, QuantumChannel},
    random::RandomSource,
    state::{Bit, EncodingBasis, PreparedState},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol family tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    /// Prepare-and-measure with two conjugate bases
    #[default]
    Bb84,
    /// Entangled pairs with three analyzer settings
    E91,
}

impl ProtocolKind {
    /// Number of bases each party chooses from
    pub fn basis_choices(self) -> usize {
        match self {
            ProtocolKind::Bb84 => EncodingBasis::ALL.len(),
            ProtocolKind::E91 => AnalyzerBasis::ALL.len(),
        }
    }

    /// Expected fraction of matching indices for independent uniform choices
    pub fn expected_match_fraction(self) -> f64 {
        1.0 / self.basis_choices() as f64
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Bb84 => f.write_str("bb84"),
            ProtocolKind::E91 => f.write_str("e91"),
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bb84" => Ok(ProtocolKind::Bb84),
            "e91" => Ok(ProtocolKind::E91),
            other => Err(Error::Config(format!(
                "unknown protocol '{}', expected 'bb84' or 'e91'",
                other
            ))),
        }
    }
}

/// Both parties' bits for one detected unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub sender_bit: Bit,
    pub receiver_bit: Bit,
}

/// Receiver-side result of a transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception<B> {
    /// Basis the receiver chose per unit
    pub bases: Vec<B>,
    /// Receiver's measured bit per unit
    pub outcomes: Vec<Bit>,
    /// Sender's bit per unit (encoded for BB84, measured for E91)
    pub sender_bits: Vec<Bit>,
}

impl<B> Reception<B> {
    fn with_capacity(n: usize) -> Self {
        Self {
            bases: Vec::with_capacity(n),
            outcomes: Vec::with_capacity(n),
            sender_bits: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}

/// Strategy for one protocol family
pub trait Protocol: Copy + Default + fmt::Debug + Send + Sync + 'static {
    /// What the sender emits per position
    type Unit: Copy + fmt::Debug + PartialEq + Serialize;
    /// What each party chooses per position
    type Basis: Copy + fmt::Debug + fmt::Display + Eq + Serialize;

    const KIND: ProtocolKind;

    /// Sender role: emit `n` independent random units
    fn prepare(&self, rng: &mut dyn RandomSource, n: usize) -> Result<Vec<Self::Unit>>;

    /// Basis the sender used for `unit`
    fn sender_basis(&self, unit: &Self::Unit) -> Self::Basis;

    /// Receiver's uniform basis choice for one unit
    fn choose_basis(&self, rng: &mut dyn RandomSource) -> Result<Self::Basis>;

    /// Run one unit through the channel with the receiver measuring in `basis`
    fn detect(
        &self,
        channel: &mut dyn QuantumChannel,
        unit: &Self::Unit,
        basis: Self::Basis,
    ) -> Result<Detection>;

    /// Receiver role: pick a basis per unit and measure it once
    ///
    /// An empty slice is a valid degenerate transmission and yields an empty reception.
    /// A backend failure on any unit aborts the whole reception.
    fn receive(
        &self,
        channel: &mut dyn QuantumChannel,
        rng: &mut dyn RandomSource,
        units: &[Self::Unit],
    ) -> Result<Reception<Self::Basis>> {
        let mut reception = Reception::with_capacity(units.len());
        for unit in units {
            let basis = self.choose_basis(rng)?;
            let detection = self.detect(channel, unit, basis)?;
            reception.bases.push(basis);
            reception.outcomes.push(detection.receiver_bit);
            reception.sender_bits.push(detection.sender_bit);
        }
        Ok(reception)
    }
}

/// Single photons in the rectilinear and diagonal bases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bb84;

impl Bb84 {
    /// Encode explicit data bits in explicit bases
    pub fn encode(&self, data: &[Bit], bases: &[EncodingBasis]) -> Result<Vec<PreparedState>> {
        if data.len() != bases.len() {
            return Err(Error::InvalidLength(format!(
                "{} data bits but {} bases",
                data.len(),
                bases.len()
            )));
        }
        data.iter()
            .zip(bases)
            .map(|(&bit, &basis)| PreparedState::from_parts(bit, basis))
            .collect()
    }
}

impl Protocol for Bb84 {
    type Unit = PreparedState;
    type Basis = EncodingBasis;

    const KIND: ProtocolKind = ProtocolKind::Bb84;

    fn prepare(&self, rng: &mut dyn RandomSource, n: usize) -> Result<Vec<PreparedState>> {
        (0..n).map(|_| PreparedState::random(rng)).collect()
    }

    fn sender_basis(&self, unit: &PreparedState) -> EncodingBasis {
        unit.basis()
    }

    fn choose_basis(&self, rng: &mut dyn RandomSource) -> Result<EncodingBasis> {
        EncodingBasis::random(rng)
    }

    fn detect(
        &self,
        channel: &mut dyn QuantumChannel,
        unit: &PreparedState,
        basis: EncodingBasis,
    ) -> Result<Detection> {
        Ok(Detection {
            sender_bit: unit.bit(),
            receiver_bit: channel.measure(*unit, basis)?,
        })
    }
}

/// Entangled pairs measured with three analyzer settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct E91;

impl Protocol for E91 {
    type Unit = EntangledPair;
    type Basis = AnalyzerBasis;

    const KIND: ProtocolKind = ProtocolKind::E91;

    fn prepare(&self, rng: &mut dyn RandomSource, n: usize) -> Result<Vec<EntangledPair>> {
        (0..n)
            .map(|_| AnalyzerBasis::random(rng).map(EntangledPair::new))
            .collect()
    }

    fn sender_basis(&self, unit: &EntangledPair) -> AnalyzerBasis {
        unit.sender_analyzer()
    }

    fn choose_basis(&self, rng: &mut dyn RandomSource) -> Result<AnalyzerBasis> {
        AnalyzerBasis::random(rng)
    }

    fn detect(
        &self,
        channel: &mut dyn QuantumChannel,
        unit: &EntangledPair,
        basis: AnalyzerBasis,
    ) -> Result<Detection> {
        let (sender_bit, receiver_bit) = channel.measure_pair(unit, basis)?;
        Ok(Detection {
            sender_bit,
            receiver_bit,
        })
    }
}
