// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Amplitude-level measurement backend
//!
//! Simulates the circuits a gate-model simulator would run: a BB84 photon is encoded
//! with X (bit) and H (diagonal basis), an E91 pair starts as |Φ+⟩ from H and CNOT,
//! and each measurement rotates its qubit into the computational basis and collapses
//! the register. Outcomes are sampled from the register's probabilities using only
//! fair bit draws, so the same `RandomSource` contract serves both backends.

use crate::{
    channel::{AnalyzerBasis, BackendKind, EntangledPair, QuantumChannel},
    random::RandomSource,
    state::{Bit, EncodingBasis, PreparedState},
    Error, Result,
};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

/// Probabilities within this distance of 0 or 1 are treated as certain
const CERTAINTY_EPSILON: f64 = 1e-12;

/// Binary digits compared before a sampled outcome is decided
const SAMPLING_DIGITS: usize = 128;

type Gate = [[Complex64; 2]; 2];

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn hadamard() -> Gate {
    [
        [c(FRAC_1_SQRT_2, 0.0), c(FRAC_1_SQRT_2, 0.0)],
        [c(FRAC_1_SQRT_2, 0.0), c(-FRAC_1_SQRT_2, 0.0)],
    ]
}

fn pauli_x() -> Gate {
    [[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]]
}

fn phase_s() -> Gate {
    [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 1.0)]]
}

fn phase_s_dagger() -> Gate {
    [[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, -1.0)]]
}

/// Small qubit register in the computational basis
///
/// Qubit `q` is bit `q` of the amplitude index.
#[derive(Debug, Clone)]
pub(crate) struct Register {
    amplitudes: Vec<Complex64>,
    qubits: usize,
}

impl Register {
    /// Register initialized to |0…0⟩
    pub(crate) fn new(qubits: usize) -> Self {
        let mut amplitudes = vec![c(0.0, 0.0); 1 << qubits];
        amplitudes[0] = c(1.0, 0.0);
        Self { amplitudes, qubits }
    }

    fn check(&self, qubit: usize) -> Result<()> {
        if qubit >= self.qubits {
            return Err(Error::Backend(format!(
                "qubit {} out of range for a {}-qubit register",
                qubit, self.qubits
            )));
        }
        Ok(())
    }

    fn apply(&mut self, gate: Gate, target: usize) -> Result<()> {
        self.check(target)?;
        let mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & mask != 0 {
                continue;
            }
            let j = i | mask;
            let (a0, a1) = (self.amplitudes[i], self.amplitudes[j]);
            self.amplitudes[i] = gate[0][0] * a0 + gate[0][1] * a1;
            self.amplitudes[j] = gate[1][0] * a0 + gate[1][1] * a1;
        }
        Ok(())
    }

    pub(crate) fn h(&mut self, qubit: usize) -> Result<()> {
        self.apply(hadamard(), qubit)
    }

    pub(crate) fn x(&mut self, qubit: usize) -> Result<()> {
        self.apply(pauli_x(), qubit)
    }

    pub(crate) fn s(&mut self, qubit: usize) -> Result<()> {
        self.apply(phase_s(), qubit)
    }

    pub(crate) fn s_dagger(&mut self, qubit: usize) -> Result<()> {
        self.apply(phase_s_dagger(), qubit)
    }

    pub(crate) fn cnot(&mut self, control: usize, target: usize) -> Result<()> {
        self.check(control)?;
        self.check(target)?;
        if control == target {
            return Err(Error::Backend(format!(
                "qubit {} cannot be both control and target",
                control
            )));
        }
        let (cmask, tmask) = (1 << control, 1 << target);
        for i in 0..self.amplitudes.len() {
            if i & cmask != 0 && i & tmask == 0 {
                self.amplitudes.swap(i, i | tmask);
            }
        }
        Ok(())
    }

    /// Probability that measuring `qubit` yields 1
    pub(crate) fn probability_of_one(&self, qubit: usize) -> Result<f64> {
        self.check(qubit)?;
        let mask = 1 << qubit;
        Ok(self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum())
    }

    /// Measure `qubit` in the computational basis and collapse the register
    pub(crate) fn measure(&mut self, qubit: usize, rng: &mut dyn RandomSource) -> Result<Bit> {
        let p_one = self.probability_of_one(qubit)?;
        let outcome = sample_outcome(p_one, rng)?;
        let p_outcome = if outcome == 1 { p_one } else { 1.0 - p_one };
        let norm = p_outcome.sqrt();
        let mask = 1 << qubit;

        for (i, amplitude) in self.amplitudes.iter_mut().enumerate() {
            let bit = u8::from(i & mask != 0);
            if bit == outcome {
                *amplitude /= norm;
            } else {
                *amplitude = c(0.0, 0.0);
            }
        }
        Ok(outcome)
    }
}

/// Sample a Bernoulli(`p_one`) outcome from fair bits
///
/// Draws the binary digits of a uniform variable U one at a time and compares them
/// against the binary expansion of `p_one`, stopping at the first difference. The
/// outcome is 1 when U < `p_one`. A fair split costs exactly one draw.
fn sample_outcome(p_one: f64, rng: &mut dyn RandomSource) -> Result<Bit> {
    if !p_one.is_finite() || p_one < -CERTAINTY_EPSILON || p_one > 1.0 + CERTAINTY_EPSILON {
        return Err(Error::Backend(format!("invalid outcome probability {}", p_one)));
    }
    if p_one <= CERTAINTY_EPSILON {
        return Ok(0);
    }
    if p_one >= 1.0 - CERTAINTY_EPSILON {
        return Ok(1);
    }

    let mut remainder = p_one;
    for _ in 0..SAMPLING_DIGITS {
        remainder *= 2.0;
        let digit = if remainder >= 1.0 {
            remainder -= 1.0;
            1
        } else {
            0
        };
        let drawn = rng.bit()?;
        if drawn < digit {
            return Ok(1);
        }
        if drawn > digit || remainder == 0.0 {
            return Ok(0);
        }
    }
    Ok(0)
}

/// Which station mounts an analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Station {
    Sender,
    Receiver,
}

/// Rotate `qubit` so that a computational measurement reads out `setting`
///
/// The receiver's circular analyzer carries the compensating rotation (it reads
/// along −Y), turning the Y·Y anti-correlation of |Φ+⟩ into agreement.
fn rotate_into(register: &mut Register, qubit: usize, setting: AnalyzerBasis, station: Station) -> Result<()> {
    match (setting, station) {
        (AnalyzerBasis::Rectilinear, _) => Ok(()),
        (AnalyzerBasis::Diagonal, _) => register.h(qubit),
        (AnalyzerBasis::Circular, Station::Sender) => {
            register.s_dagger(qubit)?;
            register.h(qubit)
        }
        (AnalyzerBasis::Circular, Station::Receiver) => {
            register.s(qubit)?;
            register.h(qubit)
        }
    }
}

/// Channel that runs every unit through a fresh register
#[derive(Debug, Clone)]
pub struct StateVectorChannel<R> {
    rng: R,
}

impl<R: RandomSource> StateVectorChannel<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RandomSource> QuantumChannel for StateVectorChannel<R> {
    fn measure(&mut self, state: PreparedState, basis: EncodingBasis) -> Result<Bit> {
        let mut register = Register::new(1);
        if state.bit() == 1 {
            register.x(0)?;
        }
        if state.basis() == EncodingBasis::Diagonal {
            register.h(0)?;
        }
        if basis == EncodingBasis::Diagonal {
            register.h(0)?;
        }
        register.measure(0, &mut self.rng)
    }

    fn measure_pair(&mut self, pair: &EntangledPair, receiver: AnalyzerBasis) -> Result<(Bit, Bit)> {
        let mut register = Register::new(2);
        register.h(0)?;
        register.cnot(0, 1)?;

        rotate_into(&mut register, 0, pair.sender_analyzer(), Station::Sender)?;
        rotate_into(&mut register, 1, receiver, Station::Receiver)?;

        let sender_bit = register.measure(0, &mut self.rng)?;
        let receiver_bit = register.measure(1, &mut self.rng)?;
        Ok((sender_bit, receiver_bit))
    }

    fn backend(&self) -> BackendKind {
        BackendKind::StateVector
    }
}
