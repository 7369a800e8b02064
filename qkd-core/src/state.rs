// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Photon states and encoding bases
//!
//! Every BB84 photon is one of four polarization states. Each state belongs to exactly
//! one encoding basis and carries exactly one classical bit:
//!
//! | state | basis       | bit |
//! |-------|-------------|-----|
//! | V     | Rectilinear | 0   |
//! | H     | Rectilinear | 1   |
//! | D     | Diagonal    | 1   |
//! | A     | Diagonal    | 0   |

use crate::{random::RandomSource, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classical bit, always 0 or 1
pub type Bit = u8;

/// Encoding basis shared by BB84 preparation and measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingBasis {
    /// Vertical/horizontal polarization
    Rectilinear,
    /// Diagonal/anti-diagonal polarization
    Diagonal,
}

impl EncodingBasis {
    /// All bases, indexed by the value a random draw selects
    pub const ALL: [EncodingBasis; 2] = [EncodingBasis::Rectilinear, EncodingBasis::Diagonal];

    /// Draw a basis uniformly at random
    pub fn random(rng: &mut dyn RandomSource) -> Result<Self> {
        let index = rng.draw(Self::ALL.len() as u8)?;
        Ok(Self::ALL[index as usize])
    }

    /// Short notation used in reports
    pub fn symbol(self) -> char {
        match self {
            EncodingBasis::Rectilinear => '+',
            EncodingBasis::Diagonal => 'x',
        }
    }
}

impl fmt::Display for EncodingBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Polarization state prepared by the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreparedState {
    /// Vertical
    V,
    /// Horizontal
    H,
    /// Diagonal
    D,
    /// Anti-diagonal
    A,
}

/// Canonical state table: (state, natural basis, encoded bit)
pub const STATE_TABLE: [(PreparedState, EncodingBasis, Bit); 4] = [
    (PreparedState::V, EncodingBasis::Rectilinear, 0),
    (PreparedState::H, EncodingBasis::Rectilinear, 1),
    (PreparedState::D, EncodingBasis::Diagonal, 1),
    (PreparedState::A, EncodingBasis::Diagonal, 0),
];

impl PreparedState {
    /// All states, indexed by the value a random draw selects
    pub const ALL: [PreparedState; 4] = [
        PreparedState::V,
        PreparedState::H,
        PreparedState::D,
        PreparedState::A,
    ];

    /// Draw one of the four states uniformly at random
    pub fn random(rng: &mut dyn RandomSource) -> Result<Self> {
        let index = rng.draw(Self::ALL.len() as u8)?;
        Ok(Self::ALL[index as usize])
    }

    /// Natural basis of this state
    pub fn basis(self) -> EncodingBasis {
        match self {
            PreparedState::V | PreparedState::H => EncodingBasis::Rectilinear,
            PreparedState::D | PreparedState::A => EncodingBasis::Diagonal,
        }
    }

    /// Bit encoded by this state
    pub fn bit(self) -> Bit {
        match self {
            PreparedState::V | PreparedState::A => 0,
            PreparedState::H | PreparedState::D => 1,
        }
    }

    /// Combine a data bit and a basis into the state encoding them
    pub fn from_parts(bit: Bit, basis: EncodingBasis) -> Result<Self> {
        STATE_TABLE
            .iter()
            .find(|(_, b, v)| *b == basis && *v == bit)
            .map(|(state, _, _)| *state)
            .ok_or_else(|| Error::Backend(format!("{} is not a classical bit", bit)))
    }

    /// Outcome of measuring this state in `basis`
    ///
    /// A matching basis reproduces the encoded bit. A conjugate basis collapses the
    /// photon to either outcome with equal probability, so a fair bit is drawn from `rng`.
    pub fn measure(self, basis: EncodingBasis, rng: &mut dyn RandomSource) -> Result<Bit> {
        if self.basis() == basis {
            Ok(self.bit())
        } else {
            rng.bit()
        }
    }
}

impl fmt::Display for PreparedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PreparedState::V => "V",
            PreparedState::H => "H",
            PreparedState::D => "D",
            PreparedState::A => "A",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RngSource, ScriptedSource};

    #[test]
    fn test_state_table_matches_accessors() {
        for (state, basis, bit) in STATE_TABLE {
            assert_eq!(state.basis(), basis, "basis of {}", state);
            assert_eq!(state.bit(), bit, "bit of {}", state);
            assert_eq!(PreparedState::from_parts(bit, basis).unwrap(), state);
        }
    }

    #[test]
    fn test_table_is_total() {
        for state in PreparedState::ALL {
            let rows = STATE_TABLE.iter().filter(|(s, _, _)| *s == state).count();
            assert_eq!(rows, 1, "{} must appear exactly once", state);
        }
    }

    #[test]
    fn test_from_parts_rejects_non_bit() {
        assert!(PreparedState::from_parts(2, EncodingBasis::Diagonal).is_err());
    }

    #[test]
    fn test_matching_basis_is_deterministic() {
        // An empty script proves no randomness is consumed
        let mut rng = ScriptedSource::new(Vec::new());
        assert_eq!(PreparedState::V.measure(EncodingBasis::Rectilinear, &mut rng).unwrap(), 0);
        assert_eq!(PreparedState::H.measure(EncodingBasis::Rectilinear, &mut rng).unwrap(), 1);
        assert_eq!(PreparedState::D.measure(EncodingBasis::Diagonal, &mut rng).unwrap(), 1);
        assert_eq!(PreparedState::A.measure(EncodingBasis::Diagonal, &mut rng).unwrap(), 0);
    }

    #[test]
    fn test_mismatched_basis_samples() {
        let mut rng = ScriptedSource::new(vec![1, 0]);
        assert_eq!(PreparedState::V.measure(EncodingBasis::Diagonal, &mut rng).unwrap(), 1);
        assert_eq!(PreparedState::V.measure(EncodingBasis::Diagonal, &mut rng).unwrap(), 0);
        assert!(PreparedState::V
            .measure(EncodingBasis::Diagonal, &mut rng)
            .unwrap_err()
            .is_backend_failure());
    }

    #[test]
    fn test_mismatched_basis_is_fair() {
        let mut rng = RngSource::seeded(7);
        let samples = 20_000;
        let ones: u32 = (0..samples)
            .map(|_| PreparedState::H.measure(EncodingBasis::Diagonal, &mut rng).unwrap() as u32)
            .sum();
        let ratio = ones as f64 / samples as f64;
        assert!((ratio - 0.5).abs() < 0.02, "ratio of ones was {}", ratio);
    }

    #[test]
    fn test_random_state_covers_alphabet() {
        let mut rng = RngSource::seeded(11);
        let mut counts = [0usize; 4];
        for _ in 0..400 {
            let state = PreparedState::random(&mut rng).unwrap();
            counts[PreparedState::ALL.iter().position(|s| *s == state).unwrap()] += 1;
        }
        for (i, &count) in counts.iter().enumerate() {
            assert!(count > 0, "State variant {} was not generated", i);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(PreparedState::D.to_string(), "D");
        assert_eq!(EncodingBasis::Rectilinear.to_string(), "+");
        assert_eq!(EncodingBasis::Diagonal.to_string(), "x");
    }
}
