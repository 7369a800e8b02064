// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Basis reconciliation
//!
//! After transmission both parties publish their bases. Positions where the bases
//! agree are kept, in original index order, and each party reads its key bit from
//! those positions. Everything else is discarded.

use crate::{state::Bit, Error, Result};
use serde::{Deserialize, Serialize};

/// Kept positions and both parties' keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub matching_indices: Vec<usize>,
    pub sender_key: Vec<Bit>,
    pub receiver_key: Vec<Bit>,
}

impl Reconciliation {
    /// Number of retained positions
    pub fn key_length(&self) -> usize {
        self.matching_indices.len()
    }

    /// True when both keys are bit-for-bit identical
    pub fn keys_agree(&self) -> bool {
        self.sender_key == self.receiver_key
    }

    /// Positions in the sifted keys where the parties disagree
    pub fn disagreements(&self) -> usize {
        self.sender_key
            .iter()
            .zip(&self.receiver_key)
            .filter(|(a, b)| a != b)
            .count()
    }
}

/// Compare bases index by index and extract both keys
///
/// All four sequences must have the same length.
pub fn reconcile<B: PartialEq>(
    sender_bases: &[B],
    receiver_bases: &[B],
    sender_bits: &[Bit],
    receiver_bits: &[Bit],
) -> Result<Reconciliation> {
    let n = sender_bases.len();
    if receiver_bases.len() != n || sender_bits.len() != n || receiver_bits.len() != n {
        return Err(Error::InvalidLength(format!(
            "reconciliation inputs differ in length: sender bases {}, receiver bases {}, sender bits {}, receiver bits {}",
            n,
            receiver_bases.len(),
            sender_bits.len(),
            receiver_bits.len()
        )));
    }

    let mut reconciliation = Reconciliation::default();
    for (i, (sender, receiver)) in sender_bases.iter().zip(receiver_bases).enumerate() {
        if sender == receiver {
            reconciliation.matching_indices.push(i);
            reconciliation.sender_key.push(sender_bits[i]);
            reconciliation.receiver_key.push(receiver_bits[i]);
        }
    }
    Ok(reconciliation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EncodingBasis::{Diagonal as D, Rectilinear as R};
    use proptest::prelude::*;

    #[test]
    fn test_keeps_matches_in_index_order() {
        let result = reconcile(&[R, R, D, D], &[R, D, D, R], &[0, 1, 1, 0], &[0, 0, 1, 1]).unwrap();
        assert_eq!(result.matching_indices, vec![0, 2]);
        assert_eq!(result.sender_key, vec![0, 1]);
        assert_eq!(result.receiver_key, vec![0, 1]);
        assert!(result.keys_agree());
    }

    #[test]
    fn test_empty_inputs() {
        let result = reconcile::<u8>(&[], &[], &[], &[]).unwrap();
        assert_eq!(result.key_length(), 0);
        assert!(result.keys_agree());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = reconcile(&[R, D], &[R], &[0, 1], &[0, 1]).unwrap_err();
        assert!(err.is_invalid_length());
    }

    #[test]
    fn test_disagreements_counted() {
        let result = reconcile(&[R, R, R], &[R, R, R], &[0, 1, 1], &[0, 0, 1]).unwrap();
        assert_eq!(result.disagreements(), 1);
        assert!(!result.keys_agree());
    }

    proptest! {
        #[test]
        fn prop_key_lengths_match_indices(
            rows in prop::collection::vec((0u8..3, 0u8..3, 0u8..2, 0u8..2), 0..200)
        ) {
            let sender_bases: Vec<u8> = rows.iter().map(|r| r.0).collect();
            let receiver_bases: Vec<u8> = rows.iter().map(|r| r.1).collect();
            let sender_bits: Vec<u8> = rows.iter().map(|r| r.2).collect();
            let receiver_bits: Vec<u8> = rows.iter().map(|r| r.3).collect();

            let result = reconcile(&sender_bases, &receiver_bases, &sender_bits, &receiver_bits).unwrap();
            prop_assert_eq!(result.sender_key.len(), result.matching_indices.len());
            prop_assert_eq!(result.receiver_key.len(), result.matching_indices.len());
            prop_assert!(result.matching_indices.windows(2).all(|w| w[0] < w[1]));
            for (k, &i) in result.matching_indices.iter().enumerate() {
                prop_assert_eq!(sender_bases[i], receiver_bases[i]);
                prop_assert_eq!(result.sender_key[k], sender_bits[i]);
                prop_assert_eq!(result.receiver_key[k], receiver_bits[i]);
            }
        }
    }
}
