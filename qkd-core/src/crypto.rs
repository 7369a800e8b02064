// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Key fingerprints
//!
//! Sifted keys never appear in logs. A SHA-256 fingerprint identifies a key and lets
//! both parties confirm they hold the same bits without printing them.

use crate::state::Bit;
use sha2::{Digest, Sha256};

/// Pack bits MSB-first into bytes, zero-padding the final byte
pub fn pack_bits(bits: &[Bit]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &bit)| byte | ((bit & 1) << (7 - i)))
        })
        .collect()
}

/// Hex SHA-256 over the bit length followed by the packed key
///
/// The length prefix keeps keys that differ only in trailing zero bits apart.
pub fn key_fingerprint(bits: &[Bit]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((bits.len() as u64).to_be_bytes());
    hasher.update(pack_bits(bits));
    hex::encode(hasher.finalize())
}
