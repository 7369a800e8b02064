// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Session driver
//!
//! A session runs prepare, receive and reconcile once over `n` units. Trials repeat
//! independent sessions and average the number of matching indices.

use crate::{
    channel::QuantumChannel,
    protocol::{Protocol, ProtocolKind},
    random::RandomSource,
    reconcile::{reconcile, Reconciliation},
    state::Bit,
    Error, Result, MAX_UNITS,
};
use serde::Serialize;
use tracing::{debug, info};

/// Everything observed during one protocol run
///
/// Built once by `run_session` and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "P::Unit: Serialize, P::Basis: Serialize"))]
pub struct TransmissionRecord<P: Protocol> {
    protocol: ProtocolKind,
    units: Vec<P::Unit>,
    sender_bases: Vec<P::Basis>,
    sender_bits: Vec<Bit>,
    receiver_bases: Vec<P::Basis>,
    receiver_outcomes: Vec<Bit>,
    #[serde(flatten)]
    reconciliation: Reconciliation,
}

impl<P: Protocol> TransmissionRecord<P> {
    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    /// Number of transmitted units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Sender's prepared states (BB84) or emitted pairs (E91)
    pub fn units(&self) -> &[P::Unit] {
        &self.units
    }

    pub fn sender_bases(&self) -> &[P::Basis] {
        &self.sender_bases
    }

    /// Sender's data bits (BB84) or measured bits (E91)
    pub fn sender_bits(&self) -> &[Bit] {
        &self.sender_bits
    }

    pub fn receiver_bases(&self) -> &[P::Basis] {
        &self.receiver_bases
    }

    pub fn receiver_outcomes(&self) -> &[Bit] {
        &self.receiver_outcomes
    }

    pub fn matching_indices(&self) -> &[usize] {
        &self.reconciliation.matching_indices
    }

    pub fn sender_key(&self) -> &[Bit] {
        &self.reconciliation.sender_key
    }

    pub fn receiver_key(&self) -> &[Bit] {
        &self.reconciliation.receiver_key
    }

    pub fn reconciliation(&self) -> &Reconciliation {
        &self.reconciliation
    }

    /// Fraction of units whose bases matched
    pub fn match_fraction(&self) -> f64 {
        if self.units.is_empty() {
            0.0
        } else {
            self.reconciliation.key_length() as f64 / self.units.len() as f64
        }
    }
}

/// Reject lengths the engine cannot run
pub(crate) fn validate_length(value: usize, what: &str) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidLength(format!("{} must be positive", what)));
    }
    if value > MAX_UNITS {
        return Err(Error::InvalidLength(format!(
            "{} {} exceeds the maximum of {}",
            what, value, MAX_UNITS
        )));
    }
    Ok(())
}

/// Run one full protocol exchange over `n` units
///
/// Party choices draw from `rng`; collapse outcomes draw from the channel's own source.
/// Any backend failure aborts the session.
pub fn run_session<P: Protocol>(
    protocol: P,
    channel: &mut dyn QuantumChannel,
    rng: &mut dyn RandomSource,
    n: usize,
) -> Result<TransmissionRecord<P>> {
    validate_length(n, "message length")?;

    let units = protocol.prepare(rng, n)?;
    let reception = protocol.receive(channel, rng, &units)?;
    let sender_bases: Vec<P::Basis> = units.iter().map(|u| protocol.sender_basis(u)).collect();

    let reconciliation = reconcile(
        &sender_bases,
        &reception.bases,
        &reception.sender_bits,
        &reception.outcomes,
    )?;

    debug!(
        protocol = %P::KIND,
        backend = %channel.backend(),
        units = n,
        matches = reconciliation.key_length(),
        "Session complete"
    );

    Ok(TransmissionRecord {
        protocol: P::KIND,
        units,
        sender_bases,
        sender_bits: reception.sender_bits,
        receiver_bases: reception.bases,
        receiver_outcomes: reception.outcomes,
        reconciliation,
    })
}

/// Averaged outcome of repeated independent sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound(serialize = "P::Unit: Serialize, P::Basis: Serialize"))]
pub struct TrialSummary<P: Protocol> {
    pub protocol: ProtocolKind,
    pub trials: usize,
    pub units_per_trial: usize,
    /// Matching-index count of each trial, in run order
    pub match_counts: Vec<usize>,
    /// Arithmetic mean of `match_counts`
    pub mean_key_length: f64,
    /// Record of the final trial
    pub last: TransmissionRecord<P>,
}

impl<P: Protocol> TrialSummary<P> {
    pub fn min_key_length(&self) -> usize {
        self.match_counts.iter().copied().min().unwrap_or(0)
    }

    pub fn max_key_length(&self) -> usize {
        self.match_counts.iter().copied().max().unwrap_or(0)
    }

    /// Mean fraction of units retained per trial
    pub fn mean_match_fraction(&self) -> f64 {
        self.mean_key_length / self.units_per_trial as f64
    }
}

/// Run `trials` independent sessions of `n` units and average the key lengths
///
/// Trials share no state beyond the random streams, which advance between trials so
/// every trial sees fresh draws.
pub fn run_trials<P: Protocol>(
    protocol: P,
    channel: &mut dyn QuantumChannel,
    rng: &mut dyn RandomSource,
    n: usize,
    trials: usize,
) -> Result<TrialSummary<P>> {
    validate_length(n, "message length")?;
    validate_length(trials, "trial count")?;

    let mut match_counts = Vec::with_capacity(trials);
    let mut last = None;
    for _ in 0..trials {
        let record = run_session(protocol, channel, rng, n)?;
        match_counts.push(record.matching_indices().len());
        last = Some(record);
    }

    let last = last.ok_or_else(|| Error::InvalidLength("trial count must be positive".to_string()))?;
    let mean_key_length = match_counts.iter().sum::<usize>() as f64 / trials as f64;

    info!(
        protocol = %P::KIND,
        trials,
        units = n,
        mean_key_length,
        "Trials complete"
    );

    Ok(TrialSummary {
        protocol: P::KIND,
        trials,
        units_per_trial: n,
        match_counts,
        mean_key_length,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{BackendKind, IdealChannel};
    use crate::protocol::{Bb84, E91};
    use crate::random::{RngSource, ScriptedSource};
    use crate::state::{EncodingBasis, PreparedState};
    use proptest::prelude::*;

    #[test]
    fn test_walkthrough_v_h_d_a() {
        // Sender states V H D A, receiver bases + x x +
        let mut parties = ScriptedSource::new(vec![0, 1, 2, 3, 0, 1, 1, 0]);
        // Collapse outcomes for the two mismatched positions (H in x, A in +)
        let mut channel = IdealChannel::new(ScriptedSource::new(vec![1, 1]));

        let record = run_session(Bb84, &mut channel, &mut parties, 4).unwrap();

        assert_eq!(
            record.units(),
            &[PreparedState::V, PreparedState::H, PreparedState::D, PreparedState::A]
        );
        assert_eq!(
            record.sender_bases(),
            &[
                EncodingBasis::Rectilinear,
                EncodingBasis::Rectilinear,
                EncodingBasis::Diagonal,
                EncodingBasis::Diagonal
            ]
        );
        assert_eq!(
            record.receiver_bases(),
            &[
                EncodingBasis::Rectilinear,
                EncodingBasis::Diagonal,
                EncodingBasis::Diagonal,
                EncodingBasis::Rectilinear
            ]
        );
        assert_eq!(record.matching_indices(), &[0, 2]);
        assert_eq!(record.sender_key(), &[0, 1]);
        assert_eq!(record.receiver_key(), &[0, 1]);
        assert_eq!(record.receiver_outcomes(), &[0, 1, 1, 1]);
        assert_eq!(parties.remaining(), 0);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut rng = RngSource::seeded(1);
        let mut channel = IdealChannel::new(RngSource::seeded(2));
        assert!(run_session(Bb84, &mut channel, &mut rng, 0)
            .unwrap_err()
            .is_invalid_length());
        assert!(run_session(E91, &mut channel, &mut rng, 0)
            .unwrap_err()
            .is_invalid_length());
        assert!(run_trials(Bb84, &mut channel, &mut rng, 10, 0)
            .unwrap_err()
            .is_invalid_length());
        assert!(run_trials(Bb84, &mut channel, &mut rng, 0, 3)
            .unwrap_err()
            .is_invalid_length());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut rng = RngSource::seeded(1);
        let mut channel = IdealChannel::new(RngSource::seeded(2));
        let err = run_session(Bb84, &mut channel, &mut rng, MAX_UNITS + 1).unwrap_err();
        assert!(err.is_invalid_length());
    }

    #[test]
    fn test_bb84_match_rate_converges_to_half() {
        let mut rng = RngSource::seeded(101);
        let mut channel = IdealChannel::new(RngSource::seeded(102));
        let record = run_session(Bb84, &mut channel, &mut rng, 10_000).unwrap();
        let fraction = record.match_fraction();
        assert!((fraction - 0.5).abs() < 0.02, "BB84 match fraction {}", fraction);
        assert_eq!(record.sender_key(), record.receiver_key());
    }

    #[test]
    fn test_e91_match_rate_converges_to_third() {
        let mut rng = RngSource::seeded(201);
        let mut channel = IdealChannel::new(RngSource::seeded(202));
        let record = run_session(E91, &mut channel, &mut rng, 10_000).unwrap();
        let fraction = record.match_fraction();
        assert!((fraction - 1.0 / 3.0).abs() < 0.02, "E91 match fraction {}", fraction);
        assert_eq!(record.sender_key(), record.receiver_key());
    }

    #[test]
    fn test_statevector_backend_keys_agree() {
        for kind in [ProtocolKind::Bb84, ProtocolKind::E91] {
            let mut rng = RngSource::seeded(301);
            let mut channel = BackendKind::StateVector.build(RngSource::seeded(302));
            let reconciliation = match kind {
                ProtocolKind::Bb84 => run_session(Bb84, &mut channel, &mut rng, 500)
                    .unwrap()
                    .reconciliation()
                    .clone(),
                ProtocolKind::E91 => run_session(E91, &mut channel, &mut rng, 500)
                    .unwrap()
                    .reconciliation()
                    .clone(),
            };
            assert!(reconciliation.key_length() > 0);
            assert!(reconciliation.keys_agree(), "{} keys differ", kind);
        }
    }

    #[test]
    fn test_trials_average_matching_counts() {
        let mut rng = RngSource::seeded(401);
        let mut channel = IdealChannel::new(RngSource::seeded(402));
        let summary = run_trials(Bb84, &mut channel, &mut rng, 200, 50).unwrap();

        assert_eq!(summary.trials, 50);
        assert_eq!(summary.match_counts.len(), 50);
        let mean = summary.match_counts.iter().sum::<usize>() as f64 / 50.0;
        assert!((summary.mean_key_length - mean).abs() < 1e-12);
        assert!(summary.min_key_length() <= summary.max_key_length());
        assert!((summary.mean_match_fraction() - 0.5).abs() < 0.03);
        assert_eq!(summary.last.len(), 200);
    }

    #[test]
    fn test_trials_draw_fresh_randomness() {
        let mut rng = RngSource::seeded(501);
        let mut channel = IdealChannel::new(RngSource::seeded(502));
        let summary = run_trials(Bb84, &mut channel, &mut rng, 64, 20).unwrap();
        let first = summary.match_counts[0];
        assert!(summary.match_counts.iter().any(|&c| c != first));
    }

    #[test]
    fn test_backend_failure_is_fatal_to_session() {
        // Receiver picks diagonal for a V photon, the channel cannot collapse it
        let mut parties = ScriptedSource::new(vec![0, 1]);
        let mut channel = IdealChannel::new(ScriptedSource::new(Vec::new()));
        let err = run_session(Bb84, &mut channel, &mut parties, 1).unwrap_err();
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_record_serializes_all_fields() {
        let mut rng = RngSource::seeded(7);
        let mut channel = IdealChannel::new(RngSource::seeded(8));
        let record = run_session(E91, &mut channel, &mut rng, 8).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        for field in [
            "protocol",
            "units",
            "sender_bases",
            "sender_bits",
            "receiver_bases",
            "receiver_outcomes",
            "matching_indices",
            "sender_key",
            "receiver_key",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(json["protocol"], "e91");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_bb84_keys_identical(seed in any::<u64>(), n in 1usize..300) {
            let mut rng = RngSource::seeded(seed);
            let mut channel = IdealChannel::new(RngSource::seeded(seed.wrapping_add(1)));
            let record = run_session(Bb84, &mut channel, &mut rng, n).unwrap();
            prop_assert_eq!(record.len(), n);
            prop_assert_eq!(record.sender_key().len(), record.matching_indices().len());
            prop_assert_eq!(record.receiver_key().len(), record.matching_indices().len());
            prop_assert_eq!(record.sender_key(), record.receiver_key());
        }

        #[test]
        fn prop_e91_keys_identical(seed in any::<u64>(), n in 1usize..300) {
            let mut rng = RngSource::seeded(seed);
            let mut channel = IdealChannel::new(RngSource::seeded(seed.wrapping_add(1)));
            let record = run_session(E91, &mut channel, &mut rng, n).unwrap();
            prop_assert_eq!(record.sender_key().len(), record.matching_indices().len());
            prop_assert_eq!(record.sender_key(), record.receiver_key());
            for &i in record.matching_indices() {
                prop_assert_eq!(record.sender_bases()[i], record.receiver_bases()[i]);
            }
        }
    }
}
