// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Plain-text rendering of simulation reports
//!
//! Sequences are printed one symbol per column so the `^` marker row lines up
//! under the positions where both bases agreed.

use qkd_core::{Bit, Protocol, SessionReport, SimulationReport, TransmissionRecord};
use std::fmt::{Display, Write};

const LABEL_WIDTH: usize = 18;

/// Render a report as human-readable text
pub fn render_text(report: &SimulationReport, show_keys: bool) -> String {
    match report {
        SimulationReport::Bb84(report) => {
            let states = columns(report.summary.last.units());
            render_session(report, Some(("Sender states", states)), show_keys)
        }
        SimulationReport::E91(report) => render_session(report, None, show_keys),
    }
}

fn render_session<P: Protocol>(
    report: &SessionReport<P>,
    leading_row: Option<(&str, String)>,
    show_keys: bool,
) -> String {
    let summary = &report.summary;
    let record = &summary.last;
    let mut out = String::new();

    let seed = report
        .seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "entropy".to_string());
    let _ = writeln!(
        out,
        "Protocol: {} | Backend: {} | Units: {} | Trials: {} | Seed: {}",
        report.protocol.to_string().to_uppercase(),
        report.backend,
        summary.units_per_trial,
        summary.trials,
        seed
    );
    let _ = writeln!(out, "Run: {}", report.id);
    let _ = writeln!(out);
    let _ = writeln!(out, "Last trial");

    if let Some((label, row)) = leading_row {
        push_row(&mut out, label, &row);
    }
    push_row(&mut out, "Sender bases", &columns(record.sender_bases()));
    push_row(&mut out, "Receiver bases", &columns(record.receiver_bases()));
    push_row(&mut out, "Receiver bits", &bit_string(record.receiver_outcomes(), " "));
    push_row(&mut out, "Matches", &marker_row(record));
    push_row(
        &mut out,
        "Matching indices",
        &format!("{:?}", record.matching_indices()),
    );

    if show_keys {
        push_row(&mut out, "Sender key", &bit_string(record.sender_key(), ""));
        push_row(&mut out, "Receiver key", &bit_string(record.receiver_key(), ""));
    }
    push_row(&mut out, "Key fingerprint", &report.key_fingerprint);

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Average key length over {} trial(s): {:.2} (min {}, max {}, {:.1}% of units)",
        summary.trials,
        summary.mean_key_length,
        summary.min_key_length(),
        summary.max_key_length(),
        summary.mean_match_fraction() * 100.0
    );

    out
}

fn push_row(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "  {:<width$}{}", format!("{}:", label), value, width = LABEL_WIDTH);
}

fn columns<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn bit_string(bits: &[Bit], separator: &str) -> String {
    bits.iter()
        .map(|bit| bit.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// `^` under every matching position, aligned with `columns`
fn marker_row<P: Protocol>(record: &TransmissionRecord<P>) -> String {
    let mut marks = vec![' '; record.len()];
    for &i in record.matching_indices() {
        marks[i] = '^';
    }
    columns(&marks).trim_end().to_string()
}
