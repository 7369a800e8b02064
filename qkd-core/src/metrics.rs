// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Metrics collection and reporting

use crate::Error;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Rolling window of per-session match fractions
const FRACTION_WINDOW: usize = 10_000;

/// Simulation metrics collector
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    // Session metrics
    sessions_total: AtomicU64,
    sessions_failed: AtomicU64,
    backend_failures: AtomicU64,

    // Transmission metrics
    units_total: AtomicU64,
    matches_total: AtomicU64,

    match_fractions: RwLock<Vec<f64>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                sessions_total: AtomicU64::new(0),
                sessions_failed: AtomicU64::new(0),
                backend_failures: AtomicU64::new(0),
                units_total: AtomicU64::new(0),
                matches_total: AtomicU64::new(0),
                match_fractions: RwLock::new(Vec::with_capacity(FRACTION_WINDOW)),
            }),
        }
    }

    // Session metrics
    pub fn record_session(&self, units: usize, matches: usize) {
        self.inner.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.inner.units_total.fetch_add(units as u64, Ordering::Relaxed);
        self.inner.matches_total.fetch_add(matches as u64, Ordering::Relaxed);

        if units > 0 {
            let mut fractions = self.inner.match_fractions.write();
            fractions.push(matches as f64 / units as f64);
            if fractions.len() > FRACTION_WINDOW {
                fractions.drain(0..FRACTION_WINDOW / 2);
            }
        }
    }

    pub fn record_failure(&self, error: &Error) {
        self.inner.sessions_failed.fetch_add(1, Ordering::Relaxed);
        if error.is_backend_failure() {
            self.inner.backend_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn sessions_total(&self) -> u64 {
        self.inner.sessions_total.load(Ordering::Relaxed)
    }

    pub fn sessions_failed(&self) -> u64 {
        self.inner.sessions_failed.load(Ordering::Relaxed)
    }

    pub fn backend_failures(&self) -> u64 {
        self.inner.backend_failures.load(Ordering::Relaxed)
    }

    pub fn units_total(&self) -> u64 {
        self.inner.units_total.load(Ordering::Relaxed)
    }

    pub fn matches_total(&self) -> u64 {
        self.inner.matches_total.load(Ordering::Relaxed)
    }

    // Derived metrics
    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Matching indices over all transmitted units
    pub fn match_rate(&self) -> f64 {
        let units = self.units_total() as f64;
        if units > 0.0 {
            self.matches_total() as f64 / units
        } else {
            0.0
        }
    }

    pub fn match_fraction_percentile(&self, percentile: f64) -> Option<f64> {
        let fractions = self.inner.match_fractions.read();
        if fractions.is_empty() {
            return None;
        }

        let mut sorted = fractions.clone();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));
        let index = ((sorted.len() as f64 * percentile).ceil() as usize).min(sorted.len() - 1);
        Some(sorted[index])
    }

    /// Generate Prometheus-compatible metrics output
    pub fn prometheus_format(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP qkd_sessions_total Total number of completed sessions\n");
        output.push_str("# TYPE qkd_sessions_total counter\n");
        output.push_str(&format!("qkd_sessions_total {}\n", self.sessions_total()));

        output.push_str("# HELP qkd_sessions_failed Total number of aborted sessions\n");
        output.push_str("# TYPE qkd_sessions_failed counter\n");
        output.push_str(&format!("qkd_sessions_failed {}\n", self.sessions_failed()));

        output.push_str("# HELP qkd_backend_failures Sessions aborted by the measurement backend\n");
        output.push_str("# TYPE qkd_backend_failures counter\n");
        output.push_str(&format!("qkd_backend_failures {}\n", self.backend_failures()));

        output.push_str("# HELP qkd_units_total Total units transmitted\n");
        output.push_str("# TYPE qkd_units_total counter\n");
        output.push_str(&format!("qkd_units_total {}\n", self.units_total()));

        output.push_str("# HELP qkd_matches_total Total matching indices\n");
        output.push_str("# TYPE qkd_matches_total counter\n");
        output.push_str(&format!("qkd_matches_total {}\n", self.matches_total()));

        output.push_str("# HELP qkd_match_rate Matching indices per transmitted unit\n");
        output.push_str("# TYPE qkd_match_rate gauge\n");
        output.push_str(&format!("qkd_match_rate {:.6}\n", self.match_rate()));

        if let Some(p50) = self.match_fraction_percentile(0.50) {
            output.push_str("# HELP qkd_match_fraction_p50 Per-session match fraction 50th percentile\n");
            output.push_str("# TYPE qkd_match_fraction_p50 gauge\n");
            output.push_str(&format!("qkd_match_fraction_p50 {:.6}\n", p50));
        }

        output.push_str("# HELP qkd_uptime_seconds Process uptime in seconds\n");
        output.push_str("# TYPE qkd_uptime_seconds gauge\n");
        output.push_str(&format!("qkd_uptime_seconds {}\n", self.uptime_seconds()));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.record_session(100, 48);
        metrics.record_session(100, 52);
        metrics.record_failure(&Error::Backend("rng".into()));
        metrics.record_failure(&Error::InvalidLength("0".into()));

        assert_eq!(metrics.sessions_total(), 2);
        assert_eq!(metrics.sessions_failed(), 2);
        assert_eq!(metrics.backend_failures(), 1);
        assert_eq!(metrics.units_total(), 200);
        assert_eq!(metrics.matches_total(), 100);
        assert!((metrics.match_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_fraction_percentiles() {
        let metrics = Metrics::new();
        assert!(metrics.match_fraction_percentile(0.5).is_none());

        for i in 1..=100 {
            metrics.record_session(100, i);
        }

        let p50 = metrics.match_fraction_percentile(0.50).unwrap();
        assert!((0.45..=0.55).contains(&p50));
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.record_session(10, 5);
        let text = metrics.prometheus_format();
        assert!(text.contains("qkd_sessions_total 1\n"));
        assert!(text.contains("qkd_match_rate 0.500000\n"));
        assert!(text.contains("qkd_match_fraction_p50"));
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let handle = metrics.clone();
        handle.record_session(4, 2);
        assert_eq!(metrics.sessions_total(), 1);
    }
}
