//! Scoring statistics tracking for the fraud scoring engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::info;

use crate::types::result::FraudScoreResult;

/// In-process metrics collector for scoring activity.
pub struct ScoringMetrics {
    /// Total transactions scored
    transactions_scored: AtomicU64,
    /// Transactions whose probability exceeded the threshold
    frauds_flagged: AtomicU64,
    /// Scores by risk level
    scores_by_level: RwLock<HashMap<String, u64>>,
    /// Scores by scorer variant (degraded-answer visibility)
    scores_by_source: RwLock<HashMap<String, u64>>,
    /// Scoring times (in microseconds)
    scoring_times: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ScoringMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            frauds_flagged: AtomicU64::new(0),
            scores_by_level: RwLock::new(HashMap::new()),
            scores_by_source: RwLock::new(HashMap::new()),
            scoring_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record one scored transaction.
    pub fn record_score(&self, scoring_time: Duration, result: &FraudScoreResult) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        if result.is_fraud {
            self.frauds_flagged.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut by_level) = self.scores_by_level.write() {
            let level = format!("{:?}", result.risk_level).to_lowercase();
            *by_level.entry(level).or_insert(0) += 1;
        }

        if let Ok(mut by_source) = self.scores_by_source.write() {
            let source = format!("{:?}", result.source).to_lowercase();
            *by_source.entry(source).or_insert(0) += 1;
        }

        if let Ok(mut times) = self.scoring_times.write() {
            times.push(scoring_time.as_micros() as u64);
            // Keep only the most recent samples for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (result.fraud_probability * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Total transactions scored so far.
    pub fn transactions_scored(&self) -> u64 {
        self.transactions_scored.load(Ordering::Relaxed)
    }

    /// Transactions flagged as fraud so far.
    pub fn frauds_flagged(&self) -> u64 {
        self.frauds_flagged.load(Ordering::Relaxed)
    }

    /// Fraction of scored transactions flagged as fraud.
    pub fn flag_rate(&self) -> f64 {
        let scored = self.transactions_scored();
        if scored > 0 {
            self.frauds_flagged() as f64 / scored as f64
        } else {
            0.0
        }
    }

    /// Scoring time statistics.
    pub fn get_scoring_stats(&self) -> ScoringStats {
        let times = self.scoring_times.read().unwrap();
        if times.is_empty() {
            return ScoringStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ScoringStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Current throughput (transactions per second).
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Probability distribution across ten buckets.
    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self.score_buckets.read().unwrap()
    }

    /// Scores by risk level.
    pub fn get_scores_by_level(&self) -> HashMap<String, u64> {
        self.scores_by_level.read().unwrap().clone()
    }

    /// Scores by scorer variant.
    pub fn get_scores_by_source(&self) -> HashMap<String, u64> {
        self.scores_by_source.read().unwrap().clone()
    }

    /// Log summary statistics.
    pub fn print_summary(&self) {
        let scored = self.transactions_scored();
        let flagged = self.frauds_flagged();
        let stats = self.get_scoring_stats();

        info!(
            transactions_scored = scored,
            frauds_flagged = flagged,
            flag_rate = format!("{:.1}%", self.flag_rate() * 100.0),
            throughput = format!("{:.1} tx/s", self.get_throughput()),
            "Scoring summary"
        );
        info!(
            mean_us = stats.mean_us,
            p50_us = stats.p50_us,
            p95_us = stats.p95_us,
            p99_us = stats.p99_us,
            "Scoring time (μs)"
        );

        for (level, count) in &self.get_scores_by_level() {
            let pct = if scored > 0 {
                (*count as f64 / scored as f64) * 100.0
            } else {
                0.0
            };
            info!(level = %level, count, pct = format!("{:.1}%", pct), "Scores by risk level");
        }
        for (source, count) in &self.get_scores_by_source() {
            info!(source = %source, count, "Scores by source");
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoring time statistics.
#[derive(Debug, Default)]
pub struct ScoringStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
