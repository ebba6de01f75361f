//! Agent metrics collection and Prometheus exposition
//!
//! [`AgentMetrics`] accumulates the outcome and latency of every completed
//! task request. [`render`] turns a [`MetricsSnapshot`] into Prometheus text
//! format for the `/metrics` endpoint:
//!
//! - `agent_latency_seconds`: histogram with buckets 0.5, 1, 2, 5, 10 (+Inf)
//! - `agent_success_total`: requests where the agent exited 0
//! - `agent_errors_total`: every other completed request
//!
//! Metrics live in memory only and start from zero on every restart.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Latency histogram metric name
pub const LATENCY_METRIC: &str = "agent_latency_seconds";
/// Success counter metric name
pub const SUCCESS_METRIC: &str = "agent_success_total";
/// Error counter metric name
pub const ERRORS_METRIC: &str = "agent_errors_total";

/// Upper bounds (seconds) of the finite latency buckets
pub const LATENCY_BUCKETS: [f64; 5] = [0.5, 1.0, 2.0, 5.0, 10.0];

/// Outcome of a completed request, used as the recording key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
        }
    }
}

/// Point-in-time copy of the accumulated metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub success_count: u64,
    pub error_count: u64,
    /// One entry per completed request, in completion order
    pub latency_samples: Vec<f64>,
}

impl MetricsSnapshot {
    /// Total number of completed requests
    pub fn total(&self) -> u64 {
        self.success_count + self.error_count
    }
}

/// Process-wide accumulator for request outcomes and latencies
///
/// Cheap to clone; all clones share the same state. Callers never lock:
/// counters are atomics and samples sit behind an internal mutex that is
/// also held while the matching counter is bumped, so a snapshot always has
/// exactly one sample per counted request.
#[derive(Debug, Clone, Default)]
pub struct AgentMetrics {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    success_count: AtomicU64,
    error_count: AtomicU64,
    latency_samples: Mutex<Vec<f64>>,
}

impl AgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request where the agent exited 0
    ///
    /// # Errors
    ///
    /// Returns an error (and records nothing) if `elapsed_seconds` is NaN,
    /// infinite or negative.
    pub fn record_success(&self, elapsed_seconds: f64) -> Result<(), prometheus::Error> {
        self.record(Outcome::Success, elapsed_seconds)
    }

    /// Record a request that failed for any reason
    ///
    /// # Errors
    ///
    /// Same validation as [`AgentMetrics::record_success`].
    pub fn record_error(&self, elapsed_seconds: f64) -> Result<(), prometheus::Error> {
        self.record(Outcome::Error, elapsed_seconds)
    }

    /// Record one completed request
    pub fn record(&self, outcome: Outcome, elapsed_seconds: f64) -> Result<(), prometheus::Error> {
        if !elapsed_seconds.is_finite() {
            return Err(prometheus::Error::Msg(format!(
                "Latency must be finite (not NaN or Infinity), got: {}",
                elapsed_seconds
            )));
        }
        if elapsed_seconds < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Latency must be non-negative, got: {}",
                elapsed_seconds
            )));
        }

        let counter = match outcome {
            Outcome::Success => &self.inner.success_count,
            Outcome::Error => &self.inner.error_count,
        };

        let mut samples = self
            .inner
            .latency_samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        samples.push(elapsed_seconds);
        counter.fetch_add(1, Ordering::Relaxed);
        drop(samples);

        tracing::trace!(
            outcome = outcome.as_str(),
            elapsed_seconds,
            "Recorded agent request"
        );
        Ok(())
    }

    /// Number of requests recorded as successful
    pub fn success_count(&self) -> u64 {
        self.inner.success_count.load(Ordering::Relaxed)
    }

    /// Number of requests recorded as failed
    pub fn error_count(&self) -> u64 {
        self.inner.error_count.load(Ordering::Relaxed)
    }

    /// Copy the current state
    pub fn snapshot(&self) -> MetricsSnapshot {
        let samples = self
            .inner
            .latency_samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        MetricsSnapshot {
            success_count: self.inner.success_count.load(Ordering::Relaxed),
            error_count: self.inner.error_count.load(Ordering::Relaxed),
            latency_samples: samples.clone(),
        }
    }

    /// Render the current state in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        render(&self.snapshot())
    }
}

/// Encode a snapshot as Prometheus text exposition
///
/// Builds a throwaway registry from the snapshot, so rendering has no side
/// effects and the same snapshot always yields the same bytes.
///
/// # Errors
///
/// Returns an error if metric construction or text encoding fails.
pub fn render(snapshot: &MetricsSnapshot) -> Result<String, prometheus::Error> {
    let registry = Registry::new();

    let latency = Histogram::with_opts(
        HistogramOpts::new(LATENCY_METRIC, "Latency of agent requests in seconds")
            .buckets(LATENCY_BUCKETS.to_vec()),
    )?;
    for sample in &snapshot.latency_samples {
        latency.observe(*sample);
    }

    let success = IntCounter::with_opts(Opts::new(
        SUCCESS_METRIC,
        "Total successful agent requests",
    ))?;
    success.inc_by(snapshot.success_count);

    let errors = IntCounter::with_opts(Opts::new(ERRORS_METRIC, "Total failed agent requests"))?;
    errors.inc_by(snapshot.error_count);

    registry.register(Box::new(latency))?;
    registry.register(Box::new(success))?;
    registry.register(Box::new(errors))?;

    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .map_err(|e| {
            tracing::error!(error = %e, "Prometheus text encoder failed");
            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_families.len(),
                e
            ))
        })?;

    String::from_utf8(buffer).map_err(|e| {
        prometheus::Error::Msg(format!(
            "Prometheus encoder produced invalid UTF-8 at byte {}: {}",
            e.utf8_error().valid_up_to(),
            e
        ))
    })
}
