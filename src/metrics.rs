//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Broadcast engine metrics
pub struct Metrics {
    registry: Registry,

    // Counters
    pub lifecycles_total: IntCounter,
    pub broadcasts_total: IntCounter,
    pub resends_total: IntCounter,
    pub resend_failures_total: IntCounter,
    pub subscriptions_total: IntCounter,
    pub outcomes_total: IntCounterVec,

    // Gauges
    pub lifecycles_in_flight: IntGauge,

    // Histograms
    pub lifecycle_latency: Histogram,
    pub attempts_per_lifecycle: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let lifecycles_total = IntCounter::with_opts(Opts::new(
            "lander_lifecycles_total",
            "Transaction lifecycles started",
        ))?;

        let broadcasts_total = IntCounter::with_opts(Opts::new(
            "lander_broadcasts_total",
            "Send calls issued, initial sends and resends",
        ))?;

        let resends_total =
            IntCounter::with_opts(Opts::new("lander_resends_total", "Resends issued by the race"))?;

        let resend_failures_total = IntCounter::with_opts(Opts::new(
            "lander_resend_failures_total",
            "Resends rejected at the transport level",
        ))?;

        let subscriptions_total = IntCounter::with_opts(Opts::new(
            "lander_subscriptions_total",
            "Confirmation subscriptions opened",
        ))?;

        let outcomes_total = IntCounterVec::new(
            Opts::new("lander_outcomes_total", "Terminal outcomes by kind"),
            &["outcome"],
        )?;

        let lifecycles_in_flight = IntGauge::with_opts(Opts::new(
            "lander_lifecycles_in_flight",
            "Lifecycles currently running",
        ))?;

        let lifecycle_latency = Histogram::with_opts(
            HistogramOpts::new(
                "lander_lifecycle_latency_seconds",
                "Time from simulation to terminal outcome",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        let attempts_per_lifecycle = Histogram::with_opts(
            HistogramOpts::new(
                "lander_attempts_per_lifecycle",
                "Send attempts made before a terminal outcome",
            )
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 50.0, 100.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(lifecycles_total.clone()))?;
        registry.register(Box::new(broadcasts_total.clone()))?;
        registry.register(Box::new(resends_total.clone()))?;
        registry.register(Box::new(resend_failures_total.clone()))?;
        registry.register(Box::new(subscriptions_total.clone()))?;
        registry.register(Box::new(outcomes_total.clone()))?;
        registry.register(Box::new(lifecycles_in_flight.clone()))?;
        registry.register(Box::new(lifecycle_latency.clone()))?;
        registry.register(Box::new(attempts_per_lifecycle.clone()))?;

        Ok(Self {
            registry,
            lifecycles_total,
            broadcasts_total,
            resends_total,
            resend_failures_total,
            subscriptions_total,
            outcomes_total,
            lifecycles_in_flight,
            lifecycle_latency,
            attempts_per_lifecycle,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_outcome(&self, label: &str) {
        self.outcomes_total.with_label_values(&[label]).inc();
    }

    /// Prometheus text exposition of everything registered
    pub fn export_text(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_counter_by_label() {
        let m = Metrics::new().unwrap();
        m.record_outcome("confirmed");
        m.record_outcome("confirmed");
        m.record_outcome("expired");

        assert_eq!(m.outcomes_total.with_label_values(&["confirmed"]).get(), 2);
        assert_eq!(m.outcomes_total.with_label_values(&["expired"]).get(), 1);
    }

    #[test]
    fn test_export_text_contains_registered_metrics() {
        let m = Metrics::new().unwrap();
        m.broadcasts_total.inc();
        m.record_outcome("unknown");

        let text = m.export_text().unwrap();
        assert!(text.contains("lander_broadcasts_total 1"));
        assert!(text.contains("lander_outcomes_total{outcome=\"unknown\"} 1"));
    }
}
