//! Prometheus metrics for the webhook service.
//!
//! Each [`ServiceMetrics`] owns its own [`Registry`], so several instances
//! (one per test, for example) can coexist without name collisions.

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::time::Duration;

/// Service metrics for observability
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,

    pub webhook_requests_total: IntCounter,
    pub webhook_verification_failures_total: IntCounter,
    pub webhook_malformed_payloads_total: IntCounter,
    pub events_recorded_total: IntCounter,
    pub webhook_duration_seconds: Histogram,
}

impl ServiceMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let webhook_requests_total =
            IntCounter::new("webhook_requests_total", "Total webhook requests received")?;
        let webhook_verification_failures_total = IntCounter::new(
            "webhook_verification_failures_total",
            "Webhook requests rejected by signature verification",
        )?;
        let webhook_malformed_payloads_total = IntCounter::new(
            "webhook_malformed_payloads_total",
            "Webhook requests rejected for invalid JSON",
        )?;
        let events_recorded_total =
            IntCounter::new("events_recorded_total", "Events counted by the aggregator")?;
        let webhook_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "webhook_duration_seconds",
                "Webhook processing time distribution, accepted and rejected",
            )
            .buckets(vec![0.0001, 0.001, 0.01, 0.1, 0.5, 1.0]),
        )?;

        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(webhook_verification_failures_total.clone()))?;
        registry.register(Box::new(webhook_malformed_payloads_total.clone()))?;
        registry.register(Box::new(events_recorded_total.clone()))?;
        registry.register(Box::new(webhook_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            webhook_requests_total,
            webhook_verification_failures_total,
            webhook_malformed_payloads_total,
            events_recorded_total,
            webhook_duration_seconds,
        })
    }

    pub fn record_webhook_request(&self) {
        self.webhook_requests_total.inc();
    }

    pub fn record_verification_failure(&self) {
        self.webhook_verification_failures_total.inc();
    }

    pub fn record_malformed_payload(&self) {
        self.webhook_malformed_payloads_total.inc();
    }

    pub fn record_event(&self) {
        self.events_recorded_total.inc();
    }

    /// Observe the handling time of one webhook request, whatever its outcome.
    pub fn observe_webhook_duration(&self, duration: Duration) {
        self.webhook_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Render all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
