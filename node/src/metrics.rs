//! # Prometheus Metrics
//!
//! Reserve gauges, transition counters and audit results, scraped at
//! `/metrics` on the metrics port. Gauges hold minor units.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] prefixed
//! `real_digital_`, so they never collide with the default registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use real_digital_protocol::{AuditReport, Reserve};

/// Metric handles for the node. Cloning shares the underlying metrics.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    pub total_supply: IntGauge,
    pub brl_reserve: IntGauge,
    pub total_minted: IntGauge,
    pub total_burned: IntGauge,
    pub reserve_sequence: IntGauge,
    /// 1 while the emergency stop is engaged.
    pub paused: IntGauge,
    /// 1 if the latest audit passed every check.
    pub audit_healthy: IntGauge,
    pub audits_total: IntCounter,
    pub audit_failures_total: IntCounter,
    pub mints_total: IntCounter,
    pub burns_total: IntCounter,
    /// Rejected submissions, labelled by error kind.
    pub rejections_total: IntCounterVec,
    /// Time spent committing a transition, signature check included.
    pub transition_latency_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(
    registry: &Registry,
    collector: C,
) -> Result<C, prometheus::Error> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl LedgerMetrics {
    /// Create and register all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("real_digital".into()), None)?;

        let gauge = |name: &str, help: &str| register(&registry, IntGauge::new(name, help)?);
        let counter = |name: &str, help: &str| register(&registry, IntCounter::new(name, help)?);

        Ok(Self {
            total_supply: gauge("total_supply_minor", "Tokens in circulation")?,
            brl_reserve: gauge("brl_reserve_minor", "Collateral held, in centavos")?,
            total_minted: gauge("total_minted_minor", "Tokens ever minted")?,
            total_burned: gauge("total_burned_minor", "Tokens ever burned")?,
            reserve_sequence: gauge("reserve_sequence", "Sequence of the latest transition")?,
            paused: gauge("paused", "1 while mint and burn are paused")?,
            audit_healthy: gauge("audit_healthy", "1 if the latest audit passed")?,
            audits_total: counter("audits_total", "Audits run")?,
            audit_failures_total: counter("audit_failures_total", "Audits that failed")?,
            mints_total: counter("mints_total", "Committed mints")?,
            burns_total: counter("burns_total", "Committed burns")?,
            rejections_total: register(
                &registry,
                IntCounterVec::new(
                    Opts::new("rejections_total", "Rejected submissions by error kind"),
                    &["error"],
                )?,
            )?,
            transition_latency_seconds: register(
                &registry,
                Histogram::with_opts(
                    HistogramOpts::new(
                        "transition_latency_seconds",
                        "Time to authenticate and commit a transition",
                    )
                    .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
                )?,
            )?,
            registry,
        })
    }

    /// Mirror a reserve snapshot into the gauges.
    pub fn observe_reserve(&self, reserve: &Reserve) {
        self.total_supply.set(saturating_i64(reserve.total_supply));
        self.brl_reserve.set(saturating_i64(reserve.brl_reserve));
        self.total_minted.set(saturating_i64(reserve.total_minted));
        self.total_burned.set(saturating_i64(reserve.total_burned));
        self.reserve_sequence.set(saturating_i64(reserve.sequence));
        self.paused.set(i64::from(reserve.is_paused));
    }

    /// Record an audit outcome.
    pub fn record_audit(&self, report: &AuditReport) {
        self.audits_total.inc();
        if !report.healthy {
            self.audit_failures_total.inc();
        }
        self.audit_healthy.set(i64::from(report.healthy));
        self.total_supply.set(saturating_i64(report.total_supply));
        self.brl_reserve.set(saturating_i64(report.brl_reserve));
        self.total_minted.set(saturating_i64(report.total_minted));
        self.total_burned.set(saturating_i64(report.total_burned));
        self.reserve_sequence.set(saturating_i64(report.sequence));
        self.paused.set(i64::from(report.is_paused));
    }

    pub fn record_rejection(&self, kind: &str) {
        self.rejections_total.with_label_values(&[kind]).inc();
    }

    /// Encode all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Shared metrics handle for axum state.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// `GET /metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use real_digital_protocol::audit::audit;
    use real_digital_protocol::Identity;

    #[test]
    fn gauges_follow_reserve() {
        let metrics = LedgerMetrics::new().unwrap();
        let reserve = Reserve {
            total_supply: 5050,
            brl_reserve: 5050,
            total_minted: 10050,
            total_burned: 5000,
            is_paused: true,
            ..Reserve::new(Identity::from_bytes([1u8; 32]))
        };
        metrics.observe_reserve(&reserve);
        assert_eq!(metrics.total_supply.get(), 5050);
        assert_eq!(metrics.total_burned.get(), 5000);
        assert_eq!(metrics.paused.get(), 1);
    }

    #[test]
    fn failed_audit_is_counted() {
        let metrics = LedgerMetrics::new().unwrap();
        let broken = Reserve {
            total_supply: 5050,
            total_minted: 10050,
            total_burned: 4000,
            ..Reserve::new(Identity::from_bytes([1u8; 32]))
        };
        metrics.record_audit(&audit(&broken));
        assert_eq!(metrics.audits_total.get(), 1);
        assert_eq!(metrics.audit_failures_total.get(), 1);
        assert_eq!(metrics.audit_healthy.get(), 0);
    }

    #[test]
    fn encoded_output_carries_prefix() {
        let metrics = LedgerMetrics::new().unwrap();
        metrics.mints_total.inc();
        metrics.record_rejection("ledger_paused");
        let text = metrics.encode().unwrap();
        assert!(text.contains("real_digital_mints_total 1"));
        assert!(text.contains("real_digital_rejections_total{error=\"ledger_paused\"} 1"));
    }
}
