//! Per-operation metrics via the `metrics` facade, exported in Prometheus
//! text format through `metrics-exporter-prometheus`. Counters/histograms
//! are recorded at the call site with the `metrics::{counter,histogram}!`
//! macros (see `crate::cache::fabric` for the existing `cache_hits_total`
//! pattern this module generalizes to every subsystem).

use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the process-wide Prometheus recorder. Call once at startup;
/// the returned handle's `render()` produces the scrape body for the
/// metrics endpoint.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// RAII timer recording `{operation}_duration_seconds` on drop and
/// `{operation}_total{outcome=...}` via [`OperationTimer::finish`]. Typical
/// use: `let timer = OperationTimer::start("pairing_recommend"); ...;
/// timer.finish("ok");`.
pub struct OperationTimer {
    operation: &'static str,
    started_at: Instant,
}

impl OperationTimer {
    pub fn start(operation: &'static str) -> Self {
        Self { operation, started_at: Instant::now() }
    }

    /// Records the elapsed duration and increments the outcome counter.
    /// `outcome` is a low-cardinality label such as `"ok"` or `"error"`.
    pub fn finish(self, outcome: &'static str) {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        metrics::histogram!("operation_duration_seconds", "operation" => self.operation).record(elapsed);
        metrics::counter!("operation_total", "operation" => self.operation, "outcome" => outcome).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_finish_does_not_panic_without_an_installed_recorder() {
        let timer = OperationTimer::start("test_op");
        timer.finish("ok");
    }
}
