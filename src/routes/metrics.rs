use std::sync::Arc;

use axum::extract::State;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe the workflow counters.
pub fn install_recorder() -> Result<Arc<PrometheusHandle>, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!("jobs_submitted_total", "Jobs accepted for analysis");
    metrics::describe_counter!("jobs_completed_total", "Jobs whose analysis produced items");
    metrics::describe_counter!("jobs_failed_total", "Jobs whose upload or analysis failed");
    metrics::describe_counter!("jobs_timed_out_total", "Jobs abandoned after the polling lifetime");
    metrics::describe_counter!("items_updated_total", "Confirmed item edits");
    metrics::describe_counter!("items_deleted_total", "Confirmed item deletions");
    metrics::describe_counter!("storefronts_published_total", "Storefronts created from job items");

    Ok(Arc::new(handle))
}

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> String {
    handle.render()
}
