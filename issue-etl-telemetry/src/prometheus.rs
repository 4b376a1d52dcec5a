use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, PoisonError};

/// Label attached to every metric when a project is known.
const PROJECT_LABEL: &str = "project";

// The recorder can be installed once per process; tests install it repeatedly.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Installs a global Prometheus recorder and returns a handle to render its contents.
///
/// Nothing is served over HTTP, the runner logs the rendered metrics after the run. Subsequent
/// calls return the handle of the first installation.
pub fn init_metrics_handle(project: Option<String>) -> Result<PrometheusHandle, BuildError> {
    let mut prometheus_handle = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(handle) = &*prometheus_handle {
        return Ok(handle.clone());
    }

    let mut builder = PrometheusBuilder::new();
    if let Some(project) = project {
        builder = builder.add_global_label(PROJECT_LABEL, project);
    }

    let handle = builder.install_recorder()?;
    *prometheus_handle = Some(handle.clone());

    Ok(handle)
}
