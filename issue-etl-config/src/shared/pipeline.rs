use serde::{Deserialize, Serialize};

/// Behaviour of a single pipeline run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Skips the execution ledger lookup and performs a full sync.
    ///
    /// The run still appends its own ledger row, so the following run is incremental again.
    #[serde(default)]
    pub ignore_last_run: bool,
}
