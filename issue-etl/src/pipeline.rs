//! Orchestration of a single incremental sync run.
//!
//! Contains the [`Pipeline`] that wires a [`SchemaSource`], a [`Source`] and a [`Destination`]
//! together and walks them through the stages of a run, stopping at the first hard error.

use chrono::{DateTime, Utc};
use issue_etl_config::shared::PipelineConfig;
use metrics::{counter, histogram};
use std::fmt;
use std::time::Instant;
use tracing::{error, info};

use crate::bail;
use crate::destination::Destination;
use crate::error::{ErrorKind, EtlResult};
use crate::extract::extract_many;
use crate::metrics::{
    ETL_RECORDS_FETCHED_TOTAL, ETL_RECORDS_INSERTED_TOTAL, ETL_RUN_DURATION_SECONDS,
    ETL_RUNS_TOTAL, PROJECT, STATUS, STATUS_FAILED, STATUS_SUCCEEDED, register_metrics,
};
use crate::schema::SchemaSource;
use crate::source::Source;
use crate::state::resolve_watermark;
use crate::types::Watermark;

/// Stage a run is in, or failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Loading the schema and creating the destination tables.
    Preparing,
    /// Reading the newest execution ledger row.
    FetchingWatermark,
    /// Reading changed records from the source.
    Fetching,
    /// Reshaping records into the target schema.
    Extracting,
    /// Appending the reshaped records to the destination.
    Inserting,
    /// Appending this run's row to the execution ledger.
    RecordingExecution,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Preparing => "preparing",
            RunStage::FetchingWatermark => "fetching_watermark",
            RunStage::Fetching => "fetching",
            RunStage::Extracting => "extracting",
            RunStage::Inserting => "inserting",
            RunStage::RecordingExecution => "recording_execution",
        };

        f.write_str(name)
    }
}

/// Lifecycle of a [`Pipeline`].
///
/// A pipeline runs once: it moves from [`PipelineState::Idle`] through the [`RunStage`]s and
/// ends either in [`PipelineState::Done`] or in [`PipelineState::Failed`], which remembers the
/// stage the error surfaced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(RunStage),
    Done,
    Failed(RunStage),
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of records returned by the source.
    pub fetched: u64,
    /// Number of rows appended to the destination.
    pub inserted: u64,
    /// Lower bound the source was queried with, `None` for a full sync.
    pub since: Option<DateTime<Utc>>,
    /// Ledger row written by this run.
    pub watermark: Watermark,
}

/// Incremental ETL run for one project.
///
/// The run timestamp is taken before anything is fetched, so records updated while the run is
/// in flight fall into the next run's window.
#[derive(Debug)]
pub struct Pipeline<C, S, D> {
    project: String,
    config: PipelineConfig,
    schema_source: C,
    source: S,
    destination: D,
    state: PipelineState,
}

impl<C, S, D> Pipeline<C, S, D>
where
    C: SchemaSource,
    S: Source,
    D: Destination,
{
    pub fn new(
        project: String,
        config: PipelineConfig,
        schema_source: C,
        source: S,
        destination: D,
    ) -> Self {
        register_metrics();

        Self {
            project,
            config,
            schema_source,
            source,
            destination,
            state: PipelineState::Idle,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// Executes the run.
    ///
    /// The first hard error moves the pipeline to [`PipelineState::Failed`] and is returned as is.
    /// Records inserted before a later failure are not rolled back.
    pub async fn run(&mut self) -> EtlResult<RunSummary> {
        if self.state != PipelineState::Idle {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline has already run",
                format!("pipeline is in state {:?}", self.state)
            );
        }

        info!(project = %self.project, "starting pipeline run");

        let started = Instant::now();
        let run_started_at = Utc::now();
        let result = self.execute(run_started_at).await;

        histogram!(ETL_RUN_DURATION_SECONDS, PROJECT => self.project.clone())
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(summary) => {
                self.state = PipelineState::Done;
                counter!(ETL_RUNS_TOTAL, PROJECT => self.project.clone(), STATUS => STATUS_SUCCEEDED)
                    .increment(1);

                info!(
                    project = %self.project,
                    fetched = summary.fetched,
                    inserted = summary.inserted,
                    "pipeline run completed"
                );
            }
            Err(err) => {
                let stage = match self.state {
                    PipelineState::Running(stage) => stage,
                    _ => RunStage::Preparing,
                };
                self.state = PipelineState::Failed(stage);
                counter!(ETL_RUNS_TOTAL, PROJECT => self.project.clone(), STATUS => STATUS_FAILED)
                    .increment(1);

                error!(
                    project = %self.project,
                    %stage,
                    error = %err,
                    "pipeline run failed"
                );
            }
        }

        result
    }

    async fn execute(&mut self, run_started_at: DateTime<Utc>) -> EtlResult<RunSummary> {
        self.enter(RunStage::Preparing);
        let schema = self.schema_source.load_schema().await?;
        self.destination.prepare(&schema).await?;

        self.enter(RunStage::FetchingWatermark);
        let watermark = resolve_watermark(&self.destination, self.config.ignore_last_run).await;

        self.enter(RunStage::Fetching);
        let records = self
            .source
            .fetch_since(&self.project, watermark.since)
            .await?;
        let fetched = records.len() as u64;
        counter!(ETL_RECORDS_FETCHED_TOTAL, PROJECT => self.project.clone()).increment(fetched);

        self.enter(RunStage::Extracting);
        let rows = extract_many(&schema, &records)?;
        let inserted = rows.len() as u64;

        self.enter(RunStage::Inserting);
        if rows.is_empty() {
            info!("no changed records, nothing to insert");
        } else {
            self.destination.insert(rows).await?;
            counter!(ETL_RECORDS_INSERTED_TOTAL, PROJECT => self.project.clone())
                .increment(inserted);
        }

        // We record the number of records fetched, which matches the number inserted since
        // extraction is all-or-nothing.
        self.enter(RunStage::RecordingExecution);
        self.destination
            .record_execution(run_started_at, fetched)
            .await?;

        Ok(RunSummary {
            fetched,
            inserted,
            since: watermark.since,
            watermark: Watermark::new(run_started_at, fetched),
        })
    }

    fn enter(&mut self, stage: RunStage) {
        info!(%stage, "entering stage");
        self.state = PipelineState::Running(stage);
    }
}
