use issue_etl::destination::Destination;
use issue_etl::destination::memory::MemoryDestination;
use issue_etl::pipeline::{Pipeline, RunSummary};
use issue_etl::schema::{ObjectStoreSchemaSource, SchemaSource};
use issue_etl::source::{JiraSource, Source};
use issue_etl_config::shared::{
    DestinationConfig, PipelineConfig, RunnerConfig, SchemaConfig, SourceConfig,
};
use issue_etl_destinations::bigquery::{BigQueryDestination, install_crypto_provider_for_bigquery};
use issue_etl_telemetry::init_metrics_handle;
use secrecy::ExposeSecret;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

/// Runs one incremental sync with the provided configuration.
///
/// Builds the schema source, the tracker source and the configured destination, then runs the
/// pipeline until it finishes or the process is asked to stop.
pub async fn run_with_config(runner_config: RunnerConfig) -> anyhow::Result<()> {
    info!("starting runner");

    log_config(&runner_config);

    let metrics_handle = match init_metrics_handle(Some(runner_config.source.project.clone())) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!("failed to install the metrics recorder: {err}");
            None
        }
    };

    let source = JiraSource::from_config(&runner_config.source)?;
    let project = runner_config.source.project.clone();

    // Static dispatch over the destinations, hence one arm each.
    let summary = match &runner_config.destination {
        DestinationConfig::Memory => {
            let schema_source =
                ObjectStoreSchemaSource::from_location(&runner_config.schema.location, None)?;
            let destination = MemoryDestination::new();

            let pipeline = Pipeline::new(
                project,
                runner_config.pipeline,
                schema_source,
                source,
                destination,
            );
            run_pipeline(pipeline).await?
        }
        DestinationConfig::BigQuery {
            project_id,
            dataset_id,
            table_id,
            service_account_key,
        } => {
            install_crypto_provider_for_bigquery();

            // The schema bucket is read with the same service account as the tables.
            let schema_source = ObjectStoreSchemaSource::from_location(
                &runner_config.schema.location,
                Some(service_account_key.expose_secret()),
            )?;
            let destination = BigQueryDestination::new_with_key(
                project_id.clone(),
                dataset_id.clone(),
                table_id.clone(),
                service_account_key.expose_secret(),
            )
            .await?;

            let pipeline = Pipeline::new(
                project,
                runner_config.pipeline,
                schema_source,
                source,
                destination,
            );
            run_pipeline(pipeline).await?
        }
    };

    info!(
        fetched = summary.fetched,
        inserted = summary.inserted,
        since = ?summary.since,
        watermark = %summary.watermark.timestamp,
        "runner completed"
    );

    if let Some(metrics_handle) = metrics_handle {
        debug!(metrics = %metrics_handle.render(), "run metrics");
    }

    Ok(())
}

fn log_config(config: &RunnerConfig) {
    log_source_config(&config.source);
    log_schema_config(&config.schema);
    log_destination_config(&config.destination);
    log_pipeline_config(&config.pipeline);
}

fn log_source_config(config: &SourceConfig) {
    debug!(
        url = config.url,
        username = config.username,
        project = config.project,
        page_size = config.page_size,
        "source config"
    );
}

fn log_schema_config(config: &SchemaConfig) {
    debug!(location = config.location, "schema config");
}

fn log_destination_config(config: &DestinationConfig) {
    match config {
        DestinationConfig::Memory => {
            debug!("using memory destination config");
        }
        DestinationConfig::BigQuery {
            project_id,
            dataset_id,
            table_id,
            service_account_key: _,
        } => {
            debug!(
                project_id,
                dataset_id, table_id, "using bigquery destination config"
            )
        }
    }
}

fn log_pipeline_config(config: &PipelineConfig) {
    debug!(ignore_last_run = config.ignore_last_run, "pipeline config");
}

/// Runs a pipeline, giving up when SIGINT or SIGTERM arrives first.
///
/// Dropping the run future aborts in-flight requests. Rows already inserted stay, and no ledger
/// row is written, so the next run starts from the previous watermark again.
#[tracing::instrument(skip(pipeline), fields(project = pipeline.project()))]
async fn run_pipeline<C, S, D>(mut pipeline: Pipeline<C, S, D>) -> anyhow::Result<RunSummary>
where
    C: SchemaSource,
    S: Source,
    D: Destination,
{
    tokio::select! {
        result = pipeline.run() => Ok(result?),
        signal = shutdown_signal() => {
            let signal = signal?;
            warn!("{signal} received, aborting pipeline run");

            anyhow::bail!("pipeline run interrupted by {signal}")
        }
    }
}

/// Resolves with the name of the first shutdown signal received.
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    // Sent by schedulers before SIGKILL.
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("SIGINT")
        }
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}
