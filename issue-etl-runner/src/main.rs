use crate::config::load_runner_config;
use crate::core::run_with_config;
use issue_etl_config::Environment;
use issue_etl_config::shared::{RunnerConfig, SentryConfig};
use issue_etl_telemetry::init_tracing_with_project;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod core;

fn main() -> anyhow::Result<()> {
    let runner_config = load_runner_config()?;

    // Every log line of this run belongs to one tracker project.
    let project = Some(runner_config.source.project.clone());
    let _log_flusher = init_tracing_with_project(env!("CARGO_BIN_NAME"), project)?;

    // Sentry has to be up before the runtime starts to see panics on worker threads.
    let _sentry_guard = init_sentry(runner_config.sentry.as_ref())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(runner_config))?;

    Ok(())
}

async fn async_main(runner_config: RunnerConfig) -> anyhow::Result<()> {
    if let Err(err) = run_with_config(runner_config).await {
        sentry::capture_error(AsRef::<dyn std::error::Error>::as_ref(&err));
        error!("an error occurred in the runner: {err:#}");

        return Err(err);
    }

    Ok(())
}

/// Initializes Sentry when a DSN is configured, tagging events with the runner service.
fn init_sentry(config: Option<&SentryConfig>) -> anyhow::Result<Option<sentry::ClientInitGuard>> {
    let Some(sentry_config) = config else {
        info!("sentry not configured for runner, skipping initialization");
        return Ok(None);
    };

    info!("initializing sentry with supplied dsn");

    let environment = Environment::load()?;
    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(sentry_config.dsn.parse()?),
        environment: Some(environment.to_string().into()),
        integrations: vec![Arc::new(
            sentry::integrations::panic::PanicIntegration::new(),
        )],
        ..Default::default()
    });

    sentry::configure_scope(|scope| {
        scope.set_tag("service", "issue-etl-runner");
    });

    Ok(Some(guard))
}
