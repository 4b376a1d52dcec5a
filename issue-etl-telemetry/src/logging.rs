use issue_etl_config::{Environment, LoadError};
use serde_json::{Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::io::Write;
use std::panic::PanicHookInfo;
use std::sync::{Once, OnceLock};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, InitError};
use tracing_log::LogTracer;
use tracing_log::log_tracer::SetLoggerError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt};

/// Top-level JSON field naming the tracker project a log line belongs to.
const PROJECT_KEY_IN_LOG: &str = "project";

const LOG_DIR: &str = "logs";
const LOG_FILE_SUFFIX: &str = "log";
const MAX_LOG_FILES: usize = 5;

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("failed to detect the environment: {0}")]
    Environment(#[from] LoadError),
}

/// Keeps buffered log lines alive until dropped.
///
/// Hold it for the lifetime of `main`, file logging loses the tail of the output otherwise.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Enables console tracing in tests when `ENABLE_TRACING` is set:
///
/// ```bash
/// ENABLE_TRACING=1 cargo test pipeline
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an environment the logs would go to files.
            Environment::Dev.set();
            let _log_flusher =
                init_tracing("test").expect("Failed to initialize tracing for tests");
        }
    });
}

static PROJECT: OnceLock<String> = OnceLock::new();

/// Returns the project injected into JSON log lines, if one was set.
pub fn global_project() -> Option<&'static str> {
    PROJECT.get().map(String::as_str)
}

/// Adds `fields` to a JSON log line unless the line already carries them.
///
/// Returns `None` when `line` is not a JSON object or nothing had to be added.
fn inject_fields(line: &str, fields: &[(&str, &str)]) -> Option<String> {
    let mut object: Map<String, Value> = serde_json::from_str(line).ok()?;

    let mut modified = false;
    for (key, value) in fields {
        if !object.contains_key(*key) {
            object.insert(key.to_string(), Value::String(value.to_string()));
            modified = true;
        }
    }

    if !modified {
        return None;
    }

    let mut output = serde_json::to_string(&object).ok()?;
    if line.ends_with('\n') {
        output.push('\n');
    }

    Some(output)
}

/// Writer adding the global project to every JSON log line.
struct ProjectInjectingWriter<W> {
    inner: W,
}

impl<W> Write for ProjectInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let injected = match (global_project(), std::str::from_utf8(buf)) {
            (Some(project), Ok(line)) => inject_fields(line, &[(PROJECT_KEY_IN_LOG, project)]),
            _ => None,
        };

        match injected {
            // The caller only knows about its own buffer.
            Some(line) => self.inner.write_all(line.as_bytes()).map(|_| buf.len()),
            None => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Installs the global tracing subscriber for `app_name`.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_project(app_name, None)
}

/// Like [`init_tracing`], additionally tagging every JSON log line with `project`.
///
/// Development environments log pretty-printed to the console, production-like ones log JSON
/// to daily rolling files under `logs/`. The level defaults to `info` and can be changed through
/// `RUST_LOG`.
pub fn init_tracing_with_project(
    app_name: &str,
    project: Option<String>,
) -> Result<LogFlusher, TracingError> {
    if let Some(project) = project {
        let _ = PROJECT.set(project);
    }

    // Libraries logging through the `log` crate end up in the same subscriber.
    LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if Environment::load()?.is_prod() {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix(LOG_FILE_SUFFIX)
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || ProjectInjectingWriter {
                inner: file_appender.make_writer(),
            })
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Routes panics through tracing before running the previous hook.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log_panic(info);
        prev_hook(info);
    }));
}

fn log_panic(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        _ => (None, Some("backtraces are not available")),
    };

    let payload = panic_info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<String>()
                .map(String::as_str)
        })
        .unwrap_or("unknown panic payload");

    tracing::error!(
        panic.payload = payload,
        panic.location = panic_info.location().map(|location| location.to_string()),
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_project_into_json_lines() {
        let line = "{\"level\":\"INFO\",\"message\":\"fetched issues\"}\n";

        let injected = inject_fields(line, &[("project", "OPS")]).unwrap();

        assert_eq!(
            injected,
            "{\"level\":\"INFO\",\"message\":\"fetched issues\",\"project\":\"OPS\"}\n"
        );
    }

    #[test]
    fn keeps_existing_project() {
        let line = r#"{"message":"run failed","project":"WEB"}"#;
        assert_eq!(inject_fields(line, &[("project", "OPS")]), None);
    }

    #[test]
    fn ignores_non_json_lines() {
        assert_eq!(inject_fields("plain text\n", &[("project", "OPS")]), None);
    }

    #[test]
    fn writer_passes_through_without_project() {
        let mut writer = ProjectInjectingWriter { inner: Vec::new() };

        // No project is set in this test binary.
        let written = writer.write(b"{\"message\":\"hello\"}\n").unwrap();

        assert_eq!(written, 20);
        assert_eq!(writer.inner, b"{\"message\":\"hello\"}\n");
    }
}
