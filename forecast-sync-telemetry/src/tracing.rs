use forecast_sync_config::Environment;
use std::io::{Error, Write};
use std::sync::OnceLock;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
    sync::Once,
};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// JSON field naming the service in every log line.
const SERVICE_KEY_IN_LOG: &str = "service";
/// JSON field naming the deployment environment in every log line.
const ENVIRONMENT_KEY_IN_LOG: &str = "environment";

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Keeps the non-blocking writer alive until the process is done logging.
///
/// Dropping the [`LogFlusher::Flusher`] variant flushes buffered lines, so it has to be held
/// until the end of `main`.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Initializes tracing for tests.
///
/// Output is only enabled when `ENABLE_TRACING` is set:
/// ```bash
/// ENABLE_TRACING=1 cargo test test_name
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            let _log_flusher = init_tracing("test", Environment::Dev)
                .expect("Failed to initialize tracing for tests");
        }
    });
}

/// Top-level fields injected into every JSON log line.
static TOP_LEVEL_FIELDS: OnceLock<Vec<(&'static str, String)>> = OnceLock::new();

/// Writer wrapper adding the service and environment fields to JSON log lines.
struct FieldInjectingWriter<W> {
    inner: W,
}

impl<W> FieldInjectingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for FieldInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let Some(fields) = TOP_LEVEL_FIELDS.get() else {
            return self.inner.write(buf);
        };

        let Ok(json_str) = std::str::from_utf8(buf) else {
            return self.inner.write(buf);
        };

        let Ok(serde_json::Value::Object(mut map)) =
            serde_json::from_str::<serde_json::Value>(json_str)
        else {
            return self.inner.write(buf);
        };

        for (key, value) in fields {
            if !map.contains_key(*key) {
                map.insert(
                    (*key).to_string(),
                    serde_json::Value::String(value.clone()),
                );
            }
        }

        match serde_json::to_string(&map) {
            Ok(modified) => {
                let output = if json_str.ends_with('\n') {
                    format!("{modified}\n")
                } else {
                    modified
                };

                // The caller accounts for the bytes it handed over, not the rewritten line.
                self.inner.write_all(output.as_bytes())?;
                Ok(buf.len())
            }
            Err(_) => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Initializes tracing for the application.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(app_name: &str, environment: Environment) -> Result<LogFlusher, TracingError> {
    // Route records of libraries using the `log` crate (the AWS SDK, rustls) into tracing.
    LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if environment.is_prod() {
        let _ = TOP_LEVEL_FIELDS.set(vec![
            (SERVICE_KEY_IN_LOG, app_name.to_owned()),
            (ENVIRONMENT_KEY_IN_LOG, environment.to_string()),
        ]);
        configure_prod_tracing(filter)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

/// JSON lines on stderr through a non-blocking writer.
fn configure_prod_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let (stderr_writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || FieldInjectingWriter::new(stderr_writer.make_writer()))
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
        // Keep stdout free for the invocation response.
        .with_writer(std::io::stderr)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Chains a hook that reports panics through `tracing` in front of the default one.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        panic.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_json_lines_pass_through() {
        let mut out = Vec::new();
        let mut writer = FieldInjectingWriter::new(&mut out);
        let written = writer.write(b"plain text line\n").unwrap();
        assert_eq!(written, 16);
        assert_eq!(out, b"plain text line\n");
    }
}
