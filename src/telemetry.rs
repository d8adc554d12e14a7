use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// JSON trace file, overridable with `DROPCONSOLE_TRACE_LOG`.
pub fn tracing_log_path() -> PathBuf {
    env::var("DROPCONSOLE_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("dropconsole_trace.jsonl"))
}

fn stderr_level(config: &AppConfig) -> Level {
    if config.debug {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

/// Install the global subscriber once: JSON lines to the trace file when file
/// logging is on, otherwise compact output on stderr.
pub fn init_tracing(config: &AppConfig) {
    let _ = TRACING_INIT.get_or_init(|| {
        if config.file_logging_enabled() {
            let path = tracing_log_path();
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => {
                    let level = if config.debug { Level::TRACE } else { Level::DEBUG };
                    let subscriber = tracing_subscriber::fmt()
                        .json()
                        .with_max_level(level)
                        .with_timer(UtcTime::rfc_3339())
                        .with_writer(file)
                        .with_current_span(false)
                        .with_span_list(false)
                        .finish();
                    let _ = tracing::subscriber::set_global_default(subscriber);
                    return;
                }
                Err(err) => {
                    eprintln!(
                        "dropconsole: cannot open trace log {}: {err}; logging to stderr",
                        path.display()
                    );
                }
            }
        }

        let subscriber = tracing_subscriber::fmt()
            .compact()
            .with_max_level(stderr_level(config))
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
