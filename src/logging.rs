use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();
static CRASH_LOG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Path to the crash log file (metadata only).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("dropconsole_crash.log")
}

/// On unless `--no-logs`; `--logs` is not required.
fn crash_log_enabled(config: &AppConfig) -> bool {
    !config.no_logs
}

/// Record panics to the crash log and the tracing output, then defer to the
/// previously installed hook. Safe to call more than once.
pub fn install_panic_hook(config: &AppConfig) {
    CRASH_LOG_ENABLED.store(crash_log_enabled(config), Ordering::Relaxed);
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|loc| format!("{}:{}", loc.file(), loc.line()))
                .unwrap_or_else(|| "unknown".to_string());
            tracing::error!(%location, "panic");
            log_panic(&location, panic_payload(info));
            previous(info);
        }));
    });
}

fn panic_payload<'a>(info: &'a panic::PanicHookInfo<'_>) -> &'a str {
    if let Some(text) = info.payload().downcast_ref::<&str>() {
        text
    } else if let Some(text) = info.payload().downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}

fn log_panic(location: &str, payload: &str) {
    log_panic_to(&crash_log_path(), location, payload);
}

fn log_panic_to(path: &Path, location: &str, payload: &str) {
    if !CRASH_LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let line = format!(
        "[{timestamp}] panic at {location}: {payload} (v{})\n",
        env!("CARGO_PKG_VERSION")
    );
    append_capped(path, &line, CRASH_LOG_MAX_BYTES);
}

/// Append `line`, starting the file over when it would exceed `max_bytes`.
fn append_capped(path: &Path, line: &str, max_bytes: u64) {
    let existing = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let truncate = existing.saturating_add(line.len() as u64) > max_bytes;
    let mut options = fs::OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    if let Ok(mut file) = options.open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}
