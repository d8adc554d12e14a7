pub mod animation;
pub mod config;
pub mod controller;
pub mod display;
pub mod event_loop;
pub mod hotkey;
mod logging;
pub mod process;
mod telemetry;

pub use controller::{SpawnTrigger, WindowController};
pub use logging::{crash_log_path, install_panic_hook};
pub use telemetry::{init_tracing, tracing_log_path};
