//! dropconsole entrypoint: parse flags, open the overlay, and hand control
//! to the event loop.
//!
//! # Threads
//!
//! - Main: owns the controller and runs the event loop
//! - x11-events: blocks on the X connection and forwards display events
//! - signal-watcher: forwards SIGCHLD/SIGINT/SIGTERM

use anyhow::{anyhow, Result};
use crossbeam_channel::bounded;
use dropconsole::config::AppConfig;
use dropconsole::controller::ControllerSettings;
use dropconsole::display::X11Display;
use dropconsole::event_loop::{run_event_loop, LoopExit};
use dropconsole::process::{ForkLauncher, SignalWatcher};
use dropconsole::{init_tracing, install_panic_hook, SpawnTrigger, WindowController};
use tracing::{error, info};

const DISPLAY_EVENT_CAPACITY: usize = 64;
const SIGNAL_EVENT_CAPACITY: usize = 16;

fn main() -> Result<()> {
    let config = match AppConfig::parse_args() {
        Ok(config) => config,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    init_tracing(&config);
    install_panic_hook(&config);

    let (signal_tx, signal_rx) = bounded(SIGNAL_EVENT_CAPACITY);
    let watcher = SignalWatcher::spawn(signal_tx)?;

    let display = X11Display::connect(config.display.as_deref())?;
    let (window, geometry) =
        display.create_overlay(&config.name, config.width_px(), config.height_px())?;
    let events = display.grab_hotkey(&config.binding)?;
    let (display_tx, display_rx) = bounded(DISPLAY_EVENT_CAPACITY);
    events.spawn(display_tx)?;

    let settings = ControllerSettings::from_config(&config, geometry);
    let mut controller = WindowController::new(display, ForkLauncher, window, settings);
    info!(
        window,
        width = geometry.width,
        height = geometry.height,
        hotkey = %config.binding,
        "overlay ready"
    );

    let outcome = controller
        .spawn_or_respawn(SpawnTrigger::Startup)
        .and_then(|()| run_event_loop(&mut controller, &display_rx, &signal_rx));
    controller.shutdown();
    // A watcher blocked on a full channel only wakes once the receiver is gone.
    drop(signal_rx);
    watcher.close();

    match outcome {
        Ok(LoopExit::Signal(signal)) => {
            info!(signal, "exiting");
            Ok(())
        }
        Ok(LoopExit::ConnectionLost(reason)) => {
            error!(%reason, "lost connection to X server");
            Err(anyhow!("lost connection to X server: {reason}"))
        }
        Err(err) => {
            error!(error = %err, "fatal error");
            Err(err)
        }
    }
}
