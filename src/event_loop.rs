//! Main loop that feeds display events and signals into the controller.

use anyhow::Result;
use crossbeam_channel::{select, Receiver};
use tracing::{debug, info, warn};

use crate::controller::WindowController;
use crate::display::{DisplayEvent, DisplayService};
use crate::process::{ChildLauncher, SignalEvent};

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// SIGINT or SIGTERM; a clean exit.
    Signal(i32),
    /// The X connection dropped or its reader went away.
    ConnectionLost(String),
}

/// Dispatch events until a shutdown signal or a lost connection.
///
/// The caller owns teardown: it should call
/// [`WindowController::shutdown`] whatever this returns.
pub fn run_event_loop<D, L>(
    controller: &mut WindowController<D, L>,
    display_rx: &Receiver<DisplayEvent>,
    signal_rx: &Receiver<SignalEvent>,
) -> Result<LoopExit>
where
    D: DisplayService,
    L: ChildLauncher,
{
    info!("event loop started");
    loop {
        select! {
            recv(display_rx) -> event => {
                let Ok(event) = event else {
                    return Ok(LoopExit::ConnectionLost("display event reader stopped".into()));
                };
                if let Some(exit) = handle_display_event(controller, event)? {
                    return Ok(exit);
                }
            }
            recv(signal_rx) -> signal => {
                match signal {
                    Ok(SignalEvent::ChildExited) => controller.on_child_exit()?,
                    Ok(SignalEvent::Shutdown(signal)) => {
                        info!(signal, "shutdown requested");
                        return Ok(LoopExit::Signal(signal));
                    }
                    Err(_) => {
                        // Without the watcher nothing can stop us cleanly.
                        warn!("signal watcher stopped; exiting");
                        return Ok(LoopExit::Signal(0));
                    }
                }
            }
        }
    }
}

fn handle_display_event<D, L>(
    controller: &mut WindowController<D, L>,
    event: DisplayEvent,
) -> Result<Option<LoopExit>>
where
    D: DisplayService,
    L: ChildLauncher,
{
    match event {
        DisplayEvent::HotkeyReleased => controller.on_hotkey()?,
        DisplayEvent::Reparented { window, parent } => controller.on_reparent(window, parent)?,
        DisplayEvent::Unmapped { window } => controller.on_unmap(window)?,
        DisplayEvent::FocusLost => controller.on_focus_lost()?,
        DisplayEvent::ConnectionLost(reason) => {
            debug!(%reason, "display connection lost");
            return Ok(Some(LoopExit::ConnectionLost(reason)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Direction;
    use crate::controller::fakes::{settings, FakeDisplay, FakeLauncher, OVERLAY, TERMINAL};
    use crate::controller::{SpawnTrigger, Visibility};
    use crossbeam_channel::unbounded;

    fn started() -> WindowController<FakeDisplay, FakeLauncher> {
        let mut ctl = WindowController::new(
            FakeDisplay::parked(157),
            FakeLauncher::default(),
            OVERLAY,
            settings(157, 7),
        );
        ctl.spawn_or_respawn(SpawnTrigger::Startup).unwrap();
        ctl
    }

    #[test]
    fn dispatches_display_events_until_shutdown_signal() {
        let mut ctl = started();
        let (display_tx, display_rx) = unbounded();
        let (signal_tx, signal_rx) = unbounded();
        display_tx
            .send(DisplayEvent::Reparented {
                window: TERMINAL,
                parent: OVERLAY,
            })
            .unwrap();
        display_tx.send(DisplayEvent::HotkeyReleased).unwrap();

        // Signals are only sent once the display queue has drained, so the
        // order seen by the loop is deterministic.
        let exit = std::thread::scope(|scope| {
            scope.spawn(|| {
                while !display_tx.is_empty() {
                    std::thread::yield_now();
                }
                signal_tx.send(SignalEvent::Shutdown(libc::SIGTERM)).unwrap();
            });
            run_event_loop(&mut ctl, &display_rx, &signal_rx).unwrap()
        });

        assert_eq!(exit, LoopExit::Signal(libc::SIGTERM));
        assert_eq!(ctl.embedded(), Some(TERMINAL));
        assert_eq!(ctl.visibility(), Visibility::Visible);
        assert_eq!(ctl.commanded_direction(), Direction::Down);
    }

    #[test]
    fn child_exit_signal_reaps_and_respawns() {
        let mut ctl = started();
        let first = ctl.child().unwrap();
        ctl.launcher_mut().exit(first, 1);
        let (_display_tx, display_rx) = unbounded::<DisplayEvent>();
        let (signal_tx, signal_rx) = unbounded();
        signal_tx.send(SignalEvent::ChildExited).unwrap();
        signal_tx.send(SignalEvent::Shutdown(libc::SIGINT)).unwrap();

        let exit = run_event_loop(&mut ctl, &display_rx, &signal_rx).unwrap();
        assert_eq!(exit, LoopExit::Signal(libc::SIGINT));
        assert_eq!(ctl.launcher().launched.len(), 2);
        assert_ne!(ctl.child(), Some(first));
    }

    #[test]
    fn connection_loss_ends_the_loop() {
        let mut ctl = started();
        let (display_tx, display_rx) = unbounded();
        let (_signal_tx, signal_rx) = unbounded::<SignalEvent>();
        display_tx
            .send(DisplayEvent::ConnectionLost("broken pipe".into()))
            .unwrap();
        let exit = run_event_loop(&mut ctl, &display_rx, &signal_rx).unwrap();
        assert_eq!(exit, LoopExit::ConnectionLost("broken pipe".into()));
    }

    #[test]
    fn closed_display_channel_counts_as_connection_loss() {
        let mut ctl = started();
        let (display_tx, display_rx) = unbounded::<DisplayEvent>();
        drop(display_tx);
        let (_signal_tx, signal_rx) = unbounded::<SignalEvent>();
        let exit = run_event_loop(&mut ctl, &display_rx, &signal_rx).unwrap();
        assert!(matches!(exit, LoopExit::ConnectionLost(_)));
    }
}
