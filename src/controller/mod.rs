//! Overlay state machine: visibility, slides, and the terminal lifecycle.
//!
//! Every state change happens here, on the main thread, in response to one
//! display event or one signal at a time.

#[cfg(test)]
pub(crate) mod fakes;
mod state;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::animation::{self, Direction, Slide};
use crate::config::{AppConfig, BORDER};
use crate::display::{DisplayService, FocusTarget, OverlayGeometry, WindowId};
use crate::process::{ChildId, ChildLauncher, Reaped, TerminalLaunch};

pub use state::{SpawnState, SpawnTrigger, Visibility};

/// Fixed parameters for one controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub width: u32,
    pub height: u32,
    pub speed: u32,
    /// Give up after this many consecutive spawns that die before reparenting.
    pub respawn_limit: Option<u32>,
    pub terminal: TerminalLaunch,
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig, geometry: OverlayGeometry) -> Self {
        Self {
            width: geometry.width,
            height: geometry.height,
            speed: config.speed_level(),
            respawn_limit: config.respawn_limit(),
            terminal: TerminalLaunch::from_config(config),
        }
    }
}

pub struct WindowController<D, L> {
    display: D,
    launcher: L,
    window: WindowId,
    settings: ControllerSettings,
    embedded: Option<WindowId>,
    resting: Visibility,
    /// Set only while `slide` runs. Handlers would see it only if slides ever
    /// stopped being synchronous.
    motion: Option<Direction>,
    child: Option<ChildId>,
    retired: Vec<ChildId>,
    spawn: SpawnState,
    shutting_down: bool,
    failed_spawns: u32,
}

impl<D, L> WindowController<D, L>
where
    D: DisplayService,
    L: ChildLauncher,
{
    /// Take ownership of an already created, hidden overlay.
    pub fn new(display: D, launcher: L, window: WindowId, settings: ControllerSettings) -> Self {
        Self {
            display,
            launcher,
            window,
            settings,
            embedded: None,
            resting: Visibility::Hidden,
            motion: None,
            child: None,
            retired: Vec::new(),
            spawn: SpawnState::Idle,
            shutting_down: false,
            failed_spawns: 0,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    #[cfg(test)]
    pub(crate) fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn visibility(&self) -> Visibility {
        self.resting
    }

    /// Direction of the slide in progress. Slides run to completion inside a
    /// single handler, so this is `None` whenever an event is dispatched.
    pub fn motion(&self) -> Option<Direction> {
        self.motion
    }

    pub fn embedded(&self) -> Option<WindowId> {
        self.embedded
    }

    pub fn child(&self) -> Option<ChildId> {
        self.child
    }

    pub fn retired(&self) -> &[ChildId] {
        &self.retired
    }

    pub fn spawn_state(&self) -> SpawnState {
        self.spawn
    }

    pub fn failed_spawns(&self) -> u32 {
        self.failed_spawns
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Direction of the last commanded slide.
    pub fn commanded_direction(&self) -> Direction {
        self.motion.unwrap_or_else(|| self.resting.arrived_by())
    }

    /// Toggle: reverse the last commanded direction.
    pub fn on_hotkey(&mut self) -> Result<()> {
        if self.shutting_down {
            return Ok(());
        }
        let target = self.commanded_direction().reversed();
        self.slide(target, false)
    }

    /// A window was reparented. Only reparents into the overlay matter.
    pub fn on_reparent(&mut self, window: WindowId, parent: WindowId) -> Result<()> {
        if self.shutting_down {
            return Ok(());
        }
        if parent != self.window {
            debug!(window, parent, "ignoring reparent into another parent");
            return Ok(());
        }

        self.embedded = Some(window);
        self.display.move_window(window, -1, -1)?;
        let inner_height = self.settings.height.saturating_sub(BORDER).max(1);
        self.display
            .resize_window(window, self.settings.width, inner_height)?;
        self.display.flush()?;
        self.spawn = SpawnState::Idle;
        self.failed_spawns = 0;
        info!(window, child = ?self.child, "terminal embedded");
        Ok(())
    }

    /// An unmap of the embedded terminal means it went away.
    pub fn on_unmap(&mut self, window: WindowId) -> Result<()> {
        if self.embedded != Some(window) {
            debug!(window, "ignoring unmap of non-embedded window");
            return Ok(());
        }
        info!(window, "embedded terminal unmapped");
        self.spawn_or_respawn(SpawnTrigger::Notification)
    }

    /// Keep keyboard focus on the terminal while the console is down.
    pub fn on_focus_lost(&mut self) -> Result<()> {
        if self.shutting_down || self.motion.is_some() || self.resting != Visibility::Visible {
            return Ok(());
        }
        let Some(embedded) = self.embedded else {
            return Ok(());
        };
        debug!(window = embedded, "restoring focus to terminal");
        self.display
            .set_input_focus(FocusTarget::Window(embedded))?;
        self.display.flush()
    }

    /// Reap whatever exited. Only the death of the live terminal respawns.
    pub fn on_child_exit(&mut self) -> Result<()> {
        if self.shutting_down {
            return Ok(());
        }

        let launcher = &mut self.launcher;
        self.retired.retain(|&child| match launcher.try_reap(child) {
            Ok(Reaped::Running) => true,
            Ok(status) => {
                debug!(pid = child.0, ?status, "retired terminal reaped");
                false
            }
            Err(err) => {
                warn!(pid = child.0, error = %err, "dropping unreapable terminal");
                false
            }
        });

        let Some(child) = self.child else {
            return Ok(());
        };
        let status = self.launcher.try_reap(child)?;
        if !status.is_dead() {
            return Ok(());
        }

        self.child = None;
        if self.spawn == SpawnState::AwaitingReparent {
            self.failed_spawns += 1;
            self.spawn = SpawnState::Idle;
            warn!(
                pid = child.0,
                ?status,
                failed_spawns = self.failed_spawns,
                "terminal exited before embedding"
            );
        } else {
            info!(pid = child.0, ?status, "terminal exited");
        }
        self.spawn_or_respawn(SpawnTrigger::Notification)
    }

    /// Retire the current terminal (if any) and launch a new one.
    ///
    /// Notifications are dropped while a spawn is already in flight so a burst
    /// of exit and unmap events yields a single replacement.
    pub fn spawn_or_respawn(&mut self, trigger: SpawnTrigger) -> Result<()> {
        if self.shutting_down {
            debug!(?trigger, "not spawning during shutdown");
            return Ok(());
        }
        if trigger == SpawnTrigger::Notification && self.spawn != SpawnState::Idle {
            debug!(state = ?self.spawn, "spawn already in flight");
            return Ok(());
        }
        self.spawn = SpawnState::SpawnRequested;

        if self.child.is_some() || self.embedded.is_some() {
            self.retire_terminal()?;
        }

        if let Some(limit) = self.settings.respawn_limit {
            if self.failed_spawns >= limit {
                error!(
                    failed_spawns = self.failed_spawns,
                    limit, "terminal keeps failing to start; giving up on respawn"
                );
                self.spawn = SpawnState::Idle;
                return Ok(());
            }
        }

        let argv = self.settings.terminal.argv(self.window);
        let child = match self.launcher.launch(&argv) {
            Ok(child) => child,
            Err(err) => {
                self.spawn = SpawnState::Idle;
                return Err(err).context("failed to launch terminal");
            }
        };
        info!(pid = child.0, ?trigger, argv = ?argv, "terminal spawned");
        self.child = Some(child);
        self.spawn = SpawnState::AwaitingReparent;
        Ok(())
    }

    /// Kill the live terminal once, plus any retired terminal that outlived
    /// its SIGTERM, and release the overlay. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        info!(child = ?self.child, retired = self.retired.len(), "shutting down");

        let mut doomed: Vec<ChildId> = self.child.take().into_iter().collect();
        doomed.append(&mut self.retired);
        for child in doomed {
            if let Err(err) = self.launcher.kill(child) {
                warn!(pid = child.0, error = %err, "failed to kill terminal");
            }
        }
        if let Err(err) = self.display.close(self.window) {
            warn!(error = %err, "failed to close overlay");
        }
    }

    fn retire_terminal(&mut self) -> Result<()> {
        if let Some(child) = self.child.take() {
            match self.launcher.try_reap(child)? {
                Reaped::Running => {
                    self.launcher.terminate(child)?;
                    self.retired.push(child);
                    debug!(pid = child.0, "old terminal terminated");
                }
                status => debug!(pid = child.0, ?status, "old terminal already exited"),
            }
        }
        self.slide(Direction::Up, true)?;
        self.display.unmap_subwindows(self.window)?;
        self.embedded = None;
        Ok(())
    }

    fn slide(&mut self, direction: Direction, quick: bool) -> Result<()> {
        let focus = match direction {
            Direction::Down => FocusTarget::Window(self.embedded.unwrap_or(self.window)),
            Direction::Up => FocusTarget::PointerRoot,
        };
        self.motion = Some(direction);
        let result = animation::run_slide(
            &self.display,
            self.window,
            self.settings.height,
            self.settings.speed,
            Slide {
                direction,
                quick,
                focus,
            },
        );
        self.motion = None;
        let moves = result?;
        self.resting = Visibility::from(direction);
        debug!(?direction, quick, moves, resting = ?self.resting, "slide finished");
        Ok(())
    }
}
