//! Recording fakes for the display and process seams.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use anyhow::{anyhow, Result};

use crate::display::{DisplayService, FocusTarget, WindowId};
use crate::process::{ChildId, ChildLauncher, Reaped, TerminalLaunch};

use super::ControllerSettings;

pub(crate) const OVERLAY: WindowId = 10;
pub(crate) const TERMINAL: WindowId = 42;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Op {
    Move(WindowId, i32, i32),
    Resize(WindowId, u32, u32),
    Raise(WindowId),
    Lower(WindowId),
    Focus(FocusTarget),
    UnmapSubwindows(WindowId),
    Sync,
    Flush,
    Close(WindowId),
}

/// Records every request and tracks the overlay's y coordinate.
pub(crate) struct FakeDisplay {
    ops: RefCell<Vec<Op>>,
    pub(crate) y: Cell<i32>,
}

impl FakeDisplay {
    pub(crate) fn parked(height: u32) -> Self {
        Self {
            ops: RefCell::new(Vec::new()),
            y: Cell::new(-(height as i32)),
        }
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.ops.borrow_mut().clear();
    }

    pub(crate) fn overlay_moves(&self) -> Vec<i32> {
        self.ops
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Move(OVERLAY, _, y) => Some(*y),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: Op) {
        self.ops.borrow_mut().push(op);
    }
}

impl DisplayService for FakeDisplay {
    fn move_window(&self, window: WindowId, x: i32, y: i32) -> Result<()> {
        if window == OVERLAY {
            self.y.set(y);
        }
        self.record(Op::Move(window, x, y));
        Ok(())
    }

    fn resize_window(&self, window: WindowId, width: u32, height: u32) -> Result<()> {
        self.record(Op::Resize(window, width, height));
        Ok(())
    }

    fn raise_window(&self, window: WindowId) -> Result<()> {
        self.record(Op::Raise(window));
        Ok(())
    }

    fn lower_window(&self, window: WindowId) -> Result<()> {
        self.record(Op::Lower(window));
        Ok(())
    }

    fn window_y(&self, window: WindowId) -> Result<i32> {
        assert_eq!(window, OVERLAY);
        Ok(self.y.get())
    }

    fn set_input_focus(&self, target: FocusTarget) -> Result<()> {
        self.record(Op::Focus(target));
        Ok(())
    }

    fn unmap_subwindows(&self, window: WindowId) -> Result<()> {
        self.record(Op::UnmapSubwindows(window));
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.record(Op::Sync);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.record(Op::Flush);
        Ok(())
    }

    fn close(&self, window: WindowId) -> Result<()> {
        self.record(Op::Close(window));
        Ok(())
    }
}

/// Hands out sequential pids; children run until told to exit.
#[derive(Default)]
pub(crate) struct FakeLauncher {
    next_pid: i32,
    pub(crate) launched: Vec<Vec<String>>,
    states: HashMap<i32, Reaped>,
    pub(crate) terminated: Vec<ChildId>,
    pub(crate) killed: Vec<ChildId>,
    pub(crate) fail_launch: bool,
}

impl FakeLauncher {
    pub(crate) fn exit(&mut self, child: ChildId, code: i32) {
        self.states
            .insert(child.0, Reaped::Exited(ExitStatus::from_raw(code << 8)));
    }
}

impl ChildLauncher for FakeLauncher {
    fn launch(&mut self, argv: &[String]) -> Result<ChildId> {
        if self.fail_launch {
            return Err(anyhow!("fork failed: Resource temporarily unavailable"));
        }
        self.next_pid += 1;
        let pid = 1000 + self.next_pid;
        self.launched.push(argv.to_vec());
        self.states.insert(pid, Reaped::Running);
        Ok(ChildId(pid))
    }

    fn try_reap(&mut self, child: ChildId) -> Result<Reaped> {
        let state = self.states.get(&child.0).copied().unwrap_or(Reaped::Gone);
        if let Reaped::Exited(_) = state {
            self.states.insert(child.0, Reaped::Gone);
        }
        Ok(state)
    }

    fn terminate(&mut self, child: ChildId) -> Result<()> {
        self.terminated.push(child);
        Ok(())
    }

    fn kill(&mut self, child: ChildId) -> Result<()> {
        self.killed.push(child);
        Ok(())
    }
}

/// 1280 pixels wide, launching plain xterm.
pub(crate) fn settings(height: u32, speed: u32) -> ControllerSettings {
    ControllerSettings {
        width: 1280,
        height,
        speed,
        respawn_limit: None,
        terminal: TerminalLaunch {
            program: "xterm".to_string(),
            args: Vec::new(),
            name: "dropconsole".to_string(),
            embed_flag: "-into".to_string(),
        },
    }
}
