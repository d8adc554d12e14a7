//! Terminal child process lifecycle: launching, reaping, and signalling.

mod fork;
mod watcher;

use std::fmt;
use std::process::ExitStatus;

use anyhow::Result;

use crate::config::AppConfig;
use crate::display::WindowId;

pub use fork::ForkLauncher;
pub use watcher::{SignalEvent, SignalWatcher};

/// Process id of a launched terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildId(pub i32);

impl fmt::Display for ChildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a non-blocking reap attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaped {
    Running,
    Exited(ExitStatus),
    /// No such child; it was already collected.
    Gone,
}

impl Reaped {
    pub fn is_dead(self) -> bool {
        !matches!(self, Reaped::Running)
    }
}

/// Process operations the controller needs. Reaping is always for one
/// specific child and never blocks.
pub trait ChildLauncher {
    fn launch(&mut self, argv: &[String]) -> Result<ChildId>;
    fn try_reap(&mut self, child: ChildId) -> Result<Reaped>;
    /// Ask the child to exit (SIGTERM).
    fn terminate(&mut self, child: ChildId) -> Result<()>;
    /// Force the child to exit (SIGKILL).
    fn kill(&mut self, child: ChildId) -> Result<()>;
}

/// How to build the terminal command line for a given embedding window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLaunch {
    pub program: String,
    pub args: Vec<String>,
    pub name: String,
    pub embed_flag: String,
}

impl TerminalLaunch {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            program: config.terminal.program.clone(),
            args: config.terminal.args.clone(),
            name: config.name.clone(),
            embed_flag: config.embed_flag.clone(),
        }
    }

    /// `program args… -name <name> <embed_flag> <window>`; the window id is
    /// always the last argument, in decimal.
    pub fn argv(&self, window: WindowId) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 5);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push("-name".to_string());
        argv.push(self.name.clone());
        argv.push(self.embed_flag.clone());
        argv.push(window.to_string());
        argv
    }
}
