//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use clap::{ArgAction, Parser};

use crate::hotkey::Hotkey;

pub use defaults::{
    BORDER, DEFAULT_EMBED_FLAG, DEFAULT_HEIGHT, DEFAULT_HOTKEY, DEFAULT_INSTANCE_NAME,
    DEFAULT_SPEED, DEFAULT_TERMINAL,
};

/// CLI options for the drop-down console. `-h` is the overlay height, so help
/// is only reachable through the long `--help` flag.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "dropconsole",
    about = "Drop-down X11 console that slides a terminal in from the top of the screen",
    author,
    version,
    disable_help_flag = true
)]
pub struct AppConfig {
    /// X display to connect to (defaults to $DISPLAY)
    #[arg(short = 'd', long, value_name = "DISPLAY")]
    pub display: Option<String>,

    /// Height of the overlay when fully visible, in pixels
    #[arg(short = 'h', long, value_name = "PIXELS", default_value_t = DEFAULT_HEIGHT)]
    pub height: i64,

    /// Animation speed, 1 (slowest) to 10 (fastest)
    #[arg(short = 's', long, value_name = "1-10", default_value_t = DEFAULT_SPEED)]
    pub speed: i64,

    /// Width of the overlay in pixels (defaults to the screen width)
    #[arg(short = 'w', long, value_name = "PIXELS")]
    pub width: Option<i64>,

    /// Key combination that toggles the console, e.g. ctrl+o or super+grave
    #[arg(short = 'k', long, value_name = "KEYS", default_value = DEFAULT_HOTKEY)]
    pub hotkey: String,

    /// Terminal command line; it must accept an embedding window id
    #[arg(short = 'e', long = "terminal", value_name = "CMD", default_value = DEFAULT_TERMINAL)]
    pub terminal_cmd: String,

    /// Instance name handed to the terminal with -name
    #[arg(long, default_value = DEFAULT_INSTANCE_NAME)]
    pub name: String,

    /// Terminal flag that takes the embedding window id (-into for xterm, -embed for urxvt)
    #[arg(long = "embed-flag", value_name = "FLAG", default_value = DEFAULT_EMBED_FLAG, allow_hyphen_values = true)]
    pub embed_flag: String,

    /// Stop respawning after this many consecutive failed spawns (0 = never stop)
    #[arg(long = "respawn-limit", value_name = "N", default_value_t = 0)]
    pub respawn_limit: u32,

    /// Verbose logging to stderr
    #[arg(long)]
    pub debug: bool,

    /// Enable the JSON trace log file
    #[arg(long = "logs", env = "DROPCONSOLE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs)
    #[arg(long = "no-logs", env = "DROPCONSOLE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,

    /// Parsed terminal program and arguments, filled in by `validate`.
    #[arg(skip)]
    pub terminal: TerminalCommand,

    /// Parsed hotkey, filled in by `validate`.
    #[arg(skip)]
    pub binding: Hotkey,
}

/// Terminal program plus the arguments that precede the embedding flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AppConfig {
    /// Overlay height as validated pixels.
    pub fn height_px(&self) -> u32 {
        self.height as u32
    }

    pub fn speed_level(&self) -> u32 {
        self.speed as u32
    }

    pub fn width_px(&self) -> Option<u32> {
        self.width.map(|w| w as u32)
    }

    pub fn respawn_limit(&self) -> Option<u32> {
        (self.respawn_limit > 0).then_some(self.respawn_limit)
    }

    pub fn file_logging_enabled(&self) -> bool {
        self.logs && !self.no_logs
    }
}
