pub const DEFAULT_SPEED: i64 = 7;
pub const DEFAULT_HEIGHT: i64 = 157;

/// Pixels of overlay left below the embedded terminal.
pub const BORDER: u32 = 4;

pub const DEFAULT_HOTKEY: &str = "ctrl+o";
pub const DEFAULT_TERMINAL: &str = "xterm";
pub const DEFAULT_INSTANCE_NAME: &str = "dropconsole";
pub const DEFAULT_EMBED_FLAG: &str = "-into";

/// X11 caps coordinates and sizes at 16 bits.
pub(super) const MAX_DIMENSION: i64 = i16::MAX as i64;
pub(super) const MAX_TERMINAL_ARGS: usize = 64;
pub(super) const MAX_TERMINAL_ARG_BYTES: usize = 4096;
