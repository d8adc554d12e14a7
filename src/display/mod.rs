//! Windowing-system boundary.
//!
//! The controller only talks to [`DisplayService`]; the X11 connection lives
//! in [`x11`]. Events flow the other way as [`DisplayEvent`]s over a channel
//! fed by a dedicated reader thread.

mod x11;

use anyhow::Result;

pub use x11::{X11Display, X11EventSource};

/// Server-side window identifier.
pub type WindowId = u32;

/// Keyboard focus destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Window(WindowId),
    /// Focus follows the pointer; used to hand focus back when hiding.
    PointerRoot,
}

/// Events the controller reacts to. Everything else is dropped by the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// `window` became a child of `parent`.
    Reparented { window: WindowId, parent: WindowId },
    /// A child of the overlay was unmapped.
    Unmapped { window: WindowId },
    /// The toggle hotkey was released.
    HotkeyReleased,
    /// The overlay lost keyboard focus to a window outside it.
    FocusLost,
    /// The connection to the server is gone; no further events will follow.
    ConnectionLost(String),
}

/// Screen and overlay dimensions, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGeometry {
    pub screen_width: u32,
    pub screen_height: u32,
    pub width: u32,
    pub height: u32,
}

/// Window operations used by the controller and animation engine.
///
/// Requests may be buffered until [`DisplayService::flush`] or
/// [`DisplayService::sync`]; `sync` additionally waits for the server to
/// process everything sent so far.
pub trait DisplayService {
    fn move_window(&self, window: WindowId, x: i32, y: i32) -> Result<()>;
    fn resize_window(&self, window: WindowId, width: u32, height: u32) -> Result<()>;
    fn raise_window(&self, window: WindowId) -> Result<()>;
    fn lower_window(&self, window: WindowId) -> Result<()>;
    /// Current y coordinate of `window` relative to its parent.
    fn window_y(&self, window: WindowId) -> Result<i32>;
    fn set_input_focus(&self, target: FocusTarget) -> Result<()>;
    fn unmap_subwindows(&self, window: WindowId) -> Result<()>;
    fn sync(&self) -> Result<()>;
    fn flush(&self) -> Result<()>;
    /// Destroy `window` and push the request out before the connection is dropped.
    fn close(&self, window: WindowId) -> Result<()>;
}
