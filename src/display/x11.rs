//! X11 implementation of [`DisplayService`] on top of `x11rb`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::Sender;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{
    AtomEnum, ConfigureWindowAux, ConnectionExt as _, CreateWindowAux, EventMask, GrabMode,
    InputFocus, Keycode, Keysym, ModMask, NotifyDetail, PropMode, StackMode, Window, WindowClass,
};
use x11rb::protocol::{ErrorKind, Event};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::{DisplayEvent, DisplayService, FocusTarget, OverlayGeometry, WindowId};
use crate::hotkey::Hotkey;

/// `PointerRoot` as a focus window value.
const POINTER_ROOT: Window = 1;

/// Owned connection plus the root window of the chosen screen.
pub struct X11Display {
    conn: Arc<RustConnection>,
    root: Window,
    screen_width: u32,
    screen_height: u32,
    black_pixel: u32,
}

impl X11Display {
    /// Open a connection to `display`, or `$DISPLAY` when `None`.
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let name = display.map(str::to_owned).unwrap_or_else(|| {
            std::env::var("DISPLAY").unwrap_or_default()
        });
        let (conn, screen_num) = x11rb::connect(display)
            .with_context(|| format!("can not open display '{name}'"))?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("display '{name}' has no screen {screen_num}"))?;
        let root = screen.root;
        let screen_width = u32::from(screen.width_in_pixels);
        let screen_height = u32::from(screen.height_in_pixels);
        let black_pixel = screen.black_pixel;
        info!(display = %name, screen_width, screen_height, "connected to X server");
        Ok(Self {
            conn: Arc::new(conn),
            root,
            screen_width,
            screen_height,
            black_pixel,
        })
    }

    /// Create the borderless overlay parked just above the top edge and map it.
    pub fn create_overlay(
        &self,
        title: &str,
        width: Option<u32>,
        height: u32,
    ) -> Result<(WindowId, OverlayGeometry)> {
        let width = width.unwrap_or(self.screen_width);
        let geometry = OverlayGeometry {
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            width,
            height,
        };
        let window = self
            .conn
            .generate_id()
            .context("failed to allocate overlay window id")?;
        let aux = CreateWindowAux::new()
            .background_pixel(self.black_pixel)
            .border_pixel(self.black_pixel)
            .override_redirect(1u32)
            .event_mask(EventMask::SUBSTRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE);
        self.conn
            .create_window(
                x11rb::COPY_DEPTH_FROM_PARENT,
                window,
                self.root,
                0,
                -(height as i16),
                width as u16,
                height as u16,
                0,
                WindowClass::INPUT_OUTPUT,
                x11rb::COPY_FROM_PARENT,
                &aux,
            )
            .context("failed to create overlay window")?;
        self.conn
            .change_property8(
                PropMode::REPLACE,
                window,
                AtomEnum::WM_NAME,
                AtomEnum::STRING,
                title.as_bytes(),
            )
            .context("failed to set overlay window name")?;
        self.conn
            .map_window(window)
            .context("failed to map overlay window")?;
        self.raise_window(window)?;
        self.sync()
            .context("X server rejected the overlay window")?;
        debug!(window, width, height, "overlay created");
        Ok((window, geometry))
    }

    /// Grab `hotkey` on the root window with every lock-key combination and
    /// return an event source that reports its releases.
    pub fn grab_hotkey(&self, hotkey: &Hotkey) -> Result<X11EventSource> {
        let keycode = self.keycode_for(hotkey.keysym)?;
        for modifiers in hotkey.grab_variants() {
            let result = self
                .conn
                .grab_key(
                    false,
                    self.root,
                    ModMask::from(modifiers),
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )
                .context("failed to send key grab")?
                .check();
            match result {
                Ok(()) => {}
                Err(ReplyError::X11Error(err)) if err.error_kind == ErrorKind::Access => {
                    bail!(
                        "could not bind key {hotkey}. possibly another application bound to it?"
                    );
                }
                Err(err) => return Err(err).context("failed to grab hotkey"),
            }
        }
        info!(%hotkey, keycode, "hotkey grabbed");
        Ok(X11EventSource {
            conn: Arc::clone(&self.conn),
            keycode,
        })
    }

    fn keycode_for(&self, keysym: Keysym) -> Result<Keycode> {
        let setup = self.conn.setup();
        let min = setup.min_keycode;
        let count = setup.max_keycode - min + 1;
        let mapping = self
            .conn
            .get_keyboard_mapping(min, count)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;
        find_keycode(min, mapping.keysyms_per_keycode, &mapping.keysyms, keysym)
            .ok_or_else(|| anyhow!("no key on this keyboard produces keysym 0x{keysym:04x}"))
    }
}

impl DisplayService for X11Display {
    fn move_window(&self, window: WindowId, x: i32, y: i32) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().x(x).y(y))
            .context("failed to move window")?;
        Ok(())
    }

    fn resize_window(&self, window: WindowId, width: u32, height: u32) -> Result<()> {
        self.conn
            .configure_window(
                window,
                &ConfigureWindowAux::new().width(width).height(height),
            )
            .context("failed to resize window")?;
        Ok(())
    }

    fn raise_window(&self, window: WindowId) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
            .context("failed to raise window")?;
        Ok(())
    }

    fn lower_window(&self, window: WindowId) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::BELOW))
            .context("failed to lower window")?;
        Ok(())
    }

    fn window_y(&self, window: WindowId) -> Result<i32> {
        let geometry = self
            .conn
            .get_geometry(window)
            .context("failed to request window geometry")?
            .reply()
            .context("failed to read window geometry")?;
        Ok(i32::from(geometry.y))
    }

    fn set_input_focus(&self, target: FocusTarget) -> Result<()> {
        let focus = match target {
            FocusTarget::Window(window) => window,
            FocusTarget::PointerRoot => POINTER_ROOT,
        };
        self.conn
            .set_input_focus(InputFocus::PARENT, focus, x11rb::CURRENT_TIME)
            .context("failed to set input focus")?;
        Ok(())
    }

    fn unmap_subwindows(&self, window: WindowId) -> Result<()> {
        self.conn
            .unmap_subwindows(window)
            .context("failed to unmap subwindows")?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.conn.sync().context("X server round trip failed")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush().context("failed to flush X requests")?;
        Ok(())
    }

    fn close(&self, window: WindowId) -> Result<()> {
        self.conn
            .destroy_window(window)
            .context("failed to destroy overlay window")?;
        self.flush()
    }
}

/// Blocking reader that turns X events into [`DisplayEvent`]s.
pub struct X11EventSource {
    conn: Arc<RustConnection>,
    keycode: Keycode,
}

impl X11EventSource {
    /// Run the reader on its own thread until the connection drops or the
    /// receiving side goes away.
    pub fn spawn(self, tx: Sender<DisplayEvent>) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("x11-events".into())
            .spawn(move || self.run(tx))
            .context("failed to start X event thread")
    }

    fn run(self, tx: Sender<DisplayEvent>) {
        loop {
            let event = match self.conn.wait_for_event() {
                Ok(event) => event,
                Err(err) => {
                    let _ = tx.send(DisplayEvent::ConnectionLost(err.to_string()));
                    return;
                }
            };
            if let Event::Error(err) = &event {
                warn!(error = ?err, "X request failed");
                continue;
            }
            let Some(event) = translate_event(&event, self.keycode) else {
                continue;
            };
            debug!(?event, "display event");
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

/// First keycode whose mapping contains `keysym` in any column.
fn find_keycode(
    min_keycode: Keycode,
    keysyms_per_keycode: u8,
    keysyms: &[Keysym],
    keysym: Keysym,
) -> Option<Keycode> {
    if keysyms_per_keycode == 0 {
        return None;
    }
    keysyms
        .chunks(usize::from(keysyms_per_keycode))
        .position(|row| row.contains(&keysym))
        .and_then(|offset| u8::try_from(offset).ok())
        .and_then(|offset| min_keycode.checked_add(offset))
}

fn translate_event(event: &Event, hotkey: Keycode) -> Option<DisplayEvent> {
    match event {
        Event::ReparentNotify(ev) => Some(DisplayEvent::Reparented {
            window: ev.window,
            parent: ev.parent,
        }),
        Event::UnmapNotify(ev) => Some(DisplayEvent::Unmapped { window: ev.window }),
        Event::KeyRelease(ev) if ev.detail == hotkey => Some(DisplayEvent::HotkeyReleased),
        // Focus moving into the embedded terminal is not a loss.
        Event::FocusOut(ev) if ev.detail != NotifyDetail::INFERIOR => {
            Some(DisplayEvent::FocusLost)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{
        FocusOutEvent, NotifyMode, ReparentNotifyEvent, UnmapNotifyEvent,
    };

    #[test]
    fn find_keycode_scans_every_column() {
        // Two keysyms per keycode starting at keycode 8.
        let keysyms = [0x61, 0x41, 0x6f, 0x4f, 0xffbe, 0];
        assert_eq!(find_keycode(8, 2, &keysyms, 0x6f), Some(9));
        assert_eq!(find_keycode(8, 2, &keysyms, 0x4f), Some(9));
        assert_eq!(find_keycode(8, 2, &keysyms, 0xffbe), Some(10));
        assert_eq!(find_keycode(8, 2, &keysyms, 0x7a), None);
    }

    #[test]
    fn find_keycode_handles_empty_mapping() {
        assert_eq!(find_keycode(8, 0, &[], 0x6f), None);
    }

    #[test]
    fn reparent_and_unmap_are_forwarded() {
        let reparent = Event::ReparentNotify(ReparentNotifyEvent {
            response_type: 21,
            sequence: 0,
            event: 10,
            window: 42,
            parent: 10,
            x: 0,
            y: 0,
            override_redirect: false,
        });
        assert_eq!(
            translate_event(&reparent, 32),
            Some(DisplayEvent::Reparented {
                window: 42,
                parent: 10
            })
        );

        let unmap = Event::UnmapNotify(UnmapNotifyEvent {
            response_type: 18,
            sequence: 0,
            event: 10,
            window: 42,
            from_configure: false,
        });
        assert_eq!(
            translate_event(&unmap, 32),
            Some(DisplayEvent::Unmapped { window: 42 })
        );
    }

    #[test]
    fn focus_moving_into_child_is_ignored() {
        let focus_out = |detail| {
            Event::FocusOut(FocusOutEvent {
                response_type: 10,
                detail,
                sequence: 0,
                event: 10,
                mode: NotifyMode::NORMAL,
            })
        };
        assert_eq!(translate_event(&focus_out(NotifyDetail::INFERIOR), 32), None);
        assert_eq!(
            translate_event(&focus_out(NotifyDetail::NONLINEAR), 32),
            Some(DisplayEvent::FocusLost)
        );
    }
}
