//! X11 implementation of [`scrlock_core::Display`].
//!
//! Each X screen is one surface. Its overlay is an override-redirect window
//! covering the whole root, with an invisible cursor and the two configured
//! background colors allocated in the screen's default colormap.

use scrlock_app::Appearance;
use scrlock_core::{Display, DisplayEvent, KeyPress, Screen};
use thiserror::Error;
use tracing::{debug, warn};
use x11rb::{
    COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME, NONE,
    connection::Connection,
    errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError},
    protocol::{
        Event,
        xproto::{
            ChangeGCAux, ChangeWindowAttributesAux, Char2b, Colormap, ConfigureWindowAux,
            ConnectionExt as _, CreateGCAux, CreateWindowAux, Cursor, EventMask, Font, Gcontext,
            GrabMode, GrabStatus, KeyPressEvent, Rectangle, StackMode, Window, WindowClass,
        },
    },
    rust_connection::RustConnection,
};

use crate::{
    color::ColorSpec,
    keymap::{CONTROL_MASK, Keymap},
};

/// Font used when the configured one is not available.
const FALLBACK_FONT: &str = "fixed";

/// Core text requests carry at most 255 bytes.
const MAX_TEXT: usize = 255;

/// X11 errors.
#[derive(Debug, Error)]
pub enum X11Error {
    /// Could not connect to the X server
    #[error("cannot open display: {0}")]
    Connect(#[from] ConnectError),

    /// The connection broke
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A request failed
    #[error(transparent)]
    Reply(#[from] ReplyError),

    /// A request or id allocation failed
    #[error(transparent)]
    ReplyOrId(#[from] ReplyOrIdError),

    /// Neither the configured font nor the fallback could be opened
    #[error("cannot open font {0:?}")]
    Font(String),

    /// A color setting is not a name or `#rrggbb`
    #[error("invalid color {0:?}")]
    Color(String),

    /// Surface index out of range
    #[error("no screen {0}")]
    NoSuchScreen(usize),
}

/// Resources of one locked screen.
#[derive(Debug)]
pub struct X11Overlay {
    window: Window,
    gc: Gcontext,
    cursor: Cursor,
    colormap: Colormap,
    idle: u32,
    active: u32,
    width: u16,
    height: u16,
}

/// Connection to the X server plus everything shared between screens.
pub struct X11Display {
    conn: RustConnection,
    font: Font,
    keymap: Keymap,
    idle: ColorSpec,
    active: ColorSpec,
    hint: Option<Vec<u8>>,
}

impl X11Display {
    /// Connect to `$DISPLAY` and prepare the font and keyboard mapping.
    ///
    /// `hint` is shown on idle password screens.
    pub fn connect(appearance: &Appearance, hint: Option<&str>) -> Result<Self, X11Error> {
        let idle = ColorSpec::parse(&appearance.idle_color)
            .ok_or_else(|| X11Error::Color(appearance.idle_color.clone()))?;
        let active = ColorSpec::parse(&appearance.active_color)
            .ok_or_else(|| X11Error::Color(appearance.active_color.clone()))?;

        let (conn, _) = RustConnection::connect(None)?;
        let font = open_font(&conn, &appearance.font)?;

        let mut display = Self {
            conn,
            font,
            keymap: Keymap::default(),
            idle,
            active,
            hint: hint.map(latin1),
        };
        display.refresh_keymap()?;
        Ok(display)
    }

    fn refresh_keymap(&mut self) -> Result<(), X11Error> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let mapping = self.conn.get_keyboard_mapping(min, max - min + 1)?.reply()?;
        let modifiers = self.conn.get_modifier_mapping()?.reply()?;

        let mut keymap = Keymap::new(min, mapping.keysyms_per_keycode, mapping.keysyms, 0);
        let mask = keymap.num_lock_mask(&modifiers.keycodes);
        keymap.set_num_lock_mask(mask);
        self.keymap = keymap;
        debug!(num_lock_mask = mask, "keyboard mapping loaded");
        Ok(())
    }

    fn alloc(&self, colormap: Colormap, spec: &ColorSpec) -> Result<u32, X11Error> {
        let pixel = match spec {
            ColorSpec::Rgb(r, g, b) => self.conn.alloc_color(colormap, *r, *g, *b)?.reply()?.pixel,
            ColorSpec::Named(name) => {
                self.conn.alloc_named_color(colormap, name.as_bytes())?.reply()?.pixel
            },
        };
        Ok(pixel)
    }

    /// 1x1 cursor whose mask is empty.
    fn invisible_cursor(&self, window: Window) -> Result<Cursor, X11Error> {
        let pixmap = self.conn.generate_id()?;
        self.conn.create_pixmap(1, pixmap, window, 1, 1)?;

        let gc = self.conn.generate_id()?;
        self.conn.create_gc(gc, pixmap, &CreateGCAux::new().foreground(0))?;
        self.conn.poly_fill_rectangle(pixmap, gc, &[Rectangle { x: 0, y: 0, width: 1, height: 1 }])?;
        self.conn.free_gc(gc)?;

        let cursor = self.conn.generate_id()?;
        self.conn.create_cursor(cursor, pixmap, pixmap, 0, 0, 0, 0, 0, 0, 0, 0)?;
        self.conn.free_pixmap(pixmap)?;
        Ok(cursor)
    }

    fn text_width(&self, text: &[u8]) -> Result<i32, X11Error> {
        let chars: Vec<Char2b> = text.iter().map(|&byte2| Char2b { byte1: 0, byte2 }).collect();
        Ok(self.conn.query_text_extents(self.font, &chars)?.reply()?.overall_width)
    }

    /// Draw `lines` centered on the overlay, one below the other.
    fn draw_lines(&self, overlay: &X11Overlay, lines: &[&[u8]]) -> Result<(), X11Error> {
        let line_height = 30;
        let total = i32::try_from(lines.len()).unwrap_or(0) * line_height;
        let mut y = (i32::from(overlay.height) - total) / 2 + line_height;

        for line in lines {
            let line = &line[..line.len().min(MAX_TEXT)];
            let x = (i32::from(overlay.width) - self.text_width(line)?) / 2;
            self.conn.image_text8(overlay.window, overlay.gc, clamp(x), clamp(y), line)?;
            y += line_height;
        }
        Ok(())
    }

    /// Create, map and raise the window for `overlay`.
    ///
    /// Each resource id is stored as soon as the server accepted it, so a
    /// failure part way leaves `overlay` describing exactly what to free.
    fn build_overlay(
        &self,
        overlay: &mut X11Overlay,
        root: Window,
        white: u32,
    ) -> Result<(), X11Error> {
        let window = self.conn.generate_id()?;
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            overlay.width,
            overlay.height,
            0,
            WindowClass::COPY_FROM_PARENT,
            COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .override_redirect(1)
                .background_pixel(overlay.idle)
                .event_mask(EventMask::KEY_PRESS | EventMask::VISIBILITY_CHANGE),
        )?;
        overlay.window = window;

        overlay.cursor = self.invisible_cursor(window)?;
        let cursor = ChangeWindowAttributesAux::new().cursor(overlay.cursor);
        self.conn.change_window_attributes(window, &cursor)?;

        let gc = self.conn.generate_id()?;
        self.conn.create_gc(
            gc,
            window,
            &CreateGCAux::new().foreground(white).background(overlay.idle).font(self.font),
        )?;
        overlay.gc = gc;

        // Other windows mapping or restacking must be seen to raise again.
        self.conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::SUBSTRUCTURE_NOTIFY),
        )?;

        self.conn.map_window(window)?;
        self.conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(())
    }

    fn key_press(&self, event: &KeyPressEvent) -> KeyPress {
        let state = u16::from(event.state);
        let press = KeyPress::plain(self.keymap.lookup(event.detail, state));
        if state & CONTROL_MASK != 0 { press.with_ctrl() } else { press }
    }
}

impl Display for X11Display {
    type Error = X11Error;
    type Overlay = X11Overlay;

    fn surface_count(&self) -> usize {
        self.conn.setup().roots.len()
    }

    fn create_overlay(&mut self, surface: usize) -> Result<X11Overlay, X11Error> {
        let screen = self.conn.setup().roots.get(surface).ok_or(X11Error::NoSuchScreen(surface))?;
        let (root, colormap, white) = (screen.root, screen.default_colormap, screen.white_pixel);
        let (width, height) = (screen.width_in_pixels, screen.height_in_pixels);

        let idle = self.alloc(colormap, &self.idle)?;
        let active = match self.alloc(colormap, &self.active) {
            Ok(pixel) => pixel,
            Err(error) => {
                self.conn.free_colors(colormap, 0, &[idle])?;
                return Err(error);
            },
        };

        let mut overlay = X11Overlay {
            window: NONE,
            gc: NONE,
            cursor: NONE,
            colormap,
            idle,
            active,
            width,
            height,
        };
        if let Err(error) = self.build_overlay(&mut overlay, root, white) {
            if let Err(cleanup) = free_overlay(&self.conn, &overlay) {
                warn!(%cleanup, "failed to clean up partial overlay");
            }
            return Err(error);
        }
        Ok(overlay)
    }

    fn destroy_overlay(&mut self, overlay: X11Overlay) {
        if let Err(error) = free_overlay(&self.conn, &overlay) {
            warn!(%error, window = overlay.window, "failed to destroy overlay");
        }
    }

    fn grab_pointer(&mut self, overlay: &X11Overlay) -> Result<bool, X11Error> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                overlay.window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                overlay.cursor,
                CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn grab_keyboard(&mut self, overlay: &X11Overlay) -> Result<bool, X11Error> {
        let reply = self
            .conn
            .grab_keyboard(true, overlay.window, CURRENT_TIME, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab(&mut self) {
        let result = self
            .conn
            .ungrab_pointer(CURRENT_TIME)
            .and_then(|_| self.conn.ungrab_keyboard(CURRENT_TIME));
        if let Err(error) = result {
            warn!(%error, "failed to ungrab");
        }
    }

    fn raise(&mut self, overlay: &X11Overlay) -> Result<(), X11Error> {
        self.conn.configure_window(
            overlay.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn draw(&mut self, overlay: &X11Overlay, screen: &Screen) -> Result<(), X11Error> {
        let pixel = match screen {
            Screen::Password { active: false } => overlay.idle,
            Screen::Password { active: true } | Screen::Message { .. } => overlay.active,
        };
        self.conn.change_window_attributes(
            overlay.window,
            &ChangeWindowAttributesAux::new().background_pixel(pixel),
        )?;
        self.conn.change_gc(overlay.gc, &ChangeGCAux::new().background(pixel))?;
        self.conn.clear_area(false, overlay.window, 0, 0, 0, 0)?;

        match screen {
            Screen::Password { active: false } => {
                if let Some(hint) = &self.hint {
                    self.draw_lines(overlay, &[hint.as_slice()])?;
                }
            },
            Screen::Password { active: true } => {},
            Screen::Message { text, remaining } => {
                let countdown = format!("{remaining} characters left, Esc to clear");
                let text = latin1(text);
                self.draw_lines(overlay, &[text.as_slice(), countdown.as_bytes()])?;
            },
        }
        Ok(())
    }

    fn bell(&mut self) -> Result<(), X11Error> {
        self.conn.bell(0)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), X11Error> {
        self.conn.flush()?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<DisplayEvent, X11Error> {
        loop {
            match self.conn.wait_for_event()? {
                Event::KeyPress(event) => return Ok(DisplayEvent::KeyPress(self.key_press(&event))),
                Event::MappingNotify(_) => {
                    self.refresh_keymap()?;
                    return Ok(DisplayEvent::Notify);
                },
                Event::Error(error) => warn!(?error, "X11 error event"),
                Event::KeyRelease(_) => {},
                _ => return Ok(DisplayEvent::Notify),
            }
        }
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        if self.conn.close_font(self.font).and_then(|_| self.conn.flush()).is_err() {
            debug!("connection already closed");
        }
    }
}

impl std::fmt::Debug for X11Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X11Display").field("font", &self.font).finish_non_exhaustive()
    }
}

/// Free whatever `overlay` holds; ids still at `NONE` were never created.
fn free_overlay(conn: &RustConnection, overlay: &X11Overlay) -> Result<(), ConnectionError> {
    conn.free_colors(overlay.colormap, 0, &[overlay.idle, overlay.active])?;
    if overlay.cursor != NONE {
        conn.free_cursor(overlay.cursor)?;
    }
    if overlay.gc != NONE {
        conn.free_gc(overlay.gc)?;
    }
    if overlay.window != NONE {
        conn.destroy_window(overlay.window)?;
    }
    Ok(())
}

/// Open `name`, falling back to [`FALLBACK_FONT`].
fn open_font(conn: &RustConnection, name: &str) -> Result<Font, X11Error> {
    for candidate in [name, FALLBACK_FONT] {
        let font = conn.generate_id()?;
        match conn.open_font(font, candidate.as_bytes())?.check() {
            Ok(()) => return Ok(font),
            Err(error) => warn!(font = candidate, %error, "cannot open font"),
        }
    }
    Err(X11Error::Font(name.to_owned()))
}

/// Encode text for an ISO-8859-1 core font; unrepresentable chars become `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect()
}

fn clamp(value: i32) -> i16 {
    i16::try_from(value.clamp(i32::from(i16::MIN), i32::from(i16::MAX))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_keeps_single_byte_chars() {
        assert_eq!(latin1("caf\u{e9}"), b"caf\xe9");
        assert_eq!(latin1("\u{20ac}5"), b"?5");
    }

    #[test]
    fn clamp_saturates() {
        assert_eq!(clamp(-100_000), i16::MIN);
        assert_eq!(clamp(100_000), i16::MAX);
        assert_eq!(clamp(12), 12);
    }
}
