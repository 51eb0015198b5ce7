//! Windowing collaborator abstraction.
//!
//! The core never speaks a windowing protocol. Everything it needs from the
//! display server (surface enumeration, overlays, grabs, drawing, events) goes
//! through [`Display`]. Production uses the X11 implementation, tests use the
//! simulated display from the harness.

use std::time::Duration;

use crate::key::KeyPress;

/// Visual state broadcast to every captured surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Password entry. `active` is true once something has been typed.
    Password {
        /// Password buffer non-empty
        active: bool,
    },
    /// Message entry with a live countdown.
    Message {
        /// Text typed so far
        text: String,
        /// Characters that can still be typed
        remaining: usize,
    },
}

/// One event from the display server's blocking event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// A key was pressed on a captured surface.
    KeyPress(KeyPress),
    /// Any non-input notification (expose, visibility, configure, ...).
    Notify,
}

/// Operations the lock session requires from the windowing system.
///
/// Surfaces are addressed by index in `0..surface_count()`. Resources created
/// for a surface (window, colors, cursor) are bundled in an [`Self::Overlay`]
/// value that only [`crate::CaptureManager`] holds.
pub trait Display {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Per-surface resources: full-area window, allocated colors, cursor.
    type Overlay;

    /// Number of physical surfaces.
    fn surface_count(&self) -> usize;

    /// Create and raise an opaque, full-area overlay with an invisible cursor.
    fn create_overlay(&mut self, surface: usize) -> Result<Self::Overlay, Self::Error>;

    /// Destroy an overlay and free its colors.
    fn destroy_overlay(&mut self, overlay: Self::Overlay);

    /// Try once to grab the pointer. `Ok(false)` means another client holds it.
    fn grab_pointer(&mut self, overlay: &Self::Overlay) -> Result<bool, Self::Error>;

    /// Try once to grab the keyboard. `Ok(false)` means another client holds it.
    fn grab_keyboard(&mut self, overlay: &Self::Overlay) -> Result<bool, Self::Error>;

    /// Release the pointer and keyboard grabs.
    ///
    /// Grabs belong to the client, not to an overlay: grabbing through a
    /// second overlay moves the grab there, and destroying the overlay a grab
    /// lives on drops it.
    fn ungrab(&mut self);

    /// Restack the overlay above every other window.
    fn raise(&mut self, overlay: &Self::Overlay) -> Result<(), Self::Error>;

    /// Paint `screen` onto the overlay.
    fn draw(&mut self, overlay: &Self::Overlay, screen: &Screen) -> Result<(), Self::Error>;

    /// Ring the bell.
    fn bell(&mut self) -> Result<(), Self::Error>;

    /// Push buffered requests to the server.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Block until the next event.
    fn next_event(&mut self) -> Result<DisplayEvent, Self::Error>;

    /// Pause between grab attempts.
    fn wait(&mut self, delay: Duration) {
        std::thread::sleep(delay);
    }
}
