//! Scripted in-memory display.
//!
//! Every call the runtime makes is recorded in a shared [`SimRecord`] so tests
//! can inspect it after the runtime (and the display it owns) is gone.

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use scrlock_core::{Display, DisplayEvent, KeyPress, Screen, key::keysym};
use thiserror::Error;

/// Faults injected into one surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceScript {
    /// Pointer grabs refused before one succeeds
    pub pointer_refusals: u32,
    /// Keyboard grabs refused before one succeeds
    pub keyboard_refusals: u32,
    /// Overlay creation fails outright
    pub broken_overlay: bool,
}

impl SurfaceScript {
    /// Pointer held by another client for good.
    pub fn pointer_refused() -> Self {
        Self { pointer_refusals: u32::MAX, ..Self::default() }
    }

    /// Keyboard held by another client for good.
    pub fn keyboard_refused() -> Self {
        Self { keyboard_refusals: u32::MAX, ..Self::default() }
    }

    /// Pointer held for the first `n` attempts.
    pub fn pointer_busy(n: u32) -> Self {
        Self { pointer_refusals: n, ..Self::default() }
    }

    /// Overlay cannot be created.
    pub fn broken() -> Self {
        Self { broken_overlay: true, ..Self::default() }
    }
}

/// Simulated display errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// The event script ran out
    #[error("event script exhausted")]
    ScriptExhausted,

    /// A scripted failure
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Overlay on one simulated surface.
#[derive(Debug, PartialEq, Eq)]
pub struct SimOverlay {
    surface: usize,
}

impl SimOverlay {
    /// Surface index.
    pub fn surface(&self) -> usize {
        self.surface
    }
}

/// Everything the display was asked to do.
#[derive(Debug, Clone, Default)]
pub struct SimRecord {
    /// Overlays created, by surface
    pub created: Vec<usize>,
    /// Overlays destroyed, by surface
    pub destroyed: Vec<usize>,
    /// Ungrab calls
    pub ungrabs: usize,
    /// Overlay the client's pointer grab currently lives on
    pub pointer_grab: Option<usize>,
    /// Overlay the client's keyboard grab currently lives on
    pub keyboard_grab: Option<usize>,
    /// Screens painted, by surface
    pub draws: Vec<(usize, Screen)>,
    /// Raise calls, by surface
    pub raises: Vec<usize>,
    /// Pointer grab attempts, by surface
    pub pointer_attempts: Vec<u32>,
    /// Keyboard grab attempts, by surface
    pub keyboard_attempts: Vec<u32>,
    /// Bells rung
    pub bells: usize,
    /// Waits between grab attempts
    pub waits: usize,
    /// Flushes
    pub flushes: usize,
    /// Calls to `next_event`
    pub events_read: usize,
    /// [`Self::grab_holder`] at each `next_event` call
    pub holders_while_reading: Vec<Option<usize>>,
}

impl SimRecord {
    /// Screens painted on `surface`, in order.
    pub fn draws_on(&self, surface: usize) -> Vec<&Screen> {
        self.draws.iter().filter(|(s, _)| *s == surface).map(|(_, screen)| screen).collect()
    }

    /// Whether `surface`'s overlay was destroyed exactly once.
    pub fn released_once(&self, surface: usize) -> bool {
        self.destroyed.iter().filter(|&&s| s == surface).count() == 1
    }

    /// Surface whose overlay holds both grabs, if any.
    pub fn grab_holder(&self) -> Option<usize> {
        self.pointer_grab.filter(|s| self.keyboard_grab == Some(*s))
    }

    /// Whether the client holds any grab at all.
    pub fn grabbing(&self) -> bool {
        self.pointer_grab.is_some() || self.keyboard_grab.is_some()
    }
}

/// In-memory [`Display`] driven by a script.
#[derive(Debug)]
pub struct SimDisplay {
    surfaces: Vec<SurfaceScript>,
    events: VecDeque<Result<DisplayEvent, SimError>>,
    record: Rc<RefCell<SimRecord>>,
}

impl SimDisplay {
    /// Display with `surfaces` healthy surfaces and no events.
    pub fn new(surfaces: usize) -> Self {
        let record = SimRecord {
            pointer_attempts: vec![0; surfaces],
            keyboard_attempts: vec![0; surfaces],
            ..SimRecord::default()
        };
        Self {
            surfaces: vec![SurfaceScript::default(); surfaces],
            events: VecDeque::new(),
            record: Rc::new(RefCell::new(record)),
        }
    }

    /// Inject faults into `surface`.
    #[must_use]
    pub fn with_surface(mut self, surface: usize, script: SurfaceScript) -> Self {
        if let Some(slot) = self.surfaces.get_mut(surface) {
            *slot = script;
        }
        self
    }

    /// Shared handle on the call record.
    pub fn record(&self) -> Rc<RefCell<SimRecord>> {
        Rc::clone(&self.record)
    }

    /// Queue one event.
    pub fn push_event(&mut self, event: DisplayEvent) {
        self.events.push_back(Ok(event));
    }

    /// Queue one key press.
    pub fn push_key(&mut self, press: KeyPress) {
        self.push_event(DisplayEvent::KeyPress(press));
    }

    /// Queue one key press per byte of `text`.
    pub fn type_text(&mut self, text: &str) {
        for byte in text.bytes() {
            self.push_key(KeyPress::plain(u32::from(byte)));
        }
    }

    /// Queue Return.
    pub fn press_enter(&mut self) {
        self.push_key(KeyPress::plain(keysym::RETURN));
    }

    /// Queue a display failure.
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.events.push_back(Err(SimError::Injected(reason.into())));
    }

    fn attempt(&mut self, overlay: &SimOverlay, keyboard: bool) -> bool {
        let surface = overlay.surface;
        let script = self.surfaces.get(surface).copied().unwrap_or_default();
        let mut record = self.record.borrow_mut();
        let (attempts, refusals) = if keyboard {
            (&mut record.keyboard_attempts, script.keyboard_refusals)
        } else {
            (&mut record.pointer_attempts, script.pointer_refusals)
        };
        let Some(count) = attempts.get_mut(surface) else {
            return false;
        };
        *count += 1;
        let granted = *count > refusals;
        if granted {
            // One grab per client: a new grab moves it to this overlay.
            let grab = if keyboard { &mut record.keyboard_grab } else { &mut record.pointer_grab };
            *grab = Some(surface);
        }
        granted
    }
}

impl Display for SimDisplay {
    type Error = SimError;
    type Overlay = SimOverlay;

    fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    fn create_overlay(&mut self, surface: usize) -> Result<SimOverlay, SimError> {
        let script = self
            .surfaces
            .get(surface)
            .ok_or_else(|| SimError::Injected(format!("no surface {surface}")))?;
        if script.broken_overlay {
            return Err(SimError::Injected(format!("overlay {surface} broken")));
        }
        self.record.borrow_mut().created.push(surface);
        Ok(SimOverlay { surface })
    }

    fn destroy_overlay(&mut self, overlay: SimOverlay) {
        let mut record = self.record.borrow_mut();
        record.destroyed.push(overlay.surface);
        // Grabs on an unmapped window are released by the server.
        if record.pointer_grab == Some(overlay.surface) {
            record.pointer_grab = None;
        }
        if record.keyboard_grab == Some(overlay.surface) {
            record.keyboard_grab = None;
        }
    }

    fn grab_pointer(&mut self, overlay: &SimOverlay) -> Result<bool, SimError> {
        Ok(self.attempt(overlay, false))
    }

    fn grab_keyboard(&mut self, overlay: &SimOverlay) -> Result<bool, SimError> {
        Ok(self.attempt(overlay, true))
    }

    fn ungrab(&mut self) {
        let mut record = self.record.borrow_mut();
        record.ungrabs += 1;
        record.pointer_grab = None;
        record.keyboard_grab = None;
    }

    fn raise(&mut self, overlay: &SimOverlay) -> Result<(), SimError> {
        self.record.borrow_mut().raises.push(overlay.surface);
        Ok(())
    }

    fn draw(&mut self, overlay: &SimOverlay, screen: &Screen) -> Result<(), SimError> {
        self.record.borrow_mut().draws.push((overlay.surface, screen.clone()));
        Ok(())
    }

    fn bell(&mut self) -> Result<(), SimError> {
        self.record.borrow_mut().bells += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        self.record.borrow_mut().flushes += 1;
        Ok(())
    }

    fn next_event(&mut self) -> Result<DisplayEvent, SimError> {
        let mut record = self.record.borrow_mut();
        record.events_read += 1;
        let holder = record.grab_holder();
        record.holders_while_reading.push(holder);
        drop(record);
        self.events.pop_front().unwrap_or(Err(SimError::ScriptExhausted))
    }

    fn wait(&mut self, _delay: Duration) {
        self.record.borrow_mut().waits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_busy_then_granted() {
        let mut display = SimDisplay::new(1).with_surface(0, SurfaceScript::pointer_busy(2));
        let overlay = display.create_overlay(0).unwrap();
        assert!(!display.grab_pointer(&overlay).unwrap());
        assert!(!display.grab_pointer(&overlay).unwrap());
        assert!(display.grab_pointer(&overlay).unwrap());
        assert_eq!(display.record().borrow().pointer_attempts, vec![3]);
    }

    #[test]
    fn grabs_are_client_wide() {
        let mut display = SimDisplay::new(2);
        let first = display.create_overlay(0).unwrap();
        let second = display.create_overlay(1).unwrap();
        assert!(display.grab_pointer(&first).unwrap());
        assert!(display.grab_keyboard(&first).unwrap());
        assert_eq!(display.record().borrow().grab_holder(), Some(0));

        // Grabbing through another overlay moves the grab.
        assert!(display.grab_pointer(&second).unwrap());
        assert_eq!(display.record().borrow().grab_holder(), None);
        assert_eq!(display.record().borrow().pointer_grab, Some(1));

        // Destroying that overlay drops the pointer grab with it.
        display.destroy_overlay(second);
        assert_eq!(display.record().borrow().pointer_grab, None);
        assert_eq!(display.record().borrow().keyboard_grab, Some(0));

        display.ungrab();
        assert!(!display.record().borrow().grabbing());
    }

    #[test]
    fn exhausted_script_is_an_error() {
        let mut display = SimDisplay::new(1);
        display.type_text("a");
        assert!(matches!(display.next_event(), Ok(DisplayEvent::KeyPress(_))));
        assert_eq!(display.next_event(), Err(SimError::ScriptExhausted));
        assert_eq!(display.record().borrow().events_read, 2);
    }
}
