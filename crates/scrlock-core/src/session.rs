//! Lock-session state machine.
//!
//! # Architecture: Action-Based State Machine
//!
//! - [`Session::handle`] consumes one [`LockEvent`] at a time
//! - It returns the [`LockAction`]s the runtime must execute, in order
//! - The only collaborator called directly is the [`CredentialVerifier`],
//!   which is pure from the session's point of view
//!
//! # State Machine
//!
//! ```text
//!                 ctrl+space (message enabled)
//!   ┌──────────────────┐ ───────────────────> ┌─────────────────┐
//!   │ Locked(Password) │                      │ Locked(Message) │
//!   └──────────────────┘ <─────────────────── └─────────────────┘
//!        │        │        ctrl+space / Enter
//!        │        │
//!        │ Enter, │ display failure
//!        │ match  ↓
//!        │   ┌─────────┐
//!        │   │ Aborted │
//!        ↓   └─────────┘
//!   ┌───────────┐
//!   │ Unlocking │
//!   └───────────┘
//! ```
//!
//! # Redraw rule
//!
//! In password mode a redraw is emitted only when the buffer crosses between
//! empty and non-empty, so typing does not churn every surface. Message mode
//! shows a live countdown and redraws on every successful edit.

use tracing::{debug, info};

use crate::{
    buffer::InputBuffer,
    config::SessionConfig,
    display::{DisplayEvent, Screen},
    error::SessionError,
    key::Key,
    verify::{CredentialVerifier, Verdict},
};

/// Which buffer receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Typing the unlock password
    Password,
    /// Typing a message for the owner
    Message,
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Surfaces captured, waiting for input in the given mode
    Locked(Mode),
    /// Credential accepted, surfaces are being released
    Unlocking,
    /// Session torn down after a failure
    Aborted,
}

impl LockState {
    /// Whether the event loop must stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Unlocking | Self::Aborted)
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    /// Normalized key
    Key(Key),
    /// Non-input notification; overlays must be re-raised
    Notify,
}

impl LockEvent {
    /// Translate a display event. Keys the session ignores yield `None`.
    pub fn from_display(event: DisplayEvent) -> Option<Self> {
        match event {
            DisplayEvent::KeyPress(press) => Key::from_press(&press).map(Self::Key),
            DisplayEvent::Notify => Some(Self::Notify),
        }
    }
}

/// Effects requested by the state machine.
///
/// The runtime executes these in order before waiting for the next event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAction {
    /// Paint this screen on every captured surface
    Render(Screen),
    /// Restack every overlay on top
    RaiseOverlays,
    /// Audible alert
    Bell,
    /// Launch one side-effect helper job
    SpawnSideEffect,
    /// Persist a message with the current time
    SaveMessage {
        /// Message text
        text: String,
    },
    /// Release every captured surface; the session is over
    ReleaseSurfaces,
}

/// Lock session: buffers, mode and verification.
///
/// Created once surfaces are captured, starts in `Locked(Password)`.
pub struct Session<V> {
    state: LockState,
    config: SessionConfig,
    password: InputBuffer,
    message: InputBuffer,
    verifier: V,
    failed_attempts: u32,
}

impl<V: CredentialVerifier> Session<V> {
    /// Create a session in `Locked(Password)`.
    pub fn new(config: SessionConfig, verifier: V) -> Self {
        Self {
            state: LockState::Locked(Mode::Password),
            password: InputBuffer::new(config.password_max_len),
            message: InputBuffer::new(config.message_max_len),
            config,
            verifier,
            failed_attempts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> LockState {
        self.state
    }

    /// Active mode, `None` once terminal.
    pub fn mode(&self) -> Option<Mode> {
        match self.state {
            LockState::Locked(mode) => Some(mode),
            LockState::Unlocking | LockState::Aborted => None,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Rejected attempts so far.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Bytes typed into the password buffer.
    pub fn password_len(&self) -> usize {
        self.password.len()
    }

    /// Bytes typed into the message buffer.
    pub fn message_len(&self) -> usize {
        self.message.len()
    }

    /// Full screen for the current mode.
    ///
    /// Used for the first paint after capture and whenever a mode change
    /// forces a complete redraw.
    pub fn screen(&self) -> Screen {
        match self.state {
            LockState::Locked(Mode::Message) => Screen::Message {
                text: self.message.snapshot().0.iter().map(|&b| char::from(b)).collect(),
                remaining: self.message.remaining(),
            },
            _ => Screen::Password { active: !self.password.is_empty() },
        }
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// [`SessionError::Terminated`] if the session already reached
    /// `Unlocking` or `Aborted`.
    pub fn handle(&mut self, event: LockEvent) -> Result<Vec<LockAction>, SessionError> {
        let LockState::Locked(mode) = self.state else {
            return Err(SessionError::Terminated { state: self.state });
        };

        let actions = match event {
            LockEvent::Notify => vec![LockAction::RaiseOverlays],
            LockEvent::Key(key) => self.handle_key(mode, key),
        };
        Ok(actions)
    }

    /// Tear the session down after an unrecoverable failure.
    ///
    /// Wipes both buffers and asks for the surfaces to be released. Does
    /// nothing once terminal.
    pub fn abort(&mut self) -> Vec<LockAction> {
        if self.state.is_terminal() {
            return Vec::new();
        }
        debug!(from = ?self.state, "session aborted");
        self.state = LockState::Aborted;
        self.password.clear();
        self.message.clear();
        vec![LockAction::ReleaseSurfaces]
    }

    fn handle_key(&mut self, mode: Mode, key: Key) -> Vec<LockAction> {
        match key {
            Key::Printable(text) => self.edit(mode, |buf| buf.append(&text)),
            Key::Backspace => self.edit(mode, InputBuffer::backspace),
            Key::Cancel => self.edit(mode, |buf| {
                let had_input = !buf.is_empty();
                buf.clear();
                had_input
            }),
            Key::ToggleMode => self.toggle(mode),
            Key::Submit => match mode {
                Mode::Password => self.submit_password(),
                Mode::Message => self.submit_message(),
            },
        }
    }

    /// Apply an edit to the active buffer and decide whether to redraw.
    fn edit(&mut self, mode: Mode, op: impl FnOnce(&mut InputBuffer) -> bool) -> Vec<LockAction> {
        let buf = match mode {
            Mode::Password => &mut self.password,
            Mode::Message => &mut self.message,
        };
        let was_empty = buf.is_empty();
        if !op(buf) {
            return Vec::new();
        }

        let redraw = match mode {
            Mode::Password => was_empty != buf.is_empty(),
            Mode::Message => true,
        };
        if redraw { vec![LockAction::Render(self.screen())] } else { Vec::new() }
    }

    fn toggle(&mut self, mode: Mode) -> Vec<LockAction> {
        if !self.config.message_enabled {
            debug!("message mode disabled, ignoring toggle");
            return Vec::new();
        }

        let next = match mode {
            Mode::Password => Mode::Message,
            Mode::Message => {
                // Leaving message mode discards the unsent draft.
                self.message.clear();
                Mode::Password
            },
        };
        debug!(from = ?mode, to = ?next, "mode switched");
        self.state = LockState::Locked(next);
        vec![LockAction::Render(self.screen())]
    }

    fn submit_password(&mut self) -> Vec<LockAction> {
        let verdict = self.verifier.verify(self.password.snapshot().0);
        let had_input = !self.password.is_empty();
        self.password.clear();

        match verdict {
            Verdict::Accepted => {
                info!(failed_attempts = self.failed_attempts, "credential accepted");
                self.message.clear();
                self.state = LockState::Unlocking;
                vec![LockAction::ReleaseSurfaces]
            },
            Verdict::Rejected => {
                self.failed_attempts = self.failed_attempts.saturating_add(1);
                info!(failed_attempts = self.failed_attempts, "credential rejected");

                let mut actions = Vec::with_capacity(3);
                if had_input {
                    actions.push(LockAction::Render(Screen::Password { active: false }));
                }
                actions.push(LockAction::Bell);
                if self.config.side_effect_enabled {
                    actions.push(LockAction::SpawnSideEffect);
                }
                actions
            },
        }
    }

    fn submit_message(&mut self) -> Vec<LockAction> {
        let mut actions = Vec::with_capacity(2);
        if !self.message.is_empty() {
            let text = self.message.snapshot().0.iter().map(|&b| char::from(b)).collect();
            actions.push(LockAction::SaveMessage { text });
        }
        self.message.clear();
        self.state = LockState::Locked(Mode::Password);
        debug!("message submitted, back to password mode");
        actions.push(LockAction::Render(self.screen()));
        actions
    }
}

impl<V> std::fmt::Debug for Session<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("password", &self.password)
            .field("message", &self.message)
            .field("failed_attempts", &self.failed_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts exactly one byte string.
    struct Exact(&'static [u8]);

    impl CredentialVerifier for Exact {
        fn verify(&self, attempt: &[u8]) -> Verdict {
            if attempt == self.0 { Verdict::Accepted } else { Verdict::Rejected }
        }
    }

    fn session() -> Session<Exact> {
        Session::new(SessionConfig::default(), Exact(b"ad"))
    }

    fn key(session: &mut Session<Exact>, key: Key) -> Vec<LockAction> {
        session.handle(LockEvent::Key(key)).unwrap()
    }

    fn typed(session: &mut Session<Exact>, text: &str) -> Vec<LockAction> {
        text.bytes().flat_map(|b| key(session, Key::Printable(vec![b]))).collect()
    }

    #[test]
    fn starts_locked_in_password_mode() {
        let s = session();
        assert_eq!(s.state(), LockState::Locked(Mode::Password));
        assert_eq!(s.screen(), Screen::Password { active: false });
    }

    #[test]
    fn redraw_only_on_empty_boundary() {
        let mut s = session();
        let actions = typed(&mut s, "abc");
        assert_eq!(actions, vec![LockAction::Render(Screen::Password { active: true })]);

        assert!(key(&mut s, Key::Backspace).is_empty());
        assert!(key(&mut s, Key::Backspace).is_empty());
        assert_eq!(
            key(&mut s, Key::Backspace),
            vec![LockAction::Render(Screen::Password { active: false })]
        );
        assert!(key(&mut s, Key::Backspace).is_empty());
    }

    #[test]
    fn cancel_clears_active_buffer() {
        let mut s = session();
        typed(&mut s, "xyz");
        assert_eq!(
            key(&mut s, Key::Cancel),
            vec![LockAction::Render(Screen::Password { active: false })]
        );
        assert_eq!(s.password_len(), 0);
        assert!(key(&mut s, Key::Cancel).is_empty());
    }

    #[test]
    fn accepted_attempt_unlocks() {
        let mut s = session();
        typed(&mut s, "abc");
        key(&mut s, Key::Backspace);
        key(&mut s, Key::Backspace);
        typed(&mut s, "d");

        assert_eq!(key(&mut s, Key::Submit), vec![LockAction::ReleaseSurfaces]);
        assert_eq!(s.state(), LockState::Unlocking);
        assert!(s.state().is_terminal());
    }

    #[test]
    fn rejected_attempt_clears_and_alerts() {
        let mut s = session();
        typed(&mut s, "nope");

        assert_eq!(
            key(&mut s, Key::Submit),
            vec![
                LockAction::Render(Screen::Password { active: false }),
                LockAction::Bell,
                LockAction::SpawnSideEffect,
            ]
        );
        assert_eq!(s.state(), LockState::Locked(Mode::Password));
        assert_eq!(s.password_len(), 0);
        assert_eq!(s.failed_attempts(), 1);
    }

    #[test]
    fn rejected_empty_attempt_skips_redraw() {
        let config = SessionConfig { side_effect_enabled: false, ..Default::default() };
        let mut s = Session::new(config, Exact(b"ad"));
        assert_eq!(key(&mut s, Key::Submit), vec![LockAction::Bell]);
    }

    #[test]
    fn events_after_unlock_are_refused() {
        let mut s = session();
        typed(&mut s, "ad");
        key(&mut s, Key::Submit);

        let err = s.handle(LockEvent::Notify).unwrap_err();
        assert_eq!(err, SessionError::Terminated { state: LockState::Unlocking });
        assert!(s.abort().is_empty());
    }

    #[test]
    fn notify_reraises_without_touching_buffers() {
        let mut s = session();
        typed(&mut s, "a");
        assert_eq!(s.handle(LockEvent::Notify).unwrap(), vec![LockAction::RaiseOverlays]);
        assert_eq!(s.password_len(), 1);
    }

    #[test]
    fn toggle_preserves_password_draft() {
        let mut s = session();
        typed(&mut s, "a");

        assert_eq!(
            key(&mut s, Key::ToggleMode),
            vec![LockAction::Render(Screen::Message { text: String::new(), remaining: 50 })]
        );
        typed(&mut s, "hi");
        assert_eq!(
            key(&mut s, Key::ToggleMode),
            vec![LockAction::Render(Screen::Password { active: true })]
        );
        assert_eq!(s.message_len(), 0);

        typed(&mut s, "d");
        assert_eq!(key(&mut s, Key::Submit), vec![LockAction::ReleaseSurfaces]);
    }

    #[test]
    fn toggle_ignored_when_message_disabled() {
        let config = SessionConfig { message_enabled: false, ..Default::default() };
        let mut s = Session::new(config, Exact(b"ad"));
        assert!(key(&mut s, Key::ToggleMode).is_empty());
        assert_eq!(s.mode(), Some(Mode::Password));
    }

    #[test]
    fn message_mode_counts_down_on_every_edit() {
        let config = SessionConfig { message_max_len: 3, ..Default::default() };
        let mut s = Session::new(config, Exact(b"ad"));
        key(&mut s, Key::ToggleMode);

        assert_eq!(
            typed(&mut s, "abcd"),
            vec![
                LockAction::Render(Screen::Message { text: "a".into(), remaining: 2 }),
                LockAction::Render(Screen::Message { text: "ab".into(), remaining: 1 }),
                LockAction::Render(Screen::Message { text: "abc".into(), remaining: 0 }),
            ]
        );
        assert_eq!(
            key(&mut s, Key::Backspace),
            vec![LockAction::Render(Screen::Message { text: "ab".into(), remaining: 1 })]
        );
    }

    #[test]
    fn message_submit_saves_and_returns_to_password() {
        let mut s = session();
        typed(&mut s, "x");
        key(&mut s, Key::ToggleMode);
        typed(&mut s, "call me");

        assert_eq!(
            key(&mut s, Key::Submit),
            vec![
                LockAction::SaveMessage { text: "call me".into() },
                LockAction::Render(Screen::Password { active: true }),
            ]
        );
        assert_eq!(s.mode(), Some(Mode::Password));
        assert_eq!(s.message_len(), 0);
        assert_eq!(s.password_len(), 1);
    }

    #[test]
    fn empty_message_is_not_saved() {
        let mut s = session();
        key(&mut s, Key::ToggleMode);
        assert_eq!(
            key(&mut s, Key::Submit),
            vec![LockAction::Render(Screen::Password { active: false })]
        );
    }

    #[test]
    fn failure_count_saturates() {
        let mut s = session();
        s.failed_attempts = u32::MAX;
        typed(&mut s, "x");
        key(&mut s, Key::Submit);
        assert_eq!(s.failed_attempts(), u32::MAX);
        assert_eq!(s.state(), LockState::Locked(Mode::Password));
    }

    #[test]
    fn abort_releases_once() {
        let mut s = session();
        typed(&mut s, "abc");
        assert_eq!(s.abort(), vec![LockAction::ReleaseSurfaces]);
        assert_eq!(s.state(), LockState::Aborted);
        assert_eq!(s.password_len(), 0);
        assert!(s.abort().is_empty());
    }

    #[test]
    fn display_events_translate() {
        use crate::key::{KeyPress, keysym};

        assert_eq!(LockEvent::from_display(DisplayEvent::Notify), Some(LockEvent::Notify));
        assert_eq!(
            LockEvent::from_display(DisplayEvent::KeyPress(KeyPress::plain(keysym::KP_ENTER))),
            Some(LockEvent::Key(Key::Submit))
        );
        assert_eq!(
            LockEvent::from_display(DisplayEvent::KeyPress(KeyPress::plain(keysym::SHIFT_L))),
            None
        );
    }
}
