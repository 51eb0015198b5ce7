//! Generic lock runtime.
//!
//! The [`Runtime`] owns every collaborator of a lock session and executes the
//! [`LockAction`]s the [`Session`] state machine returns. Production plugs in
//! the X11 display; simulation plugs in a scripted one and runs the exact
//! same loop.
//!
//! # Release guarantee
//!
//! Surfaces captured by [`Runtime::start`] are released on every exit path:
//! unlock, display failure, or the runtime being dropped mid-session.

use chrono::Local;
use scrlock_core::{
    CaptureManager, CredentialVerifier, Display, LockAction, LockEvent, LockState, RetryPolicy,
    Screen, Session, SurfaceFailure,
};
use tracing::{debug, info, warn};

use crate::{
    error::RuntimeError,
    sink::MessageSink,
    supervisor::{Launcher, SideEffectSupervisor},
};

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Terminal state, `Unlocking` for a successful unlock
    pub state: LockState,
    /// Surfaces released on the way out
    pub released: usize,
    /// Side-effect jobs reaped cleanly
    pub reaped: usize,
    /// Rejected attempts during the session
    pub failed_attempts: u32,
}

/// Drives one lock session over a [`Display`].
pub struct Runtime<D: Display, V, L: Launcher, S> {
    display: D,
    capture: CaptureManager<D::Overlay>,
    session: Session<V>,
    /// Taken by the one reap at the end of the session
    supervisor: Option<SideEffectSupervisor<L>>,
    sink: S,
    failures: Vec<SurfaceFailure>,
    released: usize,
}

impl<D, V, L, S> Runtime<D, V, L, S>
where
    D: Display,
    V: CredentialVerifier,
    L: Launcher,
    S: MessageSink,
{
    /// Capture the surfaces and prepare the session.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Capture`] if no surface could be captured. No event is
    /// read in that case.
    pub fn start(
        mut display: D,
        policy: RetryPolicy,
        session: Session<V>,
        supervisor: SideEffectSupervisor<L>,
        sink: S,
    ) -> Result<Self, RuntimeError> {
        let (capture, failures) = CaptureManager::acquire(&mut display, policy)?;
        info!(captured = capture.len(), total = capture.total(), "screen locked");

        Ok(Self {
            display,
            capture,
            session,
            supervisor: Some(supervisor),
            sink,
            failures,
            released: 0,
        })
    }

    /// Surfaces abandoned during capture.
    pub fn failures(&self) -> &[SurfaceFailure] {
        &self.failures
    }

    /// Surfaces currently held.
    pub fn captured(&self) -> usize {
        self.capture.len()
    }

    /// The session, for inspection.
    pub fn session(&self) -> &Session<V> {
        &self.session
    }

    /// The display, for inspection.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run the event loop until the session is terminal.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Display`] if the display fails while locked. The
    /// session is aborted and every surface released first.
    pub fn run(mut self) -> Result<Outcome, RuntimeError> {
        let screen = self.session.screen();
        if let Err(error) = self.capture.draw_all(&mut self.display, &screen) {
            return Err(self.fail(error));
        }

        while !self.session.state().is_terminal() {
            let event = match self.display.next_event() {
                Ok(event) => event,
                Err(error) => return Err(self.fail(error)),
            };
            let Some(event) = LockEvent::from_display(event) else {
                continue;
            };

            let actions = self.session.handle(event)?;
            for action in actions {
                if let Err(error) = self.execute(action) {
                    return Err(self.fail(error));
                }
            }
        }

        let reaped = self.reap();
        let outcome = Outcome {
            state: self.session.state(),
            released: self.released,
            reaped,
            failed_attempts: self.session.failed_attempts(),
        };
        info!(state = ?outcome.state, failed_attempts = outcome.failed_attempts, "session ended");
        Ok(outcome)
    }

    fn execute(&mut self, action: LockAction) -> Result<(), D::Error> {
        match action {
            LockAction::Render(screen) => self.render(&screen)?,
            LockAction::RaiseOverlays => self.capture.raise_all(&mut self.display)?,
            LockAction::Bell => {
                self.display.bell()?;
                self.display.flush()?;
            },
            LockAction::SpawnSideEffect => {
                if let Some(supervisor) = &mut self.supervisor {
                    supervisor.spawn_on_failure();
                }
            },
            LockAction::SaveMessage { text } => {
                if let Err(error) = self.sink.save(&text, Local::now()) {
                    debug!(%error, "message not saved");
                }
            },
            LockAction::ReleaseSurfaces => {
                self.released += self.capture.release_all(&mut self.display);
            },
        }
        Ok(())
    }

    fn render(&mut self, screen: &Screen) -> Result<(), D::Error> {
        self.capture.draw_all(&mut self.display, screen)
    }

    /// Abort, release and reap after a display failure.
    fn fail(&mut self, error: D::Error) -> RuntimeError {
        warn!(%error, "display failure, releasing surfaces");
        for action in self.session.abort() {
            if matches!(action, LockAction::ReleaseSurfaces) {
                self.released += self.capture.release_all(&mut self.display);
            }
        }
        self.reap();
        RuntimeError::Display(Box::new(error))
    }

    /// Reap outstanding side-effect jobs; later calls find nothing to reap.
    fn reap(&mut self) -> usize {
        self.supervisor.take().map_or(0, SideEffectSupervisor::reap_all)
    }
}

impl<D: Display, V, L: Launcher, S> Drop for Runtime<D, V, L, S> {
    fn drop(&mut self) {
        let released = self.capture.release_all(&mut self.display);
        if released > 0 {
            warn!(released, "runtime dropped while surfaces were held");
        }
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.reap_all();
        }
    }
}

impl<D: Display, V, L: Launcher, S> std::fmt::Debug for Runtime<D, V, L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("captured", &self.capture.len())
            .field("failures", &self.failures)
            .field("released", &self.released)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}
