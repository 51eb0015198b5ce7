//! Scenario builder API.
//!
//! Provides a declarative API for constructing scenario tests that enforce
//! the Oracle Pattern.

use scrlock_app::{Runtime, RuntimeError, SideEffectSupervisor};
use scrlock_core::{DisplayEvent, KeyPress, RetryPolicy, Session, SessionConfig, key::keysym};

use crate::{
    fakes::{AcceptOnly, CountingLauncher, MemorySink},
    scenario::{OracleFn, World},
    sim_display::{SimDisplay, SurfaceScript},
};

enum Step {
    Event(DisplayEvent),
    Failure(String),
}

/// Scenario builder.
///
/// Describe surfaces, faults and the key script, then call `.oracle()` to get
/// a [`RunnableScenario`].
pub struct Scenario {
    name: String,
    surfaces: usize,
    faults: Vec<(usize, SurfaceScript)>,
    config: SessionConfig,
    policy: RetryPolicy,
    password: Vec<u8>,
    script: Vec<Step>,
    helper_fails: bool,
    sink_fails: bool,
}

impl Scenario {
    /// One healthy surface, default settings, password `secret`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surfaces: 1,
            faults: Vec::new(),
            config: SessionConfig::default(),
            policy: RetryPolicy::default(),
            password: b"secret".to_vec(),
            script: Vec::new(),
            helper_fails: false,
            sink_fails: false,
        }
    }

    /// Number of physical surfaces.
    pub fn surfaces(mut self, count: usize) -> Self {
        self.surfaces = count;
        self
    }

    /// Inject faults into one surface.
    pub fn fault(mut self, surface: usize, script: SurfaceScript) -> Self {
        self.faults.push((surface, script));
        self
    }

    /// Session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Grab retry policy.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The only password the verifier accepts.
    pub fn password(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.password = password.into();
        self
    }

    /// One key press.
    pub fn key(mut self, press: KeyPress) -> Self {
        self.script.push(Step::Event(DisplayEvent::KeyPress(press)));
        self
    }

    /// One key press per byte of `text`.
    pub fn type_text(self, text: &str) -> Self {
        text.bytes().fold(self, |s, b| s.key(KeyPress::plain(u32::from(b))))
    }

    /// Return.
    pub fn enter(self) -> Self {
        self.key(KeyPress::plain(keysym::RETURN))
    }

    /// BackSpace.
    pub fn backspace(self) -> Self {
        self.key(KeyPress::plain(keysym::BACKSPACE))
    }

    /// Escape.
    pub fn escape(self) -> Self {
        self.key(KeyPress::plain(keysym::ESCAPE))
    }

    /// Ctrl+space.
    pub fn ctrl_space(self) -> Self {
        self.key(KeyPress::plain(keysym::SPACE).with_ctrl())
    }

    /// A non-input notification.
    pub fn notify(mut self) -> Self {
        self.script.push(Step::Event(DisplayEvent::Notify));
        self
    }

    /// The display fails at this point of the script.
    pub fn display_failure(mut self, reason: impl Into<String>) -> Self {
        self.script.push(Step::Failure(reason.into()));
        self
    }

    /// Every helper launch fails.
    pub fn helper_fails(mut self) -> Self {
        self.helper_fails = true;
        self
    }

    /// Every message write fails.
    pub fn sink_fails(mut self) -> Self {
        self.sink_fails = true;
        self
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the scenario.
    ///
    /// Capture runs against the simulated display, then the production
    /// runtime consumes the key script. A script that ends before the session
    /// is terminal surfaces as a display failure. The oracle then checks the
    /// resulting [`World`].
    pub fn run(self) -> Result<(), String> {
        let Scenario {
            name,
            surfaces,
            faults,
            config,
            policy,
            password,
            script,
            helper_fails,
            sink_fails,
        } = self.scenario;

        let mut display = faults
            .into_iter()
            .fold(SimDisplay::new(surfaces), |d, (surface, s)| d.with_surface(surface, s));
        for step in script {
            match step {
                Step::Event(event) => display.push_event(event),
                Step::Failure(reason) => display.push_failure(reason),
            }
        }
        let record = display.record();

        let verifier = AcceptOnly::new(password);
        let checked = verifier.checked();
        let launcher = if helper_fails { CountingLauncher::failing() } else { CountingLauncher::new() };
        let (launched, reaped) = (launcher.launched(), launcher.reaped());
        let sink = if sink_fails { MemorySink::failing() } else { MemorySink::new() };
        let records = sink.records();

        let mut world = World::new(name);
        let session = Session::new(config, verifier);
        let supervisor = SideEffectSupervisor::new(launcher);

        match Runtime::start(display, policy, session, supervisor, sink) {
            Ok(runtime) => {
                world.capture_failures = runtime.failures().to_vec();
                match runtime.run() {
                    Ok(outcome) => world.outcome = Some(outcome),
                    Err(error) => world.run_error = Some(error.to_string()),
                }
            },
            Err(RuntimeError::Capture(error)) => world.capture_error = Some(error),
            Err(error) => {
                return Err(format!("Scenario '{}': unexpected start error: {error}", world.name));
            },
        }

        world.record = record.borrow().clone();
        world.launched = launched.get();
        world.reaped = reaped.get();
        world.messages = records.borrow().clone();
        world.verifications = checked.get();

        let name = world.name.clone();
        (self.oracle)(&world).map_err(|e| format!("Scenario '{name}': {e}"))
    }
}
