//! Test doubles for the credential, helper and message seams.

use std::{cell::Cell, cell::RefCell, io, rc::Rc};

use chrono::{DateTime, Local};
use scrlock_app::{Job, Launcher, MessageSink, format_record};
use scrlock_core::{CredentialVerifier, Verdict};

/// Accepts exactly one password.
#[derive(Debug, Clone)]
pub struct AcceptOnly {
    password: Vec<u8>,
    checked: Rc<Cell<u32>>,
}

impl AcceptOnly {
    /// Verifier accepting only `password`.
    pub fn new(password: impl Into<Vec<u8>>) -> Self {
        Self { password: password.into(), checked: Rc::new(Cell::new(0)) }
    }

    /// Attempts verified so far, shared across clones.
    pub fn checked(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.checked)
    }
}

impl CredentialVerifier for AcceptOnly {
    fn verify(&self, attempt: &[u8]) -> Verdict {
        self.checked.set(self.checked.get() + 1);
        if attempt == self.password.as_slice() { Verdict::Accepted } else { Verdict::Rejected }
    }
}

/// Job that counts itself as reaped.
#[derive(Debug)]
pub struct FakeJob {
    reaped: Rc<Cell<u32>>,
}

impl Job for FakeJob {
    fn wait(&mut self) -> io::Result<()> {
        self.reaped.set(self.reaped.get() + 1);
        Ok(())
    }
}

/// Launcher that counts launches and reaps instead of running anything.
#[derive(Debug, Clone, Default)]
pub struct CountingLauncher {
    launched: Rc<Cell<u32>>,
    reaped: Rc<Cell<u32>>,
    fail: bool,
}

impl CountingLauncher {
    /// Launcher whose every launch succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher whose every launch fails.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Jobs launched, shared across clones.
    pub fn launched(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.launched)
    }

    /// Jobs reaped, shared across clones.
    pub fn reaped(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.reaped)
    }
}

impl Launcher for CountingLauncher {
    type Job = FakeJob;

    fn launch(&mut self) -> io::Result<FakeJob> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "helper missing"));
        }
        self.launched.set(self.launched.get() + 1);
        Ok(FakeJob { reaped: Rc::clone(&self.reaped) })
    }
}

/// Keeps formatted records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl MemorySink {
    /// Sink that accepts every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose every write fails.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Saved records, shared across clones.
    pub fn records(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.records)
    }
}

impl MessageSink for MemorySink {
    fn save(&mut self, text: &str, at: DateTime<Local>) -> io::Result<()> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only home"));
        }
        self.records.borrow_mut().push(format_record(text, at));
        Ok(())
    }
}
