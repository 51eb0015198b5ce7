//! Side-effect helper supervision.
//!
//! A rejected attempt may launch a helper (an intrusion-capture script). The
//! helper runs detached from the event loop so a slow or hung helper never
//! delays password entry. Jobs are only reconciled once, when the session
//! reaches a terminal state: [`SideEffectSupervisor::reap_all`] waits on
//! every outstanding job so none is left as a zombie.

use std::{
    io,
    path::PathBuf,
    process::{Child, Command, Stdio},
    time::Instant,
};

use chrono::Local;
use tracing::{debug, warn};

/// A running helper process that can be waited on.
pub trait Job {
    /// Block until the job exits.
    fn wait(&mut self) -> io::Result<()>;
}

impl Job for Child {
    fn wait(&mut self) -> io::Result<()> {
        let status = Child::wait(self)?;
        debug!(%status, "helper exited");
        Ok(())
    }
}

/// Starts helper jobs.
pub trait Launcher {
    /// Job type produced by this launcher.
    type Job: Job;

    /// Start one helper without waiting for it.
    fn launch(&mut self) -> io::Result<Self::Job>;
}

/// Launches `program <capture_dir>/<timestamp>-<n>.jpg`.
///
/// The helper decides how to produce the image; the supervisor only hands it
/// the destination path.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: PathBuf,
    capture_dir: PathBuf,
    launched: u32,
}

impl CommandLauncher {
    /// Launcher for `program`, writing artifacts under `capture_dir`.
    pub fn new(program: impl Into<PathBuf>, capture_dir: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), capture_dir: capture_dir.into(), launched: 0 }
    }

    /// Destination for the next artifact.
    pub fn next_artifact(&self) -> PathBuf {
        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        self.capture_dir.join(format!("{stamp}-{}.jpg", self.launched))
    }
}

impl Launcher for CommandLauncher {
    type Job = Child;

    fn launch(&mut self) -> io::Result<Child> {
        std::fs::create_dir_all(&self.capture_dir)?;
        let artifact = self.next_artifact();
        let child = Command::new(&self.program)
            .arg(&artifact)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.launched += 1;
        Ok(child)
    }
}

/// One outstanding helper.
#[derive(Debug)]
pub struct SideEffectJob<J> {
    job: J,
    spawned_at: Instant,
}

impl<J> SideEffectJob<J> {
    /// When the job was launched.
    pub fn spawned_at(&self) -> Instant {
        self.spawned_at
    }
}

/// Launches helpers on failed attempts and reaps them at the end.
pub struct SideEffectSupervisor<L: Launcher> {
    launcher: L,
    jobs: Vec<SideEffectJob<L::Job>>,
    spawned: u32,
}

impl<L: Launcher> SideEffectSupervisor<L> {
    /// Supervisor with no outstanding jobs.
    pub fn new(launcher: L) -> Self {
        Self { launcher, jobs: Vec::new(), spawned: 0 }
    }

    /// Launch one helper. Never blocks on the helper itself.
    ///
    /// Launch failures are logged and swallowed: a broken helper must not
    /// affect the lock. Returns whether a job was started.
    pub fn spawn_on_failure(&mut self) -> bool {
        match self.launcher.launch() {
            Ok(job) => {
                self.jobs.push(SideEffectJob { job, spawned_at: Instant::now() });
                self.spawned += 1;
                debug!(outstanding = self.jobs.len(), "side-effect job launched");
                true
            },
            Err(error) => {
                warn!(%error, "failed to launch side-effect helper");
                false
            },
        }
    }

    /// Jobs launched and not yet reaped.
    pub fn outstanding(&self) -> usize {
        self.jobs.len()
    }

    /// Jobs launched over the supervisor's lifetime.
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Outstanding jobs, oldest first.
    pub fn jobs(&self) -> &[SideEffectJob<L::Job>] {
        &self.jobs
    }

    /// Wait on every outstanding job. Consumes the supervisor, so no job can
    /// be launched afterwards and reaping happens once.
    ///
    /// Returns how many jobs exited cleanly; wait failures are logged.
    pub fn reap_all(self) -> usize {
        let mut reaped = 0;
        for mut entry in self.jobs {
            match entry.job.wait() {
                Ok(()) => {
                    debug!(ran_for = ?entry.spawned_at.elapsed(), "side-effect job reaped");
                    reaped += 1;
                },
                Err(error) => warn!(%error, "failed to wait on side-effect helper"),
            }
        }
        reaped
    }

    /// The launcher, for inspection.
    pub fn launcher(&self) -> &L {
        &self.launcher
    }
}

impl<L: Launcher> std::fmt::Debug for SideEffectSupervisor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffectSupervisor")
            .field("outstanding", &self.jobs.len())
            .field("spawned", &self.spawned)
            .finish_non_exhaustive()
    }
}
