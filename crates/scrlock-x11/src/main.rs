//! scrlock - lock every X screen until the user's password is typed.
//!
//! Install setuid (or setgid shadow) so the password hash can be read; all
//! privileges are dropped before the display is opened.

use std::{path::Path, process::ExitCode};

use clap::Parser;
use scrlock_app::{
    CommandLauncher, CredentialError, FileMessageSink, Runtime, RuntimeError, Settings,
    SettingsError, SideEffectSupervisor, credentials,
};
use scrlock_core::{LockState, Session};
use scrlock_x11::{X11Display, X11Error};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Simple X screen locker.
#[derive(Parser)]
#[command(name = "scrlock", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Print version and exit
    #[arg(short = 'v')]
    version: bool,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("cannot determine home directory")]
    NoHome,

    #[error(transparent)]
    Display(#[from] X11Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn setup_logging() {
    // RUST_LOG overrides; stay quiet otherwise, the lock screen is the UI.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn lock() -> Result<LockState, StartupError> {
    let verifier = credentials::invoking_user_verifier(Path::new(credentials::SHADOW_PATH))?;
    credentials::drop_privileges()?;

    let settings = Settings::load()?;
    let home = dirs::home_dir().ok_or(StartupError::NoHome)?;

    let display = X11Display::connect(&settings.appearance, settings.hint())?;
    let session = Session::new(settings.session_config(), verifier);
    let supervisor = SideEffectSupervisor::new(CommandLauncher::new(
        settings.helper_command(&home),
        settings.capture_dir(&home),
    ));
    let sink = FileMessageSink::new(settings.message_log(&home));

    let runtime = Runtime::start(display, settings.retry_policy(), session, supervisor, sink)?;
    let outcome = runtime.run()?;
    info!(released = outcome.released, reaped = outcome.reaped, "unlocked");
    Ok(outcome.state)
}

#[allow(clippy::print_stderr)]
fn main() -> ExitCode {
    let Ok(cli) = Cli::try_parse() else {
        eprintln!("usage: scrlock [-v]");
        return ExitCode::FAILURE;
    };
    if cli.version {
        eprintln!("scrlock-{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::FAILURE;
    }

    setup_logging();

    if report(lock()) { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Log how the session ended; true only after an unlock.
fn report(result: Result<LockState, StartupError>) -> bool {
    match result {
        Ok(LockState::Unlocking) => true,
        Ok(state) => {
            error!(?state, "session ended without unlocking");
            false
        },
        Err(e) => {
            error!(error = %e, "scrlock failed");
            false
        },
    }
}
