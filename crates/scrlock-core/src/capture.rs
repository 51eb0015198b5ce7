//! Multi-surface capture.
//!
//! [`CaptureManager::acquire`] walks every surface the display reports and
//! tries to take it over: overlay first, then pointer grab, then keyboard
//! grab, each grab under the bounded [`RetryPolicy`]. A surface either ends up
//! fully captured (overlay raised, both grabs held) or is rolled back
//! completely. Partially captured surfaces are never handed out.
//!
//! Grabs are held by the client, not by a surface. Rolling back a surface
//! moves both grabs back onto the most recently captured overlay before the
//! failed one is destroyed, and the grabs are released only once everything
//! is released.
//!
//! # Failure policy
//!
//! - Zero surfaces captured: [`CaptureError::NothingCaptured`], the caller
//!   must exit without ever waiting for input.
//! - Some surfaces captured: the session locks the captured subset only and
//!   the failed surfaces are reported back but never retried.

use tracing::{debug, warn};

use crate::{
    config::RetryPolicy,
    display::{Display, Screen},
    error::{CaptureError, SurfaceFailure},
};

/// One exclusively captured surface.
///
/// Exists only while both pointer and keyboard are grabbed. Owned by
/// [`CaptureManager`]; nothing else touches the overlay.
#[derive(Debug)]
pub struct SurfaceHandle<O> {
    index: usize,
    overlay: O,
}

impl<O> SurfaceHandle<O> {
    /// Physical surface index.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Owner of every captured surface for the locked period.
///
/// Handles are kept in acquisition order, which is also the order redraws
/// fan out in.
#[derive(Debug)]
pub struct CaptureManager<O> {
    handles: Vec<SurfaceHandle<O>>,
    total: usize,
}

/// Result of one retried grab.
enum Grab {
    Held,
    Refused { attempts: u32 },
}

impl<O> CaptureManager<O> {
    /// Capture every surface `display` reports.
    ///
    /// Returns the manager holding the captured subset together with the
    /// per-surface failures for the rest.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NothingCaptured`] if no surface could be captured.
    pub fn acquire<D>(
        display: &mut D,
        policy: RetryPolicy,
    ) -> Result<(Self, Vec<SurfaceFailure>), CaptureError>
    where
        D: Display<Overlay = O>,
    {
        let total = display.surface_count();
        let mut handles = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for surface in 0..total {
            match capture_one(display, surface, policy) {
                Ok(handle) => {
                    debug!(surface, "surface captured");
                    handles.push(handle);
                },
                Err(Rollback { failure, overlay }) => {
                    warn!(%failure, "abandoning surface");
                    failures.push(failure);
                    if let Some(overlay) = overlay {
                        // The failed attempt may have moved the grabs onto
                        // this overlay; put them back before it goes away.
                        restore_grabs(display, &mut handles, &mut failures, policy);
                        display.destroy_overlay(overlay);
                    }
                },
            }
        }

        if handles.is_empty() {
            return Err(CaptureError::NothingCaptured { total, failures });
        }

        if !failures.is_empty() {
            warn!(
                captured = handles.len(),
                total, "locking only the captured subset of surfaces"
            );
        }

        if let Err(error) = display.flush() {
            warn!(%error, "flush after capture failed");
        }

        Ok((Self { handles, total }, failures))
    }

    /// Ungrab, free and destroy every captured surface.
    ///
    /// Idempotent: handles are drained, so a second call (or a call on a
    /// manager that captured nothing) releases nothing. Returns the number of
    /// surfaces released.
    pub fn release_all<D>(&mut self, display: &mut D) -> usize
    where
        D: Display<Overlay = O>,
    {
        let released = self.handles.len();
        if released > 0 {
            display.ungrab();
        }
        for handle in self.handles.drain(..) {
            display.destroy_overlay(handle.overlay);
            debug!(surface = handle.index, "surface released");
        }
        if released > 0 {
            if let Err(error) = display.flush() {
                warn!(%error, "flush after release failed");
            }
        }
        released
    }

    /// Restack every overlay above all other windows.
    pub fn raise_all<D>(&self, display: &mut D) -> Result<(), D::Error>
    where
        D: Display<Overlay = O>,
    {
        for handle in &self.handles {
            display.raise(&handle.overlay)?;
        }
        display.flush()
    }

    /// Paint `screen` on every captured surface before returning.
    pub fn draw_all<D>(&self, display: &mut D, screen: &Screen) -> Result<(), D::Error>
    where
        D: Display<Overlay = O>,
    {
        for handle in &self.handles {
            display.draw(&handle.overlay, screen)?;
        }
        display.flush()
    }

    /// Captured surfaces in acquisition order.
    pub fn handles(&self) -> &[SurfaceHandle<O>] {
        &self.handles
    }

    /// Number of surfaces currently captured.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether nothing is captured (never acquired or already released).
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of surfaces the display reported at acquisition.
    pub fn total(&self) -> usize {
        self.total
    }
}

/// A surface that could not be captured.
///
/// `overlay` is still alive when one was created; the caller destroys it once
/// the grabs are settled.
struct Rollback<O> {
    failure: SurfaceFailure,
    overlay: Option<O>,
}

/// Capture one surface.
fn capture_one<D: Display>(
    display: &mut D,
    surface: usize,
    policy: RetryPolicy,
) -> Result<SurfaceHandle<D::Overlay>, Rollback<D::Overlay>> {
    let overlay = display.create_overlay(surface).map_err(|e| Rollback {
        failure: SurfaceFailure::Overlay { surface, reason: e.to_string() },
        overlay: None,
    })?;

    match grab_both(display, surface, &overlay, policy) {
        Ok(()) => Ok(SurfaceHandle { index: surface, overlay }),
        Err(failure) => Err(Rollback { failure, overlay: Some(overlay) }),
    }
}

/// Pointer then keyboard, each under the retry policy.
fn grab_both<D: Display>(
    display: &mut D,
    surface: usize,
    overlay: &D::Overlay,
    policy: RetryPolicy,
) -> Result<(), SurfaceFailure> {
    if let Grab::Refused { attempts } = retry(display, policy, |d| d.grab_pointer(overlay)) {
        return Err(SurfaceFailure::Pointer { surface, attempts });
    }
    if let Grab::Refused { attempts } = retry(display, policy, |d| d.grab_keyboard(overlay)) {
        return Err(SurfaceFailure::Keyboard { surface, attempts });
    }
    Ok(())
}

/// Re-establish both grabs on the most recently captured overlay.
///
/// A handle that cannot take them back no longer has exclusive input, so it
/// is dropped and the next one is tried. With nothing captured the grabs are
/// released outright.
fn restore_grabs<D: Display>(
    display: &mut D,
    handles: &mut Vec<SurfaceHandle<D::Overlay>>,
    failures: &mut Vec<SurfaceFailure>,
    policy: RetryPolicy,
) {
    while let Some(anchor) = handles.last() {
        match grab_both(display, anchor.index, &anchor.overlay, policy) {
            Ok(()) => return,
            Err(failure) => {
                warn!(%failure, "captured surface lost its grabs");
                failures.push(failure);
                if let Some(handle) = handles.pop() {
                    display.destroy_overlay(handle.overlay);
                }
            },
        }
    }
    display.ungrab();
}

/// Run `attempt` until it succeeds or the policy's budget is spent.
///
/// A display error ends the loop early; the grab counts as refused.
fn retry<D, F>(display: &mut D, policy: RetryPolicy, mut attempt: F) -> Grab
where
    D: Display,
    F: FnMut(&mut D) -> Result<bool, D::Error>,
{
    let max = policy.max_attempts.max(1);
    for n in 1..=max {
        match attempt(display) {
            Ok(true) => return Grab::Held,
            Ok(false) => {},
            Err(error) => {
                warn!(%error, attempts = n, "grab failed");
                return Grab::Refused { attempts: n };
            },
        }
        if n < max {
            display.wait(policy.delay);
        }
    }
    Grab::Refused { attempts: max }
}
