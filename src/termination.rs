use anyhow::Result;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

/// Upper bound on waiting for a stuck writer before restoring anyway.
const WRITER_GRACE: Duration = Duration::from_millis(200);

/// Process-wide stop signal plus the one-shot terminal teardown.
///
/// `stop` is raised at most once and never reset. `restored` records that
/// the teardown already ran, whichever path got there first. `writers`
/// counts output calls in flight; none start once `stop` is up.
#[derive(Debug, Default)]
pub(crate) struct Termination {
    stop: AtomicBool,
    restored: AtomicBool,
    writers: AtomicUsize,
}

/// Held for the length of one output call.
pub(crate) struct OutputPermit<'a>(&'a AtomicUsize);

impl Drop for OutputPermit<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Termination {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns true for the call that actually raised the flag.
    pub(crate) fn raise(&self) -> bool {
        !self.stop.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn is_restored(&self) -> bool {
        self.restored.load(Ordering::SeqCst)
    }

    /// `None` once the flag is raised. A permit taken before the raise
    /// delays the teardown until it is dropped.
    pub(crate) fn output_permit(&self) -> Option<OutputPermit<'_>> {
        self.writers.fetch_add(1, Ordering::SeqCst);
        if self.is_raised() {
            self.writers.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(OutputPermit(&self.writers))
    }

    fn wait_for_writers(&self) {
        let deadline = Instant::now() + WRITER_GRACE;
        while self.writers.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            thread::yield_now();
        }
    }

    /// Runs `restore` only for the first caller.
    pub(crate) fn teardown_once(&self, restore: impl FnOnce()) -> bool {
        if self.restored.swap(true, Ordering::SeqCst) {
            return false;
        }
        restore();
        true
    }

    /// Asynchronous path: stop everything and put the terminal back.
    /// Touches atomics only, never the surface lock, so it is safe while
    /// draws are in flight. Output that began before the raise finishes
    /// first; none starts after it.
    pub(crate) fn interrupt(&self, restore: impl FnOnce()) {
        self.raise();
        self.wait_for_writers();
        self.teardown_once(restore);
    }
}

/// Scoped finalizer for the terminal session. Dropping it performs the
/// same one-shot teardown the interrupt handler uses.
pub(crate) struct TerminalGuard {
    termination: Arc<Termination>,
    restore: fn(),
}

impl TerminalGuard {
    pub(crate) fn new(termination: Arc<Termination>, restore: fn()) -> Self {
        Self {
            termination,
            restore,
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.termination.interrupt(self.restore);
    }
}

/// Installs the interrupt/termination handler. On delivery it restores the
/// terminal and exits with status 0 without touching the render surface.
#[cfg(unix)]
pub(crate) fn install_interrupt_handler(termination: Arc<Termination>, restore: fn()) -> Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            if let Some(sig) = signals.forever().next() {
                log::debug!("signal {sig} received");
                termination.interrupt(restore);
                std::process::exit(0);
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn install_interrupt_handler(termination: Arc<Termination>, restore: fn()) -> Result<()> {
    ctrlc::set_handler(move || {
        log::debug!("interrupt received");
        termination.interrupt(restore);
        std::process::exit(0);
    })?;
    Ok(())
}
