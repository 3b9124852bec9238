use crate::column::Animator;
use crate::config::{Args, Settings};
use crate::scheduler::{self, Context, Mode, SystemClock};
use crate::surface::Surface;
use crate::terminal::{self, CrosstermBackend, CrosstermKeys};
use crate::termination::{install_interrupt_handler, TerminalGuard, Termination};
use anyhow::{Context as _, Result};
use clap::Parser;
use std::sync::Arc;

pub(crate) fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let settings = Settings::default();
    settings.validate()?;

    let termination = Arc::new(Termination::new());
    install_interrupt_handler(Arc::clone(&termination), terminal::restore_best_effort)
        .context("failed to install signal handler")?;

    // terminal is restored by the time this returns
    let result = session(settings, args.mode(), termination);
    match &result {
        Ok(steps) => log::debug!("finished after {steps} steps"),
        Err(e) => log::warn!("stopped early: {e:#}"),
    }
    result.map(|_| ())
}

fn session(settings: Settings, mode: Mode, termination: Arc<Termination>) -> Result<u64> {
    // declared first so it drops last, after every writer is gone
    let _guard = TerminalGuard::new(Arc::clone(&termination), terminal::restore_best_effort);
    terminal::enter().context("failed to initialise terminal")?;
    let (max_row, max_col) = terminal::size().context("failed to query terminal size")?;

    let surface = Surface::new(CrosstermBackend::new(), max_row, max_col, termination);
    let ctx = Context::new(surface, SystemClock, settings);
    let animators = Animator::for_screen(&ctx.settings, ctx.surface.max_col());
    log::debug!("screen {max_row}x{max_col}, {} columns", animators.len());

    scheduler::run(&ctx, animators, CrosstermKeys, mode)
}
