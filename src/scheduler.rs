use crate::column::Animator;
use crate::config::Settings;
use crate::surface::{Backend, Surface};
use crate::termination::Termination;
use anyhow::{anyhow, Context as _, Result};
use rand::Rng;
use std::{
    sync::Arc,
    thread::{self, Scope, ScopedJoinHandle},
    time::Duration,
};

pub(crate) trait Clock: Sync {
    fn sleep(&self, pause: Duration);
}

pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, pause: Duration) {
        thread::sleep(pause);
    }
}

pub(crate) trait KeySource: Send {
    /// Waits at most `timeout` for a key press.
    fn key_pressed(&mut self, timeout: Duration) -> Result<bool>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// One thread per column plus an input watcher.
    Concurrent,
    /// One loop advancing every column per tick.
    Cooperative,
}

/// Everything the animators and the input watcher share. Built once at
/// startup and lent to each of them.
pub(crate) struct Context<B: Backend, C: Clock> {
    pub(crate) surface: Surface<B>,
    pub(crate) termination: Arc<Termination>,
    pub(crate) clock: C,
    pub(crate) settings: Settings,
}

impl<B: Backend, C: Clock> Context<B, C> {
    /// Shares the surface's stop flag.
    pub(crate) fn new(surface: Surface<B>, clock: C, settings: Settings) -> Self {
        Self {
            termination: Arc::clone(surface.termination()),
            surface,
            clock,
            settings,
        }
    }
}

/// Drives `animators` until the stop flag is raised. Returns the total
/// number of steps taken.
pub(crate) fn run<B, C, K>(
    ctx: &Context<B, C>,
    animators: Vec<Animator>,
    keys: K,
    mode: Mode,
) -> Result<u64>
where
    B: Backend,
    C: Clock,
    K: KeySource,
{
    log::debug!("{} columns, {mode:?} mode", animators.len());
    let result = match mode {
        Mode::Concurrent => run_concurrent(ctx, animators, keys),
        Mode::Cooperative => run_cooperative(ctx, animators, keys),
    };
    ctx.termination.raise();
    result
}

fn watch_input<B: Backend, C: Clock, K: KeySource>(ctx: &Context<B, C>, mut keys: K) -> Result<()> {
    let poll = Duration::from_millis(ctx.settings.input_poll_ms);
    while !ctx.termination.is_raised() {
        if keys.key_pressed(poll)? {
            log::debug!("key pressed, stopping");
            ctx.termination.raise();
        }
    }
    Ok(())
}

fn spawn_raising<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: String,
    termination: &'env Termination,
    work: F,
) -> Result<ScopedJoinHandle<'scope, Result<T>>>
where
    T: Send + 'scope,
    F: FnOnce() -> Result<T> + Send + 'scope,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn_scoped(scope, move || {
            let result = work();
            if result.is_err() {
                // let the siblings unwind
                termination.raise();
            }
            result
        })
        .with_context(|| format!("failed to spawn {name}"))
}

fn run_concurrent<B, C, K>(ctx: &Context<B, C>, animators: Vec<Animator>, keys: K) -> Result<u64>
where
    B: Backend,
    C: Clock,
    K: KeySource,
{
    let termination: &Termination = &ctx.termination;

    thread::scope(|scope| {
        let mut first_err: Option<anyhow::Error> = None;
        let mut columns = Vec::with_capacity(animators.len());

        for animator in animators {
            let name = format!("column-{}", animator.x());
            match spawn_raising(scope, name, termination, move || animator.run(ctx)) {
                Ok(handle) => columns.push(handle),
                Err(e) => {
                    termination.raise();
                    first_err = Some(e);
                    break;
                }
            }
        }

        let watcher = if first_err.is_none() {
            match spawn_raising(scope, "input".into(), termination, move || watch_input(ctx, keys)) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    termination.raise();
                    first_err = Some(e);
                    None
                }
            }
        } else {
            None
        };

        let mut steps = 0u64;
        for handle in columns {
            match handle.join() {
                Ok(Ok(n)) => steps += n,
                Ok(Err(e)) => {
                    first_err.get_or_insert(e);
                }
                Err(_) => {
                    termination.raise();
                    first_err.get_or_insert(anyhow!("column thread panicked"));
                }
            }
        }
        if let Some(handle) = watcher {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_err.get_or_insert(e);
                }
                Err(_) => {
                    first_err.get_or_insert(anyhow!("input thread panicked"));
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(steps),
        }
    })
}

fn run_cooperative<B, C, K>(
    ctx: &Context<B, C>,
    mut animators: Vec<Animator>,
    mut keys: K,
) -> Result<u64>
where
    B: Backend,
    C: Clock,
    K: KeySource,
{
    let settings = &ctx.settings;
    let tick = Duration::from_millis(settings.tick_ms);
    let mut rng = settings.rng(u64::MAX);
    let mut steps = 0u64;

    'ticks: while !ctx.termination.is_raised() {
        if keys.key_pressed(Duration::ZERO)? {
            log::debug!("key pressed, stopping");
            ctx.termination.raise();
            break;
        }

        for animator in animators.iter_mut() {
            if ctx.termination.is_raised() {
                break 'ticks;
            }
            let burst = rng.gen_range(settings.min_burst..=settings.max_burst);
            for _ in 0..burst {
                animator.step(&ctx.surface)?;
                steps += 1;
            }
        }

        ctx.clock.sleep(tick);
    }
    Ok(steps)
}
