//! Doubles for the terminal, the clock and the keyboard.

use crate::glyphs::Glyph;
use crate::scheduler::{Clock, KeySource};
use crate::surface::{Backend, Surface};
use crate::termination::Termination;
use anyhow::{bail, Result};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Put(u16, u16),
    Blank(u16, u16),
    Flush,
}

/// Records a cell grid. Writes become visible only on flush, like a
/// buffered terminal. Every operation is logged with the id of the lock
/// session it ran in, so interleaving across calls shows up in the log.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pending: Vec<((u16, u16), Option<&'static str>)>,
    screen: HashMap<(u16, u16), &'static str>,
    blanked: Vec<(u16, u16)>,
    log: Vec<(u64, Op)>,
    session: u64,
    calls: usize,
    puts: usize,
    flushes: usize,
    watch: Option<Arc<Termination>>,
    puts_after_stop: usize,
    puts_after_restore: usize,
    fail_after: Option<usize>,
}

impl RecordingBackend {
    pub(crate) fn watching(termination: Arc<Termination>) -> Self {
        Self {
            watch: Some(termination),
            ..Self::default()
        }
    }

    pub(crate) fn failing_after(calls: usize) -> Self {
        Self {
            fail_after: Some(calls),
            ..Self::default()
        }
    }

    fn record(&mut self, op: Op) -> Result<()> {
        self.log.push((self.session, op));
        self.calls += 1;
        if let Some(limit) = self.fail_after {
            if self.calls > limit {
                bail!("test backend gave up after {limit} calls");
            }
        }
        Ok(())
    }

    pub(crate) fn visible(&self, row: u16, col: u16) -> Option<&'static str> {
        self.screen.get(&(row, col)).copied()
    }

    pub(crate) fn blanked(&self) -> &[(u16, u16)] {
        &self.blanked
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts
    }

    pub(crate) fn flushes(&self) -> usize {
        self.flushes
    }

    pub(crate) fn puts_after_stop(&self) -> usize {
        self.puts_after_stop
    }

    pub(crate) fn puts_after_restore(&self) -> usize {
        self.puts_after_restore
    }

    /// Operations grouped by lock session, in order.
    pub(crate) fn sessions(&self) -> Vec<Vec<Op>> {
        let mut out: Vec<Vec<Op>> = Vec::new();
        let mut current = None;
        for &(id, op) in &self.log {
            if current != Some(id) {
                assert!(current.map_or(true, |c| c < id), "session {id} reopened");
                current = Some(id);
                out.push(Vec::new());
            }
            if let Some(last) = out.last_mut() {
                last.push(op);
            }
        }
        out
    }

    /// Every session holding a blank is one complete column clear: only
    /// blanks, every row of one to three adjacent columns.
    pub(crate) fn assert_whole_clears(&self, rows: u16) {
        for ops in self.sessions() {
            if !ops.iter().any(|op| matches!(op, Op::Blank(..))) {
                assert_eq!(ops.len(), 1, "single-op call split or merged: {ops:?}");
                continue;
            }
            let mut xs: Vec<u16> = Vec::new();
            for op in &ops {
                match *op {
                    Op::Blank(_, x) => {
                        if !xs.contains(&x) {
                            xs.push(x);
                        }
                    }
                    other => panic!("{other:?} interleaved with a column clear"),
                }
            }
            xs.sort_unstable();
            assert!(xs.len() <= 3 && xs.windows(2).all(|w| w[1] == w[0] + 1));
            assert_eq!(ops.len(), xs.len() * rows as usize, "partial clear {ops:?}");
        }
    }
}

impl Backend for RecordingBackend {
    fn begin(&mut self) {
        self.session += 1;
    }

    fn put(&mut self, row: u16, col: u16, glyph: Glyph) -> Result<()> {
        if let Some(t) = &self.watch {
            if t.is_raised() {
                self.puts_after_stop += 1;
            }
            if t.is_restored() {
                self.puts_after_restore += 1;
            }
        }
        self.record(Op::Put(row, col))?;
        self.puts += 1;
        self.pending.push(((row, col), Some(glyph.as_str())));
        Ok(())
    }

    fn blank(&mut self, row: u16, col: u16) -> Result<()> {
        self.record(Op::Blank(row, col))?;
        self.blanked.push((row, col));
        self.pending.push(((row, col), None));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.record(Op::Flush)?;
        self.flushes += 1;
        for (cell, value) in self.pending.drain(..) {
            match value {
                Some(s) => {
                    self.screen.insert(cell, s);
                }
                None => {
                    self.screen.remove(&cell);
                }
            }
        }
        Ok(())
    }
}

/// Surface over `backend` with its own, never-raised stop flag.
pub(crate) fn surface(backend: RecordingBackend, rows: u16, cols: u16) -> Surface<RecordingBackend> {
    Surface::new(backend, rows, cols, Arc::new(Termination::new()))
}

enum Trigger {
    Stop,
    Interrupt(fn()),
}

/// Returns immediately and records every requested pause. Optionally
/// raises the stop flag (or runs the interrupt path) on the n-th sleep.
#[derive(Default)]
pub(crate) struct ScriptedClock {
    sleeps: Mutex<Vec<Duration>>,
    trigger: Option<(usize, Arc<Termination>, Trigger)>,
}

impl ScriptedClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn stop_after(sleeps: usize, termination: Arc<Termination>) -> Self {
        Self {
            sleeps: Mutex::default(),
            trigger: Some((sleeps, termination, Trigger::Stop)),
        }
    }

    pub(crate) fn interrupt_after(sleeps: usize, termination: Arc<Termination>, restore: fn()) -> Self {
        Self {
            sleeps: Mutex::default(),
            trigger: Some((sleeps, termination, Trigger::Interrupt(restore))),
        }
    }

    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for ScriptedClock {
    fn sleep(&self, pause: Duration) {
        let n = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(pause);
            sleeps.len()
        };
        if let Some((at, termination, trigger)) = &self.trigger {
            if n == *at {
                match trigger {
                    Trigger::Stop => {
                        termination.raise();
                    }
                    Trigger::Interrupt(restore) => termination.interrupt(*restore),
                }
            }
        }
        thread::yield_now();
    }
}

/// Reports a key on the n-th poll, or never.
pub(crate) struct ScriptedKeys {
    press_on: Option<usize>,
    polls: usize,
}

impl ScriptedKeys {
    pub(crate) fn never() -> Self {
        Self {
            press_on: None,
            polls: 0,
        }
    }

    pub(crate) fn press_after(polls: usize) -> Self {
        Self {
            press_on: Some(polls),
            polls: 0,
        }
    }
}

impl KeySource for ScriptedKeys {
    fn key_pressed(&mut self, timeout: Duration) -> Result<bool> {
        self.polls += 1;
        if self.press_on.is_some_and(|n| self.polls >= n) {
            return Ok(true);
        }
        if !timeout.is_zero() {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(false)
    }
}
