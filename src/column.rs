use crate::config::Settings;
use crate::glyphs;
use crate::scheduler::{Clock, Context};
use crate::surface::{Backend, Surface};
use anyhow::Result;
use rand::{rngs::StdRng, Rng};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Advance {
    Active,
    Wrapped,
}

/// A fixed x position and its falling cursor, always in `[0, max_row-1]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Column {
    x: u16,
    cursor: u16,
}

impl Column {
    pub(crate) fn new(x: u16) -> Self {
        Self { x, cursor: 0 }
    }

    pub(crate) fn x(&self) -> u16 {
        self.x
    }

    pub(crate) fn cursor(&self) -> u16 {
        self.cursor
    }

    /// Moves down one row. Reaching the last row wraps back to the top.
    pub(crate) fn advance(&mut self, max_row: u16) -> Advance {
        let last = max_row.saturating_sub(1);
        self.cursor = self.cursor.saturating_add(1).min(last);
        if self.cursor == last {
            self.cursor = 0;
            Advance::Wrapped
        } else {
            Advance::Active
        }
    }
}

/// x positions `start, start+step, ...` left of `max_col`.
pub(crate) fn positions(start: u16, step: u16, max_col: u16) -> Vec<u16> {
    if step == 0 {
        return Vec::new();
    }
    (start..max_col).step_by(step as usize).collect()
}

/// Sole owner of one column's cursor, with its own generator.
pub(crate) struct Animator {
    column: Column,
    rng: StdRng,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl Animator {
    pub(crate) fn new(x: u16, settings: &Settings) -> Self {
        Self {
            column: Column::new(x),
            rng: settings.rng(u64::from(x)),
            min_delay_ms: settings.min_delay_ms,
            max_delay_ms: settings.max_delay_ms,
        }
    }

    pub(crate) fn for_screen(settings: &Settings, max_col: u16) -> Vec<Self> {
        positions(settings.start_col, settings.col_step, max_col)
            .into_iter()
            .map(|x| Self::new(x, settings))
            .collect()
    }

    pub(crate) fn x(&self) -> u16 {
        self.column.x()
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> u16 {
        self.column.cursor()
    }

    /// draw -> advance -> clear on wrap -> flush
    pub(crate) fn step<B: Backend>(&mut self, surface: &Surface<B>) -> Result<Advance> {
        let glyph = glyphs::sample(&mut self.rng);
        surface.draw(self.column.cursor(), self.column.x(), glyph)?;

        let advance = self.column.advance(surface.max_row());
        if advance == Advance::Wrapped {
            surface.clear_column(self.column.x())?;
        }

        surface.flush()?;
        Ok(advance)
    }

    fn pause(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(self.min_delay_ms..=self.max_delay_ms))
    }

    /// Steps until the stop flag is seen; returns the number of steps.
    pub(crate) fn run<B: Backend, C: Clock>(mut self, ctx: &Context<B, C>) -> Result<u64> {
        log::debug!("column {} started", self.x());
        let mut steps = 0u64;
        while !ctx.termination.is_raised() {
            self.step(&ctx.surface)?;
            steps += 1;
            let pause = self.pause();
            ctx.clock.sleep(pause);
        }
        log::debug!("column {} stopped after {steps} steps", self.x());
        Ok(steps)
    }
}
