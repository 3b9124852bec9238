use crate::scheduler::Mode;
use anyhow::{ensure, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};

#[derive(Parser, Debug)]
#[command(name = "sansktrix", version, about = "Devanagari rain for the terminal. Any key quits.")]
pub(crate) struct Args {
    /// Drive every column from one loop instead of one thread per column
    #[arg(short, long)]
    pub(crate) cooperative: bool,
}

impl Args {
    pub(crate) fn mode(&self) -> Mode {
        if self.cooperative {
            Mode::Cooperative
        } else {
            Mode::Concurrent
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Settings {
    pub(crate) start_col: u16,
    pub(crate) col_step: u16,
    /// Per-step pause range in concurrent mode.
    pub(crate) min_delay_ms: u64,
    pub(crate) max_delay_ms: u64,
    /// Fixed pause between cooperative ticks.
    pub(crate) tick_ms: u64,
    pub(crate) min_burst: u32,
    pub(crate) max_burst: u32,
    pub(crate) input_poll_ms: u64,
    pub(crate) seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_col: 1,
            col_step: 4,
            min_delay_ms: 50,
            max_delay_ms: 500,
            tick_ms: 250,
            min_burst: 1,
            max_burst: 3,
            input_poll_ms: 25,
            seed: None,
        }
    }
}

impl Settings {
    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(self.col_step > 0, "column step must be positive");
        ensure!(
            self.min_delay_ms <= self.max_delay_ms,
            "delay range {}..={} is inverted",
            self.min_delay_ms,
            self.max_delay_ms
        );
        ensure!(self.min_burst > 0, "burst must be at least one step");
        ensure!(
            self.min_burst <= self.max_burst,
            "burst range {}..={} is inverted",
            self.min_burst,
            self.max_burst
        );
        Ok(())
    }

    /// Fresh generator per caller; seeded runs mix `salt` in so no two
    /// callers share a sequence.
    pub(crate) fn rng(&self, salt: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        }
    }
}
