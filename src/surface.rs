use crate::glyphs::Glyph;
use crate::termination::Termination;
use anyhow::{anyhow, Result};
use std::sync::{Arc, Mutex};

/// Raw cell output. Implementations need not be thread-safe; `Surface`
/// serialises every call.
pub(crate) trait Backend: Send {
    /// Called once each time the surface lock is taken, before any output.
    fn begin(&mut self) {}
    fn put(&mut self, row: u16, col: u16, glyph: Glyph) -> Result<()>;
    fn blank(&mut self, row: u16, col: u16) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// The shared screen all animators write through.
///
/// One lock covers draw, clear and flush. It is held for a single call
/// and never across a sleep. Once the stop flag is raised the backend is
/// no longer touched.
pub(crate) struct Surface<B: Backend> {
    backend: Mutex<B>,
    termination: Arc<Termination>,
    max_row: u16,
    max_col: u16,
}

impl<B: Backend> Surface<B> {
    pub(crate) fn new(backend: B, max_row: u16, max_col: u16, termination: Arc<Termination>) -> Self {
        Self {
            backend: Mutex::new(backend),
            termination,
            max_row,
            max_col,
        }
    }

    pub(crate) fn termination(&self) -> &Arc<Termination> {
        &self.termination
    }

    pub(crate) fn max_row(&self) -> u16 {
        self.max_row
    }

    pub(crate) fn max_col(&self) -> u16 {
        self.max_col
    }

    fn contains(&self, row: u16, col: u16) -> bool {
        row < self.max_row && col < self.max_col
    }

    /// One critical section. Skips `output` entirely after the stop flag.
    fn with_output(&self, output: impl FnOnce(&mut B) -> Result<()>) -> Result<()> {
        let mut backend = self
            .backend
            .lock()
            .map_err(|_| anyhow!("render surface lock poisoned"))?;
        let Some(_permit) = self.termination.output_permit() else {
            return Ok(());
        };
        backend.begin();
        output(&mut backend)
    }

    pub(crate) fn draw(&self, row: u16, col: u16, glyph: Glyph) -> Result<()> {
        if !self.contains(row, col) {
            return Ok(());
        }
        self.with_output(|b| b.put(row, col, glyph))
    }

    #[cfg(test)]
    pub(crate) fn clear_cell(&self, row: u16, col: u16) -> Result<()> {
        if !self.contains(row, col) {
            return Ok(());
        }
        self.with_output(|b| b.blank(row, col))
    }

    /// Blanks `col` and its left/right neighbours, top to bottom, in one
    /// critical section. Wide glyphs can spill into the neighbours.
    pub(crate) fn clear_column(&self, col: u16) -> Result<()> {
        let first = col.saturating_sub(1);
        let last = col.saturating_add(1).min(self.max_col.saturating_sub(1));
        if self.max_col == 0 || first > last {
            return Ok(());
        }

        let rows = self.max_row;
        self.with_output(|b| {
            for x in first..=last {
                for y in 0..rows {
                    b.blank(y, x)?;
                }
            }
            Ok(())
        })
    }

    pub(crate) fn flush(&self) -> Result<()> {
        self.with_output(|b| b.flush())
    }

    #[cfg(test)]
    pub(crate) fn with_backend<T>(&self, f: impl FnOnce(&B) -> T) -> T {
        let guard = self
            .backend
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }
}
