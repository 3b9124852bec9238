use crate::glyphs::Glyph;
use crate::scheduler::KeySource;
use crate::surface::Backend;
use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::{
    io::{self, BufWriter, Stdout, Write},
    time::Duration,
};

/// Raw mode, alternate screen, hidden cursor.
pub(crate) fn enter() -> Result<()> {
    let mut out = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(
        out,
        EnterAlternateScreen,
        DisableLineWrap,
        cursor::Hide,
        Clear(ClearType::All)
    )?;
    Ok(())
}

/// Undoes `enter`. Writes straight to a fresh stdout handle and ignores
/// failures, so it can run from the signal thread at any point.
pub(crate) fn restore_best_effort() {
    let mut out = io::stdout();
    let _ = execute!(
        out,
        ResetColor,
        Clear(ClearType::All),
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen
    );
    let _ = terminal::disable_raw_mode();
}

/// `(max_row, max_col)`
pub(crate) fn size() -> Result<(u16, u16)> {
    let (cols, rows) = terminal::size()?;
    Ok((rows, cols))
}

pub(crate) struct CrosstermBackend {
    out: BufWriter<Stdout>,
}

impl CrosstermBackend {
    pub(crate) fn new() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
        }
    }
}

impl Backend for CrosstermBackend {
    fn put(&mut self, row: u16, col: u16, glyph: Glyph) -> Result<()> {
        queue!(
            self.out,
            cursor::MoveTo(col, row),
            SetForegroundColor(Color::Green),
            Print(glyph.as_str())
        )?;
        Ok(())
    }

    fn blank(&mut self, row: u16, col: u16) -> Result<()> {
        queue!(self.out, cursor::MoveTo(col, row), Print(' '))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

pub(crate) struct CrosstermKeys;

impl KeySource for CrosstermKeys {
    fn key_pressed(&mut self, timeout: Duration) -> Result<bool> {
        let mut wait = timeout;
        while event::poll(wait)? {
            wait = Duration::ZERO;
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
