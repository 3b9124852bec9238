mod app;
mod column;
mod config;
mod glyphs;
mod scheduler;
mod surface;
mod terminal;
mod termination;

#[cfg(test)]
mod testing;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
