//! moddelay - live modulated delay in the terminal
//!
//! Captures the default input device, runs it through the delay engine and
//! plays it on the default output device.
//!
//! Run with: cargo run --bin moddelay

mod app;
mod ui;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let terminal = ratatui::init();

    let result = app::run(terminal);

    ratatui::restore();
    result
}
