//! TUI for moddelay
//!
//! Front panel keys drive the engine through its control channel; the
//! audio thread reports back with snapshots and scope samples.

mod panel;
mod scope;
mod spectrum;
pub mod state;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::time::Duration;

use mod_delay::{DelayController, DelayError};

pub use state::{Controls, EngineSnapshot, StreamFormat};

use panel::{render_panel, AudioStats};
use scope::render_scope;
use spectrum::{render_spectrum, SpectrumAnalyzer};

/// Scope and analyzer window, in frames
pub const VIS_BLOCK_LEN: usize = 1024;

pub struct UiApp {
    controller: DelayController,
    controls: Controls,
    /// (input, output) pairs of the first channel
    scope_rx: Consumer<[f32; 2]>,
    snapshot_rx: Consumer<EngineSnapshot>,
    /// Latest snapshot received
    snapshot: EngineSnapshot,
    dry: Vec<f32>,
    scope: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    format: StreamFormat,
    /// Outcome of the last key press
    status: String,
    should_quit: bool,
}

impl UiApp {
    pub fn new(
        controller: DelayController,
        controls: Controls,
        scope_rx: Consumer<[f32; 2]>,
        snapshot_rx: Consumer<EngineSnapshot>,
        format: StreamFormat,
    ) -> Self {
        Self {
            controller,
            controls,
            scope_rx,
            snapshot_rx,
            snapshot: EngineSnapshot::default(),
            dry: vec![0.0; VIS_BLOCK_LEN],
            scope: vec![0.0; VIS_BLOCK_LEN],
            spectrum: SpectrumAnalyzer::new(VIS_BLOCK_LEN, format.sample_rate as f32),
            format,
            status: String::from("ready"),
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.poll_scope();
            self.poll_snapshots();

            terminal.draw(|frame| self.render(frame))?;

            // Non-blocking, ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    /// Keep the newest VIS_BLOCK_LEN frames of both traces.
    fn poll_scope(&mut self) {
        let before = self.scope.len();
        while let Ok([dry, out]) = self.scope_rx.pop() {
            self.dry.push(dry);
            self.scope.push(out);
        }
        if self.scope.len() == before {
            return;
        }
        if self.scope.len() > VIS_BLOCK_LEN {
            let excess = self.scope.len() - VIS_BLOCK_LEN;
            self.dry.drain(..excess);
            self.scope.drain(..excess);
        }
        self.spectrum.update(&self.scope);
    }

    fn poll_snapshots(&mut self) {
        while let Ok(snapshot) = self.snapshot_rx.pop() {
            self.snapshot = snapshot;
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        let outcome: Result<String, DelayError> = match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('d') => {
                let seconds = self.controls.step_base_delay();
                self.controller
                    .set_base_delay(seconds)
                    .map(|_| format!("base delay -> {seconds:.3} s"))
            }
            KeyCode::Char('b') => {
                let amount = self.controls.step_feedback();
                self.controller
                    .set_feedback(amount)
                    .map(|_| format!("feedback -> {amount:.2}"))
            }
            KeyCode::Char('m') => {
                let ratio = self.controls.step_dry_wet();
                self.controller
                    .set_dry_wet(ratio)
                    .map(|_| format!("dry/wet -> {ratio:.1}"))
            }
            KeyCode::Char('f') => {
                let hz = self.controls.step_lfo_frequency();
                if self.controls.lfo_enabled {
                    self.controller
                        .set_lfo_frequency(hz)
                        .map(|_| format!("LFO rate -> {hz:.2} Hz"))
                } else {
                    Ok(format!("LFO rate {hz:.2} Hz (applies when LFO is on)"))
                }
            }
            KeyCode::Char('w') => {
                let waveform = self.controls.step_waveform();
                if self.controls.lfo_enabled {
                    self.controller
                        .set_lfo_waveform(waveform)
                        .map(|_| format!("LFO shape -> {}", waveform.name()))
                } else {
                    Ok(format!("LFO shape {} (applies when LFO is on)", waveform.name()))
                }
            }
            KeyCode::Char('l') => {
                if self.controls.toggle_lfo() {
                    self.controller
                        .enable_lfo(self.controls.lfo)
                        .map(|_| String::from("LFO on"))
                } else {
                    self.controller
                        .disable_lfo()
                        .map(|_| String::from("LFO off"))
                }
            }
            KeyCode::Char('r') => self
                .controller
                .reset()
                .map(|_| String::from("delay memory cleared")),
            _ => return,
        };

        self.status = match outcome {
            Ok(message) => message,
            Err(err) => format!("error: {err}"),
        };
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(8), // Controls
                Constraint::Min(8),    // Scope + spectrum
                Constraint::Length(1), // Help bar
            ])
            .split(area);

        let stats = AudioStats::from_buffer(&self.scope);
        render_panel(
            frame,
            rows[0],
            &self.snapshot,
            &self.controls,
            self.format,
            &stats,
            &self.status,
        );

        let views = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        render_scope(
            frame,
            views[0],
            &self.dry,
            &self.scope,
            self.format.sample_rate,
            self.snapshot.base_delay,
        );
        render_spectrum(frame, views[1], &self.spectrum);

        let help = Paragraph::new(
            " [D] Delay  [F] LFO rate  [W] Shape  [B] Feedback  [M] Mix  [L] LFO on/off  [R] Clear  [Q] Quit",
        )
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, rows[2]);
    }
}
