//! Spectrum of the processed output
//!
//! Comb filtering from short delays and feedback shows up here as evenly
//! spaced notches; LFO sweeps make them slide.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Display points, log-spaced from LOWEST_HZ to Nyquist
const POINTS: usize = 64;
const LOWEST_HZ: f64 = 20.0;
const FLOOR_DB: f64 = -96.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Sum of the window, for dBFS scaling
    window_gain: f32,
    buffer: Vec<Complex<f32>>,
    /// FFT bin behind each display point
    bins: Vec<usize>,
    /// (log10 Hz, dBFS)
    points: Vec<(f64, f64)>,
    /// Log10 frequency range shown on the x axis
    x_bounds: [f64; 2],
}

impl SpectrumAnalyzer {
    pub fn new(len: usize, sample_rate: f32) -> Self {
        let len = len.max(2);
        let fft = FftPlanner::new().plan_fft_forward(len);

        // Hann
        let window: Vec<f32> = (0..len)
            .map(|i| {
                let x = i as f32 / (len - 1) as f32;
                0.5 - 0.5 * (std::f32::consts::TAU * x).cos()
            })
            .collect();
        let window_gain = window.iter().sum::<f32>().max(f32::EPSILON);

        let nyquist = (sample_rate as f64 / 2.0).max(LOWEST_HZ * 2.0);
        let (lo, hi) = (LOWEST_HZ.log10(), nyquist.log10());
        let hz_per_bin = sample_rate as f64 / len as f64;
        let last_bin = len / 2 - 1;

        let mut bins = Vec::with_capacity(POINTS);
        let mut points = Vec::with_capacity(POINTS);
        for i in 0..POINTS {
            let x = lo + (hi - lo) * i as f64 / (POINTS - 1) as f64;
            let bin = ((10f64.powf(x) / hz_per_bin).round() as usize).clamp(1, last_bin.max(1));
            bins.push(bin);
            points.push((x, FLOOR_DB));
        }

        Self {
            fft,
            window,
            window_gain,
            buffer: vec![Complex::new(0.0, 0.0); len],
            bins,
            points,
            x_bounds: [lo, hi],
        }
    }

    /// Analyze the newest window of `samples`. Ignored until enough have
    /// arrived.
    pub fn update(&mut self, samples: &[f32]) {
        let len = self.window.len();
        if samples.len() < len {
            return;
        }
        let recent = &samples[samples.len() - len..];

        for ((slot, &s), &w) in self.buffer.iter_mut().zip(recent).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.buffer);

        // Full-scale sine reads 0 dBFS.
        let scale = 2.0 / self.window_gain;
        for (point, &bin) in self.points.iter_mut().zip(&self.bins) {
            let magnitude = (self.buffer[bin].norm() * scale) as f64;
            point.1 = (20.0 * magnitude.max(1e-9).log10()).max(FLOOR_DB);
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        self.x_bounds
    }
}

pub fn render_spectrum(frame: &mut Frame, area: Rect, analyzer: &SpectrumAnalyzer) {
    let block = Block::default().title(" Spectrum ").borders(Borders::ALL);

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(analyzer.points());

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds(analyzer.x_bounds())
                .labels(vec!["20", "Hz (log)", "Nyq"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, 0.0])
                .labels(vec!["-96", "-48", "0"])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
