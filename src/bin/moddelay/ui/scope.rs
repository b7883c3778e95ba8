//! Input against output, first channel only
//!
//! The dry trace is drawn underneath so each echo can be read off as a
//! copy of an earlier input feature. A marker shows where the current base
//! delay falls inside the window.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

/// Vertical range steps, so quiet inputs are still visible.
const HEADROOM_STEP: f64 = 0.25;

/// One trace at `sample_rate`, as (milliseconds, level) points.
pub fn trace(samples: &[f32], sample_rate: f64) -> Vec<(f64, f64)> {
    let ms_per_frame = 1000.0 / sample_rate.max(1.0);
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 * ms_per_frame, s as f64))
        .collect()
}

/// Smallest multiple of HEADROOM_STEP that holds both traces, at most 1.
pub fn level_bound(dry: &[f32], out: &[f32]) -> f64 {
    let peak = dry
        .iter()
        .chain(out)
        .fold(0.0f32, |acc, &s| acc.max(s.abs())) as f64;
    ((peak / HEADROOM_STEP).ceil() * HEADROOM_STEP).clamp(HEADROOM_STEP, 1.0)
}

pub fn render_scope(
    frame: &mut Frame,
    area: Rect,
    dry: &[f32],
    out: &[f32],
    sample_rate: u32,
    base_delay: f32,
) {
    let rate = sample_rate as f64;
    let window_ms = out.len().max(dry.len()).max(1) as f64 * 1000.0 / rate.max(1.0);
    let delay_ms = base_delay as f64 * 1000.0;
    let level = level_bound(dry, out);

    let dry_points = trace(dry, rate);
    let out_points = trace(out, rate);
    let marker = [(delay_ms, -level), (delay_ms, level)];

    let mut datasets = vec![
        Dataset::default()
            .name("in")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&dry_points),
        Dataset::default()
            .name("out")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&out_points),
    ];
    // Off the chart once the delay outgrows the window.
    if delay_ms <= window_ms {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Yellow))
                .data(&marker),
        );
    }

    let title = format!(" In / Out  delay {delay_ms:.1} ms ");
    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([0.0, window_ms])
                .labels(vec![String::from("0"), format!("{window_ms:.0} ms")])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-level, level])
                .labels(vec![format!("-{level:.2}"), String::from("0"), format!("{level:.2}")])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
