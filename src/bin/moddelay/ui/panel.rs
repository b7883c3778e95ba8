//! Front panel: live engine values, the targets last sent, and audio stats

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{Controls, EngineSnapshot, StreamFormat};

pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

fn row<'a>(label: &'a str, current: String, target: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {label:<12}"), Style::default().fg(Color::Cyan)),
        Span::styled(format!("{current:>12}"), Style::default().fg(Color::White)),
        Span::styled(format!("   -> {target}"), Style::default().fg(Color::DarkGray)),
    ])
}

pub fn render_panel(
    frame: &mut Frame,
    area: Rect,
    snapshot: &EngineSnapshot,
    controls: &Controls,
    format: StreamFormat,
    stats: &AudioStats,
    status: &str,
) {
    let title = format!(
        " moddelay  {:.1}kHz  {}ch ",
        format.sample_rate as f32 / 1000.0,
        format.channels
    );
    let block = Block::default().title(title).borders(Borders::ALL);

    let lfo_line = match snapshot.lfo {
        Some(lfo) => row(
            "LFO",
            format!("{:.2} Hz {}", lfo.frequency, lfo.waveform.name()),
            format!("depth {:.1} ms", lfo.depth * 1000.0),
        ),
        None => row(
            "LFO",
            String::from("off"),
            format!(
                "{:.2} Hz {} when on",
                controls.lfo.frequency,
                controls.lfo.waveform.name()
            ),
        ),
    };

    let lines = vec![
        row(
            "Delay",
            format!("{:.1} ms", snapshot.base_delay * 1000.0),
            format!("{:.1} ms", controls.base_delay * 1000.0),
        ),
        row(
            "Feedback",
            format!("{:.3}", snapshot.feedback),
            format!("{:.2}", controls.feedback),
        ),
        row(
            "Dry/Wet",
            format!("{:.3}", snapshot.dry_wet),
            format!("{:.1}", controls.dry_wet),
        ),
        lfo_line,
        Line::from(vec![
            Span::styled(
                format!(" Peak: {:.2}  RMS: {:.2}  ", stats.peak, stats.rms),
                Style::default().fg(Color::Magenta),
            ),
            Span::styled(
                format!(
                    "underruns: {}  refused: {}",
                    snapshot.underruns, snapshot.rejected_controls
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Yellow),
        )),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}
