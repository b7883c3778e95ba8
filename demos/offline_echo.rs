//! Render ten seconds of a 440 Hz tone through the delay and report what
//! came out: levels, and where the first echo of a click lands.
//!
//! Run with: cargo run --example offline_echo

use mod_delay::{DelayConfig, DelayEngine, DelaySettings, MAX_BLOCK_SIZE};

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: usize = 2;
const SECONDS: usize = 10;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let config = DelayConfig {
        sample_rate: SAMPLE_RATE,
        channels: CHANNELS,
        max_delay_seconds: 1.5,
        smoothing_time: 0.3,
        settings: DelaySettings {
            base_delay: 0.08,
            feedback: 0.1,
            dry_wet: 0.5,
            lfo: None,
        },
    };

    // --- Tone ---
    let mut engine = DelayEngine::open(config)?;
    let frames = SAMPLE_RATE as usize * SECONDS;
    let mut audio: Vec<i16> = (0..frames)
        .flat_map(|n| {
            let phase = std::f32::consts::TAU * 440.0 * n as f32 / SAMPLE_RATE as f32;
            let s = (phase.sin() * 8_000.0) as i16;
            [s; CHANNELS]
        })
        .collect();

    let mut rendered = 0;
    for block in audio.chunks_mut(MAX_BLOCK_SIZE * CHANNELS) {
        rendered += engine.process_block(block)?;
    }
    engine.close();

    let peak = audio.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    let rms = (audio.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / audio.len() as f64).sqrt();
    println!("Rendered {rendered} frames ({SECONDS} s, {SAMPLE_RATE} Hz, {CHANNELS} ch)");
    println!("  peak {peak} LSB ({:.1} dBFS)", 20.0 * (peak as f64 / 32_768.0).log10());
    println!("  rms  {rms:.0} LSB ({:.1} dBFS)", 20.0 * (rms / 32_768.0).log10());

    // --- Click, to see the echo train ---
    let mut engine = DelayEngine::open(config)?;
    let mut click = vec![0i16; SAMPLE_RATE as usize / 2 * CHANNELS];
    click[0] = 16_000;
    click[1] = 16_000;
    for block in click.chunks_mut(MAX_BLOCK_SIZE * CHANNELS) {
        engine.process_block(block)?;
    }

    let echoes: Vec<(usize, i16)> = click
        .chunks_exact(CHANNELS)
        .enumerate()
        .skip(1)
        .filter(|(_, frame)| frame[0].unsigned_abs() > 100)
        .map(|(n, frame)| (n, frame[0]))
        .collect();
    for (n, level) in echoes {
        println!(
            "  echo at frame {n} ({:.1} ms): {level} LSB",
            n as f64 * 1000.0 / SAMPLE_RATE as f64
        );
    }

    Ok(())
}
