//! Audio plumbing: capture device -> delay engine -> playback device

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, Stream, StreamConfig,
};
use ratatui::DefaultTerminal;
use rtrb::{Consumer, Producer, RingBuffer};

use mod_delay::{io::pcm, DelayConfig, DelayEngine, MAX_BLOCK_SIZE};

use super::ui::{Controls, EngineSnapshot, StreamFormat, UiApp, VIS_BLOCK_LEN};

// Tunables
const CONTROL_QUEUE_LEN: usize = 64;
const CAPTURE_RING_BLOCKS: usize = 4; // Input -> output slack, in max blocks
const SCOPE_RING_BLOCKS: usize = 16; // Audio -> UI ring, in scope windows
const SNAPSHOT_RING_LEN: usize = 32;

/// Open both devices, start the engine and hand the terminal to the UI.
pub fn run(mut terminal: DefaultTerminal) -> EyreResult<()> {
    let host = cpal::default_host();
    let output = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let input = host
        .default_input_device()
        .ok_or_else(|| eyre!("no default input device available"))?;
    let output_config = output
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;
    let input_config = input
        .default_input_config()
        .wrap_err("failed to fetch default input config")?;

    let format = StreamFormat {
        sample_rate: output_config.sample_rate().0,
        channels: output_config.channels() as usize,
    };

    // The engine runs at whatever the output device runs at.
    let config = DelayConfig {
        sample_rate: format.sample_rate,
        channels: format.channels,
        ..DelayConfig::default()
    };
    let mut engine = DelayEngine::open(config).wrap_err_with(|| {
        format!(
            "output device format ({} Hz, {} channels) is not supported",
            format.sample_rate, format.channels
        )
    })?;
    let controller = engine.controller(CONTROL_QUEUE_LEN);

    // --- Cross-thread rings ---
    let (capture_tx, capture_rx) =
        RingBuffer::<i16>::new(MAX_BLOCK_SIZE * format.channels * CAPTURE_RING_BLOCKS);
    let (scope_tx, scope_rx) = RingBuffer::<[f32; 2]>::new(VIS_BLOCK_LEN * SCOPE_RING_BLOCKS);
    let (snapshot_tx, snapshot_rx) = RingBuffer::<EngineSnapshot>::new(SNAPSHOT_RING_LEN);

    let capture = build_capture(
        &input,
        input_config.channels() as usize,
        format,
        capture_tx,
    )?;
    let playback = build_playback(
        &output,
        output_config.into(),
        engine,
        capture_rx,
        scope_tx,
        snapshot_tx,
    )?;

    capture.play().wrap_err("failed to start input stream")?;
    playback.play().wrap_err("failed to start output stream")?;

    let controls = Controls::new(config.settings, config.max_delay_seconds);
    let mut app = UiApp::new(controller, controls, scope_rx, snapshot_rx, format);
    app.run(&mut terminal)
}

/// Input callback: convert to 16-bit frames in the engine's channel layout.
fn build_capture(
    device: &Device,
    device_channels: usize,
    format: StreamFormat,
    mut tx: Producer<i16>,
) -> EyreResult<Stream> {
    // Ask for the output's rate so both sides tick together.
    let config = StreamConfig {
        channels: device_channels as u16,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: BufferSize::Default,
    };
    let channels = format.channels;
    let last_source = device_channels.saturating_sub(1);

    device
        .build_input_stream(
            &config,
            move |data: &[f32], _| {
                for frame in data.chunks_exact(device_channels.max(1)) {
                    // Drop whole frames on overflow, never half of one.
                    if tx.slots() < channels {
                        break;
                    }
                    for ch in 0..channels {
                        let _ = tx.push(pcm::f32_to_i16(frame[ch.min(last_source)]));
                    }
                }
            },
            move |err| eprintln!("Input stream error: {err}"),
            None,
        )
        .wrap_err("failed to build input stream")
}

/// Output callback: pull captured audio, run the engine, publish to the UI.
fn build_playback(
    device: &Device,
    config: StreamConfig,
    mut engine: DelayEngine,
    mut capture_rx: Consumer<i16>,
    mut scope_tx: Producer<[f32; 2]>,
    mut snapshot_tx: Producer<EngineSnapshot>,
) -> EyreResult<Stream> {
    let channels = engine.channels();
    // Buffers reused by the callback
    let mut scratch = vec![0i16; MAX_BLOCK_SIZE * channels];
    let mut dry = vec![0.0f32; MAX_BLOCK_SIZE];
    let mut underruns = 0u64;

    device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _| {
                for out in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
                    let block = &mut scratch[..out.len()];

                    let mut starved = false;
                    for sample in block.iter_mut() {
                        *sample = match capture_rx.pop() {
                            Ok(s) => s,
                            Err(_) => {
                                starved = true;
                                0
                            }
                        };
                    }
                    if starved {
                        underruns += 1;
                    }

                    let frames = block.len() / channels;
                    for (d, frame) in dry.iter_mut().zip(block.chunks_exact(channels)) {
                        *d = pcm::i16_to_f32(frame[0]);
                    }

                    if engine.process_block(block).is_err() {
                        block.fill(0);
                    }

                    for (o, &s) in out.iter_mut().zip(block.iter()) {
                        *o = pcm::i16_to_f32(s);
                    }

                    // (in, out) of the first channel, dropped on overflow
                    for (&d, frame) in dry[..frames].iter().zip(block.chunks_exact(channels)) {
                        if scope_tx.push([d, pcm::i16_to_f32(frame[0])]).is_err() {
                            break;
                        }
                    }
                }

                let _ = snapshot_tx.push(EngineSnapshot::capture(&engine, underruns));
            },
            move |err| eprintln!("Output stream error: {err}"),
            None,
        )
        .wrap_err("failed to build output stream")
}
