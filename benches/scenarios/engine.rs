//! Full engine blocks: decode-free i16 path and the raw byte path.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use mod_delay::{io::Endianness, DelayConfig, DelayEngine, DelaySettings};

use crate::BLOCK_SIZES;

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    let no_lfo = DelayConfig {
        settings: DelaySettings {
            lfo: None,
            ..DelaySettings::default()
        },
        ..DelayConfig::default()
    };
    let configs = [
        ("stereo_lfo", DelayConfig::default()),
        ("stereo_static", no_lfo),
        (
            "mono_lfo",
            DelayConfig {
                channels: 1,
                ..DelayConfig::default()
            },
        ),
    ];

    for (name, config) in configs {
        for &size in BLOCK_SIZES {
            let input: Vec<i16> = (0..size * config.channels)
                .map(|i| ((i as f32 * 0.05).sin() * 10_000.0) as i16)
                .collect();
            let mut block = input.clone();
            let mut engine = DelayEngine::open(config).unwrap();

            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    block.copy_from_slice(&input);
                    engine.process_block(black_box(&mut block)).unwrap()
                })
            });
        }
    }

    // Byte path, for hosts that hand over raw PCM
    for &size in BLOCK_SIZES {
        let input: Vec<u8> = (0..size * 2)
            .flat_map(|i| (((i as f32 * 0.05).sin() * 10_000.0) as i16).to_le_bytes())
            .collect();
        let mut bytes = input.clone();
        let mut engine = DelayEngine::open(DelayConfig::default()).unwrap();

        group.bench_with_input(BenchmarkId::new("stereo_bytes_le", size), &size, |b, _| {
            b.iter(|| {
                bytes.copy_from_slice(&input);
                engine
                    .process_bytes(black_box(&mut bytes), Endianness::Little)
                    .unwrap()
            })
        });
    }

    group.finish();
}
