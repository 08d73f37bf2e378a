//! Rendering throughput benchmarks.
//!
//! Measures the master loop end to end: trigger dispatch, voice
//! rendering through the debug processor, graph walk and final mix.
//!
//! Run: `cargo bench -- render_perf`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kunquat::devices::processors::DebugProcessor;
use kunquat::events::{EventType, Value};
use kunquat::module::{AudioUnit, PatInstRef, Pattern, Song, Trigger};
use kunquat::player::PlayStart;
use kunquat::tstamp::Tstamp;
use kunquat::{Handle, Module};
use std::sync::Arc;

fn chord_module(channels: usize) -> Module {
    let mut module = Module::new();
    let device_id = module
        .graph_mut()
        .add_device(Arc::new(DebugProcessor::new()), Some(0))
        .unwrap();
    let mut au = AudioUnit::new();
    au.add_proc(device_id).unwrap();
    module.audio_units_mut().set(0, au).unwrap();

    let mut pattern = Pattern::new(Tstamp::from_beats(16));
    for beat in 0..16 {
        for ch in 0..channels {
            pattern
                .add_trigger(
                    ch,
                    Trigger::new(
                        Tstamp::from_beats(beat),
                        EventType::NoteOn,
                        Value::Float(-3600.0 + ch as f64 * 100.0),
                    ),
                )
                .unwrap();
        }
    }
    module.set_pattern(0, pattern).unwrap();
    let mut song = Song::new(120.0).unwrap();
    song.push_section(PatInstRef::new(0, 0).unwrap());
    module.song_table_mut().set(0, song).unwrap();
    module.track_list_mut().push(0).unwrap();
    module
}

/// Benchmark whole-chunk rendering at varying polyphony.
fn bench_render_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_chunks");

    for channels in [1usize, 8, 32] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}ch", channels)),
            &channels,
            |b, &channels| {
                let mut left = vec![0.0f32; 4096];
                let mut right = vec![0.0f32; 4096];
                b.iter(|| {
                    let mut handle = Handle::new(chord_module(channels)).unwrap();
                    handle.play(PlayStart::Song(0));
                    let mut total = 0usize;
                    for _ in 0..8 {
                        total += handle.render(4096, &mut left, &mut right);
                    }
                    black_box(total)
                });
            },
        );
    }

    group.finish();
}

/// Benchmark event dispatch throughput with a trigger-dense pattern.
fn bench_event_dispatch(c: &mut Criterion) {
    c.bench_function("event_dispatch_dense", |b| {
        let dense_module = || {
            let mut module = chord_module(4);
            let mut pattern = Pattern::new(Tstamp::from_beats(1));
            for _ in 0..512 {
                pattern
                    .add_trigger(
                        0,
                        Trigger::new(Tstamp::zero(), EventType::SetForce, Value::Float(-6.0)),
                    )
                    .unwrap();
            }
            module.set_pattern(0, pattern).unwrap();
            module
        };
        let mut left = vec![0.0f32; 1024];
        let mut right = vec![0.0f32; 1024];
        b.iter(|| {
            let mut handle = Handle::new(dense_module()).unwrap();
            handle.play(PlayStart::Song(0));
            black_box(handle.render(1024, &mut left, &mut right))
        });
    });
}

criterion_group!(benches, bench_render_chunks, bench_event_dispatch);
criterion_main!(benches);
