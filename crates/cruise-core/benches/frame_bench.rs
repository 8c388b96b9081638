//! Criterion benchmarks for the text frame codec.
//!
//! A drag gesture emits a command frame on every touch update, so encoding
//! sits on the input hot path.
//!
//! Run with:
//! ```bash
//! cargo bench --package cruise-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use cruise_core::{decode_frame, encode_frame, Axis, Command, CommandValue, Frame};

// ── Frame fixtures ────────────────────────────────────────────────────────────

fn make_angle() -> Frame {
    Frame::Command(Command::new(
        Axis::Angle,
        CommandValue::from_hundredths(-37).expect("valid fixture"),
    ))
}

fn make_speed_full() -> Frame {
    Frame::Command(Command::new(Axis::Speed, CommandValue::MAX))
}

fn make_release() -> Frame {
    Frame::Command(Command::release(Axis::Angle))
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let frames = [
        ("Start", Frame::Start),
        ("Angle", make_angle()),
        ("SpeedFull", make_speed_full()),
        ("Release", make_release()),
    ];

    let mut group = c.benchmark_group("encode_frame");
    for (name, frame) in &frames {
        group.bench_with_input(BenchmarkId::new("frame", name), frame, |b, frame| {
            b.iter(|| encode_frame(black_box(frame)))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let texts = ["start", "angle: -0.37", "speed: 1.00", "angle: 0.00"];

    let mut group = c.benchmark_group("decode_frame");
    for text in texts {
        group.bench_with_input(BenchmarkId::new("text", text), text, |b, text| {
            b.iter(|| decode_frame(black_box(text)).expect("decode must succeed"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
