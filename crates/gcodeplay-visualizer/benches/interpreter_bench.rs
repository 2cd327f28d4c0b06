//! Interpreter and playback benchmarks
//!
//! Run with: cargo bench -p gcodeplay-visualizer

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gcodeplay_settings::Config;
use gcodeplay_visualizer::{parse_str, PlaybackDriver, VoxelSimulator};

/// A layered square spiral with an arc at every corner
fn synthetic_program(layers: usize) -> String {
    let mut program = String::from("; generated by PrusaSlicer\nG21\nG90\n");
    for layer in 0..layers {
        let z = 0.2 * (layer + 1) as f64;
        program.push_str(&format!("G0 Z{:.2}\n;TYPE:External perimeter\n", z));
        for ring in 0..10 {
            let lo = ring as f64;
            let hi = 40.0 - ring as f64;
            program.push_str(&format!(
                "G1 X{lo} Y{lo} E0.5\nG1 X{hi} Y{lo} E0.5\nG1 X{hi} Y{hi} E0.5\nG3 X{lo} Y{hi} R{r} E0.5\n",
                r = hi - lo,
            ));
        }
    }
    program
}

fn parse_benchmark(c: &mut Criterion) {
    let config = Config::default();
    let program = synthetic_program(50);
    c.bench_function("parse_50_layers", |b| {
        b.iter(|| parse_str(black_box(&program), &config))
    });
}

fn scrub_benchmark(c: &mut Criterion) {
    let config = Config::default();
    let Ok(output) = parse_str(&synthetic_program(50), &config) else {
        return;
    };
    let last = output.store.max_offset().unwrap_or(0);
    c.bench_function("scrub_full_pass", |b| {
        let mut driver = PlaybackDriver::new(&output.store, &output.registry, &config);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            driver.advance(black_box(if flip { last } else { 0 }))
        })
    });
}

fn voxel_benchmark(c: &mut Criterion) {
    let config = Config::default();
    let Ok(output) = parse_str(&synthetic_program(10), &config) else {
        return;
    };
    c.bench_function("voxel_build_10_layers", |b| {
        b.iter(|| VoxelSimulator::build(&output.store, &output.registry, &config.voxel))
    });
}

criterion_group!(benches, parse_benchmark, scrub_benchmark, voxel_benchmark);
criterion_main!(benches);
