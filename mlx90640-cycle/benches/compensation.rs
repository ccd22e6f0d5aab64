// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use mlx90640_cycle::calculations::compensate;
use mlx90640_cycle::{
    AccessPattern, Mlx90640Calibration, Mlx90640Driver, RawFrame, Resolution, Subpage,
    NUM_PIXELS,
};
use mlx90640_cycle_test_data::{datasheet_mlx90640_at_address, datasheet_ram, mlx90640_datasheet_eeprom};

pub fn criterion_benchmark(c: &mut Criterion) {
    let calibration = Mlx90640Calibration::from_words(&mlx90640_datasheet_eeprom()).unwrap();
    let raw = RawFrame::from(datasheet_ram());
    let mut group = c.benchmark_group("Compensation");

    for (name, access_pattern) in [
        ("chess", AccessPattern::Chess),
        ("interleave", AccessPattern::Interleave),
    ] {
        group.bench_function(name, |b| {
            let mut temperatures = [0f32; NUM_PIXELS];
            b.iter(|| {
                compensate(
                    &calibration,
                    &raw,
                    Subpage::Zero,
                    access_pattern,
                    Resolution::Eighteen,
                    &mut temperatures,
                )
            })
        });
    }

    // A whole acquisition cycle through the driver: poll, 26 row reads and the compensation tick.
    group.bench_function("driver cycle", |b| {
        b.iter_batched(
            || {
                let mut bus = datasheet_mlx90640_at_address(0x33);
                let mut driver = Mlx90640Driver::new(bus.clone(), 0x33).unwrap();
                driver.set_cycling(true);
                bus.set_data_available(true);
                driver
            },
            |mut driver| while !driver.tick().unwrap() {},
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
