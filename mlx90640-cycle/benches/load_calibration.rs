// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use criterion::{criterion_group, criterion_main, Criterion};

use mlx90640_cycle::{FromI2C, Mlx90640Calibration};
use mlx90640_cycle_test_data::{datasheet_mlx90640_at_address, mlx90640_datasheet_eeprom};

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Calibration Loading");

    group.bench_with_input("from words", &mlx90640_datasheet_eeprom(), |b, eeprom| {
        b.iter(|| Mlx90640Calibration::from_words(eeprom))
    });
    // Includes the 26 chunked reads from the mocked EEPROM.
    group.bench_function("from I²C", |b| {
        let mut bus = datasheet_mlx90640_at_address(0x33);
        b.iter(|| {
            bus.clear_recent_operations();
            Mlx90640Calibration::from_i2c(&mut bus, 0x33)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
