// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use std::env;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use linux_embedded_hal::I2cdev;
use mlx90640_cycle::{Mlx90640Driver, WIDTH};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        bail!("Two arguments required: <I2C bus> <camera address>");
    }
    let address: u8 = match args[2].strip_prefix("0x") {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16)?,
        None => args[2].parse()?,
    };
    let bus = I2cdev::new(&args[1]).with_context(|| format!("Unable to open {}", args[1]))?;
    let mut camera = Mlx90640Driver::new(bus, address)?;
    println!("Camera {}", camera.serial_number()?);
    camera.set_cycling(true);
    // One image needs a pass over each subpage.
    let mut passes = 0;
    while passes < 2 {
        if camera.tick()? {
            passes += 1;
        } else {
            sleep(Duration::from_millis(1));
        }
    }
    if let Some(ambient) = camera.ambient_temperature() {
        println!("Ambient: {:4.2}", ambient);
    }
    print_temperatures(camera.temperatures());
    println!();
    Ok(())
}

fn print_temperatures(temperatures: &[f32]) {
    for (count, temperature) in temperatures.iter().enumerate() {
        if count % WIDTH == 0 {
            println!();
        }
        print!("{:4.2}  ", temperature);
    }
}
