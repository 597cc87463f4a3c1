/*
 *  hw/ws2812_spi.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  WS2812B chain over a Linux spidev device
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::frame::Rgb;
use crate::hw::{DriverError, LedDriver};
use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
use log::info;
use std::io::Write;

/// 4 SPI bits encode one data bit at 3.2 MHz: "1000" ~ a WS2812 zero,
/// "1110" ~ a one. One byte therefore carries two data bits, indexed here by
/// their values.
const BIT_PATTERNS: [u8; 4] = [0b1000_1000, 0b1000_1110, 0b1110_1000, 0b1110_1110];

/// 3 channels x 4 encoded bytes each.
const BYTES_PER_LED: usize = 12;

/// >50us of line-low after the data, the chain's latch condition.
const RESET_BYTES: usize = 60;

const SPI_HZ: u32 = 3_200_000;

/// WS2812B driver writing the encoded bit stream through `/dev/spidevX.Y`.
/// The encode buffer is allocated once and reused every frame.
pub struct Ws2812SpiDriver {
    spi: Spidev,
    led_count: usize,
    tx: Vec<u8>,
}

impl Ws2812SpiDriver {
    pub fn open(bus: &str, led_count: usize) -> Result<Self, DriverError> {
        let mut spi = Spidev::open(bus)
            .map_err(|e| DriverError::Init(format!("open {}: {}", bus, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| DriverError::Init(format!("configure {}: {}", bus, e)))?;

        info!("WS2812 SPI driver on {} ({} LEDs)", bus, led_count);

        Ok(Ws2812SpiDriver {
            spi,
            led_count,
            tx: vec![0u8; led_count * BYTES_PER_LED + RESET_BYTES],
        })
    }

    /// Expand one channel byte into its four encoded SPI bytes.
    #[inline]
    fn encode_channel(mut value: u8, out: &mut [u8]) {
        for slot in out.iter_mut().take(4) {
            *slot = BIT_PATTERNS[((value & 0b1100_0000) >> 6) as usize];
            value <<= 2;
        }
    }
}

impl LedDriver for Ws2812SpiDriver {
    fn led_count(&self) -> usize {
        self.led_count
    }

    fn render(&mut self, pixels: &[Rgb], brightness: u8) -> Result<(), DriverError> {
        if pixels.len() != self.led_count {
            return Err(DriverError::BufferSizeMismatch {
                expected: self.led_count,
                actual: pixels.len(),
            });
        }

        let scale = brightness as u16;
        for (i, px) in pixels.iter().enumerate() {
            // linear brightness scale, then GRB channel order on the wire
            let g = ((px.g as u16 * scale) / 255) as u8;
            let r = ((px.r as u16 * scale) / 255) as u8;
            let b = ((px.b as u16 * scale) / 255) as u8;

            let base = i * BYTES_PER_LED;
            Self::encode_channel(g, &mut self.tx[base..base + 4]);
            Self::encode_channel(r, &mut self.tx[base + 4..base + 8]);
            Self::encode_channel(b, &mut self.tx[base + 8..base + 12]);
        }
        // trailing RESET_BYTES stay zero as the latch gap

        self.spi.write_all(&self.tx)?;
        Ok(())
    }
}
