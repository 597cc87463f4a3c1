/*
 *  hw/mod.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  LED chain driver abstraction
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

pub mod mock;

#[cfg(feature = "ws2812-spi")]
pub mod ws2812_spi;

use crate::frame::Rgb;
use thiserror::Error;

/// Unified error type for chain drivers.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("driver initialization failed: {0}")]
    Init(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("buffer size mismatch: expected {expected} pixels, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[error("invalid driver configuration: {0}")]
    Config(String),
}

/// The blocking render primitive the display controller drives.
///
/// Implementations own the wire protocol to the chain. `render` is called
/// from the controller thread only, with pixels already in physical chain
/// order; no other component touches the hardware.
pub trait LedDriver: Send {
    /// LEDs on the chain this driver was opened for.
    fn led_count(&self) -> usize;

    /// Push one frame. `pixels.len()` must equal `led_count()`; brightness
    /// is a linear 0-255 scale applied at emission.
    fn render(&mut self, pixels: &[Rgb], brightness: u8) -> Result<(), DriverError>;

    /// Blank the chain, typically on shutdown.
    fn blank(&mut self) -> Result<(), DriverError> {
        let black = vec![Rgb::BLACK; self.led_count()];
        self.render(&black, 0)
    }
}

pub type BoxedDriver = Box<dyn LedDriver>;
