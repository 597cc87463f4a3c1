/*
 *  hw/mock.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Mock chain driver for tests and hardware-free operation
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
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Simulated chain driver.
///
/// Used by the daemon's `--mock` mode and throughout the test suite. Every
/// operation is recorded in a shared state block that tests can inspect, and
/// failure/latency switches let the error and overload paths be exercised
/// without hardware.
pub struct MockDriver {
    led_count: usize,
    state: Arc<Mutex<MockState>>,
}

/// Shared recording of everything the driver was asked to do.
#[derive(Debug, Default)]
pub struct MockState {
    /// Number of render() calls, including failed ones.
    pub render_count: usize,

    /// Pixels of the most recent successful render.
    pub last_frame: Vec<Rgb>,

    /// Brightness of the most recent successful render.
    pub last_brightness: Option<u8>,

    /// Every (first pixel, brightness) pair seen, oldest first.
    pub render_log: Vec<(Rgb, u8)>,

    /// Simulate a failing chain: every render returns an I/O error.
    pub fail_render: bool,

    /// Simulate a slow chain: every render blocks this long.
    pub render_delay: Option<Duration>,
}

impl MockDriver {
    pub fn new(led_count: usize) -> Self {
        MockDriver {
            led_count,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Handle for inspecting (and steering) the driver from a test.
    pub fn state(&self) -> Arc<Mutex<MockState>> {
        Arc::clone(&self.state)
    }

    /// Count of lit pixels in the last rendered frame.
    pub fn lit_pixels(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .last_frame
            .iter()
            .filter(|p| p.channel_sum() > 0)
            .count()
    }
}

impl LedDriver for MockDriver {
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

        let delay = {
            let mut state = self.state.lock().unwrap();
            state.render_count += 1;

            if state.fail_render {
                return Err(DriverError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "simulated render failure",
                )));
            }

            state.last_frame = pixels.to_vec();
            state.last_brightness = Some(brightness);
            state
                .render_log
                .push((pixels.first().copied().unwrap_or(Rgb::BLACK), brightness));
            state.render_delay
        };

        // block outside the lock so tests can observe state mid-render
        if let Some(d) = delay {
            std::thread::sleep(d);
        }
        Ok(())
    }
}
