/*
 *  pacer.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Fixed-cadence tick pacing for the display loop
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
use std::time::{Duration, Instant};

pub struct Pacer {
    next_deadline: Instant,
    frame: Duration,
}

impl Pacer {
    pub fn new(target_fps: u32) -> Self {
        let frame = Duration::from_micros((1_000_000u32 / target_fps.max(1)) as u64);
        Self { next_deadline: Instant::now(), frame }
    }

    #[inline]
    pub fn set_fps(&mut self, fps: u32) {
        self.frame = Duration::from_micros((1_000_000u32 / fps.max(1)) as u64);
    }

    /// Sleep until the next tick boundary, keeping wall-clock ticks uniform.
    /// A tick that overran its slot fires immediately and the cadence
    /// restarts from now; overruns are shed, never batched up.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next_deadline {
            std::thread::sleep(self.next_deadline - now);
            self.next_deadline += self.frame;
        } else {
            self.next_deadline = now + self.frame;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_is_roughly_uniform() {
        let mut pacer = Pacer::new(100); // 10ms ticks
        pacer.wait(); // prime
        let start = Instant::now();
        for _ in 0..10 {
            pacer.wait();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(220), "{:?}", elapsed);
    }

    #[test]
    fn test_overrun_fires_immediately() {
        let mut pacer = Pacer::new(100);
        pacer.wait();
        std::thread::sleep(Duration::from_millis(35)); // blow through deadlines
        let t = Instant::now();
        pacer.wait();
        assert!(t.elapsed() < Duration::from_millis(5));
    }
}
