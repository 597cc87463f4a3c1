/*
 *  telemetry.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Host metrics from /proc and /sys, folded into a periodic draw report
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

use crate::status::StatusReader;
use log::debug;
use std::fs;
use std::io;
use std::time::Duration;

/// Point-in-time host readings. Missing or unreadable sources read as 0.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SystemSample {
    pub cpu_load_pct: f64,
    pub cpu_temp_c: f64,
    pub up_time_hours: f64,
}

fn read_first_float(path: &str) -> io::Result<f64> {
    let content = fs::read_to_string(path)?;
    let first_word = content.split_whitespace().next().unwrap_or("0.0");
    first_word
        .parse::<f64>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

impl SystemSample {
    /// 1-minute load average as a percentage, 0.0 on error.
    fn cpu_load() -> f64 {
        match read_first_float("/proc/loadavg") {
            Ok(loadavg) => 100.0 * loadavg,
            Err(_) => 0.0,
        }
    }

    /// CPU temperature in Celsius from the first thermal zone.
    fn cpu_temp() -> f64 {
        match read_first_float("/sys/class/thermal/thermal_zone0/temp") {
            Ok(millideg) => millideg / 1000.0,
            Err(_) => 0.0,
        }
    }

    /// System uptime in hours.
    fn up_time() -> f64 {
        match read_first_float("/proc/uptime") {
            Ok(seconds) => seconds / 3600.0,
            Err(_) => 0.0,
        }
    }

    pub fn read() -> SystemSample {
        SystemSample {
            cpu_load_pct: Self::cpu_load(),
            cpu_temp_c: Self::cpu_temp(),
            up_time_hours: Self::up_time(),
        }
    }
}

/// Background task: sample the host and the display stats on a fixed period
/// and leave a breadcrumb in the debug log. Purely observational.
pub async fn run(status: StatusReader, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let host = SystemSample::read();
        let report = status.borrow().clone();
        debug!(
            "telemetry: cpu {:.0}% {:.1}C, fps {:.1}, draw {:.2}A, brightness {}{}",
            host.cpu_load_pct,
            host.cpu_temp_c,
            report.fps_1s,
            report.current_estimate_amps,
            report.brightness_applied,
            if report.limited { " (limited)" } else { "" },
        );
    }
}
