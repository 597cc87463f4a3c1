/*
 *  status.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  Read-only publication of the controller's running statistics
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

use crate::schedule::ScheduleState;
use serde::Serialize;
use tokio::sync::watch;

/// Snapshot of the display loop as of its most recent tick. Readers (the
/// control surface, telemetry) always see the latest published copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Moving-average frame rate over the last one-second window.
    pub fps_1s: f64,
    pub frames_emitted: u64,
    pub brightness_applied: u8,
    /// Whether the last tick was power-limited.
    pub limited: bool,
    pub limited_total: u64,
    pub dimension_mismatch_count: u64,
    pub current_estimate_amps: f64,
    pub pattern_name: String,
    pub schedule_state: ScheduleState,
    pub canvas_size: (u32, u32),
    pub led_count: usize,
    /// Pending frames in the mailbox, 0 or 1 by design.
    pub queue_depth: usize,
    pub last_error: Option<String>,
}

impl Default for StatusReport {
    fn default() -> Self {
        StatusReport {
            fps_1s: 0.0,
            frames_emitted: 0,
            brightness_applied: 0,
            limited: false,
            limited_total: 0,
            dimension_mismatch_count: 0,
            current_estimate_amps: 0.0,
            pattern_name: "external".to_string(),
            schedule_state: ScheduleState::Awake,
            canvas_size: (0, 0),
            led_count: 0,
            queue_depth: 0,
            last_error: None,
        }
    }
}

pub type StatusReader = watch::Receiver<StatusReport>;

/// Controller-side handle; one `publish` per tick.
pub struct StatusPublisher {
    tx: watch::Sender<StatusReport>,
}

impl StatusPublisher {
    pub fn new() -> (StatusPublisher, StatusReader) {
        let (tx, rx) = watch::channel(StatusReport::default());
        (StatusPublisher { tx }, rx)
    }

    pub fn publish(&self, report: StatusReport) {
        self.tx.send_replace(report);
    }
}
