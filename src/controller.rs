/*
 *  controller.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  The display loop: select a frame, map it, limit it, push it out
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

use crate::arbiter::{Arbiter, Snapshot};
use crate::frame::{PixelFrame, Rgb};
use crate::hw::BoxedDriver;
use crate::mailbox::FrameMailbox;
use crate::pacer::Pacer;
use crate::pattern::{PatternRunner, PatternSelection};
use crate::power;
use crate::schedule::ScheduleState;
use crate::status::{StatusPublisher, StatusReport};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::watch;

/// The only component that touches the hardware. Runs a fixed-cadence loop
/// on its own OS thread; everything it needs arrives through the snapshot
/// channel and the mailbox, so a tick never blocks on another component.
pub struct DisplayController {
    driver: BoxedDriver,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    mailbox: Arc<FrameMailbox>,
    arbiter: Arc<Arbiter>,
    status: StatusPublisher,
    shutdown: Arc<AtomicBool>,
    target_fps: u32,
}

impl DisplayController {
    pub fn new(
        driver: BoxedDriver,
        snapshot_rx: watch::Receiver<Arc<Snapshot>>,
        mailbox: Arc<FrameMailbox>,
        arbiter: Arc<Arbiter>,
        status: StatusPublisher,
        shutdown: Arc<AtomicBool>,
        target_fps: u32,
    ) -> Self {
        DisplayController {
            driver,
            snapshot_rx,
            mailbox,
            arbiter,
            status,
            shutdown,
            target_fps,
        }
    }

    /// Move the controller onto its dedicated thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("display".to_string())
            .spawn(move || self.run())
    }

    /// The loop proper. Exits when the shutdown flag is observed, leaving
    /// the chain blanked.
    pub fn run(mut self) {
        let mut pacer = Pacer::new(self.target_fps);
        let mut runner = PatternRunner::new();
        let mut phys: Vec<Rgb> = Vec::new();

        let snap = self.snapshot_rx.borrow().clone();
        let (mut width, mut height) = snap.layout.canvas_size();
        let mut last_epoch = snap.layout_epoch;
        let mut prev_schedule = ScheduleState::Awake;

        // the frame currently on the hardware, re-sent when nothing newer
        // arrives so partial chain writes cannot linger
        let mut current = PixelFrame::black(width, height);
        let mut current_sum: u64 = 0;

        let mut frames_emitted: u64 = 0;
        let mut limited_total: u64 = 0;
        let mut mismatch_count: u64 = 0;
        let mut last_error: Option<String> = None;
        let mut fps = 0.0f64;
        let mut window_start = Instant::now();
        let mut window_frames: u32 = 0;

        info!(
            "display loop started: {}x{} canvas at {} fps target",
            width, height, self.target_fps
        );

        loop {
            pacer.wait();

            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let snap: Arc<Snapshot> = self.snapshot_rx.borrow().clone();

            // adopt a swapped layout: the stale canvas is cleared rather
            // than padded or cropped, and animations restart
            if snap.layout_epoch != last_epoch {
                last_epoch = snap.layout_epoch;
                let (w, h) = snap.layout.canvas_size();
                width = w;
                height = h;
                current = PixelFrame::black(width, height);
                current_sum = 0;
                runner.reset_counter();
                debug!("adopted layout epoch {}: {}x{}", last_epoch, width, height);
            }

            let asleep = snap.schedule == ScheduleState::Asleep;
            if asleep {
                // producers keep submitting; their frames are discarded
                if self.mailbox.take().is_some() {
                    debug!("discarded frame while asleep");
                }
                if prev_schedule == ScheduleState::Awake {
                    current = PixelFrame::black(width, height);
                    current_sum = 0;
                }
            } else {
                if prev_schedule == ScheduleState::Asleep {
                    runner.reset_counter();
                }

                // a generated frame goes through the mailbox like any other
                // producer's, so latest-wins stays the single policy
                runner.apply_selection(&snap.pattern);
                if let Some(result) = runner.tick(width, height) {
                    match result {
                        Ok(frame) => {
                            let _ = self.mailbox.submit(frame);
                        }
                        Err(e) => {
                            warn!("{}; reverting to external frames", e);
                            last_error = Some(e.to_string());
                            let _ = self.arbiter.set_pattern(PatternSelection::External);
                        }
                    }
                }

                match self.mailbox.take() {
                    Some((frame, _tag)) => {
                        if frame.dimensions() == (width, height) {
                            current_sum = frame.channel_sum();
                            current = frame;
                        } else {
                            // stale producer racing a layout swap
                            mismatch_count += 1;
                            debug!(
                                "dropped {:?} frame for {}x{} canvas",
                                frame.dimensions(),
                                width,
                                height
                            );
                        }
                    }
                    None => {} // refresh the hardware with the previous frame
                }
            }
            prev_schedule = snap.schedule;

            let outcome = power::limit_brightness(
                current_sum,
                snap.index_table.led_count(),
                snap.brightness,
                &snap.power,
            );
            if outcome.limited {
                limited_total += 1;
            }

            snap.index_table.map_frame(&current, &mut phys);
            if let Err(e) = self.driver.render(&phys, outcome.applied) {
                // chain glitches are not fatal; the next tick is the retry
                error!("hardware render failed: {}", e);
                last_error = Some(format!("hardware: {}", e));
            }

            frames_emitted += 1;
            window_frames += 1;
            let elapsed = window_start.elapsed();
            if elapsed.as_secs_f64() >= 1.0 {
                fps = window_frames as f64 / elapsed.as_secs_f64();
                window_frames = 0;
                window_start = Instant::now();
            }

            self.status.publish(StatusReport {
                fps_1s: fps,
                frames_emitted,
                brightness_applied: outcome.applied,
                limited: outcome.limited,
                limited_total,
                dimension_mismatch_count: mismatch_count,
                current_estimate_amps: outcome.estimate_amps,
                pattern_name: snap.pattern.name().to_string(),
                schedule_state: snap.schedule,
                canvas_size: (width, height),
                led_count: snap.index_table.led_count(),
                queue_depth: self.mailbox.depth(),
                last_error: last_error.clone(),
            });
        }

        if let Err(e) = self.driver.blank() {
            warn!("failed to blank chain on shutdown: {}", e);
        }
        info!("display loop stopped after {} frames", frames_emitted);
    }
}
