/*
 *  tests/pipeline_integration.rs
 *
 *  LumiGrid - every pixel in its place
 *  (c) 2023-26 the LumiGrid authors
 *
 *  End-to-end pipeline tests against the mock chain driver
 */

use lumigrid::arbiter::Arbiter;
use lumigrid::controller::DisplayController;
use lumigrid::frame::{PixelFrame, Rgb};
use lumigrid::hw::mock::{MockDriver, MockState};
use lumigrid::layout::{GridDoc, Layout, LayoutDoc, PanelDoc, Wiring};
use lumigrid::mailbox::{FrameMailbox, SubmitError};
use lumigrid::pattern::{PatternParams, PatternSelection};
use lumigrid::power::PowerSettings;
use lumigrid::schedule::ScheduleState;
use lumigrid::status::{StatusPublisher, StatusReader, StatusReport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The reference grid: 2x2 of 16x16 snake-wired panels, chain order
/// (0,0), (1,0), (1,1), (0,1), bottom row mounted upside down.
fn reference_doc() -> LayoutDoc {
    LayoutDoc {
        grid: GridDoc {
            grid_width: 2,
            grid_height: 2,
            panel_width: 16,
            panel_height: 16,
            wiring_pattern: Wiring::Snake,
        },
        panels: vec![
            PanelDoc { id: 0, position: [0, 0], rotation: 0 },
            PanelDoc { id: 1, position: [1, 0], rotation: 0 },
            PanelDoc { id: 2, position: [1, 1], rotation: 180 },
            PanelDoc { id: 3, position: [0, 1], rotation: 180 },
        ],
    }
}

fn small_doc() -> LayoutDoc {
    let mut doc = reference_doc();
    doc.grid.panel_width = 8;
    doc.grid.panel_height = 8;
    doc
}

struct Harness {
    arbiter: Arc<Arbiter>,
    mailbox: Arc<FrameMailbox>,
    status: StatusReader,
    driver_state: Arc<Mutex<MockState>>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    fn start(doc: &LayoutDoc, fps: u32, power: PowerSettings, brightness: u8) -> Harness {
        let layout = Layout::parse(doc).unwrap();
        let led_count = layout.led_count();

        let driver = MockDriver::new(led_count);
        let driver_state = driver.state();

        let (arbiter, snapshot_rx) = Arbiter::new(layout, brightness, power);
        let mailbox = FrameMailbox::new(arbiter.subscribe());
        let (status_tx, status) = StatusPublisher::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let controller = DisplayController::new(
            Box::new(driver),
            snapshot_rx,
            Arc::clone(&mailbox),
            Arc::clone(&arbiter),
            status_tx,
            Arc::clone(&shutdown),
            fps,
        );
        let thread = controller.spawn().unwrap();

        Harness {
            arbiter,
            mailbox,
            status,
            driver_state,
            shutdown,
            thread: Some(thread),
        }
    }

    fn last_frame(&self) -> Vec<Rgb> {
        self.driver_state.lock().unwrap().last_frame.clone()
    }

    fn last_brightness(&self) -> Option<u8> {
        self.driver_state.lock().unwrap().last_brightness
    }

    fn report(&self) -> StatusReport {
        self.status.borrow().clone()
    }

    /// Poll until the predicate holds or the deadline passes.
    fn wait_until<F: FnMut(&Harness) -> bool>(&self, timeout: Duration, mut pred: F) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if pred(self) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        pred(self)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

#[test]
fn red_origin_pixel_lands_on_first_led() {
    let h = Harness::start(&reference_doc(), 60, PowerSettings::default(), 128);

    let mut frame = PixelFrame::black(32, 32);
    frame.set(0, 0, Rgb::new(255, 0, 0));
    h.mailbox.submit(frame).unwrap();

    assert!(h.wait_until(Duration::from_secs(2), |h| {
        let f = h.last_frame();
        f.len() == 1024 && f[0] == Rgb::new(255, 0, 0)
    }));

    let f = h.last_frame();
    assert!(f[1..].iter().all(|&p| p == Rgb::BLACK));
}

#[test]
fn latest_submission_wins() {
    let h = Harness::start(&reference_doc(), 60, PowerSettings::default(), 128);

    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::new(10, 0, 0)))
        .unwrap();
    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::new(0, 20, 0)))
        .unwrap();

    assert!(h.wait_until(Duration::from_secs(2), |h| {
        h.last_frame().first() == Some(&Rgb::new(0, 20, 0))
    }));

    // the second frame stays up; the first never reappears
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(h.last_frame()[0], Rgb::new(0, 20, 0));
}

#[test]
fn full_white_frame_is_power_clamped() {
    let power = PowerSettings {
        enabled: true,
        ceiling_amps: 5.0,
        amps_per_led: 0.06,
        idle_amps_per_led: 0.0,
    };
    let h = Harness::start(&reference_doc(), 60, power, 255);

    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::WHITE))
        .unwrap();

    // 783360 channel sum at 255 would draw ~184A; the limiter lands on 6
    assert!(h.wait_until(Duration::from_secs(2), |h| h.last_brightness() == Some(6)));

    let report = h.report();
    assert!(report.limited);
    assert!(report.limited_total >= 1);
    assert!(report.current_estimate_amps <= 5.0);
}

#[test]
fn hot_reload_swaps_canvas_without_stopping() {
    let h = Harness::start(&reference_doc(), 60, PowerSettings::default(), 128);

    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::new(5, 5, 5)))
        .unwrap();
    assert!(h.wait_until(Duration::from_secs(2), |h| h.last_frame().len() == 1024));

    h.arbiter.set_layout(&small_doc()).unwrap();

    // frames for the old canvas are rejected outright now
    let stale = h.mailbox.submit(PixelFrame::black(32, 32));
    assert!(matches!(stale, Err(SubmitError::DimensionMismatch { .. })));

    // status reflects the new canvas within a tick or two
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        h.report().canvas_size == (16, 16)
    }));
    assert_eq!(h.report().led_count, 256);

    // a generator picks up the new dimensions immediately
    h.arbiter
        .set_pattern(PatternSelection::Internal {
            name: "solid".to_string(),
            params: PatternParams {
                color: Some([0, 0, 77]),
                ..Default::default()
            },
        })
        .unwrap();

    assert!(h.wait_until(Duration::from_secs(2), |h| {
        let f = h.last_frame();
        f.len() == 256 && f.iter().all(|&p| p == Rgb::new(0, 0, 77))
    }));
}

#[test]
fn failing_pattern_reverts_to_external() {
    let h = Harness::start(&reference_doc(), 60, PowerSettings::default(), 128);

    h.arbiter
        .set_pattern(PatternSelection::Internal {
            name: "selftest_fault".to_string(),
            params: PatternParams::default(),
        })
        .unwrap();

    // two good red frames, then the injected failure
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        let r = h.report();
        r.pattern_name == "external" && r.last_error.is_some()
    }));

    let report = h.report();
    assert!(report.last_error.unwrap().contains("selftest_fault"));

    // the last successful frame stays on the chain
    assert_eq!(h.last_frame()[0], Rgb::new(255, 0, 0));
}

#[test]
fn asleep_blanks_output_and_discards_frames() {
    let h = Harness::start(&reference_doc(), 60, PowerSettings::default(), 128);

    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::WHITE))
        .unwrap();
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        h.last_frame().first().map(|p| p.channel_sum() > 0) == Some(true)
    }));

    h.arbiter.set_schedule(ScheduleState::Asleep);
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        let f = h.last_frame();
        !f.is_empty() && f.iter().all(|&p| p == Rgb::BLACK)
    }));
    assert_eq!(h.report().schedule_state, ScheduleState::Asleep);

    // submissions are accepted but never displayed
    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::WHITE))
        .unwrap();
    std::thread::sleep(Duration::from_millis(150));
    assert!(h.last_frame().iter().all(|&p| p == Rgb::BLACK));

    // waking resumes output
    h.arbiter.set_schedule(ScheduleState::Awake);
    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::new(0, 9, 0)))
        .unwrap();
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        h.last_frame().first() == Some(&Rgb::new(0, 9, 0))
    }));
}

#[test]
fn brightness_change_applies_within_a_tick() {
    let h = Harness::start(&reference_doc(), 60, PowerSettings::default(), 128);

    h.mailbox
        .submit(PixelFrame::filled(32, 32, Rgb::new(1, 1, 1)))
        .unwrap();
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        h.last_brightness() == Some(128)
    }));

    h.arbiter.set_brightness(10);
    assert!(h.wait_until(Duration::from_secs(2), |h| {
        h.last_brightness() == Some(10)
    }));
}

#[test]
fn cadence_holds_near_target_fps() {
    let h = Harness::start(&reference_doc(), 30, PowerSettings::default(), 128);

    // settle, then measure one second of emission
    std::thread::sleep(Duration::from_millis(200));
    let start = h.report().frames_emitted;
    std::thread::sleep(Duration::from_secs(1));
    let emitted = h.report().frames_emitted - start;

    assert!((24..=36).contains(&emitted), "emitted {} frames", emitted);
}

#[test]
fn stalled_render_sheds_frames_without_queueing() {
    let h = Harness::start(&reference_doc(), 30, PowerSettings::default(), 128);
    h.driver_state.lock().unwrap().render_delay = Some(Duration::from_millis(100));

    // flood the mailbox while the chain crawls
    let stop = Arc::new(AtomicBool::new(false));
    let feeder = {
        let mailbox = Arc::clone(&h.mailbox);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut i = 0u8;
            while !stop.load(Ordering::Relaxed) {
                i = i.wrapping_add(1);
                let _ = mailbox.submit(PixelFrame::filled(32, 32, Rgb::new(i, 0, 0)));
                std::thread::sleep(Duration::from_millis(5));
            }
        })
    };

    std::thread::sleep(Duration::from_millis(300));
    let start = h.report().frames_emitted;
    let t0 = Instant::now();
    std::thread::sleep(Duration::from_millis(1200));
    let emitted = h.report().frames_emitted - start;
    let secs = t0.elapsed().as_secs_f64();

    stop.store(true, Ordering::Relaxed);
    feeder.join().unwrap();

    // ~10 fps against a 100ms render; no backlog beyond the single slot
    let fps = emitted as f64 / secs;
    assert!(fps < 15.0, "measured {:.1} fps", fps);
    assert!(fps > 5.0, "measured {:.1} fps", fps);
    assert!(h.report().queue_depth <= 1);
}
