use env_logger::Env;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

use lumigrid::arbiter::Arbiter;
use lumigrid::config::{self, DriverKind};
use lumigrid::controller::DisplayController;
use lumigrid::hw::mock::MockDriver;
use lumigrid::hw::BoxedDriver;
use lumigrid::ingress;
use lumigrid::layout::Layout;
use lumigrid::mailbox::FrameMailbox;
use lumigrid::schedule;
use lumigrid::status::StatusPublisher;
use lumigrid::telemetry;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Wait for SIGINT, SIGTERM or SIGHUP, then return so main can run the
/// graceful shutdown path.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!(
        "{} v{} built {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        BUILD_DATE
    );

    // Any failure from here to the spawns is fatal to startup: a daemon
    // without a valid layout or chain has nothing to do.
    let layout_path = cfg.layout_path();
    let layout = match Layout::from_file(&layout_path) {
        Ok(l) => l,
        Err(e) => {
            error!("failed to load layout {}: {}", layout_path.display(), e);
            return Err(e.into());
        }
    };
    let (w, h) = layout.canvas_size();
    let led_count = layout.led_count();
    info!("canvas {}x{}, {} LEDs on the chain", w, h, led_count);

    let driver: BoxedDriver = match cfg.driver_kind() {
        DriverKind::Mock => {
            info!("using mock chain driver (no hardware)");
            Box::new(MockDriver::new(led_count))
        }
        #[cfg(feature = "ws2812-spi")]
        DriverKind::Ws2812Spi => Box::new(lumigrid::hw::ws2812_spi::Ws2812SpiDriver::open(
            &cfg.spi_bus(),
            led_count,
        )?),
        #[cfg(not(feature = "ws2812-spi"))]
        DriverKind::Ws2812Spi => {
            error!("built without ws2812-spi support; run with --mock");
            return Err("no hardware driver available".into());
        }
    };

    let (arbiter, snapshot_rx) = Arbiter::new(layout, cfg.brightness(), cfg.power_settings());
    let mailbox = FrameMailbox::new(arbiter.subscribe());
    let (status_tx, status_rx) = StatusPublisher::new();
    let shutdown = Arc::new(AtomicBool::new(false));

    let controller = DisplayController::new(
        driver,
        snapshot_rx,
        Arc::clone(&mailbox),
        Arc::clone(&arbiter),
        status_tx,
        Arc::clone(&shutdown),
        cfg.target_fps(),
    );
    let display_thread = controller.spawn()?;

    if cfg.udp_port() > 0 {
        let port = cfg.udp_port();
        let mb = Arc::clone(&mailbox);
        tokio::spawn(async move {
            if let Err(e) = ingress::udp::run(port, mb).await {
                error!("UDP ingress failed: {}", e);
            }
        });
    }

    if let Some(pipe_path) = cfg.pipe_path() {
        // a missing FIFO directory shouldn't take the daemon down
        if let Err(e) = ingress::pipe::spawn(pipe_path, Arc::clone(&mailbox), Arc::clone(&shutdown)) {
            warn!("pipe ingress disabled: {}", e);
        }
    }

    let sleep_schedule = cfg.sleep_schedule()?;
    if sleep_schedule.enabled {
        tokio::spawn(schedule::run(sleep_schedule, Arc::clone(&arbiter)));
    }

    tokio::spawn(telemetry::run(status_rx, Duration::from_secs(10)));

    signal_handler().await?;

    info!("stopping display loop");
    shutdown.store(true, Ordering::Relaxed);
    if display_thread.join().is_err() {
        error!("display thread panicked during shutdown");
    }

    Ok(())
}
