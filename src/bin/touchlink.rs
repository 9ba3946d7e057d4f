use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use touchlink::backends::probe_provider;
use touchlink::control::ControlLink;
use touchlink::settings::Settings;
use touchlink::status::StatusReader;
use touchlink::{channel, Config, LatencyMonitor, Poller, TouchSample};

/// Headless touch dashboard: runs the touch poller and a frame-paced consumer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(long, default_value = "config/touchlink.toml")]
    config: PathBuf,

    /// Use the scripted virtual touch panel instead of /dev/input.
    #[arg(long = "virtual")]
    virtual_device: bool,

    /// Stop after this many frames (runs forever when omitted).
    #[arg(long)]
    frames: Option<u64>,

    /// Frame rate of the consumer loop.
    #[arg(long, default_value_t = 60)]
    fps: u32,
}

fn main() -> touchlink::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    cfg.scan.virtual_device |= args.virtual_device;
    let settings = Settings::load(&cfg.paths.settings)?;
    log::info!(
        "screen {}x{}, deadzones L{}% R{}%",
        cfg.screen.width,
        cfg.screen.height,
        settings.left_stick_deadzone,
        settings.right_stick_deadzone
    );

    match ControlLink::connect(&cfg.paths.control_addr).and_then(|link| link.push_settings(&settings)) {
        Ok(n) => log::debug!("sent {n} tuning parameters"),
        Err(e) => log::warn!("tuning link unavailable: {e}"),
    }

    let (tx, mut rx) = channel();
    let poller = Poller::new(&cfg, probe_provider(&cfg.scan), tx).spawn()?;

    let frame = Duration::from_secs(1) / args.fps.max(1);
    let mut monitor = LatencyMonitor::default();
    let mut status = StatusReader::new(&cfg.paths.flight_status);
    let mut last_report = Instant::now();
    let mut frames = 0u64;

    loop {
        let started = Instant::now();

        let sample: TouchSample = monitor.update(rx.drain_latest());
        if let Some(st) = status.poll(started) {
            log::debug!(
                "flight {:.2}ms {:.0}Hz connected={} ch1={}",
                st.latency_ms,
                st.rate_hz,
                st.connected,
                st.channels[0]
            );
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            last_report = Instant::now();
            if monitor.device_present() {
                log::info!(
                    "touch {:5.2}ms peak(1s) {:4.1}ms mean {:4.2}ms pressed={} at ({}, {})",
                    sample.latency_ms,
                    monitor.peak(),
                    monitor.mean().unwrap_or_default(),
                    sample.pressed,
                    sample.x,
                    sample.y
                );
                monitor.reset_peak();
            } else {
                log::info!("touch: no device");
            }
        }

        if !rx.is_connected() {
            log::error!("touch poller stopped");
            break;
        }
        frames += 1;
        if args.frames.is_some_and(|n| frames >= n) {
            break;
        }
        if let Some(rest) = frame.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    // Dropping the receiver makes the poller exit on its next send.
    drop(rx);
    match poller.join() {
        Ok(result) => result,
        Err(_) => {
            log::error!("touch poller panicked");
            Err(touchlink::Error::PollerPanicked)
        }
    }
}
