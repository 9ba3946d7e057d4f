//! The touch polling loop.
//!
//! A two-state machine that owns at most one open device:
//!
//! - **`NoDevice`**: emit a sentinel sample every iteration and rescan no more
//!   often than `rescan_interval`. A successful rescan grabs the device and
//!   moves to `Active`.
//! - **`Active`**: wait up to `poll_timeout` for the device to become readable.
//!   Decoded events update the pending position and touch state; every
//!   `SYN_REPORT` emits one sample whose latency is the time since the wait
//!   began. A timeout with nothing to read emits one sample with the unchanged
//!   state, so the consumer never starves for more than one polling period.
//!
//! Losing the device (`ENODEV`) drops it, forces `pressed = false`, emits a
//! sentinel immediately and returns to `NoDevice`. Any other read error is
//! fatal and propagated; the supervisor is expected to restart the process.
//!
//! When no device is present at startup the poller keeps rescanning
//! indefinitely rather than giving up.

use crate::calibration::Calibration;
use crate::config::Config;
use crate::device::{is_device_lost, DeviceProvider, TouchDevice};
use crate::error::{Error, Result};
use crate::event::{Axis, RawEvent, BTN_TOUCH};
use crate::ipc::SampleSink;
use crate::sample::TouchSample;
use crate::scanner::Scanner;
use std::io;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Time source for the poller. Injected so tests can drive the rescan backoff.
pub trait Clock: Send {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);
}

/// Wall-clock time and real sleeps.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    NoDevice,
    Active,
}

/// Timing knobs, resolved from [`Config`].
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub poll_timeout: Duration,
    pub rescan_interval: Duration,
    pub idle_sleep: Duration,
    pub loop_sleep: Duration,
}

impl From<&Config> for Timing {
    fn from(cfg: &Config) -> Self {
        Self {
            poll_timeout: cfg.poll.timeout(),
            rescan_interval: cfg.poll.rescan_interval(),
            idle_sleep: cfg.poll.idle_sleep(),
            loop_sleep: cfg.poll.loop_sleep(),
        }
    }
}

pub struct Poller<S, C = SystemClock> {
    provider: Box<dyn DeviceProvider>,
    scanner: Scanner,
    sink: S,
    clock: C,
    timing: Timing,
    screen: (u32, u32),
    default_axis_max: i32,

    device: Option<Box<dyn TouchDevice>>,
    calibration: Calibration,
    last_scan: Instant,
    pressed: bool,
    x: i32,
    y: i32,
}

impl<S: SampleSink> Poller<S, SystemClock> {
    pub fn new(cfg: &Config, provider: Box<dyn DeviceProvider>, sink: S) -> Self {
        Self::with_clock(cfg, provider, sink, SystemClock)
    }
}

impl<S: SampleSink, C: Clock> Poller<S, C> {
    /// Build the poller and run the initial scan.
    pub fn with_clock(cfg: &Config, provider: Box<dyn DeviceProvider>, sink: S, clock: C) -> Self {
        let (width, height) = (cfg.screen.width, cfg.screen.height);
        let default_axis_max = cfg.screen.default_axis_max;
        let mut poller = Self {
            provider,
            scanner: Scanner::new(&cfg.scan),
            sink,
            timing: Timing::from(cfg),
            screen: (width, height),
            default_axis_max,
            device: None,
            calibration: Calibration::new(None, None, width, height, default_axis_max),
            last_scan: clock.now(),
            clock,
            pressed: false,
            x: 0,
            y: 0,
        };

        log::info!("initial scan for touchscreen");
        match poller.scanner.open(poller.provider.as_mut()) {
            Some(dev) => poller.attach(dev),
            None => log::warn!("no touchscreen found initially, will keep rescanning"),
        }
        poller
    }

    pub fn state(&self) -> State {
        if self.device.is_some() {
            State::Active
        } else {
            State::NoDevice
        }
    }

    /// Metadata of the open device, if any.
    pub fn device(&self) -> Option<&dyn TouchDevice> {
        self.device.as_deref()
    }

    fn attach(&mut self, dev: Box<dyn TouchDevice>) {
        let (w, h) = self.screen;
        self.calibration = Calibration::new(
            dev.axis_range(Axis::X),
            dev.axis_range(Axis::Y),
            w,
            h,
            self.default_axis_max,
        );
        log::info!(
            "touch device active: {} (x max {}, y max {})",
            dev.name(),
            self.calibration.x.device_max(),
            self.calibration.y.device_max()
        );
        self.device = Some(dev);
    }

    /// Run one loop iteration. Returns the number of samples emitted.
    pub fn step(&mut self) -> Result<usize> {
        if self.device.is_none() {
            return self.step_no_device();
        }

        match self.poll_device() {
            Ok(samples) => {
                let n = samples.len();
                for s in samples {
                    self.sink.send(s)?;
                }
                Ok(n)
            }
            Err(e) if is_device_lost(&e) => {
                log::warn!("touch device lost, re-scanning");
                self.device = None;
                self.pressed = false;
                self.sink.send(TouchSample::sentinel())?;
                Ok(1)
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn step_no_device(&mut self) -> Result<usize> {
        self.sink.send(TouchSample::sentinel())?;

        let now = self.clock.now();
        if now.duration_since(self.last_scan) >= self.timing.rescan_interval {
            self.last_scan = now;
            if let Some(dev) = self.scanner.open(self.provider.as_mut()) {
                self.attach(dev);
            }
        }
        Ok(1)
    }

    /// Wait for and decode whatever the device has. Never forwards a partial report.
    fn poll_device(&mut self) -> io::Result<Vec<TouchSample>> {
        let Some(dev) = self.device.as_mut() else {
            return Ok(Vec::new());
        };
        let start = self.clock.now();

        if !dev.wait_readable(self.timing.poll_timeout)? {
            return Ok(vec![self.sample_since(start)]);
        }

        let events = dev.read_events()?;
        let mut out = Vec::new();
        for ev in events {
            #[cfg(feature = "debug-log")]
            log::trace!("[TOUCH/EVENT] {ev:?}");

            match ev {
                RawEvent::Abs { code, value } => {
                    if let Some(axis) = Axis::from_abs_code(code) {
                        let v = self.calibration.map(axis, value);
                        match axis {
                            Axis::X => self.x = v,
                            Axis::Y => self.y = v,
                        }
                    }
                }
                RawEvent::Key { code: BTN_TOUCH, value } => self.pressed = value != 0,
                ev if ev.is_report_boundary() => out.push(self.sample_since(start)),
                _ => {}
            }
        }
        Ok(out)
    }

    fn sample_since(&self, start: Instant) -> TouchSample {
        let elapsed = self.clock.now().saturating_duration_since(start);
        TouchSample::new(elapsed.as_secs_f64() * 1000.0, self.pressed, self.x, self.y)
    }

    /// Loop until the consumer hangs up or a fatal error occurs.
    pub fn run(mut self) -> Result<()> {
        loop {
            let idle = self.device.is_none();
            match self.step() {
                Ok(_) => {}
                Err(Error::ChannelClosed) => {
                    log::info!("sample channel closed, poller exiting");
                    return Ok(());
                }
                Err(e) => {
                    log::error!("touch poller failed: {e}");
                    return Err(e);
                }
            }
            self.clock.sleep(if idle {
                self.timing.idle_sleep
            } else {
                self.timing.loop_sleep
            });
        }
    }
}

impl<S: SampleSink + 'static, C: Clock + 'static> Poller<S, C> {
    /// Run the loop on its own thread.
    pub fn spawn(self) -> io::Result<JoinHandle<Result<()>>> {
        std::thread::Builder::new()
            .name("touch-poller".into())
            .spawn(move || self.run())
    }
}
