//! touchlink: touchscreen acquisition for an RC flight-controller dashboard.
//!
//! A poller thread owns the one touch device, decodes its reports, and sends
//! `(latency_ms, pressed, x, y)` samples down a one-way channel; the render
//! loop drains that channel once per frame and keeps only the newest sample.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod calibration;
pub mod config;
pub mod control;
pub mod crsf;
pub mod device;
pub mod error;
pub mod event;
pub mod ipc;
pub mod metadata;
pub mod monitor;
pub mod poller;
pub mod sample;
pub mod scanner;
pub mod settings;
pub mod status;
pub mod tuning;

pub use config::Config;
pub use device::{DeviceProvider, TouchDevice};
pub use error::{Error, Result};
pub use event::*;
pub use ipc::{channel, SampleReceiver, SampleSender, SampleSink};
pub use monitor::LatencyMonitor;
pub use poller::{Clock, Poller, State, SystemClock};
pub use sample::TouchSample;
pub use scanner::Scanner;
