//! Flight-status file reader.
//!
//! The flight-control process rewrites a small text file (default
//! `/tmp/flight_status.txt`) with whitespace-separated `key:value` tokens:
//!
//! ```text
//! latency_ms:1.25 rate_hz:250 connected:1 ch1:992 ch2:172 raw_lx:-1200 tunedid0:880
//! ```
//!
//! Unknown keys are ignored; a malformed value leaves its field at the previous
//! default rather than rejecting the whole line.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const CHANNELS: usize = 16;
pub const SIGNALS: usize = 23;

/// Minimum spacing between file reads.
pub const READ_INTERVAL: Duration = Duration::from_millis(50);

/// Raw stick axes as reported by the controller (±32767).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticks {
    pub lx: i32,
    pub ly: i32,
    pub rx: i32,
    pub ry: i32,
    pub l2: i32,
    pub r2: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightStatus {
    pub latency_ms: f64,
    pub rate_hz: f64,
    pub connected: bool,
    /// Protocol channel values (172..=1811 for CRSF), `ch1` at index 0.
    pub channels: [i32; CHANNELS],
    pub tuned_signals: Vec<i32>,
    pub raw_signals: Vec<i32>,
    pub sticks: Sticks,
}

impl Default for FlightStatus {
    fn default() -> Self {
        Self {
            latency_ms: 0.0,
            rate_hz: 0.0,
            connected: false,
            channels: [0; CHANNELS],
            tuned_signals: vec![0; SIGNALS],
            raw_signals: vec![0; SIGNALS],
            sticks: Sticks::default(),
        }
    }
}

/// Integers may be written as floats (`"1200.0"`).
fn int(v: &str) -> Option<i32> {
    v.parse::<i32>()
        .ok()
        .or_else(|| v.parse::<f64>().ok().map(|f| f as i32))
}

fn indexed(key: &str, prefix: &str) -> Option<usize> {
    key.strip_prefix(prefix)?.parse().ok()
}

impl FlightStatus {
    /// Parse one status line. Returns `None` for an empty line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut st = Self::default();
        for (key, value) in line.split_whitespace().filter_map(|tok| tok.split_once(':')) {
            match key {
                "latency_ms" => st.latency_ms = value.parse().unwrap_or(st.latency_ms),
                "rate_hz" => st.rate_hz = value.parse().unwrap_or(st.rate_hz),
                "connected" => st.connected = int(value).map_or(st.connected, |c| c != 0),
                "lx" | "raw_lx" => st.sticks.lx = int(value).unwrap_or(st.sticks.lx),
                "ly" | "raw_ly" => st.sticks.ly = int(value).unwrap_or(st.sticks.ly),
                "rx" | "raw_rx" => st.sticks.rx = int(value).unwrap_or(st.sticks.rx),
                "ry" | "raw_ry" => st.sticks.ry = int(value).unwrap_or(st.sticks.ry),
                "l2" => st.sticks.l2 = int(value).unwrap_or(st.sticks.l2),
                "r2" => st.sticks.r2 = int(value).unwrap_or(st.sticks.r2),
                _ => {
                    if let (Some(n), Some(v)) = (indexed(key, "ch"), int(value)) {
                        // ch1 -> index 0
                        if (1..=CHANNELS).contains(&n) {
                            st.channels[n - 1] = v;
                        }
                    } else if let (Some(n), Some(v)) = (indexed(key, "tunedid"), int(value)) {
                        if n < SIGNALS {
                            st.tuned_signals[n] = v;
                        }
                    } else if let (Some(n), Some(v)) = (indexed(key, "rawid"), int(value)) {
                        if n < SIGNALS {
                            st.raw_signals[n] = v;
                        }
                    }
                }
            }
        }
        Some(st)
    }
}

/// Throttled reader for the status file.
pub struct StatusReader {
    path: PathBuf,
    last_read: Option<Instant>,
}

impl StatusReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), last_read: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file if at least [`READ_INTERVAL`] passed since the last read.
    ///
    /// `None` when throttled, when the file is missing or empty, or on a read error.
    pub fn poll(&mut self, now: Instant) -> Option<FlightStatus> {
        if let Some(last) = self.last_read {
            if now.saturating_duration_since(last) < READ_INTERVAL {
                return None;
            }
        }
        self.last_read = Some(now);
        match self.read_now() {
            Ok(st) => st,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::debug!("reading {}: {e}", self.path.display());
                }
                None
            }
        }
    }

    /// Unthrottled read.
    pub fn read_now(&self) -> io::Result<Option<FlightStatus>> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(FlightStatus::parse(&text))
    }
}
