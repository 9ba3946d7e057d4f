//! Runtime configuration.
//!
//! Loaded from a TOML file; every field has a default so an absent file, or a
//! file that names only a few keys, is valid.
//!
//! ```toml
//! [screen]
//! width = 1024
//! height = 600
//!
//! [poll]
//! timeout_ms = 12
//! rescan_interval_ms = 2000
//!
//! [scan]
//! deny = ["sony", "xbox"]
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen: ScreenConfig,
    pub poll: PollConfig,
    pub scan: ScanConfig,
    pub paths: PathConfig,
}

/// Target display geometry in pixels.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    /// Axis maximum assumed when a device does not report one.
    pub default_axis_max: i32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 600,
            default_axis_max: 4095,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Bounded wait on device readability.
    pub timeout_ms: u64,
    /// Minimum spacing between rescans while no device is present.
    pub rescan_interval_ms: u64,
    /// Sleep per iteration while no device is present.
    pub idle_sleep_ms: u64,
    /// Sleep between active iterations (caps CPU use).
    pub loop_sleep_us: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 12,
            rescan_interval_ms: 2000,
            idle_sleep_ms: 500,
            loop_sleep_us: 500,
        }
    }
}

impl PollConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
    pub fn loop_sleep(&self) -> Duration {
        Duration::from_micros(self.loop_sleep_us)
    }
}

/// Name heuristics for the device scanner. Matching is case-insensitive substring.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Game controllers, mice and keyboards that must never be picked.
    pub deny: Vec<String>,
    /// Known touch panels; the first match is taken immediately.
    pub prefer: Vec<String>,
    /// Directory holding `event*` nodes.
    pub device_dir: PathBuf,
    /// Use the scripted virtual backend instead of real hardware.
    pub virtual_device: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let owned = |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            deny: owned(&[
                "sony",
                "controller",
                "wireless",
                "ps",
                "dual",
                "gamepad",
                "xbox",
                "joy",
                "mouse",
                "keyboard",
            ]),
            prefer: owned(&[
                "biqu",
                "btt",
                "hdmi7",
                "hdmi5",
                "bi-qu",
                "bigtreetech",
                "usb touchscreen",
                "generic touch",
                "usb touch",
                "hid-compliant",
                "hid compliant",
            ]),
            device_dir: PathBuf::from("/dev/input"),
            virtual_device: false,
        }
    }
}

/// Files shared with collaborator processes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Flight-status text file written by the flight-control process.
    pub flight_status: PathBuf,
    /// JSON settings document.
    pub settings: PathBuf,
    /// UDP endpoint of the flight-control process's tuning listener.
    pub control_addr: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            flight_status: PathBuf::from("/tmp/flight_status.txt"),
            settings: PathBuf::from("config/settings.json"),
            control_addr: "127.0.0.1:5005".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
