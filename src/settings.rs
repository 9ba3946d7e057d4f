//! Persisted dashboard settings (JSON).
//!
//! The settings document is shared with the flight-control process, which
//! re-reads it periodically, so the field names are part of an external
//! contract. Every field has a serde default; out-of-range values are clamped
//! on load instead of rejected. Keys this crate does not know about are kept
//! and written back on save.
//!
//! Output channels are fed from the flight process's logical signals
//! (`tunedid0..tunedid22`). Source [`NEUTRAL_SOURCE`] always reads as zero.

use crate::error::Result;
use crate::status::SIGNALS;
use crate::tuning::{AxisTuning, Curve};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

pub const CHANNEL_COUNT: usize = 16;

/// Source id that maps to a centered (zero) value.
pub const NEUTRAL_SOURCE: u8 = (SIGNALS - 1) as u8;

/// An output channel driven by `pos_src - neg_src`, e.g. two triggers on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitChannel {
    pub channel: u8,
    pub pos_src: u8,
    pub neg_src: u8,
}

/// Accepts any JSON number and clamps it into `0..=100`.
fn percent<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<u8, D::Error> {
    let v = f64::deserialize(de)?;
    Ok(if v.is_nan() { 0 } else { v.round().clamp(0.0, 100.0) as u8 })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Percent, `0..=100`.
    #[serde(deserialize_with = "percent")]
    pub left_stick_deadzone: u8,
    /// Percent, `0..=100`.
    #[serde(deserialize_with = "percent")]
    pub right_stick_deadzone: u8,
    pub curve: Curve,
    pub expo: f32,
    pub sensitivity: f32,
    pub lowpass_alpha: f32,
    pub cine_mode: bool,
    pub cine_intensity: f32,
    /// Output channel `i` takes logical signal `channel_map[i]`.
    pub channel_map: Vec<u8>,
    /// Output channels whose value is negated.
    pub inverted_channels: Vec<u8>,
    /// Channels that ignore `channel_map` and mix two sources.
    pub split_channels: Vec<SplitChannel>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            left_stick_deadzone: 0,
            right_stick_deadzone: 0,
            curve: Curve::Linear,
            expo: 0.0,
            sensitivity: 1.0,
            lowpass_alpha: 0.0,
            cine_mode: false,
            cine_intensity: 1.0,
            channel_map: (0..CHANNEL_COUNT as u8).collect(),
            inverted_channels: Vec::new(),
            split_channels: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl Settings {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let mut s: Settings = serde_json::from_str(&text)?;
        s.sanitize();
        Ok(s)
    }

    /// Write pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        log::debug!("settings saved to {}", path.display());
        Ok(())
    }

    fn sanitize(&mut self) {
        self.left_stick_deadzone = self.left_stick_deadzone.min(100);
        self.right_stick_deadzone = self.right_stick_deadzone.min(100);
        self.expo = self.expo.clamp(0.0, 1.0);
        self.sensitivity = self.sensitivity.clamp(0.1, 2.0);
        self.lowpass_alpha = self.lowpass_alpha.clamp(0.0, 0.99);
        self.cine_intensity = self.cine_intensity.clamp(1.0, 10.0);
        self.channel_map.truncate(CHANNEL_COUNT);
        for (i, slot) in self.channel_map.iter_mut().enumerate() {
            if usize::from(*slot) >= SIGNALS {
                *slot = i as u8;
            }
        }
        while self.channel_map.len() < CHANNEL_COUNT {
            self.channel_map.push(self.channel_map.len() as u8);
        }

        self.inverted_channels.retain(|&ch| usize::from(ch) < CHANNEL_COUNT);
        self.inverted_channels.sort_unstable();
        self.inverted_channels.dedup();
        self.split_channels.retain(|sp| usize::from(sp.channel) < CHANNEL_COUNT);
        for sp in &mut self.split_channels {
            for src in [&mut sp.pos_src, &mut sp.neg_src] {
                if usize::from(*src) >= SIGNALS {
                    *src = NEUTRAL_SOURCE;
                }
            }
        }
    }

    /// Step the source of output channel `ch` by `delta`, wrapping over all signals.
    pub fn cycle_source(&mut self, ch: usize, delta: i8) {
        if let Some(src) = self.channel_map.get_mut(ch) {
            let next = (i16::from(*src) + i16::from(delta)).rem_euclid(SIGNALS as i16);
            *src = next as u8;
        }
    }

    /// Step a deadzone by `delta` percent, saturating at `0..=100`.
    pub fn nudge_deadzone(&mut self, left: bool, delta: i8) {
        let dz = if left {
            &mut self.left_stick_deadzone
        } else {
            &mut self.right_stick_deadzone
        };
        *dz = (i16::from(*dz) + i16::from(delta)).clamp(0, 100) as u8;
    }

    pub fn left_tuning(&self) -> AxisTuning {
        self.axis_tuning(self.left_stick_deadzone)
    }

    pub fn right_tuning(&self) -> AxisTuning {
        self.axis_tuning(self.right_stick_deadzone)
    }

    fn axis_tuning(&self, deadzone_pct: u8) -> AxisTuning {
        AxisTuning {
            deadzone: f32::from(deadzone_pct) / 100.0,
            curve: self.curve,
            expo: self.expo,
            sensitivity: self.sensitivity,
            lowpass_alpha: self.lowpass_alpha,
            cine: self.cine_mode,
            cine_intensity: self.cine_intensity,
        }
    }

    /// Route logical signals into output channel order.
    ///
    /// Missing, out-of-range and neutral sources read as 0; results are
    /// clamped to the `i16` range.
    pub fn map_channels(&self, signals: &[i32]) -> [i32; CHANNEL_COUNT] {
        let source = |src: u8| -> i64 {
            if src == NEUTRAL_SOURCE {
                return 0;
            }
            signals.get(usize::from(src)).map_or(0, |&v| i64::from(v))
        };

        let mut out = [0; CHANNEL_COUNT];
        for (ch, slot) in out.iter_mut().enumerate() {
            let split = self.split_channels.iter().find(|sp| usize::from(sp.channel) == ch);
            let mut v = match split {
                Some(sp) => source(sp.pos_src) - source(sp.neg_src),
                None => self.channel_map.get(ch).map_or(0, |&src| source(src)),
            };
            if self.inverted_channels.contains(&(ch as u8)) {
                v = -v;
            }
            *slot = v.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i32;
        }
        out
    }

    /// `key:value` pairs for the UDP tuning link.
    pub fn control_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("left_deadzone", self.left_stick_deadzone.to_string()),
            ("right_deadzone", self.right_stick_deadzone.to_string()),
            ("curve", format!("{:?}", self.curve).to_lowercase()),
            ("expo", format!("{:.2}", self.expo)),
            ("sens", format!("{:.2}", self.sensitivity)),
            ("lowpass", format!("{:.2}", self.lowpass_alpha)),
            ("cine", u8::from(self.cine_mode).to_string()),
            ("cine_intensity", format!("{:.1}", self.cine_intensity)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn save_creates_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.json");
        let mut s = Settings::default();
        s.left_stick_deadzone = 12;
        s.curve = Curve::Dynamic;
        s.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), s);
    }

    #[test]
    fn partial_and_out_of_range_values_are_fixed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"left_stick_deadzone": 250, "cine_intensity": 40.0, "channel_map": [3, 99]}"#,
        )
        .unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.left_stick_deadzone, 100);
        assert_eq!(s.right_stick_deadzone, 0);
        assert_eq!(s.cine_intensity, 10.0);
        assert_eq!(s.channel_map.len(), CHANNEL_COUNT);
        assert_eq!(&s.channel_map[..3], &[3, 1, 2]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(Settings::load(&path), Err(crate::Error::Json(_))));
    }

    #[test]
    fn nudge_saturates() {
        let mut s = Settings::default();
        s.nudge_deadzone(true, -1);
        assert_eq!(s.left_stick_deadzone, 0);
        s.right_stick_deadzone = 99;
        s.nudge_deadzone(false, 5);
        assert_eq!(s.right_stick_deadzone, 100);
    }

    #[test]
    fn deadzone_percent_feeds_tuner() {
        let mut s = Settings::default();
        s.left_stick_deadzone = 10;
        let mut tuner = crate::tuning::AxisTuner::new(s.left_tuning());
        assert_eq!(tuner.apply(3000), 0);
        assert_eq!(tuner.apply(32767), 32767);
        assert_eq!(s.right_tuning().deadzone, 0.0);
    }

    #[test]
    fn channel_map_reorders() {
        let mut s = Settings::default();
        s.channel_map.swap(0, 1);
        let mut logical = vec![0; SIGNALS];
        logical[0] = 10;
        logical[1] = 20;
        let out = s.map_channels(&logical);
        assert_eq!((out[0], out[1]), (20, 10));
    }

    #[test]
    fn high_signal_sources_survive_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut map: Vec<u8> = vec![18, 22];
        map.extend(0..14);
        std::fs::write(
            &path,
            serde_json::json!({ "channel_map": map, "mapping": { "defaults": [] } }).to_string(),
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(&s.channel_map[..2], &[18, 22]);
        s.save(&path).unwrap();
        let again = Settings::load(&path).unwrap();
        assert_eq!(again.channel_map, s.channel_map);
        assert!(again.extra.contains_key("mapping"));
    }

    #[test]
    fn neutral_missing_split_and_inverted_sources() {
        let mut s = Settings::default();
        s.channel_map[0] = 18;
        s.channel_map[1] = NEUTRAL_SOURCE;
        s.inverted_channels = vec![2];
        s.split_channels = vec![SplitChannel { channel: 3, pos_src: 4, neg_src: 5 }];

        let mut signals = vec![0; SIGNALS];
        signals[2] = 1000;
        signals[4] = 32767;
        signals[5] = -32768;
        signals[18] = -50;
        signals[22] = 999;
        let out = s.map_channels(&signals);
        assert_eq!(out[0], -50);
        assert_eq!(out[1], 0);
        assert_eq!(out[2], -1000);
        assert_eq!(out[3], 32767);

        // A short signal slice reads as zero past its end.
        assert_eq!(s.map_channels(&signals[..10])[0], 0);
    }

    #[test]
    fn cycle_source_wraps_over_all_signals() {
        let mut s = Settings::default();
        s.cycle_source(0, -1);
        assert_eq!(s.channel_map[0], NEUTRAL_SOURCE);
        s.cycle_source(0, 1);
        assert_eq!(s.channel_map[0], 0);
        s.cycle_source(99, 1);
    }

    #[test]
    fn loose_deadzone_numbers_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"left_stick_deadzone": 300, "right_stick_deadzone": 12.0}"#).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.left_stick_deadzone, 100);
        assert_eq!(s.right_stick_deadzone, 12);
    }
}
