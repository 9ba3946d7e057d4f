//! Stick tuning math: deadzone, response curves, rate, cine scaling, smoothing.
//!
//! Values travel as normalized `f32` in `[-1.0, 1.0]`; raw controller axes are
//! signed 16-bit (`±32767`).

use serde::{Deserialize, Serialize};

pub const AXIS_MAX: f32 = 32767.0;

/// Response curve applied after the deadzone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    #[default]
    Linear,
    /// Power curve: `|v|^(1 + expo)`.
    Standard,
    /// S-curve blending linear and cubic.
    Dynamic,
    /// Exponential: `(e^(expo·|v|) - 1) / (e^expo - 1)`.
    Extreme,
}

impl Curve {
    pub fn apply(self, v: f32, expo: f32) -> f32 {
        let a = v.abs();
        if a < 0.001 {
            return 0.0;
        }
        let out = match self {
            Curve::Linear => a,
            Curve::Standard => a.powf(1.0 + expo),
            Curve::Dynamic => a * (1.0 - expo) + a.powi(3) * expo,
            Curve::Extreme if expo.abs() > f32::EPSILON => {
                (expo * a).exp_m1() / expo.exp_m1()
            }
            Curve::Extreme => a,
        };
        out.copysign(v)
    }
}

/// Zero inside the deadzone, rescaled outside so output starts at 0 without a jump.
///
/// `dz` is a fraction in `[0, 1)`.
pub fn apply_deadzone(v: f32, dz: f32) -> f32 {
    let dz = dz.clamp(0.0, 0.99);
    let a = v.abs();
    if a < dz {
        return 0.0;
    }
    ((a - dz) / (1.0 - dz)).copysign(v)
}

/// Deadzone on a raw 16-bit axis value.
pub fn apply_deadzone_raw(raw: i32, dz: f32) -> i32 {
    let v = (raw as f32 / AXIS_MAX).clamp(-1.0, 1.0);
    (apply_deadzone(v, dz) * AXIS_MAX) as i32
}

/// Per-axis tuning parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisTuning {
    pub deadzone: f32,
    pub curve: Curve,
    pub expo: f32,
    pub sensitivity: f32,
    /// Low-pass weight of the previous output, `0.0` disables smoothing.
    pub lowpass_alpha: f32,
    pub cine: bool,
    /// Divisor applied in cine mode, `1.0..=10.0`.
    pub cine_intensity: f32,
}

impl Default for AxisTuning {
    fn default() -> Self {
        Self {
            deadzone: 0.0,
            curve: Curve::Linear,
            expo: 0.0,
            sensitivity: 1.0,
            lowpass_alpha: 0.0,
            cine: false,
            cine_intensity: 1.0,
        }
    }
}

/// Applies [`AxisTuning`] to a stream of raw values, holding filter state.
#[derive(Clone, Debug, Default)]
pub struct AxisTuner {
    pub tuning: AxisTuning,
    prev: f32,
}

impl AxisTuner {
    pub fn new(tuning: AxisTuning) -> Self {
        Self { tuning, prev: 0.0 }
    }

    /// Tune one raw `±32767` sample.
    pub fn apply(&mut self, raw: i32) -> i32 {
        let t = &self.tuning;
        let mut v = (raw as f32 / AXIS_MAX).clamp(-1.0, 1.0);
        v = apply_deadzone(v, t.deadzone);
        v = t.curve.apply(v, t.expo);
        v *= t.sensitivity;
        if t.cine {
            v /= t.cine_intensity.max(1.0);
        }
        v = v.clamp(-1.0, 1.0);

        let alpha = t.lowpass_alpha.clamp(0.0, 0.99);
        let filtered = v * (1.0 - alpha) + self.prev * alpha;
        self.prev = filtered;
        (filtered * AXIS_MAX) as i32
    }

    pub fn reset(&mut self) {
        self.prev = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadzone_zeroes_then_rescales() {
        assert_eq!(apply_deadzone(0.05, 0.1), 0.0);
        assert!((apply_deadzone(0.55, 0.1) - 0.5).abs() < 1e-6);
        assert!((apply_deadzone(-1.0, 0.1) + 1.0).abs() < 1e-6);
        assert_eq!(apply_deadzone_raw(1000, 0.1), 0);
        assert_eq!(apply_deadzone_raw(32767, 0.25), 32767);
    }

    #[test]
    fn curves_keep_endpoints_and_sign() {
        for curve in [Curve::Linear, Curve::Standard, Curve::Dynamic, Curve::Extreme] {
            assert!((curve.apply(1.0, 0.5) - 1.0).abs() < 1e-5, "{curve:?}");
            assert!((curve.apply(-1.0, 0.5) + 1.0).abs() < 1e-5, "{curve:?}");
            assert_eq!(curve.apply(0.0, 0.5), 0.0);
        }
        // Expo softens the center.
        assert!(Curve::Standard.apply(0.5, 1.0) < 0.5);
        assert!(Curve::Extreme.apply(0.5, 0.0) == 0.5);
    }

    #[test]
    fn cine_mode_slows_output() {
        let mut tuner = AxisTuner::new(AxisTuning { cine: true, cine_intensity: 4.0, ..Default::default() });
        assert_eq!(tuner.apply(32767), 8191);
    }

    #[test]
    fn lowpass_converges() {
        let mut tuner = AxisTuner::new(AxisTuning { lowpass_alpha: 0.5, ..Default::default() });
        let first = tuner.apply(32767);
        assert_eq!(first, 16383);
        let mut last = first;
        for _ in 0..20 {
            last = tuner.apply(32767);
        }
        assert!(last > 32700);
    }
}
