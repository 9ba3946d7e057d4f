//! Device-to-screen coordinate mapping.

use crate::event::{Axis, AxisRange};

/// Maps raw absolute-axis values onto one screen dimension.
///
/// `screen = raw * screen_dim / device_max`, truncated toward zero. Raw values
/// are clamped into `[0, device_max]` first, so the result always lies in
/// `[0, screen_dim]` and the mapping is monotonic non-decreasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisScale {
    device_max: i64,
    screen_dim: i64,
}

impl AxisScale {
    /// Build a scale from the device's reported range.
    ///
    /// A missing range or a non-positive maximum falls back to `default_max`.
    pub fn new(range: Option<AxisRange>, screen_dim: u32, default_max: i32) -> Self {
        let device_max = match range {
            Some(r) if r.max > 0 => r.max,
            _ => default_max.max(1),
        };
        Self {
            device_max: i64::from(device_max),
            screen_dim: i64::from(screen_dim),
        }
    }

    #[inline]
    pub fn apply(&self, raw: i32) -> i32 {
        let raw = i64::from(raw).clamp(0, self.device_max);
        // Bounded by screen_dim, which came from a u32.
        (raw * self.screen_dim / self.device_max) as i32
    }

    pub fn device_max(&self) -> i32 {
        self.device_max as i32
    }
}

/// X and Y scales for one device on one display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Calibration {
    pub x: AxisScale,
    pub y: AxisScale,
}

impl Calibration {
    pub fn new(
        x_range: Option<AxisRange>,
        y_range: Option<AxisRange>,
        width: u32,
        height: u32,
        default_max: i32,
    ) -> Self {
        Self {
            x: AxisScale::new(x_range, width, default_max),
            y: AxisScale::new(y_range, height, default_max),
        }
    }

    #[inline]
    pub fn map(&self, axis: Axis, raw: i32) -> i32 {
        match axis {
            Axis::X => self.x.apply(raw),
            Axis::Y => self.y.apply(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(max: i32) -> Option<AxisRange> {
        Some(AxisRange { min: 0, max })
    }

    #[test]
    fn midpoint_maps_to_screen_center() {
        let cal = Calibration::new(range(4095), range(4095), 1024, 600, 4095);
        let x = cal.map(Axis::X, 2048);
        let y = cal.map(Axis::Y, 2048);
        assert!((x - 512).abs() <= 1, "x = {x}");
        assert!((y - 300).abs() <= 1, "y = {y}");
    }

    #[test]
    fn output_is_bounded_and_monotonic() {
        let s = AxisScale::new(range(4095), 1024, 4095);
        let mut prev = s.apply(0);
        assert_eq!(prev, 0);
        for raw in 1..=4095 {
            let v = s.apply(raw);
            assert!((0..=1024).contains(&v));
            assert!(v >= prev, "not monotonic at {raw}");
            prev = v;
        }
        assert_eq!(s.apply(4095), 1024);
    }

    #[test]
    fn out_of_range_raw_values_clamp() {
        let s = AxisScale::new(range(1000), 800, 4095);
        assert_eq!(s.apply(-50), 0);
        assert_eq!(s.apply(5000), 800);
    }

    #[test]
    fn missing_or_bogus_range_uses_default() {
        assert_eq!(AxisScale::new(None, 600, 4095).device_max(), 4095);
        assert_eq!(AxisScale::new(range(0), 600, 4095).device_max(), 4095);
        assert_eq!(AxisScale::new(range(32767), 600, 4095).device_max(), 32767);
    }
}
