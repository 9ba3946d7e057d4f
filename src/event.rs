//! Decoded kernel input events and device capability descriptions.
//!
//! Backends translate whatever their platform delivers into [`RawEvent`]s so the
//! polling state machine never touches OS types directly. Only the codes the
//! touch pipeline cares about are named here; everything else arrives as
//! [`RawEvent::Other`] and is ignored.
//!
//! ## Code conventions
//! Codes follow `linux/input-event-codes.h`, so the evdev backend can pass them
//! through unchanged:
//! - absolute axes: [`ABS_X`], [`ABS_Y`], [`ABS_MT_POSITION_X`], [`ABS_MT_POSITION_Y`]
//! - keys: [`BTN_TOUCH`]
//! - synchronization: [`SYN_REPORT`]

use serde::{Deserialize, Serialize};

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;

pub const BTN_TOUCH: u16 = 0x14a;

pub const SYN_REPORT: u16 = 0x00;

/// One decoded input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawEvent {
    /// Absolute axis value (`EV_ABS`).
    Abs { code: u16, value: i32 },

    /// Key or button state (`EV_KEY`). `value`: 0 = release, 1 = press, 2 = autorepeat.
    Key { code: u16, value: i32 },

    /// Report boundary marker (`EV_SYN`).
    ///
    /// Only `SYN_REPORT` closes a report; other sync codes (e.g. `SYN_MT_REPORT`,
    /// `SYN_DROPPED`) are carried through and ignored by the poller.
    Sync { code: u16 },

    /// Anything else the device emits (MSC, REL, LED, ...).
    Other,
}

impl RawEvent {
    /// `true` if this event closes one atomic input report.
    #[inline]
    pub fn is_report_boundary(&self) -> bool {
        matches!(self, RawEvent::Sync { code } if *code == SYN_REPORT)
    }
}

/// Which screen axis an absolute code drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Map an absolute-axis code to a screen axis.
    ///
    /// Multitouch slot positions and single-touch positions both drive the
    /// pointer; panels that report both simply update it twice per report.
    pub fn from_abs_code(code: u16) -> Option<Axis> {
        match code {
            ABS_MT_POSITION_X | ABS_X => Some(Axis::X),
            ABS_MT_POSITION_Y | ABS_Y => Some(Axis::Y),
            _ => None,
        }
    }
}

/// Touch-relevant capabilities advertised by a device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Advertises `ABS_MT_POSITION_X`.
    pub multitouch: bool,
    /// Advertises `BTN_TOUCH`.
    pub touch_button: bool,
    /// Advertises single-touch `ABS_X`.
    pub abs_position: bool,
}

impl Capabilities {
    /// A device is a touch candidate if it reports multitouch positions or a touch button.
    #[inline]
    pub fn is_touch_candidate(&self) -> bool {
        self.multitouch || self.touch_button
    }

    /// Ranking used by the scanner fallback: multitouch first, then touch button.
    ///
    /// Higher is better. Mirrors an ordering on `(multitouch, touch_button)`.
    #[inline]
    pub fn rank(&self) -> u8 {
        (u8::from(self.multitouch) << 1) | u8::from(self.touch_button)
    }
}

/// Logical range of one absolute axis, as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multitouch_outranks_touch_button() {
        let mt = Capabilities { multitouch: true, ..Default::default() };
        let btn = Capabilities { touch_button: true, ..Default::default() };
        let both = Capabilities { multitouch: true, touch_button: true, abs_position: true };
        assert!(mt.rank() > btn.rank());
        assert!(both.rank() > mt.rank());
        assert!(!Capabilities::default().is_touch_candidate());
    }

    #[test]
    fn only_syn_report_is_a_boundary() {
        assert!(RawEvent::Sync { code: SYN_REPORT }.is_report_boundary());
        assert!(!RawEvent::Sync { code: 2 }.is_report_boundary());
        assert!(!RawEvent::Key { code: BTN_TOUCH, value: 1 }.is_report_boundary());
    }

    #[test]
    fn position_codes_map_to_axes() {
        assert_eq!(Axis::from_abs_code(ABS_MT_POSITION_X), Some(Axis::X));
        assert_eq!(Axis::from_abs_code(ABS_Y), Some(Axis::Y));
        assert_eq!(Axis::from_abs_code(0x18), None); // ABS_PRESSURE
    }
}
