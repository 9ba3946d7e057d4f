//! The message carried from the touch poller to the render loop.
//!
//! One [`TouchSample`] is emitted per complete input report, or per poll
//! timeout when the panel is idle. A negative latency is reserved as the
//! "no device" sentinel.
//!
//! ## Wire frame
//! For byte-stream transports the sample is a fixed 17-byte little-endian frame:
//!
//! | offset | size | field        |
//! |--------|------|--------------|
//! | 0      | 8    | `latency_ms` (f64) |
//! | 8      | 1    | `pressed` (0/1) |
//! | 9      | 4    | `x` (i32)    |
//! | 13     | 4    | `y` (i32)    |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Encoded size of one sample.
pub const FRAME_LEN: usize = 17;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub latency_ms: f64,
    pub pressed: bool,
    pub x: i32,
    pub y: i32,
}

impl TouchSample {
    pub const SENTINEL_LATENCY: f64 = -1.0;

    pub fn new(latency_ms: f64, pressed: bool, x: i32, y: i32) -> Self {
        Self { latency_ms, pressed, x, y }
    }

    /// "No device available."
    pub fn sentinel() -> Self {
        Self::new(Self::SENTINEL_LATENCY, false, 0, 0)
    }

    /// Value a consumer assumes before it has received anything.
    pub fn idle() -> Self {
        Self::new(0.1, false, 0, 0)
    }

    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.latency_ms < 0.0
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0..8].copy_from_slice(&self.latency_ms.to_le_bytes());
        buf[8] = u8::from(self.pressed);
        buf[9..13].copy_from_slice(&self.x.to_le_bytes());
        buf[13..17].copy_from_slice(&self.y.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != FRAME_LEN {
            return Err(Error::Frame("sample frame length"));
        }
        let pressed = match buf[8] {
            0 => false,
            1 => true,
            _ => return Err(Error::Frame("sample pressed flag")),
        };
        let le8 = |s: &[u8]| {
            let mut a = [0u8; 8];
            a.copy_from_slice(s);
            a
        };
        let le4 = |s: &[u8]| {
            let mut a = [0u8; 4];
            a.copy_from_slice(s);
            a
        };
        Ok(Self {
            latency_ms: f64::from_le_bytes(le8(&buf[0..8])),
            pressed,
            x: i32::from_le_bytes(le4(&buf[9..13])),
            y: i32::from_le_bytes(le4(&buf[13..17])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_released_and_negative() {
        let s = TouchSample::sentinel();
        assert!(s.is_sentinel());
        assert!(!s.pressed);
        assert!(!TouchSample::idle().is_sentinel());
    }

    #[test]
    fn frame_layout_is_little_endian() {
        let buf = TouchSample::new(1.5, true, 512, -3).encode();
        assert_eq!(&buf[0..8], &1.5f64.to_le_bytes());
        assert_eq!(buf[8], 1);
        assert_eq!(&buf[9..13], &[0x00, 0x02, 0x00, 0x00]);
        assert_eq!(&buf[13..17], &[0xfd, 0xff, 0xff, 0xff]);
        assert_eq!(TouchSample::decode(&buf).unwrap(), TouchSample::new(1.5, true, 512, -3));
    }

    #[test]
    fn decode_rejects_bad_frames() {
        assert!(TouchSample::decode(&[0u8; 16]).is_err());
        let mut buf = TouchSample::sentinel().encode();
        buf[8] = 7;
        assert!(matches!(TouchSample::decode(&buf), Err(Error::Frame(_))));
    }
}
