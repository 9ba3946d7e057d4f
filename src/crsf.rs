//! CRSF frame codec for the flight link.
//!
//! Frame layout: `[address][len][type][payload...][crc]`, where `len` counts
//! `type + payload + crc` and the CRC-8 (poly `0xD5`) covers `type + payload`.
//! Multi-byte telemetry fields are big-endian.

use crate::error::{Error, Result};

pub const ADDRESS_RADIO_TRANSMITTER: u8 = 0xEE;
pub const SYNC_BYTE: u8 = 0xC8;

pub const FRAMETYPE_GPS: u8 = 0x02;
pub const FRAMETYPE_BATTERY_SENSOR: u8 = 0x08;
pub const FRAMETYPE_LINK_STATISTICS: u8 = 0x14;
pub const FRAMETYPE_RC_CHANNELS_PACKED: u8 = 0x16;
pub const FRAMETYPE_ATTITUDE: u8 = 0x1E;
pub const FRAMETYPE_FLIGHT_MODE: u8 = 0x21;

pub const CHANNELS: usize = 16;
pub const CHANNEL_MIN: u16 = 172;
pub const CHANNEL_MAX: u16 = 1811;

/// Packed RC channel payload: 16 × 11 bits.
const RC_PAYLOAD_LEN: usize = 22;
/// Full RC channels frame.
pub const RC_FRAME_LEN: usize = RC_PAYLOAD_LEN + 4;

const MAX_FRAME_LEN: usize = 64;

const CRC_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0xD5 } else { crc << 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, b| CRC_TABLE[(crc ^ b) as usize])
}

/// Map a signed 16-bit logical value to the CRSF 172..=1811 range.
pub fn to_crsf(value: i32) -> u16 {
    let norm = (value.clamp(-32768, 32767) + 32768) as f32 / 65535.0;
    ((norm * 1639.0 + 172.0) as u16).clamp(CHANNEL_MIN, CHANNEL_MAX)
}

/// Build an RC_CHANNELS_PACKED frame from 16 logical (±32767) channels.
pub fn pack_channels(logical: &[i32; CHANNELS]) -> [u8; RC_FRAME_LEN] {
    let mut frame = [0u8; RC_FRAME_LEN];
    frame[0] = ADDRESS_RADIO_TRANSMITTER;
    frame[1] = (RC_PAYLOAD_LEN + 2) as u8;
    frame[2] = FRAMETYPE_RC_CHANNELS_PACKED;

    let mut bits: u32 = 0;
    let mut avail = 0;
    let mut pos = 3;
    for &v in logical {
        bits |= u32::from(to_crsf(v)) << avail;
        avail += 11;
        while avail >= 8 {
            frame[pos] = bits as u8;
            pos += 1;
            bits >>= 8;
            avail -= 8;
        }
    }
    frame[RC_FRAME_LEN - 1] = crc8(&frame[2..RC_FRAME_LEN - 1]);
    frame
}

/// Unpack 16 × 11-bit channel values.
pub fn unpack_channels(payload: &[u8]) -> Result<[u16; CHANNELS]> {
    if payload.len() < RC_PAYLOAD_LEN {
        return Err(Error::Frame("rc channels payload too short"));
    }
    let mut out = [0u16; CHANNELS];
    let mut bits: u32 = 0;
    let mut avail = 0;
    let mut bytes = payload.iter();
    for ch in out.iter_mut() {
        while avail < 11 {
            // Length checked above.
            let b = bytes.next().copied().unwrap_or(0);
            bits |= u32::from(b) << avail;
            avail += 8;
        }
        *ch = (bits & 0x7FF) as u16;
        bits >>= 11;
        avail -= 11;
    }
    Ok(out)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStatistics {
    pub uplink_rssi_1: i8,
    pub uplink_rssi_2: i8,
    pub uplink_link_quality: u8,
    pub uplink_snr: i8,
    pub active_antenna: u8,
    pub rf_mode: u8,
    pub uplink_tx_power: u8,
    pub downlink_rssi: i8,
    pub downlink_link_quality: u8,
    pub downlink_snr: i8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Battery {
    /// Decivolts.
    pub voltage: u16,
    /// Deciamps.
    pub current: u16,
    /// mAh, 24-bit.
    pub capacity_used: u32,
    /// Percent.
    pub remaining: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attitude {
    /// Radians × 10000.
    pub pitch: i16,
    pub roll: i16,
    pub yaw: i16,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gps {
    /// Degrees × 10^7.
    pub latitude: i32,
    pub longitude: i32,
    /// km/h × 10.
    pub groundspeed: u16,
    /// Degrees × 100.
    pub heading: u16,
    /// Meters + 1000.
    pub altitude: u16,
    pub satellites: u8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    LinkStatistics(LinkStatistics),
    Battery(Battery),
    Attitude(Attitude),
    Gps(Gps),
    FlightMode(String),
    RcChannels([u16; CHANNELS]),
}

fn be16(p: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([p[at], p[at + 1]])
}

fn be32(p: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([p[at], p[at + 1], p[at + 2], p[at + 3]])
}

fn need(payload: &[u8], n: usize) -> Result<()> {
    if payload.len() < n {
        Err(Error::Frame("payload too short"))
    } else {
        Ok(())
    }
}

/// Validate and decode one complete frame.
pub fn parse_frame(frame: &[u8]) -> Result<Frame> {
    if frame.len() < 4 {
        return Err(Error::Frame("frame too short"));
    }
    let len = usize::from(frame[1]);
    if frame.len() != len + 2 {
        return Err(Error::Frame("length mismatch"));
    }
    if frame[0] != ADDRESS_RADIO_TRANSMITTER && frame[0] != SYNC_BYTE {
        return Err(Error::Frame("unknown address"));
    }
    let body = &frame[2..frame.len() - 1];
    if crc8(body) != frame[frame.len() - 1] {
        return Err(Error::Frame("crc mismatch"));
    }

    let (kind, p) = (body[0], &body[1..]);
    match kind {
        FRAMETYPE_LINK_STATISTICS => {
            need(p, 10)?;
            Ok(Frame::LinkStatistics(LinkStatistics {
                uplink_rssi_1: p[0] as i8,
                uplink_rssi_2: p[1] as i8,
                uplink_link_quality: p[2],
                uplink_snr: p[3] as i8,
                active_antenna: p[4],
                rf_mode: p[5],
                uplink_tx_power: p[6],
                downlink_rssi: p[7] as i8,
                downlink_link_quality: p[8],
                downlink_snr: p[9] as i8,
            }))
        }
        FRAMETYPE_BATTERY_SENSOR => {
            need(p, 8)?;
            Ok(Frame::Battery(Battery {
                voltage: be16(p, 0),
                current: be16(p, 2),
                capacity_used: u32::from(p[4]) << 16 | u32::from(p[5]) << 8 | u32::from(p[6]),
                remaining: p[7],
            }))
        }
        FRAMETYPE_ATTITUDE => {
            need(p, 6)?;
            Ok(Frame::Attitude(Attitude {
                pitch: be16(p, 0) as i16,
                roll: be16(p, 2) as i16,
                yaw: be16(p, 4) as i16,
            }))
        }
        FRAMETYPE_GPS => {
            need(p, 15)?;
            Ok(Frame::Gps(Gps {
                latitude: be32(p, 0) as i32,
                longitude: be32(p, 4) as i32,
                groundspeed: be16(p, 8),
                heading: be16(p, 10),
                altitude: be16(p, 12),
                satellites: p[14],
            }))
        }
        FRAMETYPE_FLIGHT_MODE => {
            need(p, 1)?;
            let text = p.split(|b| *b == 0).next().unwrap_or_default();
            Ok(Frame::FlightMode(String::from_utf8_lossy(text).into_owned()))
        }
        FRAMETYPE_RC_CHANNELS_PACKED => Ok(Frame::RcChannels(unpack_channels(p)?)),
        _ => Err(Error::Frame("unsupported frame type")),
    }
}

/// Reassembles frames from a serial byte stream.
///
/// Bytes before a valid address byte are discarded; a declared length that
/// cannot be a frame resets the decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a complete (not yet validated) frame when one closes.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            if byte == ADDRESS_RADIO_TRANSMITTER || byte == SYNC_BYTE {
                self.buf.push(byte);
            }
            return None;
        }
        self.buf.push(byte);
        if self.buf.len() == 2 && !(2..=MAX_FRAME_LEN - 2).contains(&usize::from(byte)) {
            self.buf.clear();
            return None;
        }
        if self.buf.len() >= 2 && self.buf.len() == usize::from(self.buf[1]) + 2 {
            return Some(std::mem::take(&mut self.buf));
        }
        None
    }

    /// Feed a chunk and collect every frame that closes in it.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        bytes.iter().filter_map(|b| self.push(*b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
        let mut f = vec![SYNC_BYTE, (payload.len() + 2) as u8, kind];
        f.extend_from_slice(payload);
        f.push(crc8(&f[2..]));
        f
    }

    #[test]
    fn crc_table_matches_known_entries() {
        assert_eq!(CRC_TABLE[1], 0xD5);
        assert_eq!(CRC_TABLE[2], 0x7F);
        assert_eq!(CRC_TABLE[255], 0xF9);
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn rc_frame_shape_and_limits() {
        let mut logical = [0i32; CHANNELS];
        logical[0] = -32768;
        logical[1] = 32767;
        logical[2] = 99_999;
        let f = pack_channels(&logical);
        assert_eq!(&f[..3], &[0xEE, 24, 0x16]);
        assert_eq!(f[25], crc8(&f[2..25]));

        match parse_frame(&f).unwrap() {
            Frame::RcChannels(ch) => {
                assert_eq!(ch[0], CHANNEL_MIN);
                assert_eq!(ch[1], CHANNEL_MAX);
                assert_eq!(ch[2], CHANNEL_MAX);
                assert!((991..=992).contains(&ch[3]));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn corrupted_frames_are_rejected() {
        let mut f = pack_channels(&[0; CHANNELS]);
        f[10] ^= 0x01;
        assert!(matches!(parse_frame(&f), Err(Error::Frame("crc mismatch"))));
        assert!(parse_frame(&f[..20]).is_err());
        let mut bad_addr = frame(FRAMETYPE_ATTITUDE, &[0; 6]);
        bad_addr[0] = 0x00;
        assert!(parse_frame(&bad_addr).is_err());
    }

    #[test]
    fn telemetry_frames_decode() {
        let link = frame(FRAMETYPE_LINK_STATISTICS, &[0xB0, 0xAF, 100, 0xF6, 1, 4, 3, 0xC4, 99, 9]);
        let Frame::LinkStatistics(ls) = parse_frame(&link).unwrap() else { panic!() };
        assert_eq!(ls.uplink_rssi_1, -80);
        assert_eq!(ls.uplink_snr, -10);
        assert_eq!(ls.downlink_link_quality, 99);

        let batt = frame(FRAMETYPE_BATTERY_SENSOR, &[0x00, 0xA8, 0x00, 0x0F, 0x00, 0x04, 0xD2, 80]);
        let Frame::Battery(b) = parse_frame(&batt).unwrap() else { panic!() };
        assert_eq!(b, Battery { voltage: 168, current: 15, capacity_used: 1234, remaining: 80 });

        let mode = frame(FRAMETYPE_FLIGHT_MODE, b"ACRO\0");
        assert_eq!(parse_frame(&mode).unwrap(), Frame::FlightMode("ACRO".into()));
    }

    #[test]
    fn decoder_resyncs_on_noise() {
        let mut dec = FrameDecoder::new();
        let good = frame(FRAMETYPE_ATTITUDE, &[0x01, 0x00, 0xFF, 0x38, 0, 0]);
        let mut stream = vec![0x00, 0x13, SYNC_BYTE, 0xFF];
        stream.extend_from_slice(&good);
        let frames = dec.extend(&stream);
        assert_eq!(frames, vec![good]);
        let Frame::Attitude(a) = parse_frame(&frames[0]).unwrap() else { panic!() };
        assert_eq!((a.pitch, a.roll), (256, -200));
    }
}
