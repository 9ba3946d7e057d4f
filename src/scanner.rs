//! Touch device discovery.
//!
//! The scanner walks every enumerated input device and picks at most one:
//!
//! - Drop devices whose node could not be opened (logged, never fatal).
//! - Drop devices whose name hits the deny list (game controllers, mice, keyboards).
//! - Drop devices that advertise neither multitouch positions nor `BTN_TOUCH`.
//! - The first survivor whose name hits the prefer list wins outright.
//! - Otherwise the survivor with the richest capabilities wins
//!   (multitouch > touch button); ties keep enumeration order.
//!
//! [`Scanner::scan_with_debug`] additionally returns a per-device record of
//! where each node was accepted or dropped, for diagnostics tooling.

use crate::config::ScanConfig;
use crate::device::{DeviceProvider, TouchDevice};
use crate::event::Capabilities;
use std::path::PathBuf;

/// Where along the pipeline a device was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropStage {
    /// Opening the node failed.
    OpenFailed(String),
    /// Name matched the deny list.
    Denied,
    /// No touch capabilities.
    NotTouch,
    /// A valid candidate that lost to a better one.
    Outranked,
}

/// Debug view of a single enumerated node.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub path: PathBuf,
    pub name: Option<String>,
    pub caps: Option<Capabilities>,
    pub preferred: bool,
    /// `None` means this device was selected.
    pub drop_stage: Option<DropStage>,
}

pub struct Scanner {
    deny: Vec<String>,
    prefer: Vec<String>,
}

impl Scanner {
    pub fn new(cfg: &ScanConfig) -> Self {
        let lower = |v: &[String]| -> Vec<String> { v.iter().map(|w| w.to_lowercase()).collect() };
        Self {
            deny: lower(&cfg.deny),
            prefer: lower(&cfg.prefer),
        }
    }

    pub fn is_denied(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.deny.iter().any(|kw| name.contains(kw.as_str()))
    }

    pub fn is_preferred(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.prefer.iter().any(|kw| name.contains(kw.as_str()))
    }

    /// Pick the best touch device, without grabbing it.
    pub fn scan(&self, provider: &mut dyn DeviceProvider) -> Option<Box<dyn TouchDevice>> {
        self.scan_with_debug(provider).0
    }

    /// Debug-aware variant of [`scan`](Self::scan).
    pub fn scan_with_debug(
        &self,
        provider: &mut dyn DeviceProvider,
    ) -> (Option<Box<dyn TouchDevice>>, Vec<ScanRecord>) {
        let mut records: Vec<ScanRecord> = Vec::new();
        // (record index, device)
        let mut candidates: Vec<(usize, Box<dyn TouchDevice>)> = Vec::new();
        let mut preferred: Option<(usize, Box<dyn TouchDevice>)> = None;

        for cand in provider.enumerate() {
            let mut rec = ScanRecord {
                path: cand.path,
                name: None,
                caps: None,
                preferred: false,
                drop_stage: None,
            };

            let dev = match cand.device {
                Ok(dev) => dev,
                Err(e) => {
                    log::debug!("skipping {}: {e}", rec.path.display());
                    rec.drop_stage = Some(DropStage::OpenFailed(e.to_string()));
                    records.push(rec);
                    continue;
                }
            };

            // A preferred device already won; later nodes are only recorded.
            if preferred.is_some() {
                rec.name = Some(dev.name().to_string());
                rec.drop_stage = Some(DropStage::Outranked);
                records.push(rec);
                continue;
            }

            let caps = dev.capabilities();
            rec.name = Some(dev.name().to_string());
            rec.caps = Some(caps);

            if self.is_denied(dev.name()) {
                log::debug!("skipping {}: deny-listed name {:?}", rec.path.display(), dev.name());
                rec.drop_stage = Some(DropStage::Denied);
                records.push(rec);
                continue;
            }
            if !caps.is_touch_candidate() {
                rec.drop_stage = Some(DropStage::NotTouch);
                records.push(rec);
                continue;
            }

            let idx = records.len();
            if self.is_preferred(dev.name()) {
                rec.preferred = true;
                records.push(rec);
                preferred = Some((idx, dev));
            } else {
                records.push(rec);
                candidates.push((idx, dev));
            }
        }

        let winner = match preferred {
            Some(p) => Some(p),
            None => {
                // Stable: max_by_key returns the last maximum, so scan in reverse.
                let best = candidates
                    .iter()
                    .enumerate()
                    .rev()
                    .max_by_key(|(_, (_, d))| d.capabilities().rank())
                    .map(|(i, _)| i);
                best.map(|i| candidates.swap_remove(i))
            }
        };

        for (idx, _) in &candidates {
            records[*idx].drop_stage = Some(DropStage::Outranked);
        }

        match winner {
            Some((idx, dev)) => {
                records[idx].drop_stage = None;
                (Some(dev), records)
            }
            None => (None, records),
        }
    }

    /// Pick the best touch device and try to grab it exclusively.
    ///
    /// A failed grab is logged and the device is returned anyway: a shared
    /// event stream still works, the desktop just sees the touches too.
    pub fn open(&self, provider: &mut dyn DeviceProvider) -> Option<Box<dyn TouchDevice>> {
        let mut dev = self.scan(provider)?;
        log::info!("selected touch device {}", dev.metadata());
        match dev.grab() {
            Ok(()) => log::info!("device grabbed exclusively"),
            Err(e) => log::warn!("grab failed on {}: {e}", dev.path()),
        }
        Some(dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{VirtualProvider, VirtualTouch};

    fn scanner() -> Scanner {
        Scanner::new(&ScanConfig::default())
    }

    fn caps(multitouch: bool, touch_button: bool) -> Capabilities {
        Capabilities { multitouch, touch_button, abs_position: false }
    }

    #[test]
    fn controller_loses_to_touch_panel() {
        let mut p = VirtualProvider::new();
        p.push(VirtualTouch::new("/dev/input/event0", "Sony Wireless Controller", caps(true, true)));
        p.push(VirtualTouch::new("/dev/input/event1", "Generic Touch Panel", caps(true, true)));
        let dev = scanner().scan(&mut p).expect("a device");
        assert_eq!(dev.name(), "Generic Touch Panel");
    }

    #[test]
    fn deny_match_is_case_insensitive() {
        let s = scanner();
        assert!(s.is_denied("Logitech USB MOUSE"));
        assert!(s.is_preferred("BIQU BTT-HDMI7"));
        assert!(!s.is_denied("Generic Touch Panel"));
    }

    #[test]
    fn preferred_name_wins_over_richer_caps() {
        let mut p = VirtualProvider::new();
        p.push(VirtualTouch::new("/dev/input/event0", "ILITEK Multi-Touch", caps(true, true)));
        p.push(VirtualTouch::new("/dev/input/event1", "BIQU HDMI5 Touch", caps(false, true)));
        p.push(VirtualTouch::new("/dev/input/event2", "USB Touchscreen", caps(true, true)));
        let (dev, records) = scanner().scan_with_debug(&mut p);
        assert_eq!(dev.unwrap().path(), "/dev/input/event1");
        assert_eq!(records[0].drop_stage, Some(DropStage::Outranked));
        assert_eq!(records[1].drop_stage, None);
        assert_eq!(records[2].drop_stage, Some(DropStage::Outranked));
    }

    #[test]
    fn fallback_prefers_multitouch_then_order() {
        let mut p = VirtualProvider::new();
        p.push(VirtualTouch::new("/dev/input/event0", "Resistive Pad", caps(false, true)));
        p.push(VirtualTouch::new("/dev/input/event1", "Panel A", caps(true, false)));
        p.push(VirtualTouch::new("/dev/input/event2", "Panel B", caps(true, false)));
        let dev = scanner().scan(&mut p).unwrap();
        assert_eq!(dev.name(), "Panel A");
    }

    #[test]
    fn open_failures_and_non_touch_are_skipped() {
        let mut p = VirtualProvider::new();
        p.push_failure("/dev/input/event0", std::io::ErrorKind::PermissionDenied);
        p.push(VirtualTouch::new("/dev/input/event1", "Power Button", caps(false, false)));
        let (dev, records) = scanner().scan_with_debug(&mut p);
        assert!(dev.is_none());
        assert!(matches!(records[0].drop_stage, Some(DropStage::OpenFailed(_))));
        assert_eq!(records[1].drop_stage, Some(DropStage::NotTouch));
    }

    #[test]
    fn grab_failure_is_not_fatal() {
        let mut p = VirtualProvider::new();
        let dev = VirtualTouch::new("/dev/input/event3", "Touch", caps(true, true)).with_grab_error();
        let script = dev.script();
        p.push(dev);
        assert!(scanner().open(&mut p).is_some());
        assert_eq!(script.grab_count(), 0);
    }

    #[test]
    fn open_grabs_selected_device_only() {
        let mut p = VirtualProvider::new();
        let panel = VirtualTouch::new("/dev/input/event1", "Generic Touch Panel", caps(true, true));
        let pad = VirtualTouch::new("/dev/input/event2", "Resistive Pad", caps(false, true));
        let (panel_script, pad_script) = (panel.script(), pad.script());
        p.push(panel);
        p.push(pad);
        assert!(scanner().open(&mut p).is_some());
        assert_eq!(panel_script.grab_count(), 1);
        assert_eq!(pad_script.grab_count(), 0);
    }
}
