#![cfg(target_os = "linux")]

//! Linux evdev backend.
//!
//! [`EvdevProvider`] enumerates `event*` nodes under the configured device
//! directory (normally `/dev/input`) and opens each with the `evdev` crate.
//! [`EvdevTouch`] wraps one opened node:
//! - capabilities and axis ranges are read once at open time
//! - readability is awaited with `poll(2)` and a bounded timeout
//! - pending events are drained with `fetch_events` and translated to [`RawEvent`]
//!
//! A read on an unplugged node fails with `ENODEV`; that error is passed
//! through untouched so the poller can classify it as device loss.

use crate::device::{Candidate, DeviceProvider, TouchDevice};
use crate::event::{Axis, AxisRange, Capabilities, RawEvent};
use crate::metadata::DeviceMeta;
use evdev::{AbsoluteAxisType, Device, EventType, Key};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct EvdevTouch {
    raw: Device,
    path: String,
    name: String,
    caps: Capabilities,
    x_range: Option<AxisRange>,
    y_range: Option<AxisRange>,
    meta: DeviceMeta,
}

impl EvdevTouch {
    pub fn open(path: &Path) -> io::Result<Self> {
        let raw = Device::open(path)?;
        let name = raw.name().unwrap_or("").to_string();

        let abs = raw.supported_absolute_axes();
        let has_abs = |axis: AbsoluteAxisType| abs.map_or(false, |set| set.contains(axis));
        let caps = Capabilities {
            multitouch: has_abs(AbsoluteAxisType::ABS_MT_POSITION_X),
            touch_button: raw
                .supported_keys()
                .map_or(false, |keys| keys.contains(Key::BTN_TOUCH)),
            abs_position: has_abs(AbsoluteAxisType::ABS_X),
        };

        // Ranges come from whichever position axis the panel actually drives.
        let (x_axis, y_axis) = if caps.multitouch {
            (AbsoluteAxisType::ABS_MT_POSITION_X, AbsoluteAxisType::ABS_MT_POSITION_Y)
        } else {
            (AbsoluteAxisType::ABS_X, AbsoluteAxisType::ABS_Y)
        };
        let (x_range, y_range) = match raw.get_abs_state() {
            Ok(state) if caps.multitouch || caps.abs_position => {
                let range = |axis: AbsoluteAxisType| {
                    let info = state[axis.0 as usize];
                    Some(AxisRange { min: info.minimum, max: info.maximum })
                };
                (range(x_axis), range(y_axis))
            }
            _ => (None, None),
        };

        let id = raw.input_id();
        let path = path.to_string_lossy().to_string();
        let meta = DeviceMeta {
            path: path.clone(),
            name: name.clone(),
            bus: Some(format!("{:?}", id.bus_type()).to_lowercase()),
            vendor: Some(id.vendor()),
            product: Some(id.product()),
            caps,
            x_range,
            y_range,
        };

        #[cfg(feature = "debug-log")]
        log::trace!("[EVDEV/OPEN] {meta} caps={caps:?} x={x_range:?} y={y_range:?}");

        Ok(Self { raw, path, name, caps, x_range, y_range, meta })
    }
}

impl TouchDevice for EvdevTouch {
    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn axis_range(&self, axis: Axis) -> Option<AxisRange> {
        match axis {
            Axis::X => self.x_range,
            Axis::Y => self.y_range,
        }
    }

    fn grab(&mut self) -> io::Result<()> {
        self.raw.grab()
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.raw.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: `pfd` is a valid pollfd for the duration of the call and nfds is 1.
        let rc = unsafe { libc::poll(&mut pfd, 1, ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        // POLLHUP/POLLERR also count as readable: the read reports the cause.
        Ok(rc > 0)
    }

    fn read_events(&mut self) -> io::Result<Vec<RawEvent>> {
        let events = match self.raw.fetch_events() {
            Ok(events) => events,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(events
            .map(|ev| match ev.event_type() {
                EventType::ABSOLUTE => RawEvent::Abs { code: ev.code(), value: ev.value() },
                EventType::KEY => RawEvent::Key { code: ev.code(), value: ev.value() },
                EventType::SYNCHRONIZATION => RawEvent::Sync { code: ev.code() },
                _ => RawEvent::Other,
            })
            .collect())
    }

    fn metadata(&self) -> DeviceMeta {
        self.meta.clone()
    }
}

/// Enumerates evdev nodes in a directory.
pub struct EvdevProvider {
    dir: PathBuf,
}

impl EvdevProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `event*` nodes sorted by their numeric suffix.
    fn event_nodes(&self) -> io::Result<Vec<PathBuf>> {
        let mut nodes: Vec<(u32, PathBuf)> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let idx = name.to_str()?.strip_prefix("event")?.parse().ok()?;
                Some((idx, entry.path()))
            })
            .collect();
        nodes.sort_by_key(|(idx, _)| *idx);
        Ok(nodes.into_iter().map(|(_, p)| p).collect())
    }
}

impl DeviceProvider for EvdevProvider {
    fn enumerate(&mut self) -> Vec<Candidate> {
        let nodes = match self.event_nodes() {
            Ok(nodes) => nodes,
            Err(e) => {
                log::warn!("cannot list {}: {e}", self.dir.display());
                return Vec::new();
            }
        };
        nodes
            .into_iter()
            .map(|path| {
                let device = EvdevTouch::open(&path).map(|d| Box::new(d) as Box<dyn TouchDevice>);
                Candidate { path, device }
            })
            .collect()
    }
}
