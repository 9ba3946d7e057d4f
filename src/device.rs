use crate::event::{Axis, AxisRange, Capabilities, RawEvent};
use crate::metadata::DeviceMeta;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// An opened input device that may carry touch events.
///
/// Implementations own the OS handle; dropping the device closes it (and
/// releases any exclusive grab).
pub trait TouchDevice: Send {
    fn name(&self) -> &str;
    fn path(&self) -> &str;
    fn capabilities(&self) -> Capabilities;

    /// Reported range of the position axis feeding `axis`, if the driver exposes one.
    fn axis_range(&self, axis: Axis) -> Option<AxisRange>;

    /// Request exclusive access to the event stream.
    fn grab(&mut self) -> io::Result<()>;

    /// Block for at most `timeout` until events are readable.
    ///
    /// `Ok(false)` means the timeout elapsed with nothing to read.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read every event currently pending, in kernel order.
    fn read_events(&mut self) -> io::Result<Vec<RawEvent>>;

    fn metadata(&self) -> DeviceMeta {
        DeviceMeta {
            path: self.path().to_string(),
            name: self.name().to_string(),
            caps: self.capabilities(),
            x_range: self.axis_range(Axis::X),
            y_range: self.axis_range(Axis::Y),
            ..Default::default()
        }
    }
}

/// One enumerated device node: either opened, or the reason it could not be.
pub struct Candidate {
    pub path: PathBuf,
    pub device: io::Result<Box<dyn TouchDevice>>,
}

/// Source of input devices (the platform's enumeration facility).
pub trait DeviceProvider: Send {
    /// Enumerate and open every input device currently present.
    fn enumerate(&mut self) -> Vec<Candidate>;
}

/// Classify an I/O error as "the device went away".
///
/// `ENODEV` is what the kernel returns on reads from an unplugged evdev node.
pub fn is_device_lost(err: &io::Error) -> bool {
    const ENODEV: i32 = 19;
    err.raw_os_error() == Some(ENODEV) || err.kind() == io::ErrorKind::UnexpectedEof
}
