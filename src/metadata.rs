//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of an input device
//! suitable for logging and diagnostics. Backends populate what they know;
//! unknown fields remain `None`.
//!
//! # Conventions
//! - `path` is the device node (e.g. `/dev/input/event3`). Node numbers are
//!   assigned in plug order and can change across reconnects; treat the path as
//!   diagnostic first, identity second.
//! - `vendor`/`product` come from the kernel input id and are the stable way to
//!   recognize a panel across reboots.

use crate::event::{AxisRange, Capabilities};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of metadata describing a single input device.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// Device node path.
    pub path: String,

    /// Kernel-reported device name. Empty when the driver supplies none.
    pub name: String,

    /// High-level bus hint (`"usb"`, `"bluetooth"`, `"i2c"`, `"virtual"`), if known.
    pub bus: Option<String>,

    /// Vendor ID from the input id, if known.
    pub vendor: Option<u16>,

    /// Product ID from the input id, if known.
    pub product: Option<u16>,

    /// Touch-relevant capabilities.
    pub caps: Capabilities,

    /// X range reported for the position axis in use, if any.
    pub x_range: Option<AxisRange>,

    /// Y range reported for the position axis in use, if any.
    pub y_range: Option<AxisRange>,
}

impl fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path)?;
        if let (Some(v), Some(p)) = (self.vendor, self.product) {
            write!(f, " [{v:04x}:{p:04x}]")?;
        }
        Ok(())
    }
}
