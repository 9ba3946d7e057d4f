//! Device providers for `touchlink`.
//!
//! Implementations of [`DeviceProvider`](crate::device::DeviceProvider) for
//! platform-specific input sources.
//!
//! # Feature flags
//! - **`evdev`** enables the Linux evdev backend (default).
//! - The scripted [`virtual_input`] backend is always built; tests and the
//!   `--virtual` demo mode use it.

use crate::config::ScanConfig;
use crate::device::DeviceProvider;

#[cfg(all(feature = "evdev", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "evdev", target_os = "linux"))))]
pub mod linux;

pub mod virtual_input;

/// Pick the provider the configuration asks for.
///
/// Falls back to an empty virtual provider (which never finds a device) when
/// no hardware backend is compiled in; the poller then just keeps emitting
/// sentinels.
pub fn probe_provider(cfg: &ScanConfig) -> Box<dyn DeviceProvider> {
    if cfg.virtual_device {
        log::info!("using virtual touch backend");
        return Box::new(virtual_input::create_demo_provider());
    }

    #[cfg(all(feature = "evdev", target_os = "linux"))]
    return Box::new(linux::EvdevProvider::new(&cfg.device_dir));

    #[cfg(not(all(feature = "evdev", target_os = "linux")))]
    {
        log::warn!("no hardware input backend compiled in");
        return Box::new(virtual_input::VirtualProvider::new());
    }
}
