//! UDP tuning link to the flight-control process.
//!
//! One `key:value` ASCII datagram per parameter, fire-and-forget.

use crate::error::Result;
use crate::settings::Settings;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

pub struct ControlLink {
    socket: UdpSocket,
    target: SocketAddr,
}

/// Format one datagram.
pub fn datagram(key: &str, value: &str) -> String {
    format!("{key}:{value}")
}

impl ControlLink {
    /// Bind an ephemeral local socket aimed at `target`.
    pub fn connect(target: impl ToSocketAddrs) -> Result<Self> {
        let target = target
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no address"))?;
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target })
    }

    pub fn send(&self, key: &str, value: &str) -> Result<()> {
        self.socket.send_to(datagram(key, value).as_bytes(), self.target)?;
        Ok(())
    }

    /// Push every tuning parameter. Returns how many datagrams went out.
    pub fn push_settings(&self, settings: &Settings) -> Result<usize> {
        let pairs = settings.control_pairs();
        for (key, value) in &pairs {
            self.send(key, value)?;
        }
        log::debug!("pushed {} tuning parameters to {}", pairs.len(), self.target);
        Ok(pairs.len())
    }
}
