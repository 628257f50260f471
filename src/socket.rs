//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that enforces
//! the single-datagram ceiling of the link.  All protocol logic lives
//! elsewhere; this module owns only byte I/O.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::frame::MAX_DATAGRAM;

/// A datagram socket bound to a local port.
///
/// All methods are `&self` so the socket can be shared across tasks if needed.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (resolved after the OS assigns an
    /// ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing port 0 lets the OS choose an ephemeral port; the resolved
    /// address is available in `local_addr`.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send one frame as a single UDP datagram to `dest`.
    ///
    /// The link forwards nothing larger than [`MAX_DATAGRAM`]; the frame
    /// layer already sizes its output, so a violation here is a programming
    /// error surfaced as `InvalidInput` rather than silent wire loss.
    pub async fn send_to(&self, frame: &[u8], dest: SocketAddr) -> io::Result<()> {
        if frame.len() > MAX_DATAGRAM {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("datagram of {} bytes exceeds the {MAX_DATAGRAM} byte limit", frame.len()),
            ));
        }
        self.inner.send_to(frame, dest).await?;
        Ok(())
    }

    /// Receive the next datagram into `buf`.
    ///
    /// Returns `(length, sender_address)`.  Whether the bytes form a valid
    /// frame is the caller's concern.
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf).await
    }
}
