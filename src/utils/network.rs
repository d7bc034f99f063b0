//! Network utilities
//!
//! Socket setup shared by the control and data connections, built on socket2.

use log::{debug, warn};
use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{FtpClientError, FtpResult};

/// IP_TOS value for the interactive control connection.
pub const IPTOS_LOWDELAY: u32 = 0x10;
/// IP_TOS value for bulk data connections.
pub const IPTOS_THROUGHPUT: u32 = 0x08;

const LISTEN_BACKLOG: i32 = 1;

/// Which kernel buffer a size hint applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferHint {
    Send(usize),
    Receive(usize),
}

/// Resolve `host` to its first IPv4 address.
pub fn resolve_ipv4(host: &str, port: u16) -> FtpResult<SocketAddr> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| FtpClientError::Resolve(host.to_string(), e))?;
    addrs
        .into_iter()
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| FtpClientError::NoIpv4Address(host.to_string()))
}

/// Connect to `addr` within `timeout`.
///
/// `reuse_address` sets SO_REUSEADDR before connecting; `hint` sizes the
/// kernel buffer so the TCP window is negotiated with it.
pub fn connect_with_timeout(
    addr: SocketAddr,
    timeout: Duration,
    reuse_address: bool,
    hint: Option<BufferHint>,
) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    if reuse_address {
        if let Err(e) = socket.set_reuse_address(true) {
            warn!("setsockopt() SO_REUSEADDR error: {e}");
        }
    }
    if let Some(hint) = hint {
        apply_buffer_hint(&socket, hint);
    }
    socket.connect_timeout(&SockAddr::from(addr), timeout)?;
    Ok(socket.into())
}

/// Bind and listen on `ip:port`. Port 0 lets the kernel choose.
pub fn bind_listener(ip: Ipv4Addr, port: u16, hint: Option<BufferHint>) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    if let Some(hint) = hint {
        apply_buffer_hint(&socket, hint);
    }
    socket.bind(&SockAddr::from(SocketAddrV4::new(ip, port)))?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket.into())
}

/// Best effort: a failing size hint is logged, never fatal.
pub fn apply_buffer_hint(socket: &Socket, hint: BufferHint) {
    let result = match hint {
        BufferHint::Send(size) => socket.set_send_buffer_size(size),
        BufferHint::Receive(size) => socket.set_recv_buffer_size(size),
    };
    match result {
        Ok(()) => debug!("Applied socket buffer hint {hint:?}"),
        Err(e) => warn!("Failed to apply socket buffer hint {hint:?}: {e}"),
    }
}

/// Best effort IP_TOS.
pub fn set_type_of_service(stream: &TcpStream, tos: u32) {
    if let Err(e) = SockRef::from(stream).set_tos(tos) {
        warn!("setsockopt() IP_TOS error: {e}");
    }
}

/// Send one byte as TCP urgent data.
pub fn send_urgent(stream: &TcpStream, byte: u8) -> io::Result<usize> {
    SockRef::from(stream).send_out_of_band(&[byte])
}
