//! Module `stream`
//!
//! A TCP connection that is either plain or wrapped in a rustls session.
//! Used for both the control and the data connection.

use log::debug;
use rustls::{ClientConnection, StreamOwned};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

#[derive(Debug)]
pub enum NetStream {
    Plain(TcpStream),
    Tls(Box<TlsStream>),
}

impl NetStream {
    /// The underlying socket, for timeouts and socket options.
    pub fn tcp(&self) -> &TcpStream {
        match self {
            NetStream::Plain(tcp) => tcp,
            NetStream::Tls(tls) => tls.get_ref(),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, NetStream::Tls(_))
    }

    /// Ends our sending side: close_notify for TLS, then a TCP write shutdown.
    pub fn finish(&mut self) -> io::Result<()> {
        if let NetStream::Tls(tls) = self {
            tls.conn.send_close_notify();
            tls.flush()?;
        }
        match self.tcp().shutdown(Shutdown::Write) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {
                debug!("Shutdown on already closed socket: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetStream::Plain(tcp) => tcp.read(buf),
            NetStream::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetStream::Plain(tcp) => tcp.write(buf),
            NetStream::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetStream::Plain(tcp) => tcp.flush(),
            NetStream::Tls(tls) => tls.flush(),
        }
    }
}
