//! Module `file_ops`
//!
//! Byte transfer over the open data connection: timed writes with optional
//! ASCII conversion, reads, the zero-copy upload path and closing with the
//! completion reply.

use log::{debug, info};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::client::ControlSession;
use crate::client::stream::NetStream;
use crate::error::{FtpClientError, FtpResult, IoPhase};
use crate::protocol::classify;
use crate::transfer::ascii::AsciiEncoder;
use crate::transfer::results::DataChannel;

const COPY_CHUNK: usize = 64 * 1024;

impl ControlSession {
    /// Writes one block to the data connection. With an encoder the block is
    /// converted to CRLF line ends first.
    pub fn write(&mut self, block: &[u8], ascii: Option<&mut AsciiEncoder>) -> FtpResult<()> {
        self.ensure_usable()?;
        let channel = self.data.as_mut().ok_or(FtpClientError::NoDataChannel)?;
        let bytes = match ascii {
            Some(encoder) => encoder.encode(block),
            None => block,
        };

        let result = channel
            .stream
            .write_all(bytes)
            .map(|_| channel.add_bytes(bytes.len()))
            .map_err(|e| FtpClientError::from_io(e, IoPhase::DataWrite));
        self.track(result)
    }

    /// Reads up to `block.len()` bytes; `Ok(0)` is the end of the transfer.
    pub fn read(&mut self, block: &mut [u8]) -> FtpResult<usize> {
        self.ensure_usable()?;
        let channel = self.data.as_mut().ok_or(FtpClientError::NoDataChannel)?;

        let result = loop {
            match channel.stream.read(block) {
                Ok(n) => {
                    channel.add_bytes(n);
                    break Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof && channel.is_encrypted() => {
                    debug!("Data connection closed without TLS close_notify");
                    break Ok(0);
                }
                Err(e) => break Err(FtpClientError::from_io(e, IoPhase::DataRead)),
            }
        };
        self.track(result)
    }

    /// Sends up to `count` bytes of `file` starting at `*offset` and advances
    /// the offset. Plain connections on Linux use `sendfile(2)`; everything
    /// else copies through a buffer. `Ok(0)` means the file is exhausted.
    pub fn send_file(&mut self, file: &File, offset: &mut u64, count: usize) -> FtpResult<usize> {
        self.ensure_usable()?;
        let channel = self.data.as_mut().ok_or(FtpClientError::NoDataChannel)?;

        let result = match &mut channel.stream {
            #[cfg(target_os = "linux")]
            NetStream::Plain(tcp) => zero_copy(tcp, file, offset, count),
            stream => copy_from_file(stream, file, offset, count),
        };
        if let Ok(sent) = &result {
            channel.add_bytes(*sent);
        }
        self.track(result)
    }

    /// Closes the data connection and reads the completion reply (226 or 250)
    /// with twice the usual deadline.
    ///
    /// The connection is fully closed before the reply is read, so a server
    /// still sending data sees the close and answers. On a flagged session no
    /// reply is awaited and the flag is reported instead.
    pub fn close_data(&mut self) -> FtpResult<()> {
        self.close_data_accepting(&[])
    }

    /// `close_data` that also takes `extra` reply codes as completion.
    pub(crate) fn close_data_accepting(&mut self, extra: &[u16]) -> FtpResult<()> {
        let mut channel = self.data.take().ok_or(FtpClientError::NoDataChannel)?;
        if let Err(e) = channel.stream.finish() {
            debug!("Shutting down data connection: {e}");
        }
        debug!("Closing data connection after {} bytes", channel.bytes());
        drop(channel);
        self.ensure_usable()?;

        let reply = self.read_reply_within(self.state.transfer_timeout() * 2)?;
        if classify::is_transfer_complete(&reply) || reply.is_one_of(extra) {
            info!("Transfer complete: {}", reply.message());
            Ok(())
        } else {
            Err(FtpClientError::UnexpectedReply(reply))
        }
    }

    /// Whether a data connection is currently open.
    pub fn has_data_channel(&self) -> bool {
        self.data.is_some()
    }

    /// The open data connection, for byte counts and channel details.
    pub fn data_channel(&self) -> Option<&DataChannel> {
        self.data.as_ref()
    }
}

#[cfg(target_os = "linux")]
fn zero_copy(
    tcp: &std::net::TcpStream,
    file: &File,
    offset: &mut u64,
    count: usize,
) -> FtpResult<usize> {
    use nix::errno::Errno;
    use nix::libc::off_t;
    use nix::sys::sendfile::sendfile;

    let mut position = off_t::try_from(*offset).map_err(|_| {
        FtpClientError::Io(io::Error::new(
            ErrorKind::InvalidInput,
            format!("file offset {offset} too large"),
        ))
    })?;

    loop {
        match sendfile(tcp, file, Some(&mut position), count) {
            Ok(sent) => {
                *offset = position as u64;
                return Ok(sent);
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                return Err(FtpClientError::from_io(
                    io::Error::from(errno),
                    IoPhase::DataWrite,
                ));
            }
        }
    }
}

fn copy_from_file(
    stream: &mut NetStream,
    file: &File,
    offset: &mut u64,
    count: usize,
) -> FtpResult<usize> {
    let mut source = file;
    source.seek(SeekFrom::Start(*offset))?;
    let mut buffer = vec![0u8; count.min(COPY_CHUNK)];
    let n = source.read(&mut buffer)?;
    stream
        .write_all(&buffer[..n])
        .map_err(|e| FtpClientError::from_io(e, IoPhase::DataWrite))?;
    *offset += n as u64;
    Ok(n)
}
