//! Transfer result types
//!
//! The open data connection produced by a successful negotiation.

use std::time::Duration;

use crate::client::stream::NetStream;
use crate::error::{FtpClientError, FtpResult};
use crate::transfer::modes::{DataMode, Direction, TransferType};

/// An open data connection. At most one exists per session.
#[derive(Debug)]
pub struct DataChannel {
    pub(crate) stream: NetStream,
    mode: DataMode,
    direction: Direction,
    transfer_type: TransferType,
    bytes: u64,
}

impl DataChannel {
    pub(crate) fn new(
        stream: NetStream,
        mode: DataMode,
        direction: Direction,
        transfer_type: TransferType,
    ) -> Self {
        Self {
            stream,
            mode,
            direction,
            transfer_type,
            bytes: 0,
        }
    }

    /// Passive or active, as negotiated.
    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// Whether bytes flow to or from the server.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// TYPE in effect when the connection was opened.
    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    /// Whether the data connection runs over TLS.
    pub fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    /// Bytes moved so far, counted on the wire.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub(crate) fn add_bytes(&mut self, n: usize) {
        self.bytes += n as u64;
    }

    pub(crate) fn apply_timeouts(&self, timeout: Duration) -> FtpResult<()> {
        let tcp = self.stream.tcp();
        tcp.set_read_timeout(Some(timeout))
            .and_then(|_| tcp.set_write_timeout(Some(timeout)))
            .map_err(|e| FtpClientError::Socket("set data timeout", e))
    }
}
