//! Control connection keepalive during long transfers
//!
//! Sends a Telnet interrupt plus synch and asks for STAT, so that firewalls
//! and the server see traffic on an otherwise idle control connection.

use log::{debug, warn};
use std::io::Read;

use crate::client::session::ControlSession;
use crate::client::state::TimeoutFlag;
use crate::error::{FtpClientError, FtpResult, IoPhase};
use crate::protocol::Command;
use crate::protocol::classify;
use crate::protocol::responses::TRANSFER_ABORTED;
use crate::utils::network;

const IAC: u8 = 255;
const IP: u8 = 244;
const DM: u8 = 242;

impl ControlSession {
    /// Keep the control connection alive.
    ///
    /// Stale input is discarded and the sticky flag cleared first. Then
    /// `IAC IP` goes in-band, `IAC` as urgent data and `DM STAT` in-band. A
    /// 426 for an interrupted transfer may precede the status reply.
    pub fn keepalive(&mut self) -> FtpResult<()> {
        let drained = self.drain_control_input();
        if drained > 0 {
            debug!("Discarded {drained} bytes of stale control input");
        }
        self.state.set_timeout_flag(TimeoutFlag::None);

        self.send_raw(&[IAC, IP], "IAC IP")?;
        let urgent = network::send_urgent(self.stream.tcp(), IAC)
            .map(|_| ())
            .map_err(|e| FtpClientError::from_io(e, IoPhase::ControlWrite));
        self.track(urgent)?;

        let mut synch = vec![DM];
        synch.extend_from_slice(&Command::Stat.to_wire());
        self.send_raw(&synch, "DM STAT")?;

        let mut reply = self.read_reply()?;
        if reply.code() == TRANSFER_ABORTED {
            reply = self.read_reply()?;
        }
        if classify::is_status(&reply) {
            Ok(())
        } else {
            Err(FtpClientError::UnexpectedReply(reply))
        }
    }

    /// Reads whatever is already waiting on the control connection without blocking.
    fn drain_control_input(&mut self) -> usize {
        let mut drained = self.reader.discard();
        if let Err(e) = self.stream.tcp().set_nonblocking(true) {
            warn!("Failed to make control socket non-blocking: {e}");
            return drained;
        }

        let mut scratch = [0u8; 1024];
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) | Err(_) => break,
                Ok(n) => drained += n,
            }
        }

        if let Err(e) = self.stream.tcp().set_nonblocking(false) {
            warn!("Failed to make control socket blocking again: {e}");
        }
        drained
    }
}
