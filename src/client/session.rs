//! Module `session`
//!
//! The control connection of one FTP session: command/reply exchange, the
//! sticky failure flag, and the simple verbs that need nothing but the
//! control channel.

use log::{debug, info, trace, warn};
use rustls::pki_types::ServerName;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::client::state::{SessionState, TimeoutFlag};
use crate::client::stream::NetStream;
use crate::client::tls::{self, ProtectionLevel};
use crate::config::SessionConfig;
use crate::error::{FtpClientError, FtpResult, IoPhase};
use crate::protocol::classify::{self, Greeting, PassOutcome, UserOutcome};
use crate::protocol::reader::{MAX_LINE_LENGTH, MAX_REPLY_LENGTH};
use crate::protocol::responses::*;
use crate::protocol::{
    Command, OverwriteClassifier, ReadFailure, Reply, ReplyReader, SubstringOverwriteClassifier,
    parser,
};
use crate::transfer::{DataChannel, TransferType};
use crate::utils::network;

/// How often USER is resent while the server answers 430.
pub const MAX_LOGIN_RETRIES: u32 = 10;
const LOGIN_RETRY_DELAY: Duration = Duration::from_millis(700);

/// Upper bound on the wait of `get_reply_immediately`.
pub const MAX_IMMEDIATE_REPLY_WAIT: Duration = Duration::from_secs(20);

/// One FTP control connection and everything hanging off it.
///
/// Not shareable: every operation takes `&mut self`, and one session serves
/// one transfer job.
pub struct ControlSession {
    pub(crate) stream: NetStream,
    pub(crate) host: String,
    pub(crate) reader: ReplyReader,
    pub(crate) last_reply: Option<Reply>,
    pub(crate) state: SessionState,
    pub(crate) config: SessionConfig,
    pub(crate) tls_config: Option<Arc<rustls::ClientConfig>>,
    pub(crate) server_name: Option<ServerName<'static>>,
    pub(crate) overwrite: Box<dyn OverwriteClassifier>,
    pub(crate) data: Option<DataChannel>,
}

impl ControlSession {
    /// Connects to `host:port` and reads the greeting.
    ///
    /// 220 and 120 mean ready; 230 means the server logged us in already.
    /// Any other greeting closes the connection and is returned as the error.
    pub fn connect(host: &str, port: u16, config: SessionConfig) -> FtpResult<(Self, Greeting)> {
        let addr = network::resolve_ipv4(host, port)?;
        let timeout = config.transfer_timeout();
        info!("Connecting to {host} at {addr}");

        let tcp = network::connect_with_timeout(addr, timeout, false, None)
            .map_err(|e| FtpClientError::from_io(e, IoPhase::Connect))?;
        network::set_type_of_service(&tcp, network::IPTOS_LOWDELAY);

        let overwrite = Box::new(SubstringOverwriteClassifier::with_patterns(
            &config.overwrite_patterns,
        ));
        let mut session = Self {
            stream: NetStream::Plain(tcp),
            host: host.to_string(),
            reader: ReplyReader::new(),
            last_reply: None,
            state: SessionState::new(timeout),
            config,
            tls_config: None,
            server_name: None,
            overwrite,
            data: None,
        };
        session.apply_control_timeouts()?;

        let reply = session.read_reply()?;
        match classify::classify_greeting(&reply) {
            Some(greeting) => {
                if greeting == Greeting::AlreadyLoggedIn {
                    session.state.set_logged_in(true);
                }
                info!("Connected to {host}: {}", reply.message());
                Ok((session, greeting))
            }
            None => {
                warn!("Server {host} refused the session: {reply}");
                Err(FtpClientError::UnexpectedReply(reply))
            }
        }
    }

    // --------------------
    // Command/reply plumbing
    // --------------------

    /// Refuses to run while the sticky flag is set.
    pub(crate) fn ensure_usable(&self) -> FtpResult<()> {
        match self.state.timeout_flag() {
            TimeoutFlag::None => Ok(()),
            flag => Err(FtpClientError::SessionFlagged(flag)),
        }
    }

    /// Records transient failures in the sticky flag.
    pub(crate) fn track<T>(&mut self, result: FtpResult<T>) -> FtpResult<T> {
        let flag = match &result {
            Err(FtpClientError::Timeout(_)) => Some(TimeoutFlag::TimedOut),
            Err(FtpClientError::PeerReset(_)) => Some(TimeoutFlag::PeerReset),
            Err(FtpClientError::RemoteHangup) => Some(TimeoutFlag::Hangup),
            _ => None,
        };
        if let Some(flag) = flag {
            warn!("Session to {} flagged: {flag}", self.host);
            self.state.set_timeout_flag(flag);
        }
        result
    }

    pub(crate) fn send(&mut self, command: &Command<'_>) -> FtpResult<()> {
        self.ensure_usable()?;
        self.send_raw(&command.to_wire(), &command.loggable())
    }

    /// Writes bytes to the control connection without the usability check.
    pub(crate) fn send_raw(&mut self, bytes: &[u8], shown: &str) -> FtpResult<()> {
        debug!(">>> {shown}");
        let result = self
            .stream
            .write_all(bytes)
            .and_then(|_| self.stream.flush())
            .map_err(|e| FtpClientError::from_io(e, IoPhase::ControlWrite));
        self.track(result)
    }

    /// Reads the next complete reply within the transfer timeout.
    pub(crate) fn read_reply(&mut self) -> FtpResult<Reply> {
        let result = match self.reader.read_reply(&mut self.stream) {
            Ok(reply) => Ok(reply),
            Err(ReadFailure::Hangup) => Err(FtpClientError::RemoteHangup),
            Err(ReadFailure::Io(e)) => Err(FtpClientError::from_io(e, IoPhase::ControlRead)),
            Err(ReadFailure::LineTooLong) => Err(FtpClientError::MalformedReply(format!(
                "reply line longer than {MAX_LINE_LENGTH} bytes"
            ))),
            Err(ReadFailure::ReplyTooLong) => Err(FtpClientError::MalformedReply(format!(
                "reply longer than {MAX_REPLY_LENGTH} bytes"
            ))),
        };
        let reply = self.track(result)?;
        trace!("<<< {}", reply.text());
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    /// Reads one reply with a different deadline, then restores the normal one.
    pub(crate) fn read_reply_within(&mut self, timeout: Duration) -> FtpResult<Reply> {
        self.set_read_deadline(timeout)?;
        let result = self.read_reply();
        let restored = self.set_read_deadline(self.state.transfer_timeout());
        let reply = result?;
        restored?;
        Ok(reply)
    }

    pub(crate) fn command(&mut self, command: &Command<'_>) -> FtpResult<Reply> {
        self.send(command)?;
        self.read_reply()
    }

    /// Sends `command` and requires one of `codes` in return.
    pub(crate) fn expect(&mut self, command: &Command<'_>, codes: &[u16]) -> FtpResult<Reply> {
        let reply = self.command(command)?;
        if reply.is_one_of(codes) {
            Ok(reply)
        } else {
            Err(FtpClientError::UnexpectedReply(reply))
        }
    }

    fn set_read_deadline(&self, timeout: Duration) -> FtpResult<()> {
        self.stream
            .tcp()
            .set_read_timeout(Some(timeout))
            .map_err(|e| FtpClientError::Socket("set read timeout", e))
    }

    fn apply_control_timeouts(&self) -> FtpResult<()> {
        let timeout = self.state.transfer_timeout();
        self.set_read_deadline(timeout)?;
        self.stream
            .tcp()
            .set_write_timeout(Some(timeout))
            .map_err(|e| FtpClientError::Socket("set write timeout", e))
    }

    // --------------------
    // Session state
    // --------------------

    /// Host name the session was opened with.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether USER, PASS or ACCT completed the login.
    pub fn is_logged_in(&self) -> bool {
        self.state.is_logged_in()
    }

    /// Whether the control connection runs over TLS.
    pub fn is_encrypted(&self) -> bool {
        self.stream.is_tls()
    }

    /// Current sticky failure flag.
    pub fn timeout_flag(&self) -> TimeoutFlag {
        self.state.timeout_flag()
    }

    /// Makes a flagged session usable again.
    pub fn clear_timeout_flag(&mut self) {
        self.state.set_timeout_flag(TimeoutFlag::None);
    }

    /// Deadline applied to every socket operation.
    pub fn transfer_timeout(&self) -> Duration {
        self.state.transfer_timeout()
    }

    /// Changes the deadline for the control and any open data connection.
    pub fn set_transfer_timeout(&mut self, timeout: Duration) -> FtpResult<()> {
        self.state.set_transfer_timeout(timeout);
        self.apply_control_timeouts()?;
        if let Some(channel) = &self.data {
            channel.apply_timeouts(self.state.transfer_timeout())?;
        }
        Ok(())
    }

    /// Replaces the overwrite heuristic used when a transfer verb is refused.
    pub fn set_overwrite_classifier(&mut self, classifier: Box<dyn OverwriteClassifier>) {
        self.overwrite = classifier;
    }

    /// Last reply read on the control connection.
    pub fn last_reply(&self) -> Option<&Reply> {
        self.last_reply.as_ref()
    }

    /// Text of the last reply, empty before the first one.
    pub fn last_reply_text(&self) -> String {
        self.last_reply.as_ref().map(Reply::text).unwrap_or_default()
    }

    /// Reads one pending reply, waiting at most `MAX_IMMEDIATE_REPLY_WAIT`.
    pub fn get_reply_immediately(&mut self) -> FtpResult<Reply> {
        let wait = self.state.transfer_timeout().min(MAX_IMMEDIATE_REPLY_WAIT);
        self.read_reply_within(wait)
    }

    // --------------------
    // Verbs
    // --------------------

    /// AUTH TLS followed by the handshake on the control connection.
    ///
    /// Returns the reply line with the negotiated version and cipher appended.
    pub fn auth_tls(&mut self) -> FtpResult<String> {
        let reply = self.expect(&Command::AuthTls, &[AUTH_ACCEPTED, SECURITY_DATA_REQUIRED])?;

        let config = tls::build_client_config(self.config.verify_certificates)?;
        let name = tls::server_name(&self.host)?;
        let tcp = self
            .stream
            .tcp()
            .try_clone()
            .map_err(|e| FtpClientError::Socket("clone", e))?;
        let result = tls::connect(&config, name.clone(), tcp, IoPhase::Connect);
        let tls_stream = self.track(result)?;

        let description = tls::describe(&tls_stream.conn);
        self.state
            .set_control_certificate(tls::end_entity_certificate(&tls_stream.conn));
        self.stream = NetStream::Tls(Box::new(tls_stream));
        self.tls_config = Some(config);
        self.server_name = Some(name);

        info!("Control connection to {} encrypted {description}", self.host);
        Ok(format!("{} {description}", reply.final_line()))
    }

    /// PBSZ 0 and PROT, selecting whether data connections get encrypted.
    pub fn protect(&mut self, level: ProtectionLevel) -> FtpResult<()> {
        self.expect(&Command::Pbsz(0), &[OK])?;
        self.expect(&Command::Prot(level), &[OK])?;
        Ok(())
    }

    /// USER. A 430 reply means the server still handles a previous login,
    /// so the command is resent after a short pause.
    pub fn user(&mut self, name: &str) -> FtpResult<UserOutcome> {
        let mut retries = 0;
        loop {
            let reply = self.command(&Command::User(name))?;
            match classify::classify_user(&reply) {
                Some(UserOutcome::Busy) if retries < MAX_LOGIN_RETRIES => {
                    retries += 1;
                    debug!("Login busy (430), retry {retries}/{MAX_LOGIN_RETRIES}");
                    thread::sleep(LOGIN_RETRY_DELAY);
                }
                Some(UserOutcome::Busy) | None => {
                    return Err(FtpClientError::UnexpectedReply(reply));
                }
                Some(outcome) => {
                    if outcome == UserOutcome::LoggedIn {
                        self.state.set_logged_in(true);
                    }
                    return Ok(outcome);
                }
            }
        }
    }

    pub fn pass(&mut self, password: &str) -> FtpResult<PassOutcome> {
        let reply = self.command(&Command::Pass(password))?;
        match classify::classify_pass(&reply) {
            Some(outcome) => {
                if outcome == PassOutcome::LoggedIn {
                    self.state.set_logged_in(true);
                }
                Ok(outcome)
            }
            None => Err(FtpClientError::UnexpectedReply(reply)),
        }
    }

    pub fn account(&mut self, account: &str) -> FtpResult<()> {
        self.expect(&Command::Acct(account), &[COMMAND_SUPERFLUOUS, LOGIN_SUCCESS])?;
        self.state.set_logged_in(true);
        Ok(())
    }

    /// SITE IDLE: ask the server to keep an idle session open for `secs`.
    pub fn idle(&mut self, secs: u32) -> FtpResult<()> {
        self.expect(&Command::SiteIdle(secs), &[OK])?;
        Ok(())
    }

    pub fn set_type(&mut self, transfer_type: TransferType) -> FtpResult<()> {
        self.expect(&Command::Type(transfer_type), &[OK])?;
        Ok(())
    }

    /// PWD, returning the quoted directory of the 257 reply.
    pub fn pwd(&mut self) -> FtpResult<String> {
        let reply = self.expect(&Command::Pwd, &[PATH_CREATED])?;
        parser::parse_quoted_path(reply.message()).ok_or_else(|| {
            FtpClientError::MalformedReply(format!("no quoted directory in {reply}"))
        })
    }

    pub fn chmod(&mut self, file: &str, mode: &str) -> FtpResult<()> {
        self.expect(&Command::SiteChmod { mode, file }, &[FILE_ACTION_OK, OK])?;
        Ok(())
    }

    pub fn delete(&mut self, file: &str) -> FtpResult<()> {
        self.expect(&Command::Dele(file), &[FILE_ACTION_OK, OK])?;
        Ok(())
    }

    /// SIZE of a remote file in bytes.
    pub fn size(&mut self, file: &str) -> FtpResult<u64> {
        let reply = self.expect(&Command::Size(file), &[FILE_STATUS])?;
        parser::parse_size(reply.message())
            .ok_or_else(|| FtpClientError::MalformedReply(format!("no size in {reply}")))
    }

    /// MDTM of a remote file. A date that is not exactly `YYYYMMDDhhmmss`
    /// is a malformed reply.
    pub fn date(&mut self, file: &str) -> FtpResult<chrono::DateTime<chrono::Utc>> {
        let reply = self.expect(&Command::Mdtm(file), &[FILE_STATUS])?;
        parser::parse_mdtm(reply.message())
            .ok_or_else(|| FtpClientError::MalformedReply(format!("bad date in {reply}")))
    }

    /// SITE with an arbitrary command, optionally followed by a file name.
    pub fn exec(&mut self, command: &str, file: Option<&str>) -> FtpResult<()> {
        self.expect(&Command::Site { command, file }, &[FILE_ACTION_OK, OK])?;
        Ok(())
    }

    pub fn noop(&mut self) -> FtpResult<()> {
        self.expect(&Command::Noop, &[OK])?;
        Ok(())
    }

    /// QUIT and close. On a flagged session QUIT is still sent but no reply
    /// is awaited. 221 and 421 both count as a clean goodbye.
    pub fn quit(mut self) -> FtpResult<()> {
        if self.data.take().is_some() {
            debug!("Dropping open data connection on QUIT");
        }

        let wire = Command::Quit.to_wire();
        if self.state.timeout_flag().is_set() {
            debug!("Session flagged ({}), not waiting for QUIT reply", self.timeout_flag());
            if let Err(e) = self.send_raw(&wire, "QUIT") {
                debug!("QUIT on flagged session failed: {e}");
            }
            return Ok(());
        }

        self.send_raw(&wire, "QUIT")?;
        let reply = self.read_reply()?;
        if !classify::is_goodbye(&reply) {
            return Err(FtpClientError::UnexpectedReply(reply));
        }
        if let Err(e) = self.stream.finish() {
            debug!("Closing control connection: {e}");
        }
        info!("Disconnected from {}", self.host);
        Ok(())
    }
}
