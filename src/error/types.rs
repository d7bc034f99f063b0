//! Error types
//!
//! One error enum for the client engine, grouped into four failure classes.

use std::fmt;
use std::io::{self, ErrorKind};

use crate::client::state::TimeoutFlag;
use crate::protocol::{AddressError, Reply};

/// Which I/O step a transient failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoPhase {
    Connect,
    Accept,
    ControlRead,
    ControlWrite,
    DataRead,
    DataWrite,
}

impl fmt::Display for IoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IoPhase::Connect => "connecting",
            IoPhase::Accept => "accepting data connection",
            IoPhase::ControlRead => "reading reply",
            IoPhase::ControlWrite => "sending command",
            IoPhase::DataRead => "reading data",
            IoPhase::DataWrite => "writing data",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by callers to decide on retry or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The server answered with a code the operation does not accept.
    Protocol,
    /// Timeout, reset or hangup. The session is flagged.
    Transient,
    /// A reply arrived but could not be parsed.
    Malformed,
    /// Socket, TLS or local resource failure.
    Local,
}

/// FTP client errors
#[derive(Debug)]
pub enum FtpClientError {
    UnexpectedReply(Reply),
    Timeout(IoPhase),
    PeerReset(IoPhase),
    RemoteHangup,
    /// The session carries a sticky flag from an earlier failure.
    SessionFlagged(TimeoutFlag),
    MalformedReply(String),
    InvalidAddress(AddressError),
    Resolve(String, io::Error),
    NoIpv4Address(String),
    Socket(&'static str, io::Error),
    Io(io::Error),
    Tls(rustls::Error),
    TlsSetup(String),
    MissingDataCertificate,
    UncomparableCertificates,
    CertificateMismatch,
    DataChannelBusy,
    NoDataChannel,
}

impl FtpClientError {
    /// Sorts an I/O error from `phase` into timeout, reset or plain I/O failure.
    pub fn from_io(error: io::Error, phase: IoPhase) -> Self {
        match error.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => FtpClientError::Timeout(phase),
            ErrorKind::ConnectionReset => FtpClientError::PeerReset(phase),
            _ => FtpClientError::Io(error),
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            FtpClientError::UnexpectedReply(_) => FailureClass::Protocol,
            FtpClientError::Timeout(_)
            | FtpClientError::PeerReset(_)
            | FtpClientError::RemoteHangup
            | FtpClientError::SessionFlagged(_) => FailureClass::Transient,
            FtpClientError::MalformedReply(_) | FtpClientError::InvalidAddress(_) => {
                FailureClass::Malformed
            }
            _ => FailureClass::Local,
        }
    }

    /// True for a deadline expiry, fresh or remembered by the session.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FtpClientError::Timeout(_) | FtpClientError::SessionFlagged(TimeoutFlag::TimedOut)
        )
    }

    /// The reply behind a protocol failure.
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            FtpClientError::UnexpectedReply(reply) => Some(reply),
            _ => None,
        }
    }
}

impl fmt::Display for FtpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpClientError::UnexpectedReply(reply) => write!(f, "Unexpected reply: {reply}"),
            FtpClientError::Timeout(phase) => write!(f, "Timeout while {phase}"),
            FtpClientError::PeerReset(phase) => write!(f, "Connection reset while {phase}"),
            FtpClientError::RemoteHangup => write!(f, "Remote hang up"),
            FtpClientError::SessionFlagged(flag) => {
                write!(f, "Session unusable after earlier failure: {flag}")
            }
            FtpClientError::MalformedReply(msg) => write!(f, "Malformed reply: {msg}"),
            FtpClientError::InvalidAddress(e) => write!(f, "Invalid data address: {e}"),
            FtpClientError::Resolve(host, e) => write!(f, "Failed to resolve {host}: {e}"),
            FtpClientError::NoIpv4Address(host) => write!(f, "No IPv4 address for {host}"),
            FtpClientError::Socket(op, e) => write!(f, "Socket {op} failed: {e}"),
            FtpClientError::Io(e) => write!(f, "IO error: {e}"),
            FtpClientError::Tls(e) => write!(f, "TLS error: {e}"),
            FtpClientError::TlsSetup(msg) => write!(f, "TLS setup failed: {msg}"),
            FtpClientError::MissingDataCertificate => {
                write!(f, "Server did not present a certificate for data connection")
            }
            FtpClientError::UncomparableCertificates => write!(
                f,
                "Failed to compare server certificates for control and data connection"
            ),
            FtpClientError::CertificateMismatch => write!(
                f,
                "Server certificate for data connection differs from control connection"
            ),
            FtpClientError::DataChannelBusy => write!(f, "A data connection is already open"),
            FtpClientError::NoDataChannel => write!(f, "No data connection is open"),
        }
    }
}

impl std::error::Error for FtpClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FtpClientError::Resolve(_, e) | FtpClientError::Socket(_, e) | FtpClientError::Io(e) => {
                Some(e)
            }
            FtpClientError::Tls(e) => Some(e),
            FtpClientError::InvalidAddress(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FtpClientError {
    fn from(error: io::Error) -> Self {
        FtpClientError::Io(error)
    }
}

impl From<rustls::Error> for FtpClientError {
    fn from(error: rustls::Error) -> Self {
        FtpClientError::Tls(error)
    }
}

impl From<AddressError> for FtpClientError {
    fn from(error: AddressError) -> Self {
        FtpClientError::InvalidAddress(error)
    }
}

/// Result alias used across the client
pub type FtpResult<T> = Result<T, FtpClientError>;
