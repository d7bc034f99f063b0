//! Module `state`
//!
//! Per-session bookkeeping: login status, the sticky failure flag, the
//! transfer deadline and what the session remembers between transfers.

use std::fmt;
use std::time::Duration;

/// Sticky marker of the last transient failure on a session.
///
/// Once set, command verbs refuse to run until the caller clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutFlag {
    #[default]
    None,
    /// A deadline expired.
    TimedOut,
    /// The peer reset the connection.
    PeerReset,
    /// The peer closed the connection without being asked to.
    Hangup,
}

impl TimeoutFlag {
    pub fn is_set(&self) -> bool {
        !matches!(self, TimeoutFlag::None)
    }
}

impl fmt::Display for TimeoutFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutFlag::None => write!(f, "none"),
            TimeoutFlag::TimedOut => write!(f, "timed out"),
            TimeoutFlag::PeerReset => write!(f, "connection reset"),
            TimeoutFlag::Hangup => write!(f, "remote hang up"),
        }
    }
}

/// Mutable state of a control session.
#[derive(Debug)]
pub struct SessionState {
    logged_in: bool,
    timeout_flag: TimeoutFlag,
    transfer_timeout: Duration,
    data_port: Option<u16>,
    control_certificate: Option<Vec<u8>>,
}

impl SessionState {
    pub fn new(transfer_timeout: Duration) -> Self {
        Self {
            logged_in: false,
            timeout_flag: TimeoutFlag::None,
            transfer_timeout: clamp_timeout(transfer_timeout),
            data_port: None,
            control_certificate: None,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn timeout_flag(&self) -> TimeoutFlag {
        self.timeout_flag
    }

    pub fn transfer_timeout(&self) -> Duration {
        self.transfer_timeout
    }

    /// Local port of the last active-mode listener, kept for reuse.
    pub fn data_port(&self) -> Option<u16> {
        self.data_port
    }

    /// DER of the end-entity certificate seen on the TLS control channel.
    pub fn control_certificate(&self) -> Option<&[u8]> {
        self.control_certificate.as_deref()
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_logged_in(&mut self, value: bool) {
        self.logged_in = value;
    }

    pub fn set_timeout_flag(&mut self, flag: TimeoutFlag) {
        self.timeout_flag = flag;
    }

    pub fn set_transfer_timeout(&mut self, timeout: Duration) {
        self.transfer_timeout = clamp_timeout(timeout);
    }

    pub fn set_data_port(&mut self, port: Option<u16>) {
        self.data_port = port;
    }

    pub fn set_control_certificate(&mut self, der: Option<Vec<u8>>) {
        self.control_certificate = der;
    }
}

/// Socket timeouts of zero mean "block forever" to the OS, so never go below a second.
fn clamp_timeout(timeout: Duration) -> Duration {
    timeout.max(Duration::from_secs(1))
}
