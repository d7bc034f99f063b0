//! FTP Response handling
//!
//! Reply codes the client acts on and the `Reply` value produced by the reply reader.

use std::fmt;

/// Reply codes the client distinguishes
pub const SERVICE_READY_SOON: u16 = 120;
pub const DATA_ALREADY_OPEN: u16 = 125;
pub const FILE_STATUS_OK: u16 = 150;
pub const OK: u16 = 200;
pub const COMMAND_SUPERFLUOUS: u16 = 202;
pub const SYSTEM_STATUS: u16 = 211;
pub const DIRECTORY_STATUS: u16 = 212;
pub const FILE_STATUS: u16 = 213;
pub const READY: u16 = 220;
pub const CLOSING: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE: u16 = 227;
pub const LOGIN_SUCCESS: u16 = 230;
pub const AUTH_ACCEPTED: u16 = 234;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATH_CREATED: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const ACCOUNT_REQUIRED: u16 = 332;
pub const SECURITY_DATA_REQUIRED: u16 = 334;
pub const PENDING_FURTHER_INFO: u16 = 350;
pub const SERVICE_UNAVAILABLE: u16 = 421;
pub const CANNOT_OPEN_DATA: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const LOGIN_BUSY: u16 = 430;
pub const FILE_UNAVAILABLE: u16 = 550;
pub const NAME_NOT_ALLOWED: u16 = 553;

/// A complete server reply: its three-digit code and every physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    lines: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns true when the code is one of `codes`.
    pub fn is_one_of(&self, codes: &[u16]) -> bool {
        codes.contains(&self.code)
    }

    /// The terminating line, including its code.
    pub fn final_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }

    /// Text of the final line after the code and separator.
    pub fn message(&self) -> &str {
        self.final_line().get(4..).unwrap_or("").trim_end()
    }

    /// All lines joined with CRLF, as the server sent them.
    pub fn text(&self) -> String {
        self.lines.join("\r\n")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}", self.lines.join(" | "))
        }
    }
}
