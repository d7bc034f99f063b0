//! Module `classify`
//!
//! Maps replies to per-verb outcomes. Every "is this reply good enough"
//! decision of the client lives here, one function per verb family.

use serde::Deserialize;
use std::fmt;

use crate::protocol::responses::*;
use crate::transfer::DataMode;

/// Decides whether a refused transfer verb means "target exists, delete it first".
pub trait OverwriteClassifier: fmt::Debug + Send + Sync {
    fn is_overwrite_conflict(&self, reply: &Reply) -> bool;
}

/// One (code, text) pair recognised as an overwrite refusal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverwritePattern {
    pub code: u16,
    pub text: String,
}

impl OverwritePattern {
    pub fn new(code: u16, text: &str) -> Self {
        Self {
            code,
            text: text.to_string(),
        }
    }
}

/// Case-insensitive substring match against the reply text.
#[derive(Debug, Clone)]
pub struct SubstringOverwriteClassifier {
    patterns: Vec<OverwritePattern>,
}

impl Default for SubstringOverwriteClassifier {
    fn default() -> Self {
        Self {
            patterns: vec![
                OverwritePattern::new(NAME_NOT_ALLOWED, "(Overwrite)"),
                OverwritePattern::new(FILE_UNAVAILABLE, "Overwrite permission denied"),
            ],
        }
    }
}

impl SubstringOverwriteClassifier {
    /// Built-in patterns plus `extra`.
    pub fn with_patterns(extra: &[OverwritePattern]) -> Self {
        let mut classifier = Self::default();
        classifier.patterns.extend_from_slice(extra);
        classifier
    }
}

impl OverwriteClassifier for SubstringOverwriteClassifier {
    fn is_overwrite_conflict(&self, reply: &Reply) -> bool {
        let text = reply.text().to_ascii_lowercase();
        self.patterns
            .iter()
            .any(|p| p.code == reply.code() && text.contains(&p.text.to_ascii_lowercase()))
    }
}

/// Outcome of the server greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Ready,
    /// 230 on connect: no login needed.
    AlreadyLoggedIn,
}

pub fn classify_greeting(reply: &Reply) -> Option<Greeting> {
    match reply.code() {
        READY | SERVICE_READY_SOON => Some(Greeting::Ready),
        LOGIN_SUCCESS => Some(Greeting::AlreadyLoggedIn),
        _ => None,
    }
}

/// Outcome of USER.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOutcome {
    LoggedIn,
    PasswordRequired,
    AccountRequired,
    /// 430: the server is still busy with a previous login, retry.
    Busy,
}

pub fn classify_user(reply: &Reply) -> Option<UserOutcome> {
    match reply.code() {
        LOGIN_SUCCESS => Some(UserOutcome::LoggedIn),
        PASSWORD_REQUIRED => Some(UserOutcome::PasswordRequired),
        ACCOUNT_REQUIRED => Some(UserOutcome::AccountRequired),
        LOGIN_BUSY => Some(UserOutcome::Busy),
        _ => None,
    }
}

/// Outcome of PASS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    LoggedIn,
    AccountRequired,
}

pub fn classify_pass(reply: &Reply) -> Option<PassOutcome> {
    match reply.code() {
        LOGIN_SUCCESS | COMMAND_SUPERFLUOUS => Some(PassOutcome::LoggedIn),
        ACCOUNT_REQUIRED => Some(PassOutcome::AccountRequired),
        _ => None,
    }
}

/// Outcome of CWD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdOutcome {
    Ok,
    /// Directory missing and the caller asked for creation.
    NeedsCreate,
    Denied(u16),
}

pub fn classify_cd(reply: &Reply, create: bool) -> CdOutcome {
    match reply.code() {
        FILE_ACTION_OK | OK => CdOutcome::Ok,
        FILE_UNAVAILABLE if create => CdOutcome::NeedsCreate,
        code => CdOutcome::Denied(code),
    }
}

/// Generic "command done" replies for DELE, SITE, CWD and friends.
pub fn is_completed(reply: &Reply) -> bool {
    reply.is_one_of(&[FILE_ACTION_OK, OK])
}

/// Outcome of a transfer verb (STOR/APPE/RETR/LIST/NLST).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOpen {
    Opened,
    OverwriteConflict,
    /// 425: the server could not open the data connection.
    CannotOpenData,
    Refused,
}

/// Passive mode accepts 125/150. Active mode additionally takes 120/200/250,
/// which some servers send before connecting back.
pub fn classify_transfer(
    reply: &Reply,
    mode: DataMode,
    overwrite: &dyn OverwriteClassifier,
) -> TransferOpen {
    let opened = match mode {
        DataMode::Passive => reply.is_one_of(&[FILE_STATUS_OK, DATA_ALREADY_OPEN]),
        DataMode::Active => reply.is_one_of(&[
            FILE_STATUS_OK,
            DATA_ALREADY_OPEN,
            SERVICE_READY_SOON,
            FILE_ACTION_OK,
            OK,
        ]),
    };
    if opened {
        TransferOpen::Opened
    } else if overwrite.is_overwrite_conflict(reply) {
        TransferOpen::OverwriteConflict
    } else if reply.code() == CANNOT_OPEN_DATA {
        TransferOpen::CannotOpenData
    } else {
        TransferOpen::Refused
    }
}

/// Outcome of one RNFR or RNTO step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStep {
    Accepted,
    /// 550: usually a missing target directory.
    MissingDirectory,
    Refused,
}

pub fn classify_rnfr(reply: &Reply) -> RenameStep {
    match reply.code() {
        PENDING_FURTHER_INFO | OK => RenameStep::Accepted,
        FILE_UNAVAILABLE => RenameStep::MissingDirectory,
        _ => RenameStep::Refused,
    }
}

pub fn classify_rnto(reply: &Reply) -> RenameStep {
    match reply.code() {
        FILE_ACTION_OK | OK => RenameStep::Accepted,
        FILE_UNAVAILABLE => RenameStep::MissingDirectory,
        _ => RenameStep::Refused,
    }
}

/// Final reply after a data transfer.
pub fn is_transfer_complete(reply: &Reply) -> bool {
    reply.is_one_of(&[TRANSFER_COMPLETE, FILE_ACTION_OK])
}

/// STAT reply accepted by the keepalive.
pub fn is_status(reply: &Reply) -> bool {
    reply.is_one_of(&[SYSTEM_STATUS, DIRECTORY_STATUS, FILE_STATUS])
}

/// QUIT is fine with 421 as well: the server is going away either way.
pub fn is_goodbye(reply: &Reply) -> bool {
    reply.is_one_of(&[CLOSING, SERVICE_UNAVAILABLE])
}
