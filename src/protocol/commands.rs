//! FTP Command builder
//!
//! One variant per verb the client sends. `Display` renders the exact wire
//! text without the line terminator.

use std::fmt;

use crate::client::tls::ProtectionLevel;
use crate::protocol::address::AddressTuple;
use crate::transfer::TransferType;

/// A command ready to be written to the control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    User(&'a str),
    Pass(&'a str),
    Acct(&'a str),
    AuthTls,
    Pbsz(u32),
    Prot(ProtectionLevel),
    SiteIdle(u32),
    Pwd,
    Type(TransferType),
    Cwd(&'a str),
    Mkd(&'a str),
    SiteChmod { mode: &'a str, file: &'a str },
    Rnfr(&'a str),
    Rnto(&'a str),
    Dele(&'a str),
    Site { command: &'a str, file: Option<&'a str> },
    List(Option<&'a str>),
    Nlst(Option<&'a str>),
    Pasv,
    Port(AddressTuple),
    Rest(u64),
    Stor(&'a str),
    Appe(&'a str),
    Retr(&'a str),
    Size(&'a str),
    Mdtm(&'a str),
    Stat,
    Noop,
    Quit,
}

impl Command<'_> {
    /// Wire bytes including the CRLF terminator.
    pub fn to_wire(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }

    /// Text safe to write to the log.
    pub fn loggable(&self) -> String {
        match self {
            Command::Pass(_) => "PASS ****".to_string(),
            Command::Acct(_) => "ACCT ****".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::User(name) => write!(f, "USER {name}"),
            Command::Pass(password) => write!(f, "PASS {password}"),
            Command::Acct(account) => write!(f, "ACCT {account}"),
            Command::AuthTls => write!(f, "AUTH TLS"),
            Command::Pbsz(size) => write!(f, "PBSZ {size}"),
            Command::Prot(level) => write!(f, "PROT {}", level.code()),
            Command::SiteIdle(secs) => write!(f, "SITE IDLE {secs}"),
            Command::Pwd => write!(f, "PWD"),
            Command::Type(kind) => write!(f, "TYPE {}", kind.code()),
            Command::Cwd(dir) => write!(f, "CWD {dir}"),
            Command::Mkd(dir) => write!(f, "MKD {dir}"),
            Command::SiteChmod { mode, file } => write!(f, "SITE CHMOD {mode} {file}"),
            Command::Rnfr(path) => write!(f, "RNFR {path}"),
            Command::Rnto(path) => write!(f, "RNTO {path}"),
            Command::Dele(path) => write!(f, "DELE {path}"),
            Command::Site { command, file: None } => write!(f, "SITE {command}"),
            Command::Site {
                command,
                file: Some(file),
            } => write!(f, "SITE {command} {file}"),
            Command::List(None) => write!(f, "LIST"),
            Command::List(Some(path)) => write!(f, "LIST {path}"),
            Command::Nlst(None) => write!(f, "NLST"),
            Command::Nlst(Some(path)) => write!(f, "NLST {path}"),
            Command::Pasv => write!(f, "PASV"),
            Command::Port(tuple) => write!(f, "PORT {tuple}"),
            Command::Rest(offset) => write!(f, "REST {offset}"),
            Command::Stor(path) => write!(f, "STOR {path}"),
            Command::Appe(path) => write!(f, "APPE {path}"),
            Command::Retr(path) => write!(f, "RETR {path}"),
            Command::Size(path) => write!(f, "SIZE {path}"),
            Command::Mdtm(path) => write!(f, "MDTM {path}"),
            Command::Stat => write!(f, "STAT"),
            Command::Noop => write!(f, "NOOP"),
            Command::Quit => write!(f, "QUIT"),
        }
    }
}
