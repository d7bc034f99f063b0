//! FTP Transfer modes
//!
//! Data connection mode, transfer direction and representation type.

use serde::Deserialize;
use std::fmt;

/// Who opens the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Server listens (PASV), client connects.
    #[default]
    Passive,
    /// Client listens (PORT), server connects.
    Active,
}

/// Directory listing flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// LIST: long format, one entry per line.
    Long,
    /// NLST: names only.
    Names,
}

/// Which way bytes flow over the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
    /// Directory listing, read by the client.
    List(ListKind),
}

impl Direction {
    pub fn receives(&self) -> bool {
        !matches!(self, Direction::Upload)
    }
}

/// Representation type set with TYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferType {
    Ascii,
    #[default]
    Binary,
}

impl TransferType {
    pub fn code(&self) -> char {
        match self {
            TransferType::Ascii => 'A',
            TransferType::Binary => 'I',
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Passive => write!(f, "passive"),
            DataMode::Active => write!(f, "active"),
        }
    }
}
