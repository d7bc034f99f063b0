//! RAX FTP Client
//!
//! Blocking FTP client engine for unattended file distribution: control
//! session with optional explicit TLS, PASV/PORT data connections, resume,
//! and rename/overwrite/directory-creation recovery.

pub mod client;
pub mod config;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod transfer;
pub mod utils;

pub use client::{ControlSession, ProtectionLevel, TimeoutFlag, TlsMode};
pub use config::{ClientConfig, ConnectionConfig, SessionConfig};
pub use error::{FtpClientError, FtpResult};
pub use protocol::{Greeting, PassOutcome, Reply, UserOutcome};
pub use transfer::{AsciiEncoder, DataMode, Direction, ListKind, TransferRequest, TransferType};
