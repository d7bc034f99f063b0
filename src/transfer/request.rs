//! Transfer request
//!
//! Everything the negotiator needs to know to open one data connection.

use crate::protocol::Command;
use crate::transfer::modes::{DataMode, Direction, ListKind, TransferType};

/// What to transfer and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub path: String,
    /// Resume offset: APPE for uploads, REST + RETR for downloads.
    pub offset: u64,
    pub direction: Direction,
    pub mode: DataMode,
    pub transfer_type: TransferType,
    /// SO_SNDBUF/SO_RCVBUF hint for the data socket.
    pub sockbuf_size: Option<usize>,
    /// Wrap the data connection in TLS.
    pub encrypt: bool,
}

impl TransferRequest {
    fn new(path: &str, direction: Direction) -> Self {
        Self {
            path: path.to_string(),
            offset: 0,
            direction,
            mode: DataMode::default(),
            transfer_type: TransferType::default(),
            sockbuf_size: None,
            encrypt: false,
        }
    }

    pub fn upload(path: &str) -> Self {
        Self::new(path, Direction::Upload)
    }

    pub fn download(path: &str) -> Self {
        Self::new(path, Direction::Download)
    }

    /// LIST or NLST; an empty path lists the current directory.
    pub fn listing(kind: ListKind, path: &str) -> Self {
        Self::new(path, Direction::List(kind))
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_mode(mut self, mode: DataMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_type(mut self, transfer_type: TransferType) -> Self {
        self.transfer_type = transfer_type;
        self
    }

    pub fn with_sockbuf(mut self, size: Option<usize>) -> Self {
        self.sockbuf_size = size;
        self
    }

    pub fn with_encryption(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// A download that continues at `offset` needs REST first.
    pub fn resumes_download(&self) -> bool {
        self.direction == Direction::Download && self.offset > 0
    }

    /// The verb that starts the transfer.
    pub fn verb(&self) -> Command<'_> {
        let path = (!self.path.is_empty()).then_some(self.path.as_str());
        match self.direction {
            Direction::Upload if self.offset > 0 => Command::Appe(&self.path),
            Direction::Upload => Command::Stor(&self.path),
            Direction::Download => Command::Retr(&self.path),
            Direction::List(ListKind::Long) => Command::List(path),
            Direction::List(ListKind::Names) => Command::Nlst(path),
        }
    }
}
