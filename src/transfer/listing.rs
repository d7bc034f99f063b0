//! Directory listings over the data connection
//!
//! LIST and NLST read the whole listing into memory, or only its first line
//! when the caller just wants to know whether something matches.

use log::debug;

use crate::client::ControlSession;
use crate::error::FtpResult;
use crate::protocol::responses::TRANSFER_ABORTED;
use crate::transfer::modes::{Direction, ListKind};

const LIST_CHUNK: usize = 4096;

impl ControlSession {
    /// Complete listing of `path` (empty for the working directory).
    pub fn list(&mut self, kind: ListKind, path: &str) -> FtpResult<Vec<u8>> {
        let request = self.request_for(Direction::List(kind), path);
        self.open_data(&request)?;

        let mut listing = Vec::new();
        let mut block = [0u8; LIST_CHUNK];
        loop {
            match self.read(&mut block) {
                Ok(0) => break,
                Ok(n) => listing.extend_from_slice(&block[..n]),
                Err(e) => {
                    self.data = None;
                    return Err(e);
                }
            }
        }

        self.close_data()?;
        debug!("Listing of '{path}' is {} bytes", listing.len());
        Ok(listing)
    }

    /// File names from NLST, one per line.
    pub fn list_names(&mut self, path: &str) -> FtpResult<Vec<String>> {
        let listing = self.list(ListKind::Names, path)?;
        Ok(String::from_utf8_lossy(&listing)
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// The first line of a listing, without its terminator. Empty when the
    /// listing is empty.
    ///
    /// The rest of the listing is not read. A server that notices the early
    /// close may answer 426, which counts as completion here.
    pub fn list_first_line(&mut self, kind: ListKind, path: &str) -> FtpResult<String> {
        let request = self.request_for(Direction::List(kind), path);
        self.open_data(&request)?;

        let mut line = Vec::new();
        let mut block = [0u8; LIST_CHUNK];
        loop {
            match self.read(&mut block) {
                Ok(0) => break,
                Ok(n) => {
                    line.extend_from_slice(&block[..n]);
                    if let Some(end) = line.windows(2).position(|w| w == b"\r\n") {
                        line.truncate(end);
                        break;
                    }
                }
                Err(e) => {
                    self.data = None;
                    return Err(e);
                }
            }
        }

        self.close_data_accepting(&[TRANSFER_ABORTED])?;
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}
