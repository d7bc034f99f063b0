//! Transfer module for the FTP client
//!
//! Data connection negotiation, byte transfer and directory listings.

pub mod ascii;
pub mod data_channel;
pub mod file_ops;
pub mod listing;
pub mod modes;
pub mod request;
pub mod results;

// Re-export key types
pub use ascii::AsciiEncoder;
pub use data_channel::{MAX_BIND_ATTEMPTS, MAX_DATA_CONNECT_RETRIES};
pub use modes::{DataMode, Direction, ListKind, TransferType};
pub use request::TransferRequest;
pub use results::DataChannel;
