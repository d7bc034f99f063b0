//! FTP Protocol implementation
//!
//! Command rendering, reply assembly and reply classification for the client.

pub mod address;
pub mod classify;
pub mod commands;
pub mod parser;
pub mod reader;
pub mod responses;

pub use address::{AddressError, AddressTuple};
pub use classify::{
    CdOutcome, Greeting, OverwriteClassifier, OverwritePattern, PassOutcome, RenameStep,
    SubstringOverwriteClassifier, TransferOpen, UserOutcome,
};
pub use commands::Command;
pub use reader::{ReadFailure, ReplyReader};
pub use responses::Reply;
