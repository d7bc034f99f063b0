//! Client control session
//!
//! Handles the control connection, its TLS upgrade, session state and the
//! verbs that run over the control channel alone.

pub mod keepalive;
pub mod session;
pub mod state;
pub mod stream;
pub mod tls;

pub use session::ControlSession;
pub use state::TimeoutFlag;
pub use tls::{ProtectionLevel, TlsMode};
