//! Session facade over the embedded protocol runtime
//!
//! # Modules
//!
//! - [`manager`] - `BlockstackSession`, its builder and the authentication operations
//! - [`storage`] - File reads and writes
//! - [`encryption`] - Content encryption and decryption
//! - [`host_functions`] - Inbound result dispatch from the script
//! - [`pending`] - Correlation tables for callbacks awaiting a result

pub mod encryption;
pub mod host_functions;
pub mod manager;
pub mod pending;
pub mod storage;

pub use manager::{BlockstackSession, PendingSummary, SessionBuilder, SESSION_RELEASED};
pub use pending::{Callback, CorrelationToken};
