//! Git process boundary for gitgate.
//!
//! This crate owns the pkt-line framing used by the smart HTTP protocol's
//! advertisement preamble and the invocation of the git executable in
//! stateless-rpc mode. It holds no repository state of its own; every
//! operation re-touches the repository through git.

mod commands;
mod error;
mod pktline;
mod service;

pub use commands::GitRunner;
pub use error::GitError;
pub use pktline::{advertisement_preamble, PktLine, PktLineReader, PktLineWriter};
pub use service::Service;

/// Result type for git boundary operations.
pub type Result<T> = std::result::Result<T, GitError>;
