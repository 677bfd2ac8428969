//! Smart HTTP gateway core.
//!
//! Exposes a git repository over HTTP by routing requests into either a
//! spawned `git` process speaking the stateless-rpc sub-protocol or a
//! static file response with protocol-correct framing and cache headers.
//!
//! The gateway performs no authentication: the caller supplies the
//! repository root and a precomputed write-access decision with every
//! request and must have authenticated the client beforehand.

pub mod access;
mod files;
mod routes;
mod rpc;

pub use routes::Gateway;
