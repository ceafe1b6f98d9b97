//! Local stream transport for pupila workers.
//!
//! Provides the byte-stream layer the pull/push sockets are built on:
//! a Unix domain socket listener with bounded-wait accept, and the
//! connected [`IpcStream`] type with read/write timeouts.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use traits::{is_timeout, IpcStream};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
