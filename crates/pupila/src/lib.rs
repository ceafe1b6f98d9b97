//! Per-stream frame relay worker for video processing pipelines.
//!
//! A pupila worker sits between two pipeline stages. It pulls RGB frame
//! messages from upstream, lets one user processing unit edit each frame's
//! pixels in place, and pushes the result downstream.
//!
//! # Crate Structure
//!
//! - [`transport`]: Unix domain socket transport
//! - [`frame`]: length-prefixed framing over byte streams
//! - [`message`]: frame message codec and zero-copy pixel views
//! - [`app`]: ABI and SDK for writing processing units
//! - [`worker`]: unit loading, relay loop and worker lifecycle

/// Re-export transport types.
pub mod transport {
    pub use pupila_transport::*;
}

/// Re-export framing types.
pub mod frame {
    pub use pupila_frame::*;
}

/// Re-export message codec types.
pub mod message {
    pub use pupila_message::*;
}

/// Re-export the processing unit SDK.
pub mod app {
    pub use pupila_app::*;
}

/// Re-export worker types.
pub mod worker {
    pub use pupila_worker::*;
}
