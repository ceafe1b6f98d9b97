//! Per-stream frame worker.
//!
//! A worker pulls frame messages from one upstream socket, hands each
//! frame's pixels to a single user processing unit, and pushes the result
//! to one downstream socket:
//!
//! ```text
//! upstream bytes -> FrameMessage -> PixelView -> unit -> FrameMessage -> downstream bytes
//! ```
//!
//! [`Worker`] drives the lifecycle, [`Relay`] runs one iteration at a time,
//! and [`UnitLoader`] resolves the configured unit once at startup.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod relay;
pub mod sink;
pub mod socket;
pub mod unit;

pub use config::{parse_duration, WorkerConfig};
pub use error::{ConfigError, LoadError, Result, SinkError, SocketError, UnitError, WorkerError};
pub use lifecycle::{StopReason, Worker, WorkerReport, WorkerState};
pub use loader::{DynamicUnit, UnitFactory, UnitLoader};
pub use relay::{LoopSignal, Relay, RelayStats};
#[cfg(feature = "kafka")]
pub use sink::KafkaClient;
pub use sink::{ProducerClient, SinkConfig, TopicProducer};
pub use socket::{InputPullSocket, OutputPushSocket, PullSocket, PushSocket};
pub use unit::{FrameOutput, IdentityUnit, ProcessingUnit, IDENTITY_UNIT};
