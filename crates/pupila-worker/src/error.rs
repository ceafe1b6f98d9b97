use std::path::PathBuf;

use pupila_message::MessageError;

/// Failure to load or instantiate the user processing unit.
///
/// Always fatal at startup: no socket is ever acquired after one of these.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Nothing exists at the configured path and no registered unit has that key.
    #[error("user module not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The dynamic loader rejected the file.
    #[error("failed to load user module {}: {source}", path.display())]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// The library loaded but does not export the entry symbol.
    #[error("user module {} does not export `{symbol}`: {source}", path.display())]
    MissingEntry {
        path: PathBuf,
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// The entry symbol returned a null vtable.
    #[error("user module {} returned a null vtable", path.display())]
    NullVTable { path: PathBuf },

    /// The unit was built against a different ABI.
    #[error("user module {} targets ABI v{found}, host supports v{expected}", path.display())]
    AbiMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    /// The unit's constructor failed or panicked.
    #[error("user module {} failed to construct its processing unit", path.display())]
    CreateFailed { path: PathBuf },
}

/// Errors from the pull/push socket collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The socket was used after `close()`.
    #[error("socket is closed")]
    Closed,

    /// Binding, accepting or connecting failed.
    #[error("transport error: {0}")]
    Transport(#[from] pupila_transport::TransportError),

    /// Frame-level error outside the recovered cases.
    #[error("frame error: {0}")]
    Frame(#[from] pupila_frame::FrameError),
}

/// A processing unit failed on one frame.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    /// The unit reported an error for this frame.
    #[error("unit {unit} failed: {message}")]
    Failed { unit: String, message: String },

    /// The unit rejected the frame handed to it.
    #[error("unit {unit} rejected the frame: {message}")]
    InvalidFrame { unit: String, message: String },

    /// The unit panicked; the panic was stopped before reaching the worker.
    #[error("unit {unit} panicked: {message}")]
    Panicked { unit: String, message: String },
}

/// Errors surfaced by the worker and its relay loop.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The required user module path is missing or empty.
    #[error("missing configuration: {0}")]
    MissingConfiguration(&'static str),

    /// The user module could not be loaded.
    #[error("user module error: {0}")]
    UserModule(#[from] LoadError),

    /// One message failed to decode. Recovered by the relay loop.
    #[error("malformed message: {0}")]
    Malformed(#[from] MessageError),

    /// A socket failed in a way the relay cannot recover from.
    #[error("socket error: {0}")]
    Socket(#[from] SocketError),

    /// The processing unit failed.
    #[error("processing unit error: {0}")]
    Unit(#[from] UnitError),
}

impl WorkerError {
    /// True if the error only costs the current message.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WorkerError::Malformed(_))
    }
}

/// Errors loading worker configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid duration `{0}` (expected e.g. 150ms, 2s or 2)")]
    InvalidDuration(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors from the downstream topic sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// `KAFKA_BOOTSTRAP_SERVERS` is not set.
    #[error("KAFKA_BOOTSTRAP_SERVERS is not set")]
    MissingBootstrapServers,

    /// The producer client could not be built from its configuration.
    #[error("message bus client: {message}")]
    Client { message: String },

    /// The producer client rejected the record.
    #[error("failed to produce to topic {topic}: {message}")]
    Produce { topic: String, message: String },
}

pub type Result<T> = std::result::Result<T, WorkerError>;
