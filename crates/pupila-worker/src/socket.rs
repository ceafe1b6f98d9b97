use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use pupila_frame::{FrameConfig, FrameError, FrameReader, FrameWriter, DEFAULT_MAX_PAYLOAD};
use pupila_transport::{IpcStream, UnixDomainSocket};
use tracing::{debug, warn};

use crate::error::SocketError;

/// Default bounded wait for the next upstream message.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Default write timeout towards the downstream stage.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of raw upstream payloads.
pub trait PullSocket {
    /// Wait a bounded time for the next payload. `Ok(None)` means nothing arrived.
    fn recv(&mut self) -> Result<Option<BytesMut>, SocketError>;

    /// Release the transport. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), SocketError>;
}

/// Sink for processed payloads.
pub trait PushSocket {
    /// Push one payload downstream. Delivery is not acknowledged.
    fn send(&mut self, payload: &[u8]) -> Result<(), SocketError>;

    /// Release the transport. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), SocketError>;
}

impl<S: PullSocket + ?Sized> PullSocket for Box<S> {
    fn recv(&mut self) -> Result<Option<BytesMut>, SocketError> {
        (**self).recv()
    }

    fn close(&mut self) -> Result<(), SocketError> {
        (**self).close()
    }
}

impl<S: PushSocket + ?Sized> PushSocket for Box<S> {
    fn send(&mut self, payload: &[u8]) -> Result<(), SocketError> {
        (**self).send(payload)
    }

    fn close(&mut self) -> Result<(), SocketError> {
        (**self).close()
    }
}

/// Pull side: listens on a Unix socket and reads frames from one upstream
/// stage at a time.
///
/// Nothing is bound until the first `recv`.
pub struct InputPullSocket {
    path: PathBuf,
    recv_timeout: Duration,
    max_payload_size: usize,
    listener: Option<UnixDomainSocket>,
    upstream: Option<FrameReader<IpcStream>>,
    closed: bool,
}

impl InputPullSocket {
    pub fn new(path: impl Into<PathBuf>, recv_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            recv_timeout,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            listener: None,
            upstream: None,
            closed: false,
        }
    }

    /// Override the largest accepted payload.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn listener(&mut self) -> Result<&UnixDomainSocket, SocketError> {
        if self.listener.is_none() {
            let socket = UnixDomainSocket::bind(&self.path)?;
            debug!(path = ?self.path, "input socket acquired");
            self.listener = Some(socket);
        }
        self.listener.as_ref().ok_or(SocketError::Closed)
    }

    fn reset_upstream(&mut self) {
        if let Some(reader) = self.upstream.take() {
            let _ = reader.get_ref().shutdown();
        }
    }
}

impl PullSocket for InputPullSocket {
    fn recv(&mut self) -> Result<Option<BytesMut>, SocketError> {
        if self.closed {
            return Err(SocketError::Closed);
        }

        if self.upstream.is_none() {
            let timeout = self.recv_timeout;
            let Some(stream) = self.listener()?.accept_timeout(timeout)? else {
                return Ok(None);
            };
            let config = FrameConfig {
                max_payload_size: self.max_payload_size,
                read_timeout: Some(timeout),
                write_timeout: None,
            };
            self.upstream = Some(FrameReader::with_config_ipc(stream, config)?);
            debug!(path = ?self.path, "upstream connected");
        }

        let Some(reader) = self.upstream.as_mut() else {
            return Ok(None);
        };

        match reader.read_frame() {
            Ok(frame) => Ok(Some(frame.into_payload())),
            Err(err) if err.is_timeout() => Ok(None),
            Err(FrameError::ConnectionClosed) => {
                debug!(path = ?self.path, "upstream disconnected");
                self.reset_upstream();
                Ok(None)
            }
            Err(err) => {
                warn!(path = ?self.path, error = %err, "resetting upstream connection");
                self.reset_upstream();
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<(), SocketError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.reset_upstream();
        if self.listener.take().is_some() {
            debug!(path = ?self.path, "input socket released");
        }
        Ok(())
    }
}

/// Push side: connects to the downstream stage's Unix socket and writes frames.
///
/// Connects at the first `send`. A failed connect or write drops that frame
/// and the connection is retried on the next `send`. A payload over the
/// frame limit is dropped without touching the connection.
pub struct OutputPushSocket {
    path: PathBuf,
    send_timeout: Duration,
    max_payload_size: usize,
    downstream: Option<FrameWriter<IpcStream>>,
    dropped: u64,
    closed: bool,
}

impl OutputPushSocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            downstream: None,
            dropped: 0,
            closed: false,
        }
    }

    /// Override the largest payload that will be sent.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    /// Override the write timeout towards downstream.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Frames dropped because downstream was unavailable or they were too large.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn connect(&self) -> Result<FrameWriter<IpcStream>, SocketError> {
        let stream = UnixDomainSocket::connect(&self.path)?;
        let config = FrameConfig {
            max_payload_size: self.max_payload_size,
            read_timeout: None,
            write_timeout: Some(self.send_timeout),
        };
        Ok(FrameWriter::with_config_ipc(stream, config)?)
    }
}

impl PushSocket for OutputPushSocket {
    fn send(&mut self, payload: &[u8]) -> Result<(), SocketError> {
        if self.closed {
            return Err(SocketError::Closed);
        }

        // Oversize frames never reach the writer, so the connection stays up.
        if payload.len() > self.max_payload_size {
            self.dropped += 1;
            warn!(
                path = ?self.path,
                size = payload.len(),
                max = self.max_payload_size,
                "payload exceeds frame limit; frame dropped"
            );
            return Ok(());
        }

        if self.downstream.is_none() {
            match self.connect() {
                Ok(writer) => {
                    debug!(path = ?self.path, "output socket acquired");
                    self.downstream = Some(writer);
                }
                Err(err) => {
                    self.dropped += 1;
                    warn!(path = ?self.path, error = %err, "downstream unavailable; frame dropped");
                    return Ok(());
                }
            }
        }

        let Some(writer) = self.downstream.as_mut() else {
            return Ok(());
        };
        if let Err(err) = writer.send(payload) {
            self.dropped += 1;
            warn!(path = ?self.path, error = %err, "send failed; frame dropped");
            if let Some(writer) = self.downstream.take() {
                let _ = writer.get_ref().shutdown();
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SocketError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(writer) = self.downstream.take() {
            writer.get_ref().shutdown()?;
            debug!(path = ?self.path, "output socket released");
        }
        Ok(())
    }
}
