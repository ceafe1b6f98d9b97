use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{Result, WorkerError};
use crate::loader::UnitLoader;
use crate::relay::{LoopSignal, Relay, RelayStats};
use crate::socket::{PullSocket, PushSocket};

/// Worker lifecycle states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Init,
    Loading,
    Running,
    Draining,
    Closed,
}

/// Why the relay loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Cancellation was requested. Not an error.
    Cancelled,
    /// A message with an unhandled tag arrived.
    UnsupportedMessage { tag: u8 },
    /// An iteration failed or panicked.
    Fault { message: String },
}

impl StopReason {
    pub fn is_fault(&self) -> bool {
        matches!(self, StopReason::Fault { .. })
    }
}

/// Outcome of a worker run that got past startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub unit: String,
    pub stop_reason: StopReason,
    pub stats: RelayStats,
}

/// Runs one processing unit between one pull socket and one push socket.
#[derive(Debug)]
pub struct Worker {
    user_module: String,
    state: WorkerState,
}

impl Worker {
    /// `user_module` is a registered unit key or a path to a unit library.
    pub fn new(user_module: impl Into<String>) -> Self {
        Self {
            user_module: user_module.into(),
            state: WorkerState::Init,
        }
    }

    pub fn user_module(&self) -> &str {
        &self.user_module
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Load the unit and relay frames until cancelled, stopped or faulted.
    ///
    /// Startup failures (`MissingConfiguration`, `UserModule`) return `Err`
    /// before either socket is touched. Every other outcome drains both
    /// sockets and returns a report; a fault is reported in
    /// [`WorkerReport::stop_reason`], not as an error.
    pub fn start<I, O>(
        &mut self,
        loader: &UnitLoader,
        input: I,
        output: O,
        cancel: &AtomicBool,
    ) -> Result<WorkerReport>
    where
        I: PullSocket,
        O: PushSocket,
    {
        if self.user_module.trim().is_empty() {
            self.transition(WorkerState::Closed);
            return Err(WorkerError::MissingConfiguration("user module path"));
        }

        self.transition(WorkerState::Loading);
        let unit = match loader.load(&self.user_module) {
            Ok(unit) => unit,
            Err(err) => {
                self.transition(WorkerState::Closed);
                return Err(err.into());
            }
        };

        self.transition(WorkerState::Running);
        info!(unit = unit.name(), "worker running");
        let mut relay = Relay::new(unit, input, output);
        let stop_reason = run(&mut relay, cancel);

        self.transition(WorkerState::Draining);
        if let Err(err) = relay.drain() {
            warn!(error = %err, "failed to release sockets");
        }
        self.transition(WorkerState::Closed);

        let report = WorkerReport {
            unit: relay.unit_name().to_string(),
            stop_reason,
            stats: relay.stats().clone(),
        };
        info!(
            reason = ?report.stop_reason,
            received = report.stats.received,
            forwarded = report.stats.forwarded,
            dropped = report.stats.dropped,
            "worker finished"
        );
        Ok(report)
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }
}

fn run<I: PullSocket, O: PushSocket>(relay: &mut Relay<I, O>, cancel: &AtomicBool) -> StopReason {
    loop {
        if cancel.load(Ordering::SeqCst) {
            info!("cancellation requested");
            return StopReason::Cancelled;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| relay.fetch_and_process())) {
            Ok(Ok(LoopSignal::Continue)) => {}
            Ok(Ok(LoopSignal::Stop)) => {
                return StopReason::UnsupportedMessage {
                    tag: relay.stats().unsupported_tag.unwrap_or_default(),
                };
            }
            Ok(Err(err)) => {
                error!(error = %err, "relay iteration failed");
                return StopReason::Fault {
                    message: err.to_string(),
                };
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(panic = %message, "relay iteration panicked");
                return StopReason::Fault { message };
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}
