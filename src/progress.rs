//! Notification contract between the copy engine and its caller.
//!
//! The engine never touches presentation objects. It reports through a
//! [`TransferObserver`] and identifies itself with an opaque
//! [`TransferHandle`] the caller can use to find its own per-transfer state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::control::GateState;
use crate::error::CopyError;

/// Opaque correlation id, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferHandle(u64);

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

impl TransferHandle {
    pub(crate) fn next() -> Self {
        TransferHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One progress notification, emitted after each block is written
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub handle: TransferHandle,
    /// In `[0, 100]`
    pub percentage: f64,
    pub gate: GateState,
    pub bytes_copied: u64,
    pub source_len: u64,
}

/// Terminal result of a transfer
#[derive(Debug)]
pub enum TransferOutcome {
    Completed { bytes: u64 },
    Cancelled,
    Failed(CopyError),
}

impl TransferOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferOutcome::Cancelled)
    }

    pub fn error(&self) -> Option<&CopyError> {
        match self {
            TransferOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransferOutcome::Completed { .. } => "completed",
            TransferOutcome::Cancelled => "cancelled",
            TransferOutcome::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Completed { bytes } => write!(f, "completed ({} bytes)", bytes),
            TransferOutcome::Cancelled => write!(f, "cancelled"),
            TransferOutcome::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Caller's answer when a read or write fails mid-transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureDecision {
    /// Delete the destination and start over from byte 0
    Retry,
    /// Delete the destination and fail the transfer
    Abort,
}

/// User-visible messages that are not progress or completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// An I/O error arrived after cancellation had been requested
    CancelledDuringIo { message: String },
    /// A pass failed for a reason outside the normal taxonomy
    UnexpectedError { message: String, will_retry: bool },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::CancelledDuringIo { message } => {
                write!(f, "{} Copying was cancelled!", message)
            }
            Notice::UnexpectedError { message, will_retry } => {
                write!(f, "Error occurred: {}", message)?;
                if *will_retry {
                    write!(f, " (retrying)")?;
                }
                Ok(())
            }
        }
    }
}

/// Receives notifications from a running transfer.
///
/// Every method is called on the worker thread. Implementations that touch
/// thread-affine resources must marshal to their own thread; see
/// [`ChannelObserver`](crate::ChannelObserver).
pub trait TransferObserver: Send + Sync {
    /// Called once per written block
    fn on_progress(&self, update: &ProgressUpdate);

    /// Called exactly once, whatever the outcome
    fn on_complete(&self, handle: TransferHandle, outcome: &TransferOutcome);

    /// Called when a read or write fails and cancellation was not requested.
    /// Blocks the worker until answered.
    fn on_io_failure(&self, _handle: TransferHandle, _error: &CopyError) -> FailureDecision {
        FailureDecision::Abort
    }

    fn on_notice(&self, _handle: TransferHandle, _notice: &Notice) {}
}

/// Observer that ignores everything and never retries
pub struct NullObserver;

impl TransferObserver for NullObserver {
    fn on_progress(&self, _update: &ProgressUpdate) {}
    fn on_complete(&self, _handle: TransferHandle, _outcome: &TransferOutcome) {}
}

type ProgressHook = Box<dyn Fn(&ProgressUpdate) + Send + Sync>;
type CompleteHook = Box<dyn Fn(TransferHandle, &TransferOutcome) + Send + Sync>;
type FailureHook = Box<dyn Fn(TransferHandle, &CopyError) -> FailureDecision + Send + Sync>;

/// Observer assembled from closures
pub struct CallbackObserver {
    progress: ProgressHook,
    complete: CompleteHook,
    failure: Option<FailureHook>,
}

impl CallbackObserver {
    pub fn new<P, C>(on_progress: P, on_complete: C) -> Self
    where
        P: Fn(&ProgressUpdate) + Send + Sync + 'static,
        C: Fn(TransferHandle, &TransferOutcome) + Send + Sync + 'static,
    {
        Self {
            progress: Box::new(on_progress),
            complete: Box::new(on_complete),
            failure: None,
        }
    }

    /// Install a handler for mid-transfer I/O failures (default: abort)
    pub fn with_io_failure_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(TransferHandle, &CopyError) -> FailureDecision + Send + Sync + 'static,
    {
        self.failure = Some(Box::new(handler));
        self
    }
}

impl TransferObserver for CallbackObserver {
    fn on_progress(&self, update: &ProgressUpdate) {
        (self.progress)(update);
    }

    fn on_complete(&self, handle: TransferHandle, outcome: &TransferOutcome) {
        (self.complete)(handle, outcome);
    }

    fn on_io_failure(&self, handle: TransferHandle, error: &CopyError) -> FailureDecision {
        match &self.failure {
            Some(handler) => handler(handle, error),
            None => FailureDecision::Abort,
        }
    }
}
