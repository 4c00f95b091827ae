//! Marshal transfer notifications onto the thread that owns the UI.

use serde::Serialize;
use std::sync::mpsc::{self, Sender};

use crate::error::CopyError;
use crate::progress::{
    FailureDecision, Notice, ProgressUpdate, TransferHandle, TransferObserver, TransferOutcome,
};

/// A notification as seen by the control thread
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    Progress(ProgressUpdate),
    Notice {
        handle: TransferHandle,
        notice: Notice,
    },
    /// The worker is blocked until `reply` is answered or dropped
    IoFailure {
        handle: TransferHandle,
        message: String,
        #[serde(skip)]
        reply: Sender<FailureDecision>,
    },
    Finished {
        handle: TransferHandle,
        outcome: &'static str,
        bytes: Option<u64>,
        error: Option<String>,
    },
}

impl TransferEvent {
    pub fn handle(&self) -> TransferHandle {
        match self {
            TransferEvent::Progress(update) => update.handle,
            TransferEvent::Notice { handle, .. }
            | TransferEvent::IoFailure { handle, .. }
            | TransferEvent::Finished { handle, .. } => *handle,
        }
    }

    fn finished(handle: TransferHandle, outcome: &TransferOutcome) -> Self {
        TransferEvent::Finished {
            handle,
            outcome: outcome.label(),
            bytes: match outcome {
                TransferOutcome::Completed { bytes } => Some(*bytes),
                _ => None,
            },
            error: outcome.error().map(|e| e.to_string()),
        }
    }
}

/// Observer that forwards everything over a channel.
///
/// If the receiving side is gone, events are dropped and I/O failures are
/// answered with [`FailureDecision::Abort`].
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<TransferEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<TransferEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: TransferEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

impl TransferObserver for ChannelObserver {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.send(TransferEvent::Progress(*update));
    }

    fn on_complete(&self, handle: TransferHandle, outcome: &TransferOutcome) {
        self.send(TransferEvent::finished(handle, outcome));
    }

    fn on_io_failure(&self, handle: TransferHandle, error: &CopyError) -> FailureDecision {
        let (reply, answer) = mpsc::channel();
        let event = TransferEvent::IoFailure {
            handle,
            message: error.to_string(),
            reply,
        };
        if self.tx.send(event).is_err() {
            return FailureDecision::Abort;
        }
        answer.recv().unwrap_or(FailureDecision::Abort)
    }

    fn on_notice(&self, handle: TransferHandle, notice: &Notice) {
        self.send(TransferEvent::Notice {
            handle,
            notice: notice.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::GateState;
    use std::path::Path;
    use std::thread;

    fn io_error() -> CopyError {
        CopyError::io(Path::new("in.bin"), std::io::Error::other("device gone"))
    }

    #[test]
    fn failure_prompt_waits_for_reply() {
        let (tx, rx) = mpsc::channel();
        let observer = ChannelObserver::new(tx);
        let handle = TransferHandle::next();

        let worker = thread::spawn(move || observer.on_io_failure(handle, &io_error()));

        match rx.recv().unwrap() {
            TransferEvent::IoFailure { message, reply, .. } => {
                assert!(message.contains("device gone"));
                reply.send(FailureDecision::Retry).unwrap();
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(worker.join().unwrap(), FailureDecision::Retry);
    }

    #[test]
    fn dropped_receiver_aborts() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let observer = ChannelObserver::new(tx);
        assert_eq!(
            observer.on_io_failure(TransferHandle::next(), &io_error()),
            FailureDecision::Abort
        );
    }

    #[test]
    fn events_serialize_as_tagged_json() {
        let handle = TransferHandle::next();
        let progress = TransferEvent::Progress(ProgressUpdate {
            handle,
            percentage: 50.0,
            gate: GateState::Closed,
            bytes_copied: 1,
            source_len: 2,
        });
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["gate"], "closed");
        assert_eq!(json["handle"], handle.id());

        let finished = TransferEvent::finished(handle, &TransferOutcome::Cancelled);
        let json = serde_json::to_value(&finished).unwrap();
        assert_eq!(json["outcome"], "cancelled");
        assert!(json["bytes"].is_null());
    }
}
