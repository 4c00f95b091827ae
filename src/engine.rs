use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::control::TransferControl;
use crate::descriptor::TransferDescriptor;
use crate::error::{CopyError, ErrorClass, Result};
use crate::fs::{FileSystem, LocalFs, SourceFile};
use crate::options::{BLOCK_SIZE, TransferOptions};
use crate::progress::{
    CallbackObserver, FailureDecision, Notice, ProgressUpdate, TransferHandle, TransferObserver,
    TransferOutcome,
};
use crate::stats::{self, StatsSnapshot, TransferStats};

/// Owns one transfer from source to destination.
///
/// Construction never touches the filesystem. [`run`](Self::run) blocks
/// until the transfer reaches a terminal outcome; the control methods may
/// be called from any thread while it runs.
pub struct CopyEngine {
    descriptor: TransferDescriptor,
    options: TransferOptions,
    observer: Arc<dyn TransferObserver>,
    fs: Arc<dyn FileSystem>,
    control: TransferControl,
    stats: Arc<TransferStats>,
    handle: TransferHandle,
}

impl CopyEngine {
    /// Bind a transfer to its observer, with default options and the local filesystem
    pub fn new(descriptor: TransferDescriptor, observer: Arc<dyn TransferObserver>) -> Self {
        Self {
            descriptor,
            options: TransferOptions::default(),
            observer,
            fs: Arc::new(LocalFs),
            control: TransferControl::new(),
            stats: Arc::new(TransferStats::new()),
            handle: TransferHandle::next(),
        }
    }

    /// Build an engine from a progress hook and a completion hook
    pub fn with_hooks<P, C>(descriptor: TransferDescriptor, on_progress: P, on_complete: C) -> Self
    where
        P: Fn(&ProgressUpdate) + Send + Sync + 'static,
        C: Fn(TransferHandle, &TransferOutcome) + Send + Sync + 'static,
    {
        Self::new(
            descriptor,
            Arc::new(CallbackObserver::new(on_progress, on_complete)),
        )
    }

    /// Replace the default transfer options
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Route all file access through `fs`
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Handle carried by every notification from this engine
    pub fn handle(&self) -> TransferHandle {
        self.handle
    }

    /// Source and destination this engine copies between
    pub fn descriptor(&self) -> &TransferDescriptor {
        &self.descriptor
    }

    /// Options in effect for this transfer
    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Cloneable control handle for callers that do not hold the engine
    pub fn control(&self) -> TransferControl {
        self.control.clone()
    }

    /// Point-in-time copy of the live counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Ask the worker to stop at the next block boundary; idempotent
    pub fn request_cancel(&self) {
        self.control.request_cancel();
    }

    /// Close the pause gate
    pub fn pause(&self) {
        self.control.pause();
    }

    /// Open the pause gate
    pub fn resume(&self) {
        self.control.resume();
    }

    /// Run the transfer to a terminal outcome.
    ///
    /// The observer's `on_complete` is called exactly once before this
    /// returns, with the same outcome.
    pub fn run(&self) -> TransferOutcome {
        let started = Instant::now();
        info!(
            transfer = %self.handle,
            source = %self.descriptor.source().display(),
            destination = %self.descriptor.destination().display(),
            options = %self.options.to_string_flags(),
            "transfer started"
        );

        let outcome = self.drive();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            TransferOutcome::Completed { bytes } => {
                info!(transfer = %self.handle, bytes, elapsed_ms, "transfer completed")
            }
            TransferOutcome::Cancelled => {
                info!(transfer = %self.handle, elapsed_ms, "transfer cancelled")
            }
            TransferOutcome::Failed(err) => {
                warn!(transfer = %self.handle, error = %err, elapsed_ms, "transfer failed")
            }
        }

        self.observer.on_complete(self.handle, &outcome);
        outcome
    }

    /// Move the engine onto a dedicated worker thread
    pub fn spawn(self) -> io::Result<TransferTask> {
        let handle = self.handle;
        let control = self.control.clone();
        let stats = self.stats.clone();
        let join = thread::Builder::new()
            .name(format!("copyctl-transfer-{}", handle.id()))
            .spawn(move || self.run())?;
        Ok(TransferTask {
            handle,
            control,
            stats,
            join,
        })
    }

    /// Outer retry loop
    fn drive(&self) -> TransferOutcome {
        let mut buffer = vec![0u8; BLOCK_SIZE];
        let mut unexpected_failures = 0;

        loop {
            // Nothing has been created yet, so there is nothing to clean up
            if self.control.is_cancelled() {
                return TransferOutcome::Cancelled;
            }

            let err = match self.copy_pass(&mut buffer) {
                Ok(bytes) => return TransferOutcome::Completed { bytes },
                Err(err) => err,
            };

            if err.left_partial_destination() {
                self.discard_destination();
            }

            match err.class() {
                ErrorClass::Fatal => return TransferOutcome::Failed(err),
                ErrorClass::Cancelled => return TransferOutcome::Cancelled,
                ErrorClass::Recoverable => {
                    if self.control.is_cancelled() {
                        return self.cancelled_during_io(&err);
                    }

                    let decision = self.observer.on_io_failure(self.handle, &err);
                    // Cancel may arrive while the caller is deciding
                    if self.control.is_cancelled() {
                        return self.cancelled_during_io(&err);
                    }
                    match decision {
                        FailureDecision::Retry => {
                            warn!(transfer = %self.handle, error = %err, "restarting transfer from byte 0");
                        }
                        FailureDecision::Abort => return TransferOutcome::Failed(err),
                    }
                }
                ErrorClass::Unexpected => {
                    let will_retry = self.options.allows_unexpected_retry(unexpected_failures);
                    self.observer.on_notice(
                        self.handle,
                        &Notice::UnexpectedError {
                            message: err.to_string(),
                            will_retry,
                        },
                    );
                    if !will_retry {
                        return TransferOutcome::Failed(err);
                    }
                    unexpected_failures += 1;
                    warn!(
                        transfer = %self.handle,
                        error = %err,
                        retry = unexpected_failures,
                        "unexpected error, restarting transfer"
                    );
                    thread::sleep(self.options.retry_wait_duration());
                }
            }
        }
    }

    /// One attempt: open both files and stream every block
    fn copy_pass(&self, buffer: &mut [u8]) -> Result<u64> {
        let source_path = self.descriptor.source();
        let dest_path = self.descriptor.destination();

        let SourceFile {
            reader,
            len: source_len,
            modified,
        } = self
            .fs
            .open_source(source_path)
            .map_err(|e| CopyError::source_open(source_path, e))?;

        let mut destination = self
            .fs
            .create_destination(dest_path)
            .map_err(|e| CopyError::destination_open(dest_path, e))?;

        self.stats.begin_attempt(source_len);
        debug!(transfer = %self.handle, source_len, "files open");

        // Never read past the length recorded at open
        let mut reader = reader.take(source_len);
        let mut total = 0u64;

        loop {
            let n = read_block(&mut reader, buffer).map_err(|e| CopyError::io(source_path, e))?;
            if n == 0 {
                break;
            }

            if self.control.is_cancelled() {
                return Err(CopyError::Cancelled);
            }

            destination
                .write_all(&buffer[..n])
                .map_err(|e| CopyError::io(dest_path, e))?;
            total = self.stats.add_block(n as u64);

            let update = ProgressUpdate {
                handle: self.handle,
                percentage: stats::percentage(total, source_len).unwrap_or(100.0),
                gate: self.control.gate_state(),
                bytes_copied: total,
                source_len,
            };
            trace!(transfer = %self.handle, bytes = total, percentage = update.percentage, "block written");
            self.observer.on_progress(&update);

            // Sole suspension point
            if self.control.wait_at_gate() {
                debug!(transfer = %self.handle, bytes = total, "resumed");
            }
        }

        if total < source_len {
            return Err(CopyError::SourceTruncated {
                path: source_path.to_path_buf(),
                expected: source_len,
                copied: total,
            });
        }

        // A cancel that lands after the last block still wins over completion
        if self.control.is_cancelled() {
            return Err(CopyError::Cancelled);
        }

        let modified = if self.options.preserve_mtime {
            modified
        } else {
            None
        };
        destination
            .finish(modified, self.options.sync_on_complete)
            .map_err(|e| CopyError::io(dest_path, e))?;

        Ok(total)
    }

    fn cancelled_during_io(&self, err: &CopyError) -> TransferOutcome {
        self.observer.on_notice(
            self.handle,
            &Notice::CancelledDuringIo {
                message: err.to_string(),
            },
        );
        TransferOutcome::Cancelled
    }

    fn discard_destination(&self) {
        let path = self.descriptor.destination();
        if let Err(e) = self.fs.remove_destination(path) {
            warn!(transfer = %self.handle, path = %path.display(), error = %e, "could not remove partial destination");
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// A transfer running on its own worker thread
pub struct TransferTask {
    handle: TransferHandle,
    control: TransferControl,
    stats: Arc<TransferStats>,
    join: JoinHandle<TransferOutcome>,
}

impl TransferTask {
    /// Handle of the running transfer
    pub fn handle(&self) -> TransferHandle {
        self.handle
    }

    /// Pause, resume and cancel the running transfer
    pub fn control(&self) -> &TransferControl {
        &self.control
    }

    /// Live counters of the running transfer
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// True once the worker has produced its outcome
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker; `Err` only if it panicked
    pub fn join(self) -> thread::Result<TransferOutcome> {
        self.join.join()
    }
}
