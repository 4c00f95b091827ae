#![allow(dead_code)]

use rand::Rng;
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, OnceLock};

use copyctl::fs::{DestinationFile, SourceFile};
use copyctl::{
    CopyError, FailureDecision, FileSystem, LocalFs, Notice, ProgressUpdate, TransferControl,
    TransferHandle, TransferObserver, TransferOutcome,
};

pub const MIB: usize = 1024 * 1024;

/// Write `len` random bytes to `path` and return them
pub fn create_random_file(path: &Path, len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill(&mut data[..]);
    fs::write(path, &data).unwrap();
    data
}

/// Observer that records everything and can be scripted
#[derive(Default)]
pub struct Recorder {
    pub progress: Mutex<Vec<ProgressUpdate>>,
    pub outcomes: Mutex<Vec<(TransferHandle, String)>>,
    pub notices: Mutex<Vec<Notice>>,
    pub failures: Mutex<Vec<String>>,
    decisions: Mutex<VecDeque<FailureDecision>>,
    cancel_at: Option<u64>,
    control: OnceLock<TransferControl>,
    progress_tx: Mutex<Option<Sender<u64>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation from inside the hook once this many bytes are copied
    pub fn cancel_at(mut self, bytes: u64) -> Self {
        self.cancel_at = Some(bytes);
        self
    }

    /// Answers handed out, in order, to I/O-failure prompts
    pub fn answer(self, decision: FailureDecision) -> Self {
        self.decisions.lock().unwrap().push_back(decision);
        self
    }

    /// Forward `bytes_copied` of each update to `tx`
    pub fn notify(self, tx: Sender<u64>) -> Self {
        *self.progress_tx.lock().unwrap() = Some(tx);
        self
    }

    pub fn attach(&self, control: TransferControl) {
        let _ = self.control.set(control);
    }

    pub fn percentages(&self) -> Vec<f64> {
        self.progress.lock().unwrap().iter().map(|u| u.percentage).collect()
    }

    pub fn progress_count(&self) -> usize {
        self.progress.lock().unwrap().len()
    }

    pub fn outcome_labels(&self) -> Vec<String> {
        self.outcomes.lock().unwrap().iter().map(|(_, l)| l.clone()).collect()
    }
}

impl TransferObserver for Recorder {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.progress.lock().unwrap().push(*update);

        if let (Some(limit), Some(control)) = (self.cancel_at, self.control.get()) {
            if update.bytes_copied >= limit {
                control.request_cancel();
            }
        }

        if let Some(tx) = self.progress_tx.lock().unwrap().as_ref() {
            let _ = tx.send(update.bytes_copied);
        }
    }

    fn on_complete(&self, handle: TransferHandle, outcome: &TransferOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((handle, outcome.label().to_string()));
    }

    fn on_io_failure(&self, _handle: TransferHandle, error: &CopyError) -> FailureDecision {
        self.failures.lock().unwrap().push(error.to_string());
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FailureDecision::Abort)
    }

    fn on_notice(&self, _handle: TransferHandle, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Local filesystem whose first `failures` source opens fail after `fail_at` bytes
pub struct FlakyFs {
    fail_at: u64,
    failures: AtomicUsize,
}

impl FlakyFs {
    pub fn new(fail_at: u64, failures: usize) -> Self {
        Self {
            fail_at,
            failures: AtomicUsize::new(failures),
        }
    }
}

struct FailingReader {
    inner: Box<dyn Read + Send>,
    remaining: u64,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("simulated read failure"));
        }
        let max = buf.len().min(self.remaining as usize);
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl FileSystem for FlakyFs {
    fn open_source(&self, path: &Path) -> io::Result<SourceFile> {
        let mut source = LocalFs.open_source(path)?;
        let should_fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            source.reader = Box::new(FailingReader {
                inner: source.reader,
                remaining: self.fail_at,
            });
        }
        Ok(source)
    }

    fn create_destination(&self, path: &Path) -> io::Result<Box<dyn DestinationFile>> {
        LocalFs.create_destination(path)
    }

    fn remove_destination(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_destination(path)
    }
}

/// Local filesystem that overstates every source length, as if the file
/// shrank right after it was opened
pub struct ShrinkingFs {
    pub extra: u64,
}

impl FileSystem for ShrinkingFs {
    fn open_source(&self, path: &Path) -> io::Result<SourceFile> {
        let mut source = LocalFs.open_source(path)?;
        source.len += self.extra;
        Ok(source)
    }

    fn create_destination(&self, path: &Path) -> io::Result<Box<dyn DestinationFile>> {
        LocalFs.create_destination(path)
    }

    fn remove_destination(&self, path: &Path) -> io::Result<()> {
        LocalFs.remove_destination(path)
    }
}
