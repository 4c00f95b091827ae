use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Live counters of one transfer.
///
/// Written only by the worker; readable from any thread, so a UI can poll
/// them instead of (or in addition to) listening for progress events.
#[derive(Debug, Default)]
pub struct TransferStats {
    pub bytes_copied: AtomicU64,
    pub source_len: AtomicU64,
    pub blocks_written: AtomicU64,
    pub attempts: AtomicU32,
}

/// Plain copy of [`TransferStats`] at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub bytes_copied: u64,
    pub source_len: u64,
    pub blocks_written: u64,
    pub attempts: u32,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass over a source of `source_len` bytes
    pub fn begin_attempt(&self, source_len: u64) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.source_len.store(source_len, Ordering::Relaxed);
        self.bytes_copied.store(0, Ordering::Relaxed);
        self.blocks_written.store(0, Ordering::Relaxed);
    }

    /// Record one written block, returning the new byte total
    pub fn add_block(&self, bytes: u64) -> u64 {
        self.blocks_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_copied.fetch_add(bytes, Ordering::Relaxed) + bytes
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
            source_len: self.source_len.load(Ordering::Relaxed),
            blocks_written: self.blocks_written.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Percentage copied; `None` until a non-empty source is open
    pub fn percentage(&self) -> Option<f64> {
        percentage(self.bytes_copied, self.source_len)
    }
}

pub(crate) fn percentage(copied: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(copied as f64 * 100.0 / total as f64)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        writeln!(f, "    Bytes copied:   {}", self.bytes_copied)?;
        writeln!(f, "    Source length:  {}", self.source_len)?;
        writeln!(f, "    Blocks written: {}", self.blocks_written)?;
        writeln!(f, "    Attempts:       {}", self.attempts)
    }
}
