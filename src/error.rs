//! Error types for a single transfer.
//!
//! Every failure a transfer can hit is one of these variants. The engine
//! resolves all of them itself; callers only ever see them inside a
//! [`TransferOutcome::Failed`](crate::TransferOutcome::Failed) or as the
//! subject of an I/O-failure prompt.

use std::io;
use std::path::{Path, PathBuf};

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CopyError>;

/// Broad category of a [`CopyError`], used to pick the recovery path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The transfer cannot start; never retried
    Fatal,
    /// Mid-transfer I/O failure; the caller decides whether to retry
    Recoverable,
    /// Something the engine did not expect; handled by the configured policy
    Unexpected,
    /// Cancellation was observed
    Cancelled,
}

#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    /// Source missing, unreadable, or its length could not be read
    #[error("cannot open source {path}: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Destination already exists; exclusive create refused
    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Destination could not be created for another reason
    #[error("cannot create destination {path}: {source}")]
    DestinationOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Read or write failed after both files were open
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source ended before the length recorded when it was opened
    #[error("source {path} ended early: expected {expected} bytes, got {copied}")]
    SourceTruncated {
        path: PathBuf,
        expected: u64,
        copied: u64,
    },

    #[error("copying was cancelled")]
    Cancelled,
}

impl CopyError {
    pub fn source_open(path: &Path, source: io::Error) -> Self {
        CopyError::SourceOpen {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Classify a failed exclusive create
    pub fn destination_open(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::AlreadyExists {
            CopyError::DestinationExists {
                path: path.to_path_buf(),
            }
        } else {
            CopyError::DestinationOpen {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn io(path: &Path, source: io::Error) -> Self {
        CopyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            CopyError::SourceOpen { .. }
            | CopyError::DestinationExists { .. }
            | CopyError::DestinationOpen { .. } => ErrorClass::Fatal,
            CopyError::Io { .. } => ErrorClass::Recoverable,
            CopyError::SourceTruncated { .. } => ErrorClass::Unexpected,
            CopyError::Cancelled => ErrorClass::Cancelled,
        }
    }

    /// Whether the destination was created before this error occurred
    ///
    /// Only errors raised after the exclusive create succeeded leave a
    /// partial file behind that the engine must remove.
    pub fn left_partial_destination(&self) -> bool {
        !matches!(self.class(), ErrorClass::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_maps_to_destination_exists() {
        let err = CopyError::destination_open(
            Path::new("out.bin"),
            io::Error::new(io::ErrorKind::AlreadyExists, "exists"),
        );
        assert!(matches!(err, CopyError::DestinationExists { .. }));
        assert_eq!(err.class(), ErrorClass::Fatal);
    }

    #[test]
    fn other_create_failures_map_to_destination_open() {
        let err = CopyError::destination_open(
            Path::new("out.bin"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, CopyError::DestinationOpen { .. }));
        assert!(!err.left_partial_destination());
    }

    #[test]
    fn mid_transfer_errors_leave_partial_destination() {
        let io_err = CopyError::io(Path::new("in.bin"), io::Error::other("boom"));
        assert_eq!(io_err.class(), ErrorClass::Recoverable);
        assert!(io_err.left_partial_destination());

        let truncated = CopyError::SourceTruncated {
            path: PathBuf::from("in.bin"),
            expected: 10,
            copied: 4,
        };
        assert_eq!(truncated.class(), ErrorClass::Unexpected);
        assert!(CopyError::Cancelled.left_partial_destination());
    }

    #[test]
    fn messages_carry_paths() {
        let err = CopyError::DestinationExists {
            path: PathBuf::from("/tmp/x"),
        };
        assert_eq!(err.to_string(), "destination already exists: /tmp/x");
    }
}
