use std::path::{Path, PathBuf};

/// Source and destination of one transfer.
///
/// Paths are kept exactly as given. Nothing is checked here; the engine
/// reports missing sources or existing destinations when it opens them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    source: PathBuf,
    destination: PathBuf,
}

impl TransferDescriptor {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// File name of the source, for display
    pub fn display_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.to_string_lossy().to_string())
    }
}
