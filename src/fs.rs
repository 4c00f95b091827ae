//! Filesystem access used by the engine.
//!
//! The engine only needs three operations: open a source, exclusively
//! create a destination, and remove a destination. Keeping them behind a
//! trait lets tests inject failing readers without touching real devices.

use filetime::FileTime;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::SystemTime;

/// An opened source file
pub struct SourceFile {
    pub reader: Box<dyn Read + Send>,
    /// Length at open time
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// An exclusively created destination file
pub trait DestinationFile: Write + Send {
    /// Flush, optionally fsync, and optionally stamp the modification time
    fn finish(self: Box<Self>, modified: Option<SystemTime>, sync: bool) -> io::Result<()>;
}

pub trait FileSystem: Send + Sync {
    fn open_source(&self, path: &Path) -> io::Result<SourceFile>;

    /// Create `path`, failing with `AlreadyExists` if it is present
    fn create_destination(&self, path: &Path) -> io::Result<Box<dyn DestinationFile>>;

    fn remove_destination(&self, path: &Path) -> io::Result<()>;
}

/// The local filesystem via `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn open_source(&self, path: &Path) -> io::Result<SourceFile> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        if meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source is a directory",
            ));
        }
        Ok(SourceFile {
            reader: Box::new(file),
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn create_destination(&self, path: &Path) -> io::Result<Box<dyn DestinationFile>> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(Box::new(file))
    }

    fn remove_destination(&self, path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl DestinationFile for File {
    fn finish(mut self: Box<Self>, modified: Option<SystemTime>, sync: bool) -> io::Result<()> {
        self.flush()?;
        if sync {
            self.sync_all()?;
        }
        if let Some(modified) = modified {
            // Timestamp is cosmetic; a filesystem that refuses it does not fail the copy
            if let Err(e) =
                filetime::set_file_handle_times(&self, None, Some(FileTime::from_system_time(modified)))
            {
                tracing::warn!(error = %e, "could not preserve modification time");
            }
        }
        Ok(())
    }
}
