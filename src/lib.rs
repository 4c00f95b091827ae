//! copyctl - controllable single-file copy
//!
//! This library provides a copy engine that streams one file in fixed-size
//! blocks, reports progress after every block, and can be paused, resumed
//! or cancelled from another thread while it runs.

pub mod control;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod fs;
pub mod options;
pub mod progress;
pub mod stats;

mod engine;

pub use control::{GateState, TransferControl};
pub use descriptor::TransferDescriptor;
pub use engine::{CopyEngine, TransferTask};
pub use error::{CopyError, ErrorClass};
pub use events::{ChannelObserver, TransferEvent};
pub use fs::{FileSystem, LocalFs};
pub use options::{BLOCK_SIZE, TransferOptions, UnexpectedErrorPolicy};
pub use progress::{
    CallbackObserver, FailureDecision, Notice, NullObserver, ProgressUpdate, TransferHandle,
    TransferObserver, TransferOutcome,
};
pub use stats::{StatsSnapshot, TransferStats};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "copyctl";
