use clap::Parser;
use std::path::PathBuf;

use copyctl::{TransferDescriptor, TransferOptions, UnexpectedErrorPolicy};

/// Copy one file with pause, resume and cancel.
///
/// While copying, type `p` + Enter to pause or resume, `c` + Enter to
/// cancel. Ctrl+C also cancels.
#[derive(Parser, Debug)]
#[command(name = "copyctl", version)]
pub struct Args {
    /// File to copy
    pub source: PathBuf,

    /// Where to copy it; must not exist yet
    pub destination: PathBuf,

    /// Do not copy the source modification time
    #[arg(long)]
    pub no_mtime: bool,

    /// fsync the destination before reporting completion
    #[arg(long)]
    pub sync: bool,

    /// Restart up to N times if the source changes underneath the copy
    #[arg(long, value_name = "N")]
    pub retry_unexpected: Option<u32>,

    /// Seconds to wait before such a restart
    #[arg(long, value_name = "SECS", default_value_t = 1)]
    pub retry_wait: u64,

    /// Print events as JSON lines instead of a progress bar
    #[arg(long)]
    pub json: bool,

    /// Write log output to FILE
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn descriptor(&self) -> TransferDescriptor {
        TransferDescriptor::new(&self.source, &self.destination)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        let mut options = TransferOptions {
            preserve_mtime: !self.no_mtime,
            sync_on_complete: self.sync,
            retry_wait: self.retry_wait,
            ..TransferOptions::default()
        };
        if let Some(retries) = self.retry_unexpected {
            options.unexpected_errors = UnexpectedErrorPolicy::Retry;
            options.unexpected_retries = retries;
        }
        options
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else if self.log.is_some() {
            "info"
        } else {
            "warn"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_default_options() {
        let args = Args::try_parse_from(["copyctl", "a.bin", "b.bin"]).unwrap();
        assert_eq!(args.transfer_options(), TransferOptions::default());
        assert_eq!(args.descriptor().destination(), std::path::Path::new("b.bin"));
        assert_eq!(args.log_level(), "warn");
    }

    #[test]
    fn flags_map_to_options() {
        let args = Args::try_parse_from([
            "copyctl",
            "a.bin",
            "b.bin",
            "--no-mtime",
            "--sync",
            "--retry-unexpected",
            "5",
            "--retry-wait",
            "0",
            "-v",
        ])
        .unwrap();
        let options = args.transfer_options();
        assert!(!options.preserve_mtime);
        assert!(options.sync_on_complete);
        assert_eq!(options.unexpected_errors, UnexpectedErrorPolicy::Retry);
        assert_eq!(options.unexpected_retries, 5);
        assert_eq!(options.retry_wait, 0);
        assert_eq!(args.log_level(), "debug");
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Args::try_parse_from(["copyctl", "a", "b", "-v", "-q"]).is_err());
    }

    #[test]
    fn destination_is_required() {
        assert!(Args::try_parse_from(["copyctl", "a"]).is_err());
    }
}
