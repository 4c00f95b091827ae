use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed size of one block read and written per loop iteration
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// What to do when a pass fails in a way the engine did not anticipate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnexpectedErrorPolicy {
    /// Terminate the transfer as failed
    #[default]
    Abort,
    /// Restart from byte 0, up to `unexpected_retries` times
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    pub preserve_mtime: bool,
    pub sync_on_complete: bool,
    pub unexpected_errors: UnexpectedErrorPolicy,
    pub unexpected_retries: u32,
    /// Seconds to wait before restarting after an unexpected error
    pub retry_wait: u64,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferOptions {
            preserve_mtime: true,
            sync_on_complete: false,
            unexpected_errors: UnexpectedErrorPolicy::Abort,
            unexpected_retries: 3,
            retry_wait: 1,
        }
    }
}

impl TransferOptions {
    pub fn retry_wait_duration(&self) -> Duration {
        Duration::from_secs(self.retry_wait)
    }

    /// Restarts still allowed after `used` unexpected failures
    pub fn allows_unexpected_retry(&self, used: u32) -> bool {
        self.unexpected_errors == UnexpectedErrorPolicy::Retry && used < self.unexpected_retries
    }

    /// Short summary of the non-default settings, for log headers
    pub fn to_string_flags(&self) -> String {
        let mut result = Vec::new();

        if !self.preserve_mtime {
            result.push("no-mtime".to_string());
        }

        if self.sync_on_complete {
            result.push("sync".to_string());
        }

        if self.unexpected_errors == UnexpectedErrorPolicy::Retry {
            result.push(format!("retry-unexpected:{}", self.unexpected_retries));
            result.push(format!("retry-wait:{}s", self.retry_wait));
        }

        if result.is_empty() {
            "defaults".to_string()
        } else {
            result.join(" ")
        }
    }
}
