//! Append-only log of incoming text messages, one `user -- text` line each.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Receiver of audit lines
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, user: &str, text: &str) -> Result<()>;
}

/// Format a single audit line, newline included
pub fn format_entry(user: &str, text: &str) -> String {
    format!("{user} -- {text}\n")
}

/// Audit sink appending to a plain text file
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    // Serializes appends from concurrent chats so lines never interleave
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record(&self, user: &str, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open audit log {}", self.path.display()))?;

        file.write_all(format_entry(user, text).as_bytes())
            .await
            .with_context(|| format!("Failed to append to audit log {}", self.path.display()))?;
        file.flush().await?;

        debug!(path = %self.path.display(), "Audit line appended");
        Ok(())
    }
}
