use crate::browser::session::BrowserSession;
use crate::core::BrowserTrait;
use crate::errors::{BrowserAgentError, Result};
use crate::utils::javascript::JavaScriptRunner;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort failure snapshots. `capture` never fails the caller: any
/// problem is logged and swallowed so the primary error stays intact.
#[derive(Debug, Clone)]
pub struct DiagnosticsCollector {
    output_dir: PathBuf,
}

impl DiagnosticsCollector {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `nab_debug_<reason>_<YYYYMMDD_HHMMSS>.png`
    pub fn snapshot_path(&self, reason: &str, at: DateTime<Local>) -> PathBuf {
        let reason: String = reason
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.output_dir.join(format!(
            "nab_debug_{}_{}.png",
            reason,
            at.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Captures the current page, tagged with `reason`. Returns where the
    /// snapshot was written, if it was.
    pub async fn capture<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        reason: &str,
    ) -> Option<PathBuf> {
        let path = self.snapshot_path(reason, Local::now());

        let outcome = tokio::time::timeout(CAPTURE_TIMEOUT, self.write_snapshot(session, &path))
            .await
            .unwrap_or_else(|_| {
                Err(BrowserAgentError::TimeoutError(
                    "diagnostics capture".to_string(),
                ))
            });

        match outcome {
            Ok(()) => {
                info!(
                    session_id = %session.session_id(),
                    path = %path.display(),
                    reason = %reason,
                    "Diagnostics snapshot captured"
                );
                Some(path)
            }
            Err(err) => {
                warn!(
                    session_id = %session.session_id(),
                    reason = %reason,
                    error = %err,
                    "Diagnostics snapshot failed"
                );
                None
            }
        }
    }

    async fn write_snapshot<B: BrowserTrait>(
        &self,
        session: &BrowserSession<B>,
        path: &Path,
    ) -> Result<()> {
        // typed credentials must never reach the image
        session.execute_script(JavaScriptRunner::scrub_inputs()).await?;

        let screenshot_bytes = session.screenshot().await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(path, screenshot_bytes).await?;
        Ok(())
    }
}
