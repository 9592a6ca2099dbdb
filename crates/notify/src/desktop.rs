//! Desktop notification channel.
//!
//! Delivers fired events through whichever notification command the
//! host provides (`notify-send`, `terminal-notifier`, or `osascript`).
//! Only events whose listener declared a notification message are
//! delivered; everything else is a silent no-op for this channel.

use std::path::Path;

use tokio::process::Command;
use vigil_engine::detect::FireEvent;

use crate::traits::{Notifier, NotifyError};

/// Notification commands probed in order.
const CANDIDATES: &[&str] = &["notify-send", "terminal-notifier", "osascript"];

/// Directories searched for the candidate executables.
const SEARCH_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin"];

/// Sends fired events as desktop notifications with sound.
#[derive(Debug)]
pub struct DesktopNotifier {
    program: String,
}

impl DesktopNotifier {
    /// Pick the first notification command present on this host,
    /// falling back to the first candidate name and letting PATH
    /// resolution decide at send time.
    pub fn new() -> Self {
        Self {
            program: find_program().unwrap_or_else(|| CANDIDATES[0].to_string()),
        }
    }

    /// Arguments for the selected program, title + message with sound.
    fn build_args(&self, title: &str, message: &str) -> Vec<String> {
        let command = Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone());
        match command.as_str() {
            "terminal-notifier" => vec![
                "-title".to_string(),
                title.to_string(),
                "-message".to_string(),
                message.to_string(),
                "-sound".to_string(),
                "default".to_string(),
            ],
            "osascript" => vec![
                "-e".to_string(),
                format!(
                    "display notification \"{}\" with title \"{}\" sound name \"default\"",
                    escape_quotes(message),
                    escape_quotes(title)
                ),
            ],
            _ => vec![title.to_string(), message.to_string()],
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for DesktopNotifier {
    async fn send(&self, event: &FireEvent) -> Result<(), NotifyError> {
        if !event.desktop {
            tracing::debug!(listener = %event.listener, "no desktop notification declared");
            return Ok(());
        }

        let args = self.build_args(&event.listener, &event.message);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| NotifyError::Command(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NotifyError::Command(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(listener = %event.listener, program = %self.program, "desktop notification shown");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "desktop"
    }
}

/// Probe the search directories for a usable notification command.
fn find_program() -> Option<String> {
    for candidate in CANDIDATES {
        for dir in SEARCH_DIRS {
            let path = Path::new(dir).join(candidate);
            if path.exists() {
                return Some(path.to_string_lossy().into_owned());
            }
        }
    }
    None
}

fn escape_quotes(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
