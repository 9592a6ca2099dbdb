//! Browser launch channel.
//!
//! Opens a fired event's resolved URL with the host's opener command
//! (`xdg-open` or `open`). Events without a URL are a no-op.

use std::path::Path;

use tokio::process::Command;
use vigil_engine::detect::FireEvent;

use crate::traits::{Notifier, NotifyError};

const CANDIDATES: &[&str] = &["xdg-open", "open"];

const SEARCH_DIRS: &[&str] = &["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin", "/bin"];

/// Opens fired URLs in the default browser.
#[derive(Debug)]
pub struct BrowserNotifier {
    program: String,
}

impl BrowserNotifier {
    pub fn new() -> Self {
        Self {
            program: find_program().unwrap_or_else(|| CANDIDATES[0].to_string()),
        }
    }
}

impl Default for BrowserNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Notifier for BrowserNotifier {
    async fn send(&self, event: &FireEvent) -> Result<(), NotifyError> {
        let url = match &event.url {
            Some(url) => url,
            None => {
                tracing::debug!(listener = %event.listener, "no url to open");
                return Ok(());
            }
        };

        let output = Command::new(&self.program)
            .arg(url)
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

        tracing::info!(listener = %event.listener, url = %url, "opened in browser");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "browser"
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;

    fn event(url: Option<&str>) -> FireEvent {
        FireEvent {
            listener: "price".to_string(),
            user: "channel".to_string(),
            message: "price is 42".to_string(),
            url: url.map(str::to_string),
            desktop: false,
        }
    }

    #[tokio::test]
    async fn missing_url_is_noop() {
        let notifier = BrowserNotifier {
            program: "/nonexistent/xdg-open".to_string(),
        };
        assert!(notifier.send(&event(None)).await.is_ok());
    }

    #[tokio::test]
    async fn missing_program_is_command_error() {
        let notifier = BrowserNotifier {
            program: "/nonexistent/xdg-open".to_string(),
        };
        assert!(matches!(
            notifier.send(&event(Some("https://x.example"))).await,
            Err(NotifyError::Command(_))
        ));
    }

    #[test]
    fn channel_name_is_browser() {
        assert_eq!(BrowserNotifier::new().channel_name(), "browser");
    }
}
