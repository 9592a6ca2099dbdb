//! Notifier trait definition and shared error types.

use vigil_engine::detect::FireEvent;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API error: {0}")]
    Api(String),

    #[error("command failed: {0}")]
    Command(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Trait for notification channel implementations.
///
/// A channel that an event does not apply to (no URL for the browser
/// launcher, no declared message for the desktop channel) returns `Ok`
/// without delivering anything.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a fired event through this channel.
    async fn send(&self, event: &FireEvent) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "slack", "desktop").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching a fire event to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub listener: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
