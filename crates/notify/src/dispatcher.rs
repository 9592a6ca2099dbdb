//! Fans a fired event out to all configured channels.
//!
//! Individual channel failures don't block other channels; each
//! delivery is timed and logged.

use vigil_engine::detect::FireEvent;

use crate::traits::{DispatchResult, Notifier};

/// Dispatches fire events to every configured channel.
pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// A dispatcher with no channels; dispatch becomes a no-op.
    pub fn empty() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver one fired event to every channel.
    ///
    /// Returns results for each delivery. Individual failures don't
    /// block other channels.
    pub async fn dispatch(&self, event: &FireEvent) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(listener = %event.listener, "no notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = std::time::Instant::now();
            let result = channel.send(event).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::debug!(
                        listener = %event.listener,
                        channel = channel.channel_name(),
                        duration_ms,
                        "notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        listener = %event.listener,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                listener: event.listener.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}
