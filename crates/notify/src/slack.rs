//! Slack chat notifier.
//!
//! Posts fired events to a channel via the Slack `chat.postMessage`
//! API. Every fire is posted (the channel is only constructed when a
//! token is configured), tagging `<!channel>` or a resolved user id.

use std::collections::HashMap;

use vigil_engine::detect::FireEvent;

use crate::traits::{Notifier, NotifyError};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Sends fire notifications through the Slack chat API.
#[derive(Debug)]
pub struct SlackNotifier {
    token: String,
    channel: String,
    /// Recipient name → Slack user id.
    users: HashMap<String, String>,
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Create a notifier from configuration values.
    ///
    /// Returns [`NotifyError::Config`] when the token is empty; callers
    /// gate construction on a token being present at all.
    pub fn from_config(
        token: String,
        channel: String,
        users: HashMap<String, String>,
    ) -> Result<Self, NotifyError> {
        if token.is_empty() {
            return Err(NotifyError::Config(
                "Slack token must not be empty".to_string(),
            ));
        }
        Ok(Self {
            token,
            channel,
            users,
            client: reqwest::Client::new(),
        })
    }

    /// Resolve a recipient tag to Slack mention markup.
    ///
    /// The default `channel` recipient and any name missing from the
    /// user table (logged) become `<!channel>`.
    fn mention(&self, user: &str) -> String {
        if user == "channel" {
            return "<!channel>".to_string();
        }
        match self.users.get(user) {
            Some(id) => format!("<@{id}>"),
            None => {
                tracing::warn!(user, "unknown notification recipient, tagging channel");
                "<!channel>".to_string()
            }
        }
    }

    /// Build the message text: mention, resolved message, URL if present.
    fn format_text(&self, event: &FireEvent) -> String {
        let mut text = format!("{} {}", self.mention(&event.user), event.message);
        if let Some(url) = &event.url {
            text.push(' ');
            text.push_str(url);
        }
        text
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, event: &FireEvent) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "channel": self.channel,
            "text": self.format_text(event),
        });

        tracing::debug!(
            listener = %event.listener,
            channel = %self.channel,
            "posting Slack message"
        );

        let response = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        // The chat API reports failures in the body, not the status.
        let resp_body: serde_json::Value = response.json().await?;
        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            tracing::info!(listener = %event.listener, channel = %self.channel, "Slack message posted");
            return Ok(());
        }

        let reason = resp_body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown Slack API error");
        Err(NotifyError::Api(reason.to_string()))
    }

    fn channel_name(&self) -> &str {
        "slack"
    }
}
