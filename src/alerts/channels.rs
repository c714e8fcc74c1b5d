use crate::error::ChannelError;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Rendered message plus the outcome it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub has_failures: bool,
}

/// Destination for run notifications
pub trait NotificationChannel: Send + Sync {
    /// Short name used in logs and delivery summaries
    fn name(&self) -> &str;

    /// Deliver one notification
    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>>;
}

/// Writes notifications to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    const RULE_WIDTH: usize = 80;

    /// Render the console banner around a message
    pub fn format(notification: &Notification) -> String {
        let rule = "=".repeat(Self::RULE_WIDTH);
        format!(
            "\n{rule}\n🔔 TEST NOTIFICATION\n{rule}\n{}\n{rule}",
            notification.message
        )
    }

    /// Print a notification immediately
    pub fn print(notification: &Notification) {
        println!("{}", Self::format(notification));
    }
}

impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            Self::print(notification);
            Ok(())
        })
    }
}

fn http_client(timeout: Duration) -> Result<Client, ChannelError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

async fn post_webhook<T: Serialize + ?Sized>(
    client: &Client,
    channel: &str,
    url: &str,
    payload: &T,
) -> Result<(), ChannelError> {
    debug!("Posting {} notification", channel);

    let response = client.post(url).json(payload).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ChannelError::DeliveryFailed(format!(
            "{} webhook returned error {}: {}",
            channel, status, error_text
        )));
    }

    info!("Sent {} notification", channel);
    Ok(())
}

/// Body of a Slack incoming-webhook request
#[derive(Debug, Serialize)]
pub struct SlackPayload<'a> {
    pub text: &'a str,
    pub username: &'a str,
    pub icon_emoji: &'a str,
}

/// Posts notifications to a Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackChannel {
    client: Client,
    webhook_url: String,
    username: String,
}

impl SlackChannel {
    /// Create a Slack channel
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::HttpError` if the HTTP client cannot be built.
    pub fn new(webhook_url: String, username: String, timeout: Duration) -> Result<Self, ChannelError> {
        Ok(Self {
            client: http_client(timeout)?,
            webhook_url,
            username,
        })
    }

    /// Build the request body for a notification
    pub fn payload<'a>(&'a self, notification: &'a Notification) -> SlackPayload<'a> {
        SlackPayload {
            text: &notification.message,
            username: &self.username,
            icon_emoji: if notification.has_failures {
                ":x:"
            } else {
                ":white_check_mark:"
            },
        }
    }
}

impl NotificationChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.payload(notification);
            post_webhook(&self.client, self.name(), &self.webhook_url, &payload).await
        })
    }
}

/// Body of a Discord webhook request
#[derive(Debug, Serialize)]
pub struct DiscordPayload<'a> {
    pub content: &'a str,
    pub username: &'a str,
    pub avatar_url: &'a str,
}

/// Posts notifications to a Discord webhook
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    client: Client,
    webhook_url: String,
    username: String,
    avatar_url: String,
}

impl DiscordChannel {
    /// Create a Discord channel
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::HttpError` if the HTTP client cannot be built.
    pub fn new(
        webhook_url: String,
        username: String,
        avatar_url: String,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        Ok(Self {
            client: http_client(timeout)?,
            webhook_url,
            username,
            avatar_url,
        })
    }

    /// Build the request body for a notification
    pub fn payload<'a>(&'a self, notification: &'a Notification) -> DiscordPayload<'a> {
        DiscordPayload {
            content: &notification.message,
            username: &self.username,
            avatar_url: &self.avatar_url,
        }
    }
}

impl NotificationChannel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.payload(notification);
            post_webhook(&self.client, self.name(), &self.webhook_url, &payload).await
        })
    }
}

/// In-memory channel for tests
///
/// Records every delivered message and can be told to fail or stall.
#[derive(Debug, Clone)]
pub struct MockChannel {
    name: String,
    delivered: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MockChannel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delivered: Arc::new(Mutex::new(Vec::new())),
            failure: None,
            delay: None,
        }
    }

    /// Fail every delivery with the given reason
    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(name)
        }
    }

    /// Sleep before every delivery
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Messages received so far
    pub fn delivered(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.delivered().len()
    }
}

impl NotificationChannel for MockChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if let Ok(mut messages) = self.delivered.lock() {
                messages.push(notification.message.clone());
            }

            match &self.failure {
                Some(reason) => Err(ChannelError::DeliveryFailed(reason.clone())),
                None => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(has_failures: bool) -> Notification {
        Notification {
            message: "🚨 **K6 Load Test Failures Detected**".to_string(),
            has_failures,
        }
    }

    #[test]
    fn test_console_banner() {
        let output = ConsoleChannel::format(&notification(true));
        let rule = "=".repeat(80);
        assert_eq!(
            output,
            format!(
                "\n{rule}\n🔔 TEST NOTIFICATION\n{rule}\n🚨 **K6 Load Test Failures Detected**\n{rule}"
            )
        );
    }

    #[test]
    fn test_slack_payload() {
        let channel = SlackChannel::new(
            "https://hooks.slack.com/services/T/B/X".to_string(),
            "NightBFF CI Bot".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let failed = notification(true);
        let json = serde_json::to_value(channel.payload(&failed)).unwrap();
        assert_eq!(json["text"], "🚨 **K6 Load Test Failures Detected**");
        assert_eq!(json["username"], "NightBFF CI Bot");
        assert_eq!(json["icon_emoji"], ":x:");

        let passed = notification(false);
        let json = serde_json::to_value(channel.payload(&passed)).unwrap();
        assert_eq!(json["icon_emoji"], ":white_check_mark:");
    }

    #[test]
    fn test_discord_payload() {
        let channel = DiscordChannel::new(
            "https://discord.com/api/webhooks/1/abc".to_string(),
            "NightBFF CI Bot".to_string(),
            "https://example.com/avatar.png".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();

        let n = notification(false);
        let json = serde_json::to_value(channel.payload(&n)).unwrap();
        assert_eq!(json["content"], "🚨 **K6 Load Test Failures Detected**");
        assert_eq!(json["username"], "NightBFF CI Bot");
        assert_eq!(json["avatar_url"], "https://example.com/avatar.png");
        assert_eq!(channel.name(), "discord");
    }

    #[tokio::test]
    async fn test_mock_channel_records_messages() {
        let channel = MockChannel::new("mock");
        channel.deliver(&notification(false)).await.unwrap();
        channel.deliver(&notification(true)).await.unwrap();
        assert_eq!(channel.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_channel_failure() {
        let channel = MockChannel::failing("mock", "webhook unreachable");
        let result = channel.deliver(&notification(true)).await;
        assert!(matches!(result, Err(ChannelError::DeliveryFailed(_))));
        assert_eq!(channel.call_count(), 1);
    }

    #[tokio::test]
    async fn test_webhook_delivery_to_unreachable_host_fails() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let channel = SlackChannel::new(
            "http://127.0.0.1:9/hook".to_string(),
            "NightBFF CI Bot".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = channel.deliver(&notification(true)).await;
        assert!(result.is_err());
    }
}
