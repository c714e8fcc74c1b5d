use crate::alerts::channels::{
    ConsoleChannel, DiscordChannel, Notification, NotificationChannel, SlackChannel,
};
use crate::config::{ChannelTargets, NotificationConfig};
use crate::error::ChannelError;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// What happened to each channel during one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    /// Channels that accepted the notification, in registration order
    pub delivered: Vec<String>,
    /// Channels that failed, with the reason, in registration order
    pub failed: Vec<(String, String)>,
}

impl DeliverySummary {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans a notification out to every configured channel
///
/// Channels run concurrently, each bounded by the same timeout. A failing or
/// stalled channel is logged and never prevents delivery to the others.
pub struct Notifier {
    channels: Vec<Arc<dyn NotificationChannel>>,
    timeout: Duration,
}

impl Notifier {
    /// Create a notifier with no channels
    pub fn new(timeout: Duration) -> Self {
        Self {
            channels: Vec::new(),
            timeout,
        }
    }

    /// Build the standard channel set
    ///
    /// The console channel is always present. Webhook channels are added for
    /// each target that is set; a channel that cannot be constructed is
    /// logged and left out.
    pub fn from_config(config: &NotificationConfig, targets: &ChannelTargets) -> Self {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let mut notifier = Self::new(timeout).with_channel(Arc::new(ConsoleChannel));

        match &targets.slack_webhook_url {
            Some(url) => match SlackChannel::new(url.clone(), config.username.clone(), timeout) {
                Ok(channel) => notifier = notifier.with_channel(Arc::new(channel)),
                Err(e) => error!("Failed to set up Slack notifications: {}", e),
            },
            None => warn!("Slack webhook URL not configured, skipping Slack notification"),
        }

        match &targets.discord_webhook_url {
            Some(url) => match DiscordChannel::new(
                url.clone(),
                config.username.clone(),
                config.avatar_url.clone(),
                timeout,
            ) {
                Ok(channel) => notifier = notifier.with_channel(Arc::new(channel)),
                Err(e) => error!("Failed to set up Discord notifications: {}", e),
            },
            None => warn!("Discord webhook URL not configured, skipping Discord notification"),
        }

        notifier
    }

    /// Add a channel
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Names of the registered channels, in registration order
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_string()).collect()
    }

    /// Deliver a notification to every channel concurrently
    pub async fn dispatch(&self, notification: Notification) -> DeliverySummary {
        let notification = Arc::new(notification);
        let mut join_set = JoinSet::new();

        for (index, channel) in self.channels.iter().enumerate() {
            let channel = Arc::clone(channel);
            let notification = Arc::clone(&notification);
            let timeout = self.timeout;

            join_set.spawn(async move {
                let name = channel.name().to_string();
                let result =
                    match tokio::time::timeout(timeout, channel.deliver(&notification)).await {
                        Ok(result) => result,
                        Err(_) => Err(ChannelError::Timeout(name.clone())),
                    };
                (index, name, result.map_err(|e| e.to_string()))
            });
        }

        let mut outcomes = Vec::with_capacity(self.channels.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Notification task failed: {}", e),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut summary = DeliverySummary::default();
        for (_, name, result) in outcomes {
            match result {
                Ok(()) => summary.delivered.push(name),
                Err(reason) => {
                    error!("Failed to send {} notification: {}", name, reason);
                    summary.failed.push((name, reason));
                }
            }
        }

        if summary.all_delivered() {
            info!("Notifications sent successfully");
        }
        summary
    }
}
