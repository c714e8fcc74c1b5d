/// Notification channels
pub mod channels;
/// Failure diagnostics written next to the report
pub mod debug_report;
/// Concurrent delivery across channels
pub mod notifier;
/// Console and notification text
pub mod renderer;

pub use channels::{
    ConsoleChannel, DiscordChannel, MockChannel, Notification, NotificationChannel, SlackChannel,
};
pub use debug_report::DebugReport;
pub use notifier::{DeliverySummary, Notifier};
pub use renderer::{render_console_summary, render_notification};
