/// Configuration file and environment handling
#[allow(clippy::module_inception)]
pub mod config;

pub use config::{ChannelTargets, Config, NotificationConfig, RunMetadata};
