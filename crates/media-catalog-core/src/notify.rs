use async_trait::async_trait;
use tracing::info;

/// Operator-facing message about a catalog operation.
#[derive(Debug, Clone)]
pub struct Notification {
    pub channel: String,
    pub title: String,
    pub user_id: Option<String>,
}

impl Notification {
    pub fn new(channel: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            title: title.into(),
            user_id: None,
        }
    }
}

/// Fire-and-forget notification collaborator. Implementations swallow
/// delivery failures; a cycle never blocks on them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification);
}

/// Default notifier: delivery is the log stream.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) {
        info!(
            channel = %notification.channel,
            user_id = notification.user_id.as_deref().unwrap_or(""),
            "{}",
            notification.title
        );
    }
}
