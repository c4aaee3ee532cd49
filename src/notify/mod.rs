//! Operator notifications.
//!
//! `NotificationSink` is the transport (LINE push, e-mail). `RunNotifier` is
//! the port the orchestrator calls at its start/success/failure transitions;
//! it never lets a sink failure escape.

pub mod email;
pub mod line;

use std::sync::Arc;

use anyhow::Result;
use metrics::counter;

pub use email::EmailNotifier;
pub use line::LineMessaging;

#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub type DynSink = Arc<dyn NotificationSink>;

pub fn start_message() -> String {
    "🚀 動画生成を開始しました".to_string()
}

pub fn success_message(title: &str, url: &str) -> String {
    format!("✅ 動画生成が完了しました！\n\n📹 {title}\n🔗 {url}")
}

pub fn error_message(stage: &str, error: &str) -> String {
    format!("❌ エラーが発生しました\n\nステップ: {stage}\nエラー: {error}")
}

/// Notification port for one run. Inert unless both a sink and a recipient
/// are configured.
#[derive(Clone, Default)]
pub struct RunNotifier {
    target: Option<(DynSink, String)>,
}

impl RunNotifier {
    pub fn disabled() -> Self {
        Self { target: None }
    }

    pub fn new(sink: DynSink, recipient: impl Into<String>) -> Self {
        Self {
            target: Some((sink, recipient.into())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    pub async fn started(&self) -> bool {
        self.send(start_message()).await
    }

    pub async fn succeeded(&self, title: &str, url: &str) -> bool {
        self.send(success_message(title, url)).await
    }

    pub async fn failed(&self, stage: &str, error: &str) -> bool {
        self.send(error_message(stage, error)).await
    }

    /// Fire-and-forget: returns whether delivery worked, logs otherwise.
    async fn send(&self, message: String) -> bool {
        let Some((sink, recipient)) = &self.target else {
            return false;
        };
        match sink.notify(recipient, &message).await {
            Ok(()) => {
                counter!("notifications_sent_total", "sink" => sink.name()).increment(1);
                true
            }
            Err(e) => {
                tracing::warn!(error = ?e, sink = sink.name(), "notification failed");
                counter!("notifications_failed_total", "sink" => sink.name()).increment(1);
                false
            }
        }
    }
}
