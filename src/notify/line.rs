use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::NotificationSink;
use crate::config::app::LineConfig;

/// Push/reply surface of the messaging channel, used by the webhook.
#[async_trait::async_trait]
pub trait Messenger: Send + Sync {
    async fn push(&self, to: &str, text: &str) -> Result<()>;
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;
}

/// LINE Messaging API client.
#[derive(Clone)]
pub struct LineMessaging {
    access_token: String,
    api_base: String,
    client: Client,
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

impl LineMessaging {
    pub fn new(cfg: &LineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building line http client")?;
        Ok(Self {
            access_token: cfg.access_token.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        if !self.is_configured() {
            bail!("LINE access token is not configured");
        }
        self.client
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("line post {path}"))?
            .error_for_status()
            .with_context(|| format!("line {path} non-2xx"))?;
        Ok(())
    }
}

fn text(text: &str) -> [TextMessage<'_>; 1] {
    [TextMessage { kind: "text", text }]
}

#[async_trait::async_trait]
impl Messenger for LineMessaging {
    async fn push(&self, to: &str, body: &str) -> Result<()> {
        let req = PushRequest {
            to,
            messages: text(body),
        };
        self.post("/v2/bot/message/push", &req).await
    }

    async fn reply(&self, reply_token: &str, body: &str) -> Result<()> {
        let req = ReplyRequest {
            reply_token,
            messages: text(body),
        };
        self.post("/v2/bot/message/reply", &req).await
    }
}

#[async_trait::async_trait]
impl NotificationSink for LineMessaging {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()> {
        self.push(recipient, message).await
    }

    fn name(&self) -> &'static str {
        "line"
    }
}
