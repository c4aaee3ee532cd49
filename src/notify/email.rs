use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::NotificationSink;
use crate::config::app::EmailConfig;

/// SMTP notification sink. The recipient is used when it parses as an
/// address, otherwise the configured `to` mailbox receives the message.
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn new(cfg: &EmailConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.smtp_user.clone(), cfg.smtp_pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .with_context(|| format!("invalid smtp host {:?}", cfg.smtp_host))?
            .credentials(creds)
            .build();

        let from = cfg.from.parse().context("invalid email.from")?;
        let to = cfg.to.parse().context("invalid email.to")?;
        Ok(Self { mailer, from, to })
    }

    fn mailbox_for(&self, recipient: &str) -> Mailbox {
        recipient.parse().unwrap_or_else(|_| self.to.clone())
    }
}

/// First line of the message, without the leading emoji.
fn subject_for(message: &str) -> String {
    let first = message.lines().next().unwrap_or_default();
    let trimmed = first.trim_start_matches(|c: char| !c.is_alphanumeric()).trim();
    format!("[daily-econ-shorts] {trimmed}")
}

#[async_trait::async_trait]
impl NotificationSink for EmailNotifier {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.mailbox_for(recipient))
            .subject(subject_for(message))
            .header(header::ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_drops_emoji_prefix() {
        assert_eq!(
            subject_for("✅ 動画生成が完了しました！\n\n📹 t"),
            "[daily-econ-shorts] 動画生成が完了しました！"
        );
    }

    #[tokio::test]
    async fn recipient_falls_back_to_configured_mailbox() {
        let cfg = EmailConfig {
            enabled: true,
            smtp_host: "smtp.example.com".into(),
            smtp_user: "u".into(),
            smtp_pass: "p".into(),
            from: "bot@example.com".into(),
            to: "ops@example.com".into(),
        };
        let n = EmailNotifier::new(&cfg).unwrap();
        assert_eq!(n.mailbox_for("U12345").email.to_string(), "ops@example.com");
        assert_eq!(
            n.mailbox_for("dev@example.com").email.to_string(),
            "dev@example.com"
        );
    }
}
