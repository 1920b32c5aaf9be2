// src/deliver/smtp.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{Delivery, DigestEmail};

/// Delivery over SMTP. Configured from `SMTP_HOST` / `SMTP_USER` /
/// `SMTP_PASS`; the from-address comes from settings.
pub struct SmtpDelivery {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpDelivery {
    pub fn from_env(from_email: &str) -> Result<Self> {
        let host = std::env::var("SMTP_HOST").context("SMTP_HOST missing")?;
        let user = std::env::var("SMTP_USER").context("SMTP_USER missing")?;
        let pass = std::env::var("SMTP_PASS").context("SMTP_PASS missing")?;

        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        let from = from_email
            .parse()
            .with_context(|| format!("invalid from address {from_email}"))?;

        Ok(Self { mailer, from })
    }
}

#[async_trait]
impl Delivery for SmtpDelivery {
    async fn send(&self, email: &DigestEmail) -> Result<()> {
        let to: Mailbox = email
            .to
            .parse()
            .with_context(|| format!("invalid recipient {}", email.to))?;

        let msg = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        info!(to = %email.to, "digest delivered via smtp");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
