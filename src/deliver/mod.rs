// src/deliver/mod.rs
//! Delivery: hand the rendered digest to an email provider and report
//! success or failure. Nothing is recorded in the dedup cache until a
//! provider confirms the send.

pub mod resend;
pub mod smtp;

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::config::{Settings, UserProfile};
use crate::curate::DigestContent;

pub use resend::ResendDelivery;
pub use smtp::SmtpDelivery;

/// A fully rendered, ready-to-send email.
#[derive(Debug, Clone)]
pub struct DigestEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait::async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, email: &DigestEmail) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Pick a provider from settings: Resend when a key is present, SMTP when
/// the SMTP env vars are, otherwise an error (a run cannot deliver).
pub fn build_delivery(settings: &Settings) -> Result<Arc<dyn Delivery>> {
    if let Some(key) = &settings.resend_api_key {
        return Ok(Arc::new(ResendDelivery::new(
            key.clone(),
            settings.from_email.clone(),
        )));
    }
    if std::env::var("SMTP_HOST").is_ok() {
        return Ok(Arc::new(SmtpDelivery::from_env(&settings.from_email)?));
    }
    bail!("no delivery provider configured (set RESEND_API_KEY or SMTP_HOST)")
}

/// Render plain-text and HTML bodies from the curated digest.
pub fn render_email(profile: &UserProfile, content: &DigestContent) -> DigestEmail {
    let mut text = String::new();
    if !content.intro.is_empty() {
        text.push_str(&content.intro);
        text.push_str("\n\n");
    }
    for (i, item) in content.items.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} ({})\n{}\n{}\n\n",
            i + 1,
            item.title,
            item.source_label,
            item.blurb,
            item.url
        ));
    }

    let mut html = String::from("<html><body style=\"font-family:sans-serif;max-width:640px\">");
    if !content.intro.is_empty() {
        html.push_str(&format!("<p>{}</p>", escape_html(&content.intro)));
    }
    html.push_str("<ol>");
    for item in &content.items {
        html.push_str(&format!(
            "<li><p><a href=\"{url}\"><strong>{title}</strong></a> \
             <em>({source})</em><br>{blurb}</p></li>",
            url = escape_html(&item.url),
            title = escape_html(&item.title),
            source = escape_html(&item.source_label),
            blurb = escape_html(&item.blurb),
        ));
    }
    html.push_str("</ol></body></html>");

    DigestEmail {
        to: profile.email.clone(),
        subject: content.subject.clone(),
        text,
        html,
    }
}

fn escape_html(s: &str) -> String {
    html_escape::encode_text(s).to_string()
}
