// src/deliver/resend.rs
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{Delivery, DigestEmail};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Delivery via the Resend HTTP API.
pub struct ResendDelivery {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendDelivery {
    pub fn new(api_key: String, from: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-digest-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Delivery for ResendDelivery {
    async fn send(&self, email: &DigestEmail) -> Result<()> {
        #[derive(Serialize)]
        struct Req<'a> {
            from: &'a str,
            to: Vec<&'a str>,
            subject: &'a str,
            html: &'a str,
            text: &'a str,
        }

        let req = Req {
            from: &self.from,
            to: vec![email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let resp = self
            .http
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("calling resend api")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "resend returned {status}: {}",
                body.chars().take(300).collect::<String>()
            );
        }

        info!(to = %email.to, "digest delivered via resend");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}
