use std::env;

use async_trait::async_trait;
use eyre::{bail, Context as _, Error, Result};
use ledger::Notifier;
use log::debug;
use serde_json::json;
use url::Url;

/// Reminder delivery over a JSON mail API (any provider with a
/// POST-one-message endpoint and bearer auth works).
pub struct Mailer {
    http: reqwest::Client,
    endpoint: Url,
    token: String,
    from: String,
}

impl Mailer {
    pub fn new(endpoint: Url, token: String, from: String) -> Mailer {
        Mailer {
            http: reqwest::Client::new(),
            endpoint,
            token,
            from,
        }
    }

    pub fn from_env() -> Result<Mailer> {
        let endpoint = env::var("MAILER_URL")
            .context("Failed to get MAILER_URL from env")?
            .parse()
            .context("MAILER_URL is not a valid url")?;
        let token = env::var("MAILER_TOKEN").context("Failed to get MAILER_TOKEN from env")?;
        let from = env::var("MAILER_FROM").context("Failed to get MAILER_FROM from env")?;
        Ok(Mailer::new(endpoint, token, from))
    }
}

#[async_trait]
impl Notifier for Mailer {
    async fn send(
        &self,
        email: &str,
        name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), Error> {
        let message = json!({
            "from": self.from,
            "to": format!("{} <{}>", name, email),
            "subject": subject,
            "html": html_body,
        });
        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&message)
            .send()
            .await
            .context("Failed to reach mail API")?;
        if !response.status().is_success() {
            bail!("Mail API rejected message: {}", response.status());
        }
        debug!("Mail accepted for {}", email);
        Ok(())
    }
}
