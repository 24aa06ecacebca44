use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;

const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Template parameters for one outbound contact mail.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from_name: String,
    pub from_email: String,
    pub message: String,
    pub to_name: String,
    pub reply_to: String,
    pub client_ip: String,
    pub timestamp: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct EmailJsClient {
    client: Client,
    service_id: String,
    template_id: String,
    public_key: String,
    private_key: String,
}

impl EmailJsClient {
    pub fn from_env() -> Result<Self> {
        let service_id = env::var("EMAILJS_SERVICE_ID").context("EMAILJS_SERVICE_ID not set")?;
        let template_id =
            env::var("EMAILJS_TEMPLATE_ID").context("EMAILJS_TEMPLATE_ID not set")?;
        let public_key = env::var("EMAILJS_PUBLIC_KEY").context("EMAILJS_PUBLIC_KEY not set")?;
        let private_key =
            env::var("EMAILJS_PRIVATE_KEY").context("EMAILJS_PRIVATE_KEY not set")?;

        let user_agent = format!("formguard/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build EmailJS HTTP client")?;

        Ok(Self {
            client,
            service_id,
            template_id,
            public_key,
            private_key,
        })
    }
}

#[async_trait]
impl Mailer for EmailJsClient {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let payload = json!({
            "service_id": self.service_id,
            "template_id": self.template_id,
            "user_id": self.public_key,
            "accessToken": self.private_key,
            "template_params": {
                "from_name": email.from_name,
                "from_email": email.from_email,
                "message": email.message,
                "to_name": email.to_name,
                "reply_to": email.reply_to,
                "client_ip": email.client_ip,
                "timestamp": email.timestamp,
            }
        });

        let response = self
            .client
            .post(EMAILJS_ENDPOINT)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!(
                "Failed to send mail via EmailJS. Status: {}",
                response.status()
            ))
        }
    }
}
