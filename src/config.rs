use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Policy knobs for the submission guard. The pattern lists are plain data
/// so they can be swapped without touching detection code.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Rate-limit window length in seconds.
    pub window_secs: i64,
    /// Submissions allowed per client within one window.
    pub max_per_window: u32,
    /// How often the background sweep evicts expired windows.
    pub sweep_interval: Duration,
    /// Submissions faster than this (ms since form load) are treated as bots.
    pub min_fill_ms: i64,
    /// Spam pattern matches above this count mark the message as bot traffic.
    pub spam_score_threshold: usize,
    /// Contiguous alphanumeric runs of at least this length look generated.
    pub random_run_len: usize,
    /// Raw http(s) links allowed in a message before validation fails.
    pub max_message_links: usize,
    pub spam_keywords: Vec<String>,
    pub disposable_domains: Vec<String>,
    /// Recipient name placed into the outbound mail template.
    pub recipient_name: String,
    /// Human contact surfaced when dispatch fails.
    pub fallback_contact: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            window_secs: 60 * 60,
            max_per_window: 3,
            sweep_interval: Duration::from_secs(10 * 60),
            min_fill_ms: 3000,
            spam_score_threshold: 3,
            random_run_len: 15,
            max_message_links: 2,
            spam_keywords: ["viagra", "cialis", "casino", "lottery", "crypto", "bitcoin"]
                .into_iter()
                .map(String::from)
                .collect(),
            disposable_domains: [
                "tempmail.com",
                "guerrillamail.com",
                "throwaway.email",
                "10minutemail.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            recipient_name: "Site Owner".to_string(),
            fallback_contact: "hello@example.com".to_string(),
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> Result<Self> {
        let recipient_name = env::var("CONTACT_TO_NAME").context("CONTACT_TO_NAME not set")?;
        let fallback_contact =
            env::var("CONTACT_FALLBACK_EMAIL").context("CONTACT_FALLBACK_EMAIL not set")?;
        Ok(Self {
            recipient_name,
            fallback_contact,
            ..Self::default()
        })
    }
}
