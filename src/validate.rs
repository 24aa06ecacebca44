use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::config::GuardConfig;
use crate::spam::count_raw_links;

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 254;
const MESSAGE_MIN_CHARS: usize = 10;
const MESSAGE_MAX_CHARS: usize = 2000;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static NAME_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://").unwrap());

pub type ValidationResult = HashMap<&'static str, &'static str>;

/// Check all three fields and collect one message per failing field.
/// Each field stops at its first failing rule; fields never mask each other.
pub fn validate(name: &str, email: &str, message: &str, config: &GuardConfig) -> ValidationResult {
    let mut errors = HashMap::new();
    if let Some(error) = validate_name(name) {
        errors.insert("name", error);
    }
    if let Some(error) = validate_email(email, &config.disposable_domains) {
        errors.insert("email", error);
    }
    if let Some(error) = validate_message(message, config.max_message_links) {
        errors.insert("message", error);
    }
    errors
}

fn validate_name(name: &str) -> Option<&'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Some("Name is required");
    }
    if trimmed.chars().count() < NAME_MIN_CHARS {
        return Some("Name must be at least 2 characters long");
    }
    if trimmed.chars().count() > NAME_MAX_CHARS {
        return Some("Name must be less than 100 characters");
    }
    if NAME_URL.is_match(name) {
        return Some("Name cannot contain URLs");
    }
    None
}

fn validate_email(email: &str, disposable_domains: &[String]) -> Option<&'static str> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Email is required");
    }
    if !EMAIL_SHAPE.is_match(trimmed) {
        return Some("Please enter a valid email address");
    }
    if trimmed.chars().count() > EMAIL_MAX_CHARS {
        return Some("Email address is too long");
    }
    if let Some(domain) = trimmed.split('@').nth(1) {
        let domain = domain.to_lowercase();
        if disposable_domains.iter().any(|blocked| *blocked == domain) {
            return Some("Please use a permanent email address");
        }
    }
    None
}

fn validate_message(message: &str, max_links: usize) -> Option<&'static str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Some("Message is required");
    }
    if trimmed.chars().count() < MESSAGE_MIN_CHARS {
        return Some("Message must be at least 10 characters long");
    }
    if trimmed.chars().count() > MESSAGE_MAX_CHARS {
        return Some("Message must be less than 2000 characters");
    }
    if count_raw_links(message) > max_links {
        return Some("Message contains too many links");
    }
    None
}
