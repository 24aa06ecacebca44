use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::GuardConfig;

static HTTP_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)http://").unwrap());
static HTTPS_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https://").unwrap());
static ANCHOR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a\s+href").unwrap());
static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<script").unwrap());
static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)onclick").unwrap());
static URL_LIKE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^http|^www\.|\.com|\.net|\.org").unwrap());

/// Why a submission was classified as bot traffic, or `Clean` if it wasn't.
/// Signals are checked in a fixed order; the first trip wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    Honeypot,
    HighSpamScore,
    RandomToken,
    UrlLikeName,
    Clean,
}

impl SpamVerdict {
    pub fn is_bot(self) -> bool {
        !matches!(self, SpamVerdict::Clean)
    }
}

/// Stateless pattern scorer for form submissions. Compiled once from the
/// configured keyword list; evaluation is pure and deterministic.
pub struct SpamHeuristic {
    keyword_pattern: Option<Regex>,
    random_run: Regex,
    score_threshold: usize,
}

impl SpamHeuristic {
    pub fn new(config: &GuardConfig) -> Self {
        let keyword_pattern = if config.spam_keywords.is_empty() {
            None
        } else {
            let alternation = config
                .spam_keywords
                .iter()
                .map(|keyword| regex::escape(keyword))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?i){alternation}")).unwrap())
        };
        let random_run = Regex::new(&format!("[a-z0-9]{{{},}}", config.random_run_len)).unwrap();
        Self {
            keyword_pattern,
            random_run,
            score_threshold: config.spam_score_threshold,
        }
    }

    pub fn evaluate(&self, name: &str, email: &str, message: &str, honeypot: &str) -> SpamVerdict {
        // Hidden field that only automated form fillers populate.
        if !honeypot.trim().is_empty() {
            return SpamVerdict::Honeypot;
        }

        let mut score = count_raw_links(message);
        score += ANCHOR_TAG.find_iter(message).count();
        score += SCRIPT_TAG.find_iter(message).count();
        score += EVENT_HANDLER.find_iter(message).count();
        if let Some(keywords) = &self.keyword_pattern {
            score += keywords.find_iter(message).count();
        }
        if score > self.score_threshold {
            return SpamVerdict::HighSpamScore;
        }

        let combined = format!("{name} {email} {message}").to_lowercase();
        if self.random_run.is_match(&combined) {
            return SpamVerdict::RandomToken;
        }

        if URL_LIKE_NAME.is_match(name) {
            return SpamVerdict::UrlLikeName;
        }

        SpamVerdict::Clean
    }
}

/// Occurrences of raw `http://` / `https://` in `text`. Shared with the
/// validator's link-count rule.
pub fn count_raw_links(text: &str) -> usize {
    HTTP_LINK.find_iter(text).count() + HTTPS_LINK.find_iter(text).count()
}
