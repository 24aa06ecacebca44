use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::GuardConfig;
use crate::mailer::{Mailer, OutboundEmail};
use crate::rate_limit::RateLimiter;
use crate::spam::SpamHeuristic;
use crate::validate::{self, ValidationResult};

/// One untrusted form submission, built per request and discarded after the
/// guard returns.
#[derive(Debug, Clone)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub message: String,
    pub honeypot: String,
    /// Epoch milliseconds at which the form was rendered, if the client
    /// supplied them.
    pub form_loaded_at: Option<i64>,
    pub client_id: String,
}

/// Terminal state of the guard pipeline. `FakeAccepted` must be rendered
/// indistinguishably from `Accepted` at the trust boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Accepted,
    FakeAccepted,
    Rejected(ValidationResult),
    RateLimited,
    Unconfigured,
    DispatchFailed,
}

/// Orchestrates rate limiting, bot detection, validation and dispatch.
///
/// Spam and timing trips are resolved silently: the caller sees a success,
/// the reason stays in the server log. Validation and rate-limit failures
/// are reported honestly since those come from people, not scripts.
pub struct SubmissionGuard {
    config: GuardConfig,
    heuristic: SpamHeuristic,
    limiter: Arc<RateLimiter>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl SubmissionGuard {
    pub fn new(
        config: GuardConfig,
        limiter: Arc<RateLimiter>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let heuristic = SpamHeuristic::new(&config);
        Self {
            config,
            heuristic,
            limiter,
            mailer,
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub async fn handle(&self, submission: &Submission) -> GuardOutcome {
        if !self.limiter.check(&submission.client_id) {
            warn!(client = %submission.client_id, "rate limit exceeded");
            return GuardOutcome::RateLimited;
        }

        let now_ms = Utc::now().timestamp_millis();
        if submitted_too_fast(submission.form_loaded_at, now_ms, self.config.min_fill_ms) {
            info!(
                client = %submission.client_id,
                "form submitted too quickly, returning fabricated success"
            );
            return GuardOutcome::FakeAccepted;
        }

        let verdict = self.heuristic.evaluate(
            &submission.name,
            &submission.email,
            &submission.message,
            &submission.honeypot,
        );
        if verdict.is_bot() {
            info!(
                client = %submission.client_id,
                ?verdict,
                "bot suspected, returning fabricated success"
            );
            return GuardOutcome::FakeAccepted;
        }

        let errors = validate::validate(
            &submission.name,
            &submission.email,
            &submission.message,
            &self.config,
        );
        if !errors.is_empty() {
            return GuardOutcome::Rejected(errors);
        }

        let Some(mailer) = self.mailer.as_deref() else {
            error!("mail dispatch is not configured, check the EMAILJS_* environment variables");
            return GuardOutcome::Unconfigured;
        };

        let email = self.outbound_email(submission, Utc::now());
        match mailer.send(&email).await {
            Ok(()) => {
                info!(
                    from = %email.from_email,
                    client = %submission.client_id,
                    "contact message dispatched"
                );
                GuardOutcome::Accepted
            }
            Err(e) => {
                error!(error = %e, "failed to dispatch contact message");
                GuardOutcome::DispatchFailed
            }
        }
    }

    fn outbound_email(&self, submission: &Submission, now: DateTime<Utc>) -> OutboundEmail {
        let from_email = submission.email.trim().to_string();
        OutboundEmail {
            from_name: submission.name.trim().to_string(),
            reply_to: from_email.clone(),
            from_email,
            message: submission.message.trim().to_string(),
            to_name: self.config.recipient_name.clone(),
            client_ip: submission.client_id.clone(),
            timestamp: now.format("%B %-d, %Y, %H:%M UTC").to_string(),
        }
    }
}

/// Bots submit the instant the page loads; humans take a few seconds.
/// Clients that never sent a load timestamp pass the gate.
fn submitted_too_fast(form_loaded_at: Option<i64>, now_ms: i64, min_fill_ms: i64) -> bool {
    match form_loaded_at {
        Some(loaded_at) => now_ms - loaded_at < min_fill_ms,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::submitted_too_fast;

    #[test]
    fn fast_submission_is_flagged() {
        assert!(submitted_too_fast(Some(10_000), 11_000, 3000));
    }

    #[test]
    fn slow_submission_passes() {
        assert!(!submitted_too_fast(Some(10_000), 15_000, 3000));
    }

    #[test]
    fn exact_threshold_passes() {
        assert!(!submitted_too_fast(Some(10_000), 13_000, 3000));
    }

    #[test]
    fn future_timestamp_is_flagged() {
        assert!(submitted_too_fast(Some(20_000), 11_000, 3000));
    }

    #[test]
    fn missing_timestamp_passes() {
        assert!(!submitted_too_fast(None, 11_000, 3000));
    }
}
