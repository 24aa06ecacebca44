use anyhow::Result;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::GuardConfig;
use crate::guard::{GuardOutcome, Submission, SubmissionGuard};
use crate::mailer::{EmailJsClient, Mailer};
use crate::rate_limit::RateLimiter;

const MAX_BODY_BYTES: usize = 16 * 1024; // form payloads are small

pub const GENUINE_SUCCESS_MESSAGE: &str =
    "Thank you for your message! I'll get back to you as soon as possible.";
pub const FAKE_SUCCESS_MESSAGE: &str = "Thank you for your message!";
const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
const UNCONFIGURED_MESSAGE: &str = "Email service configuration error. Please try again later.";

#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<SubmissionGuard>,
}

#[derive(Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    /// Honeypot field, hidden from humans by the form styling.
    #[serde(default)]
    pub website: String,
    /// Epoch milliseconds stamped into the form when it was rendered.
    #[serde(rename = "_timestamp")]
    pub timestamp: Option<String>,
}

pub async fn run_server() -> Result<()> {
    let config = GuardConfig::from_env()?;

    let mailer: Option<Arc<dyn Mailer>> = match EmailJsClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            error!("Mail dispatch disabled: {}", e);
            None
        }
    };

    let limiter = Arc::new(RateLimiter::new(config.window_secs, config.max_per_window));
    let sweeper = limiter.start_sweeper(config.sweep_interval);

    let guard = Arc::new(SubmissionGuard::new(config, limiter, mailer));
    let app = build_router(AppState { guard });

    let addr = SocketAddr::from(([0, 0, 0, 0], 8087));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    sweeper.shutdown();
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/contact", post(handle_contact))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn handle_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ContactForm>,
) -> impl IntoResponse {
    let submission = Submission {
        name: form.name,
        email: form.email,
        message: form.message,
        honeypot: form.website,
        form_loaded_at: form
            .timestamp
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok()),
        client_id: extract_ip(&headers),
    };

    let outcome = state.guard.handle(&submission).await;
    respond(outcome, state.guard.config())
}

fn respond(outcome: GuardOutcome, config: &GuardConfig) -> (StatusCode, Json<serde_json::Value>) {
    match outcome {
        GuardOutcome::Accepted => (
            StatusCode::OK,
            Json(json!({"success": true, "message": GENUINE_SUCCESS_MESSAGE})),
        ),
        // Same shape as a genuine success; nothing here may reveal detection.
        GuardOutcome::FakeAccepted => (
            StatusCode::OK,
            Json(json!({"success": true, "message": FAKE_SUCCESS_MESSAGE})),
        ),
        GuardOutcome::Rejected(errors) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "errors": errors})),
        ),
        GuardOutcome::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"success": false, "errors": {"form": RATE_LIMITED_MESSAGE}})),
        ),
        GuardOutcome::Unconfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"success": false, "errors": {"form": UNCONFIGURED_MESSAGE}})),
        ),
        GuardOutcome::DispatchFailed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "errors": {
                    "form": format!(
                        "Failed to send message. Please try again or contact me directly at {}",
                        config.fallback_contact
                    )
                }
            })),
        ),
    }
}

fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-real-ip"))
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
