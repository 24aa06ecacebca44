pub mod app;
pub mod config;
pub mod guard;
pub mod mailer;
pub mod rate_limit;
pub mod spam;
pub mod validate;
