//! Structured logging for Nua
//!
//! Events go through `tracing` with a `category` field:
//! - CHAT: conversation turns and reply paths
//! - DIVINATION: table readings, escalation, feedback
//! - MEMORY: per-user record loads and saves
//! - ROUTING: generative vs fallback decisions
//! - ERROR: recovered failures
//!
//! When a log directory is configured, a daily rolling file is written next to stdout.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Chat,
    Divination,
    Memory,
    Routing,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Chat => "CHAT",
            LogCategory::Divination => "DIVINATION",
            LogCategory::Memory => "MEMORY",
            LogCategory::Routing => "ROUTING",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Initialize the global subscriber. Returns the file writer guard, which must be
/// kept alive for the lifetime of the process when file logging is enabled.
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "nua.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let initialized = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .try_init();
            if initialized.is_err() {
                eprintln!("tracing subscriber already installed");
            }
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init();
            None
        }
    }
}

/// Shorten a user id for log lines
pub fn short_id(user_id: &str) -> &str {
    match user_id.char_indices().nth(8) {
        Some((idx, _)) => &user_id[..idx],
        None => user_id,
    }
}

/// Log a message with category and optional user context
pub fn log(category: LogCategory, user_id: Option<&str>, message: &str) {
    let user = user_id.map(short_id).unwrap_or("-");
    match category {
        LogCategory::Error => {
            tracing::warn!(category = category.as_str(), user, "{}", message)
        }
        _ => tracing::info!(category = category.as_str(), user, "{}", message),
    }
}

pub fn log_chat(user_id: Option<&str>, message: &str) {
    log(LogCategory::Chat, user_id, message);
}

pub fn log_divination(user_id: Option<&str>, message: &str) {
    log(LogCategory::Divination, user_id, message);
}

pub fn log_memory(user_id: Option<&str>, message: &str) {
    log(LogCategory::Memory, user_id, message);
}

/// Log a generative-vs-fallback decision
pub fn log_routing(user_id: Option<&str>, message: &str) {
    log(LogCategory::Routing, user_id, message);
}

/// Log a recovered error
pub fn log_error(user_id: Option<&str>, message: &str) {
    log(LogCategory::Error, user_id, message);
}
