//! # Mailer
//!
//! Outbound email seam. The server plugs in SMTP; tests and local runs use
//! [`OutboxMailer`], which keeps every message in memory.

use crate::error::{ShopError, ShopResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A plaintext email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message; transport failures are `Upstream` errors
    async fn send(&self, email: Email) -> ShopResult<()>;

    /// Transport name (for logging)
    fn transport_name(&self) -> &'static str;
}

/// Type alias for a shared mailer (dynamic dispatch)
pub type SharedMailer = Arc<dyn Mailer>;

/// Keeps sent mail in memory instead of delivering it
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `send` fail, as an unreachable SMTP server would
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn messages(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    /// Most recent message addressed to `to`
    pub async fn last_to(&self, to: &str) -> Option<Email> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|email| email.to == to)
            .cloned()
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, email: Email) -> ShopResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShopError::upstream("outbox", "mail transport unavailable"));
        }
        tracing::info!(to = %email.to, subject = %email.subject, "email held in outbox");
        tracing::debug!(body = %email.body, "outbox message body");
        self.sent.lock().await.push(email);
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "outbox"
    }
}
