//! SMTP delivery for OTP emails.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use shop_core::{Email, Mailer, ShopError, ShopResult};
use tracing::{debug, instrument};

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// STARTTLS relay; must be created inside a Tokio runtime
    pub fn new(config: &SmtpConfig) -> ShopResult<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| ShopError::Configuration(format!("Invalid SMTP_FROM: {}", e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| ShopError::Configuration(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn compose(from: &Mailbox, email: &Email) -> ShopResult<Message> {
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| ShopError::validation(format!("Invalid recipient {}: {}", email.to, e)))?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(email.body.clone())
        .map_err(|e| ShopError::Internal(format!("Failed to build email: {}", e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: Email) -> ShopResult<()> {
        let message = compose(&self.from, &email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| ShopError::upstream("smtp", e.to_string()))?;
        debug!("Email delivered");
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "smtp"
    }
}
