//! SMTP delivery of reports.
//!
//! Messages go out over a STARTTLS relay at `SMTP_SERVER:SMTP_PORT`,
//! authenticated with the sender address and `SMTP_PASSWORD`.

use lettre::message::header::ContentType;
use lettre::message::{Attachment as AttachmentPart, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::SmtpSettings;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address {0:?}: {1}")]
    Address(String, #[source] lettre::address::AddressError),

    #[error("Invalid content type {0:?}")]
    ContentType(String),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// A file attached to an outgoing email.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn csv(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "text/csv".to_string(),
            data,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Defaults to the configured sender.
    pub from: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub attachment: Option<Attachment>,
    /// Send `body` as HTML with a derived plain-text alternative.
    pub is_html: bool,
}

impl OutgoingEmail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Crude plain-text fallback for an HTML body.
pub fn html_to_plain(html: &str) -> String {
    html.replace("<br>", "\n")
        .replace("<p>", "")
        .replace("</p>", "\n")
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e| MailError::Address(address.to_string(), e))
}

fn attachment_part(attachment: &Attachment) -> Result<SinglePart, MailError> {
    let content_type = ContentType::parse(&attachment.content_type)
        .map_err(|_| MailError::ContentType(attachment.content_type.clone()))?;
    Ok(AttachmentPart::new(attachment.filename.clone()).body(attachment.data.clone(), content_type))
}

pub struct EmailService {
    settings: SmtpSettings,
}

impl EmailService {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    /// Build the MIME message without sending it.
    pub fn build_message(&self, email: &OutgoingEmail) -> Result<Message, MailError> {
        let from = email.from.as_deref().unwrap_or(&self.settings.from_email);

        let mut builder = Message::builder()
            .from(mailbox(from)?)
            .to(mailbox(&email.to)?)
            .subject(email.subject.as_str());
        if let Some(cc) = &email.cc {
            builder = builder.cc(mailbox(cc)?);
        }
        if let Some(bcc) = &email.bcc {
            builder = builder.bcc(mailbox(bcc)?);
        }

        let message = match (&email.attachment, email.is_html) {
            (Some(attachment), true) => {
                let alternative = MultiPart::alternative_plain_html(
                    html_to_plain(&email.body),
                    email.body.clone(),
                );
                builder.multipart(
                    MultiPart::mixed()
                        .multipart(alternative)
                        .singlepart(attachment_part(attachment)?),
                )?
            }
            (Some(attachment), false) => builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(email.body.clone()))
                    .singlepart(attachment_part(attachment)?),
            )?,
            (None, true) => builder.multipart(MultiPart::alternative_plain_html(
                html_to_plain(&email.body),
                email.body.clone(),
            ))?,
            (None, false) => builder.multipart(
                MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone())),
            )?,
        };

        Ok(message)
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.settings.server)?
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.username.clone(),
                self.settings.password.clone(),
            ))
            .build();

        tracing::debug!(
            "Sending \"{}\" to {} via {}:{}",
            email.subject,
            email.to,
            self.settings.server,
            self.settings.port
        );
        transport.send(message).await?;
        tracing::info!("Email sent to {}", email.to);

        Ok(())
    }
}
