//! Email notifications
//!
//! Delivery goes through the [`Mailer`] trait: SMTP when `email` is
//! configured, otherwise the log. Failures are logged and swallowed for
//! request-path notifications; reminders report them to the caller so the
//! job can count them.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::models::{Booking, User};
use crate::services::admin_directory::AdminDirectory;
use crate::utils::OrgTimezone;

/// A plain-text email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short transport name for health output
    fn name(&self) -> &'static str;

    async fn send(&self, message: &EmailMessage) -> Result<()>;

    /// Whether the transport can currently deliver
    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// SMTP delivery through lettre's async Tokio transport
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .with_context(|| format!("Invalid SMTP host: {}", config.smtp_host))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        let from = config
            .from_address
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid from address: {}", config.from_address))?;

        Ok(Self {
            transport: builder.port(config.smtp_port).build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(message.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &message.to {
            let mailbox = recipient
                .parse::<Mailbox>()
                .with_context(|| format!("Invalid recipient address: {}", recipient))?;
            builder = builder.to(mailbox);
        }

        let email = builder
            .body(message.body.clone())
            .context("Failed to build email")?;

        self.transport
            .send(email)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }

    async fn check(&self) -> Result<()> {
        let reachable = self
            .transport
            .test_connection()
            .await
            .context("SMTP connection test failed")?;
        if !reachable {
            anyhow::bail!("SMTP server rejected the connection test");
        }
        Ok(())
    }
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to.join(", "),
            subject = %message.subject,
            "Email delivery disabled, message logged"
        );
        Ok(())
    }
}

/// Pick the transport for a configuration
pub fn mailer_from_config(config: Option<&EmailConfig>) -> Result<Arc<dyn Mailer>> {
    match config {
        Some(email) => Ok(Arc::new(SmtpMailer::new(email)?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

/// Booking lifecycle emails
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    admins: Arc<AdminDirectory>,
    timezone: OrgTimezone,
    org_name: String,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        admins: Arc<AdminDirectory>,
        timezone: OrgTimezone,
        org_name: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            admins,
            timezone,
            org_name: org_name.into(),
        }
    }

    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.mailer
    }

    /// Confirmation to the requester and a review request to the admin group
    pub async fn booking_submitted(&self, booking: &Booking) {
        let to_requester = EmailMessage {
            to: vec![booking.requester_email.clone()],
            subject: format!("[{}] Booking request received: {}", self.org_name, booking.room_name),
            body: format!(
                "Hello {},\n\nYour request to book {} was received and is waiting for review.\n\n{}",
                booking.requester_name,
                booking.room_name,
                self.booking_summary(booking)
            ),
        };
        self.deliver(&to_requester, "submitted").await;

        if self.admins.is_empty() {
            warn!(booking_id = %booking.id, "No administrator addresses to notify");
            return;
        }
        let to_admins = EmailMessage {
            to: self.admins.emails().to_vec(),
            subject: format!("[{}] New booking to review: {}", self.org_name, booking.room_name),
            body: format!(
                "A new booking request from {} <{}> needs review.\n\n{}",
                booking.requester_name,
                booking.requester_email,
                self.booking_summary(booking)
            ),
        };
        self.deliver(&to_admins, "submitted_admin").await;
    }

    pub async fn booking_approved(&self, booking: &Booking) {
        let message = EmailMessage {
            to: vec![booking.requester_email.clone()],
            subject: format!("[{}] Booking approved: {}", self.org_name, booking.room_name),
            body: format!(
                "Hello {},\n\nYour booking has been approved.\n\n{}",
                booking.requester_name,
                self.booking_summary(booking)
            ),
        };
        self.deliver(&message, "approved").await;
    }

    pub async fn booking_rejected(&self, booking: &Booking) {
        let message = EmailMessage {
            to: vec![booking.requester_email.clone()],
            subject: format!("[{}] Booking rejected: {}", self.org_name, booking.room_name),
            body: format!(
                "Hello {},\n\nYour booking request was not approved.\n\n{}",
                booking.requester_name,
                self.booking_summary(booking)
            ),
        };
        self.deliver(&message, "rejected").await;
    }

    /// Day-before reminder; the error is returned so the job can count it
    pub async fn booking_reminder(&self, booking: &Booking) -> Result<()> {
        let message = EmailMessage {
            to: vec![booking.requester_email.clone()],
            subject: format!("[{}] Reminder: {} tomorrow", self.org_name, booking.room_name),
            body: format!(
                "Hello {},\n\nThis is a reminder of your booking tomorrow.\n\n{}",
                booking.requester_name,
                self.booking_summary(booking)
            ),
        };
        self.mailer.send(&message).await
    }

    /// Reset code for an account; the code is the only credential needed
    pub async fn password_reset(&self, user: &User, token: &str, expires_at: DateTime<Utc>) {
        let message = EmailMessage {
            to: vec![user.email.clone()],
            subject: format!("[{}] Password reset", self.org_name),
            body: format!(
                "Hello {},\n\nA password reset was requested for your account ({}).\n\n\
                 Reset code: {}\nValid until: {} {}\n\n\
                 If you did not ask for this, ignore this email; your password stays unchanged.",
                user.display_name(),
                user.username,
                token,
                self.timezone.format_display_date(expires_at),
                self.timezone.format_hm(expires_at),
            ),
        };
        self.deliver(&message, "password_reset").await;
    }

    async fn deliver(&self, message: &EmailMessage, kind: &str) {
        if let Err(e) = self.mailer.send(message).await {
            warn!(kind, to = %message.to.join(", "), "Failed to send notification: {:#}", e);
        }
    }

    fn booking_summary(&self, booking: &Booking) -> String {
        format!(
            "Room: {}\nDate: {}\nTime: {} - {}\nGuests: {}\nPurpose: {}\nStatus: {}",
            booking.room_name,
            self.timezone.format_display_date(booking.starts_at),
            self.timezone.format_hm(booking.starts_at),
            self.timezone.format_hm(booking.ends_at),
            booking.guest_count,
            booking.purpose,
            booking.status
        )
    }
}
