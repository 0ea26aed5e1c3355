//! Administrator group
//!
//! Resolved once at startup and injected into the notifier. Accounts promoted
//! to admin after startup are picked up on the next restart.

use anyhow::Result;
use tracing::info;

use crate::config::AdminConfig;
use crate::db::{DbPool, UserRepository};

#[derive(Debug, Clone, Default)]
pub struct AdminDirectory {
    emails: Vec<String>,
}

impl AdminDirectory {
    /// Admin-role accounts plus configured extra addresses
    pub async fn load(pool: &DbPool, config: &AdminConfig) -> Result<Self> {
        let mut emails = UserRepository::new(pool).admin_emails().await?;
        emails.extend(config.notify_emails.iter().cloned());

        let directory = Self::from_emails(emails);
        info!(
            recipients = directory.emails.len(),
            "Administrator group resolved"
        );
        Ok(directory)
    }

    /// Build from explicit addresses, dropping blanks and case-insensitive duplicates
    pub fn from_emails(emails: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for email in emails {
            let email = email.trim().to_string();
            if email.is_empty() || unique.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
                continue;
            }
            unique.push(email);
        }
        Self { emails: unique }
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
