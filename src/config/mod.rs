//! Configuration management
//!
//! YAML-based configuration with:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Organizational time zone and booking rules

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::time::parse_utc_offset;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub organization: OrganizationConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    /// SMTP delivery; notifications are only logged when absent
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub reminders: ReminderConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// TLS/HTTPS configuration (if not set, server runs HTTP)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
    /// Allow cross-origin requests (needed when the frontend is hosted elsewhere)
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_file: PathBuf,
    /// Path to TLS private key file (PEM format)
    pub key_file: PathBuf,
    /// Minimum TLS version (1.2 or 1.3)
    #[serde(default = "default_min_tls_version")]
    pub min_version: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_enabled() -> bool {
    true
}

fn default_min_tls_version() -> String {
    "1.3".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_hours: u64,
    #[serde(default = "default_refresh_expiry")]
    pub refresh_token_expiry_days: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    /// Lifetime of an emailed password reset code
    #[serde(default = "default_password_reset_expiry")]
    pub password_reset_expiry_minutes: i64,
}

fn default_token_expiry() -> u64 {
    24
}

fn default_refresh_expiry() -> u64 {
    7
}

fn default_password_min_length() -> usize {
    8
}

fn default_password_reset_expiry() -> i64 {
    60
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Log output target (console, file or both)
    #[serde(default)]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file" or "both")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Console,
    File,
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/smartspace")
}

fn default_log_prefix() -> String {
    "smartspace".to_string()
}

fn default_log_rotation() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

/// Organization-wide settings
///
/// Every day and month boundary, and every wall-clock time shown to users,
/// is computed in this fixed offset regardless of server or client zone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrganizationConfig {
    #[serde(default = "default_org_name")]
    pub name: String,
    /// Informational zone name shown in responses
    #[serde(default = "default_timezone_name")]
    pub timezone_name: String,
    /// Fixed UTC offset, e.g. "+07:00"
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_org_name() -> String {
    "SmartSpace".to_string()
}

fn default_timezone_name() -> String {
    "Asia/Jakarta".to_string()
}

fn default_utc_offset() -> String {
    "+07:00".to_string()
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            name: default_org_name(),
            timezone_name: default_timezone_name(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl OrganizationConfig {
    /// Parsed organizational offset
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Booking submission rules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfig {
    /// How far in the past a start may lie, to absorb form submission delay
    #[serde(default = "default_past_grace_minutes")]
    pub past_grace_minutes: i64,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
    /// Lowercase extensions without the dot
    #[serde(default = "default_document_extensions")]
    pub document_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub require_document: bool,
    /// Re-run the conflict check when a status change makes a booking reserve its slot
    #[serde(default = "default_true")]
    pub recheck_on_approval: bool,
    /// Upper bound on waiting for a room's write lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_past_grace_minutes() -> i64 {
    5
}

fn default_max_document_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_document_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "doc".to_string(), "docx".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            past_grace_minutes: default_past_grace_minutes(),
            max_document_bytes: default_max_document_bytes(),
            document_extensions: default_document_extensions(),
            require_document: true,
            recheck_on_approval: true,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// SMTP configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    pub from_address: String,
    #[serde(default = "default_true")]
    pub starttls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

/// H-1 reminder job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReminderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Six-field cron expression (sec min hour day month weekday) in local time
    #[serde(default = "default_reminder_cron")]
    pub cron: String,
}

fn default_reminder_cron() -> String {
    "0 0 7 * * *".to_string()
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_reminder_cron(),
        }
    }
}

/// Administrator group settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AdminConfig {
    /// Addresses notified in addition to users holding the admin role
    #[serde(default)]
    pub notify_emails: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                tls: None,
                cors_enabled: default_cors_enabled(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production-minimum-32-characters-long".to_string(),
                token_expiry_hours: default_token_expiry(),
                refresh_token_expiry_days: default_refresh_expiry(),
                password_min_length: default_password_min_length(),
                password_reset_expiry_minutes: default_password_reset_expiry(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/smartspace.db".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            logging: LoggingConfig::default(),
            organization: OrganizationConfig::default(),
            booking: BookingConfig::default(),
            email: None,
            reminders: ReminderConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("SMARTSPACE_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without applying overrides
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/smartspace/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("smartspace/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SMARTSPACE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SMARTSPACE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SMARTSPACE_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }

        if let Ok(offset) = std::env::var("SMARTSPACE_UTC_OFFSET") {
            self.organization.utc_offset = offset;
        }

        if let Ok(host) = std::env::var("SMTP_HOST") {
            let email = self.email.get_or_insert_with(|| EmailConfig {
                smtp_host: host.clone(),
                smtp_port: default_smtp_port(),
                smtp_username: None,
                smtp_password: None,
                from_address: "SmartSpace <noreply@localhost>".to_string(),
                starttls: true,
            });
            email.smtp_host = host;
        }
        if let Some(ref mut email) = self.email {
            if let Ok(username) = std::env::var("SMTP_USERNAME") {
                email.smtp_username = Some(username);
            }
            if let Ok(password) = std::env::var("SMTP_PASSWORD") {
                email.smtp_password = Some(password);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("JWT secret must be at least 32 characters long");
        }

        if self.auth.password_reset_expiry_minutes <= 0 {
            anyhow::bail!("auth.password_reset_expiry_minutes must be greater than 0");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        self.organization
            .offset()
            .context("Invalid organization.utc_offset")?;

        if self.booking.lock_timeout_ms == 0 {
            anyhow::bail!("booking.lock_timeout_ms must be greater than 0");
        }

        if self.reminders.enabled {
            crate::services::scheduler::validate_cron_expression(&self.reminders.cron)
                .map_err(|e| anyhow::anyhow!("reminders.cron: {}", e))?;
        }

        if let Some(ref tls) = self.server.tls {
            if !tls.cert_file.exists() {
                anyhow::bail!("TLS certificate file not found: {:?}", tls.cert_file);
            }
            if !tls.key_file.exists() {
                anyhow::bail!("TLS key file not found: {:?}", tls.key_file);
            }
            if tls.min_version != "1.2" && tls.min_version != "1.3" {
                anyhow::bail!(
                    "Invalid TLS minimum version: {}. Must be '1.2' or '1.3'",
                    tls.min_version
                );
            }
        }

        Ok(())
    }
}
