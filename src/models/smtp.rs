//! Outbound mail transport settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A row of `smtp_settings`; the newest active row wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettings {
    pub id: Uuid,
    pub host: String,
    pub port: u16,
    /// Implicit TLS (port 465) rather than STARTTLS
    pub secure: bool,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to replace the active SMTP settings
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettingsForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Host is required"))]
    pub host: String,

    #[serde(default)]
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u32,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    #[validate(email(message = "Invalid sender email address"))]
    pub from_email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Sender name is required"))]
    pub from_name: String,
}

impl SmtpSettingsForm {
    /// Port after validation has bounded it
    pub fn port(&self) -> u16 {
        u16::try_from(self.port).unwrap_or(587)
    }
}
