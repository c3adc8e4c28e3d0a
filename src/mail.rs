//! Outbound mail
//!
//! Lead notifications are sent through the SMTP settings stored in the
//! database, looked up again on every send so the admin console can change
//! them without a restart.

use crate::db::Store;
use crate::error::{ApiResult, AppError};
use crate::models::{ConsultationForm, InquiryForm, SmtpSettings, ValuationForm};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{debug, info};

const MISSING: &str = "N/A";

/// A rendered notification email
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Notification {
    /// Render a heading followed by one line per field
    fn render(subject: impl Into<String>, heading: &str, fields: &[(&str, Option<&str>)]) -> Self {
        let mut text = format!("{}\n\n", heading);
        let mut html = format!("<h1>{}</h1>\n", escape_html(heading));
        for (label, value) in fields {
            let value = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(MISSING);
            text.push_str(&format!("{}: {}\n", label, value));
            html.push_str(&format!(
                "<p><strong>{}:</strong> {}</p>\n",
                escape_html(label),
                escape_html(value)
            ));
        }
        Self {
            subject: subject.into(),
            text,
            html,
        }
    }

    pub fn inquiry(form: &InquiryForm) -> Self {
        let subject = match form.property_ref() {
            Some(_) => "New Inquiry for Property",
            None => "New Inquiry for General",
        };
        Self::render(
            subject,
            "New Inquiry",
            &[
                ("Property ID", form.property_ref()),
                ("Name", Some(form.name.as_str())),
                ("Email", Some(form.email.as_str())),
                ("Phone", Some(form.phone.as_str())),
                ("Message", Some(form.message.as_str())),
            ],
        )
    }

    pub fn valuation(form: &ValuationForm) -> Self {
        Self::render(
            "New Valuation Request",
            "New Valuation Request",
            &[
                ("Name", Some(form.name.as_str())),
                ("Email", Some(form.email.as_str())),
                ("Phone", Some(form.phone.as_str())),
                ("Message", Some(form.message.as_str())),
            ],
        )
    }

    pub fn consultation(form: &ConsultationForm) -> Self {
        Self::render(
            "New Consultation Request",
            "New Consultation Request",
            &[
                ("Name", Some(form.name.as_str())),
                ("Email", Some(form.email.as_str())),
                ("Phone", Some(form.phone.as_str())),
                ("Budget", form.budget.as_deref()),
                ("Message", form.message.as_deref()),
            ],
        )
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Delivers notifications to the back office
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: &Notification) -> ApiResult<()>;
}

/// SMTP delivery using the active settings row. Mail goes to the configured
/// sender address.
pub struct SmtpMailer {
    store: Arc<dyn Store>,
}

impl SmtpMailer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

fn parse_address(value: &str) -> ApiResult<Address> {
    value
        .parse()
        .map_err(|e| AppError::Mail(format!("Invalid address '{}': {}", value, e)))
}

fn build_message(settings: &SmtpSettings, notification: &Notification) -> ApiResult<Message> {
    let address = parse_address(&settings.from_email)?;
    let from = Mailbox::new(Some(settings.from_name.clone()), address.clone());
    let to = Mailbox::new(None, address);

    Message::builder()
        .from(from)
        .to(to)
        .subject(notification.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            notification.text.clone(),
            notification.html.clone(),
        ))
        .map_err(|e| AppError::Mail(format!("Failed to build message: {}", e)))
}

fn build_transport(settings: &SmtpSettings) -> ApiResult<AsyncSmtpTransport<Tokio1Executor>> {
    // `secure` means implicit TLS; otherwise upgrade with STARTTLS
    let builder = if settings.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
    }
    .map_err(|e| AppError::Mail(format!("Invalid SMTP host '{}': {}", settings.host, e)))?;

    Ok(builder
        .port(settings.port)
        .credentials(Credentials::new(
            settings.username.clone(),
            settings.password.clone(),
        ))
        .build())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, notification: &Notification) -> ApiResult<()> {
        let settings = self
            .store
            .active_smtp_settings()
            .await?
            .ok_or_else(|| AppError::Mail("SMTP settings not configured".to_string()))?;

        let message = build_message(&settings, notification)?;
        let transport = build_transport(&settings)?;

        debug!("Sending '{}' via {}:{}", notification.subject, settings.host, settings.port);
        let response = transport
            .send(message)
            .await
            .map_err(|e| AppError::Mail(format!("SMTP delivery failed: {}", e)))?;

        info!("Notification sent: {} ({:?})", notification.subject, response.code());
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Records every attempt; can be told to fail
    #[derive(Default)]
    pub struct RecordingMailer {
        attempts: Mutex<Vec<Notification>>,
        fail: AtomicBool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            let mailer = Self::default();
            mailer.fail.store(true, Ordering::SeqCst);
            mailer
        }

        pub fn attempts(&self) -> Vec<Notification> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, notification: &Notification) -> ApiResult<()> {
            self.attempts.lock().unwrap().push(notification.clone());
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::Mail("connection refused".to_string()));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::SmtpSettingsForm;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn inquiry(property_id: Option<&str>) -> InquiryForm {
        InquiryForm {
            property_id: property_id.map(str::to_string),
            name: "Sara <admin>".to_string(),
            email: "sara@example.com".to_string(),
            phone: "+44 20 7000 0000".to_string(),
            message: "Is the flat still available?".to_string(),
        }
    }

    #[test]
    fn test_inquiry_notification_lists_every_field() {
        let n = Notification::inquiry(&inquiry(None));
        assert_eq!(n.subject, "New Inquiry for General");
        assert!(n.text.contains("Property ID: N/A\n"));
        assert!(n.text.contains("Name: Sara <admin>\n"));
        assert!(n.html.contains("<p><strong>Name:</strong> Sara &lt;admin&gt;</p>"));

        let n = Notification::inquiry(&inquiry(Some("42")));
        assert_eq!(n.subject, "New Inquiry for Property");
        assert!(n.text.contains("Property ID: 42\n"));
    }

    #[test]
    fn test_consultation_missing_fields_are_na() {
        let form = ConsultationForm {
            name: "Li".into(),
            email: "li@example.com".into(),
            phone: "12345".into(),
            budget: None,
            message: Some("   ".into()),
        };
        let n = Notification::consultation(&form);
        assert!(n.text.contains("Budget: N/A\n"));
        assert!(n.text.contains("Message: N/A\n"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_message_goes_to_sender_address() {
        let settings = SmtpSettings {
            id: Uuid::new_v4(),
            host: "smtp.skyvera.test".into(),
            port: 587,
            secure: false,
            username: "mailer".into(),
            password: "secret".into(),
            from_email: "office@skyvera.test".into(),
            from_name: "Skyvera".into(),
            is_active: true,
            created_at: Utc::now(),
        };
        let message = build_message(&settings, &Notification::inquiry(&inquiry(None))).unwrap();
        let headers = String::from_utf8(message.formatted()).unwrap();
        assert!(headers.contains("To: office@skyvera.test"));
        assert!(headers.contains("From: Skyvera <office@skyvera.test>"));
    }

    #[tokio::test]
    async fn test_smtp_mailer_without_settings_fails() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mailer = SmtpMailer::new(store.clone());
        let err = mailer.send(&Notification::inquiry(&inquiry(None))).await.unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));

        store
            .save_smtp_settings(&SmtpSettingsForm {
                host: "bad host name".into(),
                port: 2525,
                secure: false,
                username: "u".into(),
                password: "p".into(),
                from_email: "not-an-address".into(),
                from_name: "Skyvera".into(),
            })
            .await
            .unwrap();
        let err = mailer.send(&Notification::inquiry(&inquiry(None))).await.unwrap_err();
        assert!(matches!(err, AppError::Mail(_)));
    }
}
