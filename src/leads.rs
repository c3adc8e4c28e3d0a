//! Lead actions
//!
//! Each submission is validated, persisted, then announced by email. The
//! email is best effort: once the row is written the submission has
//! succeeded, whatever happens to the notification.

use crate::db::Store;
use crate::error::ApiResult;
use crate::mail::{Mailer, Notification};
use crate::models::{
    Consultation, ConsultationForm, Inquiry, InquiryForm, Valuation, ValuationForm,
};
use tracing::{info, warn};
use validator::Validate;

/// Single notification attempt; failures are logged and dropped
async fn notify(mailer: &dyn Mailer, notification: Notification) {
    if let Err(e) = mailer.send(&notification).await {
        warn!("Lead notification '{}' not delivered: {}", notification.subject, e);
    }
}

pub async fn submit_inquiry(
    store: &dyn Store,
    mailer: &dyn Mailer,
    form: InquiryForm,
) -> ApiResult<Inquiry> {
    form.validate()?;
    let inquiry = store.insert_inquiry(&form).await?;
    info!(
        "Inquiry {} received (property: {})",
        inquiry.id,
        inquiry.property_id.as_deref().unwrap_or("general")
    );
    notify(mailer, Notification::inquiry(&form)).await;
    Ok(inquiry)
}

pub async fn submit_valuation(
    store: &dyn Store,
    mailer: &dyn Mailer,
    form: ValuationForm,
) -> ApiResult<Valuation> {
    form.validate()?;
    let valuation = store.insert_valuation(&form).await?;
    info!("Valuation request {} received", valuation.id);
    notify(mailer, Notification::valuation(&form)).await;
    Ok(valuation)
}

pub async fn submit_consultation(
    store: &dyn Store,
    mailer: &dyn Mailer,
    form: ConsultationForm,
) -> ApiResult<Consultation> {
    form.validate()?;
    let consultation = store.insert_consultation(&form).await?;
    info!("Consultation request {} received", consultation.id);
    notify(mailer, Notification::consultation(&form)).await;
    Ok(consultation)
}
