//! Lead capture models: inquiries, valuations and consultations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    /// Stored unchecked; may point at a deleted property
    pub property_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub expected_value: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub budget: Option<String>,
    pub message: String,
    pub submitted_at: DateTime<Utc>,
}

/// Property inquiry form
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InquiryForm {
    #[serde(default)]
    pub property_id: Option<String>,

    #[serde(default)]
    #[validate(length(min = 2, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 5, message = "Phone number is required"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Message must be at least 10 characters"))]
    pub message: String,
}

impl InquiryForm {
    /// Blank property ids mean a general inquiry
    pub fn property_ref(&self) -> Option<&str> {
        self.property_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Valuation request form
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValuationForm {
    #[serde(default)]
    #[validate(length(min = 2, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 5, message = "Phone number is required"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Message must be at least 10 characters"))]
    pub message: String,
}

/// Consultation booking form
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationForm {
    #[serde(default)]
    #[validate(length(min = 2, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 5, message = "Phone number is required"))]
    pub phone: String,

    #[serde(default)]
    pub budget: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}
