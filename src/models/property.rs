//! Property listing models and DTOs

use crate::error::{ApiResult, AppError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Status value for listings that are for sale
pub const FOR_SALE_STATUS: &str = "Buy";

/// Form sentinel meaning "no secondary status"
pub const NO_SECONDARY_STATUS: &str = "none";

/// Top-level market segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Dubai,
    London,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Dubai => "Dubai",
            Region::London => "London",
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Region {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dubai" => Ok(Region::Dubai),
            "London" => Ok(Region::London),
            other => Err(AppError::BadRequest(format!("Unknown region: {}", other))),
        }
    }
}

/// A listing as stored in the `properties` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub region: Region,
    #[serde(rename = "type")]
    pub property_type: String,
    pub status: String,
    /// Secondary status, only set for Dubai listings for sale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dubai_status: Option<String>,
    pub image_ids: Vec<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Normalised write shape for inserts and updates
#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub region: Region,
    pub property_type: String,
    pub status: String,
    pub dubai_status: Option<String>,
    pub image_ids: Vec<String>,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub area: f64,
}

impl NewProperty {
    /// Materialise the record the store will hold
    pub fn into_property(self, id: Uuid, created_at: Option<DateTime<Utc>>) -> Property {
        Property {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            location: self.location,
            region: self.region,
            property_type: self.property_type,
            status: self.status,
            dubai_status: self.dubai_status,
            image_ids: self.image_ids,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area: self.area,
            created_at,
        }
    }
}

/// Keep the secondary status only for Dubai listings that are for sale.
pub fn normalize_secondary_status(
    region: Region,
    status: &str,
    dubai_status: Option<&str>,
) -> Option<String> {
    if region != Region::Dubai || status != FOR_SALE_STATUS {
        return None;
    }
    dubai_status
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != NO_SECONDARY_STATUS)
        .map(str::to_string)
}

/// Property create/update payload, shared by every write path
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PropertyForm {
    #[serde(default)]
    #[validate(length(min = 3, message = "Title must be at least 3 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,

    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than 0"))]
    pub price: f64,

    #[serde(default)]
    #[validate(length(min = 3, message = "Location is required"))]
    pub location: String,

    #[serde(default)]
    #[validate(custom(function = "validate_region"))]
    pub region: String,

    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "Property type is required"))]
    pub property_type: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,

    #[serde(default)]
    pub dubai_status: Option<String>,

    #[serde(default, deserialize_with = "deserialize_image_ids")]
    #[validate(length(min = 1, message = "At least one image is required"))]
    pub image_ids: Vec<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Bedrooms cannot be negative"))]
    pub bedrooms: i32,

    #[serde(default)]
    #[validate(range(min = 0, message = "Bathrooms cannot be negative"))]
    pub bathrooms: i32,

    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, message = "Area must be greater than 0"))]
    pub area: f64,
}

impl PropertyForm {
    /// Validate and normalise into the write shape
    pub fn validated(self) -> ApiResult<NewProperty> {
        self.validate()?;
        let region: Region = self.region.parse()?;
        let dubai_status =
            normalize_secondary_status(region, &self.status, self.dubai_status.as_deref());

        Ok(NewProperty {
            title: self.title,
            description: self.description,
            price: self.price,
            location: self.location,
            region,
            property_type: self.property_type,
            status: self.status,
            dubai_status,
            image_ids: self.image_ids,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area: self.area,
        })
    }
}

fn validate_region(region: &str) -> Result<(), ValidationError> {
    if region.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Region is required".into());
        return Err(err);
    }
    if region.parse::<Region>().is_err() {
        let mut err = ValidationError::new("invalid_region");
        err.message = Some("Region must be Dubai or London".into());
        return Err(err);
    }
    Ok(())
}

/// Image ids arrive either as a list or as a comma-separated string
fn deserialize_image_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ImageIds {
        List(Vec<String>),
        Csv(String),
    }

    let raw = match Option::<ImageIds>::deserialize(deserializer)? {
        Some(ImageIds::List(ids)) => ids,
        Some(ImageIds::Csv(csv)) => csv.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };

    Ok(raw
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}

/// A resolved image reference for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyImage {
    pub id: String,
    pub url: String,
}

/// Property with its image ids resolved to URLs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyView {
    #[serde(flatten)]
    pub property: Property,
    pub images: Vec<PropertyImage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn form_json() -> serde_json::Value {
        json!({
            "title": "Marina Heights",
            "description": "Two bedroom apartment with marina views",
            "price": 1_250_000.0,
            "location": "Dubai Marina",
            "region": "Dubai",
            "type": "Apartment",
            "status": "Buy",
            "dubaiStatus": "Off-plan",
            "imageIds": "img-1, img-2,,",
            "bedrooms": 2,
            "bathrooms": 2,
            "area": 1180.5
        })
    }

    #[test]
    fn test_valid_form_normalises() {
        let form: PropertyForm = serde_json::from_value(form_json()).unwrap();
        let property = form.validated().unwrap();

        assert_eq!(property.region, Region::Dubai);
        assert_eq!(property.image_ids, vec!["img-1".to_string(), "img-2".to_string()]);
        assert_eq!(property.dubai_status.as_deref(), Some("Off-plan"));
    }

    #[test]
    fn test_image_ids_accept_list() {
        let mut value = form_json();
        value["imageIds"] = json!(["a", " ", "b", "a"]);
        let form: PropertyForm = serde_json::from_value(value).unwrap();
        assert_eq!(form.image_ids, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_secondary_status_cleared_outside_dubai_sale() {
        assert_eq!(normalize_secondary_status(Region::London, "Buy", Some("Ready")), None);
        assert_eq!(normalize_secondary_status(Region::Dubai, "Rent", Some("Ready")), None);
        assert_eq!(normalize_secondary_status(Region::Dubai, "Buy", Some("none")), None);
        assert_eq!(normalize_secondary_status(Region::Dubai, "Buy", Some("  ")), None);
        assert_eq!(
            normalize_secondary_status(Region::Dubai, "Buy", Some("Ready")),
            Some("Ready".to_string())
        );
    }

    #[test]
    fn test_invalid_form_reports_every_field() {
        let form: PropertyForm = serde_json::from_value(json!({
            "title": "ab",
            "description": "short",
            "price": 0,
            "location": "x",
            "region": "Paris",
            "bedrooms": -1,
            "area": 0
        }))
        .unwrap();

        let err = form.validated().unwrap_err();
        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        for field in ["title", "description", "price", "location", "region", "status", "bedrooms", "area"] {
            assert!(fields.get(field).is_some(), "missing error for {}", field);
        }
        assert!(fields.get("property_type").is_some() || fields.get("type").is_some());
        assert!(fields.get("image_ids").is_some() || fields.get("imageIds").is_some());
        assert!(fields.get("bathrooms").is_none());
    }

    #[test]
    fn test_property_serializes_type_field() {
        let property = NewProperty {
            title: "Flat".into(),
            description: "A flat in Chelsea".into(),
            price: 900_000.0,
            location: "Chelsea".into(),
            region: Region::London,
            property_type: "Apartment".into(),
            status: "Rent".into(),
            dubai_status: None,
            image_ids: vec!["x".into()],
            bedrooms: 1,
            bathrooms: 1,
            area: 540.0,
        }
        .into_property(Uuid::nil(), None);

        let value = serde_json::to_value(&property).unwrap();
        assert_eq!(value["type"], "Apartment");
        assert_eq!(value["region"], "London");
        assert!(value.get("dubaiStatus").is_none());
    }
}
