use base64::Engine;
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One candidate item extracted from an uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExtractedItem {
    #[garde(length(min = 1, max = 200))]
    pub name: String,

    #[garde(length(min = 1, max = 100))]
    pub category: String,

    #[garde(length(min = 1, max = 100))]
    pub condition: String,

    #[garde(range(min = 0.0))]
    pub estimated_price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: Option<f64>,

    /// Base64-encoded preview frame, optionally as a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub frame_data: Option<String>,

    /// Offset into the source video, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub timestamp: Option<f64>,
}

impl ExtractedItem {
    /// Apply every field present in `patch`.
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(condition) = &patch.condition {
            self.condition = condition.clone();
        }
        if let Some(price) = patch.estimated_price {
            self.estimated_price = price;
        }
        if let Some(confidence) = patch.confidence {
            self.confidence = Some(confidence);
        }
    }

    /// Decode the preview frame, if the item carries one.
    pub fn preview_bytes(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        let Some(raw) = self.frame_data.as_deref() else {
            return Ok(None);
        };
        let encoded = match raw.split_once(";base64,") {
            Some((_, data)) => data,
            None => raw,
        };
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map(Some)
    }
}

/// Partial update of an [`ExtractedItem`]; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 100))]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1, max = 100))]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 0.0))]
    pub estimated_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: Option<f64>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == ItemPatch::default()
    }

    /// Build a single-field patch, checking that the value kind fits the field.
    pub fn single(field: ItemField, value: FieldValue) -> Result<Self, FieldError> {
        let mut patch = ItemPatch::default();
        match (field, value) {
            (ItemField::Name, FieldValue::Text(v)) => patch.name = Some(v),
            (ItemField::Category, FieldValue::Text(v)) => patch.category = Some(v),
            (ItemField::Condition, FieldValue::Text(v)) => patch.condition = Some(v),
            (ItemField::EstimatedPrice, FieldValue::Number(v)) => patch.estimated_price = Some(v),
            (ItemField::Confidence, FieldValue::Number(v)) => patch.confidence = Some(v),
            (field, value) => return Err(FieldError::WrongKind { field, value }),
        }
        Ok(patch)
    }
}

/// Editable fields of an extracted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ItemField {
    Name,
    Category,
    Condition,
    EstimatedPrice,
    Confidence,
}

impl ItemField {
    /// Interpret a raw string as a value for this field.
    pub fn parse_value(self, raw: &str) -> Result<FieldValue, FieldError> {
        match self {
            ItemField::Name | ItemField::Category | ItemField::Condition => {
                Ok(FieldValue::Text(raw.to_string()))
            }
            ItemField::EstimatedPrice | ItemField::Confidence => raw
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|_| FieldError::NotANumber {
                    field: self,
                    raw: raw.to_string(),
                }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Field {field} does not accept {value:?}")]
    WrongKind { field: ItemField, value: FieldValue },

    #[error("Field {field} expects a number, got {raw:?}")]
    NotANumber { field: ItemField, raw: String },
}
