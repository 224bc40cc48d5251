use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque storefront credentials, passed through to the backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of `POST /jobs/{job_id}/publish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub credentials: Credentials,
}

/// Result of publishing a job's items. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storefront {
    pub platform: String,
    pub posted_count: usize,
    pub failed_count: usize,
    pub total_potential_income: f64,
    pub listings: Vec<PostedListing>,
    #[serde(default)]
    pub failed_listings: Vec<FailedListing>,
    #[serde(default)]
    pub message: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedListing {
    pub title: String,
    pub original_price: f64,
    pub rental_price: f64,
    pub category: String,
    pub condition: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedListing {
    pub item_name: String,
    pub error: String,
}

/// Daily rental price derived from an item's resale estimate.
pub fn rental_price(estimated_price: f64) -> f64 {
    let per_day = (estimated_price / 30.0 * 100.0).round() / 100.0;
    per_day.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_price_has_one_unit_floor() {
        assert_eq!(rental_price(0.0), 1.0);
        assert_eq!(rental_price(15.0), 1.0);
        assert_eq!(rental_price(90.0), 3.0);
        assert_eq!(rental_price(100.0), 3.33);
    }

    #[test]
    fn debug_hides_password() {
        let creds = Credentials::new("seller@example.com", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("seller@example.com"));
        assert!(!shown.contains("hunter2"));
    }
}
