//! # Subscription Package Catalog
//!
//! Package records and the headline KPIs shown above the package list.
//! Free packages (price 0) are listed but never counted in the KPIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SurveyError;

/// Shown when no paid package exists.
pub const NO_POPULAR_PACKAGE: &str = "N/A";

/// A subscription package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub name: String,
    /// Price in whole currency units.
    pub price: u64,
    pub description: String,
    pub features: Vec<String>,
    #[serde(default)]
    pub subscriber_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Package {
    /// Check the authoring invariants of the package.
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.name.trim().is_empty() {
            return Err(SurveyError::MissingField("name"));
        }
        if self.price == 0 {
            return Err(SurveyError::MissingField("price"));
        }
        if self.description.trim().is_empty() {
            return Err(SurveyError::MissingField("description"));
        }
        Ok(())
    }

    fn is_paid(&self) -> bool {
        self.price > 0
    }
}

/// Aggregate figures over paid packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackageKpi {
    pub total_subscribers: u64,
    pub most_popular_package: String,
    pub total_revenue: u64,
}

impl PackageKpi {
    /// Compute KPIs over the paid packages in `packages`.
    ///
    /// On equal subscriber counts the later package wins the
    /// "most popular" slot.
    pub fn compute(packages: &[Package]) -> Self {
        let mut total_subscribers = 0u64;
        let mut total_revenue = 0u64;
        let mut most_popular: Option<&Package> = None;

        for package in packages.iter().filter(|p| p.is_paid()) {
            total_subscribers = total_subscribers.saturating_add(package.subscriber_count);
            total_revenue = total_revenue
                .saturating_add(package.price.saturating_mul(package.subscriber_count));
            most_popular = match most_popular {
                Some(best) if best.subscriber_count > package.subscriber_count => Some(best),
                _ => Some(package),
            };
        }

        Self {
            total_subscribers,
            most_popular_package: most_popular
                .map(|p| p.name.clone())
                .unwrap_or_else(|| NO_POPULAR_PACKAGE.to_string()),
            total_revenue,
        }
    }
}
