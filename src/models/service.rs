use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    PetCare,
    LawnCare,
    Tutoring,
    Cleaning,
    TechSupport,
    Delivery,
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 7] = [
        ServiceCategory::Tutoring,
        ServiceCategory::PetCare,
        ServiceCategory::LawnCare,
        ServiceCategory::Cleaning,
        ServiceCategory::TechSupport,
        ServiceCategory::Delivery,
        ServiceCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::PetCare => "pet_care",
            ServiceCategory::LawnCare => "lawn_care",
            ServiceCategory::Tutoring => "tutoring",
            ServiceCategory::Cleaning => "cleaning",
            ServiceCategory::TechSupport => "tech_support",
            ServiceCategory::Delivery => "delivery",
            ServiceCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Active,
    Paused,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Active => "active",
            ServiceStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ServiceStatus::Active),
            "paused" => Some(ServiceStatus::Paused),
            _ => None,
        }
    }
}

/// How a listing's price turns into a booking total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    PerHour,
    PerJob,
    PerService,
}

impl PricingModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::PerHour => "per_hour",
            PricingModel::PerJob => "per_job",
            PricingModel::PerService => "per_service",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "per_hour" => Some(PricingModel::PerHour),
            "per_job" => Some(PricingModel::PerJob),
            "per_service" => Some(PricingModel::PerService),
            _ => None,
        }
    }

    /// Hourly listings scale by `duration_minutes / 60`; flat listings charge the price as-is.
    pub fn total_price(&self, price: f64, duration_minutes: i32) -> f64 {
        match self {
            PricingModel::PerHour => price * (duration_minutes as f64 / 60.0),
            PricingModel::PerJob | PricingModel::PerService => price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub category: ServiceCategory,
    pub status: ServiceStatus,
    pub duration: i32,
    pub education: Option<String>,
    pub qualifications: Option<String>,
    pub address: Option<String>,
    pub pricing_model: PricingModel,
    pub banner_url: Option<String>,
    pub rating: Option<f64>,
    pub total_bookings: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip_deserializing)]
    pub provider_name: Option<String>,
}

impl Service {
    pub fn quote(&self) -> f64 {
        self.pricing_model.total_price(self.price, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_price_scales_with_duration() {
        assert_eq!(PricingModel::PerHour.total_price(20.0, 90), 30.0);
        assert_eq!(PricingModel::PerHour.total_price(20.0, 60), 20.0);
        assert_eq!(PricingModel::PerHour.total_price(12.0, 15), 3.0);
    }

    #[test]
    fn test_flat_price_ignores_duration() {
        assert_eq!(PricingModel::PerService.total_price(45.0, 90), 45.0);
        assert_eq!(PricingModel::PerJob.total_price(45.0, 240), 45.0);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(ServiceCategory::parse("lawn_care"), Some(ServiceCategory::LawnCare));
        assert_eq!(ServiceCategory::parse("babysitting"), None);
        for c in ServiceCategory::ALL {
            assert_eq!(ServiceCategory::parse(c.as_str()), Some(c));
        }
    }
}
