//! Health event model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

use super::animal::AnimalId;

/// A unique identifier for a health event, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HealthEventId(Uuid);

impl HealthEventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for HealthEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HealthEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HealthEventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Category of a health event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthEventType {
    Vaccination,
    Treatment,
    Illness,
    Injury,
    Deworming,
}

impl HealthEventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vaccination => "vaccination",
            Self::Treatment => "treatment",
            Self::Illness => "illness",
            Self::Injury => "injury",
            Self::Deworming => "deworming",
        }
    }
}

impl FromStr for HealthEventType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "vaccination" => Ok(Self::Vaccination),
            "treatment" => Ok(Self::Treatment),
            "illness" => Ok(Self::Illness),
            "injury" => Ok(Self::Injury),
            "deworming" => Ok(Self::Deworming),
            other => Err(Error::InvalidInput(format!(
                "Unknown health event type: {other}"
            ))),
        }
    }
}

/// A treatment, vaccination, or observed condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEvent {
    /// Unique identifier
    pub id: HealthEventId,
    pub animal_id: AnimalId,
    pub event_type: HealthEventType,
    pub date: NaiveDate,
    /// Product administered, if any
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub dosage: Option<String>,
    /// Last day of the withdrawal period for milk/meat
    #[serde(default)]
    pub withdrawal_end: Option<NaiveDate>,
}

impl HealthEvent {
    /// Record a new health event.
    #[must_use]
    pub fn new(animal_id: AnimalId, event_type: HealthEventType, date: NaiveDate) -> Self {
        Self {
            id: HealthEventId::new(),
            animal_id,
            event_type,
            date,
            product: None,
            dosage: None,
            withdrawal_end: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_event_new() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let event = HealthEvent::new(AnimalId::new(), HealthEventType::Vaccination, date);
        assert_eq!(event.event_type, HealthEventType::Vaccination);
        assert!(event.product.is_none());
        assert!(event.withdrawal_end.is_none());
    }

    #[test]
    fn test_event_type_round_trip() {
        for event_type in [
            HealthEventType::Vaccination,
            HealthEventType::Treatment,
            HealthEventType::Illness,
            HealthEventType::Injury,
            HealthEventType::Deworming,
        ] {
            let parsed: HealthEventType = event_type.as_str().parse().unwrap();
            assert_eq!(parsed, event_type);
        }
    }
}
