//! Breeding and calving event models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

use super::animal::{AnimalId, Sex};

/// A unique identifier for a breeding event, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreedingEventId(Uuid);

impl BreedingEventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for BreedingEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BreedingEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BreedingEventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How a breeding was performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreedingMethod {
    Natural,
    ArtificialInsemination,
    EmbryoTransfer,
}

impl BreedingMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::ArtificialInsemination => "artificial_insemination",
            Self::EmbryoTransfer => "embryo_transfer",
        }
    }
}

impl FromStr for BreedingMethod {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "natural" => Ok(Self::Natural),
            "artificial_insemination" => Ok(Self::ArtificialInsemination),
            "embryo_transfer" => Ok(Self::EmbryoTransfer),
            other => Err(Error::InvalidInput(format!(
                "Unknown breeding method: {other}"
            ))),
        }
    }
}

/// Outcome of a pregnancy check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PregCheckResult {
    Pregnant,
    Open,
    Recheck,
}

impl PregCheckResult {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pregnant => "pregnant",
            Self::Open => "open",
            Self::Recheck => "recheck",
        }
    }
}

impl FromStr for PregCheckResult {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pregnant" => Ok(Self::Pregnant),
            "open" => Ok(Self::Open),
            "recheck" => Ok(Self::Recheck),
            other => Err(Error::InvalidInput(format!(
                "Unknown pregnancy check result: {other}"
            ))),
        }
    }
}

/// A service (breeding) performed on a dam
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedingEvent {
    /// Unique identifier
    pub id: BreedingEventId,
    /// The dam that was bred
    pub animal_id: AnimalId,
    /// Candidate sires (more than one when the exact sire is unknown)
    #[serde(default)]
    pub sire_ids: Vec<AnimalId>,
    pub method: BreedingMethod,
    pub service_date: NaiveDate,
    #[serde(default)]
    pub preg_check_date: Option<NaiveDate>,
    #[serde(default)]
    pub preg_check_result: Option<PregCheckResult>,
    /// Creation timestamp (Unix ms), compared during sync arbitration
    pub created_at: i64,
}

impl BreedingEvent {
    /// Record a new breeding.
    #[must_use]
    pub fn new(animal_id: AnimalId, method: BreedingMethod, service_date: NaiveDate) -> Self {
        Self {
            id: BreedingEventId::new(),
            animal_id,
            sire_ids: Vec::new(),
            method,
            service_date,
            preg_check_date: None,
            preg_check_result: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A unique identifier for a calving event, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalvingEventId(Uuid);

impl CalvingEventId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CalvingEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CalvingEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CalvingEventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The calving that closed out a breeding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalvingEvent {
    /// Unique identifier
    pub id: CalvingEventId,
    /// The dam that calved
    pub dam_id: AnimalId,
    /// The calf's animal record, once it has been registered
    #[serde(default)]
    pub calf_id: Option<AnimalId>,
    /// The breeding this calving originated from
    pub breeding_event_id: BreedingEventId,
    pub calving_date: NaiveDate,
    /// Whether calving assistance was required
    pub assisted: bool,
    #[serde(default)]
    pub calf_sex: Option<Sex>,
    /// Birth weight in kilograms
    #[serde(default)]
    pub birth_weight_kg: Option<f64>,
}

impl CalvingEvent {
    /// Record a new calving.
    #[must_use]
    pub fn new(
        dam_id: AnimalId,
        breeding_event_id: BreedingEventId,
        calving_date: NaiveDate,
        assisted: bool,
    ) -> Self {
        Self {
            id: CalvingEventId::new(),
            dam_id,
            calf_id: None,
            breeding_event_id,
            calving_date,
            assisted,
            calf_sex: None,
            birth_weight_kg: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()
    }

    #[test]
    fn test_breeding_event_new() {
        let event = BreedingEvent::new(AnimalId::new(), BreedingMethod::Natural, service_date());
        assert!(event.sire_ids.is_empty());
        assert!(event.preg_check_date.is_none());
        assert!(event.created_at > 0);
    }

    #[test]
    fn test_breeding_method_round_trip() {
        for method in [
            BreedingMethod::Natural,
            BreedingMethod::ArtificialInsemination,
            BreedingMethod::EmbryoTransfer,
        ] {
            let parsed: BreedingMethod = method.as_str().parse().unwrap();
            assert_eq!(parsed, method);
        }
    }

    #[test]
    fn test_breeding_wire_defaults() {
        // A remote doc without sireIds or check fields still parses.
        let dam = AnimalId::new();
        let json = serde_json::json!({
            "id": BreedingEventId::new(),
            "animalId": dam,
            "method": "artificial_insemination",
            "serviceDate": "2025-02-14",
            "createdAt": 1_700_000_000_000_i64,
        });
        let event: BreedingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.animal_id, dam);
        assert!(event.sire_ids.is_empty());
        assert!(event.preg_check_result.is_none());
    }

    #[test]
    fn test_calving_event_new() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 20).unwrap();
        let event = CalvingEvent::new(AnimalId::new(), BreedingEventId::new(), date, true);
        assert!(event.assisted);
        assert!(event.calf_id.is_none());
        assert!(event.birth_weight_kg.is_none());
    }
}
