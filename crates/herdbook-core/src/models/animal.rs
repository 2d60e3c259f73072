//! Animal model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::herd::HerdId;

/// A unique identifier for an animal, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalId(Uuid);

impl AnimalId {
    /// Create a new unique animal ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for AnimalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AnimalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Sex of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    /// Stable string form, shared by the wire format and the local store.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
        }
    }
}

impl FromStr for Sex {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "female" => Ok(Self::Female),
            "male" => Ok(Self::Male),
            other => Err(Error::InvalidInput(format!("Unknown sex: {other}"))),
        }
    }
}

/// Lifecycle status of an animal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnimalStatus {
    #[default]
    Active,
    Sold,
    Died,
    Culled,
}

impl AnimalStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Died => "died",
            Self::Culled => "culled",
        }
    }
}

impl FromStr for AnimalStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "sold" => Ok(Self::Sold),
            "died" => Ok(Self::Died),
            "culled" => Ok(Self::Culled),
            other => Err(Error::InvalidInput(format!("Unknown status: {other}"))),
        }
    }
}

/// An animal in the herd book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    /// Unique identifier
    pub id: AnimalId,
    /// Ear tag, unique within the farm
    pub ear_tag: String,
    pub sex: Sex,
    pub breed: String,
    /// Date of birth (day resolution)
    pub date_of_birth: NaiveDate,
    /// Current herd, if assigned
    #[serde(default)]
    pub herd_id: Option<HerdId>,
    pub status: AnimalStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms), compared during sync arbitration
    pub updated_at: i64,
}

impl Animal {
    /// Create a new animal record.
    pub fn new(
        ear_tag: impl Into<String>,
        sex: Sex,
        breed: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Result<Self> {
        let ear_tag = ear_tag.into().trim().to_string();
        if ear_tag.is_empty() {
            return Err(Error::InvalidInput(
                "Animal ear_tag cannot be empty".to_string(),
            ));
        }

        let now = chrono::Utc::now().timestamp_millis();
        Ok(Self {
            id: AnimalId::new(),
            ear_tag,
            sex,
            breed: breed.into().trim().to_string(),
            date_of_birth,
            herd_id: None,
            status: AnimalStatus::Active,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 4, 12).unwrap()
    }

    #[test]
    fn test_animal_id_unique() {
        let id1 = AnimalId::new();
        let id2 = AnimalId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_animal_id_parse() {
        let id = AnimalId::new();
        let parsed: AnimalId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_animal_new() {
        let animal = Animal::new(" DE-0153 ", Sex::Female, "Angus", birth_date()).unwrap();
        assert_eq!(animal.ear_tag, "DE-0153");
        assert_eq!(animal.status, AnimalStatus::Active);
        assert!(animal.herd_id.is_none());
        assert_eq!(animal.created_at, animal.updated_at);
    }

    #[test]
    fn test_animal_rejects_empty_ear_tag() {
        assert!(Animal::new("  ", Sex::Male, "Angus", birth_date()).is_err());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let animal = Animal::new("A-1", Sex::Female, "Hereford", birth_date()).unwrap();
        let value = serde_json::to_value(&animal).unwrap();
        assert!(value.get("earTag").is_some());
        assert!(value.get("dateOfBirth").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["sex"], "female");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AnimalStatus::Active,
            AnimalStatus::Sold,
            AnimalStatus::Died,
            AnimalStatus::Culled,
        ] {
            let parsed: AnimalStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
