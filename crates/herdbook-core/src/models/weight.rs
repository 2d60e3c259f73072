//! Weight record model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::animal::AnimalId;

/// A unique identifier for a weight record, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightRecordId(Uuid);

impl WeightRecordId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for WeightRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WeightRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WeightRecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A single weighing of an animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightRecord {
    /// Unique identifier
    pub id: WeightRecordId,
    pub animal_id: AnimalId,
    pub date: NaiveDate,
    /// Weight in kilograms
    pub weight_kg: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl WeightRecord {
    /// Record a new weighing.
    pub fn new(animal_id: AnimalId, date: NaiveDate, weight_kg: f64) -> Result<Self> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(Error::InvalidInput(
                "Weight must be a positive number of kilograms".to_string(),
            ));
        }

        Ok(Self {
            id: WeightRecordId::new(),
            animal_id,
            date,
            weight_kg,
            note: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weigh_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn test_weight_record_new() {
        let record = WeightRecord::new(AnimalId::new(), weigh_date(), 412.5).unwrap();
        assert!((record.weight_kg - 412.5).abs() < f64::EPSILON);
        assert!(record.note.is_none());
    }

    #[test]
    fn test_weight_record_rejects_nonpositive() {
        assert!(WeightRecord::new(AnimalId::new(), weigh_date(), 0.0).is_err());
        assert!(WeightRecord::new(AnimalId::new(), weigh_date(), -10.0).is_err());
        assert!(WeightRecord::new(AnimalId::new(), weigh_date(), f64::NAN).is_err());
    }
}
