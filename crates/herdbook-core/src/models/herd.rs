//! Herd and herd assignment models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::animal::AnimalId;

/// A unique identifier for a herd, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HerdId(Uuid);

impl HerdId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for HerdId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HerdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HerdId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A named group of animals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Herd {
    /// Unique identifier
    pub id: HerdId,
    /// Herd name, unique within the farm
    pub name: String,
    /// Display sort order
    pub sort_order: i64,
    /// Creation timestamp (Unix ms), compared during sync arbitration
    pub created_at: i64,
}

impl Herd {
    /// Create a new herd.
    pub fn new(name: impl Into<String>, sort_order: i64) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidInput("Herd name cannot be empty".to_string()));
        }

        Ok(Self {
            id: HerdId::new(),
            name,
            sort_order,
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// A unique identifier for a herd assignment, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HerdAssignmentId(Uuid);

impl HerdAssignmentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for HerdAssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HerdAssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HerdAssignmentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Membership of an animal in a herd over a date range.
///
/// `removed_at == None` means the assignment is current. The editing layer
/// keeps at most one current assignment per animal; the sync engine only
/// ever replaces assignments wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HerdAssignment {
    /// Unique identifier
    pub id: HerdAssignmentId,
    pub animal_id: AnimalId,
    pub herd_id: HerdId,
    /// Day the animal joined the herd
    pub assigned_at: NaiveDate,
    /// Day the animal left the herd, if it has
    #[serde(default)]
    pub removed_at: Option<NaiveDate>,
}

impl HerdAssignment {
    /// Create a new, currently-active assignment.
    #[must_use]
    pub fn new(animal_id: AnimalId, herd_id: HerdId, assigned_at: NaiveDate) -> Self {
        Self {
            id: HerdAssignmentId::new(),
            animal_id,
            herd_id,
            assigned_at,
            removed_at: None,
        }
    }

    /// Whether the animal is still in the herd.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.removed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_herd_new_trims_name() {
        let herd = Herd::new("  North paddock ", 2).unwrap();
        assert_eq!(herd.name, "North paddock");
        assert_eq!(herd.sort_order, 2);
    }

    #[test]
    fn test_herd_rejects_empty_name() {
        assert!(Herd::new("   ", 0).is_err());
    }

    #[test]
    fn test_assignment_is_current() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut assignment = HerdAssignment::new(AnimalId::new(), HerdId::new(), date);
        assert!(assignment.is_current());

        assignment.removed_at = NaiveDate::from_ymd_opt(2024, 9, 1);
        assert!(!assignment.is_current());
    }

    #[test]
    fn test_assignment_wire_format() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let assignment = HerdAssignment::new(AnimalId::new(), HerdId::new(), date);
        let value = serde_json::to_value(&assignment).unwrap();
        assert_eq!(value["assignedAt"], "2024-06-01");
        assert_eq!(value["removedAt"], serde_json::Value::Null);
    }
}
