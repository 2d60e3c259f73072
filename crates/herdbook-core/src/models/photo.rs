//! Photo model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::is_http_url;

use super::animal::AnimalId;

/// A unique identifier for a photo, using UUID v7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(Uuid);

impl PhotoId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PhotoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Camera angle tag for conformation photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhotoAngle {
    Front,
    Left,
    Right,
    Rear,
    #[default]
    Other,
}

impl PhotoAngle {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Left => "left",
            Self::Right => "right",
            Self::Rear => "rear",
            Self::Other => "other",
        }
    }
}

impl FromStr for PhotoAngle {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "front" => Ok(Self::Front),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "rear" => Ok(Self::Rear),
            "other" => Ok(Self::Other),
            other => Err(Error::InvalidInput(format!("Unknown photo angle: {other}"))),
        }
    }
}

/// A photo of an animal.
///
/// `location` is either a device-local file path (not yet uploaded) or a
/// durable https URL in the farm's blob namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Unique identifier
    pub id: PhotoId,
    pub animal_id: AnimalId,
    pub angle: PhotoAngle,
    /// Local file path or durable remote URL
    pub location: String,
    /// Capture timestamp (Unix ms)
    pub captured_at: i64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Photo {
    /// Register a photo captured on this device.
    pub fn new(animal_id: AnimalId, angle: PhotoAngle, location: impl Into<String>) -> Result<Self> {
        let location = location.into().trim().to_string();
        if location.is_empty() {
            return Err(Error::InvalidInput(
                "Photo location cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: PhotoId::new(),
            animal_id,
            angle,
            location,
            captured_at: chrono::Utc::now().timestamp_millis(),
            latitude: None,
            longitude: None,
        })
    }

    /// Whether the photo already lives at a durable remote URL.
    #[must_use]
    pub fn has_remote_location(&self) -> bool {
        is_http_url(&self.location)
    }
}
