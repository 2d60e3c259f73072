//! Remote document store abstractions.
//!
//! The remote side of a sync is a per-account document hierarchy: named
//! collections of loosely-typed JSON documents addressed by record ID.
//! Typed records are converted at this boundary.

mod http;

pub use http::HttpRemoteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// A loosely-typed remote document.
pub type RemoteDocument = serde_json::Map<String, serde_json::Value>;

/// Soft cap on writes per batched commit.
pub const REMOTE_BATCH_LIMIT: usize = 500;

/// Named collections under one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Animals,
    Herds,
    HerdAssignments,
    BreedingEvents,
    CalvingEvents,
    HealthEvents,
    WeightRecords,
    Photos,
    Settings,
    Devices,
}

impl Collection {
    /// Wire name of the collection.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Animals => "animals",
            Self::Herds => "herds",
            Self::HerdAssignments => "herd_assignments",
            Self::BreedingEvents => "breeding_events",
            Self::CalvingEvents => "calving_events",
            Self::HealthEvents => "health_events",
            Self::WeightRecords => "weight_records",
            Self::Photos => "photos",
            Self::Settings => "settings",
            Self::Devices => "devices",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote document store operations consumed by the sync engine (async)
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Read an entire collection
    async fn fetch_collection(
        &self,
        user_id: &str,
        collection: Collection,
    ) -> Result<Vec<RemoteDocument>>;

    /// Commit a batch of upsert-by-ID writes atomically.
    ///
    /// Implementations reject batches larger than [`REMOTE_BATCH_LIMIT`].
    async fn commit_batch(
        &self,
        user_id: &str,
        collection: Collection,
        writes: Vec<(String, RemoteDocument)>,
    ) -> Result<()>;

    /// Upsert a single document by ID
    async fn upsert_document(
        &self,
        user_id: &str,
        collection: Collection,
        id: &str,
        document: RemoteDocument,
    ) -> Result<()>;
}

/// Serialize a record into its remote document form.
pub fn to_document<T: Serialize>(record: &T) -> Result<RemoteDocument> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::InvalidInput(format!(
            "record serialized to non-object JSON: {other}"
        ))),
    }
}

/// Convert a remote document into a typed record.
///
/// Fails when a required field is missing or malformed; callers skip such
/// documents individually.
pub fn from_document<T: DeserializeOwned>(document: RemoteDocument) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(document))?)
}

/// The document's record ID, when present.
#[must_use]
pub fn document_id(document: &RemoteDocument) -> Option<&str> {
    document.get("id").and_then(serde_json::Value::as_str)
}

/// Remote modification time used for conflict arbitration:
/// `updatedAt`, falling back to `createdAt`, defaulting to 0.
#[must_use]
pub fn remote_modified_at(document: &RemoteDocument) -> i64 {
    document
        .get("updatedAt")
        .and_then(serde_json::Value::as_i64)
        .or_else(|| document.get("createdAt").and_then(serde_json::Value::as_i64))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, Sex};
    use chrono::NaiveDate;

    #[test]
    fn test_collection_wire_names() {
        assert_eq!(Collection::HerdAssignments.as_str(), "herd_assignments");
        assert_eq!(Collection::WeightRecords.as_str(), "weight_records");
        assert_eq!(Collection::Devices.to_string(), "devices");
    }

    #[test]
    fn test_record_document_round_trip() {
        let animal = Animal::new(
            "RT-1",
            Sex::Female,
            "Angus",
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        )
        .unwrap();

        let document = to_document(&animal).unwrap();
        assert_eq!(document_id(&document), Some(animal.id.as_str().as_str()));

        let back: Animal = from_document(document).unwrap();
        assert_eq!(back, animal);
    }

    #[test]
    fn test_from_document_rejects_missing_required_field() {
        let mut document = RemoteDocument::new();
        document.insert("id".to_string(), serde_json::json!("not-even-a-uuid"));
        assert!(from_document::<Animal>(document).is_err());
    }

    #[test]
    fn test_remote_modified_at_fallback_chain() {
        let mut document = RemoteDocument::new();
        assert_eq!(remote_modified_at(&document), 0);

        document.insert("createdAt".to_string(), serde_json::json!(50));
        assert_eq!(remote_modified_at(&document), 50);

        document.insert("updatedAt".to_string(), serde_json::json!(90));
        assert_eq!(remote_modified_at(&document), 90);
    }
}
