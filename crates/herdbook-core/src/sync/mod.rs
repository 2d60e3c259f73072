//! Cloud synchronization engine.
//!
//! `SyncEngine::sync_now` reconciles the device's records with the farm's
//! shared remote store. It runs settings pull, upload, download+merge,
//! local replacement, and device registration strictly in that order,
//! each stage awaited before the next.

mod device;
mod merge;
mod settings;

pub use device::DeviceProfile;
pub use merge::{merge_arbitrated, merge_remote_authoritative, TimestampArbitrated};

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::AuthProvider;
use crate::db::{FarmSnapshot, LocalStore};
use crate::error::Error as CoreError;
use crate::remote::{
    document_id, from_document, remote_modified_at, to_document, Collection, RemoteStore,
    REMOTE_BATCH_LIMIT,
};
use crate::storage::{photo_object_key, BlobStorage};
use crate::util::unix_timestamp_millis;

/// Document id of the per-farm settings singleton.
const SETTINGS_DOC_ID: &str = "farm";

/// Sync metadata key holding the last successful sync time (Unix ms).
const META_LAST_SYNCED_AT: &str = "last_synced_at";

/// The named stages of one `sync_now` run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    SettingsPull,
    Upload,
    DownloadMerge,
    LocalReplace,
    DeviceRegister,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SettingsPull => "settings pull",
            Self::Upload => "upload",
            Self::DownloadMerge => "download/merge",
            Self::LocalReplace => "local replace",
            Self::DeviceRegister => "device register",
        };
        f.write_str(name)
    }
}

/// Errors terminating a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Nobody is signed in; sync refuses to start
    #[error("Sync requires a signed-in account")]
    NotSignedIn,

    /// The signed-in account could not be determined
    #[error("Could not determine the signed-in account: {0}")]
    Auth(#[source] CoreError),

    /// First unrecoverable error, tagged with the pipeline stage it
    /// occurred in
    #[error("Sync failed during {stage}: {source}")]
    Stage {
        stage: SyncStage,
        #[source]
        source: CoreError,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Counters for a completed sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Records pushed to the remote store
    pub uploaded: usize,
    /// Records in the merged local replacement set
    pub merged: usize,
    /// Remote documents dropped for missing/invalid required fields
    pub malformed_skipped: usize,
    /// Photos whose blob upload failed (prior location kept)
    pub blob_upload_failures: usize,
    /// When this run finished (Unix ms)
    pub last_synced_at: i64,
}

/// The sync orchestrator. All collaborators are injected; the engine holds
/// no global state.
pub struct SyncEngine<L, R, B, A> {
    local: L,
    remote: R,
    blobs: B,
    auth: A,
    device: DeviceProfile,
    single_flight: Option<Mutex<()>>,
}

impl<L, R, B, A> SyncEngine<L, R, B, A>
where
    L: LocalStore,
    R: RemoteStore,
    B: BlobStorage,
    A: AuthProvider,
{
    #[must_use]
    pub const fn new(local: L, remote: R, blobs: B, auth: A, device: DeviceProfile) -> Self {
        Self {
            local,
            remote,
            blobs,
            auth,
            device,
            single_flight: None,
        }
    }

    /// Serialize `sync_now` calls within this process.
    ///
    /// Off by default: concurrent runs (including from other devices)
    /// interleave at the remote store as last-writer-wins per document.
    #[must_use]
    pub fn with_single_flight(mut self) -> Self {
        self.single_flight = Some(Mutex::new(()));
        self
    }

    /// When this device last completed a sync (Unix ms).
    pub async fn last_synced_at(&self) -> crate::Result<Option<i64>> {
        let value = self.local.get_meta(META_LAST_SYNCED_AT).await?;
        Ok(value.and_then(|value| value.parse().ok()))
    }

    /// Run one full synchronization.
    ///
    /// Upload always precedes download, which is what keeps local-only
    /// records of remote-authoritative collections (assignments, calving,
    /// health, weights, photos) alive across the merge. A run that fails
    /// between those stages can lose such records that were never
    /// uploaded; the returned error names the stage that failed so
    /// callers can surface that window.
    pub async fn sync_now(&self) -> SyncResult<SyncSummary> {
        let user = self
            .auth
            .current_user()
            .await
            .map_err(SyncError::Auth)?
            .ok_or(SyncError::NotSignedIn)?;

        let _flight = match &self.single_flight {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };

        tracing::info!("Starting sync for account {}", user.id);
        let mut summary = SyncSummary::default();

        self.pull_settings(&user.id, &mut summary)
            .await
            .map_err(at_stage(SyncStage::SettingsPull))?;

        self.upload_all(&user.id, &mut summary)
            .await
            .map_err(at_stage(SyncStage::Upload))?;

        let snapshot = self
            .download_and_merge(&user.id, &mut summary)
            .await
            .map_err(at_stage(SyncStage::DownloadMerge))?;
        summary.merged = snapshot.record_count();

        self.local
            .replace_all(snapshot)
            .await
            .map_err(at_stage(SyncStage::LocalReplace))?;

        let last_synced_at = unix_timestamp_millis();
        self.register_device(&user.id, last_synced_at)
            .await
            .map_err(at_stage(SyncStage::DeviceRegister))?;
        summary.last_synced_at = last_synced_at;

        tracing::info!(
            "Sync finished: {} uploaded, {} merged, {} malformed skipped, {} blob failures",
            summary.uploaded,
            summary.merged,
            summary.malformed_skipped,
            summary.blob_upload_failures
        );
        Ok(summary)
    }

    /// Stage 1: apply remote settings before anything is uploaded, so a
    /// long-offline device does not clobber other devices' settings edits.
    async fn pull_settings(&self, user_id: &str, summary: &mut SyncSummary) -> crate::Result<()> {
        let mut documents = self
            .remote
            .fetch_collection(user_id, Collection::Settings)
            .await?;

        let singleton_index = documents
            .iter()
            .position(|doc| document_id(doc) == Some(SETTINGS_DOC_ID));
        let document = match singleton_index {
            Some(index) => Some(documents.swap_remove(index)),
            None => documents.into_iter().next(),
        };
        let Some(document) = document else {
            return Ok(());
        };

        let modified_at = remote_modified_at(&document);
        let remote_settings = match settings::settings_from_document(&document) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("Skipping malformed remote settings document: {error}");
                summary.malformed_skipped += 1;
                return Ok(());
            }
        };

        let local_settings = self.local.load_settings().await?;
        if let Some(adopted) =
            settings::choose_remote(local_settings.as_ref(), remote_settings, modified_at)
        {
            self.local.save_settings(&adopted).await?;
            tracing::debug!("Adopted remote farm settings (modified at {modified_at})");
        }
        Ok(())
    }

    /// Stage 2: push every local collection, batched, settings first.
    async fn upload_all(&self, user_id: &str, summary: &mut SyncSummary) -> crate::Result<()> {
        if let Some(settings) = self.local.load_settings().await? {
            self.remote
                .upsert_document(
                    user_id,
                    Collection::Settings,
                    SETTINGS_DOC_ID,
                    to_document(&settings)?,
                )
                .await?;
            summary.uploaded += 1;
        }

        self.upload_records(user_id, Collection::Animals, &self.local.animals().await?, summary)
            .await?;
        self.upload_records(user_id, Collection::Herds, &self.local.herds().await?, summary)
            .await?;
        self.upload_records(
            user_id,
            Collection::HerdAssignments,
            &self.local.herd_assignments().await?,
            summary,
        )
        .await?;
        self.upload_records(
            user_id,
            Collection::BreedingEvents,
            &self.local.breeding_events().await?,
            summary,
        )
        .await?;
        self.upload_records(
            user_id,
            Collection::CalvingEvents,
            &self.local.calving_events().await?,
            summary,
        )
        .await?;
        self.upload_records(
            user_id,
            Collection::HealthEvents,
            &self.local.health_events().await?,
            summary,
        )
        .await?;
        self.upload_records(
            user_id,
            Collection::WeightRecords,
            &self.local.weight_records().await?,
            summary,
        )
        .await?;
        self.upload_photos(user_id, summary).await?;

        Ok(())
    }

    async fn upload_records<T: Serialize>(
        &self,
        user_id: &str,
        collection: Collection,
        records: &[T],
        summary: &mut SyncSummary,
    ) -> crate::Result<()> {
        let documents = records.iter().map(to_document).collect::<crate::Result<Vec<_>>>()?;
        self.upload_documents(user_id, collection, documents, summary)
            .await
    }

    /// Photos get the blob treatment before upload: local files move into
    /// the per-user blob namespace and the document carries the durable
    /// URL. Blob failures are logged and the prior location is uploaded
    /// unchanged; they never abort the sync.
    async fn upload_photos(&self, user_id: &str, summary: &mut SyncSummary) -> crate::Result<()> {
        let photos = self.local.photos().await?;

        let mut documents = Vec::with_capacity(photos.len());
        for mut photo in photos {
            if !photo.has_remote_location() {
                match self.upload_photo_blob(user_id, &photo).await {
                    Ok(url) => photo.location = url,
                    Err(error) => {
                        tracing::warn!(
                            "Blob upload failed for photo {}, keeping prior location: {error}",
                            photo.id
                        );
                        summary.blob_upload_failures += 1;
                    }
                }
            }
            documents.push(to_document(&photo)?);
        }

        self.upload_documents(user_id, Collection::Photos, documents, summary)
            .await
    }

    async fn upload_photo_blob(
        &self,
        user_id: &str,
        photo: &crate::models::Photo,
    ) -> crate::Result<String> {
        let object_key = photo_object_key(user_id, &photo.id.as_str())?;
        self.blobs
            .upload_file(Path::new(&photo.location), &object_key, Some("image/jpeg"))
            .await
    }

    async fn upload_documents(
        &self,
        user_id: &str,
        collection: Collection,
        documents: Vec<crate::remote::RemoteDocument>,
        summary: &mut SyncSummary,
    ) -> crate::Result<()> {
        summary.uploaded += documents.len();

        let mut writes = Vec::with_capacity(REMOTE_BATCH_LIMIT.min(documents.len()));
        for document in documents {
            let Some(id) = document_id(&document).map(ToString::to_string) else {
                return Err(CoreError::InvalidInput(format!(
                    "Cannot upload a {collection} document without an id"
                )));
            };
            writes.push((id, document));

            if writes.len() == REMOTE_BATCH_LIMIT {
                self.remote
                    .commit_batch(user_id, collection, std::mem::take(&mut writes))
                    .await?;
            }
        }
        if !writes.is_empty() {
            self.remote.commit_batch(user_id, collection, writes).await?;
        }
        Ok(())
    }

    /// Stage 3: fetch every remote collection and resolve conflicts into
    /// the definitive local replacement set.
    async fn download_and_merge(
        &self,
        user_id: &str,
        summary: &mut SyncSummary,
    ) -> crate::Result<FarmSnapshot> {
        let herds = merge_arbitrated(
            &self.local.herds().await?,
            self.fetch_arbitrated(user_id, Collection::Herds, summary)
                .await?,
        );
        let animals = merge_arbitrated(
            &self.local.animals().await?,
            self.fetch_arbitrated(user_id, Collection::Animals, summary)
                .await?,
        );
        let breeding_events = merge_arbitrated(
            &self.local.breeding_events().await?,
            self.fetch_arbitrated(user_id, Collection::BreedingEvents, summary)
                .await?,
        );

        let herd_assignments = merge_remote_authoritative(
            self.fetch_records(user_id, Collection::HerdAssignments, summary)
                .await?,
        );
        let calving_events = merge_remote_authoritative(
            self.fetch_records(user_id, Collection::CalvingEvents, summary)
                .await?,
        );
        let health_events = merge_remote_authoritative(
            self.fetch_records(user_id, Collection::HealthEvents, summary)
                .await?,
        );
        let weight_records = merge_remote_authoritative(
            self.fetch_records(user_id, Collection::WeightRecords, summary)
                .await?,
        );
        let photos = merge_remote_authoritative(
            self.fetch_records(user_id, Collection::Photos, summary)
                .await?,
        );

        Ok(FarmSnapshot {
            herds,
            animals,
            herd_assignments,
            breeding_events,
            calving_events,
            health_events,
            weight_records,
            photos,
        })
    }

    async fn fetch_arbitrated<T: DeserializeOwned>(
        &self,
        user_id: &str,
        collection: Collection,
        summary: &mut SyncSummary,
    ) -> crate::Result<Vec<(T, i64)>> {
        let documents = self.remote.fetch_collection(user_id, collection).await?;

        let mut records = Vec::with_capacity(documents.len());
        for document in documents {
            let modified_at = remote_modified_at(&document);
            match from_document::<T>(document) {
                Ok(record) => records.push((record, modified_at)),
                Err(error) => {
                    tracing::warn!("Skipping malformed {collection} document: {error}");
                    summary.malformed_skipped += 1;
                }
            }
        }
        Ok(records)
    }

    async fn fetch_records<T: DeserializeOwned>(
        &self,
        user_id: &str,
        collection: Collection,
        summary: &mut SyncSummary,
    ) -> crate::Result<Vec<T>> {
        Ok(self
            .fetch_arbitrated(user_id, collection, summary)
            .await?
            .into_iter()
            .map(|(record, _)| record)
            .collect())
    }

    /// Stage 5: bookkeeping plus the dashboard's device registry entry.
    async fn register_device(&self, user_id: &str, last_synced_at: i64) -> crate::Result<()> {
        self.local
            .set_meta(META_LAST_SYNCED_AT, &last_synced_at.to_string())
            .await?;

        let device_id = device::ensure_device_id(&self.local).await?;
        self.remote
            .upsert_document(
                user_id,
                Collection::Devices,
                &device_id,
                device::registry_document(&self.device, last_synced_at),
            )
            .await?;
        Ok(())
    }
}

fn at_stage(stage: SyncStage) -> impl FnOnce(CoreError) -> SyncError {
    move |source| SyncError::Stage { stage, source }
}
