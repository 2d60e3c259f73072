//! Device registry: stable device identity plus the dashboard document.

use uuid::Uuid;

use crate::db::LocalStore;
use crate::error::Result;
use crate::remote::RemoteDocument;

const META_DEVICE_ID: &str = "device_id";

/// How this device presents itself in the farm dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Human-readable device name
    pub name: String,
    /// Platform tag (e.g. "linux", "android")
    pub platform: String,
}

impl DeviceProfile {
    /// Profile named by the user, tagged with the compile-target platform.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// Read the persisted device identifier, generating and persisting one on
/// first use.
pub(crate) async fn ensure_device_id<L: LocalStore>(local: &L) -> Result<String> {
    if let Some(id) = local.get_meta(META_DEVICE_ID).await? {
        return Ok(id);
    }

    let id = Uuid::now_v7().to_string();
    local.set_meta(META_DEVICE_ID, &id).await?;
    tracing::debug!("Generated device id {id}");
    Ok(id)
}

/// The registry document upserted under the account after each sync.
pub(crate) fn registry_document(profile: &DeviceProfile, last_sync_at: i64) -> RemoteDocument {
    let mut document = RemoteDocument::new();
    document.insert(
        "name".to_string(),
        serde_json::Value::String(profile.name.clone()),
    );
    document.insert(
        "platform".to_string(),
        serde_json::Value::String(profile.platform.clone()),
    );
    document.insert("lastSyncAt".to_string(), serde_json::json!(last_sync_at));
    document
}
