//! Cloudflare R2 storage configuration and key-building helpers.

use std::env;
use std::path::Path;

use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;

use crate::{Error, Result};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "R2_PUBLIC_BASE_URL";

/// Blob storage operations consumed by the sync engine (async)
#[allow(async_fn_in_trait)]
pub trait BlobStorage {
    /// Upload a local file and return the durable URL it is served from.
    async fn upload_file(
        &self,
        path: &Path,
        object_key: &str,
        content_type: Option<&str>,
    ) -> Result<String>;
}

/// Build the object key for an animal photo.
///
/// The key is derived from the photo's own ID, so re-uploading the same
/// photo is idempotent.
pub fn photo_object_key(user_id: &str, photo_id: &str) -> Result<String> {
    let user = sanitize_token(user_id);
    let photo = sanitize_token(photo_id);
    if user.is_empty() || photo.is_empty() {
        return Err(Error::InvalidInput(
            "Photo object keys require a user id and photo id".to_string(),
        ));
    }

    Ok(format!("farms/{user}/photos/{photo}.jpg"))
}

/// Cloudflare R2 configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Optional public URL base for serving photos.
    pub public_base_url: Option<String>,
}

impl R2Config {
    /// Load R2 configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// R2-backed blob storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct R2Storage {
    config: R2Config,
}

impl R2Storage {
    #[must_use]
    pub const fn new(config: R2Config) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &R2Config {
        &self.config
    }

    /// Check that the configured bucket is reachable with current credentials.
    pub async fn bucket_is_reachable(&self) -> Result<()> {
        let client = self.s3_client();
        client
            .head_bucket()
            .bucket(&self.config.bucket)
            .send()
            .await
            .map_err(|error| storage_error("head_bucket", &self.config.bucket, None, error))?;
        Ok(())
    }

    /// Upload object bytes to the configured bucket.
    pub async fn upload_bytes(
        &self,
        object_key: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<()> {
        let object_key = normalize_object_key(object_key)?;
        let client = self.s3_client();

        let mut request = client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes.to_vec()));

        if let Some(content_type) = normalize_content_type(content_type) {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(|error| {
            storage_error("put_object", &self.config.bucket, Some(&object_key), error)
        })?;

        Ok(())
    }

    /// Resolve the durable URL an uploaded object is served from.
    #[must_use]
    pub fn object_url(&self, object_key: &str) -> String {
        let key = object_key.trim_matches('/');
        match &self.config.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("{}/{}/{key}", self.config.endpoint_url(), self.config.bucket),
        }
    }

    fn s3_client(&self) -> Client {
        build_s3_client(&self.config)
    }
}

impl BlobStorage for R2Storage {
    async fn upload_file(
        &self,
        path: &Path,
        object_key: &str,
        content_type: Option<&str>,
    ) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        self.upload_bytes(object_key, &bytes, content_type).await?;
        Ok(self.object_url(object_key))
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<R2Config>> {
    let account_id = lookup(ENV_ACCOUNT_ID).map(|value| value.trim().to_string());
    let bucket = lookup(ENV_BUCKET).map(|value| value.trim().to_string());
    let access_key_id = lookup(ENV_ACCESS_KEY_ID).map(|value| value.trim().to_string());
    let secret_access_key = lookup(ENV_SECRET_ACCESS_KEY).map(|value| value.trim().to_string());
    let public_base_url = lookup(ENV_PUBLIC_BASE_URL).map(|value| value.trim().to_string());

    let any_present = account_id.is_some()
        || bucket.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some()
        || public_base_url.is_some();

    if !any_present {
        return Ok(None);
    }

    let mut missing = Vec::new();
    if account_id.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_ACCOUNT_ID);
    }
    if bucket.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_BUCKET);
    }
    if access_key_id.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_ACCESS_KEY_ID);
    }
    if secret_access_key.as_ref().map_or(true, String::is_empty) {
        missing.push(ENV_SECRET_ACCESS_KEY);
    }

    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "R2 configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    let public_base_url = normalize_public_base_url(public_base_url)?;

    Ok(Some(R2Config {
        account_id: account_id.expect("validated above"),
        bucket: bucket.expect("validated above"),
        access_key_id: access_key_id.expect("validated above"),
        secret_access_key: secret_access_key.expect("validated above"),
        public_base_url,
    }))
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "herdbook-core-r2-storage",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = object_key.map_or_else(|| bucket.to_string(), |key| format!("{bucket}/{key}"));
    Error::Storage(format!("R2 {operation} failed for {target}: {error}"))
}

fn normalize_object_key(object_key: &str) -> Result<String> {
    let object_key = object_key.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(Error::InvalidInput(
            "Blob object_key cannot be empty".to_string(),
        ));
    }
    Ok(object_key)
}

fn normalize_content_type(content_type: Option<&str>) -> Option<String> {
    content_type
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn normalize_public_base_url(public_base_url: Option<String>) -> Result<Option<String>> {
    let Some(value) = public_base_url else {
        return Ok(None);
    };

    if value.is_empty() {
        return Ok(None);
    }
    if !value.starts_with("https://") && !value.starts_with("http://") {
        return Err(Error::InvalidInput(
            "R2_PUBLIC_BASE_URL must start with http:// or https://".to_string(),
        ));
    }

    Ok(Some(value.trim_end_matches('/').to_string()))
}

fn sanitize_token(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_dash = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        let keep = ch.is_ascii_alphanumeric();
        if keep {
            out.push(ch);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }

    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<Option<R2Config>> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    fn test_config() -> R2Config {
        R2Config {
            account_id: "account-1".to_string(),
            bucket: "herdbook-photos".to_string(),
            access_key_id: "AKID123".to_string(),
            secret_access_key: "SECRET123".to_string(),
            public_base_url: Some("https://cdn.example.com/media".to_string()),
        }
    }

    #[test]
    fn parse_config_none_returns_none() {
        let map = HashMap::new();
        assert!(parse_from_map(&map).unwrap().is_none());
    }

    #[test]
    fn parse_config_requires_all_required_values() {
        let mut map = HashMap::new();
        map.insert(ENV_ACCOUNT_ID, "account");
        map.insert(ENV_BUCKET, "bucket");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::InvalidInput(message) => {
                assert!(message.contains(ENV_ACCESS_KEY_ID));
                assert!(message.contains(ENV_SECRET_ACCESS_KEY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_rejects_invalid_public_base_url() {
        let mut map = HashMap::new();
        map.insert(ENV_ACCOUNT_ID, "account-1");
        map.insert(ENV_BUCKET, "bucket-a");
        map.insert(ENV_ACCESS_KEY_ID, "AKID123");
        map.insert(ENV_SECRET_ACCESS_KEY, "SECRET123");
        map.insert(ENV_PUBLIC_BASE_URL, "cdn.example.com/media");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::InvalidInput(message) => {
                assert!(message.contains("R2_PUBLIC_BASE_URL"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn photo_object_key_is_stable_and_sanitized() {
        let key = photo_object_key("User::1", "Photo 01").unwrap();
        assert_eq!(key, "farms/user-1/photos/photo-01.jpg");

        // Same inputs always produce the same key, so re-uploads are idempotent
        assert_eq!(key, photo_object_key("User::1", "Photo 01").unwrap());
    }

    #[test]
    fn photo_object_key_rejects_empty_tokens() {
        assert!(photo_object_key("  ", "p1").is_err());
        assert!(photo_object_key("u1", "--").is_err());
    }

    #[test]
    fn object_url_prefers_public_base() {
        let storage = R2Storage::new(test_config());
        assert_eq!(
            storage.object_url("/farms/u1/photos/p1.jpg"),
            "https://cdn.example.com/media/farms/u1/photos/p1.jpg"
        );

        let mut config = test_config();
        config.public_base_url = None;
        let storage = R2Storage::new(config);
        assert_eq!(
            storage.object_url("farms/u1/photos/p1.jpg"),
            "https://account-1.r2.cloudflarestorage.com/herdbook-photos/farms/u1/photos/p1.jpg"
        );
    }

    #[test]
    fn normalize_object_key_rejects_empty() {
        let err = normalize_object_key("   ").unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.contains("object_key")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalize_content_type_ignores_empty_values() {
        assert_eq!(normalize_content_type(None), None);
        assert_eq!(normalize_content_type(Some("   ")), None);
        assert_eq!(
            normalize_content_type(Some(" image/jpeg ")),
            Some("image/jpeg".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires local R2 env vars plus network access"]
    async fn r2_bucket_exists_and_is_reachable() {
        let _ = dotenvy::dotenv();

        let config = R2Config::from_env()
            .expect("R2 env parsing should not error")
            .expect("R2 config should be present");
        let storage = R2Storage::new(config.clone());

        storage.bucket_is_reachable().await.unwrap_or_else(|error| {
            panic!(
                "R2 bucket health check failed for bucket '{}': {error}",
                config.bucket
            )
        });
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires local R2 env vars plus network access"]
    async fn r2_photo_upload_returns_servable_url() {
        let _ = dotenvy::dotenv();

        let config = R2Config::from_env()
            .expect("R2 env parsing should not error")
            .expect("R2 config should be present");
        let storage = R2Storage::new(config);

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("photo.jpg");
        std::fs::write(&path, b"not-really-a-jpeg").unwrap();

        let key = photo_object_key("integration-user", "integration-photo").unwrap();
        let url = storage
            .upload_file(&path, &key, Some("image/jpeg"))
            .await
            .unwrap_or_else(|error| panic!("R2 upload failed: {error}"));

        assert!(url.ends_with("/farms/integration-user/photos/integration-photo.jpg"));
    }
}
