use async_trait::async_trait;
use aws_sdk_s3 as s3;
use axum::body::Bytes;
use chrono::Utc;
use s3::{presigning::PresigningConfig, primitives::ByteStream};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::S3Settings;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file type. Only images and PDFs are allowed.")]
    UnsupportedType(String),
    #[error("File size exceeds {limit_mb}MB limit")]
    TooLarge { limit_mb: usize },
    #[error("No file provided")]
    Empty,
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store request failed: {0}")]
    Remote(String),
}

const MB: usize = 1024 * 1024;

pub const IMAGE_AND_PDF: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
];

pub const PDF_ONLY: &[&str] = &["application/pdf"];

/// UploadPolicy
///
/// Size ceiling and MIME allow-list applied before anything reaches storage.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_types: &'static [&'static str],
}

impl UploadPolicy {
    /// Admin media uploads.
    pub const GENERAL: UploadPolicy = UploadPolicy {
        max_bytes: 10 * MB,
        allowed_types: IMAGE_AND_PDF,
    };
    /// Contact form attachments.
    pub const ATTACHMENT: UploadPolicy = UploadPolicy {
        max_bytes: 5 * MB,
        allowed_types: IMAGE_AND_PDF,
    };
    pub const CV: UploadPolicy = UploadPolicy {
        max_bytes: 5 * MB,
        allowed_types: PDF_ONLY,
    };

    pub fn check(&self, file: &UploadFile) -> Result<(), StorageError> {
        if file.bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if !self.allowed_types.contains(&file.content_type.as_str()) {
            return Err(StorageError::UnsupportedType(file.content_type.clone()));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                limit_mb: self.max_bytes / MB,
            });
        }
        Ok(())
    }
}

/// An in-memory upload taken from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    /// Uses the declared content type, falling back to a guess from the file
    /// extension when the client sent none (or a generic octet-stream).
    pub fn new(file_name: impl Into<String>, declared_type: Option<&str>, bytes: Bytes) -> Self {
        let file_name = file_name.into();
        let content_type = declared_type
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty() && t != "application/octet-stream")
            .unwrap_or_else(|| {
                mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

/// Where an uploaded object ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

/// A place the bytes of a stored file may be read from, in preference order.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadSource {
    Remote(String),
    Local(PathBuf),
}

/// StorageService
///
/// Contract for the object storage layer. Handlers only see this trait, so the
/// S3 client, the local directory fallback and the test mock are interchangeable.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Provisions the bucket on a local MinIO. No-op elsewhere.
    async fn ensure_bucket_exists(&self);

    /// Persists `file` under `folder` and returns its public address.
    async fn put(&self, folder: &str, file: UploadFile) -> Result<StoredObject, StorageError>;

    /// Candidate sources for a previously stored file, best first.
    async fn download_sources(&self, public_id: &str, file_url: &str) -> Vec<DownloadSource>;
}

/// Checks the policy, then stores.
pub async fn store_upload(
    storage: &dyn StorageService,
    policy: UploadPolicy,
    folder: &str,
    file: UploadFile,
) -> Result<StoredObject, StorageError> {
    policy.check(&file)?;
    storage.put(folder, file).await
}

/// S3StorageClient
///
/// S3-compatible object storage (MinIO locally, any S3 provider in production).
/// `force_path_style(true)` is required for MinIO.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
}

impl S3StorageClient {
    pub fn new(settings: &S3Settings) -> Self {
        let credentials = s3::config::Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "static",
        );

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(&settings.endpoint)
            .region(s3::config::Region::new(settings.region.clone()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: settings.bucket.clone(),
            public_url: settings.public_url.clone(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn put(&self, folder: &str, file: UploadFile) -> Result<StoredObject, StorageError> {
        let key = format!(
            "{}/{}-{}",
            sanitize_key(folder),
            Uuid::new_v4(),
            sanitize_file_name(&file.file_name)
        );

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(&file.content_type)
            .body(ByteStream::from(file.bytes))
            .send()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;

        tracing::info!(key = %key, "stored object");
        Ok(StoredObject {
            url: format!("{}/{}", self.public_url, key),
            public_id: key,
        })
    }

    async fn download_sources(&self, public_id: &str, file_url: &str) -> Vec<DownloadSource> {
        let mut sources = Vec::new();

        if !public_id.is_empty() && !public_id.starts_with("http") {
            match PresigningConfig::expires_in(Duration::from_secs(600)) {
                Ok(presign) => match self
                    .client
                    .get_object()
                    .bucket(&self.bucket_name)
                    .key(public_id)
                    .presigned(presign)
                    .await
                {
                    Ok(request) => sources.push(DownloadSource::Remote(request.uri().to_string())),
                    Err(e) => tracing::warn!(key = %public_id, error = %e, "presign failed"),
                },
                Err(e) => tracing::warn!(error = %e, "invalid presigning config"),
            }
        }

        let direct = DownloadSource::Remote(file_url.to_string());
        if !file_url.is_empty() && !sources.contains(&direct) {
            sources.push(direct);
        }
        sources
    }
}

/// LocalStorage
///
/// Disk fallback used when no object storage credentials are configured. Files
/// land flat in `root` and are served back under `url_prefix`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            url_prefix: "/uploads".to_string(),
        }
    }
}

#[async_trait]
impl StorageService for LocalStorage {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            tracing::warn!(dir = %self.root.display(), error = %e, "could not create upload directory");
        }
    }

    async fn put(&self, _folder: &str, file: UploadFile) -> Result<StoredObject, StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            sanitize_file_name(&file.file_name)
        );
        tokio::fs::write(self.root.join(&name), &file.bytes).await?;

        Ok(StoredObject {
            url: format!("{}/{}", self.url_prefix, name),
            public_id: name,
        })
    }

    async fn download_sources(&self, public_id: &str, file_url: &str) -> Vec<DownloadSource> {
        let mut sources = Vec::new();

        let name = file_url
            .strip_prefix(&format!("{}/", self.url_prefix))
            .unwrap_or(public_id);
        let name = sanitize_file_name(name);
        if !name.is_empty() {
            sources.push(DownloadSource::Local(self.root.join(name)));
        }
        if file_url.starts_with("http://") || file_url.starts_with("https://") {
            sources.push(DownloadSource::Remote(file_url.to_string()));
        }
        sources
    }
}

/// Strips directory navigation (`..`, `.`, empty segments) from a key prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Reduces a client-supplied file name to one safe path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// MockStorageService
///
/// In-memory `StorageService` for tests. Records every stored object and can be
/// switched into a failing mode.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    stored: Mutex<Vec<(String, UploadFile)>>,
    sources: Mutex<Vec<DownloadSource>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Download sources returned for every lookup.
    pub fn with_sources(sources: Vec<DownloadSource>) -> Self {
        Self {
            sources: Mutex::new(sources),
            ..Self::default()
        }
    }

    /// `(folder, file)` pairs stored so far.
    pub fn stored(&self) -> Vec<(String, UploadFile)> {
        self.stored.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put(&self, folder: &str, file: UploadFile) -> Result<StoredObject, StorageError> {
        if self.should_fail {
            return Err(StorageError::Remote(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        let key = format!(
            "{}/{}",
            sanitize_key(folder),
            sanitize_file_name(&file.file_name)
        );
        if let Ok(mut stored) = self.stored.lock() {
            stored.push((folder.to_string(), file));
        }

        Ok(StoredObject {
            url: format!("http://localhost:9000/mock-bucket/{key}"),
            public_id: key,
        })
    }

    async fn download_sources(&self, _public_id: &str, _file_url: &str) -> Vec<DownloadSource> {
        self.sources.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

pub type StorageState = Arc<dyn StorageService>;
