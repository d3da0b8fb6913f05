//! File sources: from a storage location to a [`RangeReader`].
//!
//! A conversion only knows the location string stored on the file record.
//! [`StorageFileSource`] sends `s3://bucket/key` locations to S3 and treats
//! everything else as a local path. The S3 client is built on first use and
//! then shared by every later S3 location of the same source.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::IoError;
use crate::io::{
    create_s3_client, parse_s3_uri, LocalFileReader, RangeReader, S3RangeReader,
    DEFAULT_S3_REGION,
};

/// Opens readers for storage locations.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// The type of range reader this source creates.
    type Reader: RangeReader + 'static;

    /// Open a reader for `location`.
    ///
    /// # Errors
    /// `IoError::NotFound` if nothing exists at the location.
    async fn open(&self, location: &str) -> Result<Self::Reader, IoError>;
}

// =============================================================================
// FileReader
// =============================================================================

/// Reader returned by [`StorageFileSource`].
pub enum FileReader {
    Local(LocalFileReader),
    S3(S3RangeReader),
}

#[async_trait]
impl RangeReader for FileReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        match self {
            FileReader::Local(reader) => reader.read_exact_at(offset, len).await,
            FileReader::S3(reader) => reader.read_exact_at(offset, len).await,
        }
    }

    fn size(&self) -> u64 {
        match self {
            FileReader::Local(reader) => reader.size(),
            FileReader::S3(reader) => reader.size(),
        }
    }

    fn identifier(&self) -> &str {
        match self {
            FileReader::Local(reader) => reader.identifier(),
            FileReader::S3(reader) => reader.identifier(),
        }
    }
}

// =============================================================================
// StorageFileSource
// =============================================================================

/// Local filesystem and S3 file source.
pub struct StorageFileSource {
    s3_endpoint: Option<String>,
    s3_region: String,
    s3_client: OnceCell<Client>,
}

impl StorageFileSource {
    /// Create a source.
    ///
    /// # Arguments
    /// * `s3_endpoint` - Custom S3 endpoint (MinIO etc.), `None` for AWS
    /// * `s3_region` - Region for the S3 client
    pub fn new(s3_endpoint: Option<String>, s3_region: impl Into<String>) -> Self {
        Self {
            s3_endpoint,
            s3_region: s3_region.into(),
            s3_client: OnceCell::new(),
        }
    }

    /// Use an already configured S3 client.
    pub fn with_s3_client(client: Client) -> Self {
        Self {
            s3_endpoint: None,
            s3_region: DEFAULT_S3_REGION.to_string(),
            s3_client: OnceCell::new_with(Some(client)),
        }
    }

    /// Whether the S3 client has been created yet.
    pub fn s3_initialized(&self) -> bool {
        self.s3_client.initialized()
    }

    async fn s3_client(&self) -> &Client {
        self.s3_client
            .get_or_init(|| async {
                debug!(
                    endpoint = ?self.s3_endpoint,
                    region = %self.s3_region,
                    "Creating S3 client"
                );
                create_s3_client(self.s3_endpoint.as_deref(), &self.s3_region).await
            })
            .await
    }
}

impl Default for StorageFileSource {
    fn default() -> Self {
        Self::new(None, DEFAULT_S3_REGION)
    }
}

#[async_trait]
impl FileSource for StorageFileSource {
    type Reader = FileReader;

    async fn open(&self, location: &str) -> Result<Self::Reader, IoError> {
        if let Some((bucket, key)) = parse_s3_uri(location) {
            let client = self.s3_client().await.clone();
            let reader = S3RangeReader::new(client, bucket, key).await?;
            return Ok(FileReader::S3(reader));
        }
        Ok(FileReader::Local(LocalFileReader::open(location).await?))
    }
}
