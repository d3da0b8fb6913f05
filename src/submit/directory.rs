//! Offline submission sink.
//!
//! Writes every created entity as a JSON document into a directory, with
//! sequential per-kind ids (`instrument-1`, `position-1`, ...). A
//! representation additionally gets its samples written next to the JSON as
//! `representation-N.f64` (little-endian).
//!
//! Counters resume after the highest id already present in the directory,
//! and records are opened with `create_new`, so a later run never replaces
//! an earlier run's files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::SubmitError;
use crate::normalize::NormalizedArray;

use super::client::SubmissionClient;
use super::types::{
    ArrayDescriptor, ChannelInput, EntityRef, InstrumentInput, PositionInput,
    RepresentationHandle, RepresentationInput, TimepointInput,
};

#[derive(Debug, Default)]
struct Counters {
    instrument: AtomicU64,
    position: AtomicU64,
    timepoint: AtomicU64,
    channel: AtomicU64,
    representation: AtomicU64,
}

impl Counters {
    fn for_kind(&self, kind: &str) -> Option<&AtomicU64> {
        match kind {
            "instrument" => Some(&self.instrument),
            "position" => Some(&self.position),
            "timepoint" => Some(&self.timepoint),
            "channel" => Some(&self.channel),
            "representation" => Some(&self.representation),
            _ => None,
        }
    }

    /// Advance the counter of a `<kind>-N.json` / `<kind>-N.f64` file name to N.
    fn observe(&self, file_name: &str) {
        let Some(stem) = file_name
            .strip_suffix(".json")
            .or_else(|| file_name.strip_suffix(".f64"))
        else {
            return;
        };
        let Some((kind, n)) = stem.rsplit_once('-') else {
            return;
        };
        if let (Some(counter), Ok(n)) = (self.for_kind(kind), n.parse::<u64>()) {
            counter.fetch_max(n, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
pub struct DirectorySubmissionClient {
    root: PathBuf,
    counters: Counters,
}

#[derive(Serialize)]
struct RepresentationRecord<'a> {
    id: &'a str,
    representation: &'a RepresentationInput,
    array: ArrayDescriptor,
}

impl DirectorySubmissionClient {
    /// Create a sink writing into `root`, creating the directory if needed.
    ///
    /// Ids continue after the highest `<kind>-N` record already in `root`.
    pub async fn create(root: impl Into<PathBuf>) -> Result<Self, SubmitError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| storage_error(&root, e))?;

        let counters = Counters::default();
        let mut entries = tokio::fs::read_dir(&root)
            .await
            .map_err(|e| storage_error(&root, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error(&root, e))?
        {
            if let Some(name) = entry.file_name().to_str() {
                counters.observe(name);
            }
        }
        debug!(
            dir = %root.display(),
            representations = counters.representation.load(Ordering::SeqCst),
            "Opened submission directory"
        );

        Ok(Self { root, counters })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn next_id(kind: &str, counter: &AtomicU64) -> String {
        format!("{}-{}", kind, counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn write_json<T: Serialize + Sync + ?Sized>(
        &self,
        id: &str,
        value: &T,
    ) -> Result<(), SubmitError> {
        let path = self.root.join(format!("{}.json", id));
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| SubmitError::Storage(e.to_string()))?;
        write_new(&path, &body).await?;
        debug!(path = %path.display(), "Wrote record");
        Ok(())
    }

    async fn create_entity<T: Serialize + Sync + ?Sized>(
        &self,
        kind: &str,
        counter: &AtomicU64,
        value: &T,
    ) -> Result<EntityRef, SubmitError> {
        let id = Self::next_id(kind, counter);
        self.write_json(&id, value).await?;
        Ok(EntityRef::new(id))
    }
}

/// Write `bytes` to a file that must not exist yet.
async fn write_new(path: &Path, bytes: &[u8]) -> Result<(), SubmitError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| storage_error(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| storage_error(path, e))?;
    file.flush().await.map_err(|e| storage_error(path, e))
}

fn storage_error(path: &Path, err: std::io::Error) -> SubmitError {
    SubmitError::Storage(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl SubmissionClient for DirectorySubmissionClient {
    async fn create_instrument(&self, input: &InstrumentInput) -> Result<EntityRef, SubmitError> {
        self.create_entity("instrument", &self.counters.instrument, input)
            .await
    }

    async fn create_position(&self, input: &PositionInput) -> Result<EntityRef, SubmitError> {
        self.create_entity("position", &self.counters.position, input)
            .await
    }

    async fn create_timepoint(&self, input: &TimepointInput) -> Result<EntityRef, SubmitError> {
        self.create_entity("timepoint", &self.counters.timepoint, input)
            .await
    }

    async fn create_channel(&self, input: &ChannelInput) -> Result<EntityRef, SubmitError> {
        self.create_entity("channel", &self.counters.channel, input)
            .await
    }

    async fn create_representation(
        &self,
        array: &NormalizedArray,
        input: &RepresentationInput,
    ) -> Result<RepresentationHandle, SubmitError> {
        let id = Self::next_id("representation", &self.counters.representation);

        let data_path = self.root.join(format!("{}.f64", id));
        write_new(&data_path, &array.to_le_bytes()).await?;

        let record = RepresentationRecord {
            id: &id,
            representation: input,
            array: ArrayDescriptor::of(array),
        };
        self.write_json(&id, &record).await?;

        info!(
            id = %id,
            name = %input.name,
            shape = ?array.shape(),
            dir = %self.root.display(),
            "Stored representation"
        );

        Ok(RepresentationHandle {
            id,
            name: input.name.clone(),
        })
    }
}
