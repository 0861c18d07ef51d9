//! The `.metadata.json` document: run inputs plus the reconciliation record.
//!
//! The document is loaded once per run, mutated in place by the engine and
//! written back after every processed file, so that an interrupted run can
//! pick up without re-downloading what was already recorded.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const METADATA_FILE_NAME: &str = ".metadata.json";
pub const STATUS_DONE: &str = "Done";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata document not found at {0}")]
    NotFound(PathBuf),
    #[error("metadata I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncState {
    #[serde(default)]
    pub input: SyncInput,
    #[serde(default)]
    pub output: SyncOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncInput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub shared_links: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub output_dir: String,
}

impl SyncInput {
    /// Output directory override, if one was given.
    pub fn output_dir(&self) -> Option<&Path> {
        let trimmed = self.output_dir.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncOutput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: BTreeMap<String, FileRecord>,
    #[serde(default, with = "folder_set")]
    pub folders: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_workspace(workspace: &Path) -> Self {
        Self::new(workspace.join(METADATA_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document. It must already exist; nothing is created here.
    pub async fn load(&self) -> Result<SyncState, MetadataError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(MetadataError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(MetadataError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// Overwrites the document through a temporary sibling and a rename.
    pub async fn save(&self, state: &SyncState) -> Result<(), MetadataError> {
        let data = serde_json::to_vec_pretty(state)?;
        let temp = temp_path(&self.path);
        tokio::fs::write(&temp, &data)
            .await
            .map_err(|source| MetadataError::Io {
                path: temp.clone(),
                source,
            })?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|source| MetadataError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{name}.tmp"))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Folder names are stored as a JSON object with empty values.
mod folder_set {
    use std::collections::{BTreeMap, BTreeSet};

    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct Marker {}

    pub fn serialize<S: Serializer>(set: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(set.iter().map(|name| (name, Marker {})))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<String>, D::Error> {
        let map = Option::<BTreeMap<String, IgnoredAny>>::deserialize(deserializer)?;
        Ok(map.map(|map| map.into_keys().collect()).unwrap_or_default())
    }
}
