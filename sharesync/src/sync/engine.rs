use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, warn};

use crate::metadata::{FileRecord, MetadataError, MetadataStore, STATUS_DONE, SyncState};

use super::flatten::{FlattenError, flatten};
use super::paths::{self, PathError};
use super::remote::{RemoteError, RemoteNode, RemoteTree};
use super::transfer::{self, TransferError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("remote fetch failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("flatten failed: {0}")]
    Flatten(#[from] FlattenError),
    #[error("download of {id} failed: {source}")]
    Download {
        id: String,
        #[source]
        source: RemoteError,
    },
    #[error("write failed: {0}")]
    Transfer(#[from] TransferError),
    #[error("local I/O error at {path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("persist failed: {0}")]
    Persist(#[from] MetadataError),
    #[error("path error: {0}")]
    Path(#[from] PathError),
}

impl EngineError {
    fn local_io(path: &Path, source: io::Error) -> Self {
        Self::LocalIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A file found under one of the entry points, with that entry point's root prefix.
#[derive(Debug, Clone)]
pub struct SyncItem {
    pub node: RemoteNode,
    pub root: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub deleted_files: usize,
    pub deleted_folders: usize,
}

pub struct SyncEngine<R> {
    remote: R,
    store: MetadataStore,
    output_dir: PathBuf,
}

impl<R: RemoteTree> SyncEngine<R> {
    pub fn new(remote: R, store: MetadataStore, output_dir: PathBuf) -> Self {
        Self {
            remote,
            store,
            output_dir,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Reconciles the output directory with the remote tree.
    ///
    /// The outcome is always written back to the store: `Done` on success,
    /// the error text in `output.error` on failure.
    pub async fn run(&self, state: &mut SyncState) -> Result<SyncReport, EngineError> {
        match self.reconcile(state).await {
            Ok(report) => {
                state.output.status = STATUS_DONE.to_string();
                state.output.error.clear();
                self.store.save(state).await?;
                info!(
                    downloaded = report.downloaded,
                    skipped = report.skipped,
                    deleted_files = report.deleted_files,
                    deleted_folders = report.deleted_folders,
                    "sync finished"
                );
                Ok(report)
            }
            Err(err) => {
                state.output.error = err.to_string();
                if let Err(save_err) = self.store.save(state).await {
                    error!(error = %save_err, "failed to record sync error");
                }
                Err(err)
            }
        }
    }

    async fn reconcile(&self, state: &mut SyncState) -> Result<SyncReport, EngineError> {
        let items = self.collect(&state.input.shared_links).await?;
        let mut report = SyncReport::default();
        let seen = self.apply(state, &items, &mut report).await?;
        self.prune_files(state, &items, &mut report).await?;
        self.prune_folders(state, &seen, &mut report).await?;
        Ok(report)
    }

    /// Resolves and flattens every entry point into one id-keyed set.
    ///
    /// An id reachable from several entry points keeps the last one.
    pub async fn collect(
        &self,
        links: &[String],
    ) -> Result<BTreeMap<String, SyncItem>, EngineError> {
        let mut items = BTreeMap::new();
        for link in links {
            let entry = self.remote.resolve_entry_point(link).await?;
            let root = paths::root_prefix(&entry);
            let leaves = flatten(&self.remote, &entry).await?;
            debug!(link = %link, root = %root, files = leaves.len(), "resolved entry point");
            for leaf in leaves {
                items.insert(
                    leaf.id.clone(),
                    SyncItem {
                        node: leaf,
                        root: root.clone(),
                    },
                );
            }
        }
        Ok(items)
    }

    async fn apply(
        &self,
        state: &mut SyncState,
        items: &BTreeMap<String, SyncItem>,
        report: &mut SyncReport,
    ) -> Result<BTreeSet<String>, EngineError> {
        let mut planned = Vec::with_capacity(items.len());
        for (id, item) in items {
            let relative = paths::relative_path(&item.node, &item.root);
            let destination = paths::destination_path(&self.output_dir, &relative)?;
            let top_level = paths::top_level_folder(&relative).to_string();
            planned.push((id, item, destination, top_level));
        }
        let claimed: BTreeSet<PathBuf> = planned
            .iter()
            .map(|(_, _, destination, _)| destination.clone())
            .collect();

        let total = planned.len();
        let mut seen = BTreeSet::new();
        for (processed, (id, item, destination, top_level)) in planned.into_iter().enumerate() {
            if self
                .apply_item(state, id, item, &destination, &claimed)
                .await?
            {
                report.downloaded += 1;
            } else {
                report.skipped += 1;
            }

            state.output.folders.insert(top_level.clone());
            seen.insert(top_level);
            state.output.status = format!("Synced {} of {total} files", processed + 1);
            self.store.save(state).await?;
        }
        Ok(seen)
    }

    /// Brings one file up to date. Returns whether its content was fetched.
    ///
    /// Paths in `claimed` belong to some item of this run and are never removed here.
    async fn apply_item(
        &self,
        state: &mut SyncState,
        id: &str,
        item: &SyncItem,
        destination: &Path,
        claimed: &BTreeSet<PathBuf>,
    ) -> Result<bool, EngineError> {
        let remote_stamp = item.node.last_modified_stamp();
        let destination_str = destination.to_string_lossy().into_owned();
        let mut force_fetch = !state.output.files.contains_key(id);
        let record = state
            .output
            .files
            .entry(id.to_string())
            .or_insert_with(|| FileRecord {
                file_path: destination_str.clone(),
                url: String::new(),
                updated_at: remote_stamp.to_string(),
            });
        if let Some(web_url) = &item.node.web_url {
            record.url.clone_from(web_url);
        }

        if record.file_path != destination_str {
            let previous = self.record_location(&record.file_path);
            if !record.file_path.is_empty() && !claimed.contains(&previous) {
                info!(from = %previous.display(), to = %destination.display(), "file moved upstream");
                transfer::remove_path(&previous)
                    .await
                    .map_err(|err| EngineError::local_io(&previous, err))?;
            }
            record.file_path = destination_str;
            force_fetch = true;
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| EngineError::local_io(parent, err))?;
        }

        if !force_fetch {
            let present = transfer::file_exists(destination)
                .await
                .map_err(|err| EngineError::local_io(destination, err))?;
            if present && !stamps_differ(&record.updated_at, remote_stamp) {
                debug!(path = %destination.display(), "up to date");
                return Ok(false);
            }
        }

        let data = self
            .remote
            .fetch_content(&item.node)
            .await
            .map_err(|source| EngineError::Download {
                id: id.to_string(),
                source,
            })?;
        transfer::write_content(destination, &data).await?;
        record.updated_at = remote_stamp.to_string();
        info!(path = %destination.display(), bytes = data.len(), "downloaded");
        Ok(true)
    }

    /// Drops records whose id no longer appears remotely, with their local files.
    async fn prune_files(
        &self,
        state: &mut SyncState,
        items: &BTreeMap<String, SyncItem>,
        report: &mut SyncReport,
    ) -> Result<(), EngineError> {
        let stale: Vec<String> = state
            .output
            .files
            .keys()
            .filter(|id| !items.contains_key(*id))
            .cloned()
            .collect();
        let live: BTreeSet<PathBuf> = state
            .output
            .files
            .iter()
            .filter(|(id, _)| items.contains_key(*id))
            .map(|(_, record)| self.record_location(&record.file_path))
            .collect();
        for id in stale {
            let Some(record) = state.output.files.get(&id) else {
                continue;
            };
            let location = self.record_location(&record.file_path);
            if live.contains(&location) {
                debug!(id = %id, path = %location.display(), "path now owned by another file");
            } else if !record.file_path.is_empty() {
                info!(id = %id, path = %location.display(), "deleting file removed upstream");
                transfer::remove_path(&location)
                    .await
                    .map_err(|err| EngineError::local_io(&location, err))?;
                report.deleted_files += 1;
            }
            state.output.files.remove(&id);
        }
        Ok(())
    }

    /// Removes top-level folders that no synced file lives under anymore.
    async fn prune_folders(
        &self,
        state: &mut SyncState,
        seen: &BTreeSet<String>,
        report: &mut SyncReport,
    ) -> Result<(), EngineError> {
        let stale: Vec<String> = state.output.folders.difference(seen).cloned().collect();
        for folder in stale {
            if paths::is_plain_component(&folder) {
                let location = self.output_dir.join(&folder);
                info!(path = %location.display(), "deleting folder");
                transfer::remove_path(&location)
                    .await
                    .map_err(|err| EngineError::local_io(&location, err))?;
                report.deleted_folders += 1;
            } else {
                warn!(folder = %folder, "dropping folder entry that is not a plain name");
            }
            state.output.folders.remove(&folder);
        }
        Ok(())
    }

    /// Records hold absolute paths; relative ones are resolved against the output directory.
    fn record_location(&self, file_path: &str) -> PathBuf {
        let path = Path::new(file_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.output_dir.join(path)
        }
    }
}

/// Stamps are opaque strings; two RFC 3339 stamps naming the same instant are equal.
pub fn stamps_differ(stored: &str, remote: &str) -> bool {
    if stored == remote {
        return false;
    }
    match (
        OffsetDateTime::parse(stored, &Rfc3339),
        OffsetDateTime::parse(remote, &Rfc3339),
    ) {
        (Ok(stored), Ok(remote)) => stored.unix_timestamp_nanos() != remote.unix_timestamp_nanos(),
        _ => true,
    }
}
