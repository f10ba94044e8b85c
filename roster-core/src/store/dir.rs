//! Directory-backed registry store.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   <node_a>.json   (one PeerRecord per node)
//!   <node_b>.json
//! ```
//!
//! The root is typically a working tree shared by the fleet. Writes go to a
//! `.json.tmp` sibling first and are renamed into place, so readers never see
//! a half-written record. Creates are linked into place without replacing, so
//! two nodes racing on the same name cannot both succeed.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{io_err, StoreError};
use crate::store::RegistryStore;
use crate::types::{PeerRecord, RegistrationFile};

const RECORD_EXTENSION: &str = ".json";

/// A [`RegistryStore`] over a directory of JSON record files.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<file_name>` — pure, no I/O.
    pub fn record_path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Record file names sorted by name. A missing root yields an empty list.
    pub fn list_files_blocking(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = std::fs::read_dir(&self.root)
            .map_err(|e| io_err(&self.root, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(RECORD_EXTENSION) && !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Read and decode every record in [`list_files_blocking`](Self::list_files_blocking) order.
    pub fn load_records(&self) -> Result<Vec<PeerRecord>, StoreError> {
        let mut records = Vec::new();
        for name in self.list_files_blocking()? {
            let path = self.record_path(&name);
            let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let record: PeerRecord = serde_json::from_str(&contents)
                .map_err(|source| StoreError::Decode { path, source })?;
            records.push(record);
        }
        Ok(records)
    }

    fn create_blocking(&self, file: &RegistrationFile) -> Result<(), StoreError> {
        let path = self.checked_path(&file.file_name)?;
        self.ensure_root()?;
        let json = serde_json::to_string_pretty(&file.content)?;

        // Dot-prefixed, so listings skip it until it is persisted.
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.root).map_err(|e| io_err(&self.root, e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| io_err(tmp.path(), e))?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {}
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists {
                    file: file.file_name.clone(),
                });
            }
            Err(err) => return Err(io_err(&path, err.error)),
        }
        log_commit(file);
        Ok(())
    }

    fn update_blocking(&self, file: &RegistrationFile) -> Result<(), StoreError> {
        let path = self.checked_path(&file.file_name)?;
        if !path.exists() {
            return Err(StoreError::NotFound {
                file: file.file_name.clone(),
            });
        }
        self.write_atomic(&path, &file.content)?;
        log_commit(file);
        Ok(())
    }

    fn checked_path(&self, file_name: &str) -> Result<PathBuf, StoreError> {
        let valid = file_name.ends_with(RECORD_EXTENSION)
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\']);
        if !valid {
            return Err(StoreError::InvalidFileName(file_name.to_string()));
        }
        Ok(self.record_path(file_name))
    }

    /// serialize → `.tmp` sibling → `rename`. The `.tmp` stays in the same
    /// directory so the rename never crosses filesystems.
    fn write_atomic(&self, path: &Path, record: &PeerRecord) -> Result<(), StoreError> {
        self.ensure_root()?;
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
        std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
        Ok(())
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
        }
        Ok(())
    }
}

fn log_commit(file: &RegistrationFile) {
    tracing::debug!(
        file = %file.file_name,
        branch = %file.branch,
        author = %file.author_name,
        message = %file.commit_message,
        "wrote registry record",
    );
}

async fn run_blocking<T, F>(op: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
}

#[async_trait]
impl RegistryStore for DirStore {
    async fn list_files(&self) -> Result<Vec<String>, StoreError> {
        let store = self.clone();
        run_blocking(move || store.list_files_blocking()).await
    }

    async fn fetch_files(&self) -> Result<Vec<PeerRecord>, StoreError> {
        let store = self.clone();
        run_blocking(move || store.load_records()).await
    }

    async fn create_file(&self, file: &RegistrationFile) -> Result<(), StoreError> {
        let store = self.clone();
        let file = file.clone();
        run_blocking(move || store.create_blocking(&file)).await
    }

    async fn update_file(&self, file: &RegistrationFile) -> Result<(), StoreError> {
        let store = self.clone();
        let file = file.clone();
        run_blocking(move || store.update_blocking(&file)).await
    }
}
