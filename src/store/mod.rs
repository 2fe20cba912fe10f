//! Persistence boundary: the catalog document and the content-hash map.
//!
//! The core reads both structures once at run start and writes both once
//! at run end. Each document is written to a temporary sibling file and
//! renamed into place, so a crash mid-write can never leave a torn
//! catalog — the previous good state stays on disk until the new one is
//! complete.

use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    catalog::CanonicalModel, config::StoreConfig, pipeline::ProviderDirectory,
};

/// Failure reading or committing persisted state. Always fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the pipeline persists between runs.
#[derive(Debug, Default, PartialEq)]
pub struct Snapshot {
    pub models: Vec<CanonicalModel>,
    pub directory: ProviderDirectory,
    pub hashes: BTreeMap<String, String>,
}

/// On-disk shape of the catalog document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    models: Vec<CanonicalModel>,

    #[serde(default)]
    providers: ProviderDirectory,
}

/// JSON file store over the two persisted documents.
pub struct FileStore {
    catalog_path: PathBuf,
    hashes_path: PathBuf,
}

impl FileStore {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            catalog_path: config.catalog_path.clone(),
            hashes_path: config.hashes_path.clone(),
        }
    }

    /// Load the persisted snapshot. Missing files mean a first run and
    /// yield an empty snapshot; anything else unreadable is fatal.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        let catalog: CatalogDocument = read_document(&self.catalog_path)?.unwrap_or_default();
        let hashes: BTreeMap<String, String> =
            read_document(&self.hashes_path)?.unwrap_or_default();

        Ok(Snapshot {
            models: catalog.models,
            directory: catalog.providers,
            hashes,
        })
    }

    /// Commit the snapshot. Both documents are fully serialized before
    /// either file is touched.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let catalog = CatalogDocument {
            models: snapshot.models.clone(),
            providers: snapshot.directory.clone(),
        };
        let catalog_body = to_json(&catalog, &self.catalog_path)?;
        let hashes_body = to_json(&snapshot.hashes, &self.hashes_path)?;

        write_document(&self.catalog_path, &catalog_body)?;
        write_document(&self.hashes_path, &hashes_body)
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn to_json<T: Serialize>(value: &T, path: &Path) -> Result<String, StoreError> {
    serde_json::to_string_pretty(value).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write via a temporary sibling so the rename into place is atomic on the
/// same filesystem.
fn write_document(path: &Path, body: &str) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");
    std::fs::write(&tmp, body).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)
}
