use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use tally_core::{Bills, Categories, Rule};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}

/// The in-progress bill collection, persisted between sessions.
#[derive(Debug, Clone)]
pub struct BillStore {
    path: PathBuf,
}

impl BillStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<Bills>, StoreError> {
        let bills: Option<Bills> = read_json(&self.path)?;
        if let Some(bills) = &bills {
            tracing::debug!("loaded {} bills from {}", bills.len(), self.path.display());
        }
        Ok(bills)
    }

    pub fn save(&self, bills: &Bills) -> Result<(), StoreError> {
        write_json(&self.path, bills)?;
        tracing::debug!("saved {} bills to {}", bills.len(), self.path.display());
        Ok(())
    }

    /// Whether a non-empty progress file is present.
    pub fn exists(&self) -> bool {
        fs::metadata(&self.path).is_ok_and(|m| m.len() > 0)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Ordered rule list. A missing file means no rules.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Vec<Rule>, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, rules: &[Rule]) -> Result<(), StoreError> {
        write_json(&self.path, rules)
    }
}

#[derive(Debug, Clone)]
pub struct CategoryStore {
    path: PathBuf,
}

impl CategoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Categories, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, categories: &Categories) -> Result<(), StoreError> {
        write_json(&self.path, categories)
    }
}
