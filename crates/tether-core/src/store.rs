//! One YAML file per project under a data directory.
//!
//! Layout: `<data_dir>/<PREFIX>.yaml`. Saves go through a sibling temp file
//! and a rename so a crash never leaves a half-written project behind.
//! Loading validates the project and logs any defects; it does not refuse
//! to load damaged data, since `validate` needs to read it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::graph::validate_project;
use crate::model::{IdError, ItemId, Project};
use crate::model::item_id::normalize_prefix;

const EXTENSION: &str = "yaml";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project '{prefix}' not found in {}", .dir.display())]
    NotFound { prefix: String, dir: PathBuf },

    #[error("project '{prefix}' already exists")]
    Exists { prefix: String },

    #[error("invalid id: {0}")]
    InvalidId(#[from] IdError),

    #[error("cannot parse {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot serialize project '{prefix}': {source}")]
    Serialize {
        prefix: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::ProjectNotFound,
            Self::Exists { .. } => ErrorCode::ProjectExists,
            Self::InvalidId(_) => ErrorCode::InvalidId,
            Self::Corrupt { .. } | Self::Read { .. } => ErrorCode::CorruptProject,
            Self::Write { .. } => ErrorCode::ProjectWriteFailed,
            Self::Serialize { .. } => ErrorCode::InternalUnexpected,
        }
    }
}

/// File-backed project storage rooted at one directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a project's file. The prefix is normalized first.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidId`] if `prefix` is not 2-3 ASCII letters.
    pub fn path_for(&self, prefix: &str) -> Result<PathBuf, StoreError> {
        let prefix = normalize_prefix(prefix)?;
        Ok(self.root.join(format!("{prefix}.{EXTENSION}")))
    }

    pub fn exists(&self, prefix: &str) -> bool {
        self.path_for(prefix).is_ok_and(|p| p.is_file())
    }

    /// Create and persist a new, empty project.
    ///
    /// # Errors
    ///
    /// [`StoreError::Exists`] if a file for the prefix is already present,
    /// plus anything [`ProjectStore::save`] can return.
    pub fn create(&self, prefix: &str, name: &str) -> Result<Project, StoreError> {
        let project = Project::new(prefix, name)?;
        if self.exists(&project.prefix) {
            return Err(StoreError::Exists {
                prefix: project.prefix,
            });
        }
        self.save(&project)?;
        Ok(project)
    }

    /// Load one project by prefix.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no file exists, [`StoreError::Corrupt`]
    /// when it does not parse.
    pub fn load(&self, prefix: &str) -> Result<Project, StoreError> {
        let path = self.path_for(prefix)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    prefix: prefix.to_ascii_uppercase(),
                    dir: self.root.clone(),
                });
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        let project: Project = serde_yaml::from_str(&text)
            .map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        for defect in validate_project(&project) {
            warn!(prefix = %project.prefix, "{defect}");
        }
        debug!(prefix = %project.prefix, items = project.len(), "project loaded");
        Ok(project)
    }

    /// Load the project that owns an item ID.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidId`] if `raw_id` does not parse, otherwise as
    /// [`ProjectStore::load`].
    pub fn load_for_item(&self, raw_id: &str) -> Result<Project, StoreError> {
        let id: ItemId = raw_id.parse()?;
        self.load(id.prefix())
    }

    /// Write a project atomically.
    ///
    /// # Errors
    ///
    /// [`StoreError::Write`] on any filesystem failure.
    pub fn save(&self, project: &Project) -> Result<(), StoreError> {
        let path = self.path_for(&project.prefix)?;
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;

        let body = serde_yaml::to_string(project).map_err(|source| StoreError::Serialize {
            prefix: project.prefix.clone(),
            source,
        })?;

        let tmp_path = path.with_extension("yaml.tmp");
        fs::write(&tmp_path, body).map_err(|source| StoreError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        debug!(prefix = %project.prefix, path = %path.display(), "project saved");
        Ok(())
    }

    /// Prefixes of every stored project, sorted.
    ///
    /// A missing data directory means no projects.
    ///
    /// # Errors
    ///
    /// [`StoreError::Read`] if the directory exists but cannot be listed.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut prefixes: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == EXTENSION))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                normalize_prefix(stem).ok().filter(|p| p == stem)
            })
            .collect();
        prefixes.sort();
        Ok(prefixes)
    }
}
