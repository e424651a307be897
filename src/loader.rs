//! Locating and reading the definition sources for a game version.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::commands::parse_definitions;
use crate::enums::parse_enums;
use crate::errors::IndexError;
use crate::index::Index;

pub const ENUMS_FILE: &str = "enums.txt";

/// Game version identifier to definition file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTable(IndexMap<String, String>);

impl Default for VersionTable {
    fn default() -> Self {
        Self(
            [
                ("gta3_sbl", "gta3.json"),
                ("vc_sbl", "vc.json"),
                ("sa_sbl", "sa.json"),
            ]
            .into_iter()
            .map(|(id, file)| (id.to_string(), file.to_string()))
            .collect(),
        )
    }
}

impl VersionTable {
    /// Entries in `overrides` replace or extend the built-in table.
    pub fn merged(overrides: &IndexMap<String, String>) -> Self {
        let mut table = Self::default();
        table
            .0
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        table
    }

    /// Unknown identifiers map to `<identifier>.json`.
    pub fn definitions_file(&self, version: &str) -> String {
        self.0
            .get(version)
            .cloned()
            .unwrap_or_else(|| format!("{version}.json"))
    }

    pub fn select(&self, root: impl Into<PathBuf>, version: impl Into<String>) -> Selection {
        let version = version.into();
        Selection {
            root: root.into(),
            definitions_file: self.definitions_file(&version),
            version,
        }
    }
}

/// Where to load definitions from: an install folder plus a game version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub root: PathBuf,
    pub version: String,
    pub definitions_file: String,
}

impl Selection {
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data").join(&self.version)
    }

    pub fn definitions_path(&self) -> PathBuf {
        self.data_dir().join(&self.definitions_file)
    }

    pub fn enums_path(&self) -> PathBuf {
        self.data_dir().join(ENUMS_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Loaded(String),
    Missing(PathBuf),
}

impl SourceStatus {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Loaded(text) => Some(text),
            Self::Missing(_) => None,
        }
    }
}

/// Read a source file. A missing file is reported, not failed.
pub async fn read_source(path: &Path) -> Result<SourceStatus, IndexError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(SourceStatus::Loaded(text)),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "definition source not found");
            Ok(SourceStatus::Missing(path.to_path_buf()))
        },
        Err(source) => Err(IndexError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read and parse both sources of `selection` into a fresh index.
pub async fn load_index(selection: &Selection) -> Result<Index, IndexError> {
    let definitions_path = selection.definitions_path();
    let enums_path = selection.enums_path();
    tracing::debug!(
        definitions = %definitions_path.display(),
        enums = %enums_path.display(),
        "loading definition sources"
    );

    let (definitions, enums) = tokio::join!(
        read_source(&definitions_path),
        read_source(&enums_path)
    );

    let definitions = definitions?
        .into_text()
        .map(|json| parse_definitions(&json))
        .transpose()?;
    let has_definitions = definitions.is_some();
    let enums = enums?
        .into_text()
        .map(|text| parse_enums(&text))
        .transpose()?;

    let index = Index::build(definitions, enums);
    Ok(if has_definitions {
        index.with_source(definitions_path)
    } else {
        index
    })
}
