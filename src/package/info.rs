use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// The `package_info.json` record kept inside every environment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,

    /// Published scripts, authoritative when present. Records written by
    /// older releases lack it and fall back to scanning the bin directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<PathBuf>>,
}

impl PackageInfo {
    pub fn new(name: impl Into<String>, version: Option<String>, scripts: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version,
            scripts: Some(scripts),
        }
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read package info {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse package info {:?}", path))
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        runtime
            .write(path, json.as_bytes())
            .with_context(|| format!("Failed to write package info {:?}", path))
    }
}
