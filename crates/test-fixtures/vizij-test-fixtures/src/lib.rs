//! Shared character rigs and layer configs for the workspace tests.
//!
//! Fixtures live in `fixtures/` at the workspace root and are indexed by
//! `fixtures/manifest.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    /// Clip duration table plus the states registered against it.
    rigs: HashMap<String, String>,
    configs: HashMap<String, ConfigEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigEntry {
    Path(String),
    Detailed { path: String },
}

impl ConfigEntry {
    fn rel(&self) -> &str {
        match self {
            ConfigEntry::Path(path) | ConfigEntry::Detailed { path } => path,
        }
    }
}

fn fixture_path(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../../fixtures")
        .join(rel)
}

fn load_json<T: DeserializeOwned>(kind: &str, name: &str, rel: Option<&str>) -> Result<T> {
    let rel = rel.ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))?;
    let path = fixture_path(rel);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {kind} fixture at {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {kind} fixture {rel}"))
}

pub mod rigs {
    use super::*;

    /// Every rig name in the manifest.
    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.rigs.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        load_json("rig", name, MANIFEST.rigs.get(name).map(String::as_str))
    }
}

pub mod configs {
    use super::*;

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        load_json("config", name, MANIFEST.configs.get(name).map(ConfigEntry::rel))
    }
}
