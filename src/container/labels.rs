//! Image Label Inspection
//!
//! Lists the local images matching a name and reads their labels with
//! `docker image inspect`.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::engine::{args, CommandRunner, ContainerEngine, ContainerError};

/// A local image and its labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageInfo {
    /// Content-addressed id, with its `sha256:` prefix.
    pub id: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectEntry {
    id: String,
    #[serde(default)]
    config: Option<InspectConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

/// Returns every local image matching `name`, in the order the engine
/// lists them.
pub fn list_images<R: CommandRunner>(
    engine: &ContainerEngine<R>,
    name: &str,
) -> Result<Vec<ImageInfo>, ContainerError> {
    let filter = format!("reference={}", name);
    let listing = engine.run_checked(&args([
        "images",
        "--no-trunc",
        "--quiet",
        "--filter",
        filter.as_str(),
    ]))?;

    let mut ids: Vec<String> = Vec::new();
    for id in listing.stdout.lines().map(str::trim).filter(|id| !id.is_empty()) {
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut inspect = args(["image", "inspect"]);
    inspect.extend(ids);
    let output = engine.run_checked(&inspect)?;

    parse_inspect(&output.stdout).map_err(|source| ContainerError::Decode {
        command: format!("{} image inspect", engine.binary()),
        source,
    })
}

/// Parses the JSON array printed by `docker image inspect`.
pub fn parse_inspect(json: &str) -> Result<Vec<ImageInfo>, serde_json::Error> {
    let entries: Vec<InspectEntry> = serde_json::from_str(json)?;

    Ok(entries
        .into_iter()
        .map(|entry| ImageInfo {
            id: entry.id,
            labels: entry
                .config
                .and_then(|config| config.labels)
                .unwrap_or_default(),
        })
        .collect())
}
