//! Parameter-manager profile persistence: a flat JSON mapping from dotted
//! parameter path to `{value, unit}` (or a bare value), written atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use instrumentkit_types::ParamValue;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ProfileEntry {
    WithUnit { value: ParamValue, unit: String },
    Bare(ParamValue),
}

/// Load a profile, tolerating both the `{value, unit}` and bare-value shapes
/// per parameter entry.
pub fn load(path: &Path) -> Result<BTreeMap<String, (ParamValue, Option<String>)>, CoreError> {
    let text = fs::read_to_string(path)?;
    let raw: BTreeMap<String, ProfileEntry> = serde_json::from_str(&text)?;
    Ok(raw
        .into_iter()
        .map(|(path, entry)| match entry {
            ProfileEntry::WithUnit { value, unit } => (path, (value, Some(unit))),
            ProfileEntry::Bare(value) => (path, (value, None)),
        })
        .collect())
}

/// Write a profile atomically: serialize to JSON, write to a temporary
/// sibling file, then rename over the destination.
pub fn save(path: &Path, entries: &BTreeMap<String, (ParamValue, String)>) -> Result<(), CoreError> {
    let out: BTreeMap<&str, ProfileEntry> = entries
        .iter()
        .map(|(path, (value, unit))| (path.as_str(), ProfileEntry::WithUnit { value: value.clone(), unit: unit.clone() }))
        .collect();
    let json = serde_json::to_string_pretty(&out)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    use std::io::Write as _;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
    Ok(())
}
