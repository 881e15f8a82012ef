//! JSON encoding and layout files.

use std::fs;
use std::path::Path;

use super::{ComponentRecord, RecordError, deduplicate_ids};

pub fn from_json(content: &str) -> Result<ComponentRecord, RecordError> {
    Ok(serde_json::from_str(content)?)
}

pub fn to_json(record: &ComponentRecord) -> Result<String, RecordError> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Read a persisted layout. Ids are kept as stored.
pub fn read_layout(path: &Path) -> Result<ComponentRecord, RecordError> {
    let content = fs::read_to_string(path).map_err(|e| RecordError::Io(path.to_path_buf(), e))?;
    from_json(&content)
}

/// Write a layout, creating parent directories. The file is replaced
/// atomically via a sibling temp file.
pub fn write_layout(path: &Path, record: &ComponentRecord) -> Result<(), RecordError> {
    let json = to_json(record)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| RecordError::Io(parent.to_path_buf(), e))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| RecordError::Io(tmp.clone(), e))?;
    fs::rename(&tmp, path).map_err(|e| RecordError::Io(path.to_path_buf(), e))
}

/// Read a launcher (exported subtree). Always deduplicated, so the same
/// launcher can be opened any number of times.
pub fn load_launcher(path: &Path) -> Result<ComponentRecord, RecordError> {
    let content = fs::read_to_string(path).map_err(|e| RecordError::Io(path.to_path_buf(), e))?;
    parse_launcher(&content)
}

/// Parse launcher content and give it fresh ids.
pub fn parse_launcher(content: &str) -> Result<ComponentRecord, RecordError> {
    let mut record = from_json(content)?;
    deduplicate_ids(&mut record);
    Ok(record)
}
