//! Design record storage.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{DesignRecord, FORMAT_VERSION};
use crate::{DesignError, DesignResult};

/// Write one record to an explicit file path, creating parent directories.
pub fn save_record(path: &Path, record: &DesignRecord) -> DesignResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read one record from an explicit file path.
pub fn load_record(path: &Path) -> DesignResult<DesignRecord> {
    if !path.exists() {
        return Err(DesignError::NotFound {
            name: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    let record: DesignRecord = serde_json::from_str(&content)?;
    if record.format_version != FORMAT_VERSION {
        return Err(DesignError::Format {
            found: record.format_version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(record)
}

/// A directory of named design records, one JSON file each.
#[derive(Clone)]
pub struct DesignStore {
    root_dir: PathBuf,
}

impl DesignStore {
    pub fn new(root_dir: PathBuf) -> DesignResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root_dir.join(format!("{name}.json"))
    }

    pub fn has(&self, name: &str) -> bool {
        self.record_path(name).exists()
    }

    pub fn save(&self, name: &str, record: &DesignRecord) -> DesignResult<()> {
        save_record(&self.record_path(name), record)
    }

    pub fn load(&self, name: &str) -> DesignResult<DesignRecord> {
        let path = self.record_path(name);
        if !path.exists() {
            return Err(DesignError::NotFound {
                name: name.to_string(),
            });
        }
        load_record(&path)
    }

    /// Names of all stored records, sorted.
    pub fn list(&self) -> DesignResult<Vec<String>> {
        let mut names = Vec::new();
        if !self.root_dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.root_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> DesignResult<()> {
        let path = self.record_path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
