use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use crate::error::StorageError;

/// Settings key holding the channel that receives gauntlet results
pub const OUTPUT_CHANNEL: &str = "output";

/// Small string key-value store kept as one JSON file
pub struct Settings {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl Settings {
    /// Read the store from disk. A missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt settings file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) => {
                tracing::info!("No settings at {} ({}), starting empty", path.display(), e);
                HashMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Store a value and write the whole map to disk before returning
    pub fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        let content = serde_json::to_string_pretty(&*values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_put_persists() {
        let path = temp_path();
        let settings = Settings::load(&path);
        assert_eq!(settings.get(OUTPUT_CHANNEL), None);
        settings.put(OUTPUT_CHANNEL, "1234").unwrap();
        assert_eq!(settings.get(OUTPUT_CHANNEL).as_deref(), Some("1234"));

        let reloaded = Settings::load(&path);
        assert_eq!(reloaded.get(OUTPUT_CHANNEL).as_deref(), Some("1234"));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let path = temp_path();
        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load(&path).get("anything"), None);
    }
}
