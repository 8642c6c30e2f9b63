use anyhow::Context;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const NOTES_KEY: &str = "savedNotes";
pub const TUTORIAL_SEEN_KEY: &str = "hasSeenTutorial";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("preferences io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("preferences file is not valid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("preference store unavailable: {0}")]
    Unavailable(String),
}

/// Flat string key-value storage backing notes and small flags.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(v)) if v == "true")
    }
}

/// Preferences kept in a single YAML file, rewritten whole on every `set`.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = if path.exists() {
            let data = fs::read_to_string(&path).map_err(|source| StorageError::Io {
                path: path.clone(),
                source,
            })?;
            if data.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_yaml::from_str(&data)?
            }
        } else {
            BTreeMap::new()
        };
        Ok(FilePreferences { path, values })
    }

    /// Opens the file, starting from an empty map when it cannot be read.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match FilePreferences::open(path.clone()) {
            Ok(prefs) => prefs,
            Err(err) => {
                tracing::warn!("ignoring unreadable preferences: {}", err);
                FilePreferences {
                    path,
                    values: BTreeMap::new(),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = serde_yaml::to_string(&self.values)?;
        // The target is only ever replaced whole, never truncated in place.
        let temp = self.temp_path();
        fs::write(&temp, serialized).map_err(|source| StorageError::Io {
            path: temp.clone(),
            source,
        })?;
        fs::rename(&temp, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let previous = self.values.insert(key.to_string(), value);
        if let Err(err) = self.write() {
            match previous {
                Some(old) => self.values.insert(key.to_string(), old),
                None => self.values.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
    fail_writes: bool,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        MemoryPreferences::default()
    }

    /// Every subsequent `set` fails, simulating a full or read-only disk.
    pub fn failing() -> Self {
        MemoryPreferences {
            values: BTreeMap::new(),
            fail_writes: true,
        }
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable(format!("write to {} refused", key)));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
}

impl StoreLocation {
    /// An explicit path wins; otherwise the per-user data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None => default_data_dir()?.join("preferences.yml"),
        };
        Ok(StoreLocation { path })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn open(&self) -> FilePreferences {
        FilePreferences::open_or_empty(self.path.clone())
    }
}

pub fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from("", "", "dailycal").context("locating data directory")
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_preferences_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.yml");
        let mut prefs = FilePreferences::open(&path).unwrap();
        assert_eq!(prefs.get("missing").unwrap(), None);
        prefs.set(TUTORIAL_SEEN_KEY, "true".into()).unwrap();

        let reopened = FilePreferences::open(&path).unwrap();
        assert!(reopened.flag(TUTORIAL_SEEN_KEY));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yml");
        fs::write(&path, "- not\n- a map\n").unwrap();
        assert!(FilePreferences::open(&path).is_err());
        let prefs = FilePreferences::open_or_empty(&path);
        assert_eq!(prefs.get(NOTES_KEY).unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail.
        let path = dir.path().join("prefs.yml");
        fs::create_dir_all(&path).unwrap();
        let mut prefs = FilePreferences {
            path: path.clone(),
            values: BTreeMap::new(),
        };
        assert!(prefs.set("k", "v".into()).is_err());
        assert_eq!(prefs.get("k").unwrap(), None);
    }

    #[test]
    fn interrupted_write_keeps_the_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yml");
        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.set(NOTES_KEY, "kept".into()).unwrap();

        // A leftover directory at the temp path makes the next write fail
        // before the real file is touched.
        let temp = dir.path().join("prefs.yml.tmp");
        fs::create_dir_all(&temp).unwrap();
        assert!(prefs.set(NOTES_KEY, "lost".into()).is_err());
        assert_eq!(prefs.get(NOTES_KEY).unwrap().as_deref(), Some("kept"));

        let reopened = FilePreferences::open(&path).unwrap();
        assert_eq!(reopened.get(NOTES_KEY).unwrap().as_deref(), Some("kept"));

        fs::remove_dir(&temp).unwrap();
        fs::write(&temp, "stale: half written").unwrap();
        prefs.set(NOTES_KEY, "next".into()).unwrap();
        assert!(!temp.exists());
        let reopened = FilePreferences::open(&path).unwrap();
        assert_eq!(reopened.get(NOTES_KEY).unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn memory_preferences_can_refuse_writes() {
        let mut prefs = MemoryPreferences::failing();
        assert!(prefs.set("k", "v".into()).is_err());
        prefs.set_failing(false);
        prefs.set("k", "v".into()).unwrap();
        assert_eq!(prefs.raw("k"), Some("v"));
        assert!(!prefs.flag("k"));
    }

    #[test]
    fn explicit_location_is_used_verbatim() {
        let location = StoreLocation::resolve(Some(PathBuf::from("/tmp/x/prefs.yml"))).unwrap();
        assert_eq!(location.path, PathBuf::from("/tmp/x/prefs.yml"));
        assert_eq!(location.data_dir(), PathBuf::from("/tmp/x"));
    }
}
