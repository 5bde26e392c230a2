use anyhow::Context;
use fs2::FileExt;
use provoke_core::settings::{Settings, SETTINGS_KEY};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistent key-value storage: get/set/remove JSON values by key.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
    /// All stored keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

/// Return the per-user store root: `$PROVOKE_HOME`, else `<data_dir>/provoke`,
/// else `~/.provoke`.
pub fn store_root() -> PathBuf {
    if let Some(home) = std::env::var_os("PROVOKE_HOME").filter(|v| !v.is_empty()) {
        PathBuf::from(home)
    } else if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("provoke")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".provoke")
    } else {
        PathBuf::from(".provoke-store")
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// File-based exclusive lock guard.
pub struct LockGuard {
    _file: fs::File,
}

/// Acquire an exclusive file lock. Creates the lock file if needed.
pub fn lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(LockGuard { _file: file })
}

// ── File store ──

/// One JSON file per key under `<root>/kv/`.
///
/// File names are a readable stem of the key plus a blake3 prefix, so distinct
/// keys never collide after sanitizing. Each file stores `{"key", "value"}`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at [`store_root`].
    pub fn open_default() -> Self {
        Self::new(store_root())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kv_dir(&self) -> PathBuf {
        self.root.join("kv")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("kv.lock")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.kv_dir().join(file_name_for(key))
    }
}

fn file_name_for(key: &str) -> String {
    let stem: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(48)
        .collect();
    let hash = blake3::hash(key.as_bytes());
    format!("{stem}-{}.json", &hash.to_hex()[..16])
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut entry: Value = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(entry.get_mut("value").map(Value::take))
    }

    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let _lock = lock_file(&self.lock_path())?;
        let path = self.path_for(key);
        let entry = serde_json::json!({ "key": key, "value": value });
        let data = serde_json::to_string_pretty(&entry)?;
        write_atomic(&path, data.as_bytes()).with_context(|| format!("saving key {key}"))
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let _lock = lock_file(&self.lock_path())?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing key {key}")),
        }
    }

    fn keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.kv_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .ok()
                .and_then(|c| serde_json::from_str::<Value>(&c).ok());
            let key = parsed
                .as_ref()
                .and_then(|v| v.get("key"))
                .and_then(|k| k.as_str());
            match key {
                Some(k) if k.starts_with(prefix) => keys.push(k.to_string()),
                Some(_) => {}
                None => tracing::warn!(path = %path.display(), "skipping unreadable store entry"),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ── Memory store ──

/// In-process store for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        self.entries().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .entries()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ── Settings ──

/// Load settings: stored record, else a dev settings file, else defaults.
/// Environment overrides are applied last.
pub fn load_settings(store: &dyn KvStore, dev_settings: Option<&Path>) -> Settings {
    let stored = match store.get(SETTINGS_KEY) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read settings record");
            None
        }
    };
    let settings = match stored {
        Some(v) => Settings::from_value(Some(v)),
        None => dev_settings
            .and_then(load_dev_settings)
            .unwrap_or_default(),
    };
    settings.with_env_overrides()
}

/// A dev settings file only counts when it names the gemini provider, a model,
/// and an API key.
fn load_dev_settings(path: &Path) -> Option<Settings> {
    let content = fs::read_to_string(path).ok()?;
    let value: Value = serde_json::from_str(&content).ok()?;
    if value.get("provider").and_then(|p| p.as_str()) != Some("gemini") {
        return None;
    }
    let non_empty = |field: &str| {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.is_empty())
    };
    if !non_empty("model") || !non_empty("apiKey") {
        return None;
    }
    Some(Settings::from_value(Some(value)))
}

pub fn save_settings(store: &dyn KvStore, settings: &Settings) -> anyhow::Result<()> {
    let value = serde_json::to_value(settings)?;
    store.set(SETTINGS_KEY, &value)
}
