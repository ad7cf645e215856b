//! Persistent settings store with per-key change notification
//!
//! A `SettingsStore<D>` keeps one JSON document on disk. `D` describes the
//! document: its `Default` supplies the value of every key that was never
//! written. Writes are visible to `get` immediately and persisted right away.
//! Subscribers registered with `on_change` run synchronously inside `set`
//! (or `reload`) once per call that actually changes their key.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading, writing or decoding a settings document
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid settings value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings update must be a JSON object, got {0}")]
    NotAnObject(Value),
    #[error("settings watcher failed: {0}")]
    Watch(#[from] notify::Error),
}

/// Handle returned by [`SettingsStore::on_change`]
pub type SubscriptionId = u64;

type ChangeCallback = Box<dyn FnMut(&Value, &Value) + Send>;

pub struct SettingsStore<D> {
    /// Backing file, `None` for a purely in-memory store
    path: Option<PathBuf>,
    defaults: Map<String, Value>,
    /// Keys present in the file or written with `set`
    values: Map<String, Value>,
    subscribers: HashMap<String, Vec<(SubscriptionId, ChangeCallback)>>,
    next_subscription: SubscriptionId,
    /// A write failed and has not been retried yet
    dirty: bool,
    closed: bool,
    _document: PhantomData<fn() -> D>,
}

impl<D> std::fmt::Debug for SettingsStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("values", &self.values)
            .field("closed", &self.closed)
            .finish()
    }
}

impl<D> SettingsStore<D>
where
    D: Serialize + DeserializeOwned + Default,
{
    /// Open the document at `path`.
    ///
    /// A missing file yields an empty document. An unreadable or malformed
    /// file is logged and also treated as empty; it is only overwritten by
    /// the next `set`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = read_document(&path);
        tracing::debug!(path = %path.display(), keys = values.len(), "settings loaded");
        Self::with_values(Some(path), values)
    }

    /// A store that never touches the disk
    pub fn in_memory() -> Self {
        Self::with_values(None, Map::new())
    }

    fn with_values(path: Option<PathBuf>, values: Map<String, Value>) -> Self {
        let defaults = match serde_json::to_value(D::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Self {
            path,
            defaults,
            values,
            subscribers: HashMap::new(),
            next_subscription: 0,
            dirty: false,
            closed: false,
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current value of `key`, falling back to the document default.
    /// Keys unknown to both yield `Value::Null`.
    pub fn get(&self, key: &str) -> Value {
        self.values
            .get(key)
            .or_else(|| self.defaults.get(key))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Current value of `key` decoded as `V`
    pub fn get_as<V: DeserializeOwned>(&self, key: &str) -> Result<V, SettingsError> {
        Ok(serde_json::from_value(self.get(key))?)
    }

    /// The whole document with defaults applied
    pub fn document(&self) -> Result<D, SettingsError> {
        let mut merged = self.defaults.clone();
        for (key, value) in &self.values {
            merged.insert(key.clone(), value.clone());
        }
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Merge the keys of `partial` (a JSON object) into the document.
    ///
    /// Subscribers of every key whose value changed are invoked before the
    /// document is written. The in-memory update stands even when the write
    /// fails; the error is returned and the write retried on `close`.
    pub fn set(&mut self, partial: Value) -> Result<(), SettingsError> {
        let Value::Object(partial) = partial else {
            return Err(SettingsError::NotAnObject(partial));
        };

        let mut changes = Vec::new();
        for (key, new) in partial {
            let old = self.get(&key);
            self.values.insert(key.clone(), new.clone());
            if old != new {
                changes.push((key, new, old));
            }
        }

        for (key, new, old) in &changes {
            self.notify(key, new, old);
        }

        if self.closed {
            tracing::debug!("settings store closed, update kept in memory only");
            return Ok(());
        }
        self.persist()
    }

    /// Set a single key from any serializable value
    pub fn set_value(&mut self, key: &str, value: impl Serialize) -> Result<(), SettingsError> {
        let mut partial = Map::new();
        partial.insert(key.to_string(), serde_json::to_value(value)?);
        self.set(Value::Object(partial))
    }

    /// Call `callback(new, old)` whenever a `set` or `reload` changes `key`
    pub fn on_change<F>(&mut self, key: &str, callback: F) -> SubscriptionId
    where
        F: FnMut(&Value, &Value) + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers
            .entry(key.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for list in self.subscribers.values_mut() {
            let before = list.len();
            list.retain(|(sub, _)| *sub != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Re-read the backing file after an external edit and notify
    /// subscribers of every key whose value differs.
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let fresh = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content)? {
                Value::Object(map) => map,
                other => return Err(SettingsError::NotAnObject(other)),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.extend(fresh.keys().filter(|k| !self.values.contains_key(*k)).cloned());

        let before: Vec<Value> = keys.iter().map(|k| self.get(k)).collect();
        self.values = fresh;

        for (key, old) in keys.iter().zip(before) {
            let new = self.get(key);
            if new != old {
                self.notify(key, &new, &old);
            }
        }
        Ok(())
    }

    /// Watch the backing file for external edits.
    ///
    /// `on_event` runs on the watcher's thread for every create or modify
    /// event touching the file. The watcher stops when the returned value is
    /// dropped. In-memory stores return `Ok(None)`.
    pub fn watch<F>(&self, on_event: F) -> Result<Option<RecommendedWatcher>, SettingsError>
    where
        F: Fn() + Send + 'static,
    {
        let Some(path) = self.path.clone() else {
            return Ok(None);
        };
        let Some(dir) = path.parent().map(Path::to_path_buf) else {
            return Ok(None);
        };
        fs::create_dir_all(&dir)?;

        let file_name = path.file_name().map(|n| n.to_os_string());
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    let touches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_file {
                        on_event();
                    }
                }
                Err(e) => tracing::warn!("settings watcher error: {}", e),
            }
        })?;

        // The directory is watched since writes replace the file by rename
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        Ok(Some(watcher))
    }

    /// Flush pending writes and drop all subscribers.
    ///
    /// Later `set` calls still update memory but are not persisted.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.dirty {
            if let Err(e) = self.persist() {
                tracing::error!("failed to flush settings on close: {}", e);
            }
        }
        self.subscribers.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn notify(&mut self, key: &str, new: &Value, old: &Value) {
        if let Some(list) = self.subscribers.get_mut(key) {
            for (_, callback) in list.iter_mut() {
                callback(new, old);
            }
        }
    }

    fn persist(&mut self) -> Result<(), SettingsError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        match write_document(path, &self.values) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                Err(e)
            }
        }
    }
}

fn read_document(path: &Path) -> Map<String, Value> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Map::new(),
        Err(e) => {
            tracing::warn!("could not read settings file {:?}: {}", path, e);
            return Map::new();
        }
    };

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("settings file {:?} is not a JSON object, using defaults", path);
            Map::new()
        }
        Err(e) => {
            tracing::warn!("could not parse settings file {:?}: {}", path, e);
            Map::new()
        }
    }
}

fn write_document(path: &Path, values: &Map<String, Value>) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(values)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
