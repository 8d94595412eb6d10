//! Key-value stores with change notifications.
//!
//! A [`Store`] holds string values under string keys and tells subscribers
//! when another party changes a key. Writes made through a store handle are
//! never reported back to that same handle's subscribers.
//!
//! - [`MemoryStore`]: contexts sharing one in-memory map, the way browser
//!   tabs share local storage.
//! - [`FileStore`]: a JSON object on disk; changes from other processes are
//!   picked up by [`FileStore::poll_external`].

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    rc::{Rc, Weak},
};

use tempfile::NamedTempFile;
use thiserror::Error;

/// A key changed outside the receiving handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key.
    pub key: String,
    /// New value, `None` when the key was removed.
    pub new_value: Option<String>,
}

/// Receives storage events.
pub type Listener = Rc<dyn Fn(&StorageEvent)>;

/// Store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Backing file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The backing file is not a JSON object of strings.
    #[error("corrupt store {path}: {source}")]
    Corrupt {
        /// Backing file.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value storage with change notifications.
pub trait Store {
    /// Value under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Delete `key`.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Register `listener` until the returned guard is dropped.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Keeps a listener registered. Unsubscribes on drop.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Listener registry of one store handle.
#[derive(Default)]
struct Listeners {
    next_id: Cell<u64>,
    list: RefCell<Vec<(u64, Listener)>>,
}

impl Listeners {
    fn subscribe(self: &Rc<Self>, listener: Listener) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.list.borrow_mut().push((id, listener));

        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners.list.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }

    fn len(&self) -> usize {
        self.list.borrow().len()
    }

    fn notify(&self, event: &StorageEvent) {
        // listeners may subscribe or write while being notified
        let snapshot: Vec<Listener> = self.list.borrow().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            listener(event);
        }
    }
}

#[derive(Default)]
struct Hub {
    data: RefCell<BTreeMap<String, String>>,
    contexts: RefCell<Vec<Weak<Listeners>>>,
}

/// In-memory store. Each [`MemoryStore::context`] is a separate handle on
/// the same data; a write through one handle notifies all the others.
pub struct MemoryStore {
    hub: Rc<Hub>,
    listeners: Rc<Listeners>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A fresh store with a single context.
    pub fn new() -> Self {
        Self::attach(Rc::new(Hub::default()))
    }

    /// Open another context on the same data.
    pub fn context(&self) -> Self {
        Self::attach(self.hub.clone())
    }

    fn attach(hub: Rc<Hub>) -> Self {
        let listeners = Rc::new(Listeners::default());
        hub.contexts.borrow_mut().push(Rc::downgrade(&listeners));
        Self { hub, listeners }
    }

    /// Listeners registered on this context.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn broadcast(&self, event: StorageEvent) {
        let others: Vec<Rc<Listeners>> = {
            let mut contexts = self.hub.contexts.borrow_mut();
            contexts.retain(|w| w.strong_count() > 0);
            contexts
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|l| !Rc::ptr_eq(l, &self.listeners))
                .collect()
        };
        for listeners in others {
            listeners.notify(&event);
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.hub.data.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let old = self
            .hub
            .data
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        if old.as_deref() != Some(value) {
            self.broadcast(StorageEvent {
                key: key.to_string(),
                new_value: Some(value.to_string()),
            });
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let old = self.hub.data.borrow_mut().remove(key);
        if old.is_some() {
            self.broadcast(StorageEvent {
                key: key.to_string(),
                new_value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

/// Store backed by a JSON object file.
///
/// Every write re-reads the file so keys written by other processes
/// survive, then replaces it atomically. Other processes' writes are
/// reported by [`FileStore::poll_external`].
pub struct FileStore {
    path: PathBuf,
    snapshot: RefCell<BTreeMap<String, String>>,
    listeners: Rc<Listeners>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; a corrupt
    /// one is logged and treated as empty until the next write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match read_map(&path) {
            Ok(map) => map,
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("{e}, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        debug!("opened store {} with {} keys", path.display(), snapshot.len());

        Ok(Self {
            path,
            snapshot: RefCell::new(snapshot),
            listeners: Rc::new(Listeners::default()),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and notify subscribers of every key that changed
    /// since the last read or write. Returns the number of events sent.
    pub fn poll_external(&self) -> Result<usize, StoreError> {
        let current = read_map(&self.path)?;
        let events = {
            let previous = self.snapshot.borrow();
            diff(&previous, &current)
        };
        *self.snapshot.borrow_mut() = current;

        for event in &events {
            trace!("external change of `{}`", event.key);
            self.listeners.notify(event);
        }
        Ok(events.len())
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let mut map = match read_map(&self.path) {
            Ok(map) => map,
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("{e}, overwriting");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut map);
        write_map(&self.path, &map)?;
        *self.snapshot.borrow_mut() = map;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(read_map(&self.path)?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe(listener)
    }
}

fn diff(previous: &BTreeMap<String, String>, current: &BTreeMap<String, String>) -> Vec<StorageEvent> {
    let mut events: Vec<StorageEvent> = current
        .iter()
        .filter(|(k, v)| previous.get(*k) != Some(*v))
        .map(|(k, v)| StorageEvent {
            key: k.clone(),
            new_value: Some(v.clone()),
        })
        .collect();
    events.extend(
        previous
            .keys()
            .filter(|k| !current.contains_key(*k))
            .map(|k| StorageEvent {
                key: k.clone(),
                new_value: None,
            }),
    );
    events
}

fn read_map(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn write_map(path: &Path, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;

    let content = serde_json::to_string_pretty(map).map_err(|e| io_err(e.into()))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<StorageEvent>>>, Listener) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let listener: Listener = {
            let events = events.clone();
            Rc::new(move |e: &StorageEvent| events.borrow_mut().push(e.clone()))
        };
        (events, listener)
    }

    #[test]
    fn test_memory_notifies_other_contexts_only() {
        let a = MemoryStore::new();
        let b = a.context();
        let (seen_a, la) = recorder();
        let (seen_b, lb) = recorder();
        let _sa = a.subscribe(la);
        let _sb = b.subscribe(lb);

        a.set("values", "{}").unwrap();
        assert!(seen_a.borrow().is_empty());
        assert_eq!(
            *seen_b.borrow(),
            vec![StorageEvent {
                key: "values".into(),
                new_value: Some("{}".into())
            }]
        );
        assert_eq!(b.get("values").unwrap().as_deref(), Some("{}"));

        // same value again is not a change
        a.set("values", "{}").unwrap();
        assert_eq!(seen_b.borrow().len(), 1);

        b.remove("values").unwrap();
        assert_eq!(seen_a.borrow()[0].new_value, None);
        assert_eq!(a.get("values").unwrap(), None);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let a = MemoryStore::new();
        let b = a.context();
        let (seen, listener) = recorder();
        let sub = b.subscribe(listener);
        assert_eq!(b.subscriber_count(), 1);
        drop(sub);
        assert_eq!(b.subscriber_count(), 0);

        a.set("k", "v").unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("values").unwrap(), None);

        store.set("values", r#"{"first":"1"}"#).unwrap();
        store.set("other", "x").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("values").unwrap().as_deref(), Some(r#"{"first":"1"}"#));

        reopened.remove("other").unwrap();
        assert_eq!(store.get("other").unwrap(), None);
    }

    #[test]
    fn test_file_store_polls_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mine = FileStore::open(&path).unwrap();
        let theirs = FileStore::open(&path).unwrap();
        let (seen, listener) = recorder();
        let _sub = mine.subscribe(listener);

        mine.set("values", "a").unwrap();
        assert_eq!(mine.poll_external().unwrap(), 0);

        theirs.set("values", "b").unwrap();
        assert_eq!(mine.poll_external().unwrap(), 1);
        assert_eq!(seen.borrow()[0].new_value.as_deref(), Some("b"));
        assert_eq!(mine.poll_external().unwrap(), 0);

        theirs.remove("values").unwrap();
        mine.poll_external().unwrap();
        assert_eq!(seen.borrow()[1].new_value, None);
    }

    #[test]
    fn test_file_store_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(matches!(store.get("values"), Err(StoreError::Corrupt { .. })));

        store.set("values", "{}").unwrap();
        assert_eq!(store.get("values").unwrap().as_deref(), Some("{}"));
    }
}
