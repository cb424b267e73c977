// Bounded parse/extraction cache with FIFO eviction

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::ClassRecord;

pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub max_size: usize,
    pub trees: usize,
    pub classes: usize,
    pub evictions: u64,
}

enum Slot<T> {
    Tree(PathBuf, Arc<T>),
    Class(String, Arc<ClassRecord>),
}

struct Inner<T> {
    next_id: u64,
    slots: HashMap<u64, Slot<T>>,
    /// Insertion order shared by both maps
    order: VecDeque<u64>,
    trees: HashMap<PathBuf, u64>,
    classes: HashMap<String, u64>,
    evictions: u64,
}

impl<T> Inner<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            slots: HashMap::new(),
            order: VecDeque::new(),
            trees: HashMap::new(),
            classes: HashMap::new(),
            evictions: 0,
        }
    }

    fn allocate(&mut self, slot: Slot<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(id, slot);
        self.order.push_back(id);
        id
    }

    /// Pop the oldest entry from whichever map holds it.
    fn evict_oldest(&mut self) -> bool {
        while let Some(id) = self.order.pop_front() {
            match self.slots.remove(&id) {
                Some(Slot::Tree(path, _)) => {
                    self.trees.remove(&path);
                    debug!("Evicted parsed file {}", path.display());
                }
                Some(Slot::Class(name, _)) => {
                    self.classes.remove(&name);
                    debug!("Evicted class record {}", name);
                }
                None => continue,
            }
            self.evictions += 1;
            return true;
        }
        false
    }

    fn remove_id(&mut self, id: u64) {
        self.slots.remove(&id);
        self.order.retain(|queued| *queued != id);
    }

    fn tree(&self, path: &Path) -> Option<Arc<T>> {
        match self.slots.get(self.trees.get(path)?) {
            Some(Slot::Tree(_, value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    fn store_tree(&mut self, max_size: usize, path: PathBuf, value: Arc<T>) {
        while self.trees.len() >= max_size {
            if !self.evict_oldest() {
                break;
            }
        }
        let id = self.allocate(Slot::Tree(path.clone(), value));
        self.trees.insert(path, id);
    }

    fn store_class(&mut self, max_size: usize, record: Arc<ClassRecord>) {
        if let Some(old_id) = self.classes.remove(&record.name) {
            if let Some(Slot::Class(_, old)) = self.slots.get(&old_id) {
                if old.file != record.file {
                    debug!(
                        "Class {} redefined in {} (was {})",
                        record.name,
                        record.file.display(),
                        old.file.display()
                    );
                }
            }
            self.remove_id(old_id);
        }
        while self.classes.len() >= max_size {
            if !self.evict_oldest() {
                break;
            }
        }
        let name = record.name.clone();
        let id = self.allocate(Slot::Class(name.clone(), record));
        self.classes.insert(name, id);
    }
}

/// Cached values that carry extracted class records
pub trait ClassSource {
    fn class_records(&self) -> &[Arc<ClassRecord>];
}

/// Two bounded maps (parsed files by path, class records by name) evicted
/// together in insertion order.
///
/// Lookups never reorder entries and never parse. [`ParseCache::get_or_parse`]
/// holds a per-path lock across check, parse and insert, so one path is
/// parsed at most once while it stays cached.
pub struct ParseCache<T> {
    enabled: bool,
    max_size: usize,
    inner: Mutex<Inner<T>>,
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl<T> ParseCache<T> {
    pub fn new(enabled: bool, max_size: usize) -> Self {
        Self {
            enabled,
            max_size,
            inner: Mutex::new(Inner::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.max_size > 0
    }

    pub fn get_tree(&self, path: &Path) -> Option<Arc<T>> {
        self.inner.lock().tree(path)
    }

    /// Store a parsed file, returning whichever value ends up cached.
    ///
    /// If another caller stored the same path first, that value wins and is
    /// returned so both callers share one artifact.
    pub fn insert_tree(&self, path: PathBuf, value: Arc<T>) -> Arc<T> {
        if !self.is_enabled() {
            return value;
        }
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.tree(&path) {
            return existing;
        }
        inner.store_tree(self.max_size, path, Arc::clone(&value));
        value
    }

    pub fn get_class(&self, name: &str) -> Option<Arc<ClassRecord>> {
        let inner = self.inner.lock();
        let id = inner.classes.get(name)?;
        match inner.slots.get(id) {
            Some(Slot::Class(_, record)) => Some(Arc::clone(record)),
            _ => None,
        }
    }

    /// Store a class record. A record with the same name is replaced and the
    /// new one joins the back of the eviction queue.
    pub fn insert_class(&self, record: Arc<ClassRecord>) {
        if !self.is_enabled() {
            return;
        }
        self.inner.lock().store_class(self.max_size, record);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let evictions = inner.evictions;
        *inner = Inner::new();
        inner.evictions = evictions;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            enabled: self.is_enabled(),
            max_size: self.max_size,
            trees: inner.trees.len(),
            classes: inner.classes.len(),
            evictions: inner.evictions,
        }
    }
}

impl<T: ClassSource> ParseCache<T> {
    /// Return the cached parse of `path`, or run `parse` and cache its result
    /// together with its class records.
    ///
    /// Concurrent callers for the same path wait for the first one and share
    /// its value. A failed parse caches nothing.
    pub fn get_or_parse<E>(&self, path: &Path, parse: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        if let Some(hit) = self.get_tree(path) {
            return Ok(hit);
        }
        if !self.is_enabled() {
            return parse().map(Arc::new);
        }

        let slot = Arc::clone(self.in_flight.lock().entry(path.to_path_buf()).or_default());
        let _guard = slot.lock();
        let outcome = match self.get_tree(path) {
            Some(hit) => Ok(hit),
            None => parse().map(|value| self.store_parsed(path, Arc::new(value))),
        };

        let mut in_flight = self.in_flight.lock();
        if in_flight.get(path).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
            in_flight.remove(path);
        }
        outcome
    }

    fn store_parsed(&self, path: &Path, value: Arc<T>) -> Arc<T> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.tree(path) {
            return existing;
        }
        for record in value.class_records() {
            inner.store_class(self.max_size, Arc::clone(record));
        }
        inner.store_tree(self.max_size, path.to_path_buf(), Arc::clone(&value));
        value
    }
}

impl<T> Default for ParseCache<T> {
    fn default() -> Self {
        Self::new(true, DEFAULT_MAX_SIZE)
    }
}
