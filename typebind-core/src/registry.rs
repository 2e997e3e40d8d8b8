use core::fmt;
use core::hash::Hash;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{Deserializer, RawType, Serializer, TypeDescriptor};

/// How a registry asks one of its converters whether it handles a key.
pub trait Dispatch: Send + Sync {
    /// What the registry resolves: a full descriptor or only a raw type.
    type Key: Clone + Eq + Hash + fmt::Display + Send + Sync;

    /// Returns true if this converter handles `key`.
    fn supports(&self, key: &Self::Key) -> bool;
}

impl Dispatch for dyn Deserializer {
    type Key = TypeDescriptor;

    fn supports(&self, key: &TypeDescriptor) -> bool {
        self.supports_for_deserialization(key)
    }
}

impl Dispatch for dyn Serializer {
    type Key = RawType;

    fn supports(&self, key: &RawType) -> bool {
        self.supports_for_serialization(key)
    }
}

/// An ordered list of converters with a resolution cache.
///
/// A registry starts out configurable: converters can be registered and the
/// list cleared. [`Registry::seal`] makes it read-only, after which it can
/// resolve keys from any number of threads. Using an operation in the wrong
/// phase is a programming error and panics.
///
/// When several converters support the same key, the one registered last
/// wins.
pub struct Registry<C: ?Sized + Dispatch> {
    label: &'static str,
    sealed: bool,
    converters: Vec<Arc<C>>,
    cache: RwLock<HashMap<C::Key, Arc<C>>>,
}

impl<C: ?Sized + Dispatch> Registry<C> {
    /// Creates an empty registry; `label` names it in panics and logs.
    pub fn new(label: &'static str) -> Self {
        Registry {
            label,
            sealed: false,
            converters: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Appends a converter. It takes precedence over all earlier ones.
    ///
    /// # Panics
    ///
    /// If the registry is sealed.
    pub fn register(&mut self, converter: Arc<C>) {
        self.ensure_configuring("register");
        self.converters.push(converter);
        debug!(registry = self.label, count = self.converters.len(), "registered converter");
    }

    /// Removes all registered converters.
    ///
    /// # Panics
    ///
    /// If the registry is sealed.
    pub fn clear(&mut self) {
        self.ensure_configuring("clear");
        self.converters.clear();
    }

    /// Ends configuration. Sealing twice is allowed.
    pub fn seal(&mut self) {
        if !self.sealed {
            debug!(registry = self.label, count = self.converters.len(), "sealed");
        }
        self.sealed = true;
    }

    /// Returns true once [`Registry::seal`] has been called.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Returns true if no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Finds the converter for `key`: the cached one, or else the most
    /// recently registered converter that supports it.
    ///
    /// # Panics
    ///
    /// If the registry is not sealed yet.
    pub fn find(&self, key: &C::Key) -> Option<Arc<C>> {
        self.ensure_sealed("find");
        if let Some(hit) = self.cache.read().get(key) {
            trace!(registry = self.label, %key, "cache hit");
            return Some(Arc::clone(hit));
        }
        let found = self
            .converters
            .iter()
            .rev()
            .find(|converter| converter.supports(key))
            .cloned()?;
        trace!(registry = self.label, %key, "resolved registered converter");
        Some(self.insert_generated(key.clone(), found))
    }

    /// Returns true if `key` is cached or some registered converter supports it.
    ///
    /// # Panics
    ///
    /// If the registry is not sealed yet.
    pub fn supports(&self, key: &C::Key) -> bool {
        self.ensure_sealed("supports");
        self.cache.read().contains_key(key)
            || self.converters.iter().any(|converter| converter.supports(key))
    }

    /// Caches a converter built outside the registered list, such as one
    /// generated for a record type.
    ///
    /// An entry already present is kept and returned instead: the cache only
    /// ever grows, and equivalent converters built by racing threads are
    /// interchangeable. Allowed in both phases.
    pub fn insert_generated(&self, key: C::Key, converter: Arc<C>) -> Arc<C> {
        let mut cache = self.cache.write();
        Arc::clone(cache.entry(key).or_insert(converter))
    }

    fn ensure_configuring(&self, operation: &str) {
        assert!(
            !self.sealed,
            "{} registry is already sealed; {operation} is only allowed during configuration",
            self.label
        );
    }

    fn ensure_sealed(&self, operation: &str) {
        assert!(
            self.sealed,
            "{} registry is not sealed yet; {operation} is only allowed after sealing",
            self.label
        );
    }
}

impl<C: ?Sized + Dispatch> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("label", &self.label)
            .field("sealed", &self.sealed)
            .field("converters", &self.converters.len())
            .field("cached", &self.cache.read().len())
            .finish()
    }
}
