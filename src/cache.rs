use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use crate::template::Template;

/// A compiled template together with what is needed to revalidate it.
#[derive(Debug, Clone)]
pub(crate) struct CachedTemplate {
    pub(crate) template: Arc<Template>,
    pub(crate) path: PathBuf,
    pub(crate) modified: Option<SystemTime>,
}

impl CachedTemplate {
    /// Whether the file changed since it was loaded. Files whose modification
    /// time can't be read always count as changed.
    pub(crate) fn is_stale(&self, current: Option<SystemTime>) -> bool {
        match (self.modified, current) {
            (Some(loaded), Some(now)) => loaded != now,
            _ => true,
        }
    }
}

/// Logical name to compiled template. Populated lazily by the registry and
/// shared between threads: lookups only take the read lock.
#[derive(Debug, Default)]
pub(crate) struct TemplateCache {
    entries: RwLock<HashMap<String, CachedTemplate>>,
}

impl TemplateCache {
    pub(crate) fn new() -> TemplateCache {
        TemplateCache::default()
    }

    pub(crate) fn get(&self, name: &str) -> Option<CachedTemplate> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub(crate) fn insert(&self, name: String, entry: CachedTemplate) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, entry);
    }

    pub(crate) fn remove(&self, name: &str) -> Option<CachedTemplate> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub(crate) fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
