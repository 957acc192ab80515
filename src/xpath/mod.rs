//! XPath Engine
//!
//! A restricted XPath grammar over the token index:
//! - child and descendant (`//`) element steps, `*` wildcards
//! - positional and attribute predicates
//! - trailing `@name` / `@*` attribute selection
//! - `count()` and `boolean()`
//! - Compiled expression caching

pub mod compiler;
pub mod eval;
pub mod lexer;
pub mod value;

pub use compiler::{compile, CompiledPath, Namespaces};
pub use eval::{evaluate, select};
pub use value::{EvalResult, Match, Mode};

use crate::error::XPathError;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// LRU cache of compiled paths keyed by XPath string
///
/// Shared by every call on a document. Compilation happens outside the lock.
pub struct PathCache {
    inner: Option<Mutex<LruCache<String, Arc<CompiledPath>>>>,
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("enabled", &self.inner.is_some())
            .field("len", &self.len())
            .finish()
    }
}

impl PathCache {
    /// A capacity of 0 disables caching
    pub fn new(capacity: usize) -> Self {
        PathCache {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Compiled form of `xpath`, compiling and caching on a miss
    pub fn get_or_compile(
        &self,
        xpath: &str,
        namespaces: &Namespaces,
    ) -> Result<Arc<CompiledPath>, XPathError> {
        let Some(cache) = &self.inner else {
            return compile(xpath, namespaces).map(Arc::new);
        };

        if let Some(hit) = cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(xpath)
            .cloned()
        {
            log::trace!("xpath cache hit: {xpath}");
            return Ok(hit);
        }

        log::trace!("xpath cache miss: {xpath}");
        let compiled = Arc::new(compile(xpath, namespaces)?);
        cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(xpath.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached paths
    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .map(|c| c.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
