//! Process-wide cache of compiled schemas.

use crate::schema::CompiledSchema;
use crate::{Bind, SchemaError};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

type CacheKey = (TypeId, Box<str>);
type CachedSchema = Arc<dyn Any + Send + Sync>;

static SHARED: OnceLock<SchemaCache> = OnceLock::new();

/// Concurrent cache of [`CompiledSchema`]s keyed by target type and path
/// delimiter.
///
/// A type is compiled at most once per cache and delimiter, even when many
/// threads ask for it at the same time: the shard holding the key stays
/// locked while the first caller compiles. Compile errors are not cached.
///
/// # Example
///
/// ```rust
/// use reqbind::{Bind, SchemaCache};
///
/// #[derive(Bind, Default)]
/// struct Search {
///     q: String,
/// }
///
/// let cache = SchemaCache::new();
/// let a = cache.get_or_compile::<Search>(".").unwrap();
/// let b = cache.get_or_compile::<Search>(".").unwrap();
///
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// assert_eq!(cache.compilations(), 1);
/// ```
#[derive(Default)]
pub struct SchemaCache {
    schemas: DashMap<CacheKey, CachedSchema>,
    compilations: AtomicUsize,
}

impl SchemaCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by binders that are not given one explicitly.
    pub fn shared() -> &'static SchemaCache {
        SHARED.get_or_init(SchemaCache::new)
    }

    /// Returns the compiled schema for `T`, compiling it on first use.
    pub fn get_or_compile<T: Bind>(
        &self,
        delimiter: &str,
    ) -> Result<Arc<CompiledSchema<T>>, SchemaError> {
        let key: CacheKey = (TypeId::of::<T>(), delimiter.into());

        if let Some(cached) = self.schemas.get(&key) {
            tracing::trace!(type_name = T::TYPE_NAME, delimiter, "schema cache hit");
            return Ok(downcast(Arc::clone(cached.value())));
        }

        match self.schemas.entry(key) {
            Entry::Occupied(entry) => {
                tracing::trace!(type_name = T::TYPE_NAME, delimiter, "schema cache hit");
                Ok(downcast(Arc::clone(entry.get())))
            }
            Entry::Vacant(entry) => {
                let schema = Arc::new(CompiledSchema::<T>::compile(delimiter)?);
                self.compilations.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    type_name = T::TYPE_NAME,
                    delimiter,
                    fields = schema.len(),
                    "compiled binding schema"
                );
                entry.insert(Arc::clone(&schema) as CachedSchema);
                Ok(schema)
            }
        }
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Number of successful compilations performed by this cache.
    #[must_use]
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache")
            .field("len", &self.len())
            .field("compilations", &self.compilations())
            .finish()
    }
}

fn downcast<T: Bind>(cached: CachedSchema) -> Arc<CompiledSchema<T>> {
    cached
        .downcast::<CompiledSchema<T>>()
        .expect("schema cache entries are keyed by their own TypeId")
}
