//! Path capture storage.
//!
//! Routers record the named segments they matched in a [`Params`] value. The
//! default [`PathLookup`](crate::PathLookup) reads path fields from it.

use smallvec::SmallVec;

/// Maximum number of captures stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Named path captures from a route match.
///
/// Captures are kept in match order. Lookups are linear, which beats hashing
/// for the handful of captures a route template has.
///
/// # Example
///
/// ```rust
/// use reqbind::Params;
///
/// let mut params = Params::new();
/// params.push("user_id", "123");
/// params.push("org_id", "456");
///
/// assert_eq!(params.get("user_id"), Some("123"));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates a new empty capture set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capture. A later capture with the same name is shadowed by the
    /// earlier one on lookup.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value captured under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no captures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the captures.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
