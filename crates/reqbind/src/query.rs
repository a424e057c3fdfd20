//! Query string container.

use indexmap::IndexMap;

/// Multi-valued view of a URL query string.
///
/// Keys keep the order of their first appearance; repeated keys collect all of
/// their values in order. Dotted keys such as `name.first` are kept verbatim.
///
/// # Example
///
/// ```rust
/// use reqbind::QueryValues;
///
/// let query = QueryValues::parse("a=1&b=x&a=2");
/// assert_eq!(query.get_all("a"), Some(&["1".to_string(), "2".to_string()][..]));
/// assert_eq!(query.get("b"), Some("x"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    values: IndexMap<String, Vec<String>>,
}

impl QueryValues {
    /// Parses an `application/x-www-form-urlencoded` query string.
    ///
    /// Malformed percent escapes are decoded lossily rather than rejected.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

        let mut values: IndexMap<String, Vec<String>> = IndexMap::with_capacity(pairs.len());
        for (key, value) in pairs {
            values.entry(key).or_default().push(value);
        }
        Self { values }
    }

    /// Returns every value given for `key`.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }

    /// Returns the first value given for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key)
            .and_then(<[String]>::first)
            .map(String::as_str)
    }

    /// Iterates over keys and their values in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the query string had no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
