//! Request binding.
//!
//! A [`Binder`] pairs a compiled schema with the collaborators a binding
//! call needs and runs the pipeline
//! body → query → path → header → cookie against one request. The first
//! failing stage ends the call; stages that already ran are not undone.

use crate::body::{is_blank, BodyDecoder, JsonBody, DEFAULT_MAX_BODY_SIZE};
use crate::path::{PathLookup, RouterParams};
use crate::schema::{CompiledSchema, FieldBinding, DEFAULT_DELIMITER};
use crate::{
    Bind, BindError, BinderConfig, Cookies, QueryValues, RequestContext, SchemaCache,
    SchemaError, SetError, SourceKind,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Values of one key, borrowed from the request.
type Values<'r> = SmallVec<[&'r str; 4]>;

/// Binds requests into values of type `T`.
///
/// Building a binder compiles `T` once per cache and delimiter; binders are
/// cheap to clone and safe to share between threads.
///
/// # Example
///
/// ```rust
/// use reqbind::{Bind, Binder, RequestContext};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Bind, Serialize, Deserialize, Default)]
/// struct ListUsers {
///     #[bind(query = "limit")]
///     limit: Option<u32>,
///     #[bind(header = "X-Tenant")]
///     tenant: String,
/// }
///
/// let binder = Binder::<ListUsers>::new().unwrap();
/// let request = RequestContext::builder()
///     .uri_str("/users?limit=20")
///     .header("x-tenant", "acme")
///     .build();
///
/// let input = binder.bind_default(&request).unwrap();
/// assert_eq!(input.limit, Some(20));
/// assert_eq!(input.tenant, "acme");
/// ```
pub struct Binder<T> {
    schema: Arc<CompiledSchema<T>>,
    path_lookup: Arc<dyn PathLookup>,
    body: Option<Arc<dyn BodyDecoder<T>>>,
    max_body_size: usize,
}

impl<T: Bind + Serialize + DeserializeOwned> Binder<T> {
    /// Creates a binder with default settings: `.` delimiter, JSON body
    /// decoding, router path captures and the shared schema cache.
    pub fn new() -> Result<Self, SchemaError> {
        Self::builder().build()
    }

    /// Returns a builder preset with JSON body decoding.
    #[must_use]
    pub fn builder() -> BinderBuilder<'static, T> {
        BinderBuilder::new().json_body()
    }
}

impl<T: Bind> Binder<T> {
    /// The compiled schema this binder applies.
    #[must_use]
    pub fn schema(&self) -> &CompiledSchema<T> {
        &self.schema
    }

    /// Binds `request` into `target`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any stage. `target` may have been
    /// partially written by the stages that ran before it.
    pub fn bind(&self, request: &RequestContext, target: &mut T) -> Result<(), BindError> {
        let result = self.run(request, target);
        if let Err(ref error) = result {
            tracing::debug!(
                type_name = self.schema.type_name(),
                code = error.error_code(),
                field = error.field_label().unwrap_or("-"),
                error = %error,
                "request binding failed"
            );
        }
        result
    }

    /// Binds `request` into a fresh `T::default()`.
    ///
    /// # Errors
    ///
    /// See [`Binder::bind`].
    pub fn bind_default(&self, request: &RequestContext) -> Result<T, BindError>
    where
        T: Default,
    {
        let mut target = T::default();
        self.bind(request, &mut target)?;
        Ok(target)
    }

    fn run(&self, request: &RequestContext, target: &mut T) -> Result<(), BindError> {
        let mut scratch = RequestScratch::new(request);

        self.bind_body(request, target)?;
        self.bind_query(&mut scratch, target)?;
        self.bind_path(request, target)?;
        self.bind_headers(request, target)?;
        self.bind_cookies(&mut scratch, target)
    }

    fn bind_body(&self, request: &RequestContext, target: &mut T) -> Result<(), BindError> {
        let Some(decoder) = &self.body else {
            return Ok(());
        };
        if !decoder.accepts(request) {
            return Ok(());
        }

        let body = request.body();
        if body.len() > self.max_body_size {
            return Err(BindError::PayloadTooLarge {
                max: self.max_body_size,
                actual: body.len(),
            });
        }
        if is_blank(body) {
            tracing::trace!("skipping empty request body");
            return Ok(());
        }

        decoder
            .decode(body, target)
            .map_err(|source| BindError::BodyDecode { source })
    }

    fn bind_query(&self, scratch: &mut RequestScratch<'_>, target: &mut T) -> Result<(), BindError> {
        let bindings = self.schema.fields(SourceKind::Query);
        if bindings.is_empty() {
            return Ok(());
        }

        for (key, raw) in scratch.query().iter() {
            let Some(binding) = bindings.get(key) else {
                tracing::trace!(key, "ignoring unknown query parameter");
                continue;
            };
            let values: Values<'_> = raw.iter().map(String::as_str).collect();
            apply(binding, target, SourceKind::Query, key, &values)?;
        }
        Ok(())
    }

    fn bind_path(&self, request: &RequestContext, target: &mut T) -> Result<(), BindError> {
        for (name, binding) in self.schema.fields(SourceKind::Path) {
            match self.path_lookup.lookup(request, name) {
                Some(value) => apply(binding, target, SourceKind::Path, name, &[value])?,
                None => tracing::trace!(name = %name, "path parameter absent"),
            }
        }
        Ok(())
    }

    fn bind_headers(&self, request: &RequestContext, target: &mut T) -> Result<(), BindError> {
        let bindings = self.schema.fields(SourceKind::Header);
        if bindings.is_empty() {
            return Ok(());
        }

        let headers = request.headers();
        for name in headers.keys() {
            let Some(binding) = bindings.get(name.as_str()) else {
                tracing::trace!(header = %name, "ignoring unbound header");
                continue;
            };
            let values = headers
                .get_all(name)
                .iter()
                .map(|value| value.to_str())
                .collect::<Result<Values<'_>, _>>()
                .map_err(|_| {
                    BindError::field(
                        binding.label(),
                        SourceKind::Header,
                        name.as_str(),
                        SetError::NonTextValue,
                    )
                })?;
            apply(binding, target, SourceKind::Header, name.as_str(), &values)?;
        }
        Ok(())
    }

    fn bind_cookies(
        &self,
        scratch: &mut RequestScratch<'_>,
        target: &mut T,
    ) -> Result<(), BindError> {
        let bindings = self.schema.fields(SourceKind::Cookie);
        if bindings.is_empty() {
            return Ok(());
        }

        let cookies = scratch.cookies();
        for (name, binding) in bindings {
            let Some(value) = cookies.get(name) else {
                return Err(BindError::MissingCookie {
                    name: name.clone(),
                    label: binding.label().to_string(),
                });
            };
            apply(binding, target, SourceKind::Cookie, name, &[value])?;
        }
        Ok(())
    }
}

fn apply<T>(
    binding: &FieldBinding<T>,
    target: &mut T,
    source_kind: SourceKind,
    key: &str,
    values: &[&str],
) -> Result<(), BindError> {
    binding
        .apply(target, values)
        .map_err(|cause| BindError::field(binding.label(), source_kind, key, cause))
}

impl<T> Clone for Binder<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            path_lookup: Arc::clone(&self.path_lookup),
            body: self.body.clone(),
            max_body_size: self.max_body_size,
        }
    }
}

impl<T> fmt::Debug for Binder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("type_name", &self.schema.type_name())
            .field("delimiter", &self.schema.delimiter())
            .field("decodes_body", &self.body.is_some())
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

/// Per-call views of the request that are parsed at most once, and only
/// when a stage needs them.
struct RequestScratch<'r> {
    request: &'r RequestContext,
    query: Option<QueryValues>,
    cookies: Option<Cookies>,
}

impl<'r> RequestScratch<'r> {
    fn new(request: &'r RequestContext) -> Self {
        Self {
            request,
            query: None,
            cookies: None,
        }
    }

    fn query(&mut self) -> &QueryValues {
        let request = self.request;
        self.query
            .get_or_insert_with(|| QueryValues::parse(request.query_string().unwrap_or("")))
    }

    fn cookies(&mut self) -> &Cookies {
        let request = self.request;
        self.cookies
            .get_or_insert_with(|| Cookies::from_headers(request.headers()))
    }
}

/// Builder for [`Binder`].
///
/// # Example
///
/// ```rust
/// use reqbind::{Bind, BinderBuilder, RequestContext, SchemaCache};
///
/// #[derive(Bind, Default)]
/// struct Filter {
///     #[bind(query)]
///     page: Page,
/// }
///
/// #[derive(Bind, Default)]
/// struct Page {
///     size: u32,
/// }
///
/// let cache = SchemaCache::new();
/// let binder = BinderBuilder::<Filter>::new()
///     .delimiter("_")
///     .cache(&cache)
///     .build()
///     .unwrap();
///
/// let request = RequestContext::builder().uri_str("/?page_size=50").build();
/// assert_eq!(binder.bind_default(&request).unwrap().page.size, 50);
/// ```
pub struct BinderBuilder<'c, T> {
    delimiter: String,
    max_body_size: usize,
    path_lookup: Arc<dyn PathLookup>,
    body: Option<Arc<dyn BodyDecoder<T>>>,
    cache: &'c SchemaCache,
}

impl<T: Bind> BinderBuilder<'static, T> {
    /// Creates a builder without body decoding, using the shared schema
    /// cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            path_lookup: Arc::new(RouterParams),
            body: None,
            cache: SchemaCache::shared(),
        }
    }
}

impl<T: Bind> Default for BinderBuilder<'static, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'c, T: Bind> BinderBuilder<'c, T> {
    /// Sets the separator used to join nested field names.
    #[must_use]
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Sets the largest body the body stage will decode.
    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Sets how path parameters are resolved.
    #[must_use]
    pub fn path_lookup(mut self, lookup: impl PathLookup + 'static) -> Self {
        self.path_lookup = Arc::new(lookup);
        self
    }

    /// Sets the body decoder.
    #[must_use]
    pub fn body_decoder(mut self, decoder: impl BodyDecoder<T> + 'static) -> Self {
        self.body = Some(Arc::new(decoder));
        self
    }

    /// Decodes `application/json` bodies with `serde_json`.
    #[must_use]
    pub fn json_body(self) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        self.body_decoder(JsonBody)
    }

    /// Skips the body stage entirely.
    #[must_use]
    pub fn without_body(mut self) -> Self {
        self.body = None;
        self
    }

    /// Applies a [`BinderConfig`].
    ///
    /// `decode_json_body = false` removes any body decoder. Enabling JSON
    /// decoding needs a serde target, so `true` keeps the builder's
    /// current decoder; use [`BinderBuilder::json_body`] to add one.
    #[must_use]
    pub fn config(mut self, config: &BinderConfig) -> Self {
        self.delimiter.clone_from(&config.delimiter);
        self.max_body_size = config.max_body_size;
        if !config.decode_json_body {
            self.body = None;
        }
        self
    }

    /// Compiles through `cache` instead of the shared cache.
    #[must_use]
    pub fn cache<'d>(self, cache: &'d SchemaCache) -> BinderBuilder<'d, T> {
        BinderBuilder {
            delimiter: self.delimiter,
            max_body_size: self.max_body_size,
            path_lookup: self.path_lookup,
            body: self.body,
            cache,
        }
    }

    /// Compiles the schema (or fetches it from the cache) and builds the
    /// binder.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if `T` cannot be compiled with the chosen
    /// delimiter.
    pub fn build(self) -> Result<Binder<T>, SchemaError> {
        let schema = self.cache.get_or_compile::<T>(&self.delimiter)?;
        Ok(Binder {
            schema,
            path_lookup: self.path_lookup,
            body: self.body,
            max_body_size: self.max_body_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::NoPathParams;
    use crate::schema::{FieldDecl, RecordFields};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Account {
        id: u64,
        name: String,
        tags: Vec<String>,
        token: String,
        session: String,
    }

    impl Bind for Account {
        const TYPE_NAME: &'static str = "Account";

        fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>) {
            fields.field::<u64>(FieldDecl::new("id", 0).source(SourceKind::Path, "id"), |s| {
                &mut s.id
            });
            fields.field::<String>(FieldDecl::new("name", 1), |s| &mut s.name);
            fields.field::<Vec<String>>(FieldDecl::new("tags", 2).source(SourceKind::Header, "X-Tag"), |s| {
                &mut s.tags
            });
            fields.field::<String>(
                FieldDecl::new("token", 3).source(SourceKind::Header, "Authorization"),
                |s| &mut s.token,
            );
            fields.field::<String>(
                FieldDecl::new("session", 4).source(SourceKind::Cookie, "sid"),
                |s| &mut s.session,
            );
        }
    }

    fn binder() -> Binder<Account> {
        static CACHE: std::sync::OnceLock<SchemaCache> = std::sync::OnceLock::new();
        Binder::builder()
            .cache(CACHE.get_or_init(SchemaCache::new))
            .build()
            .unwrap()
    }

    #[test]
    fn test_binds_every_source() {
        let request = RequestContext::builder()
            .uri_str("/accounts/7?name=alice&unknown=1")
            .path_param("id", "7")
            .header("x-tag", "a")
            .header("X-Tag", "b")
            .header("authorization", "Bearer t")
            .header("cookie", "sid=s1")
            .build();

        let account = binder().bind_default(&request).unwrap();

        assert_eq!(account.id, 7);
        assert_eq!(account.name, "alice");
        assert_eq!(account.tags, vec!["a", "b"]);
        assert_eq!(account.token, "Bearer t");
        assert_eq!(account.session, "s1");
    }

    #[test]
    fn test_missing_cookie_fails_after_other_stages() {
        let request = RequestContext::builder()
            .uri_str("/?name=bob")
            .build();
        let mut account = Account::default();

        let err = binder().bind(&request, &mut account).unwrap_err();

        assert!(matches!(
            err,
            BindError::MissingCookie { ref name, ref label } if name == "sid" && label == "Account.session"
        ));
        assert_eq!(account.name, "bob");
    }

    #[test]
    fn test_path_parse_error_is_labelled() {
        let request = RequestContext::builder()
            .path_param("id", "seven")
            .header("cookie", "sid=s1")
            .build();

        let err = binder().bind_default(&request).unwrap_err();

        assert_eq!(err.field_label(), Some("Account.id"));
        assert!(matches!(
            err,
            BindError::Field {
                source_kind: SourceKind::Path,
                ..
            }
        ));
    }

    #[test]
    fn test_non_text_header_is_rejected() {
        let mut request = RequestContext::builder()
            .header("cookie", "sid=s1")
            .build();
        let mut headers = request.headers().clone();
        headers.insert(
            "authorization",
            http::HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap(),
        );
        request = RequestContext::new(
            request.uri().clone(),
            headers,
            request.body().clone(),
            request.path_params().clone(),
        );

        let err = binder().bind_default(&request).unwrap_err();

        assert_eq!(err.set_error(), Some(&SetError::NonTextValue));
        assert_eq!(err.field_label(), Some("Account.token"));
    }

    #[test]
    fn test_json_body_then_query_override() {
        let request = RequestContext::builder()
            .uri_str("/?name=query")
            .header("content-type", "application/json")
            .header("cookie", "sid=s1")
            .body(r#"{"name": "body", "token": "from-body"}"#)
            .build();

        let account = binder().bind_default(&request).unwrap();

        assert_eq!(account.name, "query");
        assert_eq!(account.token, "from-body");
    }

    #[test]
    fn test_body_ignored_without_json_content_type() {
        let request = RequestContext::builder()
            .header("content-type", "text/plain")
            .header("cookie", "sid=s1")
            .body(r#"{"name": "body"}"#)
            .build();

        let account = binder().bind_default(&request).unwrap();
        assert_eq!(account.name, "");
    }

    #[test]
    fn test_malformed_body_stops_binding() {
        let request = RequestContext::builder()
            .uri_str("/?name=query")
            .header("content-type", "application/json")
            .body("{oops")
            .build();
        let mut account = Account::default();

        let err = binder().bind(&request, &mut account).unwrap_err();

        assert_eq!(err.error_code(), "DESERIALIZATION_FAILED");
        assert_eq!(account.name, "");
    }

    #[test]
    fn test_blank_body_is_skipped() {
        let request = RequestContext::builder()
            .header("content-type", "application/json")
            .header("cookie", "sid=s1")
            .body("  \n")
            .build();

        assert!(binder().bind_default(&request).is_ok());
    }

    #[test]
    fn test_body_size_limit() {
        let cache = SchemaCache::new();
        let binder = Binder::<Account>::builder()
            .max_body_size(8)
            .cache(&cache)
            .build()
            .unwrap();
        let request = RequestContext::builder()
            .header("content-type", "application/json")
            .body(r#"{"name": "too long"}"#)
            .build();

        let err = binder.bind_default(&request).unwrap_err();
        assert!(matches!(err, BindError::PayloadTooLarge { max: 8, .. }));
    }

    #[test]
    fn test_config_can_disable_body_and_path() {
        let cache = SchemaCache::new();
        let config = BinderConfig {
            decode_json_body: false,
            ..BinderConfig::default()
        };
        let binder = Binder::<Account>::builder()
            .config(&config)
            .path_lookup(NoPathParams)
            .cache(&cache)
            .build()
            .unwrap();
        let request = RequestContext::builder()
            .header("content-type", "application/json")
            .header("cookie", "sid=s1")
            .path_param("id", "3")
            .body(r#"{"name": "body"}"#)
            .build();

        let account = binder.bind_default(&request).unwrap();

        assert_eq!(account.id, 0);
        assert_eq!(account.name, "");
    }

    #[test]
    fn test_builders_share_cached_schema() {
        let cache = SchemaCache::new();
        let a = Binder::<Account>::builder().cache(&cache).build().unwrap();
        let b = Binder::<Account>::builder().cache(&cache).build().unwrap();

        assert!(std::ptr::eq(a.schema(), b.schema()));
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_request_scratch_parses_once() {
        let request = RequestContext::builder()
            .uri_str("/?a=1")
            .header("cookie", "c=2")
            .build();
        let mut scratch = RequestScratch::new(&request);

        assert_eq!(scratch.query().get("a"), Some("1"));
        assert_eq!(scratch.cookies().get("c"), Some("2"));
        assert!(scratch.query.is_some());
        assert!(scratch.cookies.is_some());
    }
}
