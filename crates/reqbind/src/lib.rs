//! # reqbind
//!
//! Binds the parts of an HTTP request into a typed struct.
//!
//! A target type declares, per field, where its value comes from: the query
//! string, a path parameter, a header or a cookie. `#[derive(Bind)]` turns
//! those declarations into a field table, which is compiled once into a
//! [`CompiledSchema`] and cached. Binding a request then walks the request's
//! containers and writes each matched value through a precomputed setter.
//!
//! ## Sources
//!
//! | Attribute | Source | Missing value |
//! |-----------|--------|---------------|
//! | `#[bind(query = "q")]` | Query string | Field left as is |
//! | `#[bind(path = "id")]` | [`PathLookup`] | Field left as is |
//! | `#[bind(header = "X-Id")]` | Headers | Field left as is |
//! | `#[bind(cookie = "sid")]` | `Cookie` header | [`BindError::MissingCookie`] |
//! | *(none)* | Query string, under the field's name | Field left as is |
//!
//! Nested records are flattened into dotted keys: a `name: FullName` field
//! with `first` and `last` binds from `name.first` and `name.last`.
//!
//! ## Example
//!
//! ```rust
//! use reqbind::{Bind, Binder, RequestContext};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Bind, Serialize, Deserialize, Default)]
//! struct FullName {
//!     first: String,
//!     last: String,
//! }
//!
//! #[derive(Bind, Serialize, Deserialize, Default)]
//! struct CreateUser {
//!     #[bind(query = "name")]
//!     name: FullName,
//!     #[bind(path = "org")]
//!     org: String,
//!     #[bind(header = "X-Request-Id")]
//!     request_id: Option<String>,
//!     #[bind(cookie = "session")]
//!     session: String,
//!     tags: Vec<String>,
//! }
//!
//! let binder = Binder::<CreateUser>::new().unwrap();
//! let request = RequestContext::builder()
//!     .uri_str("/orgs/acme/users?name.first=Ada&name.last=Lovelace&tags=a&tags=b")
//!     .path_param("org", "acme")
//!     .header("cookie", "session=s3cr3t")
//!     .build();
//!
//! let input = binder.bind_default(&request).unwrap();
//! assert_eq!(input.name.first, "Ada");
//! assert_eq!(input.org, "acme");
//! assert_eq!(input.request_id, None);
//! assert_eq!(input.tags, vec!["a", "b"]);
//! ```
//!
//! ## Pipeline
//!
//! [`Binder::bind`] runs body → query → path → header → cookie. A JSON body
//! is decoded first into the target, overwriting only the members it
//! carries; later stages overwrite the fields they bind. The first error ends the call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod binder;
mod body;
mod cache;
mod config;
mod context;
mod cookie;
mod error;
mod field;
mod params;
mod path;
mod query;
mod schema;
mod value;

pub use binder::{Binder, BinderBuilder};
pub use body::{BodyDecoder, JsonBody, DEFAULT_MAX_BODY_SIZE};
pub use cache::SchemaCache;
pub use config::BinderConfig;
pub use context::{RequestContext, RequestContextBuilder};
pub use cookie::Cookies;
pub use error::{BindError, ConfigError, SchemaError, SetError, SourceKind};
pub use field::{Bind, BindElement, BindField};
pub use params::Params;
pub use path::{NoPathParams, PathLookup, RouterParams};
pub use query::QueryValues;
pub use schema::{CompiledSchema, FieldBinding, FieldDecl, FieldSite, RecordFields, DEFAULT_DELIMITER};
pub use value::{parse_from_str, ParseText};

pub use reqbind_macros::Bind;
