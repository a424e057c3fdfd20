//! Procedural macros for reqbind.
//!
//! This crate provides `#[derive(Bind)]`, which turns the `#[bind(...)]`
//! declarations on a struct into the field table reqbind compiles into a
//! binding schema. Use it through the `reqbind` crate, which re-exports it.
//!
//! # Macro Expansion
//!
//! For a struct with named fields the derive:
//!
//! 1. Reads each field's source (`query`, `path`, `header`, `cookie`)
//! 2. Emits a `Bind` impl visiting every field in declaration order
//! 3. Emits a `BindField` impl so the struct can be nested in other records
//! 4. Emits a `BindElement` impl that rejects the struct as a sequence
//!    element at bind time

mod derive;
mod parse;

use proc_macro::TokenStream;

/// Derives `reqbind::Bind` for a struct with named fields.
///
/// # Field attributes
///
/// - `query = "name"`, `path = "name"`, `header = "Name"`, `cookie = "name"`:
///   bind from that source under `name`. A bare key (`#[bind(header)]`)
///   uses the field's own name. With several sources the first of query,
///   path, header, cookie applies.
/// - `skip`: leave the field out of binding.
/// - `from_str`: decode the field (or the `T` of an `Option<T>` or `Vec<T>`)
///   with its `FromStr` implementation.
///
/// A field without a source binds from the query string under its own name.
///
/// # Container attributes
///
/// - `from_str`: bind the whole type as a single value through its
///   `FromStr` implementation, wherever it appears as a field.
///
/// # Example
///
/// ```rust,ignore
/// use reqbind::Bind;
///
/// #[derive(Bind, Default)]
/// struct GetOrder {
///     #[bind(path = "order_id")]
///     id: u64,
///     #[bind(header = "If-None-Match")]
///     etag: Option<String>,
///     #[bind(cookie = "session")]
///     session: String,
///     expand: Vec<String>,
/// }
/// ```
///
/// # Generated Code
///
/// The macro generates approximately:
///
/// ```rust,ignore
/// impl reqbind::Bind for GetOrder {
///     const TYPE_NAME: &'static str = "GetOrder";
///
///     fn describe<R: 'static>(fields: &mut reqbind::RecordFields<'_, R, Self>) {
///         fields.field::<u64>(
///             reqbind::FieldDecl::new("id", 0).source(reqbind::SourceKind::Path, "order_id"),
///             |record| &mut record.id,
///         );
///         // ...
///     }
/// }
/// ```
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    derive::expand_derive(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
