//! Schema compilation.
//!
//! A target type is compiled once into a [`CompiledSchema`]: four lookup
//! tables, one per [`SourceKind`], from a bind key to a [`FieldBinding`].
//! Nested records are flattened into the same tables under dotted keys
//! (`name.first`), so binding a request never walks the type again.
//!
//! The walk itself is driven by the [`Bind`] implementation that
//! `#[derive(Bind)]` generates: it calls [`RecordFields::field`] once per
//! declared field, and each field type decides through [`BindField`] whether
//! it is a leaf (registers a setter) or a record (recurses).

use crate::field::{Bind, BindField};
use crate::value::{parse_from_str, ParseText};
use crate::{SchemaError, SetError, SourceKind};
use indexmap::IndexMap;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// Default separator between the segments of a dotted bind key.
pub const DEFAULT_DELIMITER: &str = ".";

/// Writes textual values into one field of the root value `R`.
pub(crate) type Setter<R> = Arc<dyn Fn(&mut R, &[&str]) -> Result<(), SetError> + Send + Sync>;

/// Projects the root value `R` onto one of its (possibly nested) fields.
type Accessor<R, F> = Arc<dyn Fn(&mut R) -> &mut F + Send + Sync>;

fn accessor<R, F, C>(project: C) -> Accessor<R, F>
where
    C: Fn(&mut R) -> &mut F + Send + Sync + 'static,
{
    Arc::new(project)
}

fn identity<R>(root: &mut R) -> &mut R {
    root
}

/// Static description of one declared field, emitted by the derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    ident: &'static str,
    index: usize,
    source: SourceKind,
    name: &'static str,
}

impl FieldDecl {
    /// Declares field `ident` at position `index`, bound from the query
    /// string under its own name.
    #[must_use]
    pub const fn new(ident: &'static str, index: usize) -> Self {
        Self {
            ident,
            index,
            source: SourceKind::Query,
            name: ident,
        }
    }

    /// Binds the field from `source` under `name`.
    #[must_use]
    pub const fn source(mut self, source: SourceKind, name: &'static str) -> Self {
        self.source = source;
        self.name = name;
        self
    }

    /// The field's declared identifier.
    #[must_use]
    pub const fn ident(&self) -> &'static str {
        self.ident
    }

    /// The bind key segment for this field.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The source the field is bound from.
    #[must_use]
    pub const fn source_kind(&self) -> SourceKind {
        self.source
    }
}

/// Compiled binding for one leaf field.
pub struct FieldBinding<R> {
    label: String,
    location: Box<[usize]>,
    optional: bool,
    multiple: bool,
    set: Setter<R>,
}

impl<R> FieldBinding<R> {
    /// Diagnostic label, `DeclaringType.field`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Declared field positions from the root down to this field.
    #[must_use]
    pub fn location(&self) -> &[usize] {
        &self.location
    }

    /// Whether reaching the field goes through an `Option` that is
    /// allocated on first write.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the field takes every value of its key rather than the first.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Writes `values` into the field. No values leaves the field untouched.
    pub(crate) fn apply(&self, target: &mut R, values: &[&str]) -> Result<(), SetError> {
        if values.is_empty() {
            return Ok(());
        }
        (self.set)(target, values)
    }
}

impl<R> Clone for FieldBinding<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            location: self.location.clone(),
            optional: self.optional,
            multiple: self.multiple,
            set: Arc::clone(&self.set),
        }
    }
}

impl<R> fmt::Debug for FieldBinding<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("label", &self.label)
            .field("location", &self.location)
            .field("optional", &self.optional)
            .field("multiple", &self.multiple)
            .finish_non_exhaustive()
    }
}

/// Immutable binding tables for a target type.
///
/// Query, path and cookie keys are dotted field paths; header keys are the
/// lowercase form `http::HeaderName` uses.
pub struct CompiledSchema<R> {
    type_name: &'static str,
    delimiter: String,
    query: IndexMap<String, FieldBinding<R>>,
    path: IndexMap<String, FieldBinding<R>>,
    header: IndexMap<String, FieldBinding<R>>,
    cookie: IndexMap<String, FieldBinding<R>>,
}

impl<R: Bind> CompiledSchema<R> {
    /// Walks `R` and builds its binding tables.
    ///
    /// When two fields resolve to the same key within one source, the field
    /// declared last wins.
    pub fn compile(delimiter: &str) -> Result<Self, SchemaError> {
        if delimiter.is_empty() {
            return Err(SchemaError::EmptyDelimiter);
        }

        let mut builder = SchemaBuilder::new(R::TYPE_NAME, delimiter);
        {
            let mut fields = RecordFields {
                builder: &mut builder,
                access: accessor(identity::<R>),
                optional: false,
            };
            R::describe(&mut fields);
        }
        builder.finish()
    }
}

impl<R> CompiledSchema<R> {
    /// Name of the compiled root type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Delimiter used to join nested field names.
    #[must_use]
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The table for one source kind.
    #[must_use]
    pub fn fields(&self, source: SourceKind) -> &IndexMap<String, FieldBinding<R>> {
        match source {
            SourceKind::Query => &self.query,
            SourceKind::Path => &self.path,
            SourceKind::Header => &self.header,
            SourceKind::Cookie => &self.cookie,
        }
    }

    fn fields_mut(&mut self, source: SourceKind) -> &mut IndexMap<String, FieldBinding<R>> {
        match source {
            SourceKind::Query => &mut self.query,
            SourceKind::Path => &mut self.path,
            SourceKind::Header => &mut self.header,
            SourceKind::Cookie => &mut self.cookie,
        }
    }

    /// Looks up the binding registered under `key` for `source`.
    #[must_use]
    pub fn get(&self, source: SourceKind, key: &str) -> Option<&FieldBinding<R>> {
        self.fields(source).get(key)
    }

    /// Total number of bound leaf fields.
    #[must_use]
    pub fn len(&self) -> usize {
        SourceKind::ALL.iter().map(|&s| self.fields(s).len()).sum()
    }

    /// Returns true if no field is bound from any source.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> fmt::Debug for CompiledSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("type_name", &self.type_name)
            .field("delimiter", &self.delimiter)
            .field("query", &self.query)
            .field("path", &self.path)
            .field("header", &self.header)
            .field("cookie", &self.cookie)
            .finish()
    }
}

/// Accumulates bindings while a type is walked.
///
/// The dotted key and location of the field being visited live in buffers
/// that grow on the way down and are truncated on the way back up.
pub(crate) struct SchemaBuilder<R> {
    schema: CompiledSchema<R>,
    key: String,
    location: Vec<usize>,
    error: Option<SchemaError>,
}

impl<R> SchemaBuilder<R> {
    fn new(type_name: &'static str, delimiter: &str) -> Self {
        Self {
            schema: CompiledSchema {
                type_name,
                delimiter: delimiter.to_string(),
                query: IndexMap::new(),
                path: IndexMap::new(),
                header: IndexMap::new(),
                cookie: IndexMap::new(),
            },
            key: String::with_capacity(64),
            location: Vec::with_capacity(8),
            error: None,
        }
    }

    fn enter(&mut self, decl: &FieldDecl) -> usize {
        let mark = self.key.len();
        if !self.location.is_empty() {
            self.key.push_str(&self.schema.delimiter);
        }
        self.key.push_str(decl.name);
        self.location.push(decl.index);
        mark
    }

    fn leave(&mut self, mark: usize) {
        self.key.truncate(mark);
        self.location.pop();
    }

    fn fail(&mut self, error: SchemaError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn register(&mut self, source: SourceKind, binding: FieldBinding<R>) {
        let key = if source == SourceKind::Header {
            match http::HeaderName::from_bytes(self.key.as_bytes()) {
                Ok(name) => name.as_str().to_string(),
                Err(_) => {
                    let error = SchemaError::InvalidHeaderName {
                        label: binding.label,
                        name: self.key.clone(),
                    };
                    self.fail(error);
                    return;
                }
            }
        } else {
            self.key.clone()
        };

        let label = binding.label.clone();
        if let Some(previous) = self.schema.fields_mut(source).insert(key, binding) {
            tracing::trace!(
                key = %self.key,
                source = %source,
                previous = %previous.label,
                current = %label,
                "binding key overridden by later field"
            );
        }
    }

    fn finish(self) -> Result<CompiledSchema<R>, SchemaError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.schema),
        }
    }
}

/// Visitor over the fields of one record inside the root value `R`.
///
/// Generated [`Bind::describe`] implementations call one method per
/// declared field.
pub struct RecordFields<'a, R, N> {
    builder: &'a mut SchemaBuilder<R>,
    access: Accessor<R, N>,
    optional: bool,
}

impl<'a, R: 'static, N: Bind> RecordFields<'a, R, N> {
    fn with_site<F: 'static>(
        &mut self,
        decl: FieldDecl,
        project: fn(&mut N) -> &mut F,
        register: impl FnOnce(FieldSite<'_, R, F>),
    ) {
        let label = format!("{}.{}", N::TYPE_NAME, decl.ident);
        if decl.name.is_empty() {
            self.builder.fail(SchemaError::EmptyName {
                label,
                source_kind: decl.source,
            });
            return;
        }

        let outer = Arc::clone(&self.access);
        let access = accessor(move |root: &mut R| project(outer(root)));

        let mark = self.builder.enter(&decl);
        register(FieldSite {
            builder: &mut *self.builder,
            access,
            source: decl.source,
            label,
            optional: self.optional,
        });
        self.builder.leave(mark);
    }

    /// Visits a field whose type implements [`BindField`].
    pub fn field<F: BindField>(&mut self, decl: FieldDecl, project: fn(&mut N) -> &mut F) {
        self.with_site(decl, project, |site| F::register(site));
    }

    /// Visits a leaf field decoded through its [`FromStr`] implementation.
    pub fn parsed_field<F>(&mut self, decl: FieldDecl, project: fn(&mut N) -> &mut F)
    where
        F: FromStr + 'static,
        F::Err: Display,
    {
        self.with_site(decl, project, |site| site.parsed());
    }

    /// Visits an `Option<F>` field decoded through `F`'s [`FromStr`]
    /// implementation.
    pub fn parsed_optional_field<F>(
        &mut self,
        decl: FieldDecl,
        project: fn(&mut N) -> &mut Option<F>,
    ) where
        F: FromStr + 'static,
        F::Err: Display,
    {
        self.with_site(decl, project, |site| {
            site.optional()
                .leaf(false, |slot: &mut Option<F>, values: &[&str]| {
                    if let Some(text) = values.first() {
                        *slot = Some(parse_from_str(text)?);
                    }
                    Ok(())
                });
        });
    }

    /// Visits a `Vec<F>` field whose elements are decoded through `F`'s
    /// [`FromStr`] implementation.
    pub fn parsed_sequence_field<F>(&mut self, decl: FieldDecl, project: fn(&mut N) -> &mut Vec<F>)
    where
        F: FromStr + 'static,
        F::Err: Display,
    {
        self.with_site(decl, project, |site| {
            site.leaf(true, |slot: &mut Vec<F>, values: &[&str]| {
                *slot = values
                    .iter()
                    .map(|text| parse_from_str(text))
                    .collect::<Result<_, _>>()?;
                Ok(())
            });
        });
    }
}

/// The position of one field inside the root value `R`, handed to
/// [`BindField::register`].
pub struct FieldSite<'a, R, F> {
    builder: &'a mut SchemaBuilder<R>,
    access: Accessor<R, F>,
    source: SourceKind,
    label: String,
    optional: bool,
}

impl<'a, R: 'static, F: 'static> FieldSite<'a, R, F> {
    /// Marks the field as reached through a lazily allocated `Option`.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Narrows the site to a part of the field, such as the inside of an
    /// `Option`.
    pub fn project<G, P>(self, project: P) -> FieldSite<'a, R, G>
    where
        G: 'static,
        P: Fn(&mut F) -> &mut G + Send + Sync + 'static,
    {
        let outer = self.access;
        FieldSite {
            builder: self.builder,
            access: accessor(move |root: &mut R| project(outer(root))),
            source: self.source,
            label: self.label,
            optional: self.optional,
        }
    }

    /// Registers the field as a leaf with the given setter.
    ///
    /// A single-valued setter receives at least one value and should use the
    /// first; a `multiple` setter receives every value of the key.
    pub fn leaf<S>(self, multiple: bool, set: S)
    where
        S: Fn(&mut F, &[&str]) -> Result<(), SetError> + Send + Sync + 'static,
    {
        let access = self.access;
        let setter: Setter<R> = Arc::new(move |root: &mut R, values: &[&str]| {
            set(access(root), values)
        });
        let binding = FieldBinding {
            label: self.label,
            location: self.builder.location.clone().into_boxed_slice(),
            optional: self.optional,
            multiple,
            set: setter,
        };
        self.builder.register(self.source, binding);
    }

    /// Registers a scalar leaf parsed with [`ParseText`].
    pub fn scalar(self)
    where
        F: ParseText,
    {
        self.leaf(false, |slot: &mut F, values: &[&str]| {
            if let Some(text) = values.first() {
                *slot = F::parse_text(text)?;
            }
            Ok(())
        });
    }

    /// Registers a leaf decoded through the type's [`FromStr`]
    /// implementation.
    pub fn parsed(self)
    where
        F: FromStr,
        F::Err: Display,
    {
        self.leaf(false, |slot: &mut F, values: &[&str]| {
            if let Some(text) = values.first() {
                *slot = parse_from_str(text)?;
            }
            Ok(())
        });
    }

    /// Flattens a record field: its own fields are registered under this
    /// field's key.
    pub fn expand(self)
    where
        F: Bind,
    {
        let mut fields = RecordFields {
            builder: self.builder,
            access: self.access,
            optional: self.optional,
        };
        F::describe(&mut fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BindElement;

    #[derive(Debug, Default)]
    struct FullName {
        first: String,
        last: String,
    }

    impl Bind for FullName {
        const TYPE_NAME: &'static str = "FullName";

        fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>) {
            fields.field::<String>(FieldDecl::new("first", 0), |s| &mut s.first);
            fields.field::<String>(FieldDecl::new("last", 1), |s| &mut s.last);
        }
    }

    impl BindField for FullName {
        fn register<R: 'static>(site: FieldSite<'_, R, Self>) {
            site.expand();
        }
    }

    impl BindElement for FullName {
        fn parse_element(_text: &str) -> Result<Self, SetError> {
            Err(SetError::unsupported(Self::TYPE_NAME))
        }
    }

    #[derive(Debug, Default)]
    struct Input {
        name: FullName,
        alias: Option<FullName>,
        age: u8,
        tags: Vec<String>,
        trace: String,
        session: String,
        nicknames: Vec<FullName>,
    }

    impl Bind for Input {
        const TYPE_NAME: &'static str = "Input";

        fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>) {
            fields.field::<FullName>(FieldDecl::new("name", 0), |s| &mut s.name);
            fields.field::<Option<FullName>>(FieldDecl::new("alias", 1), |s| &mut s.alias);
            fields.field::<u8>(FieldDecl::new("age", 2), |s| &mut s.age);
            fields.field::<Vec<String>>(FieldDecl::new("tags", 3).source(SourceKind::Query, "tag"), |s| &mut s.tags);
            fields.field::<String>(
                FieldDecl::new("trace", 4).source(SourceKind::Header, "X-Trace-Id"),
                |s| &mut s.trace,
            );
            fields.field::<String>(
                FieldDecl::new("session", 5).source(SourceKind::Cookie, "sid"),
                |s| &mut s.session,
            );
            fields.field::<Vec<FullName>>(FieldDecl::new("nicknames", 6), |s| &mut s.nicknames);
        }
    }

    #[test]
    fn test_compile_flattens_nested_records() {
        let schema = CompiledSchema::<Input>::compile(".").unwrap();

        assert_eq!(schema.type_name(), "Input");
        let keys: Vec<_> = schema.fields(SourceKind::Query).keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "name.first",
                "name.last",
                "alias.first",
                "alias.last",
                "age",
                "tag",
                "nicknames"
            ]
        );
        assert_eq!(schema.len(), 9);
    }

    #[test]
    fn test_binding_metadata() {
        let schema = CompiledSchema::<Input>::compile(".").unwrap();

        let first = schema.get(SourceKind::Query, "name.first").unwrap();
        assert_eq!(first.label(), "FullName.first");
        assert_eq!(first.location(), &[0, 0]);
        assert!(!first.is_optional());

        let alias_last = schema.get(SourceKind::Query, "alias.last").unwrap();
        assert_eq!(alias_last.location(), &[1, 1]);
        assert!(alias_last.is_optional());

        let tags = schema.get(SourceKind::Query, "tag").unwrap();
        assert!(tags.is_multiple());
        assert_eq!(tags.label(), "Input.tags");
    }

    #[test]
    fn test_header_keys_are_lowercased() {
        let schema = CompiledSchema::<Input>::compile(".").unwrap();

        assert!(schema.get(SourceKind::Header, "x-trace-id").is_some());
        assert!(schema.get(SourceKind::Header, "X-Trace-Id").is_none());
        assert!(schema.get(SourceKind::Cookie, "sid").is_some());
    }

    #[test]
    fn test_custom_delimiter() {
        let schema = CompiledSchema::<Input>::compile("__").unwrap();

        assert!(schema.get(SourceKind::Query, "name__first").is_some());
        assert_eq!(schema.delimiter(), "__");
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        let err = CompiledSchema::<Input>::compile("").unwrap_err();
        assert_eq!(err, SchemaError::EmptyDelimiter);
    }

    #[test]
    fn test_setters_write_through_accessors() {
        let schema = CompiledSchema::<Input>::compile(".").unwrap();
        let mut input = Input::default();

        schema
            .get(SourceKind::Query, "name.last")
            .unwrap()
            .apply(&mut input, &["Doe"])
            .unwrap();
        schema
            .get(SourceKind::Query, "tag")
            .unwrap()
            .apply(&mut input, &["a", "b"])
            .unwrap();

        assert_eq!(input.name.last, "Doe");
        assert_eq!(input.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_optional_record_allocated_on_write_only() {
        let schema = CompiledSchema::<Input>::compile(".").unwrap();
        let binding = schema.get(SourceKind::Query, "alias.first").unwrap();
        let mut input = Input::default();

        binding.apply(&mut input, &[]).unwrap();
        assert!(input.alias.is_none());

        binding.apply(&mut input, &["Johnny"]).unwrap();
        assert_eq!(input.alias.as_ref().unwrap().first, "Johnny");
        assert_eq!(input.alias.as_ref().unwrap().last, "");
    }

    #[test]
    fn test_sequence_of_records_fails_lazily() {
        let schema = CompiledSchema::<Input>::compile(".").unwrap();
        let binding = schema.get(SourceKind::Query, "nicknames").unwrap();
        let mut input = Input::default();

        binding.apply(&mut input, &[]).unwrap();
        let err = binding.apply(&mut input, &["x"]).unwrap_err();
        assert_eq!(err, SetError::unsupported("FullName"));
    }

    struct Colliding {
        a: String,
        b: String,
    }

    impl Bind for Colliding {
        const TYPE_NAME: &'static str = "Colliding";

        fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>) {
            fields.field::<String>(FieldDecl::new("a", 0).source(SourceKind::Query, "x"), |s| &mut s.a);
            fields.field::<String>(FieldDecl::new("b", 1).source(SourceKind::Query, "x"), |s| &mut s.b);
        }
    }

    #[test]
    fn test_last_registered_wins_on_collision() {
        let schema = CompiledSchema::<Colliding>::compile(".").unwrap();

        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get(SourceKind::Query, "x").unwrap().label(), "Colliding.b");

        let mut value = Colliding {
            a: String::new(),
            b: String::new(),
        };
        schema
            .get(SourceKind::Query, "x")
            .unwrap()
            .apply(&mut value, &["v"])
            .unwrap();
        assert_eq!(value.a, "");
        assert_eq!(value.b, "v");
    }

    struct BadHeader {
        value: String,
    }

    impl Bind for BadHeader {
        const TYPE_NAME: &'static str = "BadHeader";

        fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>) {
            fields.field::<String>(
                FieldDecl::new("value", 0).source(SourceKind::Header, "not a header"),
                |s| &mut s.value,
            );
        }
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let err = CompiledSchema::<BadHeader>::compile(".").unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidHeaderName {
                label: "BadHeader.value".to_string(),
                name: "not a header".to_string(),
            }
        );
    }

    struct EmptyName {
        value: String,
    }

    impl Bind for EmptyName {
        const TYPE_NAME: &'static str = "EmptyName";

        fn describe<R: 'static>(fields: &mut RecordFields<'_, R, Self>) {
            fields.field::<String>(
                FieldDecl::new("value", 0).source(SourceKind::Path, ""),
                |s| &mut s.value,
            );
        }
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = CompiledSchema::<EmptyName>::compile(".").unwrap_err();
        assert!(matches!(
            err,
            SchemaError::EmptyName {
                source_kind: SourceKind::Path,
                ..
            }
        ));
    }
}
