//! Parsing utilities for the `Bind` derive.
//!
//! This module reads `#[bind(...)]` attributes and field types into a
//! [`BindInput`] that the expansion step turns into code.

use proc_macro2::Span;
use syn::{
    ext::IdentExt, punctuated::Punctuated, spanned::Spanned, Attribute, Data, DeriveInput, Expr,
    ExprLit, Fields, GenericArgument, Ident, Lit, Meta, PathArguments, Token, Type,
};

/// Request part a field binds from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Query,
    Path,
    Header,
    Cookie,
}

impl Source {
    /// Attribute keys in precedence order.
    const KEYS: [(&'static str, Source); 4] = [
        ("query", Source::Query),
        ("path", Source::Path),
        ("header", Source::Header),
        ("cookie", Source::Cookie),
    ];

    fn from_key(key: &str) -> Option<Self> {
        Self::KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, source)| *source)
    }

    fn rank(self) -> usize {
        match self {
            Source::Query => 0,
            Source::Path => 1,
            Source::Header => 2,
            Source::Cookie => 3,
        }
    }

    /// Variant name of `reqbind::SourceKind`.
    pub fn variant(self) -> Ident {
        let name = match self {
            Source::Query => "Query",
            Source::Path => "Path",
            Source::Header => "Header",
            Source::Cookie => "Cookie",
        };
        Ident::new(name, Span::call_site())
    }
}

/// How a field's type is shaped, as far as `#[bind(from_str)]` cares.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Any type other than the two below.
    Plain,
    /// `Option<T>`, with `T`.
    Optional(Type),
    /// `Vec<T>`, with `T`.
    Sequence(Type),
}

impl Shape {
    /// Classifies `ty` by its last path segment.
    pub fn of(ty: &Type) -> Self {
        let Type::Path(type_path) = ty else {
            return Shape::Plain;
        };
        let Some(segment) = type_path.path.segments.last() else {
            return Shape::Plain;
        };
        let PathArguments::AngleBracketed(args) = &segment.arguments else {
            return Shape::Plain;
        };
        if args.args.len() != 1 {
            return Shape::Plain;
        }
        let Some(GenericArgument::Type(inner)) = args.args.first() else {
            return Shape::Plain;
        };

        if segment.ident == "Option" {
            Shape::Optional(inner.clone())
        } else if segment.ident == "Vec" {
            Shape::Sequence(inner.clone())
        } else {
            Shape::Plain
        }
    }
}

/// Parsed `#[bind(...)]` attributes of one field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Declared sources with their explicit names (`None` for a bare key).
    pub sources: Vec<(Source, Option<String>)>,
    /// `#[bind(skip)]`
    pub skip: bool,
    /// `#[bind(from_str)]`
    pub from_str: bool,
}

impl FieldAttrs {
    /// Parses every `#[bind]` attribute in `attrs`.
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();

        for attr in attrs.iter().filter(|a| a.path().is_ident("bind")) {
            let meta_list = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

            for meta in meta_list {
                let ident = meta
                    .path()
                    .get_ident()
                    .ok_or_else(|| syn::Error::new(meta.path().span(), "expected identifier"))?
                    .to_string();

                match (&meta, ident.as_str()) {
                    (Meta::Path(_), "skip") => parsed.skip = true,
                    (Meta::Path(_), "from_str") => parsed.from_str = true,
                    (Meta::Path(_), key) if Source::from_key(key).is_some() => {
                        parsed.add_source(&meta, key, None)?;
                    }
                    (Meta::NameValue(nv), key) if Source::from_key(key).is_some() => {
                        let value = string_value(&nv.value)?;
                        parsed.add_source(&meta, key, Some(value))?;
                    }
                    _ => {
                        return Err(syn::Error::new(
                            meta.span(),
                            format!("unknown bind attribute: {ident}"),
                        ))
                    }
                }
            }
        }

        Ok(parsed)
    }

    fn add_source(&mut self, meta: &Meta, key: &str, name: Option<String>) -> syn::Result<()> {
        let Some(source) = Source::from_key(key) else {
            return Err(syn::Error::new(meta.span(), format!("unknown source: {key}")));
        };
        if self.sources.iter().any(|(s, _)| *s == source) {
            return Err(syn::Error::new(
                meta.span(),
                format!("duplicate bind source: {key}"),
            ));
        }
        self.sources.push((source, name));
        Ok(())
    }

    /// The source that takes effect: query, then path, then header, then
    /// cookie.
    pub fn effective_source(&self) -> Option<&(Source, Option<String>)> {
        self.sources.iter().min_by_key(|(source, _)| source.rank())
    }
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

/// A field that takes part in binding.
#[derive(Debug)]
pub struct BindFieldSpec {
    /// The field identifier, as declared.
    pub ident: Ident,
    /// Declared position in the struct.
    pub index: usize,
    /// The field type.
    pub ty: Type,
    /// Explicit source and bind name, or `None` for the query default.
    pub source: Option<(Source, String)>,
    /// Whether the field is decoded through `FromStr`.
    pub from_str: bool,
}

impl BindFieldSpec {
    /// The identifier without any `r#` prefix.
    pub fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

/// Parsed derive input.
#[derive(Debug)]
pub enum BindInput {
    /// A struct with named fields, bound field by field.
    Record {
        ident: Ident,
        fields: Vec<BindFieldSpec>,
    },
    /// A type marked `#[bind(from_str)]`, bound as a single value.
    Parsed { ident: Ident },
}

impl BindInput {
    /// Parses a `DeriveInput`.
    pub fn parse(input: DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "Bind cannot be derived for generic types",
            ));
        }

        let container = FieldAttrs::parse(&input.attrs)?;
        if container.skip || !container.sources.is_empty() {
            return Err(syn::Error::new(
                input.ident.span(),
                "only #[bind(from_str)] is allowed on a type",
            ));
        }
        if container.from_str {
            return Ok(Self::Parsed { ident: input.ident });
        }

        let named = match input.data {
            Data::Struct(data) => match data.fields {
                Fields::Named(named) => named,
                other => {
                    return Err(syn::Error::new(
                        other.span(),
                        "Bind can only be derived for structs with named fields",
                    ))
                }
            },
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "Bind can only be derived for structs with named fields",
                ))
            }
        };

        let mut fields = Vec::new();
        for (index, field) in named.named.into_iter().enumerate() {
            let attrs = FieldAttrs::parse(&field.attrs)?;
            if attrs.skip {
                continue;
            }
            let Some(ident) = field.ident else {
                continue;
            };

            let default_name = ident.unraw().to_string();
            let source = attrs
                .effective_source()
                .map(|(source, name)| (*source, name.clone().unwrap_or(default_name)));

            fields.push(BindFieldSpec {
                ident,
                index,
                ty: field.ty,
                source,
                from_str: attrs.from_str,
            });
        }

        Ok(Self::Record {
            ident: input.ident,
            fields,
        })
    }
}
