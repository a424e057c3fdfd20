//! `Bind` derive implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Ident};

use crate::parse::{BindFieldSpec, BindInput, Shape};

/// Expands `#[derive(Bind)]`.
pub fn expand_derive(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;

    let expanded = match BindInput::parse(input)? {
        BindInput::Record { ident, fields } => generate_record(&ident, &fields),
        BindInput::Parsed { ident } => generate_parsed(&ident),
    };

    Ok(expanded)
}

/// A record registers each field and is flattened into its parent when
/// nested. It cannot be a sequence element.
fn generate_record(ident: &Ident, fields: &[BindFieldSpec]) -> TokenStream {
    let type_name = ident.to_string();
    let visits = fields.iter().map(generate_visit);

    quote! {
        impl ::reqbind::Bind for #ident {
            const TYPE_NAME: &'static str = #type_name;

            #[allow(unused_variables)]
            fn describe<R: 'static>(fields: &mut ::reqbind::RecordFields<'_, R, Self>) {
                #(#visits)*
            }
        }

        impl ::reqbind::BindField for #ident {
            fn register<R: 'static>(site: ::reqbind::FieldSite<'_, R, Self>) {
                site.expand();
            }
        }

        impl ::reqbind::BindElement for #ident {
            fn parse_element(_text: &str) -> ::core::result::Result<Self, ::reqbind::SetError> {
                ::core::result::Result::Err(::reqbind::SetError::unsupported(
                    <Self as ::reqbind::Bind>::TYPE_NAME,
                ))
            }
        }
    }
}

/// One `RecordFields` call for a field.
fn generate_visit(field: &BindFieldSpec) -> TokenStream {
    let ident = &field.ident;
    let name = field.name();
    let index = field.index;
    let ty = &field.ty;

    let decl = match &field.source {
        Some((source, bind_name)) => {
            let variant = source.variant();
            quote! {
                ::reqbind::FieldDecl::new(#name, #index)
                    .source(::reqbind::SourceKind::#variant, #bind_name)
            }
        }
        None => quote! { ::reqbind::FieldDecl::new(#name, #index) },
    };
    let project = quote! { |record| &mut record.#ident };

    if !field.from_str {
        return quote! {
            fields.field::<#ty>(#decl, #project);
        };
    }

    match Shape::of(ty) {
        Shape::Plain => quote! {
            fields.parsed_field::<#ty>(#decl, #project);
        },
        Shape::Optional(inner) => quote! {
            fields.parsed_optional_field::<#inner>(#decl, #project);
        },
        Shape::Sequence(inner) => quote! {
            fields.parsed_sequence_field::<#inner>(#decl, #project);
        },
    }
}

/// A `from_str` type is a single leaf value, both as a field and as a
/// sequence element.
fn generate_parsed(ident: &Ident) -> TokenStream {
    quote! {
        impl ::reqbind::BindField for #ident {
            fn register<R: 'static>(site: ::reqbind::FieldSite<'_, R, Self>) {
                site.parsed();
            }
        }

        impl ::reqbind::BindElement for #ident {
            fn parse_element(text: &str) -> ::core::result::Result<Self, ::reqbind::SetError> {
                ::reqbind::parse_from_str(text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: TokenStream) -> String {
        expand_derive(input).unwrap().to_string()
    }

    #[test]
    fn test_expand_record() {
        let out = expand(quote! {
            struct Input {
                #[bind(query = "q")]
                search: String,
                age: u8,
            }
        });

        assert!(out.contains("impl :: reqbind :: Bind for Input"));
        assert!(out.contains("const TYPE_NAME : & 'static str = \"Input\""));
        assert!(out.contains("FieldDecl :: new (\"search\" , 0usize)"));
        assert!(out.contains("SourceKind :: Query , \"q\""));
        assert!(out.contains("FieldDecl :: new (\"age\" , 1usize)"));
        assert!(out.contains("fields . field :: < u8 >"));
        assert!(out.contains("site . expand ()"));
        assert!(out.contains("SetError :: unsupported"));
    }

    #[test]
    fn test_expand_from_str_field_shapes() {
        let out = expand(quote! {
            struct Input {
                #[bind(from_str)]
                addr: IpAddr,
                #[bind(from_str, header = "X-Forwarded-For")]
                forwarded: Option<IpAddr>,
                #[bind(from_str)]
                peers: Vec<IpAddr>,
            }
        });

        assert!(out.contains("fields . parsed_field :: < IpAddr >"));
        assert!(out.contains("fields . parsed_optional_field :: < IpAddr >"));
        assert!(out.contains("fields . parsed_sequence_field :: < IpAddr >"));
        assert!(out.contains("SourceKind :: Header , \"X-Forwarded-For\""));
    }

    #[test]
    fn test_expand_container_from_str() {
        let out = expand(quote! {
            #[bind(from_str)]
            struct Point {
                x: i32,
                y: i32,
            }
        });

        assert!(out.contains("site . parsed ()"));
        assert!(out.contains("parse_from_str (text)"));
        assert!(!out.contains(":: reqbind :: Bind for"));
    }

    #[test]
    fn test_expand_raw_identifier() {
        let out = expand(quote! {
            struct Input {
                r#type: String,
            }
        });

        assert!(out.contains("FieldDecl :: new (\"type\" , 0usize)"));
        assert!(out.contains("record . r#type"));
    }

    #[test]
    fn test_expand_rejects_enum() {
        let result = expand_derive(quote! {
            enum Input { A, B }
        });
        assert!(result.is_err());
    }
}
