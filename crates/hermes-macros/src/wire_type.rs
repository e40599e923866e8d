//! `#[derive(WireType)]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, Data, DeriveInput, Fields};

use crate::serde_attrs::{unraw, SerdeAttrs};

/// Expands the derive for structs with named fields, newtype structs and
/// unit-only enums.
pub fn expand_wire_type(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let container = SerdeAttrs::from_attrs(&input.attrs)?;

    let (shape, required) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => {
                let mut properties = Vec::new();
                for field in &fields.named {
                    let attrs = SerdeAttrs::from_attrs(&field.attrs)?;
                    if attrs.skip {
                        continue;
                    }
                    let Some(ident) = &field.ident else { continue };
                    let name = attrs.rename.unwrap_or_else(|| {
                        let name = unraw(ident);
                        container
                            .rename_all
                            .map_or(name.clone(), |rule| rule.apply_to_field(&name))
                    });
                    let ty = &field.ty;
                    properties.push(quote! {
                        ::hermes::__private::PropertyShape::of::<#ty>(#name)
                    });
                }
                (
                    quote! {
                        ::hermes::__private::TypeShape::Structured(::std::vec![#(#properties),*])
                    },
                    quote!(true),
                )
            }
            Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                let inner = &fields.unnamed[0].ty;
                (
                    quote!(<#inner as ::hermes::__private::WireType>::shape()),
                    quote!(<#inner as ::hermes::__private::WireType>::REQUIRED),
                )
            }
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "WireType can be derived for structs with named fields or a single unnamed field",
                ))
            }
        },
        Data::Enum(data) => {
            let mut variants = Vec::new();
            for variant in &data.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(syn::Error::new(
                        variant.span(),
                        "WireType can only be derived for enums whose variants carry no data",
                    ));
                }
                let attrs = SerdeAttrs::from_attrs(&variant.attrs)?;
                if attrs.skip {
                    continue;
                }
                let name = attrs.rename.unwrap_or_else(|| {
                    let name = unraw(&variant.ident);
                    container
                        .rename_all
                        .map_or(name.clone(), |rule| rule.apply_to_variant(&name))
                });
                variants.push(name);
            }
            (
                quote! {
                    ::hermes::__private::TypeShape::Scalar(
                        ::hermes::__private::ScalarKind::Enum(::std::vec![
                            #(::std::string::String::from(#variants)),*
                        ])
                    )
                },
                quote!(true),
            )
        }
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "WireType cannot be derived for unions",
            ))
        }
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::hermes::__private::WireType for #ident #ty_generics #where_clause {
            const REQUIRED: bool = #required;

            fn shape() -> ::hermes::__private::TypeShape {
                #shape
            }

            fn from_wire(
                value: ::hermes::__private::WireValue,
            ) -> ::hermes::__private::Outcome<Self> {
                ::hermes::__private::decode_json(value)
            }

            fn to_wire(&self) -> ::hermes::__private::Outcome<::hermes::__private::WireValue> {
                ::hermes::__private::encode_json(self)
            }
        }
    })
}
