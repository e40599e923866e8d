//! `#[contract]` expansion.
//!
//! For `trait UserContract` the attribute emits:
//! - the trait itself, with every endpoint's future required to be `Send`
//! - `UserContractApi`, which records the signature
//! - `UserContractService<S>`, the server-side adapter for implementors
//! - `UserContractClient`, which forwards each endpoint to the client engine

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_quote, spanned::Spanned, FnArg, ItemTrait, ReturnType, TraitItem, TraitItemFn,
    TypeParamBound,
};

use crate::parse::{ContractAttrs, ContractMethod};

/// Expands `#[contract(...)]` on a trait.
pub fn expand_contract(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let attrs: ContractAttrs = syn::parse2(attr)?;
    let mut item: ItemTrait = syn::parse2(item)?;

    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(
            item.generics.span(),
            "contract traits cannot be generic",
        ));
    }

    let methods = item
        .items
        .iter()
        .filter_map(|item| match item {
            TraitItem::Fn(method) => Some(method),
            _ => None,
        })
        .map(ContractMethod::parse)
        .collect::<syn::Result<Vec<_>>>()?;

    rewrite_trait(&mut item, &methods);

    let api = api_type(&item, &attrs, &methods);
    let service = service_type(&item, &methods);
    let client = client_type(&item, &methods);
    Ok(quote! {
        #item
        #api
        #service
        #client
    })
}

/// Adds the `Send + Sync + 'static` supertraits, turns each endpoint into a
/// method returning a `Send` future and strips the helper attributes.
fn rewrite_trait(item: &mut ItemTrait, methods: &[ContractMethod]) {
    let has_bound = |name: &str| {
        item.supertraits.iter().any(|bound| match bound {
            TypeParamBound::Trait(t) => t.path.segments.last().is_some_and(|s| s.ident == name),
            _ => false,
        })
    };
    let mut extra: Vec<TypeParamBound> = Vec::new();
    if !has_bound("Send") {
        extra.push(parse_quote!(::core::marker::Send));
    }
    if !has_bound("Sync") {
        extra.push(parse_quote!(::core::marker::Sync));
    }
    if !item
        .supertraits
        .iter()
        .any(|bound| matches!(bound, TypeParamBound::Lifetime(l) if l.ident == "static"))
    {
        extra.push(parse_quote!('static));
    }
    if item.colon_token.is_none() && !extra.is_empty() {
        item.colon_token = Some(Default::default());
    }
    item.supertraits.extend(extra);

    let mut parsed_methods = methods.iter();
    for trait_item in &mut item.items {
        let TraitItem::Fn(method) = trait_item else {
            continue;
        };
        let Some(parsed) = parsed_methods.next() else {
            break;
        };
        method.attrs.retain(|a| !a.path().is_ident("operation"));
        for input in &mut method.sig.inputs {
            if let FnArg::Typed(typed) = input {
                typed.attrs.retain(|a| !a.path().is_ident("param"));
            }
        }
        if parsed.is_endpoint() {
            desugar_async(method);
        }
    }
}

fn desugar_async(method: &mut TraitItemFn) {
    let output = match &method.sig.output {
        ReturnType::Type(_, ty) => quote!(#ty),
        ReturnType::Default => quote!(()),
    };
    method.sig.asyncness = None;
    method.sig.output = parse_quote! {
        -> impl ::core::future::Future<Output = #output> + ::core::marker::Send
    };
    if let Some(body) = method.default.take() {
        method.default = Some(parse_quote!({ async move #body }));
    }
}

fn api_type(item: &ItemTrait, attrs: &ContractAttrs, methods: &[ContractMethod]) -> TokenStream {
    let vis = &item.vis;
    let trait_ident = &item.ident;
    let contract_name = trait_ident.to_string();
    let api = format_ident!("{}Api", trait_ident);
    let doc = format!("Recorded signature of [`{trait_ident}`].");

    let prefix = attrs.prefix.as_ref().map(|p| quote!(.prefix(#p)));
    let validate = attrs.validate;
    let authorize = attrs.authorize;

    let operations = methods.iter().map(|method| {
        let name = method.name.to_string();
        let mut chain = Vec::new();
        if !method.is_async {
            chain.push(quote!(.synchronous()));
        }
        if method.success.is_none() {
            chain.push(quote!(.not_outcome()));
        }
        for param in &method.params {
            let param_name = param.name.to_string();
            let ty = &param.ty;
            let default = param
                .default
                .as_ref()
                .map(|value| quote!(.with_default(::hermes::__private::serde_json::json!(#value))));
            chain.push(quote! {
                .param(::hermes::__private::ParameterSignature::of::<#ty>(#param_name) #default)
            });
        }
        if let Some(success) = method.success_type_name() {
            chain.push(quote!(.returns(#success)));
        }
        if let Some(verb) = &method.attrs.method {
            let verb = format_ident!("{}", verb);
            chain.push(quote!(.method(::hermes::__private::Method::#verb)));
        }
        if let Some(path) = &method.attrs.path {
            chain.push(quote!(.path(#path)));
        }
        if let Some(enabled) = method.attrs.validate {
            chain.push(quote!(.validate(#enabled)));
        }
        if let Some(enabled) = method.attrs.authorize {
            chain.push(quote!(.authorize(#enabled)));
        }
        quote! {
            .operation(::hermes::__private::OperationSignature::new(#name) #(#chain)*)
        }
    });

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Copy, Default)]
        #vis struct #api;

        impl ::hermes::__private::Contract for #api {
            fn signature() -> ::hermes::__private::ContractSignature {
                ::hermes::__private::ContractSignature::new(#contract_name)
                    #prefix
                    .validate(#validate)
                    .authorize(#authorize)
                    #(#operations)*
            }
        }
    }
}

fn service_type(item: &ItemTrait, methods: &[ContractMethod]) -> TokenStream {
    let vis = &item.vis;
    let trait_ident = &item.ident;
    let api = format_ident!("{}Api", trait_ident);
    let service = format_ident!("{}Service", trait_ident);
    let doc = format!("Serves an implementation of [`{trait_ident}`] through a dispatcher.");

    let arms = methods.iter().filter(|m| m.is_endpoint()).map(|method| {
        let name = &method.name;
        let operation = name.to_string();
        let decodes = method.params.iter().enumerate().map(|(index, param)| {
            let ident = &param.name;
            let ty = &param.ty;
            quote!(let #ident: #ty = args.decode::<#ty>(#index)?;)
        });
        let call_args = method.params.iter().map(|param| &param.name);
        quote! {
            #operation => {
                #(#decodes)*
                let call: ::hermes::__private::BoxedOutcome = ::std::boxed::Box::pin(async move {
                    ::hermes::__private::encode_success(self.inner.#name(#(#call_args),*).await)
                });
                ::std::result::Result::Ok(call)
            }
        }
    });

    quote! {
        #[doc = #doc]
        #vis struct #service<S> {
            inner: ::std::sync::Arc<S>,
        }

        impl<S: #trait_ident> #service<S> {
            /// Wraps an implementation.
            pub fn new(inner: S) -> Self {
                Self {
                    inner: ::std::sync::Arc::new(inner),
                }
            }

            /// Wraps a shared implementation.
            pub fn from_arc(inner: ::std::sync::Arc<S>) -> Self {
                Self { inner }
            }

            /// Returns the implementation.
            pub fn inner(&self) -> &::std::sync::Arc<S> {
                &self.inner
            }
        }

        impl<S: #trait_ident> ::hermes::__private::ContractService for #service<S> {
            type Contract = #api;

            fn invoke(
                self: ::std::sync::Arc<Self>,
                operation: &str,
                args: ::hermes::__private::BoundArguments,
            ) -> ::hermes::__private::BoxedOutcome {
                match <Self as ::hermes::__private::ContractService>::prepare(self, operation, args) {
                    ::std::result::Result::Ok(call) => call,
                    ::std::result::Result::Err(error) => {
                        ::std::boxed::Box::pin(async move { ::std::result::Result::Err(error) })
                    }
                }
            }

            #[allow(unused_mut, unused_variables)]
            fn prepare(
                self: ::std::sync::Arc<Self>,
                operation: &str,
                mut args: ::hermes::__private::BoundArguments,
            ) -> ::hermes::__private::Outcome<::hermes::__private::BoxedOutcome> {
                match operation {
                    #(#arms)*
                    other => ::std::result::Result::Err(
                        ::hermes::__private::ContractError::unexpected(
                            ::std::format!("unknown operation '{other}'"),
                        ),
                    ),
                }
            }
        }
    }
}

fn client_type(item: &ItemTrait, methods: &[ContractMethod]) -> TokenStream {
    let vis = &item.vis;
    let trait_ident = &item.ident;
    let api = format_ident!("{}Api", trait_ident);
    let client = format_ident!("{}Client", trait_ident);
    let doc = format!("Calls a remote [`{trait_ident}`] over HTTP.");

    let forwards = methods.iter().filter(|m| m.is_endpoint()).map(|method| {
        let name = &method.name;
        let operation = name.to_string();
        let success = method.success.as_ref();
        let params = method.params.iter().map(|param| {
            let ident = &param.name;
            let ty = &param.ty;
            quote!(#ident: #ty)
        });
        let count = method.params.len();
        let pushes = method.params.iter().map(|param| {
            let ident = &param.name;
            let param_name = ident.to_string();
            let ty = &param.ty;
            quote! {
                args.push(#param_name, <#ty as ::hermes::__private::WireType>::to_wire(&#ident)?);
            }
        });
        quote! {
            #[doc = ::std::concat!("Calls `", #operation, "` remotely.")]
            pub async fn #name(&self, #(#params),*) -> ::hermes::__private::Outcome<#success> {
                #[allow(unused_mut)]
                let mut args = ::hermes::__private::BoundArguments::with_capacity(#count);
                #(#pushes)*
                self.inner.invoke::<#api, #success>(#operation, args).await
            }
        }
    });

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone)]
        #vis struct #client {
            inner: ::hermes::__private::ContractClient,
        }

        impl #client {
            /// Wraps a client engine.
            pub fn new(inner: ::hermes::__private::ContractClient) -> Self {
                Self { inner }
            }

            /// Returns the client engine.
            pub fn engine(&self) -> &::hermes::__private::ContractClient {
                &self.inner
            }

            #(#forwards)*
        }
    }
}
