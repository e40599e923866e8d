//! Parsing of contract declarations.
//!
//! Everything here is syntactic: the attribute records what the declaration
//! says and leaves every naming convention to the scanner.

use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Expr, ExprLit, FnArg, GenericArgument, Ident, Lit, Meta, Pat, PatIdent,
    PathArguments, ReturnType, Token, TraitItemFn, Type,
};

/// HTTP verbs accepted in `#[operation(method = "...")]`.
const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

/// Arguments of `#[contract(...)]`.
#[derive(Debug, Default)]
pub struct ContractAttrs {
    /// Route prefix override.
    pub prefix: Option<String>,
    /// Contract-level validation toggle.
    pub validate: bool,
    /// Contract-level authorization toggle.
    pub authorize: bool,
}

impl Parse for ContractAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut attrs = Self::default();
        let metas: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in metas {
            let ident = meta_ident(&meta)?;
            match (ident.as_str(), &meta) {
                ("prefix", Meta::NameValue(nv)) => attrs.prefix = Some(lit_str(&nv.value)?),
                ("validate", _) => attrs.validate = flag(&meta)?,
                ("authorize", _) => attrs.authorize = flag(&meta)?,
                _ => {
                    return Err(syn::Error::new(
                        meta.span(),
                        format!("unknown contract attribute: {ident}"),
                    ))
                }
            }
        }
        Ok(attrs)
    }
}

/// Arguments of `#[operation(...)]` on a contract method.
#[derive(Debug, Default)]
pub struct OperationAttrs {
    /// Upper-case HTTP verb override.
    pub method: Option<String>,
    /// Route template override.
    pub path: Option<String>,
    /// Operation-level validation toggle.
    pub validate: Option<bool>,
    /// Operation-level authorization toggle.
    pub authorize: Option<bool>,
}

impl OperationAttrs {
    /// Collects every `#[operation(...)]` attribute of a method.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("operation")) {
            let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
            for meta in metas {
                let ident = meta_ident(&meta)?;
                match (ident.as_str(), &meta) {
                    ("method", Meta::NameValue(nv)) => {
                        let method = lit_str(&nv.value)?.to_ascii_uppercase();
                        if !METHODS.contains(&method.as_str()) {
                            return Err(syn::Error::new(
                                nv.value.span(),
                                format!("unsupported HTTP method: {method}"),
                            ));
                        }
                        parsed.method = Some(method);
                    }
                    ("path", Meta::NameValue(nv)) => parsed.path = Some(lit_str(&nv.value)?),
                    ("validate", _) => parsed.validate = Some(flag(&meta)?),
                    ("authorize", _) => parsed.authorize = Some(flag(&meta)?),
                    _ => {
                        return Err(syn::Error::new(
                            meta.span(),
                            format!("unknown operation attribute: {ident}"),
                        ))
                    }
                }
            }
        }
        Ok(parsed)
    }
}

/// A declared parameter of an endpoint operation.
#[derive(Debug)]
pub struct ContractParam {
    /// Parameter name.
    pub name: Ident,
    /// Declared type.
    pub ty: Type,
    /// Value from `#[param(default = ...)]`.
    pub default: Option<Expr>,
}

impl ContractParam {
    fn from_fn_arg(arg: &FnArg) -> syn::Result<Self> {
        let FnArg::Typed(typed) = arg else {
            return Err(syn::Error::new(arg.span(), "unexpected receiver"));
        };
        let name = match typed.pat.as_ref() {
            Pat::Ident(PatIdent { ident, .. }) => ident.clone(),
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "contract parameters must be plain identifiers",
                ))
            }
        };

        let mut default = None;
        for attr in typed.attrs.iter().filter(|a| a.path().is_ident("param")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse::<Expr>()?);
                    Ok(())
                } else {
                    Err(meta.error("unknown param attribute"))
                }
            })?;
        }

        Ok(Self {
            name,
            ty: (*typed.ty).clone(),
            default,
        })
    }
}

/// A method of a contract trait.
#[derive(Debug)]
pub struct ContractMethod {
    /// Method name.
    pub name: Ident,
    /// Whether the method is `async`.
    pub is_async: bool,
    /// Success type, if the return shape is an outcome.
    pub success: Option<Type>,
    /// Parameters; empty for methods that are not endpoints.
    pub params: Vec<ContractParam>,
    /// Declarative overrides.
    pub attrs: OperationAttrs,
}

impl ContractMethod {
    /// Analyses one trait method.
    pub fn parse(method: &TraitItemFn) -> syn::Result<Self> {
        let sig = &method.sig;
        let is_async = sig.asyncness.is_some();
        let success = outcome_success(&sig.output);
        let attrs = OperationAttrs::from_attrs(&method.attrs)?;

        let mut parsed = Self {
            name: sig.ident.clone(),
            is_async,
            success,
            params: Vec::new(),
            attrs,
        };
        if !parsed.is_endpoint() {
            return Ok(parsed);
        }

        if !sig.generics.params.is_empty() {
            return Err(syn::Error::new(
                sig.generics.span(),
                "contract operations cannot be generic",
            ));
        }
        match sig.inputs.first() {
            Some(FnArg::Receiver(receiver))
                if receiver.reference.is_some() && receiver.mutability.is_none() => {}
            _ => {
                return Err(syn::Error::new(
                    sig.ident.span(),
                    "contract operations must take `&self`",
                ))
            }
        }

        parsed.params = sig
            .inputs
            .iter()
            .skip(1)
            .map(ContractParam::from_fn_arg)
            .collect::<syn::Result<Vec<_>>>()?;
        Ok(parsed)
    }

    /// Returns `true` for async methods returning an outcome.
    pub const fn is_endpoint(&self) -> bool {
        self.is_async && self.success.is_some()
    }

    /// Returns the success type name, or `None` for `()`.
    pub fn success_type_name(&self) -> Option<String> {
        match self.success.as_ref()? {
            Type::Tuple(tuple) if tuple.elems.is_empty() => None,
            ty => Some(type_name(ty)),
        }
    }
}

/// Renders a type the way it was written, without spaces.
pub fn type_name(ty: &Type) -> String {
    quote::quote!(#ty)
        .to_string()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Returns the success type of `Outcome<T>`, `Outcome` or
/// `Result<T, ContractError>`.
pub fn outcome_success(output: &ReturnType) -> Option<Type> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };
    let Type::Path(path) = ty.as_ref() else {
        return None;
    };
    let segment = path.path.segments.last()?;
    let args: Vec<&Type> = match &segment.arguments {
        PathArguments::None => Vec::new(),
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        PathArguments::Parenthesized(_) => return None,
    };

    match (segment.ident.to_string().as_str(), args.as_slice()) {
        ("Outcome", []) => Some(syn::parse_quote!(())),
        ("Outcome", [ok]) => Some((*ok).clone()),
        ("Result", [ok, Type::Path(err)])
            if err
                .path
                .segments
                .last()
                .is_some_and(|s| s.ident == "ContractError") =>
        {
            Some((*ok).clone())
        }
        _ => None,
    }
}

fn meta_ident(meta: &Meta) -> syn::Result<String> {
    meta.path()
        .get_ident()
        .map(ToString::to_string)
        .ok_or_else(|| syn::Error::new(meta.span(), "expected identifier"))
}

fn lit_str(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

// `validate` alone means `validate = true`.
fn flag(meta: &Meta) -> syn::Result<bool> {
    match meta {
        Meta::Path(_) => Ok(true),
        Meta::NameValue(nv) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Bool(b), ..
            }) => Ok(b.value),
            other => Err(syn::Error::new(other.span(), "expected `true` or `false`")),
        },
        Meta::List(list) => Err(syn::Error::new(list.span(), "expected `name` or `name = bool`")),
    }
}
