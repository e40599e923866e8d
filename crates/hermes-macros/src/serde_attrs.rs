//! The subset of `#[serde(...)]` that changes wire names.
//!
//! Property and variant names recorded in a wire shape must be the names
//! serde actually writes, so `rename`, `rename_all` and `skip` are honored.
//! Every other serde option is ignored.

use syn::{meta::ParseNestedMeta, Attribute, Expr, LitStr, Token};

/// Serde options read from one attribute list.
#[derive(Debug, Default)]
pub struct SerdeAttrs {
    /// `rename = "..."`.
    pub rename: Option<String>,
    /// `rename_all = "..."`.
    pub rename_all: Option<RenameRule>,
    /// `skip`.
    pub skip: bool,
}

impl SerdeAttrs {
    /// Reads every `#[serde(...)]` attribute in `attrs`.
    pub fn from_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                    parsed.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                    let lit = meta.value()?.parse::<LitStr>()?;
                    let rule = RenameRule::parse(&lit.value())
                        .ok_or_else(|| syn::Error::new(lit.span(), "unknown rename rule"))?;
                    parsed.rename_all = Some(rule);
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

fn skip_meta(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta(&nested))?;
    }
    Ok(())
}

/// A serde `rename_all` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    /// Applies the rule to a `snake_case` field name.
    pub fn apply_to_field(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => field.split('_').map(capitalize).collect(),
            Self::Camel => {
                let pascal: String = field.split('_').map(capitalize).collect();
                lower_first(&pascal)
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }

    /// Applies the rule to a `PascalCase` variant name.
    pub fn apply_to_variant(self, variant: &str) -> String {
        match self {
            Self::Pascal => variant.to_string(),
            Self::Lower => variant.to_ascii_lowercase(),
            Self::Upper => variant.to_ascii_uppercase(),
            Self::Camel => lower_first(variant),
            Self::Snake => snake(variant),
            Self::ScreamingSnake => snake(variant).to_ascii_uppercase(),
            Self::Kebab => snake(variant).replace('_', "-"),
            Self::ScreamingKebab => snake(variant).replace('_', "-").to_ascii_uppercase(),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snake(variant: &str) -> String {
    let mut out = String::with_capacity(variant.len() + 4);
    for (i, ch) in variant.char_indices() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

/// Strips the raw identifier prefix.
pub fn unraw(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    match name.strip_prefix("r#") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_field_rules() {
        assert_eq!(RenameRule::Pascal.apply_to_field("bus_route_no"), "BusRouteNo");
        assert_eq!(RenameRule::Camel.apply_to_field("bus_route_no"), "busRouteNo");
        assert_eq!(RenameRule::Kebab.apply_to_field("bus_route_no"), "bus-route-no");
        assert_eq!(RenameRule::ScreamingSnake.apply_to_field("limit"), "LIMIT");
    }

    #[test]
    fn test_variant_rules() {
        assert_eq!(RenameRule::Snake.apply_to_variant("OnHold"), "on_hold");
        assert_eq!(RenameRule::Camel.apply_to_variant("OnHold"), "onHold");
        assert_eq!(RenameRule::ScreamingKebab.apply_to_variant("OnHold"), "ON-HOLD");
        assert_eq!(RenameRule::Lower.apply_to_variant("OnHold"), "onhold");
    }

    #[test]
    fn test_reads_rename_and_ignores_the_rest() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[serde(default, rename = "Status")]),
            parse_quote!(#[serde(skip_serializing_if = "Option::is_none")]),
            parse_quote!(#[serde(deserialize_with = "parse", rename(serialize = "s"))]),
        ];
        let parsed = SerdeAttrs::from_attrs(&attrs).unwrap();
        assert_eq!(parsed.rename.as_deref(), Some("Status"));
        assert!(!parsed.skip);
    }

    #[test]
    fn test_reads_rename_all() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(rename_all = "camelCase")])];
        let parsed = SerdeAttrs::from_attrs(&attrs).unwrap();
        assert_eq!(parsed.rename_all, Some(RenameRule::Camel));

        let bad: Vec<Attribute> = vec![parse_quote!(#[serde(rename_all = "Title Case")])];
        assert!(SerdeAttrs::from_attrs(&bad).is_err());
    }
}
