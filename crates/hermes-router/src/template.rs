//! Route templates.
//!
//! A template is path text with `{name}` placeholders, compiled once into
//! positional segments. Each placeholder captures exactly one path segment.

use std::borrow::Cow;

use thiserror::Error;

use crate::params::Params;

/// Errors raised while compiling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` without `}` or the reverse.
    #[error("unbalanced braces in route template '{0}'")]
    UnbalancedBraces(String),

    /// `{}` with nothing inside.
    #[error("empty placeholder in route template '{0}'")]
    EmptyPlaceholder(String),

    /// A placeholder that shares its segment with literal text.
    #[error("placeholder must span a whole segment in route template '{0}'")]
    PartialSegment(String),

    /// The same placeholder twice, compared case-insensitively.
    #[error("placeholder '{name}' appears twice in route template '{template}'")]
    DuplicatePlaceholder {
        /// The repeated name.
        name: String,
        /// The template.
        template: String,
    },
}

/// A segment of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Literal text, matched ASCII case-insensitively.
    Literal(String),
    /// A single-segment capture.
    Capture(String),
}

/// A compiled route template.
///
/// # Example
///
/// ```
/// use hermes_router::RouteTemplate;
///
/// let template = RouteTemplate::parse("api/v2/users/{id}").unwrap();
/// assert_eq!(template.as_str(), "/api/v2/users/{id}");
///
/// let params = template.match_path("/api/v2/users/123").unwrap();
/// assert_eq!(params.get("id"), Some("123"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteTemplate {
    normalized: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    /// Compiles a template.
    ///
    /// Leading, trailing and repeated slashes are ignored.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        for raw in template.split('/').filter(|s| !s.is_empty()) {
            let opens = raw.matches('{').count();
            let closes = raw.matches('}').count();
            if opens != closes || opens > 1 {
                return Err(TemplateError::UnbalancedBraces(template.to_string()));
            }
            if opens == 0 {
                segments.push(Segment::Literal(raw.to_string()));
                continue;
            }
            if !(raw.starts_with('{') && raw.ends_with('}')) {
                return Err(TemplateError::PartialSegment(template.to_string()));
            }
            let name = raw[1..raw.len() - 1].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyPlaceholder(template.to_string()));
            }
            let duplicate = segments.iter().any(|s| match s {
                Segment::Capture(existing) => existing.eq_ignore_ascii_case(name),
                Segment::Literal(_) => false,
            });
            if duplicate {
                return Err(TemplateError::DuplicatePlaceholder {
                    name: name.to_string(),
                    template: template.to_string(),
                });
            }
            segments.push(Segment::Capture(name.to_string()));
        }

        let normalized = Self::render_segments(&segments);
        Ok(Self {
            normalized,
            segments,
        })
    }

    fn render_segments(segments: &[Segment]) -> String {
        if segments.is_empty() {
            return "/".to_string();
        }
        segments.iter().fold(String::new(), |mut out, segment| {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Capture(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            out
        })
    }

    /// Returns the normalized template text, always starting with `/`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Returns the compiled segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the placeholder names in order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns the declared spelling of a placeholder matching `name`
    /// case-insensitively.
    #[must_use]
    pub fn placeholder(&self, name: &str) -> Option<&str> {
        self.placeholders().find(|p| p.eq_ignore_ascii_case(name))
    }

    /// Matches a request path, returning percent-decoded captures.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let mut actual = path.split('/').filter(|s| !s.is_empty());
        let mut params = Params::new();

        for pattern in &self.segments {
            let segment = actual.next()?;
            match pattern {
                Segment::Literal(expected) => {
                    if !expected.eq_ignore_ascii_case(segment) {
                        return None;
                    }
                }
                Segment::Capture(name) => {
                    params.push(name.as_str(), decode_segment(segment));
                }
            }
        }

        if actual.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Returns `true` if some path matches both templates.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a.eq_ignore_ascii_case(b),
                    _ => true,
                })
    }

    /// Produces a concrete path, substituting percent-encoded placeholder
    /// values.
    ///
    /// Returns the name of the first placeholder `lookup` cannot fill.
    pub fn render<F>(&self, mut lookup: F) -> Result<String, String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if self.segments.is_empty() {
            return Ok("/".to_string());
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Capture(name) => {
                    let value = lookup(name).ok_or_else(|| name.clone())?;
                    out.push_str(&urlencoding::encode(&value));
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_slashes() {
        let template = RouteTemplate::parse("//user-contract//get-user/").unwrap();
        assert_eq!(template.as_str(), "/user-contract/get-user");
        assert_eq!(template.segments().len(), 2);
    }

    #[test]
    fn test_parse_root() {
        let template = RouteTemplate::parse("/").unwrap();
        assert_eq!(template.as_str(), "/");
        assert!(template.match_path("/").is_some());
        assert!(template.match_path("").is_some());
        assert!(template.match_path("/x").is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            RouteTemplate::parse("users/{id"),
            Err(TemplateError::UnbalancedBraces(_))
        ));
        assert!(matches!(
            RouteTemplate::parse("users/{}"),
            Err(TemplateError::EmptyPlaceholder(_))
        ));
        assert!(matches!(
            RouteTemplate::parse("users/user-{id}"),
            Err(TemplateError::PartialSegment(_))
        ));
        assert!(matches!(
            RouteTemplate::parse("a/{id}/b/{ID}"),
            Err(TemplateError::DuplicatePlaceholder { .. })
        ));
    }

    #[test]
    fn test_placeholders() {
        let template = RouteTemplate::parse("payments/{IdBusMapCoach_RNo}/lines/{line}").unwrap();
        let names: Vec<_> = template.placeholders().collect();
        assert_eq!(names, vec!["IdBusMapCoach_RNo", "line"]);
        assert_eq!(
            template.placeholder("idbusmapcoach_rno"),
            Some("IdBusMapCoach_RNo")
        );
        assert_eq!(template.placeholder("missing"), None);
    }

    #[test]
    fn test_match_path() {
        let template = RouteTemplate::parse("/users/{userId}/posts/{postId}").unwrap();

        let params = template.match_path("/users/42/posts/7").unwrap();
        assert_eq!(params.get("userId"), Some("42"));
        assert_eq!(params.get("postId"), Some("7"));

        assert!(template.match_path("/users/42/posts").is_none());
        assert!(template.match_path("/users/42/posts/7/extra").is_none());
        assert!(template.match_path("/people/42/posts/7").is_none());
    }

    #[test]
    fn test_match_literals_case_insensitively() {
        let template = RouteTemplate::parse("/User-Contract/get-user").unwrap();
        assert!(template.match_path("/user-contract/GET-USER").is_some());
    }

    #[test]
    fn test_match_decodes_captures() {
        let template = RouteTemplate::parse("/files/{name}").unwrap();
        let params = template.match_path("/files/a%20b%2Fc").unwrap();
        assert_eq!(params.get("name"), Some("a b/c"));
    }

    #[test]
    fn test_overlaps() {
        let a = RouteTemplate::parse("/users/{id}").unwrap();
        let b = RouteTemplate::parse("/users/me").unwrap();
        let c = RouteTemplate::parse("/users/{id}/posts").unwrap();
        let d = RouteTemplate::parse("/orders/{id}").unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_render() {
        let template = RouteTemplate::parse("/api/v2/users/{id}").unwrap();
        let path = template
            .render(|name| (name == "id").then(|| "a b".to_string()))
            .unwrap();
        assert_eq!(path, "/api/v2/users/a%20b");

        let missing = template.render(|_| None).unwrap_err();
        assert_eq!(missing, "id");
    }
}
