//! Server-side parameter binding.
//!
//! Given a matched endpoint and the raw request parts, produce the operation's
//! positional arguments. Every failure is a validation error; nothing here
//! panics on malformed input.

use bytes::Bytes;
use hermes_core::{BoundArguments, ContractError, Outcome, PropertyShape, TypeShape, WireValue};
use hermes_router::Params;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::canonical::parse_text;
use crate::descriptor::{BindingSource, EndpointDescriptor, ParameterBinding};

/// Raw inputs of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestParts<'a> {
    /// Values captured by the route template.
    pub route: &'a Params,
    /// Raw query string, without the leading `?`.
    pub query: Option<&'a str>,
    /// Request body.
    pub body: &'a Bytes,
    /// Cancellation signal of the inbound request.
    pub cancellation: &'a CancellationToken,
}

/// Parsed query string. First occurrence of a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    pairs: Vec<(String, String)>,
}

impl QueryValues {
    /// Parses a raw query string.
    pub fn parse(query: Option<&str>) -> Outcome<Self> {
        let Some(raw) = query.filter(|q| !q.is_empty()) else {
            return Ok(Self::default());
        };
        serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
            .map(|pairs| Self { pairs })
            .map_err(|e| ContractError::validation(format!("malformed query string: {e}")))
    }

    /// Returns a value by exact name, falling back to an ASCII
    /// case-insensitive match.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| self.pairs.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)))
            .map(|(_, v)| v.as_str())
    }

    /// Returns all pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Binds every declared parameter of `endpoint` from the request.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use hermes_contract::{bind_request, scan, RequestParts};
/// use hermes_core::{ContractSignature, OperationSignature, ParameterSignature};
/// use hermes_router::Params;
/// use tokio_util::sync::CancellationToken;
///
/// let contract = scan(&ContractSignature::new("UserContract").operation(
///     OperationSignature::new("get_user_async").param(ParameterSignature::of::<i32>("id")),
/// ))
/// .unwrap();
/// let endpoint = contract.endpoint("get_user_async").unwrap();
///
/// let mut args = bind_request(
///     endpoint,
///     &RequestParts {
///         route: &Params::new(),
///         query: Some("id=123"),
///         body: &Bytes::new(),
///         cancellation: &CancellationToken::new(),
///     },
/// )
/// .unwrap();
/// assert_eq!(args.decode::<i32>(0).unwrap(), 123);
/// ```
pub fn bind_request(endpoint: &EndpointDescriptor, parts: &RequestParts<'_>) -> Outcome<BoundArguments> {
    let query = QueryValues::parse(parts.query)?;
    let mut args = BoundArguments::with_capacity(endpoint.bindings().len());

    for binding in endpoint.bindings() {
        let value = match binding.source {
            BindingSource::Cancellation => WireValue::Cancellation(parts.cancellation.clone()),
            BindingSource::Route => {
                let text = parts.route.get_ignore_case(&binding.name);
                WireValue::Json(bind_text(binding, text)?)
            }
            BindingSource::Query => {
                let text = query.get(&binding.name);
                WireValue::Json(bind_text(binding, text)?)
            }
            BindingSource::Body => WireValue::Json(bind_body(binding, parts.body)?),
            BindingSource::RouteAndQuery => {
                WireValue::Json(bind_route_and_query(binding, parts.route, &query)?)
            }
        };
        args.push(binding.name.clone(), value);
    }

    Ok(args)
}

fn bind_text(binding: &ParameterBinding, text: Option<&str>) -> Outcome<Value> {
    match text {
        Some(text) => parse_text(&binding.shape, text).map_err(|reason| {
            ContractError::validation(format!("parameter '{}': {reason}", binding.name))
        }),
        None => missing(binding),
    }
}

fn bind_body(binding: &ParameterBinding, body: &Bytes) -> Outcome<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return binding.fallback().ok_or_else(|| {
            ContractError::validation(format!(
                "request body is required for parameter '{}'",
                binding.name
            ))
        });
    }
    serde_json::from_slice(body)
        .map_err(|e| ContractError::validation(format!("malformed request body: {e}")))
}

fn bind_route_and_query(
    binding: &ParameterBinding,
    route: &Params,
    query: &QueryValues,
) -> Outcome<Value> {
    match &binding.shape {
        TypeShape::Structured(properties) => {
            let mut object = Map::new();
            for property in properties {
                let text = route
                    .get_ignore_case(&property.name)
                    .or_else(|| query.get(&property.name));
                if let Some(value) = bind_property(binding, property, text)? {
                    object.insert(property.name.clone(), value);
                }
            }
            if object.is_empty() && !binding.required {
                return Ok(binding.fallback().unwrap_or(Value::Null));
            }
            Ok(Value::Object(object))
        }
        // Maps and sequences arrive as one JSON entry under the parameter name.
        _ => bind_text(binding, query.get(&binding.name)),
    }
}

fn bind_property(
    binding: &ParameterBinding,
    property: &PropertyShape,
    text: Option<&str>,
) -> Outcome<Option<Value>> {
    match text {
        Some(text) => parse_text(&property.shape, text).map(Some).map_err(|reason| {
            ContractError::validation(format!(
                "parameter '{}', property '{}': {reason}",
                binding.name, property.name
            ))
        }),
        None if property.required && binding.required => Err(ContractError::validation(format!(
            "parameter '{}': missing required property '{}'",
            binding.name, property.name
        ))),
        None => Ok(None),
    }
}

fn missing(binding: &ParameterBinding) -> Outcome<Value> {
    binding.fallback().ok_or_else(|| {
        ContractError::validation(format!("missing required parameter '{}'", binding.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan;
    use hermes_core::{
        ContractSignature, ErrorKind, OperationSignature, ParameterSignature, ScalarKind,
    };
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn filter_param() -> ParameterSignature {
        ParameterSignature {
            name: "filter".to_string(),
            shape: TypeShape::Structured(vec![
                PropertyShape::of::<i64>("IdBusMapCoach_RNo"),
                PropertyShape::of::<String>("Status"),
                PropertyShape::of::<i32>("Limit"),
                PropertyShape::of::<Option<bool>>("Archived"),
            ]),
            required: true,
            default: None,
        }
    }

    fn endpoint(operation: OperationSignature) -> Arc<EndpointDescriptor> {
        let contract = scan(&ContractSignature::new("Test").operation(operation)).expect("scan");
        Arc::clone(&contract.endpoints()[0])
    }

    fn bind(
        endpoint: &EndpointDescriptor,
        route: &Params,
        query: Option<&str>,
        body: &str,
    ) -> Outcome<BoundArguments> {
        bind_request(
            endpoint,
            &RequestParts {
                route,
                query,
                body: &Bytes::copy_from_slice(body.as_bytes()),
                cancellation: &CancellationToken::new(),
            },
        )
    }

    #[test]
    fn test_query_scalars() {
        let ep = endpoint(
            OperationSignature::new("get_user")
                .param(ParameterSignature::of::<i32>("id"))
                .param(ParameterSignature::of::<Option<String>>("expand")),
        );
        let args = bind(&ep, &Params::new(), Some("id=123"), "").expect("bind");
        assert_eq!(args.json("id"), Some(&json!(123)));
        assert_eq!(args.json("expand"), Some(&Value::Null));
    }

    #[test]
    fn test_required_scalar_parse_failure() {
        let ep = endpoint(OperationSignature::new("get_user").param(ParameterSignature::of::<i32>("id")));
        let err = bind(&ep, &Params::new(), Some("id=abc"), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("'id'"));
    }

    #[test]
    fn test_missing_required_scalar() {
        let ep = endpoint(OperationSignature::new("get_user").param(ParameterSignature::of::<i32>("id")));
        let err = bind(&ep, &Params::new(), None, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_absent_optional_uses_default() {
        let ep = endpoint(
            OperationSignature::new("list_users")
                .param(ParameterSignature::of::<i32>("limit").with_default(json!(10))),
        );
        let args = bind(&ep, &Params::new(), None, "").expect("bind");
        assert_eq!(args.json("limit"), Some(&json!(10)));
    }

    #[test]
    fn test_route_values_case_insensitive() {
        let ep = endpoint(
            OperationSignature::new("get_user")
                .param(ParameterSignature::of::<i32>("id"))
                .path("{ID}"),
        );
        let mut route = Params::new();
        route.push("ID", "77");
        let args = bind(&ep, &route, None, "").expect("bind");
        assert_eq!(args.json("id"), Some(&json!(77)));
    }

    #[test]
    fn test_route_and_query_prefers_route() {
        let ep = endpoint(
            OperationSignature::new("search_payments")
                .param(filter_param())
                .path("payments/{IdBusMapCoach_RNo}"),
        );
        let mut route = Params::new();
        route.push("IdBusMapCoach_RNo", "123");
        let args = bind(
            &ep,
            &route,
            Some("IdBusMapCoach_RNo=999&Status=Active&Limit=10"),
            "",
        )
        .expect("bind");

        assert_eq!(
            args.json("filter"),
            Some(&json!({ "IdBusMapCoach_RNo": 123, "Status": "Active", "Limit": 10 }))
        );
    }

    #[test]
    fn test_route_and_query_missing_property() {
        let ep = endpoint(
            OperationSignature::new("search_payments")
                .param(filter_param())
                .path("payments/{IdBusMapCoach_RNo}"),
        );
        let mut route = Params::new();
        route.push("IdBusMapCoach_RNo", "123");
        let err = bind(&ep, &route, Some("Status=Active"), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("Limit"));
    }

    #[test]
    fn test_map_reads_only_its_own_entry() {
        let ep = endpoint(
            OperationSignature::new("list_tags")
                .param(ParameterSignature::of::<std::collections::HashMap<String, i32>>("tags"))
                .param(ParameterSignature::of::<i32>("page")),
        );
        assert_eq!(ep.method(), &Method::GET);

        let args = bind(&ep, &Params::new(), Some("tags=%7B%22a%22%3A1%7D&page=2"), "").expect("bind");
        assert_eq!(args.json("tags"), Some(&json!({ "a": 1 })));
        assert_eq!(args.json("page"), Some(&json!(2)));

        let err = bind(&ep, &Params::new(), Some("tags=a&page=2"), "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().contains("'tags'"));
    }

    #[test]
    fn test_body_binding() {
        let ep = endpoint(OperationSignature::new("create_payment").param(filter_param()));
        assert_eq!(ep.method(), &Method::POST);

        let args = bind(&ep, &Params::new(), None, r#"{"Status":"New"}"#).expect("bind");
        assert_eq!(args.json("filter"), Some(&json!({ "Status": "New" })));
    }

    #[test]
    fn test_empty_body_required_is_validation() {
        let ep = endpoint(OperationSignature::new("create_payment").param(filter_param()));
        let err = bind(&ep, &Params::new(), None, "  ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_empty_body_optional_is_null() {
        let mut param = filter_param();
        param.required = false;
        let ep = endpoint(OperationSignature::new("create_payment").param(param));
        let args = bind(&ep, &Params::new(), None, "").expect("bind");
        assert_eq!(args.json("filter"), Some(&Value::Null));
    }

    #[test]
    fn test_malformed_body_is_validation() {
        let ep = endpoint(OperationSignature::new("create_payment").param(filter_param()));
        let err = bind(&ep, &Params::new(), None, "{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_cancellation_comes_from_request() {
        let ep = endpoint(
            OperationSignature::new("get_report")
                .param(ParameterSignature::of::<CancellationToken>("ct")),
        );
        let token = CancellationToken::new();
        let args = bind_request(
            &ep,
            &RequestParts {
                route: &Params::new(),
                query: Some("ct=ignored"),
                body: &Bytes::new(),
                cancellation: &token,
            },
        )
        .expect("bind");
        token.cancel();
        assert!(args.cancellation().is_some_and(CancellationToken::is_cancelled));
    }

    #[test]
    fn test_enum_and_uuid_scalars() {
        let ep = endpoint(
            OperationSignature::new("find_orders")
                .param(ParameterSignature {
                    name: "status".to_string(),
                    shape: TypeShape::Scalar(ScalarKind::Enum(vec!["Open".into(), "Closed".into()])),
                    required: true,
                    default: None,
                })
                .param(ParameterSignature::of::<uuid::Uuid>("owner")),
        );
        let args = bind(
            &ep,
            &Params::new(),
            Some("status=open&owner=67e55044-10b1-426f-9247-bb680e5fe0c8"),
            "",
        )
        .expect("bind");
        assert_eq!(args.json("status"), Some(&json!("Open")));
    }

    #[test]
    fn test_query_parsing_is_lenient() {
        let parsed = QueryValues::parse(Some("a=%ZZ&b=1&b=2")).expect("parse");
        assert_eq!(parsed.get("a"), Some("%ZZ"));
        assert_eq!(parsed.get("B"), Some("1"));
        assert_eq!(QueryValues::parse(None), Ok(QueryValues::default()));
    }
}
