//! Client-side request encoding.
//!
//! The mirror image of [`bind_request`](crate::bind_request): the same
//! bindings, applied in reverse, so a request built here binds back to the
//! same arguments on the server.

use bytes::Bytes;
use hermes_core::{BoundArguments, ContractError, Outcome, ScalarKind, TypeShape, WireValue};
use http::Method;
use serde_json::Value;

use crate::canonical::format_text;
use crate::descriptor::{BindingSource, EndpointDescriptor, ParameterBinding};

/// An outbound request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    /// HTTP verb.
    pub method: Method,
    /// Percent-encoded path, starting with `/`.
    pub path: String,
    /// Encoded query string without the leading `?`, if any entries exist.
    pub query: Option<String>,
    /// JSON body, if a parameter is body-bound and has a value.
    pub body: Option<Bytes>,
}

impl EncodedRequest {
    /// Returns `path?query`.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

/// Encodes call arguments for `endpoint`.
///
/// `args` must follow the declared parameter order.
///
/// # Example
///
/// ```
/// use hermes_contract::{encode_request, scan};
/// use hermes_core::{BoundArguments, ContractSignature, OperationSignature, ParameterSignature, WireValue};
/// use http::Method;
///
/// let contract = scan(&ContractSignature::new("UserContract")
///     .prefix("api/v2/users")
///     .operation(
///         OperationSignature::new("get_user_async")
///             .param(ParameterSignature::of::<i32>("id"))
///             .method(Method::GET)
///             .path("{id}"),
///     ))
/// .unwrap();
///
/// let mut args = BoundArguments::new();
/// args.push("id", WireValue::Json(123.into()));
///
/// let request = encode_request(contract.endpoint("get_user_async").unwrap(), &args).unwrap();
/// assert_eq!(request.method, Method::GET);
/// assert_eq!(request.path_and_query(), "/api/v2/users/123");
/// ```
pub fn encode_request(endpoint: &EndpointDescriptor, args: &BoundArguments) -> Outcome<EncodedRequest> {
    if args.len() != endpoint.bindings().len() {
        return Err(ContractError::unexpected(format!(
            "operation '{}' expects {} arguments, got {}",
            endpoint.operation(),
            endpoint.bindings().len(),
            args.len()
        )));
    }

    let mut route: Vec<(String, String)> = Vec::new();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut body = None;

    for (binding, (_, value)) in endpoint.bindings().iter().zip(args.iter()) {
        let json = match value {
            WireValue::Json(json) => json,
            WireValue::Cancellation(_) => continue,
        };
        match binding.source {
            BindingSource::Cancellation => {}
            BindingSource::Route => {
                let text = text_of(binding, &binding.shape, json)?.ok_or_else(|| {
                    ContractError::validation(format!(
                        "route parameter '{}' has no value",
                        binding.name
                    ))
                })?;
                route.push(route_segment(&binding.name, text)?);
            }
            BindingSource::Query => {
                if let Some(text) = text_of(binding, &binding.shape, json)? {
                    query.push((binding.name.clone(), text));
                }
            }
            BindingSource::Body => {
                if !json.is_null() {
                    let bytes = serde_json::to_vec(json).map_err(|e| {
                        ContractError::unexpected(format!("failed to serialize body: {e}"))
                    })?;
                    body = Some(Bytes::from(bytes));
                }
            }
            BindingSource::RouteAndQuery => {
                split_properties(endpoint, binding, json, &mut route, &mut query)?;
            }
        }
    }

    let path = endpoint
        .template()
        .render(|placeholder| {
            route
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(placeholder))
                .map(|(_, value)| value.clone())
        })
        .map_err(|placeholder| {
            ContractError::validation(format!("no value for route placeholder '{placeholder}'"))
        })?;

    let query = if query.is_empty() {
        None
    } else {
        Some(
            serde_urlencoded::to_string(&query)
                .map_err(|e| ContractError::unexpected(format!("failed to encode query: {e}")))?,
        )
    };

    Ok(EncodedRequest {
        method: endpoint.method().clone(),
        path,
        query,
        body,
    })
}

fn text_of(binding: &ParameterBinding, shape: &TypeShape, value: &Value) -> Outcome<Option<String>> {
    format_text(shape, value).map_err(|reason| {
        ContractError::validation(format!("parameter '{}': {reason}", binding.name))
    })
}

/// A path segment that renders as nothing would route to a different
/// endpoint, so empty values are refused here.
fn route_segment(name: &str, text: String) -> Outcome<(String, String)> {
    if text.trim().is_empty() {
        return Err(ContractError::validation(format!(
            "route parameter '{name}' must not be empty"
        )));
    }
    Ok((name.to_string(), text))
}

/// Routes each property of a structured argument to the route when a
/// placeholder names it, otherwise to the query.
///
/// Maps and sequences have no declared properties to split on. They travel
/// as one JSON entry named after the parameter.
fn split_properties(
    endpoint: &EndpointDescriptor,
    binding: &ParameterBinding,
    value: &Value,
    route: &mut Vec<(String, String)>,
    query: &mut Vec<(String, String)>,
) -> Outcome {
    let object = match (&binding.shape, value) {
        (_, Value::Null) => return Ok(()),
        (TypeShape::Structured(_), Value::Object(object)) => object,
        (shape, other) => {
            if let Some(text) = text_of(binding, shape, other)? {
                query.push((binding.name.clone(), text));
            }
            return Ok(());
        }
    };

    for (name, property) in object {
        let declared = binding
            .shape
            .properties()
            .iter()
            .find(|p| &p.name == name)
            .map(|p| p.shape.clone());
        let shape = match declared {
            Some(shape) => shape,
            None if property.is_object() || property.is_array() => TypeShape::Map,
            None => TypeShape::Scalar(ScalarKind::Text),
        };
        let Some(text) = text_of(binding, &shape, property)? else {
            continue;
        };
        if endpoint.template().placeholder(name).is_some() {
            route.push(route_segment(name, text)?);
        } else {
            query.push((name.clone(), text));
        }
    }
    Ok(())
}
