//! Contract scanner.
//!
//! Turns a recorded [`ContractSignature`] into a [`ContractDescriptor`]:
//!
//! 1. Keep async operations that return an outcome; skip the rest.
//! 2. Resolve the verb: override, else [`naming::verb_for`].
//! 3. Resolve the template: `{prefix}/{override}` or
//!    `{prefix}/{operation_segment}`. An override starting with `~/` ignores
//!    the prefix.
//! 4. Resolve each parameter's [`BindingSource`] against the placeholders.
//! 5. Reject ambiguous bodies, unbound placeholders and overlapping routes.
//!
//! Scanning is pure. [`scan_cached`] memoizes the result per contract type for
//! the life of the process.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use hermes_core::{Contract, ContractSignature, OperationSignature, ParameterSignature, TypeShape};
use hermes_router::{RouteTemplate, TemplateError};
use http::Method;
use parking_lot::RwLock;
use thiserror::Error;

use crate::descriptor::{BindingSource, ContractDescriptor, EndpointDescriptor, ParameterBinding};
use crate::naming;

/// Errors raised while scanning a contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// More than one parameter would be read from the request body.
    #[error("operation '{contract}.{operation}' binds more than one body parameter: {parameters:?}")]
    AmbiguousBody {
        /// Contract name.
        contract: String,
        /// Operation name.
        operation: String,
        /// The competing parameters.
        parameters: Vec<String>,
    },

    /// Two operations of one contract share a verb and overlapping templates.
    #[error("operations '{first}' and '{second}' of '{contract}' overlap on {method} {template}")]
    OverlappingRoutes {
        /// Contract name.
        contract: String,
        /// Operation registered first.
        first: String,
        /// Operation registered second.
        second: String,
        /// Shared verb.
        method: String,
        /// Template of the second operation.
        template: String,
    },

    /// A placeholder no parameter or property can fill.
    #[error("placeholder '{placeholder}' of '{contract}.{operation}' matches no parameter")]
    UnboundPlaceholder {
        /// Contract name.
        contract: String,
        /// Operation name.
        operation: String,
        /// The placeholder.
        placeholder: String,
    },

    /// A malformed route template.
    #[error("operation '{contract}.{operation}' has an invalid route: {source}")]
    InvalidTemplate {
        /// Contract name.
        contract: String,
        /// Operation name.
        operation: String,
        /// Why the template was rejected.
        #[source]
        source: TemplateError,
    },
}

/// Scans a contract signature.
pub fn scan(signature: &ContractSignature) -> Result<ContractDescriptor, ScanError> {
    let prefix = signature
        .prefix_override()
        .map_or_else(|| naming::contract_prefix(signature.name()), ToString::to_string);

    let mut endpoints: Vec<Arc<EndpointDescriptor>> = Vec::new();
    for operation in signature.operations() {
        if !operation.is_async() || !operation.returns_outcome() {
            tracing::debug!(
                contract = signature.name(),
                operation_id = operation.name(),
                "skipping operation without an async outcome"
            );
            continue;
        }

        let endpoint = scan_operation(signature, &prefix, operation)?;
        if let Some(existing) = endpoints.iter().find(|e| {
            e.method == endpoint.method && e.template.overlaps(&endpoint.template)
        }) {
            return Err(ScanError::OverlappingRoutes {
                contract: signature.name().to_string(),
                first: existing.operation().to_string(),
                second: endpoint.operation().to_string(),
                method: endpoint.method.to_string(),
                template: endpoint.template.to_string(),
            });
        }
        endpoints.push(Arc::new(endpoint));
    }

    tracing::debug!(
        contract = signature.name(),
        endpoints = endpoints.len(),
        "scanned contract"
    );
    Ok(ContractDescriptor {
        name: signature.name().to_string(),
        endpoints,
    })
}

fn scan_operation(
    signature: &ContractSignature,
    prefix: &str,
    operation: &OperationSignature,
) -> Result<EndpointDescriptor, ScanError> {
    let overrides = operation.overrides();
    let method = overrides
        .method
        .clone()
        .unwrap_or_else(|| naming::verb_for(operation.name()));

    let raw_template = match overrides.path.as_deref() {
        Some(path) => match path.strip_prefix("~/") {
            Some(absolute) => absolute.to_string(),
            None => format!("{prefix}/{path}"),
        },
        None => format!("{prefix}/{}", naming::operation_segment(operation.name())),
    };
    let template =
        RouteTemplate::parse(&raw_template).map_err(|source| ScanError::InvalidTemplate {
            contract: signature.name().to_string(),
            operation: operation.name().to_string(),
            source,
        })?;

    let bindings: Vec<ParameterBinding> = operation
        .params()
        .iter()
        .map(|param| ParameterBinding {
            name: param.name.clone(),
            shape: param.shape.clone(),
            source: resolve_source(param, &template, &method),
            required: param.required,
            default: param.default.clone(),
        })
        .collect();

    let body: Vec<String> = bindings
        .iter()
        .filter(|b| b.source == BindingSource::Body)
        .map(|b| b.name.clone())
        .collect();
    if body.len() > 1 {
        return Err(ScanError::AmbiguousBody {
            contract: signature.name().to_string(),
            operation: operation.name().to_string(),
            parameters: body,
        });
    }

    if let Some(placeholder) = template
        .placeholders()
        .find(|p| !placeholder_is_bound(p, &bindings))
    {
        return Err(ScanError::UnboundPlaceholder {
            contract: signature.name().to_string(),
            operation: operation.name().to_string(),
            placeholder: placeholder.to_string(),
        });
    }

    Ok(EndpointDescriptor {
        contract: signature.name().to_string(),
        operation: operation.clone(),
        method,
        template,
        bindings,
        validate: overrides
            .validate
            .unwrap_or_else(|| signature.requires_validation()),
        authorize: overrides
            .authorize
            .unwrap_or_else(|| signature.requires_authorization()),
    })
}

/// Resolves a parameter's source. Order matters: cancellation, route
/// placeholder, scalar, structured by verb.
fn resolve_source(param: &ParameterSignature, template: &RouteTemplate, method: &Method) -> BindingSource {
    if param.shape.is_cancellation() {
        BindingSource::Cancellation
    } else if template.placeholder(&param.name).is_some() {
        BindingSource::Route
    } else if param.shape.is_scalar() {
        BindingSource::Query
    } else if carries_body(method) {
        BindingSource::Body
    } else {
        BindingSource::RouteAndQuery
    }
}

/// Returns `true` for verbs whose structured parameters travel in the body.
#[must_use]
pub fn carries_body(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH]
        .iter()
        .any(|m| m.as_str().eq_ignore_ascii_case(method.as_str()))
}

fn placeholder_is_bound(placeholder: &str, bindings: &[ParameterBinding]) -> bool {
    bindings.iter().any(|b| match b.source {
        BindingSource::Route => b.name.eq_ignore_ascii_case(placeholder),
        BindingSource::RouteAndQuery => match &b.shape {
            TypeShape::Structured(props) => props
                .iter()
                .any(|p| p.name.eq_ignore_ascii_case(placeholder)),
            _ => false,
        },
        _ => false,
    })
}

type ScanCache = RwLock<HashMap<TypeId, Arc<ContractDescriptor>>>;

fn cache() -> &'static ScanCache {
    static CACHE: OnceLock<ScanCache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Scans contract `C` once per process and returns the shared descriptor.
///
/// Failed scans are not cached; they are deterministic, so every call
/// reports the same error.
pub fn scan_cached<C: Contract>() -> Result<Arc<ContractDescriptor>, ScanError> {
    let key = TypeId::of::<C>();
    if let Some(found) = cache().read().get(&key) {
        return Ok(Arc::clone(found));
    }

    let scanned = Arc::new(scan(&C::signature())?);
    let mut guard = cache().write();
    Ok(Arc::clone(guard.entry(key).or_insert(scanned)))
}
