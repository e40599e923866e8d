//! Endpoint descriptors: the single description both directions consume.

use std::sync::Arc;

use hermes_core::{OperationSignature, TypeShape};
use hermes_router::RouteTemplate;
use http::Method;

/// Where a parameter's value travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSource {
    /// A route placeholder with the same name.
    Route,
    /// A query-string entry with the same name.
    Query,
    /// The JSON request body.
    Body,
    /// Each property from the route if present there, else from the query.
    RouteAndQuery,
    /// The ambient cancellation signal. Never on the wire.
    Cancellation,
}

impl BindingSource {
    /// Returns a short lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Query => "query",
            Self::Body => "body",
            Self::RouteAndQuery => "route_and_query",
            Self::Cancellation => "cancellation",
        }
    }
}

/// How one declared parameter is bound.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBinding {
    /// Parameter name as declared.
    pub name: String,
    /// Wire shape of the parameter.
    pub shape: TypeShape,
    /// Where the value travels.
    pub source: BindingSource,
    /// Whether a value must be supplied.
    pub required: bool,
    /// Value used when the parameter is absent.
    pub default: Option<serde_json::Value>,
}

impl ParameterBinding {
    /// Returns the value used when the parameter is absent, or `None` if the
    /// parameter is required.
    #[must_use]
    pub fn fallback(&self) -> Option<serde_json::Value> {
        match &self.default {
            Some(value) => Some(value.clone()),
            None if !self.required => Some(serde_json::Value::Null),
            None => None,
        }
    }
}

/// Resolved HTTP mapping of one operation.
///
/// Built once by the scanner and shared read-only afterwards. The binding list
/// mirrors the declared parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    pub(crate) contract: String,
    pub(crate) operation: OperationSignature,
    pub(crate) method: Method,
    pub(crate) template: RouteTemplate,
    pub(crate) bindings: Vec<ParameterBinding>,
    pub(crate) validate: bool,
    pub(crate) authorize: bool,
}

impl EndpointDescriptor {
    /// Returns the contract name.
    #[must_use]
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        self.operation.name()
    }

    /// Returns the recorded operation signature.
    #[must_use]
    pub const fn signature(&self) -> &OperationSignature {
        &self.operation
    }

    /// Returns the HTTP verb.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the compiled route template.
    #[must_use]
    pub const fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Returns the parameter bindings in declared order.
    #[must_use]
    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Returns the binding of a parameter by name.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&ParameterBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    /// Returns the success value type name, if the operation produces one.
    #[must_use]
    pub fn success_type(&self) -> Option<&str> {
        self.operation.success_type()
    }

    /// Returns `true` if validators run for this endpoint.
    #[must_use]
    pub const fn requires_validation(&self) -> bool {
        self.validate
    }

    /// Returns `true` if the permission check runs for this endpoint.
    #[must_use]
    pub const fn requires_authorization(&self) -> bool {
        self.authorize
    }
}

/// All endpoints of one contract, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDescriptor {
    pub(crate) name: String,
    pub(crate) endpoints: Vec<Arc<EndpointDescriptor>>,
}

impl ContractDescriptor {
    /// Returns the contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<EndpointDescriptor>] {
        &self.endpoints
    }

    /// Returns the endpoint of an operation.
    #[must_use]
    pub fn endpoint(&self, operation: &str) -> Option<&Arc<EndpointDescriptor>> {
        self.endpoints.iter().find(|e| e.operation() == operation)
    }
}
