//! Recorded contract signatures.
//!
//! A contract is a trait whose operations are registered once, either by the
//! `#[contract]` attribute or by hand with the builders below. Signatures carry
//! only what the declaration says. All naming conventions are applied later by
//! the scanner, so both the server and the client path see the same input.
//!
//! # Example
//!
//! ```
//! use hermes_core::{ContractSignature, OperationSignature, ParameterSignature};
//! use http::Method;
//!
//! let signature = ContractSignature::new("UserContract")
//!     .prefix("api/v2/users")
//!     .operation(
//!         OperationSignature::new("get_user_async")
//!             .param(ParameterSignature::of::<i32>("id"))
//!             .returns("User")
//!             .method(Method::GET)
//!             .path("{id}"),
//!     );
//!
//! assert_eq!(signature.operations().len(), 1);
//! ```

use http::Method;

use crate::wire::{TypeShape, WireType};

/// A type that carries a recorded contract signature.
///
/// Implemented by the marker type the `#[contract]` attribute generates next
/// to the trait (`UserContract` gets `UserContractApi`).
pub trait Contract: Send + Sync + 'static {
    /// Returns the recorded signature.
    fn signature() -> ContractSignature;
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSignature {
    /// Parameter name as declared.
    pub name: String,
    /// Wire shape of the parameter type.
    pub shape: TypeShape,
    /// Whether a value must be supplied.
    pub required: bool,
    /// Value used when the parameter is absent.
    pub default: Option<serde_json::Value>,
}

impl ParameterSignature {
    /// Describes a parameter of type `T`.
    #[must_use]
    pub fn of<T: WireType>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: T::shape(),
            required: T::REQUIRED,
            default: None,
        }
    }

    /// Sets the value used when the parameter is absent.
    ///
    /// A parameter with a default is never required.
    #[must_use]
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self.required = false;
        self
    }
}

/// Declarative overrides attached to one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOverrides {
    /// Explicit HTTP verb.
    pub method: Option<Method>,
    /// Explicit route template, relative to the contract prefix.
    pub path: Option<String>,
    /// Operation-level validation toggle.
    pub validate: Option<bool>,
    /// Operation-level authorization toggle.
    pub authorize: Option<bool>,
}

/// A declared operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSignature {
    name: String,
    params: Vec<ParameterSignature>,
    success_type: Option<String>,
    returns_outcome: bool,
    asynchronous: bool,
    overrides: OperationOverrides,
}

impl OperationSignature {
    /// Creates an async operation returning `Outcome<()>`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            success_type: None,
            returns_outcome: true,
            asynchronous: true,
            overrides: OperationOverrides::default(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn param(mut self, param: ParameterSignature) -> Self {
        self.params.push(param);
        self
    }

    /// Names the success value type.
    #[must_use]
    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.success_type = Some(type_name.into());
        self
    }

    /// Marks the operation as not returning an outcome. The scanner skips it.
    #[must_use]
    pub fn not_outcome(mut self) -> Self {
        self.returns_outcome = false;
        self
    }

    /// Marks the operation as synchronous. The scanner skips it.
    #[must_use]
    pub fn synchronous(mut self) -> Self {
        self.asynchronous = false;
        self
    }

    /// Overrides the HTTP verb.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.overrides.method = Some(method);
        self
    }

    /// Overrides the route template.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.overrides.path = Some(path.into());
        self
    }

    /// Overrides the validation toggle.
    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.overrides.validate = Some(enabled);
        self
    }

    /// Overrides the authorization toggle.
    #[must_use]
    pub fn authorize(mut self, enabled: bool) -> Self {
        self.overrides.authorize = Some(enabled);
        self
    }

    /// Returns the operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared parameters in order.
    #[must_use]
    pub fn params(&self) -> &[ParameterSignature] {
        &self.params
    }

    /// Returns the success value type name, if the operation produces one.
    #[must_use]
    pub fn success_type(&self) -> Option<&str> {
        self.success_type.as_deref()
    }

    /// Returns `true` if the return shape is an outcome.
    #[must_use]
    pub const fn returns_outcome(&self) -> bool {
        self.returns_outcome
    }

    /// Returns `true` if the operation is asynchronous.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.asynchronous
    }

    /// Returns the declarative overrides.
    #[must_use]
    pub const fn overrides(&self) -> &OperationOverrides {
        &self.overrides
    }
}

/// A recorded contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractSignature {
    name: String,
    prefix: Option<String>,
    validate: bool,
    authorize: bool,
    operations: Vec<OperationSignature>,
}

impl ContractSignature {
    /// Creates an empty contract with the given simple name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            validate: false,
            authorize: false,
            operations: Vec::new(),
        }
    }

    /// Overrides the route prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the contract-level validation toggle.
    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Sets the contract-level authorization toggle.
    #[must_use]
    pub fn authorize(mut self, enabled: bool) -> Self {
        self.authorize = enabled;
        self
    }

    /// Appends an operation.
    #[must_use]
    pub fn operation(mut self, operation: OperationSignature) -> Self {
        self.operations.push(operation);
        self
    }

    /// Returns the contract's simple name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the prefix override, if any.
    #[must_use]
    pub fn prefix_override(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the contract-level validation toggle.
    #[must_use]
    pub const fn requires_validation(&self) -> bool {
        self.validate
    }

    /// Returns the contract-level authorization toggle.
    #[must_use]
    pub const fn requires_authorization(&self) -> bool {
        self.authorize
    }

    /// Returns all declared operations, including ones the scanner skips.
    #[must_use]
    pub fn operations(&self) -> &[OperationSignature] {
        &self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ScalarKind;

    #[test]
    fn test_parameter_of_type() {
        let param = ParameterSignature::of::<Option<i64>>("limit");
        assert_eq!(param.shape, TypeShape::Scalar(ScalarKind::Integer));
        assert!(!param.required);
        assert!(param.default.is_none());
    }

    #[test]
    fn test_default_makes_parameter_optional() {
        let param = ParameterSignature::of::<i32>("limit").with_default(serde_json::json!(10));
        assert!(!param.required);
        assert_eq!(param.default, Some(serde_json::json!(10)));
    }

    #[test]
    fn test_operation_builder() {
        let op = OperationSignature::new("delete_user")
            .param(ParameterSignature::of::<i32>("id"))
            .method(Method::POST)
            .authorize(true);

        assert_eq!(op.name(), "delete_user");
        assert_eq!(op.params().len(), 1);
        assert_eq!(op.success_type(), None);
        assert!(op.returns_outcome());
        assert!(op.is_async());
        assert_eq!(op.overrides().method, Some(Method::POST));
        assert_eq!(op.overrides().authorize, Some(true));
        assert_eq!(op.overrides().validate, None);
    }

    #[test]
    fn test_contract_builder() {
        let contract = ContractSignature::new("IOrderContract")
            .validate(true)
            .operation(OperationSignature::new("version").not_outcome())
            .operation(OperationSignature::new("get_order").returns("Order"));

        assert_eq!(contract.name(), "IOrderContract");
        assert_eq!(contract.prefix_override(), None);
        assert!(contract.requires_validation());
        assert!(!contract.requires_authorization());
        assert_eq!(contract.operations().len(), 2);
        assert!(!contract.operations()[0].returns_outcome());
    }
}
