//! Procedural macros for Hermes contracts.
//!
//! This crate is the explicit registration step of a contract: the macros
//! record what a declaration says and nothing more. Verbs, routes and binding
//! sources are resolved later by the scanner, so the server and the client
//! derive identical endpoints from the same recorded signature.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! #[hermes::contract(prefix = "api/v2/users")]
//! pub trait UserContract {
//!     #[operation(method = "GET", path = "{id}")]
//!     async fn get_user_async(&self, id: i32) -> Outcome<User>;
//!
//!     async fn list_users(&self, #[param(default = 20)] limit: i32) -> Outcome<Vec<User>>;
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-macros/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod contract;
mod parse;
mod serde_attrs;
mod wire_type;

use proc_macro::TokenStream;

/// Declares a contract trait.
///
/// # Attributes
///
/// On the trait:
/// - `prefix = "..."`: route prefix (default: kebab-case of the trait name)
/// - `validate`, `authorize`: contract-wide toggles (`= false` to disable)
///
/// On a method, `#[operation(...)]`:
/// - `method = "GET"`: HTTP verb (default: from the first word of the name)
/// - `path = "{id}"`: route template relative to the prefix
/// - `validate`, `authorize`: per-operation toggles overriding the contract's
///
/// On a parameter, `#[param(default = <expr>)]` gives the value used when the
/// parameter is absent from the request. The expression is turned into JSON
/// with `serde_json::json!`.
///
/// Only `async` methods returning `Outcome<T>` (or `Result<T, ContractError>`)
/// become endpoints; other methods stay in the trait and are recorded as
/// skipped.
///
/// # Generated Code
///
/// For `trait UserContract` the macro emits, next to the trait:
///
/// ```rust,ignore
/// pub struct UserContractApi;                 // impl Contract
/// pub struct UserContractService<S> { .. }    // impl ContractService for S: UserContract
/// pub struct UserContractClient { .. }        // one async method per endpoint
/// ```
///
/// Endpoint methods are rewritten to return `impl Future<Output = ..> + Send`,
/// so implementors may keep writing `async fn`.
#[proc_macro_attribute]
pub fn contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    contract::expand_contract(attr.into(), item.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Implements `WireType` for a parameter type.
///
/// - Structs with named fields become structured shapes whose properties
///   carry the names serde writes (`rename`, `rename_all` and `skip` are
///   honored).
/// - Newtype structs take the shape of their field.
/// - Enums whose variants carry no data become enum scalars.
///
/// The type must also implement `Serialize` and `Deserialize`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize, WireType)]
/// #[serde(rename_all = "PascalCase")]
/// pub struct PaymentQuery {
///     #[serde(rename = "IdBusMapCoach_RNo")]
///     pub route_no: i64,
///     pub status: Option<PaymentStatus>,
///     pub limit: i32,
/// }
/// ```
#[proc_macro_derive(WireType)]
pub fn derive_wire_type(input: TokenStream) -> TokenStream {
    wire_type::expand_wire_type(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
