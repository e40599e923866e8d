//! # Hermes
//!
//! **Contract-to-HTTP protocol mapping**
//!
//! Declare a service once as a Rust trait. Hermes derives HTTP endpoints from
//! it and serves any implementation through a [`Dispatcher`], and it generates
//! a client that performs the same calls over HTTP. Both sides consume the
//! same endpoint descriptors, so they always agree on verbs, routes and where
//! each parameter travels.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//!
//! #[hermes::contract]
//! pub trait UserContract {
//!     async fn get_user_async(&self, id: i32) -> Outcome<User>;   // GET /user-contract/get-user?id=..
//! }
//!
//! struct Users;
//!
//! impl UserContract for Users {
//!     async fn get_user_async(&self, id: i32) -> Outcome<User> {
//!         Err(ContractError::not_found(format!("User {id} not found")))
//!     }
//! }
//!
//! let dispatcher = Dispatcher::builder()
//!     .mount(UserContractService::new(Users))
//!     .build()?;
//!
//! let client = UserContractClient::new(
//!     ContractClient::from_settings(&config.client)?.build(),
//! );
//! ```
//!
//! ## Architecture
//!
//! ```text
//! #[contract] ─→ ContractSignature ─→ scanner ─→ EndpointDescriptor
//!                                                  │             │
//!                          request ─→ RouteTable ─→ bind ─→ operation
//!                                                                │
//!            Outcome ←─ decode ←─ transport ←─ encode ←─ client call
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Lets generated code name `::hermes` inside this crate too.
extern crate self as hermes;

// Re-export core types
pub use hermes_core as core;

// Re-export the route matcher
pub use hermes_router as router;

// Re-export the scanner and binder
pub use hermes_contract as contract_map;

// Re-export the dispatcher
pub use hermes_server as server;

// Re-export the client engine
pub use hermes_client as client;

// Re-export logging setup
pub use hermes_telemetry as telemetry;

// Re-export configuration
pub use hermes_config as config;

// Re-export macros
pub use hermes_macros::{contract, WireType};

pub use hermes_client::{ContractClient, ContractClientBuilder};
pub use hermes_core::{ContractError, ErrorKind, Outcome};
pub use hermes_server::{Dispatcher, DispatcherBuilder};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        AllowAll, BoundArguments, CallContext, CancellationToken, CircuitBreaker, Contract,
        ContractError, DenyAll, DiagnosticsSink, ErrorKind, ExponentialBackoff, NoRetry, Outcome,
        PermissionChecker, PermissionDecision, RequestValidator, RetryPolicy, WireType,
    };

    pub use hermes_server::{ContractService, Dispatcher};

    pub use hermes_client::{ContractClient, LoopbackTransport, ReqwestTransport};

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_telemetry::{init_logging, TracingDiagnostics};

    // Re-export macros
    pub use hermes_macros::{contract, WireType};
}

/// Paths used by macro-generated code. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use hermes_client::ContractClient;
    pub use hermes_core::wire::{decode_json, encode_json};
    pub use hermes_core::{
        BoundArguments, Contract, ContractError, ContractSignature, OperationSignature, Outcome,
        ParameterSignature, PropertyShape, ScalarKind, TypeShape, WireType, WireValue,
    };
    pub use hermes_server::{encode_success, BoxedOutcome, ContractService};
    pub use http::Method;
    pub use serde_json;
}
