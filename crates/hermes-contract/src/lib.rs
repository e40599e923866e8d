//! # Hermes Contract
//!
//! The contract scanner and parameter binder.
//!
//! [`scan`] turns a recorded contract signature into endpoint descriptors:
//! verb, route template and one [`ParameterBinding`] per declared parameter.
//! Both the dispatcher and the client consume these descriptors, which is what
//! keeps the two directions in agreement.
//!
//! - [`bind_request`] - server side, request parts to positional arguments
//! - [`encode_request`] - client side, positional arguments to a request
//! - [`canonical`] - text forms of scalar values
//! - [`naming`] - verb and route conventions

#![doc(html_root_url = "https://docs.rs/hermes-contract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bind;
pub mod canonical;
mod descriptor;
mod encode;
pub mod naming;
mod scan;

pub use bind::{bind_request, QueryValues, RequestParts};
pub use descriptor::{BindingSource, ContractDescriptor, EndpointDescriptor, ParameterBinding};
pub use encode::{encode_request, EncodedRequest};
pub use scan::{carries_body, scan, scan_cached, ScanError};
