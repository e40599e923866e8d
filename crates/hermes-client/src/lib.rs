//! # Hermes Client
//!
//! The client invocation engine. [`ContractClient::invoke`] performs one
//! contract call over HTTP: it encodes the arguments with the same endpoint
//! descriptor the dispatcher uses, sends the request through an
//! [`HttpTransport`] and rebuilds the outcome from the response.
//!
//! Transports:
//! - [`ReqwestTransport`] - a real HTTP client with a base URL and timeout
//! - [`LoopbackTransport`] - hands requests to an in-process
//!   [`Dispatcher`](hermes_server::Dispatcher)

#![doc(html_root_url = "https://docs.rs/hermes-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod decode;
mod transport;

pub use client::{ContractClient, ContractClientBuilder};
pub use decode::decode_response;
pub use hermes_config::ClientSettings;
pub use transport::{
    HttpTransport, LoopbackTransport, ReqwestTransport, TransportError, TransportFuture,
};
