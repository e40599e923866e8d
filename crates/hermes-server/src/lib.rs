//! # Hermes Server
//!
//! The request dispatcher. A [`Dispatcher`] hosts one or more contract
//! implementations, matches inbound requests against their endpoints, binds
//! arguments, runs validators and the permission check, invokes the operation
//! and translates its outcome into a response.
//!
//! Hosting is out of scope: glue code hands each request and a cancellation
//! token to [`Dispatcher::dispatch`] and writes back the returned response.
//!
//! ```text
//! request ─► route ─► bind ─► validate ─► authorize ─► invoke ─► translate ─► response
//!              │404/405  │400     │400         │401/403    │panic→500
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod dispatcher;
mod service;

pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use hermes_config::DispatcherSettings;
pub use service::{encode_success, BoxedOutcome, ContractService};
