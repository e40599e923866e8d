//! # Hermes Router
//!
//! Route templates and the first-match route table used by the dispatcher.
//!
//! - [`RouteTemplate`] - a compiled `{name}` template; also renders paths for the client
//! - [`RouteTable`] - ordered routes, first match wins, verbs compared case-insensitively
//! - [`Params`] - captured route values

#![doc(html_root_url = "https://docs.rs/hermes-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod params;
mod table;
mod template;

pub use params::Params;
pub use table::{Route, RouteLookup, RouteMatch, RouteTable};
pub use template::{RouteTemplate, Segment, TemplateError};
