//! fivegc api - HTTP boundary over the object store
//!
//! Users and UEs submit Registration, Session and ContextRelease objects here
//! and read back their status. Every kind is reachable under
//! `/apis/{group}/{kind}`; collections also stream newline-delimited watch
//! events with `?watch=true`.
//!
//! With a [`TokenVerifier`](fivegc_credential::TokenVerifier) installed each
//! request needs a bearer token whose claims cover the namespace and the
//! (group, resource, verb) it touches.

#![forbid(unsafe_code)]

mod auth;
mod error;
mod routes;
mod server;

pub use auth::{authorize, Verb};
pub use error::ApiError;
pub use routes::{router, ApiState, ListQuery, CLUSTER_NAMESPACE};
pub use server::{bind, serve};
