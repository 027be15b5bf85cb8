//! fivegc testkit - shared fixtures
//!
//! Request templates for the user-facing kinds, `eventually` polling, and a
//! [`TestSystem`] that runs every network function over an in-memory store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod eventually;
pub mod harness;
pub mod templates;

pub use eventually::{consistently, eventually, eventually_within};
pub use harness::{init_tracing, test_config, TestSystem};
pub use templates::*;
