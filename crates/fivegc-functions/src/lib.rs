//! fivegc functions - the network functions as reconcilers
//!
//! Each function is a set of [`ControlLoop`](fivegc_runtime::ControlLoop)s
//! over the shared store:
//!
//! - [`amf`]: registration, session and context release pipelines plus the
//!   active registration table
//! - [`ausf`]: SUCI to SUPI resolution
//! - [`smf`]: policy merge, addressing, UPF notification and the active
//!   session table
//! - [`upf`]: the active config table
//! - [`pcf`]: slice policy lookups
//! - [`udm`]: credential issuance, run as a native watch task
//!
//! [`System`] wires them to one store and one shutdown signal.

#![forbid(unsafe_code)]

pub mod amf;
pub mod ausf;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod identity;
pub mod ipam;
pub mod pcf;
pub mod smf;
mod support;
pub mod system;
pub mod udm;
pub mod upf;

pub use catalogue::Catalogues;
pub use config::{ApiConfig, CatalogueConfig, SmfConfig, SystemConfig, UdmConfig};
pub use error::{CatalogueError, SystemError};
pub use identity::guti_for;
pub use ipam::IpPool;
pub use system::System;
