//! AMF: registrations, sessions and context releases.

pub mod context_release;
pub mod registration;
pub mod session;

use fivegc_runtime::ControlLoop;

/// The only slice/service type the AMF serves
pub const SUPPORTED_SLICE: &str = "eMBB";

/// Every AMF loop
pub fn control_loops() -> Vec<ControlLoop> {
    vec![
        registration::register_input(),
        registration::register_identity_req(),
        registration::register_identity_handler(),
        registration::register_config_req(),
        registration::register_config_handler(),
        registration::register_output(),
        registration::active_registration(),
        session::session_input(),
        session::session_output(),
        context_release::session_context_release_input(),
        context_release::session_context_release_output(),
    ]
}
