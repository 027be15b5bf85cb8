//! Subcommand handlers

pub mod key;
pub mod run;
