//! Subcommand modules for the `cnpa` binary.

pub mod align;
pub mod convert;
pub mod matrix;
pub mod resolve;
