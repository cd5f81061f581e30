//! CLI commands.

pub mod analyze;
pub mod calls;
pub mod status;
