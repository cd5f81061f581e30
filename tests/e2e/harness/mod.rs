//! E2E test harness for codeintel.
//!
//! This module contains test infrastructure with builders and variants that
//! not every scenario uses.

#![allow(dead_code)]

pub mod assertions;
pub mod backends;
pub mod runner;
pub mod scenario;
pub mod steps;
pub mod workspace;

// Re-export commonly used types
pub use assertions::Assertion;
pub use backends::{Outcome, ScriptedParser};
pub use scenario::Scenario;
pub use workspace::TestWorkspace;
