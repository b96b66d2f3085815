//! CLI library components for the case generator.

pub mod exit;
pub mod logging;
