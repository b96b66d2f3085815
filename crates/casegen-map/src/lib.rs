//! Placeholder mapping and per-case substitution planning.

pub mod config;
pub mod planner;
pub mod substitution;

pub use config::{
    CASE_NAME_LITERAL, CASE_NUMBER_SENTINEL, MappingConfig, PlaceholderMapping, RESERVED_LITERALS,
    ReplacementRule, SAVE_PATH_LITERAL,
};
pub use planner::{SubstitutionPlanner, plan};
pub use substitution::SubstitutionMap;
