//! Literal template rendering and per-case job preparation.

pub mod job;
pub mod layout;
pub mod renderer;

pub use job::{BuildInputs, CaseJob, JobFactory, PrepareError, PreparedJob, RenderedFile};
pub use layout::{OutputLayout, REPORT_FILE_NAME, to_forward_slashes};
pub use renderer::{render, render_str};
