//! Parameter plan loading and template discovery.

pub mod discovery;
pub mod error;
pub mod param_table;

pub use discovery::{discover_templates, list_template_files};
pub use error::{IngestError, Result};
pub use param_table::{read_param_table, read_param_table_from_reader};
