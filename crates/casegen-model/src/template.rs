//! Template definitions.
//!
//! Templates are loaded once and shared read-only by every job; rendering
//! always produces a fresh copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// File name prefix that marks a template in the template directory.
pub const TEMPLATE_PREFIX: &str = "template_";
/// Batch macro driving the external builder.
pub const MACRO_TEMPLATE: &str = "template_Macro.java";
/// Simulation file copied byte-for-byte into every case.
pub const SIM_TEMPLATE: &str = "template_Case.sim";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateRole {
    /// Needed by the external builder (macro and simulation file).
    Required,
    /// Any other `template_*` file, rendered but not passed to the builder.
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    /// Rendered with the case's substitution map.
    Text,
    /// Copied unchanged.
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    role: TemplateRole,
    kind: TemplateKind,
    content: Arc<[u8]>,
    source: Option<PathBuf>,
}

impl Template {
    /// `name` is the logical name, e.g. `Macro.java` for `template_Macro.java`.
    pub fn new(
        name: impl Into<String>,
        role: TemplateRole,
        kind: TemplateKind,
        content: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            kind,
            content: content.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Logical name without its extension (`Macro` for `Macro.java`).
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Extension including the leading dot, or an empty string.
    pub fn extension(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[idx..],
            _ => "",
        }
    }

    /// The literal by which a template refers to itself (`template_Macro`).
    pub fn self_reference(&self) -> String {
        format!("{TEMPLATE_PREFIX}{}", self.stem())
    }

    pub fn role(&self) -> TemplateRole {
        self.role
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Every template available to a batch.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    pub macro_template: Option<Template>,
    pub sim_template: Option<Template>,
    /// Custom templates sorted by name.
    pub custom: Vec<Template>,
}

impl TemplateSet {
    pub fn has_required(&self) -> bool {
        self.macro_template.is_some() && self.sim_template.is_some()
    }

    pub fn len(&self) -> usize {
        usize::from(self.macro_template.is_some())
            + usize::from(self.sim_template.is_some())
            + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_parts() {
        let template = Template::new(
            "Macro.java",
            TemplateRole::Required,
            TemplateKind::Text,
            b"x".to_vec(),
        );
        assert_eq!(template.stem(), "Macro");
        assert_eq!(template.extension(), ".java");
        assert_eq!(template.self_reference(), "template_Macro");

        let bare = Template::new(
            "Notes",
            TemplateRole::Custom,
            TemplateKind::Text,
            Vec::<u8>::new(),
        );
        assert_eq!(bare.stem(), "Notes");
        assert_eq!(bare.extension(), "");
    }
}
