//! Output directory layout.
//!
//! Every case owns `<root>/<case>/`; nothing outside that directory is written
//! on behalf of a case, which keeps concurrent jobs from touching the same path.

use std::path::{Path, PathBuf};

use casegen_model::{CaseId, Template};

/// File name of the persisted batch report under the output root.
pub const REPORT_FILE_NAME: &str = "batch_report.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// A relative `root` is anchored at the current working directory, so
    /// every path the layout hands out is absolute.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn case_dir(&self, case: &CaseId) -> PathBuf {
        self.root.join(case.name())
    }

    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE_NAME)
    }

    /// `<case>.sim`
    pub fn sim_file_name(case: &CaseId) -> String {
        format!("{}.sim", case.name())
    }

    /// `<stem>_<case><ext>`, e.g. `Macro_Case01.java`.
    pub fn rendered_file_name(template: &Template, case: &CaseId) -> String {
        format!("{}{}", Self::rendered_stem(template, case), template.extension())
    }

    /// `<stem>_<case>`, the name a rendered template uses for itself.
    pub fn rendered_stem(template: &Template, case: &CaseId) -> String {
        format!("{}_{}", template.stem(), case.name())
    }

    /// `<case>.log`
    pub fn log_file_name(case: &CaseId) -> String {
        format!("{}.log", case.name())
    }

    /// Builder log, `<case_dir>/<case>.log`.
    pub fn log_path(&self, case: &CaseId) -> PathBuf {
        self.case_dir(case).join(Self::log_file_name(case))
    }
}

/// Render a path with forward slashes, as the builder's macro language expects.
pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
