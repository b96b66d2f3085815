//! Policy options controlling batch execution.

use serde::{Deserialize, Serialize};

/// What the scheduler does after a job fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopPolicy {
    /// Record the failure and keep dispatching.
    #[default]
    ContinueOnError,
    /// Stop dispatching new jobs once a failure is observed.
    AbortOnFirstError,
}

/// Treatment of running jobs when a batch aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InFlightPolicy {
    /// Let running jobs finish.
    #[default]
    Wait,
    /// Signal running jobs to stop; they are recorded as cancelled failures.
    Cancel,
}

/// Treatment of a case whose output directory already holds files.
///
/// Applied uniformly to every job of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingOutputPolicy {
    /// Regenerate and overwrite the case files.
    #[default]
    Overwrite,
    /// Leave the case untouched and record it as skipped.
    Skip,
}

/// Independent stage toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchStages {
    /// Render the macro and copy the simulation file into each case.
    pub apply_required_templates: bool,
    /// Run the external case builder for each case.
    pub invoke_builder: bool,
    /// Render custom `template_*` files into each case.
    pub apply_custom_templates: bool,
    /// Whether the external preparation stage has already been run.
    /// When false the builder stage is skipped.
    pub prerequisites_ready: bool,
}

impl Default for BatchStages {
    fn default() -> Self {
        Self {
            apply_required_templates: true,
            invoke_builder: true,
            apply_custom_templates: true,
            prerequisites_ready: true,
        }
    }
}

impl BatchStages {
    /// Stages that need the macro and simulation templates.
    pub fn needs_required_templates(&self) -> bool {
        self.apply_required_templates || self.invoke_builder
    }

    pub fn renders_anything(&self) -> bool {
        self.apply_required_templates || self.apply_custom_templates
    }

    pub fn builder_runnable(&self) -> bool {
        self.invoke_builder && self.prerequisites_ready
    }
}
