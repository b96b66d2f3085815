//! Batch configuration file (`casegen.toml`).
//!
//! Loaded once into an immutable [`BatchConfig`]. Relative paths in the file
//! resolve against the directory that contains it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use casegen_map::{MappingConfig, SubstitutionPlanner};
use casegen_model::{
    BatchStages, CaseNaming, ConfigError, DEFAULT_CASE_PREFIX, ExistingOutputPolicy,
    InFlightPolicy, StopPolicy,
};

use crate::scheduler::SchedulerOptions;
use crate::starccm::{DEFAULT_EXTRA_ARGS, DEFAULT_PROGRAM};

pub const DEFAULT_CONFIG_FILE: &str = "casegen.toml";

/// `[settings]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Placeholder literals expected in the templates.
    pub placeholders: Vec<String>,
    pub output_path: PathBuf,
    pub max_concurrency: usize,
    pub parallelism_hint: usize,
    pub stop_policy: StopPolicy,
    pub in_flight: InFlightPolicy,
    pub existing_outputs: ExistingOutputPolicy,
    pub build_timeout_secs: Option<u64>,
    pub case_prefix: String,
    pub plan_path: PathBuf,
    /// Defaults to the configuration directory.
    pub template_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            placeholders: Vec::new(),
            output_path: PathBuf::from("batch_cases"),
            max_concurrency: 4,
            parallelism_hint: 1,
            stop_policy: StopPolicy::default(),
            in_flight: InFlightPolicy::default(),
            existing_outputs: ExistingOutputPolicy::default(),
            build_timeout_secs: None,
            case_prefix: DEFAULT_CASE_PREFIX.to_string(),
            plan_path: PathBuf::from("CasePlan.csv"),
            template_dir: None,
        }
    }
}

/// `[builder]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderSettings {
    pub program: String,
    pub extra_args: Vec<String>,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            extra_args: DEFAULT_EXTRA_ARGS.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    param_mapping: BTreeMap<String, String>,
    #[serde(default)]
    replace_rules: BTreeMap<String, String>,
    #[serde(default)]
    stages: BatchStages,
    #[serde(default)]
    builder: BuilderSettings,
}

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
    pub abort_on_error: bool,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    source: PathBuf,
    base_dir: PathBuf,
    output_override: Option<PathBuf>,
    pub settings: Settings,
    pub param_mapping: BTreeMap<String, String>,
    pub replace_rules: BTreeMap<String, String>,
    pub stages: BatchStages,
    pub builder: BuilderSettings,
}

impl BatchConfig {
    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read, is not valid
    /// TOML for this schema, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse configuration text as if it were read from `path`.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        let base_dir = absolute(path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let config = Self {
            source: path.to_path_buf(),
            base_dir,
            output_override: None,
            settings: file.settings,
            param_mapping: file.param_mapping,
            replace_rules: file.replace_rules,
            stages: file.stages,
            builder: file.builder,
        };
        config.validate()?;
        debug!(path = %path.display(), placeholders = config.settings.placeholders.len(), "loaded batch config");
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the overridden settings are invalid.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(dir) = &overrides.output_dir {
            self.output_override = Some(absolute(dir));
        }
        if let Some(max) = overrides.max_concurrency {
            self.settings.max_concurrency = max;
        }
        if overrides.abort_on_error {
            self.settings.stop_policy = StopPolicy::AbortOnFirstError;
        }
        self.validate()
    }

    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                setting: "max_concurrency",
                value: 0,
            });
        }
        if self.settings.parallelism_hint == 0 {
            return Err(ConfigError::InvalidConcurrency {
                setting: "parallelism_hint",
                value: 0,
            });
        }
        if self.settings.build_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidTimeout);
        }
        self.mapping().compile().map(|_| ())
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Always absolute; the builder resolves the rendered save path from
    /// inside the case directory.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_override {
            Some(dir) => dir.clone(),
            None => absolute(&self.resolve(&self.settings.output_path)),
        }
    }

    pub fn plan_path(&self) -> PathBuf {
        self.resolve(&self.settings.plan_path)
    }

    pub fn template_dir(&self) -> PathBuf {
        match &self.settings.template_dir {
            Some(dir) => self.resolve(dir),
            None => self.base_dir.clone(),
        }
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.settings.build_timeout_secs.map(Duration::from_secs)
    }

    pub fn case_naming(&self, total: usize) -> CaseNaming {
        CaseNaming::for_batch(self.settings.case_prefix.clone(), total)
    }

    pub fn mapping(&self) -> MappingConfig {
        MappingConfig {
            placeholders: self.settings.placeholders.clone(),
            param_mapping: self.param_mapping.clone(),
            replace_rules: self.replace_rules.clone(),
        }
    }

    /// # Errors
    ///
    /// See [`MappingConfig::compile`].
    pub fn planner(&self) -> Result<SubstitutionPlanner, ConfigError> {
        SubstitutionPlanner::from_config(&self.mapping())
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            max_concurrency: self.settings.max_concurrency,
            parallelism_hint: self.settings.parallelism_hint,
            stop_policy: self.settings.stop_policy,
            in_flight: self.settings.in_flight,
            existing_outputs: self.settings.existing_outputs,
            build_timeout: self.build_timeout(),
            stages: self.stages,
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[settings]
placeholders = ["VelocityToReplace", "Theta0ToReplace"]
output_path = "out"
max_concurrency = 2
stop_policy = "abort-on-first-error"
existing_outputs = "skip"
build_timeout_secs = 3600

[param_mapping]
VelocityToReplace = "Velocity"
Theta0ToReplace = "Theta0"

[replace_rules]
"result.csv" = "CASE_NUMBER"

[stages]
invoke_builder = false

[builder]
extra_args = ["-power"]
"#;

    #[test]
    fn parses_full_config() {
        let config = BatchConfig::parse(CONFIG, Path::new("study/casegen.toml")).expect("parse");
        let study = std::env::current_dir().expect("cwd").join("study");
        assert_eq!(config.output_dir(), study.join("out"));
        assert_eq!(config.plan_path(), study.join("CasePlan.csv"));
        assert_eq!(config.template_dir(), study);
        assert_eq!(config.builder.program, "starccm+");

        let options = config.scheduler_options();
        assert_eq!(options.max_concurrency, 2);
        assert_eq!(options.stop_policy, StopPolicy::AbortOnFirstError);
        assert_eq!(options.existing_outputs, ExistingOutputPolicy::Skip);
        assert_eq!(options.in_flight, InFlightPolicy::Wait);
        assert_eq!(options.build_timeout, Some(Duration::from_secs(3600)));
        assert!(!options.stages.invoke_builder);
        assert!(options.stages.apply_custom_templates);
    }

    #[test]
    fn bare_file_name_resolves_against_working_directory() {
        let config = BatchConfig::parse(CONFIG, Path::new("casegen.toml")).expect("parse");
        let cwd = std::env::current_dir().expect("cwd");
        assert_eq!(config.base_dir(), cwd);
        assert_eq!(config.template_dir(), cwd);
        assert_eq!(config.output_dir(), cwd.join("out"));
    }

    #[test]
    fn relative_output_override_is_made_absolute() {
        let mut config = BatchConfig::parse(CONFIG, Path::new("casegen.toml")).expect("parse");
        config
            .apply_overrides(&ConfigOverrides {
                output_dir: Some(PathBuf::from("elsewhere")),
                ..ConfigOverrides::default()
            })
            .expect("overrides");
        let output = config.output_dir();
        assert!(output.is_absolute(), "{}", output.display());
        assert_eq!(output, std::env::current_dir().expect("cwd").join("elsewhere"));
    }

    #[test]
    fn default_builder_runs_with_power_licence() {
        let text = CONFIG.replace("extra_args = [\"-power\"]", "");
        let config = BatchConfig::parse(&text, Path::new("casegen.toml")).expect("parse");
        assert_eq!(config.builder.extra_args, vec!["-power".to_string()]);
    }

    #[test]
    fn rejects_unknown_keys() {
        let text = CONFIG.replace("max_concurrency = 2", "max_workers = 2");
        let error = BatchConfig::parse(&text, Path::new("casegen.toml")).expect_err("unknown key");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let text = CONFIG.replace("max_concurrency = 2", "max_concurrency = 0");
        let error = BatchConfig::parse(&text, Path::new("casegen.toml")).expect_err("zero");
        assert!(matches!(
            error,
            ConfigError::InvalidConcurrency {
                setting: "max_concurrency",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unmapped_placeholder() {
        let text = CONFIG.replace("Theta0ToReplace = \"Theta0\"\n", "");
        let error = BatchConfig::parse(&text, Path::new("casegen.toml")).expect_err("unmapped");
        assert!(matches!(error, ConfigError::MissingMapping { .. }));
    }

    #[test]
    fn overrides_apply_and_revalidate() {
        let mut config = BatchConfig::parse(CONFIG, Path::new("casegen.toml")).expect("parse");
        config
            .apply_overrides(&ConfigOverrides {
                output_dir: Some(PathBuf::from("/tmp/elsewhere")),
                max_concurrency: Some(6),
                abort_on_error: false,
            })
            .expect("overrides");
        assert_eq!(
            config.output_dir(),
            std::path::absolute("/tmp/elsewhere").expect("absolute")
        );
        assert_eq!(config.scheduler_options().max_concurrency, 6);

        let error = config
            .apply_overrides(&ConfigOverrides {
                max_concurrency: Some(0),
                ..ConfigOverrides::default()
            })
            .expect_err("zero");
        assert!(matches!(error, ConfigError::InvalidConcurrency { .. }));
    }
}
