//! Placeholder mapping configuration and its load-time validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use casegen_model::{ConfigError, TEMPLATE_PREFIX};

/// Placeholder bound to the per-job case name.
pub const CASE_NAME_LITERAL: &str = "CaseName";
/// Placeholder bound to the saved simulation path in the macro.
pub const SAVE_PATH_LITERAL: &str = "SavePath";
/// Rule value that resolves to the per-job case name.
pub const CASE_NUMBER_SENTINEL: &str = "CASE_NUMBER";
/// Literals the generator binds itself.
pub const RESERVED_LITERALS: [&str; 2] = [CASE_NAME_LITERAL, SAVE_PATH_LITERAL];

/// Mapping section of the batch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Placeholder literals expected in the templates, in substitution order.
    pub placeholders: Vec<String>,
    /// Placeholder literal to parameter plan column.
    #[serde(default)]
    pub param_mapping: BTreeMap<String, String>,
    /// Literal replacement rules independent of the plan.
    #[serde(default)]
    pub replace_rules: BTreeMap<String, String>,
}

/// Validated placeholder to column pairs, in placeholder-list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMapping {
    entries: Vec<(String, String)>,
}

impl PlaceholderMapping {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(placeholder, column)| (placeholder.as_str(), column.as_str()))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, column)| column.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for PlaceholderMapping {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(placeholder, column)| (placeholder.into(), column.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
    pub old: String,
    pub new: String,
}

impl ReplacementRule {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Replacement text for a case, resolving the `CASE_NUMBER` sentinel.
    pub fn resolve<'a>(&'a self, case_name: &'a str) -> &'a str {
        if self.new == CASE_NUMBER_SENTINEL {
            case_name
        } else {
            &self.new
        }
    }
}

impl MappingConfig {
    /// Validate the configuration and split it into the placeholder mapping and
    /// the user replacement rules.
    ///
    /// A user rule on `CaseName` is dropped with a warning because the
    /// generator always binds that literal to the case name.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty, duplicated, reserved or unmapped
    /// placeholder, an empty literal, or a rule that targets a placeholder.
    /// Literals starting with `template_` are reserved for template
    /// self-references.
    pub fn compile(&self) -> Result<(PlaceholderMapping, Vec<ReplacementRule>), ConfigError> {
        if self.placeholders.is_empty() {
            return Err(ConfigError::NoPlaceholders);
        }

        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(self.placeholders.len());
        for placeholder in &self.placeholders {
            if placeholder.is_empty() {
                return Err(ConfigError::EmptyLiteral {
                    context: "placeholders".to_string(),
                });
            }
            if !seen.insert(placeholder.as_str()) {
                return Err(ConfigError::DuplicatePlaceholder {
                    placeholder: placeholder.clone(),
                });
            }
            if is_reserved(placeholder) {
                return Err(ConfigError::ReservedLiteral {
                    literal: placeholder.clone(),
                });
            }
            let column = self.param_mapping.get(placeholder).ok_or_else(|| {
                ConfigError::MissingMapping {
                    placeholder: placeholder.clone(),
                }
            })?;
            if column.trim().is_empty() {
                return Err(ConfigError::EmptyLiteral {
                    context: format!("column mapping for {placeholder}"),
                });
            }
            entries.push((placeholder.clone(), column.trim().to_string()));
        }

        for unlisted in self
            .param_mapping
            .keys()
            .filter(|key| !seen.contains(key.as_str()))
        {
            warn!(placeholder = %unlisted, "mapping entry is not in the placeholder list; ignored");
        }

        let mut rules = Vec::with_capacity(self.replace_rules.len());
        for (old, new) in &self.replace_rules {
            if old.is_empty() {
                return Err(ConfigError::EmptyLiteral {
                    context: "replace_rules".to_string(),
                });
            }
            if seen.contains(old.as_str()) {
                return Err(ConfigError::DuplicateLiteral {
                    literal: old.clone(),
                });
            }
            if old == CASE_NAME_LITERAL {
                if new != CASE_NUMBER_SENTINEL {
                    warn!(
                        literal = CASE_NAME_LITERAL,
                        replacement = %new,
                        "replace rule overridden by the case name binding"
                    );
                }
                continue;
            }
            if is_reserved(old) {
                return Err(ConfigError::ReservedLiteral {
                    literal: old.clone(),
                });
            }
            rules.push(ReplacementRule::new(old.clone(), new.clone()));
        }

        Ok((PlaceholderMapping { entries }, rules))
    }

    /// Check that every mapped column exists in the parameter plan header.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingColumns`] listing every absent column.
    pub fn validate_header(
        mapping: &PlaceholderMapping,
        headers: &[String],
    ) -> Result<(), ConfigError> {
        let missing: BTreeSet<&str> = mapping
            .columns()
            .filter(|column| !headers.iter().any(|header| header == column))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(ConfigError::MissingColumns {
            columns: missing.into_iter().collect::<Vec<_>>().join(", "),
        })
    }
}

/// `CaseName`, `SavePath` and any `template_<stem>` self-reference.
fn is_reserved(literal: &str) -> bool {
    RESERVED_LITERALS.contains(&literal) || literal.starts_with(TEMPLATE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        placeholders: &[&str],
        mapping: &[(&str, &str)],
        rules: &[(&str, &str)],
    ) -> MappingConfig {
        MappingConfig {
            placeholders: placeholders.iter().map(|p| (*p).to_string()).collect(),
            param_mapping: mapping
                .iter()
                .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
                .collect(),
            replace_rules: rules
                .iter()
                .map(|(o, n)| ((*o).to_string(), (*n).to_string()))
                .collect(),
        }
    }

    #[test]
    fn compiles_in_placeholder_order() {
        let cfg = config(
            &["VelocityToReplace", "Theta0ToReplace"],
            &[("Theta0ToReplace", "Theta0"), ("VelocityToReplace", "Velocity")],
            &[("ResultFile", "CASE_NUMBER")],
        );
        let (mapping, rules) = cfg.compile().unwrap();
        let pairs: Vec<(&str, &str)> = mapping.iter().collect();
        assert_eq!(
            pairs,
            vec![("VelocityToReplace", "Velocity"), ("Theta0ToReplace", "Theta0")]
        );
        assert_eq!(rules, vec![ReplacementRule::new("ResultFile", "CASE_NUMBER")]);
    }

    #[test]
    fn rejects_missing_and_duplicate_placeholders() {
        assert!(matches!(
            config(&[], &[], &[]).compile(),
            Err(ConfigError::NoPlaceholders)
        ));
        assert!(matches!(
            config(&["A", "A"], &[("A", "x")], &[]).compile(),
            Err(ConfigError::DuplicatePlaceholder { .. })
        ));
        assert!(matches!(
            config(&["A", "B"], &[("A", "x")], &[]).compile(),
            Err(ConfigError::MissingMapping { ref placeholder }) if placeholder == "B"
        ));
    }

    #[test]
    fn rejects_ambiguous_and_reserved_literals() {
        assert!(matches!(
            config(&["A"], &[("A", "x")], &[("A", "y")]).compile(),
            Err(ConfigError::DuplicateLiteral { .. })
        ));
        assert!(matches!(
            config(&["CaseName"], &[("CaseName", "x")], &[]).compile(),
            Err(ConfigError::ReservedLiteral { .. })
        ));
        assert!(matches!(
            config(&["A"], &[("A", "x")], &[("", "y")]).compile(),
            Err(ConfigError::EmptyLiteral { .. })
        ));
    }

    #[test]
    fn rejects_literals_shadowing_template_self_references() {
        assert!(matches!(
            config(&["template_Macro"], &[("template_Macro", "x")], &[]).compile(),
            Err(ConfigError::ReservedLiteral { ref literal }) if literal == "template_Macro"
        ));
        assert!(matches!(
            config(&["A"], &[("A", "x")], &[("template_post", "CASE_NUMBER")]).compile(),
            Err(ConfigError::ReservedLiteral { ref literal }) if literal == "template_post"
        ));
        assert!(matches!(
            config(&["A"], &[("A", "x")], &[("SavePath", "out.sim")]).compile(),
            Err(ConfigError::ReservedLiteral { .. })
        ));
    }

    #[test]
    fn case_name_rule_is_dropped() {
        let cfg = config(&["A"], &[("A", "x")], &[("CaseName", "Other")]);
        let (_, rules) = cfg.compile().unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn header_check_lists_every_missing_column() {
        let mapping: PlaceholderMapping =
            [("A", "Velocity"), ("B", "Theta0"), ("C", "Alpha")].into_iter().collect();
        let headers = vec!["Velocity".to_string()];
        let error = MappingConfig::validate_header(&mapping, &headers).unwrap_err();
        assert_eq!(
            error.to_string(),
            "mapped columns missing from parameter plan header: Alpha, Theta0"
        );
    }
}
