//! Per-case substitution planning.

use casegen_model::{CaseId, ConfigError, Row, RowError};

use crate::config::{CASE_NAME_LITERAL, MappingConfig, PlaceholderMapping, ReplacementRule};
use crate::substitution::SubstitutionMap;

/// Build the substitution map for one case.
///
/// Placeholders take the stringified value of their mapped column; `extra_rules`
/// are merged in with `CASE_NUMBER` resolved to the case name; `CaseName` is
/// always bound to the case name, overriding any rule on that literal.
///
/// # Errors
///
/// Returns a [`RowError`] when a mapped column is absent or empty, a value
/// cannot be stringified, or two rules bind the same literal differently.
pub fn plan(
    row: &Row,
    mapping: &PlaceholderMapping,
    extra_rules: &[ReplacementRule],
    case: &CaseId,
) -> Result<SubstitutionMap, RowError> {
    let mut map = SubstitutionMap::new();
    for (placeholder, column) in mapping.iter() {
        if !row.has_column(column) {
            return Err(RowError::MissingColumn {
                placeholder: placeholder.to_string(),
                column: column.to_string(),
            });
        }
        let value = row.get(column).ok_or_else(|| RowError::MissingValue {
            placeholder: placeholder.to_string(),
            column: column.to_string(),
        })?;
        map.insert_rule(placeholder, value.to_replacement(column)?)?;
    }
    for rule in extra_rules {
        if rule.old == CASE_NAME_LITERAL {
            continue;
        }
        map.insert_rule(rule.old.as_str(), rule.resolve(case.name()))?;
    }
    map.override_rule(CASE_NAME_LITERAL, case.name());
    Ok(map)
}

/// Planner holding the validated mapping for a whole batch.
#[derive(Debug, Clone)]
pub struct SubstitutionPlanner {
    mapping: PlaceholderMapping,
    rules: Vec<ReplacementRule>,
}

impl SubstitutionPlanner {
    pub fn new(mapping: PlaceholderMapping, rules: Vec<ReplacementRule>) -> Self {
        Self { mapping, rules }
    }

    /// # Errors
    ///
    /// See [`MappingConfig::compile`].
    pub fn from_config(config: &MappingConfig) -> Result<Self, ConfigError> {
        let (mapping, rules) = config.compile()?;
        Ok(Self::new(mapping, rules))
    }

    pub fn mapping(&self) -> &PlaceholderMapping {
        &self.mapping
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingColumns`] when a mapped column is not in `headers`.
    pub fn check_header(&self, headers: &[String]) -> Result<(), ConfigError> {
        MappingConfig::validate_header(&self.mapping, headers)
    }

    /// # Errors
    ///
    /// See [`plan`].
    pub fn plan(&self, row: &Row, case: &CaseId) -> Result<SubstitutionMap, RowError> {
        plan(row, &self.mapping, &self.rules, case)
    }
}

#[cfg(test)]
mod tests {
    use casegen_model::{CaseNaming, ParamTable, Scalar};

    use super::*;

    fn table(values: Vec<Option<Scalar>>) -> ParamTable {
        let mut table =
            ParamTable::new(vec!["Velocity".to_string(), "Theta0".to_string()]).unwrap();
        table.push_row(values).unwrap();
        table
    }

    fn mapping() -> PlaceholderMapping {
        [
            ("VelocityToReplace", "Velocity"),
            ("Theta0ToReplace", "Theta0"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn plans_values_and_case_name() {
        let table = table(vec![Some(Scalar::Number(10.0)), Some(Scalar::Number(2.5))]);
        let case = CaseNaming::for_batch("Case", 1).case_id(0);
        let rules = vec![
            ReplacementRule::new("ResultName", "CASE_NUMBER"),
            ReplacementRule::new("Solver", "coupled"),
        ];
        let map = plan(&table.rows()[0], &mapping(), &rules, &case).unwrap();
        assert_eq!(map.get("VelocityToReplace"), Some("10"));
        assert_eq!(map.get("Theta0ToReplace"), Some("2.5"));
        assert_eq!(map.get("ResultName"), Some("Case1"));
        assert_eq!(map.get("Solver"), Some("coupled"));
        assert_eq!(map.get("CaseName"), Some("Case1"));
    }

    #[test]
    fn case_name_rule_always_wins() {
        let table = table(vec![Some(Scalar::Number(1.0)), Some(Scalar::Number(2.0))]);
        let case = CaseNaming::for_batch("Run", 1).case_id(0);
        let rules = vec![ReplacementRule::new("CaseName", "fixed")];
        let map = plan(&table.rows()[0], &mapping(), &rules, &case).unwrap();
        assert_eq!(map.get("CaseName"), Some("Run1"));
    }

    #[test]
    fn empty_cell_is_a_row_error() {
        let table = table(vec![Some(Scalar::Number(1.0)), None]);
        let case = CaseNaming::for_batch("Case", 1).case_id(0);
        let error = plan(&table.rows()[0], &mapping(), &[], &case).unwrap_err();
        assert!(matches!(error, RowError::MissingValue { ref column, .. } if column == "Theta0"));
    }

    #[test]
    fn absent_column_is_a_row_error() {
        let table = table(vec![Some(Scalar::Number(1.0)), Some(Scalar::Number(2.0))]);
        let case = CaseNaming::for_batch("Case", 1).case_id(0);
        let mapping: PlaceholderMapping = [("AlphaToReplace", "Alpha")].into_iter().collect();
        let error = plan(&table.rows()[0], &mapping, &[], &case).unwrap_err();
        assert!(matches!(error, RowError::MissingColumn { .. }));
    }

    #[test]
    fn conflicting_rule_is_a_row_error() {
        let table = table(vec![Some(Scalar::Number(1.0)), Some(Scalar::Number(2.0))]);
        let case = CaseNaming::for_batch("Case", 1).case_id(0);
        let rules = vec![ReplacementRule::new("VelocityToReplace", "99")];
        let error = plan(&table.rows()[0], &mapping(), &rules, &case).unwrap_err();
        assert!(matches!(error, RowError::DuplicateLiteral { .. }));
    }

    #[test]
    fn identical_rule_is_idempotent() {
        let table = table(vec![Some(Scalar::Number(1.0)), Some(Scalar::Number(2.0))]);
        let case = CaseNaming::for_batch("Case", 1).case_id(0);
        let rules = vec![ReplacementRule::new("VelocityToReplace", "1")];
        let map = plan(&table.rows()[0], &mapping(), &rules, &case).unwrap();
        assert_eq!(map.get("VelocityToReplace"), Some("1"));
    }
}
