use std::cmp::Ordering;
use std::collections::BTreeMap;

use casegen_model::RowError;

/// Literal-to-replacement rules for one case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionMap {
    rules: BTreeMap<String, String>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule.
    ///
    /// Re-adding an identical rule is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::DuplicateLiteral`] when `old` is already bound to a
    /// different replacement.
    pub fn insert_rule(
        &mut self,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Result<(), RowError> {
        let old = old.into();
        let new = new.into();
        match self.rules.get(&old) {
            Some(existing) if *existing == new => Ok(()),
            Some(existing) => Err(RowError::DuplicateLiteral {
                first: existing.clone(),
                second: new,
                literal: old,
            }),
            None => {
                self.rules.insert(old, new);
                Ok(())
            }
        }
    }

    /// Bind `old` to `new`, replacing any earlier binding.
    pub fn override_rule(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.rules.insert(old.into(), new.into());
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.rules.get(old).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in application priority: longest literal first, then lexical.
    ///
    /// A literal that is a prefix of a longer one therefore never wins at the
    /// position where both match.
    pub fn ordered_rules(&self) -> Vec<(&str, &str)> {
        let mut ordered: Vec<(&str, &str)> = self
            .rules
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
            .collect();
        ordered.sort_by(|a, b| match b.0.len().cmp(&a.0.len()) {
            Ordering::Equal => a.0.cmp(b.0),
            other => other,
        });
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_duplicates_are_idempotent() {
        let mut map = SubstitutionMap::new();
        map.insert_rule("A", "x").unwrap();
        map.insert_rule("A", "x").unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn conflicting_duplicates_fail() {
        let mut map = SubstitutionMap::new();
        map.insert_rule("A", "x").unwrap();
        let error = map.insert_rule("A", "y").unwrap_err();
        assert_eq!(
            error,
            RowError::DuplicateLiteral {
                literal: "A".to_string(),
                first: "x".to_string(),
                second: "y".to_string(),
            }
        );
    }

    #[test]
    fn orders_longest_literal_first() {
        let mut map = SubstitutionMap::new();
        map.insert_rule("A", "x").unwrap();
        map.insert_rule("AB", "y").unwrap();
        map.insert_rule("AC", "z").unwrap();
        let literals: Vec<&str> = map.ordered_rules().into_iter().map(|(old, _)| old).collect();
        assert_eq!(literals, vec!["AB", "AC", "A"]);
    }
}
