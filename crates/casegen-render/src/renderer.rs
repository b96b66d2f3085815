//! Literal find/replace over template bytes.
//!
//! All rules of a [`SubstitutionMap`] are applied in one left-to-right scan of
//! the template. At each position the longest matching literal wins (ties by
//! lexical order), matches never overlap, and replacement text is never
//! scanned again, so a replacement containing another placeholder stays as
//! written.

use aho_corasick::{AhoCorasick, MatchKind};

use casegen_map::SubstitutionMap;
use casegen_model::RenderError;

/// Render `template` with `map`.
///
/// Literals absent from the template are ignored.
///
/// # Errors
///
/// Returns [`RenderError::Matcher`] if the matcher cannot be built.
pub fn render(template: &[u8], map: &SubstitutionMap) -> Result<Vec<u8>, RenderError> {
    if map.is_empty() || template.is_empty() {
        return Ok(template.to_vec());
    }
    let ordered = map.ordered_rules();
    let (patterns, replacements): (Vec<&str>, Vec<&str>) = ordered.into_iter().unzip();
    // LeftmostFirst breaks ties at a position by pattern order, which is longest-first here.
    let matcher = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostFirst)
        .build(&patterns)
        .map_err(|error| RenderError::Matcher(error.to_string()))?;
    Ok(matcher.replace_all_bytes(template, &replacements))
}

/// Render a UTF-8 template.
///
/// # Errors
///
/// See [`render`].
pub fn render_str(template: &str, map: &SubstitutionMap) -> Result<String, RenderError> {
    let rendered = render(template.as_bytes(), map)?;
    // Replacements are `str`, so splicing them into valid UTF-8 stays valid.
    String::from_utf8(rendered).map_err(|_| RenderError::NotUtf8 {
        name: "<inline>".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(rules: &[(&str, &str)]) -> SubstitutionMap {
        let mut map = SubstitutionMap::new();
        for (old, new) in rules {
            map.insert_rule(*old, *new).unwrap();
        }
        map
    }

    #[test]
    fn longer_literal_wins_over_its_prefix() {
        let map = map(&[("A", "x"), ("AB", "y")]);
        assert_eq!(render_str("AB", &map).unwrap(), "y");
        assert_eq!(render_str("A AB ABA", &map).unwrap(), "x y yx");
    }

    #[test]
    fn replacements_are_not_rescanned() {
        let map = map(&[("Alpha", "Beta"), ("Beta", "Gamma")]);
        assert_eq!(render_str("Alpha Beta", &map).unwrap(), "Beta Gamma");
    }

    #[test]
    fn missing_literals_are_a_no_op() {
        let map = map(&[("VelocityToReplace", "10")]);
        assert_eq!(render_str("no placeholders", &map).unwrap(), "no placeholders");
    }

    #[test]
    fn renders_binary_content() {
        let map = map(&[("ID", "42")]);
        let template = [0u8, b'I', b'D', 255, b'I'];
        assert_eq!(render(&template, &map).unwrap(), vec![0, b'4', b'2', 255, b'I']);
    }

    #[test]
    fn empty_map_copies_template() {
        let map = SubstitutionMap::new();
        assert_eq!(render(b"CaseName", &map).unwrap(), b"CaseName".to_vec());
    }
}
