//! Reads theme source text: `@theme { --token: value; }` blocks, component
//! `.selector { @apply a b c; }` blocks and `@utility` definitions.

use crate::css_text::{find_matching_brace, is_top_level_position, strip_comments};
use crate::custom::{UtilityDefinition, parse_utility_definitions};
use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeSource {
    /// `--name: value` pairs in source order; later duplicates win when applied.
    pub variables: Vec<(String, String)>,
    /// Component selector to class list. A later duplicate selector replaces the
    /// earlier entry.
    pub applies: IndexMap<String, Vec<String>>,
    pub utilities: Vec<UtilityDefinition>,
}

impl ThemeSource {
    /// Folds `other` into `self`; `other` is the later fragment.
    pub fn extend(&mut self, other: ThemeSource) {
        self.variables.extend(other.variables);
        for (selector, classes) in other.applies {
            self.applies.shift_remove(&selector);
            self.applies.insert(selector, classes);
        }
        self.utilities.extend(other.utilities);
    }
}

pub fn parse_source(css: &str) -> ThemeSource {
    let css = strip_comments(css);
    ThemeSource {
        variables: extract_theme_blocks(&css)
            .into_iter()
            .flat_map(extract_theme_variable_declarations)
            .collect(),
        applies: extract_apply_blocks(&css),
        utilities: parse_utility_definitions(&css),
    }
}

/// Parses fragments in the order given; later fragments override earlier ones.
pub fn parse_sources<S: AsRef<str>>(fragments: &[S]) -> ThemeSource {
    let mut merged = ThemeSource::default();
    for fragment in fragments {
        merged.extend(parse_source(fragment.as_ref()));
    }
    merged
}

fn extract_theme_blocks(css: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel_start) = css[cursor..].find("@theme") {
        let theme_idx = cursor + rel_start;
        if !is_top_level_position(css, theme_idx) {
            cursor = theme_idx + "@theme".len();
            continue;
        }
        let Some(open_rel) = css[theme_idx..].find('{') else {
            break;
        };
        let open_idx = theme_idx + open_rel;
        let Some(close_idx) = find_matching_brace(css, open_idx) else {
            break;
        };
        blocks.push(&css[open_idx + 1..close_idx]);
        cursor = close_idx + 1;
    }

    blocks
}

fn extract_theme_variable_declarations(body: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut segment_start = 0usize;

    for (idx, ch) in body.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    segment_start = idx + 1;
                }
            }
            ';' if depth == 0 => {
                push_variable(&body[segment_start..idx], &mut declarations);
                segment_start = idx + 1;
            }
            _ => {}
        }
    }
    push_variable(&body[segment_start..], &mut declarations);

    declarations
}

fn push_variable(segment: &str, declarations: &mut Vec<(String, String)>) {
    let Some((name, value)) = segment.trim().split_once(':') else {
        return;
    };
    let name = name.trim();
    let value = value.trim();
    if name.len() <= 2 || !name.starts_with("--") || value.is_empty() {
        return;
    }
    declarations.push((name.to_string(), value.to_string()));
}

fn extract_apply_blocks(css: &str) -> IndexMap<String, Vec<String>> {
    let mut applies = IndexMap::new();
    let mut cursor = 0usize;
    let mut segment_start = 0usize;

    while cursor < css.len() {
        let Some(ch) = css[cursor..].chars().next() else {
            break;
        };
        match ch {
            ';' => {
                segment_start = cursor + 1;
                cursor += 1;
            }
            '{' => {
                let Some(close_idx) = find_matching_brace(css, cursor) else {
                    break;
                };
                let header = css[segment_start..cursor].trim();
                if !header.is_empty() && !header.starts_with('@') {
                    let classes = apply_classes(&css[cursor + 1..close_idx]);
                    if !classes.is_empty() {
                        applies.shift_remove(header);
                        applies.insert(header.to_string(), classes);
                    }
                }
                cursor = close_idx + 1;
                segment_start = cursor;
            }
            _ => cursor += ch.len_utf8(),
        }
    }

    applies
}

fn apply_classes(body: &str) -> Vec<String> {
    body.split(';')
        .filter_map(|statement| statement.trim().strip_prefix("@apply"))
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_source, parse_sources};

    #[test]
    fn reads_theme_variables() {
        let source = parse_source(
            r#"
            /* palette */
            @theme {
              --color-brand-500: #3b82f6;
              --font-sans: "Inter", sans-serif;
              @keyframes spin { to { transform: rotate(360deg); } }
              --spacing: 0.25rem
            }
            "#,
        );
        assert_eq!(
            source.variables,
            vec![
                ("--color-brand-500".to_string(), "#3b82f6".to_string()),
                ("--font-sans".to_string(), "\"Inter\", sans-serif".to_string()),
                ("--spacing".to_string(), "0.25rem".to_string()),
            ]
        );
    }

    #[test]
    fn reads_apply_blocks() {
        let source = parse_source(
            r#"
            .btn { @apply px-4 py-2 rounded; }
            .card > h2 { color: red; @apply font-bold; }
            @media print { .x { @apply hidden; } }
            "#,
        );
        assert_eq!(source.applies.len(), 2);
        assert_eq!(source.applies[".btn"], vec!["px-4", "py-2", "rounded"]);
        assert_eq!(source.applies[".card > h2"], vec!["font-bold"]);
    }

    #[test]
    fn later_fragments_override_earlier() {
        let source = parse_sources(&[
            "@theme { --color-a: red; } .btn { @apply p-1; } .card { @apply p-2; }",
            "@theme { --color-a: blue; } .btn { @apply p-3; }",
        ]);
        assert_eq!(source.variables.last().map(|(_, v)| v.as_str()), Some("blue"));
        let selectors: Vec<_> = source.applies.keys().map(String::as_str).collect();
        assert_eq!(selectors, vec![".card", ".btn"]);
        assert_eq!(source.applies[".btn"], vec!["p-3"]);
    }

    #[test]
    fn collects_utility_definitions() {
        let source = parse_source("@utility tab-* { color: --value(--color-*); }");
        assert_eq!(source.utilities.len(), 1);
        assert_eq!(source.utilities[0].pattern, "tab-*");
    }
}
