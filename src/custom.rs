//! `@utility` definitions.
//!
//! A pattern without `*` becomes a [`StaticCustomUtility`] that answers for
//! exactly that class. A pattern with `*` becomes a [`DynamicCustomUtility`]
//! rooted at the literal text before the first wildcard segment; each `*`
//! captures part of the class and is substituted into declaration values
//! either literally or through `--value(...)`.

use crate::ast::AstNode;
use crate::candidate::{Candidate, CandidateKind, CandidateValue};
use crate::css_text::{
    find_matching_brace, find_matching_paren, is_top_level_position, split_top_level,
};
use crate::theme::{DEFAULT_INLINE_DEPTH, Theme, normalize_key};
use crate::utilities::values::{ArbitraryType, accepts};
use crate::utilities::{Priority, UtilityHandler};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, OnceLock};
use thiserror::Error;
use tracing::debug;

static PATTERN_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:-(?:[a-z0-9]+|\*))*$").expect("valid pattern grammar")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("utility pattern is empty")]
    EmptyPattern,
    #[error("utility '{0}' has no declarations")]
    NoDeclarations(String),
    #[error("utility pattern '{0}' must be lowercase words joined by '-'")]
    InvalidPattern(String),
    #[error("utility pattern '{0}' mixes '*' with other characters in one segment")]
    PartialWildcard(String),
}

/// A nested `&selector { ... }` block inside an `@utility`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilityDefinition {
    pub pattern: String,
    pub declarations: Vec<(String, String)>,
    pub nested: Vec<NestedRule>,
}

impl UtilityDefinition {
    pub fn is_wildcard(&self) -> bool {
        self.pattern.contains('*')
    }

    /// The literal head of the pattern: `tab` for `tab-*`, the whole pattern
    /// when there is no wildcard.
    pub fn root(&self) -> &str {
        match self.pattern.find("-*") {
            Some(idx) => &self.pattern[..idx],
            None => &self.pattern,
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        let pattern = self.pattern.as_str();
        if pattern.is_empty() {
            return Err(DefinitionError::EmptyPattern);
        }
        if pattern
            .split('-')
            .any(|segment| segment.contains('*') && segment != "*")
        {
            return Err(DefinitionError::PartialWildcard(pattern.to_string()));
        }
        if !PATTERN_GRAMMAR.is_match(pattern) {
            return Err(DefinitionError::InvalidPattern(pattern.to_string()));
        }
        let has_nested = self.nested.iter().any(|rule| !rule.declarations.is_empty());
        if self.declarations.is_empty() && !has_nested {
            return Err(DefinitionError::NoDeclarations(pattern.to_string()));
        }
        Ok(())
    }

    /// Builds the handler for a valid definition.
    pub fn into_handler(self) -> Result<Arc<dyn UtilityHandler>, DefinitionError> {
        self.validate()?;
        if !self.is_wildcard() {
            return Ok(Arc::new(StaticCustomUtility {
                name: format!("@utility {}", self.pattern),
                definition: self,
            }));
        }
        let matcher = PatternCache::global()
            .get_or_compile(&self.pattern)
            .ok_or_else(|| DefinitionError::InvalidPattern(self.pattern.clone()))?;
        Ok(Arc::new(DynamicCustomUtility {
            name: format!("@utility {}", self.pattern),
            definition: self,
            matcher,
        }))
    }
}

/// Collects every top-level `@utility` block. Definitions are returned as
/// written; validation happens when they are turned into handlers.
pub fn parse_utility_definitions(css: &str) -> Vec<UtilityDefinition> {
    let mut definitions = Vec::new();
    let mut cursor = 0usize;

    while let Some(rel_start) = css[cursor..].find("@utility") {
        let utility_idx = cursor + rel_start;
        if !is_top_level_position(css, utility_idx) {
            cursor = utility_idx + "@utility".len();
            continue;
        }
        let Some(open_rel) = css[utility_idx..].find('{') else {
            break;
        };
        let open_idx = utility_idx + open_rel;
        let Some(close_idx) = find_matching_brace(css, open_idx) else {
            break;
        };

        let header = css[utility_idx + "@utility".len()..open_idx].trim();
        let pattern = header.split_whitespace().next().unwrap_or_default();
        let (declarations, nested) = parse_body(&css[open_idx + 1..close_idx]);
        definitions.push(UtilityDefinition {
            pattern: pattern.to_string(),
            declarations,
            nested,
        });

        cursor = close_idx + 1;
    }

    definitions
}

fn parse_body(body: &str) -> (Vec<(String, String)>, Vec<NestedRule>) {
    let mut declarations = Vec::new();
    let mut nested = Vec::new();
    let mut cursor = 0usize;
    let mut segment_start = 0usize;

    while cursor < body.len() {
        let Some(ch) = body[cursor..].chars().next() else {
            break;
        };
        match ch {
            '(' => match find_matching_paren(body, cursor) {
                Some(close) => cursor = close + 1,
                None => break,
            },
            '"' | '\'' => match body[cursor + 1..].find(ch) {
                Some(rel) => cursor += rel + 2,
                None => break,
            },
            ';' => {
                push_declaration(&body[segment_start..cursor], &mut declarations);
                cursor += 1;
                segment_start = cursor;
            }
            '{' => {
                let Some(close) = find_matching_brace(body, cursor) else {
                    break;
                };
                let selector = body[segment_start..cursor].trim();
                if !selector.is_empty() {
                    let mut inner = Vec::new();
                    for statement in split_top_level(&body[cursor + 1..close], ';') {
                        push_declaration(statement, &mut inner);
                    }
                    nested.push(NestedRule {
                        selector: selector.to_string(),
                        declarations: inner,
                    });
                }
                cursor = close + 1;
                segment_start = cursor;
            }
            _ => cursor += ch.len_utf8(),
        }
    }
    push_declaration(&body[segment_start..], &mut declarations);

    (declarations, nested)
}

fn push_declaration(statement: &str, out: &mut Vec<(String, String)>) {
    let Some((property, value)) = statement.trim().split_once(':') else {
        return;
    };
    let property = property.trim();
    let value = value.trim();
    // A nested block inside a nested block is not a declaration.
    if property.is_empty() || value.is_empty() || value.contains('{') {
        return;
    }
    out.push((property.to_string(), value.to_string()));
}

/// Compiled wildcard patterns shared by every framework in the process.
#[derive(Default)]
pub struct PatternCache {
    patterns: RwLock<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    pub fn global() -> &'static PatternCache {
        static CACHE: OnceLock<PatternCache> = OnceLock::new();
        CACHE.get_or_init(PatternCache::default)
    }

    /// Returns the matcher for `pattern`, compiling it at most once per key.
    /// The regex is built outside the lock; a racing writer that inserted
    /// first wins and the local copy is dropped.
    pub fn get_or_compile(&self, pattern: &str) -> Option<Arc<Regex>> {
        if let Some(found) = self.patterns.read().get(pattern) {
            return Some(Arc::clone(found));
        }

        let compiled = match Regex::new(&wildcard_regex(pattern)) {
            Ok(regex) => Arc::new(regex),
            Err(err) => {
                debug!(pattern, error = %err, "wildcard pattern failed to compile");
                return None;
            }
        };

        let mut patterns = self.patterns.write();
        let entry = patterns.entry(pattern.to_string()).or_insert_with(|| {
            debug!(pattern, "cached wildcard pattern");
            compiled
        });
        Some(Arc::clone(entry))
    }

    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.read().is_empty()
    }
}

fn wildcard_regex(pattern: &str) -> String {
    let body: Vec<String> = pattern.split('*').map(regex::escape).collect();
    format!("^{}$", body.join("(.+)"))
}

pub struct StaticCustomUtility {
    name: String,
    definition: UtilityDefinition,
}

impl UtilityHandler for StaticCustomUtility {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        Priority::ExactStatic
    }

    fn static_roots(&self) -> Vec<String> {
        vec![self.definition.pattern.clone()]
    }

    fn compile(&self, candidate: &Candidate, _theme: &Theme) -> Option<Vec<AstNode>> {
        match &candidate.kind {
            CandidateKind::Static { root } if *root == self.definition.pattern => {}
            _ => return None,
        }
        let mut nodes: Vec<AstNode> = self
            .definition
            .declarations
            .iter()
            .map(|(property, value)| AstNode::decl(property.as_str(), value.as_str()))
            .collect();
        nodes.extend(self.definition.nested.iter().map(|rule| {
            AstNode::rule(
                rule.selector.as_str(),
                rule.declarations
                    .iter()
                    .map(|(property, value)| AstNode::decl(property.as_str(), value.as_str()))
                    .collect(),
            )
        }));
        Some(nodes)
    }
}

pub struct DynamicCustomUtility {
    name: String,
    definition: UtilityDefinition,
    matcher: Arc<Regex>,
}

/// What a wildcard matched in one class.
struct Captures<'a> {
    values: Vec<String>,
    arbitrary: Option<&'a CandidateValue>,
}

impl DynamicCustomUtility {
    fn captures<'a>(
        &self,
        candidate: &Candidate,
        value: &'a CandidateValue,
    ) -> Option<Captures<'a>> {
        let root = candidate.root()?;
        match value {
            CandidateValue::Named { value: named, .. } => {
                let subject = format!("{}-{}", root, named);
                let found = self.matcher.captures(&subject)?;
                let values = found
                    .iter()
                    .skip(1)
                    .filter_map(|group| group.map(|m| m.as_str().to_string()))
                    .collect();
                Some(Captures {
                    values,
                    arbitrary: None,
                })
            }
            // `tab-[3]` only fits a pattern whose single wildcard is the tail.
            CandidateValue::Arbitrary { value: raw, .. } => {
                let pattern = &self.definition.pattern;
                let tail_only = pattern.matches('*').count() == 1
                    && pattern.strip_suffix("-*") == Some(root);
                tail_only.then(|| Captures {
                    values: vec![raw.clone()],
                    arbitrary: Some(value),
                })
            }
        }
    }

    fn substitute(&self, value: &str, captures: &Captures<'_>, theme: &Theme) -> Option<String> {
        let mut next_capture = 0usize;
        let mut take = || {
            let idx = next_capture.min(captures.values.len().saturating_sub(1));
            next_capture += 1;
            captures.values.get(idx).cloned().unwrap_or_default()
        };

        let mut out = String::with_capacity(value.len());
        let mut cursor = 0usize;
        while cursor < value.len() {
            let rest = &value[cursor..];
            if rest.starts_with("--value(") {
                let open = cursor + "--value".len();
                let close = find_matching_paren(value, open)?;
                let capture = take();
                out.push_str(&resolve_value_function(
                    &value[open + 1..close],
                    &capture,
                    captures.arbitrary,
                    theme,
                )?);
                cursor = close + 1;
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            if ch == '*' && !is_arithmetic_star(value, cursor) {
                out.push_str(&take());
            } else {
                out.push(ch);
            }
            cursor += ch.len_utf8();
        }
        Some(out)
    }

    fn declarations(
        &self,
        declarations: &[(String, String)],
        captures: &Captures<'_>,
        theme: &Theme,
    ) -> Option<Vec<AstNode>> {
        declarations
            .iter()
            .map(|(property, value)| {
                self.substitute(value, captures, theme)
                    .map(|value| AstNode::decl(property.as_str(), value))
            })
            .collect()
    }
}

/// `calc(a * b)` keeps its operator.
fn is_arithmetic_star(value: &str, idx: usize) -> bool {
    let before = value[..idx].chars().next_back();
    let after = value[idx + 1..].chars().next();
    matches!((before, after), (Some(b), Some(a)) if b.is_whitespace() && a.is_whitespace())
}

/// Tries each `--value(...)` argument in order: a theme key template
/// (`--color-*`), a bare data type (`integer`, `number`, `percentage`), an
/// arbitrary type (`[color]`, `[*]`), or a quoted literal. An arbitrary
/// candidate that none of them accepts passes its raw value through.
fn resolve_value_function(
    args: &str,
    capture: &str,
    arbitrary: Option<&CandidateValue>,
    theme: &Theme,
) -> Option<String> {
    for arg in split_top_level(args, ',') {
        let arg = arg.trim();
        if let Some(template) = arg.strip_prefix("--") {
            if arbitrary.is_some() {
                continue;
            }
            let key = format!("--{}", template.replace('*', &normalize_key(capture)));
            if let Some(raw) = theme.get(&key) {
                return Some(theme.resolve_inline(raw, DEFAULT_INLINE_DEPTH));
            }
            continue;
        }
        if let Some(kind) = arg.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
            let Some(value) = arbitrary else {
                continue;
            };
            if kind == "*" || accepts(value, &[ArbitraryType::from_hint(kind)]) {
                return Some(value.as_str().to_string());
            }
            continue;
        }
        if let Some(literal) = arg
            .strip_prefix('"')
            .and_then(|a| a.strip_suffix('"'))
            .or_else(|| arg.strip_prefix('\'').and_then(|a| a.strip_suffix('\'')))
        {
            if arbitrary.is_none() && literal == capture {
                return Some(literal.to_string());
            }
            continue;
        }
        if arbitrary.is_none() && bare_type_matches(arg, capture) {
            return Some(match arg {
                "percentage" => format!("{}%", capture),
                _ => capture.to_string(),
            });
        }
    }
    arbitrary.map(|value| value.as_str().to_string())
}

fn bare_type_matches(kind: &str, capture: &str) -> bool {
    match kind {
        "integer" => !capture.is_empty() && capture.chars().all(|ch| ch.is_ascii_digit()),
        "number" | "percentage" => capture.parse::<f64>().is_ok_and(|n| n >= 0.0),
        _ => false,
    }
}

impl UtilityHandler for DynamicCustomUtility {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> Priority {
        Priority::NamespaceHandler
    }

    fn functional_roots(&self) -> Vec<String> {
        vec![self.definition.root().to_string()]
    }

    fn compile(&self, candidate: &Candidate, theme: &Theme) -> Option<Vec<AstNode>> {
        if candidate.negative || candidate.modifier.is_some() {
            return None;
        }
        let value = candidate.value()?;
        let captures = self.captures(candidate, &value)?;

        let mut nodes = self.declarations(&self.definition.declarations, &captures, theme)?;
        for rule in &self.definition.nested {
            let children = self.declarations(&rule.declarations, &captures, theme)?;
            nodes.push(AstNode::rule(rule.selector.as_str(), children));
        }
        Some(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::{DefinitionError, PatternCache, UtilityDefinition, parse_utility_definitions};
    use crate::ast::AstNode;
    use crate::theme::Theme;
    use crate::utilities::UtilityRegistry;
    use std::sync::Arc;

    fn registry(css: &str) -> UtilityRegistry {
        let mut registry = UtilityRegistry::new();
        for definition in parse_utility_definitions(css) {
            let handler = definition.into_handler().expect("valid definition");
            registry.register(handler).expect("registers");
        }
        registry
    }

    fn definition(pattern: &str) -> UtilityDefinition {
        UtilityDefinition {
            pattern: pattern.to_string(),
            declarations: vec![("color".to_string(), "red".to_string())],
            nested: Vec::new(),
        }
    }

    #[test]
    fn parses_declarations_and_one_nested_level() {
        let parsed = parse_utility_definitions(
            r#"
            @utility scrollbar-hidden {
              scrollbar-width: none;
              &::-webkit-scrollbar { display: none; }
            }
            .other { color: red; }
            @utility content-auto { content-visibility: auto }
            "#,
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].pattern, "scrollbar-hidden");
        assert_eq!(
            parsed[0].declarations,
            vec![("scrollbar-width".to_string(), "none".to_string())]
        );
        assert_eq!(parsed[0].nested[0].selector, "&::-webkit-scrollbar");
        assert_eq!(
            parsed[1].declarations,
            vec![("content-visibility".to_string(), "auto".to_string())]
        );
    }

    #[test]
    fn semicolons_inside_functions_do_not_split() {
        let parsed = parse_utility_definitions(
            r#"@utility quoted { content: "a;b"; background: url(a;b.png); }"#,
        );
        assert_eq!(parsed[0].declarations.len(), 2);
        assert_eq!(parsed[0].declarations[1].1, "url(a;b.png)");
    }

    #[test]
    fn validation_rejects_bad_definitions() {
        assert_eq!(definition("").validate(), Err(DefinitionError::EmptyPattern));
        assert!(matches!(
            definition("tab*").validate(),
            Err(DefinitionError::PartialWildcard(_))
        ));
        assert!(matches!(
            definition("Tab-*").validate(),
            Err(DefinitionError::InvalidPattern(_))
        ));
        assert!(matches!(
            definition("-tab").validate(),
            Err(DefinitionError::InvalidPattern(_))
        ));
        let empty = UtilityDefinition {
            declarations: Vec::new(),
            ..definition("tab-*")
        };
        assert!(matches!(
            empty.validate(),
            Err(DefinitionError::NoDeclarations(_))
        ));
        assert!(definition("btn-*-outline").validate().is_ok());
    }

    #[test]
    fn static_definition_matches_only_its_name() {
        let registry = registry("@utility content-auto { content-visibility: auto; }");
        let resolved = registry
            .resolve("content-auto", &Theme::new())
            .expect("static match");
        assert_eq!(
            resolved.nodes,
            vec![AstNode::decl("content-visibility", "auto")]
        );
        assert!(registry.resolve("content-autox", &Theme::new()).is_none());
    }

    #[test]
    fn value_function_resolves_theme_keys() {
        let theme = Theme::new()
            .add("--color-base", "#123456")
            .add("--color-primary", "var(--color-base)");
        let registry = registry("@utility tab-* { color: --value(--color-*); }");
        let resolved = registry.resolve("tab-primary", &theme).expect("theme key");
        assert_eq!(resolved.nodes, vec![AstNode::decl("color", "#123456")]);
        assert!(registry.resolve("tab-missing", &theme).is_none());
    }

    #[test]
    fn value_function_falls_back_to_arbitrary_values() {
        let registry = registry(concat!(
            "@utility tab-* { tab-size: --value(integer, [integer]); ",
            "color: --value(--color-*); }"
        ));
        let resolved = registry.resolve("tab-4", &Theme::new());
        assert!(resolved.is_none(), "color has no theme key for 4");

        let resolved = registry.resolve("tab-[8]", &Theme::new()).expect("arbitrary");
        assert_eq!(
            resolved.nodes,
            vec![AstNode::decl("tab-size", "8"), AstNode::decl("color", "8")]
        );
    }

    #[test]
    fn literal_stars_take_captures_in_order() {
        let registry = registry(
            "@utility btn-*-outline { border-color: *; width: calc(2px * 3); &:hover { color: * } }",
        );
        let resolved = registry
            .resolve("btn-red-outline", &Theme::new())
            .expect("matches");
        assert_eq!(
            resolved.nodes,
            vec![
                AstNode::decl("border-color", "red"),
                AstNode::decl("width", "calc(2px * 3)"),
                AstNode::rule("&:hover", vec![AstNode::decl("color", "red")]),
            ]
        );
    }

    #[test]
    fn exact_static_beats_a_matching_wildcard() {
        let registry = registry(
            "@utility btn-* { color: *; } @utility btn-primary { color: blue; }",
        );
        let resolved = registry.resolve("btn-primary", &Theme::new()).expect("matches");
        assert_eq!(resolved.nodes, vec![AstNode::decl("color", "blue")]);
        let resolved = registry.resolve("btn-green", &Theme::new()).expect("matches");
        assert_eq!(resolved.nodes, vec![AstNode::decl("color", "green")]);
    }

    #[test]
    fn pattern_cache_compiles_each_pattern_once() {
        let cache = PatternCache::default();
        let first = cache.get_or_compile("card-*").expect("compiles");
        let second = cache.get_or_compile("card-*").expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(first.is_match("card-wide"));
        assert!(!first.is_match("card-"));
    }

    #[test]
    fn pattern_cache_is_shared_across_threads() {
        let cache = Arc::new(PatternCache::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_or_compile("chip-*-x").expect("compiles"))
            })
            .collect();
        let compiled: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread finished"))
            .collect();
        assert!(compiled.iter().all(|regex| Arc::ptr_eq(regex, &compiled[0])));
        assert_eq!(cache.len(), 1);
    }
}
