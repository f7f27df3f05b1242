//! Splits a raw class string into its variant chain and base utility.
//!
//! `md:data-[state=open]:hover:flex` becomes three variant tokens (`md`,
//! `data-[state=open]`, `hover`) followed by the base utility `flex`. Brackets
//! and parentheses are opaque while splitting, and a backslash escapes the
//! next character.

pub const DEFAULT_SEPARATOR: char = ':';

const COMPOUND_PREFIXES: [&str; 2] = ["group", "peer"];

// Longest prefixes first so `nth-last-of-type-2` is not read as `nth` + `last-of-type-2`.
const FUNCTIONAL_PREFIXES: [&str; 13] = [
    "nth-last-of-type",
    "nth-of-type",
    "nth-last",
    "supports",
    "where",
    "aria",
    "data",
    "has",
    "not",
    "nth",
    "max",
    "min",
    "is",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Static,
    Functional,
    Compound,
    Arbitrary,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariantValue {
    Named(String),
    Arbitrary(String),
}

impl VariantValue {
    pub fn as_str(&self) -> &str {
        match self {
            VariantValue::Named(value) | VariantValue::Arbitrary(value) => value,
        }
    }

    pub fn is_arbitrary(&self) -> bool {
        matches!(self, VariantValue::Arbitrary(_))
    }
}

/// One `name:` segment of a class string.
///
/// * static: `hover` (name only)
/// * functional: `aria-[checked]`, `data-open`, `@md`, `max-lg` (name + value)
/// * compound: `group-hover`, `peer-focus/field`, `group/card-hover` (name is
///   `group`/`peer`, value is the raw sub-variant, modifier is the optional name)
/// * arbitrary: `[&>*]`, `[@media(print)]` (value is the bracket content)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantToken {
    pub kind: VariantKind,
    pub name: String,
    pub value: Option<VariantValue>,
    pub modifier: Option<String>,
    pub raw: String,
}

impl VariantToken {
    pub fn new_static(name: &str) -> Self {
        Self {
            kind: VariantKind::Static,
            name: name.to_string(),
            value: None,
            modifier: None,
            raw: name.to_string(),
        }
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().map(VariantValue::as_str)
    }

    /// For a compound token, the sub-variant it conditions on.
    pub fn inner(&self) -> Option<VariantToken> {
        if self.kind != VariantKind::Compound {
            return None;
        }
        self.value_str().map(classify_variant)
    }
}

/// Tokenize with the default `:` separator.
pub fn tokenize(raw: &str) -> (Vec<VariantToken>, String) {
    tokenize_with(raw, DEFAULT_SEPARATOR)
}

pub fn tokenize_with(raw: &str, separator: char) -> (Vec<VariantToken>, String) {
    if raw.is_empty() {
        return (Vec::new(), String::new());
    }

    let mut segments = split_top_level(raw, separator);
    let base = segments.pop().unwrap_or_default();
    let variants = segments.iter().map(|segment| classify_variant(segment)).collect();
    (variants, base.to_string())
}

fn split_top_level(raw: &str, separator: char) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut escaped = false;
    let mut start = 0usize;

    for (idx, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            _ if ch == separator && bracket_depth == 0 && paren_depth == 0 => {
                segments.push(&raw[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&raw[start..]);
    segments
}

/// Classify one variant segment. Malformed input degrades to a static token.
pub fn classify_variant(segment: &str) -> VariantToken {
    if let Some(inner) = unwrap_brackets(segment) {
        return VariantToken {
            kind: VariantKind::Arbitrary,
            name: String::new(),
            value: Some(VariantValue::Arbitrary(inner.to_string())),
            modifier: None,
            raw: segment.to_string(),
        };
    }

    if let Some(token) = classify_named_compound(segment) {
        return token;
    }

    for prefix in COMPOUND_PREFIXES {
        if let Some(rest) = segment
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
        {
            if rest.is_empty() {
                break;
            }
            return VariantToken {
                kind: VariantKind::Compound,
                name: prefix.to_string(),
                value: Some(VariantValue::Named(rest.to_string())),
                modifier: None,
                raw: segment.to_string(),
            };
        }
    }

    for prefix in FUNCTIONAL_PREFIXES {
        let Some(rest) = segment
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
        else {
            continue;
        };
        if rest.is_empty() {
            break;
        }
        return VariantToken {
            kind: VariantKind::Functional,
            name: prefix.to_string(),
            value: Some(variant_value(rest)),
            modifier: None,
            raw: segment.to_string(),
        };
    }

    if let Some(rest) = segment.strip_prefix('@') {
        return classify_container(segment, rest);
    }

    VariantToken::new_static(segment)
}

// `group-hover/name` and `group/name-hover` both name the marker class.
fn classify_named_compound(segment: &str) -> Option<VariantToken> {
    for prefix in COMPOUND_PREFIXES {
        let Some(rest) = segment.strip_prefix(prefix) else {
            continue;
        };

        if let Some(named) = rest.strip_prefix('/') {
            let (modifier, inner) = named.split_once('-')?;
            if modifier.is_empty() || inner.is_empty() {
                return None;
            }
            return Some(compound(prefix, inner, Some(modifier), segment));
        }

        if let Some(body) = rest.strip_prefix('-') {
            let (inner, modifier) = split_modifier(body);
            let modifier = modifier.filter(|m| !m.is_empty())?;
            if inner.is_empty() {
                return None;
            }
            return Some(compound(prefix, inner, Some(modifier), segment));
        }
    }
    None
}

fn compound(name: &str, inner: &str, modifier: Option<&str>, raw: &str) -> VariantToken {
    VariantToken {
        kind: VariantKind::Compound,
        name: name.to_string(),
        value: Some(VariantValue::Named(inner.to_string())),
        modifier: modifier.map(str::to_string),
        raw: raw.to_string(),
    }
}

fn classify_container(segment: &str, rest: &str) -> VariantToken {
    let (body, modifier) = split_modifier(rest);
    let modifier = modifier.filter(|m| !m.is_empty()).map(str::to_string);

    let (name, value) = if let Some(size) = body.strip_prefix("min-") {
        ("@min", Some(size))
    } else if let Some(size) = body.strip_prefix("max-") {
        ("@max", Some(size))
    } else if body.is_empty() {
        ("@", None)
    } else {
        ("@", Some(body))
    };

    VariantToken {
        kind: VariantKind::Functional,
        name: name.to_string(),
        value: value.filter(|v| !v.is_empty()).map(variant_value),
        modifier,
        raw: segment.to_string(),
    }
}

fn variant_value(raw: &str) -> VariantValue {
    match unwrap_brackets(raw) {
        Some(inner) => VariantValue::Arbitrary(inner.to_string()),
        None => VariantValue::Named(raw.to_string()),
    }
}

/// Returns the content of `[...]` when the whole input is one bracketed span.
pub(crate) fn unwrap_brackets(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    let mut depth = 0isize;
    for ch in inner.chars() {
        match ch {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0 && !inner.is_empty()).then_some(inner)
}

/// Splits a trailing `/modifier` that sits outside brackets and parentheses.
pub(crate) fn split_modifier(raw: &str) -> (&str, Option<&str>) {
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut split = None;

    for (idx, ch) in raw.char_indices() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '/' if bracket_depth == 0 && paren_depth == 0 => split = Some(idx),
            _ => {}
        }
    }

    match split {
        Some(idx) => (&raw[..idx], Some(&raw[idx + 1..])),
        None => (raw, None),
    }
}

#[cfg(test)]
mod tests {
    use super::{VariantKind, VariantValue, classify_variant, tokenize, tokenize_with};

    #[test]
    fn empty_input_yields_nothing() {
        let (variants, base) = tokenize("");
        assert!(variants.is_empty());
        assert_eq!(base, "");
    }

    #[test]
    fn splits_variants_in_source_order() {
        let (variants, base) = tokenize("hover:focus:block");
        assert_eq!(base, "block");
        let names: Vec<_> = variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["hover", "focus"]);

        let (reversed, _) = tokenize("focus:hover:block");
        assert_ne!(variants, reversed);
    }

    #[test]
    fn brackets_are_opaque() {
        let (variants, base) = tokenize("md:data-[state=open]:[mask-type:luminance]");
        assert_eq!(base, "[mask-type:luminance]");
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].kind, VariantKind::Functional);
        assert_eq!(variants[1].name, "data");
        assert_eq!(
            variants[1].value,
            Some(VariantValue::Arbitrary("state=open".to_string()))
        );
    }

    #[test]
    fn escaped_separator_does_not_split() {
        let (variants, base) = tokenize(r"hover:w-\:x");
        assert_eq!(variants.len(), 1);
        assert_eq!(base, r"w-\:x");
    }

    #[test]
    fn custom_separator() {
        let (variants, base) = tokenize_with("hover_focus_flex", '_');
        assert_eq!(variants.len(), 2);
        assert_eq!(base, "flex");
    }

    #[test]
    fn classifies_arbitrary_variants() {
        let token = classify_variant("[&>*]");
        assert_eq!(token.kind, VariantKind::Arbitrary);
        assert_eq!(token.value_str(), Some("&>*"));

        let token = classify_variant("[@media(print)]");
        assert_eq!(token.kind, VariantKind::Arbitrary);
        assert_eq!(token.value_str(), Some("@media(print)"));
    }

    #[test]
    fn classifies_compound_variants() {
        let token = classify_variant("group-hover");
        assert_eq!(token.kind, VariantKind::Compound);
        assert_eq!(token.name, "group");
        assert_eq!(token.value_str(), Some("hover"));
        assert_eq!(token.modifier, None);

        let token = classify_variant("peer-focus/field");
        assert_eq!(token.name, "peer");
        assert_eq!(token.value_str(), Some("focus"));
        assert_eq!(token.modifier.as_deref(), Some("field"));

        let token = classify_variant("group/card-hover");
        assert_eq!(token.name, "group");
        assert_eq!(token.value_str(), Some("hover"));
        assert_eq!(token.modifier.as_deref(), Some("card"));

        let inner = token.inner().expect("compound has an inner token");
        assert_eq!(inner.kind, VariantKind::Static);
        assert_eq!(inner.name, "hover");
    }

    #[test]
    fn classifies_functional_variants() {
        let token = classify_variant("aria-[checked]");
        assert_eq!(token.name, "aria");
        assert_eq!(token.value, Some(VariantValue::Arbitrary("checked".into())));

        let token = classify_variant("aria-checked");
        assert_eq!(token.value, Some(VariantValue::Named("checked".into())));

        let token = classify_variant("nth-last-of-type-2");
        assert_eq!(token.name, "nth-last-of-type");
        assert_eq!(token.value_str(), Some("2"));
    }

    #[test]
    fn classifies_container_variants() {
        let token = classify_variant("@md");
        assert_eq!(token.name, "@");
        assert_eq!(token.value_str(), Some("md"));

        let token = classify_variant("@min-[400px]/sidebar");
        assert_eq!(token.name, "@min");
        assert_eq!(token.value, Some(VariantValue::Arbitrary("400px".into())));
        assert_eq!(token.modifier.as_deref(), Some("sidebar"));

        let token = classify_variant("@");
        assert_eq!(token.name, "@");
        assert_eq!(token.value, None);
    }

    #[test]
    fn malformed_segments_degrade_to_static() {
        for raw in ["group-", "data-", "[unclosed", "what-is-this"] {
            let token = classify_variant(raw);
            assert_eq!(token.kind, VariantKind::Static, "{raw}");
            assert_eq!(token.raw, raw);
        }
    }
}
