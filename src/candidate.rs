//! Classification of a base utility (`bg-red-500/50`, `-mt-4`, `w-1/2`,
//! `bg-[#123]`, `[mask-type:luminance]`) into typed candidates.
//!
//! A base utility can be read more than one way: `bg-red-500` is root `bg`
//! with value `red-500`, but a registry that knows a `bg-red` root would also
//! see root `bg-red` with value `500`. [`parse_candidates`] returns every
//! reading whose root is known, most specific first, and leaves the choice to
//! the utility resolver.

use crate::css_text::normalize_arbitrary_content;
use crate::segment::{split_modifier, unwrap_brackets};

/// Bracket type hints accepted before a `:` (`text-[length:var(--x)]`).
const TYPE_HINTS: [&str; 14] = [
    "color",
    "length",
    "percentage",
    "number",
    "integer",
    "url",
    "image",
    "position",
    "family-name",
    "absolute-size",
    "relative-size",
    "line-width",
    "angle",
    "any",
];

/// The set of roots a resolver knows, used to decide where a base utility
/// splits into root and value.
pub trait RootLookup {
    fn is_static_root(&self, root: &str) -> bool;

    fn is_functional_root(&self, root: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateValue {
    /// `red-500`, `4`, `1` of `w-1/2` (with `fraction` set to `1/2`).
    Named {
        value: String,
        fraction: Option<String>,
    },
    /// Bracket or parenthesis content, underscores already decoded.
    Arbitrary {
        value: String,
        type_hint: Option<String>,
    },
}

impl CandidateValue {
    pub fn as_str(&self) -> &str {
        match self {
            CandidateValue::Named { value, .. } | CandidateValue::Arbitrary { value, .. } => value,
        }
    }

    pub fn is_arbitrary(&self) -> bool {
        matches!(self, CandidateValue::Arbitrary { .. })
    }

    pub fn fraction(&self) -> Option<&str> {
        match self {
            CandidateValue::Named { fraction, .. } => fraction.as_deref(),
            CandidateValue::Arbitrary { .. } => None,
        }
    }

    pub fn type_hint(&self) -> Option<&str> {
        match self {
            CandidateValue::Arbitrary { type_hint, .. } => type_hint.as_deref(),
            CandidateValue::Named { .. } => None,
        }
    }
}

/// The `/50` or `/[0.35]` suffix of a base utility.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Modifier {
    Named(String),
    Arbitrary(String),
}

impl Modifier {
    pub fn as_str(&self) -> &str {
        match self {
            Modifier::Named(value) | Modifier::Arbitrary(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Static {
        root: String,
    },
    Functional {
        root: String,
        value: Option<CandidateValue>,
    },
    ArbitraryValue {
        namespace: String,
        raw_value: String,
        type_hint: Option<String>,
    },
    ArbitraryProperty {
        property: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub modifier: Option<Modifier>,
    pub negative: bool,
    pub important: bool,
    /// The base utility without its `!` marker.
    pub body: String,
}

impl Candidate {
    /// Static root, functional root, or arbitrary-value namespace.
    pub fn root(&self) -> Option<&str> {
        match &self.kind {
            CandidateKind::Static { root } | CandidateKind::Functional { root, .. } => Some(root),
            CandidateKind::ArbitraryValue { namespace, .. } => Some(namespace),
            CandidateKind::ArbitraryProperty { .. } => None,
        }
    }

    /// The value a functional handler works with; arbitrary values are
    /// presented as [`CandidateValue::Arbitrary`].
    pub fn value(&self) -> Option<CandidateValue> {
        match &self.kind {
            CandidateKind::Functional { value, .. } => value.clone(),
            CandidateKind::ArbitraryValue {
                raw_value,
                type_hint,
                ..
            } => Some(CandidateValue::Arbitrary {
                value: raw_value.clone(),
                type_hint: type_hint.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self.kind, CandidateKind::Static { .. })
    }

    pub fn is_arbitrary_property(&self) -> bool {
        matches!(self.kind, CandidateKind::ArbitraryProperty { .. })
    }
}

/// Every reading of `base` the registry's roots allow, in the order the
/// resolver should consider them when priorities tie: arbitrary property,
/// exact static, arbitrary value, then functional splits from the longest
/// root to the shortest.
pub fn parse_candidates(base: &str, roots: &impl RootLookup) -> Vec<Candidate> {
    let (body, important) = strip_important(base);
    if body.is_empty() {
        return Vec::new();
    }

    let make = |kind: CandidateKind, modifier: Option<Modifier>, negative: bool| Candidate {
        kind,
        modifier,
        negative,
        important,
        body: body.to_string(),
    };

    if body.starts_with('[') {
        let (head, modifier) = split_modifier(body);
        let Some(modifier) = parse_modifier(modifier) else {
            return Vec::new();
        };
        return unwrap_brackets(head)
            .and_then(parse_arbitrary_property)
            .map(|kind| vec![make(kind, modifier, false)])
            .unwrap_or_default();
    }

    let mut out = Vec::new();

    let (negative, unsigned) = match body.strip_prefix('-') {
        Some(rest) if !rest.is_empty() && !rest.starts_with('-') => (true, rest),
        _ => (false, body),
    };

    if !negative && roots.is_static_root(body) {
        out.push(make(
            CandidateKind::Static {
                root: body.to_string(),
            },
            None,
            false,
        ));
    }

    let (head, modifier) = split_modifier(unsigned);
    let Some(modifier) = parse_modifier(modifier) else {
        return out;
    };

    if let Some((namespace, raw_value, type_hint)) = split_arbitrary_value(head) {
        if roots.is_functional_root(namespace) {
            out.push(make(
                CandidateKind::ArbitraryValue {
                    namespace: namespace.to_string(),
                    raw_value,
                    type_hint,
                },
                modifier,
                negative,
            ));
        }
        return out;
    }

    if roots.is_functional_root(head) {
        out.push(make(
            CandidateKind::Functional {
                root: head.to_string(),
                value: None,
            },
            modifier.clone(),
            negative,
        ));
    }

    for (idx, _) in head.rmatch_indices('-') {
        let (root, value) = (&head[..idx], &head[idx + 1..]);
        if root.is_empty() || value.is_empty() || !roots.is_functional_root(root) {
            continue;
        }
        let fraction = match &modifier {
            Some(Modifier::Named(denominator)) if is_digits(value) && is_digits(denominator) => {
                Some(format!("{}/{}", value, denominator))
            }
            _ => None,
        };
        out.push(make(
            CandidateKind::Functional {
                root: root.to_string(),
                value: Some(CandidateValue::Named {
                    value: value.to_string(),
                    fraction,
                }),
            },
            modifier.clone(),
            negative,
        ));
    }

    out
}

/// Trailing `!` is current syntax, leading `!` is accepted for older markup.
fn strip_important(base: &str) -> (&str, bool) {
    if let Some(body) = base.strip_suffix('!') {
        return (body, true);
    }
    if let Some(body) = base.strip_prefix('!') {
        return (body, true);
    }
    (base, false)
}

// `None` means the modifier is malformed; `Some(None)` means there is none.
fn parse_modifier(raw: Option<&str>) -> Option<Option<Modifier>> {
    let Some(raw) = raw else {
        return Some(None);
    };
    if raw.is_empty() {
        return None;
    }
    if let Some(inner) = unwrap_brackets(raw) {
        return Some(Some(Modifier::Arbitrary(normalize_arbitrary_content(inner))));
    }
    if let Some(inner) = unwrap_parens(raw) {
        return inner
            .starts_with("--")
            .then(|| Some(Modifier::Arbitrary(format!("var({})", inner))));
    }
    Some(Some(Modifier::Named(raw.to_string())))
}

fn parse_arbitrary_property(inner: &str) -> Option<CandidateKind> {
    let (property, value) = inner.split_once(':')?;
    let property = property.trim();
    let value = normalize_arbitrary_content(value);
    if property.is_empty() || value.is_empty() {
        return None;
    }
    Some(CandidateKind::ArbitraryProperty {
        property: property.to_string(),
        value,
    })
}

/// `bg-[#123]` -> (`bg`, `#123`), `text-[length:1rem]` -> (`text`, `1rem`,
/// hint `length`), `bg-(--brand)` -> (`bg`, `var(--brand)`).
fn split_arbitrary_value(head: &str) -> Option<(&str, String, Option<String>)> {
    if head.ends_with(']') {
        for (idx, _) in head.match_indices("-[") {
            let Some(inner) = unwrap_brackets(&head[idx + 1..]) else {
                continue;
            };
            let namespace = &head[..idx];
            if namespace.is_empty() {
                return None;
            }
            let (type_hint, raw) = split_type_hint(inner);
            let value = normalize_arbitrary_content(raw);
            if value.is_empty() {
                return None;
            }
            return Some((namespace, value, type_hint));
        }
        return None;
    }

    if head.ends_with(')') {
        for (idx, _) in head.match_indices("-(") {
            let Some(inner) = unwrap_parens(&head[idx + 1..]) else {
                continue;
            };
            let namespace = &head[..idx];
            let (type_hint, name) = split_type_hint(inner);
            if namespace.is_empty() || !name.starts_with("--") {
                return None;
            }
            return Some((namespace, format!("var({})", name), type_hint));
        }
    }

    None
}

fn split_type_hint(inner: &str) -> (Option<String>, &str) {
    match inner.split_once(':') {
        Some((hint, rest)) if TYPE_HINTS.contains(&hint) => (Some(hint.to_string()), rest),
        _ => (None, inner),
    }
}

fn unwrap_parens(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0isize;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
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

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::{Candidate, CandidateKind, CandidateValue, Modifier, RootLookup, parse_candidates};

    struct Roots;

    impl RootLookup for Roots {
        fn is_static_root(&self, root: &str) -> bool {
            matches!(root, "flex" | "block" | "btn-primary")
        }

        fn is_functional_root(&self, root: &str) -> bool {
            matches!(root, "bg" | "bg-red" | "w" | "mt" | "text" | "rounded" | "btn")
        }
    }

    fn parse(base: &str) -> Vec<Candidate> {
        parse_candidates(base, &Roots)
    }

    fn functional(root: &str, value: &str) -> CandidateKind {
        CandidateKind::Functional {
            root: root.to_string(),
            value: Some(CandidateValue::Named {
                value: value.to_string(),
                fraction: None,
            }),
        }
    }

    #[test]
    fn static_utilities() {
        let candidates = parse("flex");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].kind,
            CandidateKind::Static {
                root: "flex".into()
            }
        );
    }

    #[test]
    fn functional_splits_longest_root_first() {
        let candidates = parse("bg-red-500");
        let kinds: Vec<_> = candidates.iter().map(|c| c.kind.clone()).collect();
        assert_eq!(kinds, vec![functional("bg-red", "500"), functional("bg", "red-500")]);
    }

    #[test]
    fn static_and_functional_readings_coexist() {
        let candidates = parse("btn-primary");
        assert!(candidates[0].is_static());
        assert_eq!(candidates[1].kind, functional("btn", "primary"));
    }

    #[test]
    fn bare_functional_root() {
        let candidates = parse("rounded");
        assert_eq!(
            candidates[0].kind,
            CandidateKind::Functional {
                root: "rounded".into(),
                value: None
            }
        );
    }

    #[test]
    fn negative_important_and_modifier() {
        let candidates = parse("-mt-4!");
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].negative);
        assert!(candidates[0].important);
        assert_eq!(candidates[0].body, "-mt-4");

        let candidates = parse("!bg-red-500/50");
        assert!(candidates[0].important);
        assert_eq!(candidates[1].modifier, Some(Modifier::Named("50".into())));
    }

    #[test]
    fn fractions_keep_the_modifier() {
        let candidates = parse("w-1/2");
        let value = candidates[0].value().expect("w-1/2 has a value");
        assert_eq!(value.as_str(), "1");
        assert_eq!(value.fraction(), Some("1/2"));
        assert_eq!(candidates[0].modifier, Some(Modifier::Named("2".into())));
    }

    #[test]
    fn arbitrary_values() {
        let candidates = parse("bg-[#123]");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].kind,
            CandidateKind::ArbitraryValue {
                namespace: "bg".into(),
                raw_value: "#123".into(),
                type_hint: None
            }
        );

        let candidates = parse("text-[length:var(--size)]");
        let value = candidates[0].value().expect("arbitrary value");
        assert_eq!(value.as_str(), "var(--size)");
        assert_eq!(value.type_hint(), Some("length"));

        let candidates = parse("bg-(--brand)/[0.5]");
        assert_eq!(
            candidates[0].value().map(|v| v.as_str().to_string()),
            Some("var(--brand)".into())
        );
        assert_eq!(candidates[0].modifier, Some(Modifier::Arbitrary("0.5".into())));
    }

    #[test]
    fn arbitrary_value_underscores_become_spaces() {
        let candidates = parse("w-[calc(100%_-_1rem)]");
        assert_eq!(
            candidates[0].value().map(|v| v.as_str().to_string()),
            Some("calc(100% - 1rem)".into())
        );
    }

    #[test]
    fn arbitrary_properties() {
        let candidates = parse("[mask-type:luminance]");
        assert_eq!(
            candidates[0].kind,
            CandidateKind::ArbitraryProperty {
                property: "mask-type".into(),
                value: "luminance".into()
            }
        );
        assert!(parse("[nocolon]").is_empty());
        assert!(parse("[a:]").is_empty());
    }

    #[test]
    fn unknown_roots_and_malformed_input_yield_nothing() {
        assert!(parse("not-a-real-utility").is_empty());
        assert!(parse("").is_empty());
        assert!(parse("!").is_empty());
        assert!(parse("bg-red-500/").is_empty());
        assert!(parse("zz-[1px]").is_empty());
    }
}
