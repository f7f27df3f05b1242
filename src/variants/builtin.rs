//! Built-in variant families.

use super::selector::escape_class_name;
use super::{AppliedSelector, Capability, VariantHandler};
use crate::ast::{AtRuleKind, AtRuleWrapper};
use crate::css_text::normalize_arbitrary_content;
use crate::segment::{VariantKind, VariantToken, VariantValue, classify_variant};
use crate::theme::{DEFAULT_INLINE_DEPTH, Theme};
use regex::Regex;
use std::sync::LazyLock;

static SUPPORTS_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\b(and|or|not)\b\s*").expect("valid supports operator regex")
});

static LEADING_FUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z-]+)?\(").expect("valid function call regex"));

/// How `dark:` is expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DarkMode {
    /// Selector strategy; the string is the marker selector (`.dark`).
    Class(String),
    /// `@media (prefers-color-scheme: dark)`.
    Media,
}

impl Default for DarkMode {
    fn default() -> Self {
        DarkMode::Class(".dark".to_string())
    }
}

const PSEUDO_VARIANTS: &[(&str, &str)] = &[
    ("first", ":first-child"),
    ("last", ":last-child"),
    ("only", ":only-child"),
    ("odd", ":nth-child(odd)"),
    ("even", ":nth-child(even)"),
    ("first-of-type", ":first-of-type"),
    ("last-of-type", ":last-of-type"),
    ("only-of-type", ":only-of-type"),
    ("visited", ":visited"),
    ("target", ":target"),
    ("open", ":is([open], :popover-open)"),
    ("default", ":default"),
    ("checked", ":checked"),
    ("indeterminate", ":indeterminate"),
    ("placeholder-shown", ":placeholder-shown"),
    ("autofill", ":autofill"),
    ("optional", ":optional"),
    ("required", ":required"),
    ("valid", ":valid"),
    ("invalid", ":invalid"),
    ("user-valid", ":user-valid"),
    ("user-invalid", ":user-invalid"),
    ("in-range", ":in-range"),
    ("out-of-range", ":out-of-range"),
    ("read-only", ":read-only"),
    ("empty", ":empty"),
    ("focus-within", ":focus-within"),
    ("hover", ":hover"),
    ("focus", ":focus"),
    ("focus-visible", ":focus-visible"),
    ("active", ":active"),
    ("enabled", ":enabled"),
    ("disabled", ":disabled"),
    ("inert", ":is([inert], [inert] *)"),
    ("rtl", ":where(:dir(rtl), [dir=\"rtl\"], [dir=\"rtl\"] *)"),
    ("ltr", ":where(:dir(ltr), [dir=\"ltr\"], [dir=\"ltr\"] *)"),
    ("before", "::before"),
    ("after", "::after"),
    ("first-letter", "::first-letter"),
    ("first-line", "::first-line"),
    ("marker", "::marker"),
    ("selection", "::selection"),
    ("file", "::file-selector-button"),
    ("placeholder", "::placeholder"),
    ("backdrop", "::backdrop"),
    ("details-content", "::details-content"),
];

const MEDIA_FEATURE_VARIANTS: &[(&str, &str)] = &[
    ("motion-safe", "(prefers-reduced-motion: no-preference)"),
    ("motion-reduce", "(prefers-reduced-motion: reduce)"),
    ("contrast-more", "(prefers-contrast: more)"),
    ("contrast-less", "(prefers-contrast: less)"),
    ("portrait", "(orientation: portrait)"),
    ("landscape", "(orientation: landscape)"),
    ("forced-colors", "(forced-colors: active)"),
    ("inverted-colors", "(inverted-colors: inverted)"),
    ("pointer-fine", "(pointer: fine)"),
    ("pointer-coarse", "(pointer: coarse)"),
    ("pointer-none", "(pointer: none)"),
    ("noscript", "(scripting: none)"),
    ("print", "print"),
];

const PROSE_ELEMENTS: &[(&str, &str)] = &[
    ("headings", "h1, h2, h3, h4, th"),
    ("lead", "[class~=\"lead\"]"),
    ("h1", "h1"),
    ("h2", "h2"),
    ("h3", "h3"),
    ("h4", "h4"),
    ("p", "p"),
    ("a", "a"),
    ("blockquote", "blockquote"),
    ("figure", "figure"),
    ("figcaption", "figcaption"),
    ("strong", "strong"),
    ("em", "em"),
    ("kbd", "kbd"),
    ("code", "code"),
    ("pre", "pre"),
    ("ol", "ol"),
    ("ul", "ul"),
    ("li", "li"),
    ("table", "table"),
    ("thead", "thead"),
    ("tr", "tr"),
    ("th", "th"),
    ("td", "td"),
    ("img", "img"),
    ("video", "video"),
    ("hr", "hr"),
];

/// The handler set every framework starts from.
pub fn default_handlers(
    theme: &Theme,
    dark_mode: &DarkMode,
    internal_prefix: &str,
) -> Vec<Box<dyn VariantHandler>> {
    vec![
        Box::new(PseudoVariants),
        Box::new(NthVariants),
        Box::new(AttributeVariants),
        Box::new(SelectorFunctionVariants),
        Box::new(GroupPeerVariants),
        Box::new(ArbitraryVariants),
        Box::new(ProseVariants),
        Box::new(DarkVariant {
            mode: dark_mode.clone(),
        }),
        Box::new(MediaFeatureVariants),
        Box::new(SupportsVariants {
            internal_prefix: internal_prefix.to_string(),
        }),
        Box::new(ResponsiveVariants::new(theme.clone())),
        Box::new(ContainerVariants::new(theme.clone())),
    ]
}

fn pseudo_suffix(name: &str) -> Option<&'static str> {
    PSEUDO_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == name)
        .map(|(_, suffix)| *suffix)
}

fn table_index(table: &[(&str, &str)], name: &str) -> Option<usize> {
    table.iter().position(|(variant, _)| *variant == name)
}

/// The selector fragment a token contributes when appended to a compound
/// selector: `:hover`, `[data-open]`, `:has(img)`. Tokens that only make sense
/// as at-rules yield `None`.
pub fn condition_suffix(token: &VariantToken) -> Option<String> {
    match token.kind {
        VariantKind::Static => pseudo_suffix(&token.name).map(str::to_string),
        VariantKind::Functional => functional_suffix(token),
        VariantKind::Arbitrary => {
            let content = normalize_arbitrary_content(token.value_str()?);
            (!content.is_empty() && !content.contains('&') && !content.starts_with('@'))
                .then_some(content)
        }
        VariantKind::Compound => None,
    }
}

fn functional_suffix(token: &VariantToken) -> Option<String> {
    let value = token.value.as_ref()?;
    match token.name.as_str() {
        "data" => data_attribute(value),
        "aria" => aria_attribute(value),
        "nth" => nth_pseudo("nth-child", value),
        "nth-last" => nth_pseudo("nth-last-child", value),
        "nth-of-type" => nth_pseudo("nth-of-type", value),
        "nth-last-of-type" => nth_pseudo("nth-last-of-type", value),
        "has" => selector_argument(value).map(|arg| format!(":has({})", arg)),
        "not" => selector_argument(value).map(|arg| format!(":not({})", arg)),
        "is" => selector_argument(value).map(|arg| format!(":is({})", arg)),
        "where" => selector_argument(value).map(|arg| format!(":where({})", arg)),
        _ => None,
    }
}

fn data_attribute(value: &VariantValue) -> Option<String> {
    let key = match value {
        VariantValue::Named(name) => name.clone(),
        VariantValue::Arbitrary(raw) => normalize_arbitrary_content(raw),
    };
    (!key.is_empty()).then(|| format!("[data-{}]", key))
}

fn aria_attribute(value: &VariantValue) -> Option<String> {
    let key = match value {
        VariantValue::Named(name) => name.clone(),
        VariantValue::Arbitrary(raw) => normalize_arbitrary_content(raw),
    };
    if key.is_empty() {
        return None;
    }
    if key.contains('=') {
        Some(format!("[aria-{}]", key))
    } else {
        Some(format!("[aria-{}=\"true\"]", key))
    }
}

fn nth_pseudo(function: &str, value: &VariantValue) -> Option<String> {
    let argument = match value {
        VariantValue::Named(name) if name.chars().all(|ch| ch.is_ascii_digit()) => name.clone(),
        VariantValue::Named(_) => return None,
        VariantValue::Arbitrary(raw) => normalize_arbitrary_content(raw),
    };
    (!argument.is_empty()).then(|| format!(":{}({})", function, argument))
}

// `has-checked` conditions on `:checked`, `not-data-open` on `[data-open]`.
fn selector_argument(value: &VariantValue) -> Option<String> {
    match value {
        VariantValue::Arbitrary(raw) => {
            let content = normalize_arbitrary_content(raw);
            (!content.is_empty()).then_some(content)
        }
        VariantValue::Named(name) => condition_suffix(&classify_variant(name)),
    }
}

fn append_suffix(current: &AppliedSelector, suffix: &str) -> AppliedSelector {
    let selector = current.selector.with_suffix(suffix);
    current.clone().with_selector(selector)
}

/// `hover`, `first`, `before`, `rtl`, ...
pub struct PseudoVariants;

impl VariantHandler for PseudoVariants {
    fn name(&self) -> &str {
        "pseudo"
    }

    fn weight(&self) -> u32 {
        100
    }

    fn capability(&self) -> Capability {
        Capability::StyleRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Static && pseudo_suffix(&token.name).is_some()
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        pseudo_suffix(&token.name).map(|suffix| append_suffix(current, suffix))
    }

    fn token_weight(&self, token: &VariantToken) -> u32 {
        let offset = table_index(PSEUDO_VARIANTS, &token.name).unwrap_or(0);
        self.weight() + offset as u32 / 2
    }
}

/// `nth-3`, `nth-last-[2n+1]`, `nth-of-type-2`, `nth-last-of-type-[odd]`.
pub struct NthVariants;

impl VariantHandler for NthVariants {
    fn name(&self) -> &str {
        "nth"
    }

    fn weight(&self) -> u32 {
        130
    }

    fn capability(&self) -> Capability {
        Capability::StyleRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Functional
            && matches!(
                token.name.as_str(),
                "nth" | "nth-last" | "nth-of-type" | "nth-last-of-type"
            )
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        functional_suffix(token).map(|suffix| append_suffix(current, &suffix))
    }
}

/// `data-*` and `aria-*`.
pub struct AttributeVariants;

impl VariantHandler for AttributeVariants {
    fn name(&self) -> &str {
        "attribute"
    }

    fn weight(&self) -> u32 {
        140
    }

    fn capability(&self) -> Capability {
        Capability::StyleRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Functional && matches!(token.name.as_str(), "data" | "aria")
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        functional_suffix(token).map(|suffix| append_suffix(current, &suffix))
    }
}

/// `has-*`, `not-*`, `is-*`, `where-*`.
pub struct SelectorFunctionVariants;

impl VariantHandler for SelectorFunctionVariants {
    fn name(&self) -> &str {
        "selector-function"
    }

    fn weight(&self) -> u32 {
        150
    }

    fn capability(&self) -> Capability {
        Capability::StyleRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Functional
            && matches!(token.name.as_str(), "has" | "not" | "is" | "where")
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        functional_suffix(token).map(|suffix| append_suffix(current, &suffix))
    }
}

/// `group-hover`, `peer-checked/field`, `group/card-[.is-open]`.
pub struct GroupPeerVariants;

impl GroupPeerVariants {
    fn marker(token: &VariantToken) -> String {
        match &token.modifier {
            Some(name) => format!(".{}", escape_class_name(&format!("{}/{}", token.name, name))),
            None => format!(".{}", token.name),
        }
    }
}

impl VariantHandler for GroupPeerVariants {
    fn name(&self) -> &str {
        "group-peer"
    }

    fn weight(&self) -> u32 {
        160
    }

    fn capability(&self) -> Capability {
        Capability::StyleRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Compound
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let marker = Self::marker(token);
        let relation = if token.name == "peer" { " ~ *" } else { " *" };
        let inner = token.inner()?;

        let marker_expr = match (&inner.kind, inner.value_str()) {
            (VariantKind::Arbitrary, Some(raw)) => {
                let content = normalize_arbitrary_content(raw);
                if content.contains('&') {
                    content.replace('&', &marker)
                } else {
                    format!(":where({}){}", marker, condition_suffix(&inner)?)
                }
            }
            _ => format!(":where({}){}", marker, condition_suffix(&inner)?),
        };

        Some(append_suffix(
            current,
            &format!(":is({}{})", marker_expr, relation),
        ))
    }
}

/// `[&>*]`, `[.theme-a_&]`, `[@media(print)]`.
pub struct ArbitraryVariants;

impl VariantHandler for ArbitraryVariants {
    fn name(&self) -> &str {
        "arbitrary"
    }

    fn weight(&self) -> u32 {
        170
    }

    fn capability(&self) -> Capability {
        Capability::Both
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Arbitrary
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let content = normalize_arbitrary_content(token.value_str()?);
        if content.is_empty() {
            return None;
        }

        if let Some(at_rule) = content.strip_prefix('@') {
            let split = at_rule
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-'))
                .unwrap_or(at_rule.len());
            let (name, params) = at_rule.split_at(split);
            if name.is_empty() {
                return None;
            }
            let wrapper = AtRuleWrapper::new(AtRuleKind::parse(name), params.trim());
            return Some(current.clone().with_wrapper(wrapper));
        }

        let selector = current.selector.relativize(&content);
        Some(current.clone().with_selector(selector))
    }
}

/// `prose-headings`, `prose-a`, ... Targets descendants of the utility's
/// element that are not inside a `not-prose` container.
pub struct ProseVariants;

impl ProseVariants {
    fn element(token: &VariantToken) -> Option<&'static str> {
        let element = token.name.strip_prefix("prose-")?;
        PROSE_ELEMENTS
            .iter()
            .find(|(name, _)| *name == element)
            .map(|(_, selector)| *selector)
    }
}

impl VariantHandler for ProseVariants {
    fn name(&self) -> &str {
        "prose"
    }

    fn weight(&self) -> u32 {
        180
    }

    fn capability(&self) -> Capability {
        Capability::StyleRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Static && Self::element(token).is_some()
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let element = Self::element(token)?;
        Some(append_suffix(
            current,
            &format!(
                " :where({}):not(:where([class~=\"not-prose\"], [class~=\"not-prose\"] *))",
                element
            ),
        ))
    }
}

pub struct DarkVariant {
    mode: DarkMode,
}

impl VariantHandler for DarkVariant {
    fn name(&self) -> &str {
        "dark"
    }

    fn weight(&self) -> u32 {
        250
    }

    fn capability(&self) -> Capability {
        match self.mode {
            DarkMode::Class(_) => Capability::StyleRule,
            DarkMode::Media => Capability::AtRule,
        }
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Static && token.name == "dark"
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        _token: &VariantToken,
    ) -> Option<AppliedSelector> {
        match &self.mode {
            DarkMode::Class(marker) => Some(append_suffix(
                current,
                &format!(":where({}, {} *)", marker, marker),
            )),
            DarkMode::Media => Some(
                current
                    .clone()
                    .with_wrapper(AtRuleWrapper::media("(prefers-color-scheme: dark)")),
            ),
        }
    }
}

/// `print`, `motion-safe`, `contrast-more`, `portrait`, `forced-colors`, ...
pub struct MediaFeatureVariants;

impl VariantHandler for MediaFeatureVariants {
    fn name(&self) -> &str {
        "media-feature"
    }

    fn weight(&self) -> u32 {
        300
    }

    fn capability(&self) -> Capability {
        Capability::AtRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Static
            && table_index(MEDIA_FEATURE_VARIANTS, &token.name).is_some()
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let idx = table_index(MEDIA_FEATURE_VARIANTS, &token.name)?;
        let (_, query) = MEDIA_FEATURE_VARIANTS[idx];
        Some(current.clone().with_wrapper(AtRuleWrapper::media(query)))
    }

    fn token_weight(&self, token: &VariantToken) -> u32 {
        self.weight() + table_index(MEDIA_FEATURE_VARIANTS, &token.name).unwrap_or(0) as u32
    }
}

/// `supports-[display:grid]`, `supports-grid`, `supports-[selector(:has(a))]`.
pub struct SupportsVariants {
    internal_prefix: String,
}

impl SupportsVariants {
    fn query(&self, value: &VariantValue) -> Option<String> {
        match value {
            VariantValue::Named(property) => {
                Some(format!("({}: var(--{}))", property, self.internal_prefix))
            }
            VariantValue::Arbitrary(raw) => {
                let content = normalize_arbitrary_content(raw);
                if content.is_empty() {
                    return None;
                }
                if LEADING_FUNCTION.is_match(&content) {
                    return Some(normalize_supports_operators(&content));
                }
                match content.split_once(':') {
                    Some((property, value)) => {
                        Some(format!("({}: {})", property.trim(), value.trim()))
                    }
                    None => Some(format!("({}: var(--{}))", content, self.internal_prefix)),
                }
            }
        }
    }
}

/// Spaces `and`/`or`/`not` between conditions. Operators inside a condition
/// or function (`selector(:not(a))`) and identifier fragments (`font-or`) are
/// left alone.
fn normalize_supports_operators(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 8);
    let mut cursor = 0usize;
    for captures in SUPPORTS_OPERATOR.captures_iter(query) {
        let (Some(whole), Some(operator)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let before = query[..operator.start()].chars().next_back();
        let after = query[operator.end()..].chars().next();
        if paren_depth(&query[..operator.start()]) != 0
            || matches!(before, Some(':' | '-'))
            || after == Some('-')
        {
            continue;
        }
        out.push_str(&query[cursor..whole.start()]);
        out.push(' ');
        out.push_str(operator.as_str());
        out.push(' ');
        cursor = whole.end();
    }
    out.push_str(&query[cursor..]);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn paren_depth(text: &str) -> usize {
    text.chars().fold(0usize, |depth, ch| match ch {
        '(' => depth + 1,
        ')' => depth.saturating_sub(1),
        _ => depth,
    })
}

impl VariantHandler for SupportsVariants {
    fn name(&self) -> &str {
        "supports"
    }

    fn weight(&self) -> u32 {
        350
    }

    fn capability(&self) -> Capability {
        Capability::AtRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Functional && token.name == "supports"
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let query = self.query(token.value.as_ref()?)?;
        Some(current.clone().with_wrapper(AtRuleWrapper::supports(query)))
    }
}

/// `md`, `max-lg`, `min-[600px]`, `max-[40rem]`, driven by `--breakpoint-*`.
pub struct ResponsiveVariants {
    theme: Theme,
    breakpoints: Vec<String>,
}

impl ResponsiveVariants {
    const MAX_WEIGHT: u32 = 600;

    pub fn new(theme: Theme) -> Self {
        let breakpoints = theme
            .keys_in_namespace("--breakpoint")
            .into_iter()
            .map(str::to_string)
            .collect();
        Self { theme, breakpoints }
    }

    // Media queries cannot read custom properties, so aliases are inlined.
    fn width(&self, value: &VariantValue) -> Option<String> {
        match value {
            VariantValue::Arbitrary(raw) => Some(normalize_arbitrary_content(raw)),
            VariantValue::Named(name) => self
                .theme
                .resolve_value(Some(name), &["--breakpoint"])
                .map(|width| self.theme.resolve_inline(&width, DEFAULT_INLINE_DEPTH)),
        }
    }

    fn breakpoint_index(&self, name: &str) -> Option<usize> {
        self.breakpoints.iter().position(|bp| bp == name)
    }
}

impl VariantHandler for ResponsiveVariants {
    fn name(&self) -> &str {
        "responsive"
    }

    fn weight(&self) -> u32 {
        400
    }

    fn capability(&self) -> Capability {
        Capability::AtRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        match token.kind {
            VariantKind::Static => self.breakpoint_index(&token.name).is_some(),
            VariantKind::Functional => matches!(token.name.as_str(), "min" | "max"),
            _ => false,
        }
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let (comparison, width) = match token.kind {
            VariantKind::Static => (">=", self.width(&VariantValue::Named(token.name.clone()))?),
            _ => {
                let comparison = if token.name == "max" { "<" } else { ">=" };
                (comparison, self.width(token.value.as_ref()?)?)
            }
        };
        if width.is_empty() {
            return None;
        }
        let query = format!("(width {} {})", comparison, width);
        Some(current.clone().with_wrapper(AtRuleWrapper::media(query)))
    }

    // `sm` < `md` < ... < arbitrary `min-[..]`; `max-*` runs widest first.
    fn token_weight(&self, token: &VariantToken) -> u32 {
        let scale = self.breakpoints.len() as u32;
        match (token.kind, token.name.as_str(), &token.value) {
            (VariantKind::Static, name, _) => {
                self.weight() + self.breakpoint_index(name).unwrap_or(0) as u32
            }
            (_, "min", Some(VariantValue::Named(name))) => {
                self.weight() + self.breakpoint_index(name).unwrap_or(0) as u32
            }
            (_, "min", _) => self.weight() + scale,
            (_, "max", Some(VariantValue::Named(name))) => {
                let idx = self.breakpoint_index(name).unwrap_or(0) as u32;
                Self::MAX_WEIGHT + scale.saturating_sub(idx)
            }
            _ => Self::MAX_WEIGHT,
        }
    }
}

/// `@md`, `@max-lg`, `@min-[400px]/sidebar`, driven by `--container-*`.
pub struct ContainerVariants {
    theme: Theme,
}

impl ContainerVariants {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    fn width(&self, value: &VariantValue) -> Option<String> {
        match value {
            VariantValue::Arbitrary(raw) => Some(normalize_arbitrary_content(raw)),
            VariantValue::Named(name) => self
                .theme
                .resolve_value(Some(name), &["--container"])
                .map(|width| self.theme.resolve_inline(&width, DEFAULT_INLINE_DEPTH)),
        }
    }
}

impl VariantHandler for ContainerVariants {
    fn name(&self) -> &str {
        "container"
    }

    fn weight(&self) -> u32 {
        700
    }

    fn capability(&self) -> Capability {
        Capability::AtRule
    }

    fn can_handle(&self, token: &VariantToken) -> bool {
        token.kind == VariantKind::Functional
            && matches!(token.name.as_str(), "@" | "@min" | "@max")
    }

    fn try_apply(
        &self,
        current: &AppliedSelector,
        token: &VariantToken,
    ) -> Option<AppliedSelector> {
        let width = self.width(token.value.as_ref()?)?;
        if width.is_empty() {
            return None;
        }
        let comparison = if token.name == "@max" { "<" } else { ">=" };
        let query = format!("(width {} {})", comparison, width);
        let params = match &token.modifier {
            Some(name) => format!("{} {}", name, query),
            None => query,
        };
        Some(current.clone().with_wrapper(AtRuleWrapper::container(params)))
    }

    fn token_weight(&self, token: &VariantToken) -> u32 {
        let offset = match token.value.as_ref() {
            Some(VariantValue::Named(name)) => self
                .theme
                .keys_in_namespace("--container")
                .iter()
                .position(|key| key == name)
                .unwrap_or(0) as u32,
            _ => 50,
        };
        if token.name == "@max" {
            self.weight() + 100 - offset.min(99)
        } else {
            self.weight() + offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DarkMode;
    use crate::css_text::normalize_arbitrary_content;
    use crate::ast::AtRuleKind;
    use crate::segment::tokenize;
    use crate::theme::Theme;
    use crate::variants::{AppliedSelector, VariantRegistry};

    fn registry_with(theme: &Theme, dark: DarkMode) -> VariantRegistry {
        VariantRegistry::with_defaults(theme, &dark, "monorail").expect("registry builds")
    }

    fn apply(class: &str) -> Option<AppliedSelector> {
        apply_with(class, DarkMode::default())
    }

    fn apply_with(class: &str, dark: DarkMode) -> Option<AppliedSelector> {
        let registry = registry_with(&Theme::with_defaults(), dark);
        let (tokens, _) = tokenize(class);
        let outcome = registry.apply_variants(AppliedSelector::for_class(class), &tokens);
        outcome.is_complete().then_some(outcome.applied)
    }

    fn selector(class: &str) -> String {
        apply(class)
            .map(|applied| applied.selector.into_string())
            .unwrap_or_default()
    }

    fn params(class: &str) -> Vec<String> {
        apply(class)
            .map(|applied| applied.wrappers.into_iter().map(|w| w.params).collect())
            .unwrap_or_default()
    }

    #[test]
    fn underscores_become_spaces_unless_escaped() {
        assert_eq!(normalize_arbitrary_content("&_>_*"), "& > *");
        assert_eq!(normalize_arbitrary_content(r"a\_b"), "a_b");
    }

    #[test]
    fn pseudo_classes_and_elements() {
        assert_eq!(selector("hover:flex"), ".hover\\:flex:hover");
        assert_eq!(selector("before:block"), ".before\\:block::before");
        assert_eq!(selector("odd:flex"), ".odd\\:flex:nth-child(odd)");
        assert_eq!(
            selector("rtl:flex"),
            ".rtl\\:flex:where(:dir(rtl), [dir=\"rtl\"], [dir=\"rtl\"] *)"
        );
    }

    #[test]
    fn nth_variants() {
        assert_eq!(selector("nth-3:flex"), ".nth-3\\:flex:nth-child(3)");
        assert_eq!(
            selector("nth-last-of-type-[2n+1]:flex"),
            ".nth-last-of-type-\\[2n\\+1\\]\\:flex:nth-last-of-type(2n+1)"
        );
        assert!(apply("nth-abc:flex").is_none());
    }

    #[test]
    fn data_and_aria_attributes() {
        assert_eq!(
            selector("data-[state=open]:flex"),
            ".data-\\[state\\=open\\]\\:flex[data-state=open]"
        );
        assert_eq!(selector("data-open:flex"), ".data-open\\:flex[data-open]");
        assert_eq!(
            selector("aria-checked:flex"),
            ".aria-checked\\:flex[aria-checked=\"true\"]"
        );
        assert_eq!(
            selector("aria-[sort=ascending]:flex"),
            ".aria-\\[sort\\=ascending\\]\\:flex[aria-sort=ascending]"
        );
    }

    #[test]
    fn selector_functions() {
        assert_eq!(selector("has-checked:flex"), ".has-checked\\:flex:has(:checked)");
        assert_eq!(
            selector("has-[>img]:flex"),
            ".has-\\[\\>img\\]\\:flex:has(>img)"
        );
        assert_eq!(selector("not-first:flex"), ".not-first\\:flex:not(:first-child)");
        assert_eq!(
            selector("not-data-open:flex"),
            ".not-data-open\\:flex:not([data-open])"
        );
        assert_eq!(selector("where-[.x]:flex"), ".where-\\[\\.x\\]\\:flex:where(.x)");
    }

    #[test]
    fn group_and_peer() {
        assert_eq!(
            selector("group-hover:flex"),
            ".group-hover\\:flex:is(:where(.group):hover *)"
        );
        assert_eq!(
            selector("peer-checked:flex"),
            ".peer-checked\\:flex:is(:where(.peer):checked ~ *)"
        );
        assert_eq!(
            selector("group-hover/card:flex"),
            ".group-hover\\/card\\:flex:is(:where(.group\\/card):hover *)"
        );
        assert_eq!(
            selector("group-data-[open]:flex"),
            ".group-data-\\[open\\]\\:flex:is(:where(.group)[data-open] *)"
        );
        assert!(apply("group-md:flex").is_none());
    }

    #[test]
    fn arbitrary_selectors_and_at_rules() {
        assert_eq!(selector("[&>*]:flex"), ".\\[\\&\\>\\*\\]\\:flex>*");
        assert_eq!(
            selector("[.theme-a_&]:flex"),
            ".theme-a .\\[\\.theme-a_\\&\\]\\:flex"
        );
        assert_eq!(selector("[.theme-a]:flex"), ".theme-a .\\[\\.theme-a\\]\\:flex");

        let applied = apply("[@media(print)]:flex").expect("arbitrary at-rule applies");
        assert_eq!(applied.wrappers[0].kind, AtRuleKind::Media);
        assert_eq!(applied.wrappers[0].params, "(print)");

        let applied = apply("[@starting-style]:flex").expect("bare at-rule applies");
        assert_eq!(
            applied.wrappers[0].kind,
            AtRuleKind::Other("starting-style".into())
        );
    }

    #[test]
    fn prose_targets_descendants() {
        assert_eq!(
            selector("prose-a:flex"),
            ".prose-a\\:flex :where(a):not(:where([class~=\"not-prose\"], [class~=\"not-prose\"] *))"
        );
    }

    #[test]
    fn dark_mode_strategies() {
        assert_eq!(selector("dark:flex"), ".dark\\:flex:where(.dark, .dark *)");

        let applied = apply_with("dark:flex", DarkMode::Media).expect("media dark applies");
        assert_eq!(applied.selector.as_str(), ".dark\\:flex");
        assert_eq!(applied.wrappers[0].params, "(prefers-color-scheme: dark)");

        let applied = apply_with("dark:flex", DarkMode::Class("[data-theme=dark]".into()))
            .expect("custom dark marker applies");
        assert_eq!(
            applied.selector.as_str(),
            ".dark\\:flex:where([data-theme=dark], [data-theme=dark] *)"
        );
    }

    #[test]
    fn media_features() {
        assert_eq!(params("print:flex"), vec!["print"]);
        assert_eq!(
            params("motion-reduce:flex"),
            vec!["(prefers-reduced-motion: reduce)"]
        );
    }

    #[test]
    fn supports_queries() {
        assert_eq!(params("supports-[display:grid]:grid"), vec!["(display: grid)"]);
        assert_eq!(
            params("supports-backdrop-filter:flex"),
            vec!["(backdrop-filter: var(--monorail))"]
        );
        assert_eq!(
            params("supports-[(display:grid)and(gap:1px)]:grid"),
            vec!["(display:grid) and (gap:1px)"]
        );
        assert_eq!(
            params("supports-[selector(:has(a))]:flex"),
            vec!["selector(:has(a))"]
        );
    }

    #[test]
    fn supports_operators_inside_functions_are_kept() {
        assert_eq!(
            params("supports-[selector(:not(a))]:flex"),
            vec!["selector(:not(a))"]
        );
        assert_eq!(
            params("supports-[selector(a:not(.b))_or_(display:grid)]:flex"),
            vec!["selector(a:not(.b)) or (display:grid)"]
        );
        assert_eq!(
            params("supports-[not(display:grid)]:flex"),
            vec!["not (display:grid)"]
        );
    }

    #[test]
    fn responsive_breakpoints() {
        assert_eq!(params("md:flex"), vec!["(width >= 48rem)"]);
        assert_eq!(params("max-lg:flex"), vec!["(width < 64rem)"]);
        assert_eq!(params("min-[600px]:flex"), vec!["(width >= 600px)"]);
        assert_eq!(params("max-[40rem]:flex"), vec!["(width < 40rem)"]);
        assert!(apply("max-huge:flex").is_none());
    }

    #[test]
    fn breakpoints_follow_the_theme() {
        let theme = Theme::with_defaults().add("--breakpoint-tablet", "50rem");
        let registry = registry_with(&theme, DarkMode::default());
        let (tokens, _) = tokenize("tablet:flex");
        let outcome = registry.apply_variants(AppliedSelector::for_class("tablet:flex"), &tokens);
        assert!(outcome.is_complete());
        assert_eq!(outcome.applied.wrappers[0].params, "(width >= 50rem)");
    }

    #[test]
    fn responsive_weights_follow_breakpoint_order() {
        let registry = registry_with(&Theme::with_defaults(), DarkMode::default());
        let weight = |class: &str| {
            let (tokens, _) = tokenize(class);
            registry
                .apply_variants(AppliedSelector::for_class(class), &tokens)
                .weights[0]
        };
        assert!(weight("sm:flex") < weight("md:flex"));
        assert!(weight("md:flex") < weight("lg:flex"));
        assert!(weight("lg:flex") < weight("min-[900px]:flex"));
        assert!(weight("hover:flex") < weight("sm:flex"));
    }

    #[test]
    fn container_queries() {
        assert_eq!(params("@md:flex"), vec!["(width >= 28rem)"]);
        assert_eq!(params("@max-md:flex"), vec!["(width < 28rem)"]);
        assert_eq!(params("@min-[400px]/sidebar:flex"), vec!["sidebar (width >= 400px)"]);
        assert!(apply("@huge:flex").is_none());
        assert!(apply("@:flex").is_none());
    }
}
