//! Design-token storage and lookup.
//!
//! A [`Theme`] maps CSS custom-property names (`--color-red-500`) to raw
//! values. It is persistent: every mutation returns a new `Theme` sharing
//! structure with the old one, so a theme can be cloned freely into variant
//! and utility handlers.

pub mod source;

use crate::css_text::{find_matching_paren, split_top_level};
use im::{OrdMap, Vector};

/// Substitution depth used by [`Theme::resolve_inline`] callers that have no
/// better bound.
pub const DEFAULT_INLINE_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    values: OrdMap<String, String>,
    order: Vector<String>,
    prefix: Option<String>,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the bundled mechanism-level defaults (spacing base, breakpoints,
    /// container sizes).
    pub fn with_defaults() -> Self {
        let parsed = source::parse_source(include_str!("../default_theme.css"));
        Self::new().add_many(parsed.variables)
    }

    pub fn with_prefix(&self, prefix: &str) -> Self {
        let mut next = self.clone();
        let prefix = prefix.trim().trim_matches('-');
        next.prefix = (!prefix.is_empty()).then(|| prefix.to_string());
        next
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns a theme with `name` set to `value`. A key that already exists
    /// keeps its original position.
    pub fn add(&self, name: &str, value: &str) -> Self {
        let key = normalize_name(name);
        let mut next = self.clone();
        if next.values.insert(key.clone(), value.trim().to_string()).is_none() {
            next.order.push_back(key);
        }
        next
    }

    pub fn add_many<I, K, V>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        entries
            .into_iter()
            .fold(self.clone(), |theme, (name, value)| {
                theme.add(name.as_ref(), value.as_ref())
            })
    }

    /// Registers `--color-{name}-{shade}` for every shade.
    pub fn add_color_palette<S, V>(&self, name: &str, shades: &[(S, V)]) -> Self
    where
        S: AsRef<str>,
        V: AsRef<str>,
    {
        shades.iter().fold(self.clone(), |theme, (shade, value)| {
            theme.add(
                &format!("--color-{}-{}", name, shade.as_ref()),
                value.as_ref(),
            )
        })
    }

    /// Aliases every `--color-{source}-*` key as `--color-{alias}-*`. The alias
    /// stores a `var()` reference to the source key, so later edits to the
    /// source shade show through the alias.
    pub fn map_color_palette(&self, source: &str, alias: &str) -> Self {
        let source_prefix = format!("--color-{}-", source);
        let shades: Vec<String> = self
            .order
            .iter()
            .filter_map(|key| key.strip_prefix(&source_prefix))
            .map(str::to_string)
            .collect();

        shades.iter().fold(self.clone(), |theme, shade| {
            let source_ref = theme.var_ref(&format!("{}{}", source_prefix, shade));
            theme.add(&format!("--color-{}-{}", alias, shade), &source_ref)
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&normalize_name(name)).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.order.iter().filter_map(|key| {
            self.values
                .get(key)
                .map(|value| (key.as_str(), value.as_str()))
        })
    }

    /// Key suffixes stored under `namespace`, in insertion order
    /// (`--breakpoint` yields `sm`, `md`, ...). The bare namespace key is skipped.
    pub fn keys_in_namespace(&self, namespace: &str) -> Vec<&str> {
        let prefix = format!("{}-", namespace_key(namespace));
        self.order
            .iter()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|suffix| !suffix.contains("--"))
            .collect()
    }

    /// The emitted custom-property name for a key, with the theme prefix applied.
    pub fn var_name(&self, name: &str) -> String {
        let key = normalize_name(name);
        match &self.prefix {
            Some(prefix) => format!("--{}-{}", prefix, &key[2..]),
            None => key,
        }
    }

    pub fn var_ref(&self, name: &str) -> String {
        format!("var({})", self.var_name(name))
    }

    /// Rewrites `--name` occurrences in `value` that are keys of this theme
    /// into their emitted names. Unknown names are left as written.
    pub fn prefix_references(&self, value: &str) -> String {
        if self.prefix.is_none() {
            return value.to_string();
        }
        let mut out = String::with_capacity(value.len() + 16);
        let mut rest = value;
        while let Some(start) = rest.find("--") {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let end = tail[2..]
                .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'))
                .map_or(tail.len(), |idx| idx + 2);
            let name = &tail[..end];
            if self.contains(name) {
                out.push_str(&self.var_name(name));
            } else {
                out.push_str(name);
            }
            rest = &tail[end..];
        }
        out.push_str(rest);
        out
    }

    /// Finds the first key of `namespaces` (tried in order) holding `value`.
    /// A `None` value looks up the namespace's bare key (`--spacing`).
    pub fn resolve_key(&self, value: Option<&str>, namespaces: &[&str]) -> Option<String> {
        if let Some(direct) = value.filter(|v| v.starts_with("--")) {
            return self.contains(direct).then(|| normalize_name(direct));
        }
        for namespace in namespaces {
            let key = match value {
                Some(value) => format!("{}-{}", namespace_key(namespace), normalize_key(value)),
                None => namespace_key(namespace),
            };
            if self.values.contains_key(&key) {
                return Some(key);
            }
        }
        None
    }

    /// `var(--name)` for the first matching key, or `None`.
    pub fn resolve(&self, value: Option<&str>, namespaces: &[&str]) -> Option<String> {
        self.resolve_key(value, namespaces)
            .map(|key| self.var_ref(&key))
    }

    /// The stored raw value of the first matching key, or `None`.
    pub fn resolve_value(&self, value: Option<&str>, namespaces: &[&str]) -> Option<String> {
        self.resolve_key(value, namespaces)
            .and_then(|key| self.values.get(&key).cloned())
    }

    /// Replaces `var(--name[, fallback])` occurrences with their values,
    /// following chained aliases up to `max_depth`. Past that depth the
    /// remaining `var()` is left in place, which also bounds reference cycles.
    pub fn resolve_inline(&self, expr: &str, max_depth: usize) -> String {
        if max_depth == 0 {
            return expr.to_string();
        }

        let mut out = String::with_capacity(expr.len());
        let mut cursor = 0usize;
        while let Some(rel) = expr[cursor..].find("var(") {
            let start = cursor + rel;
            out.push_str(&expr[cursor..start]);
            let open = start + "var".len();
            let Some(close) = find_matching_paren(expr, open) else {
                out.push_str(&expr[start..]);
                return out;
            };

            let inner = &expr[open + 1..close];
            let mut parts = split_top_level(inner, ',');
            let name = parts.remove(0).trim();
            let fallback = (!parts.is_empty()).then(|| parts.join(","));

            match self.lookup_var(name) {
                Some(value) => out.push_str(&self.resolve_inline(value, max_depth - 1)),
                None => match fallback {
                    Some(fallback) => {
                        out.push_str(&self.resolve_inline(fallback.trim(), max_depth - 1))
                    }
                    None => out.push_str(&expr[start..=close]),
                },
            }
            cursor = close + 1;
        }
        out.push_str(&expr[cursor..]);
        out
    }

    /// Looks up an emitted custom-property name, stripping the theme prefix.
    fn lookup_var(&self, css_name: &str) -> Option<&str> {
        if let Some(prefix) = &self.prefix {
            if let Some(rest) = css_name.strip_prefix(&format!("--{}-", prefix)) {
                if let Some(value) = self.get(&format!("--{}", rest)) {
                    return Some(value);
                }
            }
        }
        self.get(css_name)
    }
}

fn namespace_key(namespace: &str) -> String {
    let trimmed = namespace.trim_start_matches('-');
    format!("--{}", trimmed)
}

/// Fractional scale steps (`2.5`) are stored as `2_5`.
pub fn normalize_key(raw: &str) -> String {
    raw.replace('.', "_")
}

fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let body = name.strip_prefix("--").unwrap_or(name);
    format!("--{}", normalize_key(body))
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_INLINE_DEPTH, Theme};

    fn slate() -> Theme {
        Theme::new()
            .add("--color-slate-100", "#f1f5f9")
            .add("--color-slate-500", "#64748b")
    }

    #[test]
    fn mutation_returns_new_theme() {
        let base = Theme::new().add("--spacing", "0.25rem");
        let next = base.add("--color-red-500", "red");
        assert_eq!(base.len(), 1);
        assert_eq!(next.len(), 2);
        assert!(!base.contains("--color-red-500"));
    }

    #[test]
    fn overriding_keeps_position() {
        let theme = Theme::new().add("--a", "1").add("--b", "2").add("--a", "3");
        let entries: Vec<_> = theme.iter().collect();
        assert_eq!(entries, vec![("--a", "3"), ("--b", "2")]);
    }

    #[test]
    fn resolves_through_namespace_chain_in_order() {
        let theme = Theme::new()
            .add("--spacing-4", "1rem")
            .add("--width-4", "2rem");
        assert_eq!(
            theme.resolve(Some("4"), &["--width", "--spacing"]),
            Some("var(--width-4)".to_string())
        );
        assert_eq!(
            theme.resolve(Some("4"), &["--spacing", "--width"]),
            Some("var(--spacing-4)".to_string())
        );
        assert_eq!(theme.resolve(Some("5"), &["--width", "--spacing"]), None);
    }

    #[test]
    fn bare_lookup_uses_namespace_key() {
        let theme = Theme::new().add("--radius", "0.25rem");
        assert_eq!(
            theme.resolve_value(None, &["--radius"]),
            Some("0.25rem".to_string())
        );
        assert_eq!(theme.resolve(None, &["--shadow"]), None);
    }

    #[test]
    fn decimal_keys_are_normalized() {
        let theme = Theme::new().add("--spacing-2.5", "0.625rem");
        assert_eq!(
            theme.resolve(Some("2.5"), &["--spacing"]),
            Some("var(--spacing-2_5)".to_string())
        );
        assert_eq!(theme.get("--spacing-2.5"), Some("0.625rem"));
    }

    #[test]
    fn prefix_applies_to_emitted_names() {
        let theme = slate().with_prefix("mr");
        assert_eq!(
            theme.resolve(Some("slate-500"), &["--color"]),
            Some("var(--mr-color-slate-500)".to_string())
        );
        assert_eq!(theme.resolve_inline("var(--mr-color-slate-500)", 4), "#64748b");
    }

    #[test]
    fn prefix_rewrites_references_to_known_keys() {
        let theme = slate().add("--spacing", "0.25rem").with_prefix("mr");
        assert_eq!(
            theme.prefix_references("var(--color-slate-500, var(--other))"),
            "var(--mr-color-slate-500, var(--other))"
        );
        assert_eq!(
            theme.prefix_references("calc(var(--spacing) * 2)"),
            "calc(var(--mr-spacing) * 2)"
        );
        assert_eq!(slate().prefix_references("var(--color-slate-500)"), "var(--color-slate-500)");
    }

    #[test]
    fn palette_alias_is_a_live_reference() {
        let theme = slate().map_color_palette("slate", "base");
        assert_eq!(
            theme.resolve(Some("base-500"), &["--color"]),
            Some("var(--color-base-500)".to_string())
        );
        assert_eq!(
            theme.resolve_value(Some("base-500"), &["--color"]),
            Some("var(--color-slate-500)".to_string())
        );
        assert_eq!(
            theme.resolve_value(Some("--color-base-500"), &[]),
            Some("var(--color-slate-500)".to_string())
        );

        let edited = theme.add("--color-slate-500", "#000");
        assert_eq!(
            edited.resolve_inline("var(--color-base-500)", DEFAULT_INLINE_DEPTH),
            "#000"
        );
    }

    #[test]
    fn inline_resolution_follows_chains_and_fallbacks() {
        let theme = Theme::new()
            .add("--base", "#123456")
            .add("--brand", "var(--base)")
            .add("--primary", "var(--brand)");
        assert_eq!(
            theme.resolve_inline("1px solid var(--primary)", DEFAULT_INLINE_DEPTH),
            "1px solid #123456"
        );
        assert_eq!(
            theme.resolve_inline("var(--missing, var(--base))", DEFAULT_INLINE_DEPTH),
            "#123456"
        );
        assert_eq!(
            theme.resolve_inline("var(--missing, 4px)", DEFAULT_INLINE_DEPTH),
            "4px"
        );
        assert_eq!(
            theme.resolve_inline("var(--missing)", DEFAULT_INLINE_DEPTH),
            "var(--missing)"
        );
    }

    #[test]
    fn inline_resolution_stops_on_cycles() {
        let theme = Theme::new().add("--a", "var(--b)").add("--b", "var(--a)");
        let resolved = theme.resolve_inline("var(--a)", 5);
        assert!(resolved.contains("var("));
    }

    #[test]
    fn lists_keys_in_namespace() {
        let theme = Theme::new()
            .add("--breakpoint-sm", "40rem")
            .add("--breakpoint-md", "48rem")
            .add("--text-sm", "0.875rem")
            .add("--text-sm--line-height", "1.25");
        assert_eq!(theme.keys_in_namespace("--breakpoint"), vec!["sm", "md"]);
        assert_eq!(theme.keys_in_namespace("text"), vec!["sm"]);
    }

    #[test]
    fn adds_color_palettes() {
        let theme = Theme::new().add_color_palette("brand", &[("100", "#eef"), ("900", "#003")]);
        assert_eq!(theme.get("--color-brand-900"), Some("#003"));
    }
}
