//! The compilation pipeline: class strings in, stylesheet text out.
//!
//! A [`CssFramework`] is built once from [`FrameworkSettings`]; construction
//! wires the utility and variant registries and is the only step that can
//! fail. After that [`CssFramework::process`] is a pure function of its input
//! and can be called from many threads at once.

use crate::ast::{
    AstNode, AtRuleWrapper, Declaration, MergeStrategy, insert_wrapped, merge_declarations,
    to_css_with,
};
use crate::custom::UtilityDefinition;
use crate::error::{Error, Result};
use crate::segment::{DEFAULT_SEPARATOR, VariantToken, tokenize_with};
use crate::theme::Theme;
use crate::theme::source::ThemeSource;
use crate::utilities::{UtilityRegistry, builtin};
use crate::variants::{AppliedSelector, DarkMode, Selector, VariantOutcome, VariantRegistry};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_INTERNAL_PREFIX: &str = "monorail";

const RESERVED_SEPARATORS: [char; 10] = ['[', ']', '(', ')', '-', '/', '!', '\\', '.', '#'];

/// Which theme variables open the stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeEmission {
    /// Variables the emitted rules reference, followed transitively.
    #[default]
    Used,
    All,
    None,
}

#[derive(Debug, Clone)]
pub struct FrameworkSettings {
    pub theme: Theme,
    pub separator: char,
    pub minify: bool,
    pub dark_mode: DarkMode,
    /// Prefix for helper variables the compiler invents (`--monorail-bg-opacity`).
    pub internal_prefix: String,
    /// Marks every utility declaration `!important`.
    pub important: bool,
    /// Component selector to the classes composed into it.
    pub applies: IndexMap<String, Vec<String>>,
    pub custom_utilities: Vec<UtilityDefinition>,
    pub theme_emission: ThemeEmission,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            theme: Theme::with_defaults(),
            separator: DEFAULT_SEPARATOR,
            minify: false,
            dark_mode: DarkMode::default(),
            internal_prefix: DEFAULT_INTERNAL_PREFIX.to_string(),
            important: false,
            applies: IndexMap::new(),
            custom_utilities: Vec::new(),
            theme_emission: ThemeEmission::Used,
        }
    }
}

impl FrameworkSettings {
    /// Folds parsed source text in: its variables extend the theme, its
    /// `@apply` blocks replace same-selector entries, its `@utility`
    /// definitions are appended.
    pub fn with_source(mut self, source: ThemeSource) -> Self {
        self.theme = self.theme.add_many(source.variables);
        for (selector, classes) in source.applies {
            self.applies.shift_remove(&selector);
            self.applies.insert(selector, classes);
        }
        self.custom_utilities.extend(source.utilities);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.separator.is_whitespace() || RESERVED_SEPARATORS.contains(&self.separator) {
            return Err(Error::Construction(format!(
                "'{}' cannot be used as the variant separator",
                self.separator
            )));
        }
        if let DarkMode::Class(selector) = &self.dark_mode {
            if selector.trim().is_empty() {
                return Err(Error::Construction(
                    "dark mode class selector is empty".to_string(),
                ));
            }
        }
        let prefix_ok = !self.internal_prefix.is_empty()
            && self
                .internal_prefix
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !prefix_ok {
            return Err(Error::Construction(format!(
                "invalid internal prefix '{}'",
                self.internal_prefix
            )));
        }
        Ok(())
    }
}

/// One class string that compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub class: String,
    pub applied: AppliedSelector,
    pub nodes: Vec<AstNode>,
    /// Ordering weights of the variants, in application order.
    pub weights: Vec<u32>,
    pub handler_index: usize,
}

impl CompiledRule {
    fn has_variants(&self) -> bool {
        !self.weights.is_empty()
    }

    fn weight_signature(&self) -> Vec<u32> {
        let mut signature = self.weights.clone();
        signature.sort_unstable_by(|a, b| b.cmp(a));
        signature
    }

    fn into_node(self) -> (Vec<AtRuleWrapper>, AstNode) {
        let AppliedSelector { selector, wrappers } = self.applied;
        (wrappers, AstNode::rule(selector.into_string(), self.nodes))
    }
}

fn cross_rule_order(left: &CompiledRule, right: &CompiledRule) -> Ordering {
    left.has_variants()
        .cmp(&right.has_variants())
        .then_with(|| left.weight_signature().cmp(&right.weight_signature()))
        .then_with(|| left.handler_index.cmp(&right.handler_index))
        .then_with(|| left.class.cmp(&right.class))
}

pub struct CssFramework {
    settings: FrameworkSettings,
    utilities: UtilityRegistry,
    variants: VariantRegistry,
}

impl CssFramework {
    pub fn new(settings: FrameworkSettings) -> Result<Self> {
        settings.validate()?;

        let mut utilities = UtilityRegistry::new();

        // Later definitions of the same pattern replace earlier ones.
        let mut definitions: IndexMap<String, UtilityDefinition> = IndexMap::new();
        for definition in &settings.custom_utilities {
            definitions.shift_remove(&definition.pattern);
            definitions.insert(definition.pattern.clone(), definition.clone());
        }
        for (pattern, definition) in definitions {
            match definition.into_handler() {
                Ok(handler) => utilities.register(handler)?,
                Err(err) => warn!(pattern = %pattern, error = %err, "rejected @utility definition"),
            }
        }
        for handler in builtin::default_handlers(&settings.internal_prefix) {
            utilities.register(handler)?;
        }

        let variants = VariantRegistry::with_defaults(
            &settings.theme,
            &settings.dark_mode,
            &settings.internal_prefix,
        )?;

        Ok(Self {
            settings,
            utilities,
            variants,
        })
    }

    pub fn settings(&self) -> &FrameworkSettings {
        &self.settings
    }

    pub fn theme(&self) -> &Theme {
        &self.settings.theme
    }

    pub fn utilities(&self) -> &UtilityRegistry {
        &self.utilities
    }

    pub fn variants(&self) -> &VariantRegistry {
        &self.variants
    }

    /// Compiles one class string. `None` when the base utility or any
    /// variant is not recognised; such a class contributes no CSS at all.
    pub fn compile_class(&self, class: &str) -> Option<CompiledRule> {
        let (tokens, base) = tokenize_with(class, self.settings.separator);
        let (mut nodes, handler_index, outcome) =
            self.compile_parts(&base, &tokens, AppliedSelector::for_class(class), class)?;
        if self.settings.important {
            nodes.iter_mut().for_each(AstNode::make_important);
        }
        Some(CompiledRule {
            class: class.to_string(),
            applied: outcome.applied,
            nodes,
            weights: outcome.weights,
            handler_index,
        })
    }

    fn compile_parts(
        &self,
        base: &str,
        tokens: &[VariantToken],
        start: AppliedSelector,
        class: &str,
    ) -> Option<(Vec<AstNode>, usize, VariantOutcome)> {
        if base.is_empty() {
            return None;
        }
        let Some(resolved) = self.utilities.resolve(base, &self.settings.theme) else {
            debug!(class, "no utility matched");
            return None;
        };
        let outcome = self.variants.apply_variants(start, tokens);
        if !outcome.is_complete() {
            let unmatched: Vec<&str> = outcome.unmatched.iter().map(|t| t.raw.as_str()).collect();
            debug!(class, ?unmatched, "dropping class with unknown variants");
            return None;
        }
        Some((resolved.nodes, resolved.handler_index, outcome))
    }

    /// Compiles, orders and groups `classes`. Duplicates are ignored.
    pub fn compile<S: AsRef<str>>(&self, classes: &[S]) -> Vec<CompiledRule> {
        let unique: IndexSet<&str> = classes
            .iter()
            .map(|class| class.as_ref())
            .filter(|class| !class.is_empty())
            .collect();
        let mut compiled: Vec<CompiledRule> = unique
            .into_iter()
            .filter_map(|class| self.compile_class(class))
            .collect();
        compiled.sort_by(cross_rule_order);
        compiled
    }

    /// The stylesheet as a node tree: theme variables, components, utilities.
    pub fn process_nodes<S: AsRef<str>>(&self, classes: &[S]) -> Vec<AstNode> {
        let components = self.compile_applies();

        let mut utilities = Vec::new();
        for rule in self.compile(classes) {
            let (wrappers, node) = rule.into_node();
            insert_wrapped(&mut utilities, &wrappers, node);
        }

        let mut nodes = Vec::with_capacity(components.len() + utilities.len() + 1);
        if let Some(root) = self.theme_rule(components.iter().chain(utilities.iter())) {
            nodes.push(root);
        }
        nodes.extend(components);
        nodes.extend(utilities);
        nodes
    }

    pub fn process<S: AsRef<str>>(&self, classes: &[S]) -> String {
        to_css_with(&self.process_nodes(classes), self.settings.minify)
    }

    fn compile_applies(&self) -> Vec<AstNode> {
        let mut out = Vec::new();
        for (selector, classes) in &self.settings.applies {
            let mut declarations: Vec<Declaration> = Vec::new();
            let mut nested: Vec<AstNode> = Vec::new();
            let mut variant_rules: Vec<(AppliedSelector, Vec<AstNode>)> = Vec::new();

            for class in classes {
                let (tokens, base) = tokenize_with(class, self.settings.separator);
                let start = AppliedSelector::new(Selector::raw(selector.as_str()));
                let Some((nodes, _, outcome)) = self.compile_parts(&base, &tokens, start, class)
                else {
                    continue;
                };
                if tokens.is_empty() {
                    for node in nodes {
                        match node {
                            AstNode::Declaration(declaration) => declarations.push(declaration),
                            other => nested.push(other),
                        }
                    }
                } else {
                    variant_rules.push((outcome.applied, nodes));
                }
            }

            if !declarations.is_empty() || !nested.is_empty() {
                let mut children: Vec<AstNode> =
                    merge_declarations(&declarations, MergeStrategy::Smart)
                        .into_iter()
                        .map(AstNode::Declaration)
                        .collect();
                children.extend(nested);
                out.push(AstNode::rule(selector.as_str(), children));
            }
            for (applied, nodes) in variant_rules {
                let AppliedSelector { selector, wrappers } = applied;
                insert_wrapped(
                    &mut out,
                    &wrappers,
                    AstNode::rule(selector.into_string(), nodes),
                );
            }
        }
        out
    }

    fn theme_rule<'a>(&self, emitted: impl Iterator<Item = &'a AstNode>) -> Option<AstNode> {
        let theme = &self.settings.theme;
        let entries: Vec<(String, String)> = theme
            .iter()
            .map(|(key, value)| (theme.var_name(key), theme.prefix_references(value)))
            .collect();

        let included: Vec<&(String, String)> = match self.settings.theme_emission {
            ThemeEmission::None => return None,
            ThemeEmission::All => entries.iter().collect(),
            ThemeEmission::Used => {
                let mut used: HashSet<String> = HashSet::new();
                let mut pending: Vec<String> = Vec::new();
                for node in emitted {
                    node.for_each_declaration(&mut |declaration| {
                        pending.extend(
                            referenced_variables(&declaration.value)
                                .into_iter()
                                .map(str::to_string),
                        );
                    });
                }
                while let Some(name) = pending.pop() {
                    if !used.insert(name.clone()) {
                        continue;
                    }
                    if let Some((_, value)) = entries.iter().find(|(var, _)| *var == name) {
                        pending.extend(referenced_variables(value).into_iter().map(str::to_string));
                    }
                }
                entries
                    .iter()
                    .filter(|(name, _)| used.contains(name))
                    .collect()
            }
        };

        if included.is_empty() {
            return None;
        }
        Some(AstNode::rule(
            ":root, :host",
            included
                .into_iter()
                .map(|(name, value)| AstNode::decl(name.as_str(), value.as_str()))
                .collect(),
        ))
    }
}

/// Custom-property names referenced through `var()` in `value`.
fn referenced_variables(value: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("var(") {
        let after = rest[start + "var(".len()..].trim_start();
        if after.starts_with("--") {
            let end = after
                .find(|ch: char| ch == ',' || ch == ')' || ch.is_whitespace())
                .unwrap_or(after.len());
            names.push(&after[..end]);
        }
        rest = &rest[start + "var(".len()..];
    }
    names
}
