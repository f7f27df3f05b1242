//! Variant engine: folds a variant chain over a base selector.
//!
//! Each [`VariantHandler`] turns an [`AppliedSelector`] into a new one for the
//! tokens it recognises. Tokens are applied left to right in source order;
//! handler weights only decide where the resulting rule lands relative to other
//! rules in the stylesheet.

pub mod builtin;
pub mod selector;

pub use builtin::DarkMode;
pub use selector::{AppliedSelector, Selector, escape_class_name, escape_selector};

use crate::error::{Error, Result};
use crate::segment::VariantToken;
use crate::theme::Theme;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Rewrites the selector only.
    StyleRule,
    /// Adds at-rule wrappers only.
    AtRule,
    Both,
}

impl Capability {
    pub fn rewrites_selector(self) -> bool {
        matches!(self, Capability::StyleRule | Capability::Both)
    }
}

pub trait VariantHandler: Send + Sync {
    fn name(&self) -> &str;

    fn weight(&self) -> u32;

    fn capability(&self) -> Capability;

    fn can_handle(&self, token: &VariantToken) -> bool;

    fn try_apply(&self, current: &AppliedSelector, token: &VariantToken) -> Option<AppliedSelector>;

    /// Ordering weight for one token; handlers covering ordered scales
    /// (breakpoints) refine their base weight per token.
    fn token_weight(&self, _token: &VariantToken) -> u32 {
        self.weight()
    }
}

/// Result of folding a variant chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOutcome {
    pub applied: AppliedSelector,
    /// Ordering weights of the applied tokens, in application order.
    pub weights: Vec<u32>,
    /// Tokens no handler accepted, skipped during the fold.
    pub unmatched: Vec<VariantToken>,
}

impl VariantOutcome {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Handlers sorted by weight. Immutable once built and shared freely.
#[derive(Default)]
pub struct VariantRegistry {
    handlers: Vec<Box<dyn VariantHandler>>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in variant families bound to `theme`.
    pub fn with_defaults(
        theme: &Theme,
        dark_mode: &DarkMode,
        internal_prefix: &str,
    ) -> Result<Self> {
        let mut registry = Self::new();
        for handler in builtin::default_handlers(theme, dark_mode, internal_prefix) {
            registry.register(handler)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, handler: Box<dyn VariantHandler>) -> Result<()> {
        if self.handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(Error::Construction(format!(
                "variant handler '{}' registered twice",
                handler.name()
            )));
        }
        let position = self
            .handlers
            .iter()
            .position(|h| h.weight() > handler.weight())
            .unwrap_or(self.handlers.len());
        self.handlers.insert(position, handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn find(&self, token: &VariantToken) -> Option<&dyn VariantHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.can_handle(token))
            .map(|handler| handler.as_ref())
    }

    /// Folds `tokens` left to right over `base`.
    pub fn apply_variants(&self, base: AppliedSelector, tokens: &[VariantToken]) -> VariantOutcome {
        let mut outcome = VariantOutcome {
            applied: base,
            weights: Vec::with_capacity(tokens.len()),
            unmatched: Vec::new(),
        };

        for token in tokens {
            let applied = self.find(token).and_then(|handler| {
                handler
                    .try_apply(&outcome.applied, token)
                    .filter(|applied| {
                        respects_capability(handler.capability(), &outcome.applied, applied)
                    })
                    .map(|applied| (applied, handler.token_weight(token)))
            });
            match applied {
                Some((applied, weight)) => {
                    outcome.applied = applied;
                    outcome.weights.push(weight);
                }
                None => {
                    debug!(variant = %token.raw, "no variant handler matched");
                    outcome.unmatched.push(token.clone());
                }
            }
        }

        outcome
    }
}

// A handler may only touch the parts of the selector its capability names.
fn respects_capability(
    capability: Capability,
    before: &AppliedSelector,
    after: &AppliedSelector,
) -> bool {
    match capability {
        Capability::StyleRule => after.wrappers == before.wrappers,
        Capability::AtRule => after.selector == before.selector,
        Capability::Both => true,
    }
}
