//! Utility handlers and the candidate resolver.
//!
//! Handlers declare the roots they answer for and a [`Priority`]. For a base
//! utility the resolver collects every (candidate, handler) pairing whose root
//! matches, orders them by priority and then registration order, and takes
//! the first handler that produces declarations. Nothing matching is not an
//! error: the class string simply contributes no CSS.

pub mod arbitrary;
pub mod builtin;
pub mod values;

use crate::ast::AstNode;
use crate::candidate::{Candidate, CandidateKind, RootLookup, parse_candidates};
use crate::error::{Error, Result};
use crate::theme::Theme;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolution tiers, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    ExactStatic,
    ConstrainedFunctional,
    NegativeVariant,
    StandardFunctional,
    NamespaceHandler,
    ArbitraryHandler,
    Fallback,
}

pub trait UtilityHandler: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> Priority;

    /// Exact class names this handler compiles (`flex`, `sr-only`).
    fn static_roots(&self) -> Vec<String> {
        Vec::new()
    }

    /// Roots of `root-value` utilities (`bg`, `min-w`).
    fn functional_roots(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether `[property:value]` candidates are routed here.
    fn handles_arbitrary_properties(&self) -> bool {
        false
    }

    /// Declarations for `candidate`, or `None` when the handler does not
    /// apply. An empty list also counts as not applying.
    fn compile(&self, candidate: &Candidate, theme: &Theme) -> Option<Vec<AstNode>>;
}

/// A successfully compiled base utility.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub nodes: Vec<AstNode>,
    pub candidate: Candidate,
    pub priority: Priority,
    /// Registration position of the handler that matched.
    pub handler_index: usize,
}

/// Handlers plus root indexes computed at registration. Once the owning
/// framework is built the registry is never mutated again.
#[derive(Default)]
pub struct UtilityRegistry {
    handlers: Vec<Arc<dyn UtilityHandler>>,
    static_index: HashMap<String, Vec<usize>>,
    functional_index: HashMap<String, Vec<usize>>,
    arbitrary_property: Vec<usize>,
}

impl UtilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn UtilityHandler>) -> Result<()> {
        if self.handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(Error::Construction(format!(
                "utility handler '{}' registered twice",
                handler.name()
            )));
        }

        let static_roots = handler.static_roots();
        let functional_roots = handler.functional_roots();
        let arbitrary = handler.handles_arbitrary_properties();
        if static_roots.is_empty() && functional_roots.is_empty() && !arbitrary {
            return Err(Error::Construction(format!(
                "utility handler '{}' declares no roots",
                handler.name()
            )));
        }

        let idx = self.handlers.len();
        for root in static_roots {
            self.static_index.entry(root).or_default().push(idx);
        }
        for root in functional_roots {
            self.functional_index.entry(root).or_default().push(idx);
        }
        if arbitrary {
            self.arbitrary_property.push(idx);
        }
        self.handlers.push(handler);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.handlers.iter().map(|handler| handler.name())
    }

    fn handlers_for(&self, candidate: &Candidate) -> &[usize] {
        let indices = match &candidate.kind {
            CandidateKind::Static { root } => self.static_index.get(root),
            CandidateKind::Functional { root, .. } => self.functional_index.get(root),
            CandidateKind::ArbitraryValue { namespace, .. } => self.functional_index.get(namespace),
            CandidateKind::ArbitraryProperty { .. } => return &self.arbitrary_property,
        };
        indices.map(Vec::as_slice).unwrap_or_default()
    }

    /// Compiles one base utility. `None` when no handler produces declarations.
    pub fn resolve(&self, base: &str, theme: &Theme) -> Option<Resolved> {
        let candidates = parse_candidates(base, self);

        let mut attempts: Vec<(Priority, usize, usize)> = Vec::new();
        for (candidate_idx, candidate) in candidates.iter().enumerate() {
            for &handler_idx in self.handlers_for(candidate) {
                let priority = self.handlers[handler_idx].priority();
                attempts.push((priority, handler_idx, candidate_idx));
            }
        }
        attempts.sort_unstable();

        attempts
            .into_iter()
            .find_map(|(priority, handler_idx, candidate_idx)| {
                let candidate = &candidates[candidate_idx];
                let mut nodes = self.handlers[handler_idx]
                    .compile(candidate, theme)
                    .filter(|nodes| !nodes.is_empty())?;
                if candidate.important {
                    nodes.iter_mut().for_each(AstNode::make_important);
                }
                Some(Resolved {
                    nodes,
                    candidate: candidate.clone(),
                    priority,
                    handler_index: handler_idx,
                })
            })
    }
}

impl RootLookup for UtilityRegistry {
    fn is_static_root(&self, root: &str) -> bool {
        self.static_index.contains_key(root)
    }

    fn is_functional_root(&self, root: &str) -> bool {
        self.functional_index.contains_key(root)
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, UtilityHandler, UtilityRegistry};
    use crate::ast::AstNode;
    use crate::candidate::Candidate;
    use crate::error::Error;
    use crate::theme::Theme;
    use std::sync::Arc;

    struct Fixed {
        name: &'static str,
        priority: Priority,
        roots: &'static [&'static str],
        value: &'static str,
    }

    impl UtilityHandler for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> Priority {
            self.priority
        }
        fn functional_roots(&self) -> Vec<String> {
            self.roots.iter().map(|r| r.to_string()).collect()
        }
        fn compile(&self, candidate: &Candidate, _theme: &Theme) -> Option<Vec<AstNode>> {
            let value = candidate.value()?;
            (value.as_str() == "primary").then(|| vec![AstNode::decl("color", self.value)])
        }
    }

    #[test]
    fn lower_priority_tier_wins_regardless_of_registration_order() {
        let mut registry = UtilityRegistry::new();
        registry
            .register(Arc::new(Fixed {
                name: "general",
                priority: Priority::NamespaceHandler,
                roots: &["btn"],
                value: "general",
            }))
            .expect("registers");
        registry
            .register(Arc::new(Fixed {
                name: "exact",
                priority: Priority::ConstrainedFunctional,
                roots: &["btn"],
                value: "exact",
            }))
            .expect("registers");

        let resolved = registry
            .resolve("btn-primary", &Theme::new())
            .expect("resolves");
        assert_eq!(resolved.nodes, vec![AstNode::decl("color", "exact")]);
        assert_eq!(resolved.handler_index, 1);
    }

    #[test]
    fn important_marks_every_declaration() {
        let mut registry = UtilityRegistry::new();
        registry
            .register(Arc::new(Fixed {
                name: "only",
                priority: Priority::StandardFunctional,
                roots: &["btn"],
                value: "x",
            }))
            .expect("registers");
        let resolved = registry
            .resolve("btn-primary!", &Theme::new())
            .expect("resolves");
        let AstNode::Declaration(declaration) = &resolved.nodes[0] else {
            panic!("expected a declaration");
        };
        assert!(declaration.important);
    }

    #[test]
    fn wiring_errors_are_construction_errors() {
        let mut registry = UtilityRegistry::new();
        let handler = || {
            Arc::new(Fixed {
                name: "dup",
                priority: Priority::StandardFunctional,
                roots: &["x"],
                value: "x",
            })
        };
        registry.register(handler()).expect("first registration");
        assert!(matches!(
            registry.register(handler()),
            Err(Error::Construction(_))
        ));

        let rootless = Arc::new(Fixed {
            name: "rootless",
            priority: Priority::Fallback,
            roots: &[],
            value: "x",
        });
        assert!(matches!(
            registry.register(rootless),
            Err(Error::Construction(_))
        ));
    }

    #[test]
    fn unknown_utilities_resolve_to_nothing() {
        let registry = UtilityRegistry::new();
        assert!(registry.resolve("not-a-real-utility", &Theme::new()).is_none());
    }
}
