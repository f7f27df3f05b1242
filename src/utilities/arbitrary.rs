use super::{Priority, UtilityHandler};
use crate::ast::AstNode;
use crate::candidate::{Candidate, CandidateKind};
use crate::theme::Theme;

/// `[property:value]`. The property must be a lowercase-leading identifier
/// (or a custom property); the value has already had `_` decoded to spaces.
pub struct ArbitraryPropertyUtility;

impl ArbitraryPropertyUtility {
    pub fn is_valid_property(property: &str) -> bool {
        let body = property.strip_prefix("--").unwrap_or(property);
        let mut chars = body.chars();
        matches!(chars.next(), Some(first) if first.is_ascii_lowercase())
            && chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    }
}

impl UtilityHandler for ArbitraryPropertyUtility {
    fn name(&self) -> &str {
        "arbitrary-property"
    }

    fn priority(&self) -> Priority {
        Priority::ArbitraryHandler
    }

    fn handles_arbitrary_properties(&self) -> bool {
        true
    }

    fn compile(&self, candidate: &Candidate, _theme: &Theme) -> Option<Vec<AstNode>> {
        let CandidateKind::ArbitraryProperty { property, value } = &candidate.kind else {
            return None;
        };
        if candidate.modifier.is_some() || !Self::is_valid_property(property) {
            return None;
        }
        Some(vec![AstNode::decl(property.as_str(), value.as_str())])
    }
}

#[cfg(test)]
mod tests {
    use super::ArbitraryPropertyUtility;
    use crate::ast::AstNode;
    use crate::theme::Theme;
    use crate::utilities::UtilityRegistry;
    use std::sync::Arc;

    fn registry() -> UtilityRegistry {
        let mut registry = UtilityRegistry::new();
        registry
            .register(Arc::new(ArbitraryPropertyUtility))
            .expect("registers");
        registry
    }

    #[test]
    fn emits_one_declaration_with_decoded_value() {
        let resolved = registry()
            .resolve("[grid-template-columns:1fr_2fr]", &Theme::new())
            .expect("valid property");
        assert_eq!(
            resolved.nodes,
            vec![AstNode::decl("grid-template-columns", "1fr 2fr")]
        );
    }

    #[test]
    fn custom_properties_are_allowed() {
        assert!(registry().resolve("[--gutter:2rem]", &Theme::new()).is_some());
    }

    #[test]
    fn rejects_illegal_property_names() {
        for class in ["[Color:red]", "[1x:red]", "[co lor:red]", "[-x:red]"] {
            assert!(registry().resolve(class, &Theme::new()).is_none(), "{class}");
        }
    }
}
