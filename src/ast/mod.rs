//! Rule trees produced by utilities and consumed by the serializer.

mod merge;
mod serialize;

pub use merge::{MergeStrategy, merge_declarations};
pub use serialize::{to_css, to_css_with};

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }

    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AtRuleKind {
    Media,
    Container,
    Supports,
    /// Any other at-rule reached through an arbitrary variant (`[@starting-style]`).
    Other(String),
}

impl AtRuleKind {
    pub fn parse(name: &str) -> Self {
        match name.trim_start_matches('@') {
            "media" => AtRuleKind::Media,
            "container" => AtRuleKind::Container,
            "supports" => AtRuleKind::Supports,
            other => AtRuleKind::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AtRuleKind::Media => "media",
            AtRuleKind::Container => "container",
            AtRuleKind::Supports => "supports",
            AtRuleKind::Other(name) => name,
        }
    }
}

/// An at-rule a rule is nested inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtRuleWrapper {
    pub kind: AtRuleKind,
    pub params: String,
}

impl AtRuleWrapper {
    pub fn new(kind: AtRuleKind, params: impl Into<String>) -> Self {
        Self {
            kind,
            params: params.into(),
        }
    }

    pub fn media(params: impl Into<String>) -> Self {
        Self::new(AtRuleKind::Media, params)
    }

    pub fn container(params: impl Into<String>) -> Self {
        Self::new(AtRuleKind::Container, params)
    }

    pub fn supports(params: impl Into<String>) -> Self {
        Self::new(AtRuleKind::Supports, params)
    }
}

impl fmt::Display for AtRuleWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "@{}", self.kind.name())
        } else {
            write!(f, "@{} {}", self.kind.name(), self.params)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AstNode {
    Declaration(Declaration),
    /// A style rule. Nested rule selectors are relative to the parent (`&:hover`).
    Rule {
        selector: String,
        children: Vec<AstNode>,
    },
    AtRule {
        kind: AtRuleKind,
        params: String,
        children: Vec<AstNode>,
    },
}

impl AstNode {
    pub fn decl(property: impl Into<String>, value: impl Into<String>) -> Self {
        AstNode::Declaration(Declaration::new(property, value))
    }

    pub fn rule(selector: impl Into<String>, children: Vec<AstNode>) -> Self {
        AstNode::Rule {
            selector: selector.into(),
            children,
        }
    }

    pub fn at_rule(wrapper: &AtRuleWrapper, children: Vec<AstNode>) -> Self {
        AstNode::AtRule {
            kind: wrapper.kind.clone(),
            params: wrapper.params.clone(),
            children,
        }
    }

    /// Marks every declaration in this subtree `!important`.
    pub fn make_important(&mut self) {
        match self {
            AstNode::Declaration(declaration) => declaration.important = true,
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => {
                children.iter_mut().for_each(AstNode::make_important)
            }
        }
    }

    /// Calls `visit` on every declaration in this subtree.
    pub fn for_each_declaration<'a>(&'a self, visit: &mut impl FnMut(&'a Declaration)) {
        match self {
            AstNode::Declaration(declaration) => visit(declaration),
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => {
                for child in children {
                    child.for_each_declaration(visit);
                }
            }
        }
    }
}

/// Places `node` inside `wrappers` (outermost first), reusing an existing
/// sibling at-rule with the same kind and params instead of opening a new one.
pub fn insert_wrapped(into: &mut Vec<AstNode>, wrappers: &[AtRuleWrapper], node: AstNode) {
    let Some((outer, rest)) = wrappers.split_first() else {
        into.push(node);
        return;
    };

    let existing = into.iter().position(|sibling| {
        matches!(
            sibling,
            AstNode::AtRule { kind, params, .. } if *kind == outer.kind && *params == outer.params
        )
    });

    match existing {
        Some(idx) => {
            if let AstNode::AtRule { children, .. } = &mut into[idx] {
                insert_wrapped(children, rest, node);
            }
        }
        None => {
            let mut children = Vec::new();
            insert_wrapped(&mut children, rest, node);
            into.push(AstNode::at_rule(outer, children));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AstNode, AtRuleKind, AtRuleWrapper, insert_wrapped};

    #[test]
    fn parses_at_rule_kinds() {
        assert_eq!(AtRuleKind::parse("@media"), AtRuleKind::Media);
        assert_eq!(AtRuleKind::parse("supports"), AtRuleKind::Supports);
        assert_eq!(
            AtRuleKind::parse("@starting-style"),
            AtRuleKind::Other("starting-style".to_string())
        );
        assert_eq!(
            AtRuleWrapper::container("sidebar (width >= 20rem)").to_string(),
            "@container sidebar (width >= 20rem)"
        );
    }

    #[test]
    fn groups_rules_under_shared_wrappers() {
        let md = AtRuleWrapper::media("(width >= 48rem)");
        let print = AtRuleWrapper::media("print");
        let mut root = Vec::new();
        insert_wrapped(&mut root, &[md.clone()], AstNode::rule(".a", vec![]));
        insert_wrapped(&mut root, &[md.clone(), print.clone()], AstNode::rule(".b", vec![]));
        insert_wrapped(&mut root, &[md.clone()], AstNode::rule(".c", vec![]));

        assert_eq!(root.len(), 1);
        let AstNode::AtRule { children, .. } = &root[0] else {
            panic!("expected at-rule");
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(&children[1], AstNode::AtRule { params, .. } if params == "print"));
    }

    #[test]
    fn marks_nested_declarations_important() {
        let mut rule = AstNode::rule(
            ".a",
            vec![
                AstNode::decl("color", "red"),
                AstNode::rule("&:hover", vec![AstNode::decl("color", "blue")]),
            ],
        );
        rule.make_important();
        let mut count = 0;
        rule.for_each_declaration(&mut |decl| {
            assert!(decl.important);
            count += 1;
        });
        assert_eq!(count, 2);
    }
}
