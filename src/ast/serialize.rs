use super::{AstNode, Declaration};

/// Pretty output: one rule per line, at-rule bodies indented two spaces.
pub fn to_css(nodes: &[AstNode]) -> String {
    to_css_with(nodes, false)
}

pub fn to_css_with(nodes: &[AstNode], minify: bool) -> String {
    let mut writer = CssWriter {
        out: String::new(),
        minify,
    };
    for node in nodes {
        writer.node(node, None, 0);
    }
    if !minify && !writer.out.is_empty() && !writer.out.ends_with('\n') {
        writer.out.push('\n');
    }
    writer.out
}

struct CssWriter {
    out: String,
    minify: bool,
}

impl CssWriter {
    fn node(&mut self, node: &AstNode, parent: Option<&str>, depth: usize) {
        match node {
            // Bare declarations only appear inside rules; a stray one at the
            // top level has no selector to live in.
            AstNode::Declaration(_) => {}
            AstNode::Rule { selector, children } => {
                let selector = match parent {
                    Some(parent) => resolve_nested_selector(parent, selector),
                    None => selector.clone(),
                };
                self.rule(&selector, children, depth);
            }
            AstNode::AtRule {
                kind,
                params,
                children,
            } => {
                self.indent(depth);
                self.out.push('@');
                self.out.push_str(kind.name());
                if !params.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(params);
                }
                self.open_block();
                // Declarations directly under an at-rule nested in a rule still
                // belong to that rule's selector.
                let declarations = declarations_of(children);
                if let (Some(parent), false) = (parent, declarations.is_empty()) {
                    self.declaration_block(parent, &declarations, depth + 1);
                }
                for child in children {
                    self.node(child, parent, depth + 1);
                }
                self.close_block(depth);
            }
        }
    }

    fn rule(&mut self, selector: &str, children: &[AstNode], depth: usize) {
        let declarations = declarations_of(children);
        if !declarations.is_empty() {
            self.declaration_block(selector, &declarations, depth);
        }
        for child in children {
            if !matches!(child, AstNode::Declaration(_)) {
                self.node(child, Some(selector), depth);
            }
        }
    }

    fn declaration_block(&mut self, selector: &str, declarations: &[&Declaration], depth: usize) {
        self.indent(depth);
        self.out.push_str(selector);
        if self.minify {
            self.out.push('{');
            let body: Vec<String> = declarations.iter().map(|d| declaration(d)).collect();
            self.out.push_str(&body.join(";"));
            self.out.push('}');
        } else {
            self.out.push_str(" {");
            for d in declarations {
                self.out.push(' ');
                self.out.push_str(&declaration(d));
                self.out.push(';');
            }
            self.out.push_str(" }\n");
        }
    }

    fn open_block(&mut self) {
        if self.minify {
            self.out.push('{');
        } else {
            self.out.push_str(" {\n");
        }
    }

    fn close_block(&mut self, depth: usize) {
        self.indent(depth);
        if self.minify {
            self.out.push('}');
        } else {
            self.out.push_str("}\n");
        }
    }

    fn indent(&mut self, depth: usize) {
        if !self.minify {
            for _ in 0..depth {
                self.out.push_str("  ");
            }
        }
    }
}

fn declarations_of(children: &[AstNode]) -> Vec<&Declaration> {
    children
        .iter()
        .filter_map(|child| match child {
            AstNode::Declaration(declaration) => Some(declaration),
            _ => None,
        })
        .collect()
}

fn declaration(declaration: &Declaration) -> String {
    if declaration.important {
        format!("{}:{} !important", declaration.property, declaration.value)
    } else {
        format!("{}:{}", declaration.property, declaration.value)
    }
}

/// `&` stands for the parent; a selector without `&` is a descendant.
pub(crate) fn resolve_nested_selector(parent: &str, nested: &str) -> String {
    if nested.contains('&') {
        nested.replace('&', parent)
    } else {
        format!("{} {}", parent, nested)
    }
}
