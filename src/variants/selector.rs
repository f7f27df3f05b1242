use crate::ast::AtRuleWrapper;
use crate::css_text::split_top_level;
use std::fmt;

/// Escapes a class name for use after `.` in a selector.
pub fn escape_class_name(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for (idx, ch) in class.chars().enumerate() {
        let leading_digit = ch.is_ascii_digit()
            && (idx == 0 || (idx == 1 && class.starts_with('-')));
        if leading_digit {
            escaped.push_str(&format!("\\{:x} ", ch as u32));
            continue;
        }
        match ch {
            ',' => escaped.push_str("\\2c "),
            '\\' | ':' | '/' | '[' | ']' | '(' | ')' | '&' | '>' | '<' | '+' | '~' | '%'
            | '=' | '!' | '*' | '@' | '#' | '\'' | '"' | '.' | '?' | '$' | '^' | '|' | '{'
            | '}' | ';' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }

    escaped
}

/// Escapes the first space-delimited word of a selector and keeps the rest.
pub fn escape_selector(selector: &str) -> String {
    match selector.split_once(' ') {
        Some((first, rest)) => format!("{} {}", escape_class_name(first), rest),
        None => escape_class_name(selector),
    }
}

/// An escaped CSS selector under construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector(String);

impl Selector {
    pub fn class(name: &str) -> Self {
        Self(format!(".{}", escape_class_name(name)))
    }

    pub fn raw(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Appends `suffix` to every member of a selector list.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let parts: Vec<String> = split_top_level(&self.0, ',')
            .into_iter()
            .map(|part| format!("{}{}", part.trim(), suffix))
            .collect();
        Self(parts.join(", "))
    }

    /// `:name` or `::name` pseudo suffix.
    pub fn with_pseudo(&self, pseudo: &str) -> Self {
        if pseudo.starts_with(':') {
            self.with_suffix(pseudo)
        } else {
            self.with_suffix(&format!(":{}", pseudo))
        }
    }

    pub fn with_attribute(&self, attribute: &str) -> Self {
        self.with_suffix(&format!("[{}]", attribute))
    }

    /// `ancestor <self>`.
    pub fn descendant_of(&self, ancestor: &str) -> Self {
        Self(format!("{} {}", ancestor.trim(), self.0))
    }

    /// Substitutes `self` for each `&` in `pattern`. A pattern without `&`
    /// is read as an ancestor.
    pub fn relativize(&self, pattern: &str) -> Self {
        if pattern.contains('&') {
            Self(pattern.replace('&', &self.0))
        } else {
            self.descendant_of(pattern)
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The selector plus the at-rules wrapping it, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppliedSelector {
    pub selector: Selector,
    pub wrappers: Vec<AtRuleWrapper>,
}

impl AppliedSelector {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            wrappers: Vec::new(),
        }
    }

    pub fn for_class(class: &str) -> Self {
        Self::new(Selector::class(class))
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_wrapper(mut self, wrapper: AtRuleWrapper) -> Self {
        self.wrappers.push(wrapper);
        self
    }
}
