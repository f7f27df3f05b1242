use super::Declaration;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    #[default]
    LastWins,
    FirstWins,
    /// Last value wins unless an earlier value is `!important` and the later one is not.
    ImportantWins,
    /// Shorthand-aware merging used when composing classes with `@apply`.
    Smart,
}

/// Collapses declarations to one per property, sorted vendor-prefixed first,
/// then alphabetically.
pub fn merge_declarations(
    declarations: &[Declaration],
    strategy: MergeStrategy,
) -> Vec<Declaration> {
    let mut merged: IndexMap<String, Declaration> = IndexMap::new();

    for declaration in declarations {
        match strategy {
            MergeStrategy::LastWins => {
                merged.insert(declaration.property.clone(), declaration.clone());
            }
            MergeStrategy::FirstWins => {
                merged
                    .entry(declaration.property.clone())
                    .or_insert_with(|| declaration.clone());
            }
            MergeStrategy::ImportantWins => insert_respecting_important(&mut merged, declaration),
            MergeStrategy::Smart => {
                let logical = unprefixed(&declaration.property);
                if let Some(longhands) = longhands_of(logical) {
                    merged.retain(|property, existing| {
                        let evicted = longhands.contains(&unprefixed(property));
                        !evicted || (existing.important && !declaration.important)
                    });
                }
                insert_respecting_important(&mut merged, declaration);
            }
        }
    }

    let mut out: Vec<Declaration> = merged.into_values().collect();
    out.sort_by(|left, right| {
        let left_vendor = is_vendor_prefixed(&left.property);
        let right_vendor = is_vendor_prefixed(&right.property);
        right_vendor
            .cmp(&left_vendor)
            .then_with(|| left.property.cmp(&right.property))
    });
    out
}

fn insert_respecting_important(
    merged: &mut IndexMap<String, Declaration>,
    declaration: &Declaration,
) {
    if let Some(existing) = merged.get(&declaration.property) {
        if existing.important && !declaration.important {
            return;
        }
    }
    merged.insert(declaration.property.clone(), declaration.clone());
}

fn is_vendor_prefixed(property: &str) -> bool {
    property.starts_with('-') && !property.starts_with("--")
}

/// `-webkit-transition-property` -> `transition-property`.
fn unprefixed(property: &str) -> &str {
    if !is_vendor_prefixed(property) {
        return property;
    }
    property[1..]
        .split_once('-')
        .map(|(_, rest)| rest)
        .unwrap_or(property)
}

fn longhands_of(shorthand: &str) -> Option<&'static [&'static str]> {
    let longhands: &'static [&'static str] = match shorthand {
        "margin" => &[
            "margin-top",
            "margin-right",
            "margin-bottom",
            "margin-left",
            "margin-block",
            "margin-block-start",
            "margin-block-end",
            "margin-inline",
            "margin-inline-start",
            "margin-inline-end",
        ],
        "padding" => &[
            "padding-top",
            "padding-right",
            "padding-bottom",
            "padding-left",
            "padding-block",
            "padding-block-start",
            "padding-block-end",
            "padding-inline",
            "padding-inline-start",
            "padding-inline-end",
        ],
        "border" => &[
            "border-width",
            "border-style",
            "border-color",
            "border-top",
            "border-right",
            "border-bottom",
            "border-left",
            "border-top-width",
            "border-right-width",
            "border-bottom-width",
            "border-left-width",
            "border-top-style",
            "border-right-style",
            "border-bottom-style",
            "border-left-style",
            "border-top-color",
            "border-right-color",
            "border-bottom-color",
            "border-left-color",
        ],
        "border-width" => &[
            "border-top-width",
            "border-right-width",
            "border-bottom-width",
            "border-left-width",
        ],
        "border-color" => &[
            "border-top-color",
            "border-right-color",
            "border-bottom-color",
            "border-left-color",
        ],
        "border-radius" => &[
            "border-top-left-radius",
            "border-top-right-radius",
            "border-bottom-right-radius",
            "border-bottom-left-radius",
        ],
        "font" => &[
            "font-style",
            "font-variant",
            "font-weight",
            "font-stretch",
            "font-size",
            "line-height",
            "font-family",
        ],
        "flex" => &["flex-grow", "flex-shrink", "flex-basis"],
        "grid" => &[
            "grid-template-rows",
            "grid-template-columns",
            "grid-template-areas",
            "grid-auto-rows",
            "grid-auto-columns",
            "grid-auto-flow",
        ],
        "gap" => &["row-gap", "column-gap"],
        "place-items" => &["align-items", "justify-items"],
        "place-content" => &["align-content", "justify-content"],
        "place-self" => &["align-self", "justify-self"],
        "overflow" => &["overflow-x", "overflow-y"],
        "inset" => &["top", "right", "bottom", "left"],
        "transition" => &[
            "transition-property",
            "transition-duration",
            "transition-timing-function",
            "transition-delay",
            "transition-behavior",
        ],
        _ => return None,
    };
    Some(longhands)
}
