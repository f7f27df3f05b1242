//! The built-in utility catalog.

use super::arbitrary::ArbitraryPropertyUtility;
use super::values::{
    ArbitraryType, accepts, color_declarations, is_scale_number, negate, resolve_color,
    resolve_size, resolve_spacing,
};
use super::{Priority, UtilityHandler};
use crate::ast::AstNode;
use crate::candidate::{Candidate, CandidateKind, CandidateValue, Modifier};
use crate::theme::Theme;
use std::sync::Arc;

type Keywords = &'static [(&'static str, &'static str)];
type Roots = &'static [(&'static str, &'static [&'static str])];

const STATIC_UTILITIES: &[(&str, &str)] = &[
    ("block", "display:block"),
    ("inline-block", "display:inline-block"),
    ("inline", "display:inline"),
    ("flex", "display:flex"),
    ("inline-flex", "display:inline-flex"),
    ("grid", "display:grid"),
    ("inline-grid", "display:inline-grid"),
    ("contents", "display:contents"),
    ("table", "display:table"),
    ("flow-root", "display:flow-root"),
    ("hidden", "display:none"),
    ("static", "position:static"),
    ("fixed", "position:fixed"),
    ("absolute", "position:absolute"),
    ("relative", "position:relative"),
    ("sticky", "position:sticky"),
    ("visible", "visibility:visible"),
    ("invisible", "visibility:hidden"),
    ("collapse", "visibility:collapse"),
    ("isolate", "isolation:isolate"),
    ("flex-row", "flex-direction:row"),
    ("flex-row-reverse", "flex-direction:row-reverse"),
    ("flex-col", "flex-direction:column"),
    ("flex-col-reverse", "flex-direction:column-reverse"),
    ("flex-wrap", "flex-wrap:wrap"),
    ("flex-nowrap", "flex-wrap:nowrap"),
    ("flex-1", "flex:1 1 0%"),
    ("flex-auto", "flex:1 1 auto"),
    ("flex-initial", "flex:0 1 auto"),
    ("flex-none", "flex:none"),
    ("grow", "flex-grow:1"),
    ("grow-0", "flex-grow:0"),
    ("shrink", "flex-shrink:1"),
    ("shrink-0", "flex-shrink:0"),
    ("items-start", "align-items:flex-start"),
    ("items-end", "align-items:flex-end"),
    ("items-center", "align-items:center"),
    ("items-baseline", "align-items:baseline"),
    ("items-stretch", "align-items:stretch"),
    ("justify-start", "justify-content:flex-start"),
    ("justify-end", "justify-content:flex-end"),
    ("justify-center", "justify-content:center"),
    ("justify-between", "justify-content:space-between"),
    ("justify-around", "justify-content:space-around"),
    ("justify-evenly", "justify-content:space-evenly"),
    ("self-auto", "align-self:auto"),
    ("self-start", "align-self:flex-start"),
    ("self-end", "align-self:flex-end"),
    ("self-center", "align-self:center"),
    ("self-stretch", "align-self:stretch"),
    ("place-items-center", "place-items:center"),
    ("place-content-center", "place-content:center"),
    ("text-left", "text-align:left"),
    ("text-center", "text-align:center"),
    ("text-right", "text-align:right"),
    ("text-justify", "text-align:justify"),
    ("italic", "font-style:italic"),
    ("not-italic", "font-style:normal"),
    ("underline", "text-decoration-line:underline"),
    ("line-through", "text-decoration-line:line-through"),
    ("no-underline", "text-decoration-line:none"),
    ("uppercase", "text-transform:uppercase"),
    ("lowercase", "text-transform:lowercase"),
    ("capitalize", "text-transform:capitalize"),
    ("normal-case", "text-transform:none"),
    ("truncate", "overflow:hidden;text-overflow:ellipsis;white-space:nowrap"),
    (
        "antialiased",
        "-webkit-font-smoothing:antialiased;-moz-osx-font-smoothing:grayscale",
    ),
    (
        "subpixel-antialiased",
        "-webkit-font-smoothing:auto;-moz-osx-font-smoothing:auto",
    ),
    (
        "sr-only",
        "position:absolute;width:1px;height:1px;padding:0;margin:-1px;overflow:hidden;clip:rect(0, 0, 0, 0);white-space:nowrap;border-width:0",
    ),
    (
        "not-sr-only",
        "position:static;width:auto;height:auto;padding:0;margin:0;overflow:visible;clip:auto;white-space:normal",
    ),
    ("overflow-auto", "overflow:auto"),
    ("overflow-hidden", "overflow:hidden"),
    ("overflow-clip", "overflow:clip"),
    ("overflow-visible", "overflow:visible"),
    ("overflow-scroll", "overflow:scroll"),
    ("overflow-x-auto", "overflow-x:auto"),
    ("overflow-y-auto", "overflow-y:auto"),
    ("whitespace-normal", "white-space:normal"),
    ("whitespace-nowrap", "white-space:nowrap"),
    ("whitespace-pre", "white-space:pre"),
    ("whitespace-pre-wrap", "white-space:pre-wrap"),
    ("break-words", "overflow-wrap:break-word"),
    ("break-all", "word-break:break-all"),
    ("cursor-pointer", "cursor:pointer"),
    ("cursor-default", "cursor:default"),
    ("cursor-not-allowed", "cursor:not-allowed"),
    ("pointer-events-none", "pointer-events:none"),
    ("pointer-events-auto", "pointer-events:auto"),
    ("select-none", "-webkit-user-select:none;user-select:none"),
    ("select-text", "-webkit-user-select:text;user-select:text"),
    ("select-all", "-webkit-user-select:all;user-select:all"),
    ("appearance-none", "-webkit-appearance:none;appearance:none"),
    ("border-solid", "border-style:solid"),
    ("border-dashed", "border-style:dashed"),
    ("border-dotted", "border-style:dotted"),
    ("border-none", "border-style:none"),
    ("box-border", "box-sizing:border-box"),
    ("box-content", "box-sizing:content-box"),
    ("object-contain", "object-fit:contain"),
    ("object-cover", "object-fit:cover"),
    (
        "transition",
        concat!(
            "transition-property:color, background-color, border-color, opacity, box-shadow, ",
            "transform;transition-timing-function:cubic-bezier(0.4, 0, 0.2, 1);",
            "transition-duration:150ms"
        ),
    ),
    ("transition-none", "transition-property:none"),
];

const WIDTH_KEYWORDS: Keywords = &[
    ("auto", "auto"),
    ("full", "100%"),
    ("screen", "100vw"),
    ("dvw", "100dvw"),
    ("svw", "100svw"),
    ("lvw", "100lvw"),
    ("min", "min-content"),
    ("max", "max-content"),
    ("fit", "fit-content"),
    ("none", "none"),
];

const HEIGHT_KEYWORDS: Keywords = &[
    ("auto", "auto"),
    ("full", "100%"),
    ("screen", "100vh"),
    ("dvh", "100dvh"),
    ("svh", "100svh"),
    ("lvh", "100lvh"),
    ("min", "min-content"),
    ("max", "max-content"),
    ("fit", "fit-content"),
    ("none", "none"),
];

const SIZE_KEYWORDS: Keywords = &[
    ("auto", "auto"),
    ("full", "100%"),
    ("min", "min-content"),
    ("max", "max-content"),
    ("fit", "fit-content"),
];

const INSET_KEYWORDS: Keywords = &[("auto", "auto"), ("full", "100%")];

const MARGIN_KEYWORDS: Keywords = &[("auto", "auto")];

const FONT_WEIGHTS: Keywords = &[
    ("thin", "100"),
    ("extralight", "200"),
    ("light", "300"),
    ("normal", "400"),
    ("medium", "500"),
    ("semibold", "600"),
    ("bold", "700"),
    ("extrabold", "800"),
    ("black", "900"),
];

const RADIUS_KEYWORDS: Keywords = &[("none", "0"), ("full", "calc(infinity * 1px)")];

const LENGTHS: &[ArbitraryType] = &[
    ArbitraryType::Length,
    ArbitraryType::Percentage,
    ArbitraryType::Number,
    ArbitraryType::Var,
];

const NUMBERS: &[ArbitraryType] = &[ArbitraryType::Number, ArbitraryType::Var];

const PERCENTAGES: &[ArbitraryType] = &[
    ArbitraryType::Number,
    ArbitraryType::Percentage,
    ArbitraryType::Var,
];

const ANY_VALUE: &[ArbitraryType] = &[
    ArbitraryType::Length,
    ArbitraryType::Percentage,
    ArbitraryType::Number,
    ArbitraryType::Var,
    ArbitraryType::Other,
];

/// The handler set every framework starts from, in registration order.
pub fn default_handlers(internal_prefix: &str) -> Vec<Arc<dyn UtilityHandler>> {
    let functional = |name: &'static str,
                      priority: Priority,
                      roots: Roots,
                      rule: ValueRule,
                      negative: bool|
     -> Arc<dyn UtilityHandler> {
        Arc::new(FunctionalUtility {
            name,
            priority,
            roots,
            rule,
            negative,
            internal_prefix: internal_prefix.to_string(),
        })
    };

    vec![
        Arc::new(StaticUtilities),
        functional(
            "z-index",
            Priority::ConstrainedFunctional,
            &[("z", &["z-index"])],
            ValueRule::Themed {
                namespaces: &["--z-index"],
                keywords: &[("auto", "auto")],
                numeric: Numeric::Integer,
                arbitrary: NUMBERS,
            },
            true,
        ),
        functional(
            "order",
            Priority::ConstrainedFunctional,
            &[("order", &["order"])],
            ValueRule::Themed {
                namespaces: &[],
                keywords: &[
                    ("first", "calc(-infinity)"),
                    ("last", "calc(infinity)"),
                    ("none", "0"),
                ],
                numeric: Numeric::Integer,
                arbitrary: NUMBERS,
            },
            true,
        ),
        functional(
            "opacity",
            Priority::ConstrainedFunctional,
            &[("opacity", &["opacity"])],
            ValueRule::Themed {
                namespaces: &["--opacity"],
                keywords: &[],
                numeric: Numeric::Percent,
                arbitrary: PERCENTAGES,
            },
            false,
        ),
        functional(
            "grid-template",
            Priority::ConstrainedFunctional,
            &[
                ("grid-cols", &["grid-template-columns"]),
                ("grid-rows", &["grid-template-rows"]),
            ],
            ValueRule::Themed {
                namespaces: &[],
                keywords: &[("none", "none"), ("subgrid", "subgrid")],
                numeric: Numeric::Template("repeat({}, minmax(0, 1fr))"),
                arbitrary: ANY_VALUE,
            },
            false,
        ),
        functional(
            "grid-span",
            Priority::ConstrainedFunctional,
            &[("col-span", &["grid-column"]), ("row-span", &["grid-row"])],
            ValueRule::Themed {
                namespaces: &[],
                keywords: &[("full", "1 / -1")],
                numeric: Numeric::Template("span {} / span {}"),
                arbitrary: ANY_VALUE,
            },
            false,
        ),
        functional(
            "flex",
            Priority::ConstrainedFunctional,
            &[("flex", &["flex"])],
            ValueRule::Themed {
                namespaces: &[],
                keywords: &[],
                numeric: Numeric::Integer,
                arbitrary: ANY_VALUE,
            },
            false,
        ),
        functional(
            "transition-duration",
            Priority::ConstrainedFunctional,
            &[("duration", &["transition-duration"])],
            ValueRule::Themed {
                namespaces: &[],
                keywords: &[("initial", "initial")],
                numeric: Numeric::Milliseconds,
                arbitrary: ANY_VALUE,
            },
            false,
        ),
        functional(
            "margin",
            Priority::NegativeVariant,
            &[
                ("m", &["margin"]),
                ("mx", &["margin-inline"]),
                ("my", &["margin-block"]),
                ("ms", &["margin-inline-start"]),
                ("me", &["margin-inline-end"]),
                ("mt", &["margin-top"]),
                ("mr", &["margin-right"]),
                ("mb", &["margin-bottom"]),
                ("ml", &["margin-left"]),
            ],
            ValueRule::Spacing {
                keywords: MARGIN_KEYWORDS,
            },
            true,
        ),
        functional(
            "inset",
            Priority::NegativeVariant,
            &[
                ("inset", &["inset"]),
                ("inset-x", &["inset-inline"]),
                ("inset-y", &["inset-block"]),
                ("start", &["inset-inline-start"]),
                ("end", &["inset-inline-end"]),
                ("top", &["top"]),
                ("right", &["right"]),
                ("bottom", &["bottom"]),
                ("left", &["left"]),
            ],
            ValueRule::Size {
                namespaces: &["--inset"],
                keywords: INSET_KEYWORDS,
            },
            true,
        ),
        functional(
            "letter-spacing",
            Priority::NegativeVariant,
            &[("tracking", &["letter-spacing"])],
            ValueRule::Themed {
                namespaces: &["--tracking"],
                keywords: &[],
                numeric: Numeric::None,
                arbitrary: LENGTHS,
            },
            true,
        ),
        functional(
            "background-color",
            Priority::StandardFunctional,
            &[("bg", &["background-color"])],
            ValueRule::Color,
            false,
        ),
        Arc::new(FontSizeUtility),
        functional(
            "text-color",
            Priority::StandardFunctional,
            &[("text", &["color"])],
            ValueRule::Color,
            false,
        ),
        functional(
            "border-width",
            Priority::StandardFunctional,
            BORDER_WIDTH_ROOTS,
            ValueRule::Length {
                bare: "1px",
                namespaces: &["--border-width"],
            },
            false,
        ),
        functional(
            "border-color",
            Priority::StandardFunctional,
            BORDER_COLOR_ROOTS,
            ValueRule::Color,
            false,
        ),
        functional(
            "padding",
            Priority::StandardFunctional,
            &[
                ("p", &["padding"]),
                ("px", &["padding-inline"]),
                ("py", &["padding-block"]),
                ("ps", &["padding-inline-start"]),
                ("pe", &["padding-inline-end"]),
                ("pt", &["padding-top"]),
                ("pr", &["padding-right"]),
                ("pb", &["padding-bottom"]),
                ("pl", &["padding-left"]),
            ],
            ValueRule::Spacing { keywords: &[] },
            false,
        ),
        functional(
            "gap",
            Priority::StandardFunctional,
            &[
                ("gap", &["gap"]),
                ("gap-x", &["column-gap"]),
                ("gap-y", &["row-gap"]),
            ],
            ValueRule::Spacing { keywords: &[] },
            false,
        ),
        functional(
            "width",
            Priority::StandardFunctional,
            &[
                ("w", &["width"]),
                ("min-w", &["min-width"]),
                ("max-w", &["max-width"]),
            ],
            ValueRule::Size {
                namespaces: &["--width", "--container"],
                keywords: WIDTH_KEYWORDS,
            },
            false,
        ),
        functional(
            "height",
            Priority::StandardFunctional,
            &[
                ("h", &["height"]),
                ("min-h", &["min-height"]),
                ("max-h", &["max-height"]),
            ],
            ValueRule::Size {
                namespaces: &["--height"],
                keywords: HEIGHT_KEYWORDS,
            },
            false,
        ),
        functional(
            "size",
            Priority::StandardFunctional,
            &[("size", &["width", "height"])],
            ValueRule::Size {
                namespaces: &["--size"],
                keywords: SIZE_KEYWORDS,
            },
            false,
        ),
        functional(
            "flex-basis",
            Priority::StandardFunctional,
            &[("basis", &["flex-basis"])],
            ValueRule::Size {
                namespaces: &["--container"],
                keywords: SIZE_KEYWORDS,
            },
            false,
        ),
        functional(
            "border-radius",
            Priority::StandardFunctional,
            &[
                ("rounded", &["border-radius"]),
                (
                    "rounded-t",
                    &["border-top-left-radius", "border-top-right-radius"],
                ),
                (
                    "rounded-r",
                    &["border-top-right-radius", "border-bottom-right-radius"],
                ),
                (
                    "rounded-b",
                    &["border-bottom-right-radius", "border-bottom-left-radius"],
                ),
                (
                    "rounded-l",
                    &["border-top-left-radius", "border-bottom-left-radius"],
                ),
                ("rounded-tl", &["border-top-left-radius"]),
                ("rounded-tr", &["border-top-right-radius"]),
                ("rounded-br", &["border-bottom-right-radius"]),
                ("rounded-bl", &["border-bottom-left-radius"]),
            ],
            ValueRule::Radius,
            false,
        ),
        functional(
            "font-weight",
            Priority::StandardFunctional,
            &[("font", &["font-weight"])],
            ValueRule::Themed {
                namespaces: &["--font-weight"],
                keywords: FONT_WEIGHTS,
                numeric: Numeric::Integer,
                arbitrary: NUMBERS,
            },
            false,
        ),
        functional(
            "font-family",
            Priority::StandardFunctional,
            &[("font", &["font-family"])],
            ValueRule::Themed {
                namespaces: &["--font"],
                keywords: &[],
                numeric: Numeric::None,
                arbitrary: &[ArbitraryType::Other, ArbitraryType::Var],
            },
            false,
        ),
        functional(
            "line-height",
            Priority::StandardFunctional,
            &[("leading", &["line-height"])],
            ValueRule::Themed {
                namespaces: &["--leading"],
                keywords: &[("none", "1")],
                numeric: Numeric::Spacing,
                arbitrary: LENGTHS,
            },
            false,
        ),
        functional(
            "svg-paint",
            Priority::StandardFunctional,
            &[
                ("fill", &["fill"]),
                ("stroke", &["stroke"]),
                ("accent", &["accent-color"]),
                ("caret", &["caret-color"]),
                ("outline", &["outline-color"]),
                ("decoration", &["text-decoration-color"]),
            ],
            ValueRule::Color,
            false,
        ),
        Arc::new(ArbitraryPropertyUtility),
    ]
}

const BORDER_WIDTH_ROOTS: Roots = &[
    ("border", &["border-width"]),
    ("border-x", &["border-inline-width"]),
    ("border-y", &["border-block-width"]),
    ("border-t", &["border-top-width"]),
    ("border-r", &["border-right-width"]),
    ("border-b", &["border-bottom-width"]),
    ("border-l", &["border-left-width"]),
];

const BORDER_COLOR_ROOTS: Roots = &[
    ("border", &["border-color"]),
    ("border-x", &["border-inline-color"]),
    ("border-y", &["border-block-color"]),
    ("border-t", &["border-top-color"]),
    ("border-r", &["border-right-color"]),
    ("border-b", &["border-bottom-color"]),
    ("border-l", &["border-left-color"]),
];

/// Parses `"prop:value;prop:value"` into declarations.
fn declarations(list: &str) -> Vec<AstNode> {
    list.split(';')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(property, value)| AstNode::decl(property.trim(), value.trim()))
        .collect()
}

pub struct StaticUtilities;

impl UtilityHandler for StaticUtilities {
    fn name(&self) -> &str {
        "static"
    }

    fn priority(&self) -> Priority {
        Priority::ExactStatic
    }

    fn static_roots(&self) -> Vec<String> {
        STATIC_UTILITIES
            .iter()
            .map(|(class, _)| class.to_string())
            .collect()
    }

    fn compile(&self, candidate: &Candidate, _theme: &Theme) -> Option<Vec<AstNode>> {
        let CandidateKind::Static { root } = &candidate.kind else {
            return None;
        };
        STATIC_UTILITIES
            .iter()
            .find(|(class, _)| class == root)
            .map(|(_, list)| declarations(list))
    }
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    None,
    Integer,
    /// `opacity-50` -> `50%`.
    Percent,
    Milliseconds,
    /// `leading-6` -> `calc(var(--spacing) * 6)`.
    Spacing,
    /// `{}` is replaced by the integer.
    Template(&'static str),
}

#[derive(Debug, Clone, Copy)]
enum ValueRule {
    Color,
    Spacing {
        keywords: Keywords,
    },
    Size {
        namespaces: &'static [&'static str],
        keywords: Keywords,
    },
    /// Bare root means `bare`; integers are pixels.
    Length {
        bare: &'static str,
        namespaces: &'static [&'static str],
    },
    /// Bare root reads the `--radius` key.
    Radius,
    Themed {
        namespaces: &'static [&'static str],
        keywords: Keywords,
        numeric: Numeric,
        arbitrary: &'static [ArbitraryType],
    },
}

/// A `root-value` utility configured by a [`ValueRule`].
pub struct FunctionalUtility {
    name: &'static str,
    priority: Priority,
    roots: Roots,
    rule: ValueRule,
    negative: bool,
    internal_prefix: String,
}

impl FunctionalUtility {
    fn properties(&self, root: &str) -> Option<&'static [&'static str]> {
        self.roots
            .iter()
            .find(|(name, _)| *name == root)
            .map(|(_, properties)| *properties)
    }

    fn bare_value(&self, theme: &Theme) -> Option<String> {
        match self.rule {
            ValueRule::Length { bare, .. } => Some(bare.to_string()),
            ValueRule::Radius => Some(
                theme
                    .resolve(None, &["--radius"])
                    .unwrap_or_else(|| "0.25rem".to_string()),
            ),
            _ => None,
        }
    }

    fn value(&self, value: &CandidateValue, theme: &Theme, negative: bool) -> Option<String> {
        match self.rule {
            ValueRule::Color => None,
            ValueRule::Spacing { keywords } => match value {
                CandidateValue::Named { value: name, .. } => {
                    match keywords.iter().find(|(key, _)| key == name) {
                        Some((_, keyword)) => (!negative).then(|| keyword.to_string()),
                        None => resolve_spacing(value, theme, negative),
                    }
                }
                CandidateValue::Arbitrary { .. } => resolve_spacing(value, theme, negative),
            },
            ValueRule::Size {
                namespaces,
                keywords,
            } => resolve_size(value, theme, namespaces, keywords, negative),
            ValueRule::Length { namespaces, .. } => match value {
                CandidateValue::Named { value: name, .. } => theme
                    .resolve(Some(name), namespaces)
                    .or_else(|| is_integer(name).then(|| format!("{}px", name))),
                CandidateValue::Arbitrary { value: raw, .. } => {
                    accepts(value, &[ArbitraryType::Length, ArbitraryType::Number])
                        .then(|| raw.clone())
                }
            },
            ValueRule::Radius => match value {
                CandidateValue::Named { value: name, .. } => RADIUS_KEYWORDS
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, keyword)| keyword.to_string())
                    .or_else(|| theme.resolve(Some(name), &["--radius"])),
                CandidateValue::Arbitrary { value: raw, .. } => {
                    accepts(value, LENGTHS).then(|| raw.clone())
                }
            },
            ValueRule::Themed {
                namespaces,
                keywords,
                numeric,
                arbitrary,
            } => {
                let resolved = match value {
                    CandidateValue::Named { value: name, .. } => keywords
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, keyword)| keyword.to_string())
                        .or_else(|| theme.resolve(Some(name), namespaces))
                        .or_else(|| apply_numeric(numeric, name, theme))?,
                    CandidateValue::Arbitrary { value: raw, .. } => {
                        accepts(value, arbitrary).then(|| raw.clone())?
                    }
                };
                Some(if negative { negate(&resolved) } else { resolved })
            }
        }
    }
}

fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

fn apply_numeric(numeric: Numeric, value: &str, theme: &Theme) -> Option<String> {
    match numeric {
        Numeric::None => None,
        Numeric::Integer => is_integer(value).then(|| value.to_string()),
        Numeric::Percent => is_scale_number(value).then(|| format!("{}%", value)),
        Numeric::Milliseconds => is_integer(value).then(|| format!("{}ms", value)),
        Numeric::Spacing => (is_scale_number(value) && theme.contains("--spacing"))
            .then(|| format!("calc({} * {})", theme.var_ref("--spacing"), value)),
        Numeric::Template(template) => {
            (is_integer(value) && value != "0").then(|| template.replace("{}", value))
        }
    }
}

impl UtilityHandler for FunctionalUtility {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn functional_roots(&self) -> Vec<String> {
        self.roots.iter().map(|(root, _)| root.to_string()).collect()
    }

    fn compile(&self, candidate: &Candidate, theme: &Theme) -> Option<Vec<AstNode>> {
        let properties = self.properties(candidate.root()?)?;
        if candidate.negative && !self.negative {
            return None;
        }

        let Some(value) = candidate.value() else {
            if candidate.modifier.is_some() || candidate.negative {
                return None;
            }
            let bare = self.bare_value(theme)?;
            return Some(
                properties
                    .iter()
                    .map(|property| AstNode::decl(*property, bare.as_str()))
                    .collect(),
            );
        };

        if let ValueRule::Color = self.rule {
            let color = resolve_color(&value, theme)?;
            let root = candidate.root()?;
            return color_declarations(
                properties,
                &color,
                candidate.modifier.as_ref(),
                root,
                &self.internal_prefix,
            );
        }

        // Outside colors a modifier is only meaningful as a fraction.
        let fraction_allowed = matches!(self.rule, ValueRule::Size { .. });
        if candidate.modifier.is_some() && !(fraction_allowed && value.fraction().is_some()) {
            return None;
        }

        let resolved = self.value(&value, theme, candidate.negative)?;
        Some(
            properties
                .iter()
                .map(|property| AstNode::decl(*property, resolved.as_str()))
                .collect(),
        )
    }
}

/// `text-sm`, `text-sm/6`, `text-[1.5rem]`. Sets `line-height` from the
/// modifier or from the theme's paired `--text-*--line-height` key.
pub struct FontSizeUtility;

impl FontSizeUtility {
    fn line_height(modifier: &Modifier, theme: &Theme) -> Option<String> {
        match modifier {
            Modifier::Named(name) => theme.resolve(Some(name), &["--leading"]).or_else(|| {
                (is_scale_number(name) && theme.contains("--spacing"))
                    .then(|| format!("calc({} * {})", theme.var_ref("--spacing"), name))
            }),
            Modifier::Arbitrary(raw) => Some(raw.clone()),
        }
    }
}

impl UtilityHandler for FontSizeUtility {
    fn name(&self) -> &str {
        "font-size"
    }

    fn priority(&self) -> Priority {
        Priority::StandardFunctional
    }

    fn functional_roots(&self) -> Vec<String> {
        vec!["text".to_string()]
    }

    fn compile(&self, candidate: &Candidate, theme: &Theme) -> Option<Vec<AstNode>> {
        if candidate.negative {
            return None;
        }
        let value = candidate.value()?;

        let (size, paired_line_height) = match &value {
            CandidateValue::Named { value: name, .. } => (
                theme.resolve(Some(name), &["--text"])?,
                theme.resolve(Some(&format!("{}--line-height", name)), &["--text"]),
            ),
            CandidateValue::Arbitrary { value: raw, .. } => {
                if !accepts(&value, &[ArbitraryType::Length, ArbitraryType::Percentage]) {
                    return None;
                }
                (raw.clone(), None)
            }
        };

        let line_height = match &candidate.modifier {
            Some(modifier) => Some(Self::line_height(modifier, theme)?),
            None => paired_line_height,
        };

        let mut nodes = vec![AstNode::decl("font-size", size)];
        if let Some(line_height) = line_height {
            nodes.push(AstNode::decl("line-height", line_height));
        }
        Some(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::default_handlers;
    use crate::ast::AstNode;
    use crate::theme::Theme;
    use crate::utilities::UtilityRegistry;

    fn registry() -> UtilityRegistry {
        let mut registry = UtilityRegistry::new();
        for handler in default_handlers("monorail") {
            registry.register(handler).expect("default handlers register");
        }
        registry
    }

    fn theme() -> Theme {
        Theme::with_defaults()
            .add("--color-red-500", "#ef4444")
            .add("--text-sm", "0.875rem")
            .add("--text-sm--line-height", "1.25rem")
            .add("--radius-lg", "0.5rem")
    }

    fn compile(class: &str) -> Vec<(String, String)> {
        registry()
            .resolve(class, &theme())
            .map(|resolved| {
                resolved
                    .nodes
                    .into_iter()
                    .filter_map(|node| match node {
                        AstNode::Declaration(d) => Some((d.property, d.value)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn pair(property: &str, value: &str) -> (String, String) {
        (property.to_string(), value.to_string())
    }

    #[test]
    fn static_utilities_parse_declaration_strings() {
        assert_eq!(compile("flex"), vec![pair("display", "flex")]);
        assert_eq!(
            compile("truncate"),
            vec![
                pair("overflow", "hidden"),
                pair("text-overflow", "ellipsis"),
                pair("white-space", "nowrap"),
            ]
        );
    }

    #[test]
    fn arbitrary_hex_background() {
        assert_eq!(
            compile("bg-[#123]"),
            vec![
                pair("--monorail-bg-opacity", "1"),
                pair("background-color", "rgba(17,34,51,var(--monorail-bg-opacity))"),
            ]
        );
    }

    #[test]
    fn text_root_is_shared_by_size_and_color() {
        assert_eq!(
            compile("text-sm"),
            vec![
                pair("font-size", "var(--text-sm)"),
                pair("line-height", "var(--text-sm--line-height)"),
            ]
        );
        assert_eq!(
            compile("text-sm/6"),
            vec![
                pair("font-size", "var(--text-sm)"),
                pair("line-height", "calc(var(--spacing) * 6)"),
            ]
        );
        assert_eq!(compile("text-red-500"), vec![pair("color", "var(--color-red-500)")]);
        assert_eq!(compile("text-[14px]"), vec![pair("font-size", "14px")]);
        assert_eq!(
            compile("text-red-500/50"),
            vec![pair(
                "color",
                "color-mix(in oklab, var(--color-red-500) 50%, transparent)"
            )]
        );
    }

    #[test]
    fn border_width_then_color() {
        assert_eq!(compile("border"), vec![pair("border-width", "1px")]);
        assert_eq!(compile("border-2"), vec![pair("border-width", "2px")]);
        assert_eq!(compile("border-x-4"), vec![pair("border-inline-width", "4px")]);
        assert_eq!(
            compile("border-red-500"),
            vec![pair("border-color", "var(--color-red-500)")]
        );
    }

    #[test]
    fn spacing_and_negatives() {
        assert_eq!(compile("p-4"), vec![pair("padding", "calc(var(--spacing) * 4)")]);
        assert_eq!(
            compile("-mt-2"),
            vec![pair("margin-top", "calc(var(--spacing) * -2)")]
        );
        assert_eq!(compile("mx-auto"), vec![pair("margin-inline", "auto")]);
        assert!(compile("-p-4").is_empty());
        assert!(compile("-mx-auto").is_empty());
    }

    #[test]
    fn sizing() {
        assert_eq!(compile("w-1/2"), vec![pair("width", "50%")]);
        assert_eq!(compile("h-screen"), vec![pair("height", "100vh")]);
        assert_eq!(compile("max-w-md"), vec![pair("max-width", "var(--container-md)")]);
        assert_eq!(
            compile("size-8"),
            vec![
                pair("width", "calc(var(--spacing) * 8)"),
                pair("height", "calc(var(--spacing) * 8)"),
            ]
        );
        assert_eq!(compile("-top-1/2"), vec![pair("top", "calc(50% * -1)")]);
        assert!(compile("p-1/2").is_empty());
    }

    #[test]
    fn constrained_values() {
        assert_eq!(compile("z-10"), vec![pair("z-index", "10")]);
        assert_eq!(compile("-z-10"), vec![pair("z-index", "-10")]);
        assert_eq!(compile("opacity-50"), vec![pair("opacity", "50%")]);
        assert_eq!(
            compile("grid-cols-3"),
            vec![pair("grid-template-columns", "repeat(3, minmax(0, 1fr))")]
        );
        assert_eq!(
            compile("grid-cols-[1fr_2fr]"),
            vec![pair("grid-template-columns", "1fr 2fr")]
        );
        assert_eq!(compile("col-span-full"), vec![pair("grid-column", "1 / -1")]);
        assert_eq!(compile("duration-150"), vec![pair("transition-duration", "150ms")]);
    }

    #[test]
    fn radius_and_fonts() {
        assert_eq!(compile("rounded"), vec![pair("border-radius", "0.25rem")]);
        assert_eq!(compile("rounded-lg"), vec![pair("border-radius", "var(--radius-lg)")]);
        assert_eq!(
            compile("rounded-t-none"),
            vec![
                pair("border-top-left-radius", "0"),
                pair("border-top-right-radius", "0"),
            ]
        );
        assert_eq!(compile("font-bold"), vec![pair("font-weight", "700")]);
        assert_eq!(compile("font-[Inter]"), vec![pair("font-family", "Inter")]);
        assert_eq!(compile("leading-none"), vec![pair("line-height", "1")]);
    }

    #[test]
    fn unknown_values_are_not_handled() {
        for class in ["bg-nope", "text-huge", "w-[#fff]", "grid-cols-0", "not-a-real-utility"] {
            assert!(compile(class).is_empty(), "{class}");
        }
    }
}
