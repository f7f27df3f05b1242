//! Shared value resolvers. Each follows the same order: exact keyword, then
//! theme lookup, then arbitrary literal. A value none of them accepts makes the
//! handler decline the candidate.

use crate::ast::AstNode;
use crate::candidate::{CandidateValue, Modifier};
use crate::theme::Theme;

const NAMED_COLORS: [&str; 24] = [
    "black", "white", "red", "green", "blue", "yellow", "orange", "purple", "pink", "gray",
    "grey", "silver", "maroon", "olive", "lime", "aqua", "teal", "navy", "fuchsia", "cyan",
    "magenta", "brown", "gold", "rebeccapurple",
];

const COLOR_FUNCTIONS: [&str; 10] = [
    "rgb(", "rgba(", "hsl(", "hsla(", "hwb(", "lab(", "lch(", "oklab(", "oklch(", "color-mix(",
];

const IMAGE_FUNCTIONS: [&str; 6] = [
    "url(",
    "image(",
    "linear-gradient(",
    "radial-gradient(",
    "conic-gradient(",
    "repeating-linear-gradient(",
];

const LENGTH_FUNCTIONS: [&str; 4] = ["calc(", "min(", "max(", "clamp("];

const LENGTH_UNITS: [&str; 18] = [
    "px", "rem", "em", "vh", "vw", "dvh", "dvw", "svh", "lvh", "vmin", "vmax", "ch", "ex", "lh",
    "cqw", "cqh", "pt", "cm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitraryType {
    Color,
    Length,
    Percentage,
    Number,
    Image,
    Var,
    Other,
}

impl ArbitraryType {
    /// Maps a `[type:value]` hint to the kind it asserts.
    pub fn from_hint(hint: &str) -> Self {
        match hint {
            "color" => ArbitraryType::Color,
            "length" | "line-width" | "absolute-size" | "relative-size" => ArbitraryType::Length,
            "percentage" => ArbitraryType::Percentage,
            "number" | "integer" => ArbitraryType::Number,
            "url" | "image" => ArbitraryType::Image,
            _ => ArbitraryType::Other,
        }
    }
}

/// Best guess at what kind of CSS value an arbitrary literal is.
pub fn infer_arbitrary_type(value: &str) -> ArbitraryType {
    let lower = value.trim().to_ascii_lowercase();
    if lower.starts_with('#')
        || COLOR_FUNCTIONS.iter().any(|f| lower.starts_with(f))
        || NAMED_COLORS.contains(&lower.as_str())
        || matches!(lower.as_str(), "transparent" | "currentcolor")
    {
        return ArbitraryType::Color;
    }
    if IMAGE_FUNCTIONS.iter().any(|f| lower.starts_with(f)) {
        return ArbitraryType::Image;
    }
    if lower.starts_with("var(") {
        return ArbitraryType::Var;
    }
    if LENGTH_FUNCTIONS.iter().any(|f| lower.starts_with(f)) {
        return ArbitraryType::Length;
    }
    if let Some(number) = lower.strip_suffix('%') {
        if number.parse::<f64>().is_ok() {
            return ArbitraryType::Percentage;
        }
    }
    if lower.parse::<f64>().is_ok() {
        return ArbitraryType::Number;
    }
    let digits_end = lower
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.' || ch == '-'))
        .unwrap_or(lower.len());
    if digits_end > 0 && LENGTH_UNITS.contains(&&lower[digits_end..]) {
        return ArbitraryType::Length;
    }
    ArbitraryType::Other
}

/// Whether a value may be used by a handler that takes `allowed` kinds.
/// Named values always pass; arbitrary values are checked by type hint, or
/// by inference when there is no hint.
pub fn accepts(value: &CandidateValue, allowed: &[ArbitraryType]) -> bool {
    match value {
        CandidateValue::Named { .. } => true,
        CandidateValue::Arbitrary { value, type_hint } => {
            let kind = match type_hint.as_deref() {
                Some("any") => return true,
                Some(hint) => ArbitraryType::from_hint(hint),
                None => infer_arbitrary_type(value),
            };
            allowed.contains(&kind)
        }
    }
}

/// `0.5` not `0.50`, `1` not `1.0`.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    format!("{}", rounded)
}

pub fn is_scale_number(value: &str) -> bool {
    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    !whole.is_empty()
        && whole.chars().all(|ch| ch.is_ascii_digit())
        && fraction.is_none_or(|f| !f.is_empty() && f.chars().all(|ch| ch.is_ascii_digit()))
}

/// Negates a resolved CSS value.
pub fn negate(value: &str) -> String {
    let literal = value.parse::<f64>().is_ok()
        || value
            .strip_suffix("px")
            .is_some_and(|number| number.parse::<f64>().is_ok());
    if literal {
        return match value.strip_prefix('-') {
            Some(positive) => positive.to_string(),
            None => format!("-{}", value),
        };
    }
    format!("calc({} * -1)", value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedColor {
    /// `transparent`, `currentColor`, `inherit`.
    Keyword(&'static str),
    /// A `var()` reference into the theme.
    Themed(String),
    Hex {
        red: u8,
        green: u8,
        blue: u8,
        alpha: Option<f64>,
    },
    Literal(String),
}

pub fn resolve_color(value: &CandidateValue, theme: &Theme) -> Option<ResolvedColor> {
    match value {
        CandidateValue::Named { value, .. } => match value.as_str() {
            "transparent" => Some(ResolvedColor::Keyword("transparent")),
            "current" => Some(ResolvedColor::Keyword("currentColor")),
            "inherit" => Some(ResolvedColor::Keyword("inherit")),
            _ => theme
                .resolve(Some(value), &["--color"])
                .map(ResolvedColor::Themed),
        },
        CandidateValue::Arbitrary { .. } => {
            if !accepts(value, &[ArbitraryType::Color, ArbitraryType::Var]) {
                return None;
            }
            let raw = value.as_str();
            Some(parse_hex(raw).unwrap_or_else(|| ResolvedColor::Literal(raw.to_string())))
        }
    }
}

fn parse_hex(raw: &str) -> Option<ResolvedColor> {
    let digits = raw.strip_prefix('#')?;
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 | 4 => digits.chars().flat_map(|ch| [ch, ch]).collect(),
        6 | 8 => digits.to_string(),
        _ => return None,
    };
    let channel = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16).ok();
    let alpha = match expanded.len() {
        8 => Some(f64::from(channel(6)?) / 255.0),
        _ => None,
    };
    Some(ResolvedColor::Hex {
        red: channel(0)?,
        green: channel(2)?,
        blue: channel(4)?,
        alpha,
    })
}

/// Opacity modifier as a CSS percentage: `/50` -> `50%`, `/[0.3]` -> `30%`.
pub fn modifier_percentage(modifier: &Modifier) -> Option<String> {
    match modifier {
        Modifier::Named(raw) => is_scale_number(raw).then(|| format!("{}%", raw)),
        Modifier::Arbitrary(raw) => {
            if raw.ends_with('%') {
                return Some(raw.clone());
            }
            if raw.starts_with("var(") {
                return Some(format!("calc({} * 100%)", raw));
            }
            let number = raw.parse::<f64>().ok()?;
            Some(format!("{}%", format_number(number * 100.0)))
        }
    }
}

fn modifier_alpha(modifier: &Modifier) -> Option<String> {
    match modifier {
        Modifier::Named(raw) => {
            let number = raw.parse::<f64>().ok().filter(|_| is_scale_number(raw))?;
            Some(format_number(number / 100.0))
        }
        Modifier::Arbitrary(raw) => match raw.strip_suffix('%') {
            Some(percent) => Some(format_number(percent.parse::<f64>().ok()? / 100.0)),
            None => raw.parse::<f64>().ok().map(format_number),
        },
    }
}

/// Declarations applying `color` to every property in `properties`.
///
/// Hex colors go through an opacity helper variable named
/// `--{internal_prefix}-{opacity_key}-opacity`; other colors with a modifier
/// are mixed with `transparent`. Returns `None` when the modifier is not a
/// valid opacity.
pub fn color_declarations(
    properties: &[&str],
    color: &ResolvedColor,
    modifier: Option<&Modifier>,
    opacity_key: &str,
    internal_prefix: &str,
) -> Option<Vec<AstNode>> {
    let mut nodes = Vec::new();

    let value = match color {
        ResolvedColor::Hex {
            red,
            green,
            blue,
            alpha,
        } => {
            let opacity_var = format!("--{}-{}-opacity", internal_prefix, opacity_key);
            let alpha = match modifier {
                Some(modifier) => modifier_alpha(modifier)?,
                None => alpha.map(format_number).unwrap_or_else(|| "1".to_string()),
            };
            nodes.push(AstNode::decl(opacity_var.as_str(), alpha));
            format!("rgba({},{},{},var({}))", red, green, blue, opacity_var)
        }
        ResolvedColor::Keyword(keyword) if *keyword != "currentColor" => keyword.to_string(),
        ResolvedColor::Keyword(keyword) => with_modifier(keyword, modifier)?,
        ResolvedColor::Themed(value) | ResolvedColor::Literal(value) => {
            with_modifier(value, modifier)?
        }
    };

    nodes.extend(
        properties
            .iter()
            .map(|property| AstNode::decl(*property, value.as_str())),
    );
    Some(nodes)
}

fn with_modifier(color: &str, modifier: Option<&Modifier>) -> Option<String> {
    match modifier {
        Some(modifier) => Some(format!(
            "color-mix(in oklab, {} {}, transparent)",
            color,
            modifier_percentage(modifier)?
        )),
        None => Some(color.to_string()),
    }
}

/// `px`, theme `--spacing-*`, `calc(var(--spacing) * n)`, or an arbitrary length.
pub fn resolve_spacing(value: &CandidateValue, theme: &Theme, negative: bool) -> Option<String> {
    let resolved = match value {
        CandidateValue::Named { value, .. } => {
            if value == "px" {
                "1px".to_string()
            } else if let Some(themed) = theme.resolve(Some(value), &["--spacing"]) {
                themed
            } else if is_scale_number(value) && theme.contains("--spacing") {
                let multiplier = if negative {
                    format!("-{}", value)
                } else {
                    value.clone()
                };
                return Some(format!(
                    "calc({} * {})",
                    theme.var_ref("--spacing"),
                    multiplier
                ));
            } else {
                return None;
            }
        }
        CandidateValue::Arbitrary { value: raw, .. } => {
            if !accepts(
                value,
                &[
                    ArbitraryType::Length,
                    ArbitraryType::Percentage,
                    ArbitraryType::Number,
                    ArbitraryType::Var,
                    ArbitraryType::Other,
                ],
            ) {
                return None;
            }
            raw.clone()
        }
    };
    Some(if negative { negate(&resolved) } else { resolved })
}

/// Sizing: fraction, keyword table, theme namespaces, spacing scale, arbitrary.
pub fn resolve_size(
    value: &CandidateValue,
    theme: &Theme,
    namespaces: &[&str],
    keywords: &[(&str, &str)],
    negative: bool,
) -> Option<String> {
    if let Some(fraction) = value.fraction() {
        let percentage = fraction_percentage(fraction)?;
        return Some(if negative {
            negate(&percentage)
        } else {
            percentage
        });
    }

    if let CandidateValue::Named { value: name, .. } = value {
        if let Some((_, keyword)) = keywords.iter().find(|(key, _)| key == name) {
            return (!negative).then(|| keyword.to_string());
        }
        if let Some(themed) = theme.resolve(Some(name), namespaces) {
            return Some(if negative { negate(&themed) } else { themed });
        }
    }

    resolve_spacing(value, theme, negative)
}

/// `1/2` -> `50%`; fractions that do not divide evenly stay exact with `calc()`.
fn fraction_percentage(fraction: &str) -> Option<String> {
    let (numerator, denominator) = fraction.split_once('/')?;
    let numerator: u32 = numerator.parse().ok()?;
    let denominator: u32 = denominator.parse().ok()?;
    if denominator == 0 {
        return None;
    }
    match numerator.checked_mul(100) {
        Some(scaled) if scaled % denominator == 0 => Some(format!("{}%", scaled / denominator)),
        _ => Some(format!("calc({}/{} * 100%)", numerator, denominator)),
    }
}
