//! Finds class-string candidates in project files.
//!
//! Markup files contribute the values of `class`-like attributes; script files
//! also contribute every string and template literal. Candidates are split on
//! whitespace outside brackets, so `[&>[data-active]+span]:underline` and
//! `bg-[url('/a b.png')]` survive intact. Nothing here knows which candidates
//! compile: that is the framework's job.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use indexmap::IndexSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CLASS_ATTRIBUTES: [&str; 5] = ["class", "className", "class:list", ":class", "v-bind:class"];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanResult {
    /// Unique candidates in first-seen order.
    pub classes: Vec<String>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub base_path: PathBuf,
    pub respect_gitignore: bool,
    pub include_node_modules: bool,
    pub include_binary_files: bool,
    pub include_css_files: bool,
    pub include_lock_files: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            respect_gitignore: true,
            include_node_modules: false,
            include_binary_files: false,
            include_css_files: false,
            include_lock_files: false,
        }
    }
}

/// Walks `options.base_path`, keeping files that match one of `patterns` and
/// none of `ignore_patterns`.
pub fn scan_globs(
    patterns: &[String],
    ignore_patterns: &[String],
    options: &ScanOptions,
) -> Result<ScanResult> {
    if patterns.is_empty() {
        return Err(Error::Scan("at least one input pattern is required".to_string()));
    }

    let include = build_globset(patterns)?;
    let exclude = build_globset(ignore_patterns)?;

    let mut builder = WalkBuilder::new(&options.base_path);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore);

    let mut paths: IndexSet<PathBuf> = IndexSet::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(&options.base_path).unwrap_or(path);
        if !include.is_match(relative) && !include.is_match(path) {
            continue;
        }
        if exclude.is_match(relative) || exclude.is_match(path) {
            continue;
        }
        if should_skip_file(path, options) {
            continue;
        }
        paths.insert(path.to_path_buf());
    }

    scan_files(paths.iter().map(PathBuf::as_path))
}

/// Extracts candidates from each file in order. Files that are not valid
/// UTF-8 are skipped.
pub fn scan_files<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<ScanResult> {
    let mut classes: IndexSet<String> = IndexSet::new();
    let mut files_scanned = 0usize;

    for path in paths {
        let text = match fs::read(path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    debug!(path = %path.display(), "skipping non-UTF-8 file");
                    continue;
                }
            },
            Err(source) => {
                return Err(Error::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        files_scanned += 1;
        let ext = extension(path);
        let found = extract_classes_for(&text, ext.as_deref());
        debug!(path = %path.display(), candidates = found.len(), "scanned file");
        classes.extend(found);
    }

    Ok(ScanResult {
        classes: classes.into_iter().collect(),
        files_scanned,
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
}

fn should_skip_file(path: &Path, options: &ScanOptions) -> bool {
    if !options.include_node_modules
        && path
            .components()
            .any(|component| component.as_os_str() == "node_modules")
    {
        return true;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if !options.include_lock_files && is_lock_file(file_name) {
        return true;
    }

    match extension(path).as_deref() {
        Some(ext) if !options.include_css_files && is_css_extension(ext) => true,
        Some(ext) if !options.include_binary_files && is_binary_extension(ext) => true,
        _ => false,
    }
}

fn is_css_extension(ext: &str) -> bool {
    matches!(ext, "css" | "scss" | "sass" | "less" | "pcss")
}

fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "webp"
            | "ico"
            | "avif"
            | "mp4"
            | "webm"
            | "mp3"
            | "wav"
            | "zip"
            | "gz"
            | "pdf"
            | "woff"
            | "woff2"
            | "ttf"
            | "otf"
    )
}

fn is_lock_file(file_name: &str) -> bool {
    matches!(
        file_name,
        "package-lock.json"
            | "pnpm-lock.yaml"
            | "yarn.lock"
            | "bun.lockb"
            | "bun.lock"
            | "Cargo.lock"
            | "composer.lock"
            | "Gemfile.lock"
            | "poetry.lock"
    )
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|err| Error::Scan(format!("invalid glob pattern '{}': {}", pattern, err)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| Error::Scan(format!("failed to build glob set: {}", err)))
}

/// Candidates in `text`, read as generic source.
pub fn extract_classes(text: &str) -> Vec<String> {
    extract_classes_for(text, None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extractor {
    Markup,
    Script,
    Fallback,
}

fn extract_classes_for(text: &str, ext: Option<&str>) -> Vec<String> {
    let extractor = match ext {
        Some("html" | "htm" | "vue" | "svelte" | "astro" | "yaml" | "yml" | "json" | "toml") => {
            Extractor::Markup
        }
        Some("js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "rs") => Extractor::Script,
        _ => Extractor::Fallback,
    };

    let mut sources = extract_class_attributes(text);
    if extractor != Extractor::Markup {
        sources.extend(extract_string_literals(text));
    }

    let mut out: IndexSet<String> = IndexSet::new();
    for source in sources {
        out.extend(
            split_class_list(source.trim())
                .into_iter()
                .filter(|token| is_valid_candidate(token)),
        );
    }
    out.into_iter().collect()
}

fn extract_class_attributes(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for attribute in CLASS_ATTRIBUTES {
        for (idx, _) in text.match_indices(attribute) {
            if !is_attribute_boundary(text, idx, attribute.len()) {
                continue;
            }
            let pos = skip_whitespace(text, idx + attribute.len());
            if !text[pos..].starts_with('=') {
                continue;
            }
            let pos = skip_whitespace(text, pos + 1);
            match next_char(text, pos) {
                Some((quote @ ('"' | '\''), size)) => {
                    out.push(read_quoted(text, pos + size, quote).0);
                }
                // `className={...}`: the literals inside the expression.
                Some(('{', _)) => {
                    let end = skip_braced(text, pos + 1);
                    out.extend(extract_string_literals(&text[pos + 1..end]));
                }
                Some(_) => {
                    let end = text[pos..]
                        .find(|ch: char| ch.is_whitespace() || ch == '>')
                        .map_or(text.len(), |rel| pos + rel);
                    out.push(text[pos..end].to_string());
                }
                None => {}
            }
        }
    }
    out
}

fn extract_string_literals(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut idx = 0usize;
    while let Some((ch, size)) = next_char(text, idx) {
        match ch {
            '"' | '\'' => {
                let (value, end) = read_quoted(text, idx + size, ch);
                if !value.is_empty() {
                    out.push(value);
                }
                idx = end;
            }
            '`' => {
                let (values, end) = read_template(text, idx + size);
                out.extend(values);
                idx = end;
            }
            _ => idx += size,
        }
    }
    out
}

/// Reads up to the closing `quote`; escapes are kept verbatim.
fn read_quoted(text: &str, mut idx: usize, quote: char) -> (String, usize) {
    let mut value = String::new();
    while let Some((ch, size)) = next_char(text, idx) {
        idx += size;
        if ch == '\\' {
            if let Some((next, next_size)) = next_char(text, idx) {
                value.push('\\');
                value.push(next);
                idx += next_size;
            }
            continue;
        }
        if ch == quote {
            break;
        }
        value.push(ch);
    }
    (value, idx)
}

/// Splits a template literal at `${...}` interpolations.
fn read_template(text: &str, mut idx: usize) -> (Vec<String>, usize) {
    let mut values = Vec::new();
    let mut current = String::new();
    while let Some((ch, size)) = next_char(text, idx) {
        idx += size;
        match ch {
            '`' => break,
            '\\' => {
                if let Some((next, next_size)) = next_char(text, idx) {
                    current.push('\\');
                    current.push(next);
                    idx += next_size;
                }
            }
            '$' if text[idx..].starts_with('{') => {
                values.push(std::mem::take(&mut current));
                let close = skip_braced(text, idx + 1);
                values.extend(extract_string_literals(&text[idx + 1..close]));
                idx = (close + 1).min(text.len());
            }
            _ => current.push(ch),
        }
    }
    values.push(current);
    values.retain(|value| !value.trim().is_empty());
    (values, idx)
}

/// Index of the `}` that closes a block opened just before `idx`, or the end
/// of `text` when it never closes.
fn skip_braced(text: &str, mut idx: usize) -> usize {
    let mut depth = 1usize;
    while let Some((ch, size)) = next_char(text, idx) {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return idx;
                }
            }
            _ => {}
        }
        idx += size;
    }
    text.len()
}

/// Whitespace-separated tokens, treating `[...]` and `(...)` as opaque.
fn split_class_list(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ if ch.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_valid_candidate(token: &str) -> bool {
    if token.is_empty() || token.starts_with('.') || token.starts_with('/') {
        return false;
    }
    if token.ends_with(':') || token.ends_with('\\') {
        return false;
    }

    let mut has_letter_or_bracket = false;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let last = token.chars().count().saturating_sub(1);
    let mut prev: Option<char> = None;

    for (idx, ch) in token.chars().enumerate() {
        if !is_allowed_char(ch) {
            return false;
        }
        let before = prev.replace(ch);
        has_letter_or_bracket |= ch.is_ascii_alphabetic() || ch == '[';

        if let Some(active) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == active {
                quote = None;
            }
            continue;
        }

        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            '\'' | '"' | '>' | '&' | ',' | '+' if depth == 0 => return false,
            '\'' | '"' => quote = Some(ch),
            // `!` marks importance at either end of the base utility.
            '!' if depth == 0 && idx != 0 && idx != last && before != Some(':') => {
                return false;
            }
            _ => {}
        }
    }

    quote.is_none() && depth == 0 && has_letter_or_bracket
}

fn is_allowed_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '-' | '_'
                | '/'
                | ':'
                | '.'
                | '%'
                | '#'
                | '['
                | ']'
                | '('
                | ')'
                | '!'
                | '&'
                | '>'
                | '+'
                | '*'
                | '='
                | '@'
                | ','
                | '\''
                | '"'
                | '\\'
        )
}

fn is_attribute_boundary(text: &str, idx: usize, len: usize) -> bool {
    let before = text[..idx].chars().next_back();
    let after = text[idx + len..].chars().next();
    let is_word = |ch: char| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_';
    before.is_none_or(|ch| !is_word(ch) && ch != ':') && after.is_none_or(|ch| !is_word(ch))
}

fn skip_whitespace(text: &str, mut idx: usize) -> usize {
    while let Some((ch, size)) = next_char(text, idx) {
        if !ch.is_whitespace() {
            break;
        }
        idx += size;
    }
    idx
}

fn next_char(text: &str, idx: usize) -> Option<(char, usize)> {
    text.get(idx..)?.chars().next().map(|ch| (ch, ch.len_utf8()))
}
