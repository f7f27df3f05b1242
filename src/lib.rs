//! `monorail` compiles utility class strings (`md:hover:bg-red-500/50`) into
//! CSS against a theme of design tokens.
//!
//! ```
//! use monorail::{CssFramework, FrameworkSettings};
//!
//! let framework = CssFramework::new(FrameworkSettings::default()).unwrap();
//! let css = framework.process(&["flex", "md:hidden"]);
//! assert!(css.contains(".flex { display:flex; }"));
//! ```
//!
//! The library holds no global state apart from the compiled-pattern cache
//! for `@utility` definitions. The `monorail` binary adds file scanning and
//! configuration loading on top.

pub mod ast;
pub mod candidate;
pub mod config;
pub mod css_text;
pub mod custom;
pub mod error;
pub mod framework;
pub mod logging;
pub mod scanner;
pub mod segment;
pub mod theme;
pub mod utilities;
pub mod variants;

pub use ast::{AstNode, Declaration, MergeStrategy, merge_declarations};
pub use candidate::{Candidate, CandidateValue};
pub use custom::UtilityDefinition;
pub use error::{Error, Result};
pub use framework::{CompiledRule, CssFramework, FrameworkSettings, ThemeEmission};
pub use segment::{VariantToken, tokenize};
pub use theme::Theme;
pub use theme::source::{ThemeSource, parse_source};
pub use variants::DarkMode;

use clap::{Args, Parser, Subcommand};
use logging::{LogConfig, init_logging};
use scanner::{ScanOptions, scan_globs};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "monorail.toml";

#[derive(Debug, Parser)]
#[command(
    name = "monorail",
    version,
    about = "Compile utility classes found in your sources into CSS"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the candidate classes found in files matching the globs.
    Scan(ScanArgs),
    /// Compile the classes found in files matching the globs into CSS.
    Build(BuildArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Glob patterns, relative to the current directory.
    #[arg(value_name = "GLOB", required = true)]
    pub inputs: Vec<String>,

    /// Glob patterns to leave out.
    #[arg(short = 'I', long = "ignore", value_name = "GLOB")]
    pub ignore: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// CSS with `@theme`, `@utility` and `@apply` blocks.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Project configuration; `monorail.toml` is used when present.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output file; stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub minify: bool,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LogConfig::from_verbosity(cli.verbose));
    run(cli.command)
}

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan(args) => run_scan(args),
        Command::Build(args) => run_build(args),
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let mut result = scan_globs(&args.inputs, &args.ignore, &ScanOptions::default())?;
    result.classes.sort();

    for class in &result.classes {
        println!("{}", class);
    }
    info!(
        files = result.files_scanned,
        classes = result.classes.len(),
        "scan finished"
    );
    Ok(())
}

fn run_build(args: BuildArgs) -> Result<()> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(path) = &args.input {
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        settings = settings.with_source(parse_source(&text));
    }
    settings.minify |= args.minify;

    let framework = CssFramework::new(settings)?;

    let mut ignore = args.scan.ignore.clone();
    if let Some(output) = &args.output {
        ignore.push(output.to_string_lossy().into_owned());
    }
    let result = scan_globs(&args.scan.inputs, &ignore, &ScanOptions::default())?;
    let css = framework.process(&result.classes);

    match &args.output {
        Some(path) => fs::write(path, &css).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?,
        None => print!("{}", css),
    }
    info!(
        files = result.files_scanned,
        classes = result.classes.len(),
        bytes = css.len(),
        "build finished"
    );
    Ok(())
}

/// An explicit path must exist; the default `monorail.toml` is optional.
fn load_settings(explicit: Option<&Path>) -> Result<FrameworkSettings> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(FrameworkSettings::default());
            }
            default
        }
    };
    let config = config::load(&path)?;
    let base_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    info!(path = %path.display(), "loaded config");
    config.settings(base_dir)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "monorail",
            "-vv",
            "build",
            "src/**/*.html",
            "-I",
            "dist/**",
            "-i",
            "app.css",
            "-o",
            "out.css",
            "--minify",
        ])
        .expect("arguments parse");
        assert_eq!(cli.verbose, 2);
        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.scan.inputs, vec!["src/**/*.html"]);
        assert_eq!(args.scan.ignore, vec!["dist/**"]);
        assert_eq!(args.input.as_deref(), Some(std::path::Path::new("app.css")));
        assert!(args.minify);
        assert!(args.config.is_none());
    }

    #[test]
    fn scan_requires_a_glob() {
        assert!(Cli::try_parse_from(["monorail", "scan"]).is_err());
    }
}
