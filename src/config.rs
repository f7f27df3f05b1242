//! `monorail.toml` project configuration.
//!
//! ```toml
//! prefix = "mr"
//! dark_mode = "media"
//! sources = ["styles/theme.css"]
//!
//! [theme.colors.brand]
//! 500 = "#3b82f6"
//!
//! [palettes]
//! primary = "brand"
//!
//! [applies]
//! ".btn" = ["px-4", "py-2", "hover:underline"]
//! ```

use crate::error::{Error, Result};
use crate::framework::{FrameworkSettings, ThemeEmission};
use crate::segment::DEFAULT_SEPARATOR;
use crate::theme::source::{ThemeSource, parse_source};
use crate::variants::DarkMode;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Prefix for theme variable names (`--mr-color-red-500`).
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub important: bool,
    /// `"media"`, `"class"` or a marker selector such as `"[data-theme=dark]"`.
    #[serde(default)]
    pub dark_mode: Option<String>,
    #[serde(default)]
    pub theme_emission: ThemeEmission,
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Alias palette name to source palette name.
    #[serde(default)]
    pub palettes: IndexMap<String, String>,
    #[serde(default)]
    pub applies: IndexMap<String, Vec<String>>,
    /// Extra CSS fragments, relative to the config file.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    /// `"default"` starts from the bundled defaults; `"empty"` from nothing.
    #[serde(default = "default_theme_name")]
    pub name: String,
    #[serde(default)]
    pub colors: IndexMap<String, IndexMap<String, String>>,
    #[serde(default)]
    pub variables: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: None,
            separator: default_separator(),
            minify: false,
            important: false,
            dark_mode: None,
            theme_emission: ThemeEmission::default(),
            theme: ThemeConfig::default(),
            palettes: IndexMap::new(),
            applies: IndexMap::new(),
            sources: Vec::new(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: default_theme_name(),
            colors: IndexMap::new(),
            variables: IndexMap::new(),
        }
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text).map_err(|message| Error::Config {
        path: path.to_path_buf(),
        message,
    })
}

fn parse(text: &str) -> std::result::Result<Config, String> {
    toml::from_str(text).map_err(|err| err.to_string())
}

impl Config {
    /// Builds framework settings. `base_dir` resolves relative `sources`;
    /// fragments apply after the config's own theme entries, in listed order.
    pub fn settings(&self, base_dir: &Path) -> Result<FrameworkSettings> {
        let mut settings = FrameworkSettings {
            separator: self.separator,
            minify: self.minify,
            important: self.important,
            theme_emission: self.theme_emission,
            ..FrameworkSettings::default()
        };

        settings.theme = match self.theme.name.as_str() {
            "default" => settings.theme,
            "empty" => crate::theme::Theme::new(),
            other => {
                return Err(Error::Config {
                    path: base_dir.to_path_buf(),
                    message: format!("unknown base theme '{}'", other),
                });
            }
        };
        if let Some(prefix) = &self.prefix {
            settings.theme = settings.theme.with_prefix(prefix);
        }
        if let Some(mode) = &self.dark_mode {
            settings.dark_mode = match mode.trim() {
                "media" => DarkMode::Media,
                "class" => DarkMode::default(),
                selector => DarkMode::Class(selector.to_string()),
            };
        }

        for (name, shades) in &self.theme.colors {
            let shades: Vec<(&String, &String)> = shades.iter().collect();
            settings.theme = settings.theme.add_color_palette(name, &shades);
        }
        settings.theme = settings.theme.add_many(&self.theme.variables);
        for (alias, source) in &self.palettes {
            settings.theme = settings.theme.map_color_palette(source, alias);
        }
        settings.applies = self.applies.clone();

        let mut fragments = ThemeSource::default();
        for relative in &self.sources {
            let path = base_dir.join(relative);
            let text = fs::read_to_string(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            fragments.extend(parse_source(&text));
        }
        Ok(settings.with_source(fragments))
    }
}

fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

fn default_theme_name() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Config, load, parse};
    use crate::error::Error;
    use crate::framework::ThemeEmission;
    use crate::variants::DarkMode;
    use std::fs;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn loads_toml_config() {
        let path = temp_path("monorail_config");
        fs::write(&path, "minify = true\ntheme = { name = \"empty\" }").expect("write config");
        let config = load(&path).expect("config should parse");
        assert!(config.minify);
        assert_eq!(config.theme.name, "empty");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn defaults_when_empty() {
        let config = parse("").expect("config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.separator, ':');
        assert_eq!(config.theme_emission, ThemeEmission::Used);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let path = temp_path("monorail_config_unknown");
        fs::write(&path, "minfy = true").expect("write config");
        match load(&path) {
            Err(Error::Config { message, .. }) => assert!(message.contains("minfy")),
            other => panic!("expected config error, got {:?}", other),
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load(Path::new("/definitely/not/here/monorail.toml"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn theme_colors_palettes_and_variables() {
        let config = parse(
            r##"
prefix = "mr"
dark_mode = "media"
theme_emission = "all"

[theme.colors.gray]
100 = "#f3f4f6"
500 = "#6b7280"

[theme.variables]
"--spacing" = "0.5rem"

[palettes]
neutral = "gray"

[applies]
".btn" = ["p-2", "hover:underline"]
"##,
        )
        .expect("config should parse");
        assert_eq!(config.theme.colors["gray"]["500"], "#6b7280");

        let settings = config.settings(Path::new(".")).expect("settings");
        assert_eq!(settings.dark_mode, DarkMode::Media);
        assert_eq!(settings.theme_emission, ThemeEmission::All);
        assert_eq!(settings.theme.prefix(), Some("mr"));
        assert_eq!(settings.theme.get("--spacing"), Some("0.5rem"));
        assert_eq!(settings.theme.get("--color-gray-100"), Some("#f3f4f6"));
        assert_eq!(
            settings.theme.get("--color-neutral-500"),
            Some("var(--mr-color-gray-500)")
        );
        assert_eq!(settings.applies[".btn"], vec!["p-2", "hover:underline"]);
    }

    #[test]
    fn dark_mode_accepts_a_custom_selector() {
        let config = parse(r#"dark_mode = "[data-theme=dark]""#).expect("config should parse");
        let settings = config.settings(Path::new(".")).expect("settings");
        assert_eq!(
            settings.dark_mode,
            DarkMode::Class("[data-theme=dark]".to_string())
        );
    }

    #[test]
    fn unknown_base_theme_is_rejected() {
        let config = parse("theme = { name = \"neon\" }").expect("config should parse");
        assert!(matches!(
            config.settings(Path::new(".")),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn sources_are_read_relative_to_the_config() {
        let dir = temp_path("monorail_config_sources");
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(
            dir.join("theme.css"),
            "@theme { --color-brand: #123456; }\n@utility tab-* { tab-size: --value(integer); }",
        )
        .expect("write fragment");

        let config = parse(r#"sources = ["theme.css"]"#).expect("config should parse");
        let settings = config.settings(&dir).expect("settings");
        assert_eq!(settings.theme.get("--color-brand"), Some("#123456"));
        assert_eq!(settings.custom_utilities.len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    fn temp_path(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}.toml", prefix, nanos))
    }
}
