use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub section: SectionConfig,
    pub parse: ParseConfig,
    pub render: RenderConfig,
}

/// Defaults for the section search; command line flags override these.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct SectionConfig {
    pub ignore_final_definitions: bool,
    /// Escape regex syntax in text tests.
    pub literal: bool,
}

/// Markdown extensions handed to pulldown-cmark.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ParseConfig {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    /// Read leading `---` YAML front matter into a `yaml` node.
    pub frontmatter: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            frontmatter: true,
        }
    }
}

/// Markers used when writing markdown back out.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub bullet: String,
    pub emphasis: String,
    pub strong: String,
    pub rule: String,
    pub fence: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bullet: "-".to_string(),
            emphasis: "*".to_string(),
            strong: "**".to_string(),
            rule: "***".to_string(),
            fence: "```".to_string(),
        }
    }
}

impl Config {
    /// The configuration compiled into the binary.
    ///
    /// `build.rs` rejects an invalid `default_config.toml`, so parsing only
    /// falls back to the `Default` impls if its keys drift from these types.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }

    /// Load config from a TOML file that must exist and be valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_strict(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_default_matches_default_impls() {
        assert_eq!(Config::compiled_default(), Config::default());
    }

    #[test]
    fn default_config_file_sets_every_field() {
        let table: toml::Table = toml::from_str(DEFAULT_CONFIG).unwrap();
        for (section, keys) in [
            ("section", &["ignore_final_definitions", "literal"][..]),
            ("parse", &["tables", "footnotes", "strikethrough", "tasklists", "frontmatter"][..]),
            ("render", &["bullet", "emphasis", "strong", "rule", "fence"][..]),
        ] {
            let fields = table[section].as_table().unwrap();
            for key in keys {
                assert!(fields.contains_key(*key), "[{section}] is missing {key}");
            }
        }
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config: Config = toml::from_str(
            "[section]\nignore_final_definitions = true\n\n[render]\nbullet = \"*\"\n",
        )
        .unwrap();
        assert!(config.section.ignore_final_definitions);
        assert!(!config.section.literal);
        assert_eq!(config.render.bullet, "*");
        assert_eq!(config.render.rule, "***");
        assert!(config.parse.footnotes);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("does/not/exist.toml"));
        assert_eq!(config, Config::compiled_default());
    }

    #[test]
    fn strict_load_reports_missing_file() {
        assert!(Config::load_strict(Path::new("does/not/exist.toml")).is_err());
    }
}
