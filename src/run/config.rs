//! Migration configuration parser
//!
//! Parses the optional `robomigrate.toml` into structured settings. Every
//! field has a default, so an empty file (or no file) is a valid config.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::robocopy::cli::{CommandOptions, DEFAULT_EXECUTABLE};

/// Settings for the wrapped copy tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Program to run, resolved through `PATH` unless it is a path
    #[serde(default = "default_executable")]
    pub executable: String,
}

fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
        }
    }
}

impl ToolConfig {
    /// Command-builder options for this tool
    #[must_use]
    pub fn command_options(&self) -> CommandOptions {
        CommandOptions {
            executable: self.executable.clone(),
        }
    }
}

/// Settings for the run report written into the destination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    /// File name prefix, followed by `_<YYYYMMDD_HHMMSS>.txt`
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// First line of the report
    #[serde(default = "default_header")]
    pub header: String,
    /// Last line of the report
    #[serde(default = "default_footer")]
    pub footer: String,
    /// Also write a diagnostic report when the copy fails (default: true)
    #[serde(default = "default_persist_failures")]
    pub persist_failures: bool,
}

fn default_prefix() -> String {
    "SSFCU_Migration_Log".to_string()
}

fn default_header() -> String {
    "SSFCU migration tool".to_string()
}

fn default_footer() -> String {
    "Application design by Noe Tovar-MBA 2025 For more information noetovar.com".to_string()
}

const fn default_persist_failures() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            header: default_header(),
            footer: default_footer(),
            persist_failures: default_persist_failures(),
        }
    }
}

/// Top-level configuration parsed from robomigrate.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Copy tool settings
    #[serde(default)]
    pub tool: ToolConfig,
    /// Report settings
    #[serde(default)]
    pub report: ReportConfig,
}

impl MigrationConfig {
    /// Parse a robomigrate.toml file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load a config file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse robomigrate.toml content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse robomigrate.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.tool.executable.trim().is_empty() {
            bail!("tool.executable cannot be empty");
        }

        let prefix = &self.report.prefix;
        if prefix.trim().is_empty() {
            bail!("report.prefix cannot be empty");
        }
        if prefix.contains(['/', '\\', ':', '*', '?', '"', '<', '>', '|']) {
            bail!("Invalid report.prefix '{prefix}': must be a plain file name");
        }

        if self.report.header.contains('\n') || self.report.footer.contains('\n') {
            bail!("report.header and report.footer must be single lines");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
[tool]
executable = "C:\\Windows\\System32\\Robocopy.exe"

[report]
prefix = "Branch_Migration"
header = "Branch migration"
footer = "IT Operations"
persist_failures = false
"#;

    #[test]
    fn test_parse_full_config() {
        let config = MigrationConfig::parse(FULL_CONFIG).unwrap();

        assert_eq!(
            config.tool.executable,
            "C:\\Windows\\System32\\Robocopy.exe"
        );
        assert_eq!(config.report.prefix, "Branch_Migration");
        assert_eq!(config.report.header, "Branch migration");
        assert_eq!(config.report.footer, "IT Operations");
        assert!(!config.report.persist_failures);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = MigrationConfig::parse("").unwrap();
        assert_eq!(config, MigrationConfig::default());
        assert_eq!(config.tool.executable, "robocopy");
        assert_eq!(config.report.prefix, "SSFCU_Migration_Log");
        assert!(config.report.persist_failures);
    }

    #[test]
    fn test_parse_partial_report_section() {
        let config = MigrationConfig::parse("[report]\nprefix = \"Nightly\"\n").unwrap();
        assert_eq!(config.report.prefix, "Nightly");
        assert_eq!(config.report.header, "SSFCU migration tool");
    }

    #[test]
    fn test_parse_rejects_empty_executable() {
        let result = MigrationConfig::parse("[tool]\nexecutable = \"  \"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_prefix_with_separator() {
        let result = MigrationConfig::parse("[report]\nprefix = \"logs/run\"\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("plain file name"), "error: {err}");
    }

    #[test]
    fn test_parse_rejects_multiline_header() {
        let result = MigrationConfig::parse("[report]\nheader = \"a\\nb\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_invalid_toml() {
        assert!(MigrationConfig::parse("[tool").is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = MigrationConfig::load_or_default(tmp.path().join("none.toml")).unwrap();
        assert_eq!(config, MigrationConfig::default());
    }

    #[test]
    fn test_from_path_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("robomigrate.toml");
        std::fs::write(&path, FULL_CONFIG).unwrap();

        let config = MigrationConfig::from_path(&path).unwrap();
        assert_eq!(config.report.prefix, "Branch_Migration");
    }

    #[test]
    fn test_command_options_carry_executable() {
        let config = MigrationConfig::parse(FULL_CONFIG).unwrap();
        assert_eq!(
            config.tool.command_options().executable,
            "C:\\Windows\\System32\\Robocopy.exe"
        );
    }
}
