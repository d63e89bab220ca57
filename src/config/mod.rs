//! Site configuration management for `vitrine.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section     # Configuration section definitions
//! ├── error       # ConfigError
//! ├── handle      # Global config handle
//! └── mod.rs      # Config (this file)
//! ```
//!
//! # Sections
//!
//! | Section        | Purpose                                        |
//! |----------------|------------------------------------------------|
//! | `[site]`       | Site metadata (title, locale, content type)    |
//! | `[repository]` | Content source directory and change watching   |
//! | `[preview]`    | Live preview channels and edit markers         |
//! | `[serve]`      | Development server (port, interface)           |

pub mod error;
pub mod handle;
pub mod section;

pub use error::ConfigError;
pub use handle::{cfg, init_config};
pub use section::{PreviewSection, RepositorySection, ServeSection, SiteSection};

use crate::{
    cli::{Cli, Commands},
    log,
};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing vitrine.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Site metadata (title, locale, content type)
    #[serde(default)]
    pub site: SiteSection,

    /// Content repository settings
    #[serde(default)]
    pub repository: RepositorySection,

    /// Live preview settings
    #[serde(default)]
    pub preview: PreviewSection,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            site: SiteSection::default(),
            repository: RepositorySection::default(),
            preview: PreviewSection::default(),
            serve: ServeSection::default(),
        }
    }
}

impl Config {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root
    /// is determined by the config file's parent directory.
    pub fn load(cli: &Cli) -> Result<Self> {
        let (config_path, exists) = Self::resolve_config_path(cli)?;

        if !exists {
            log!(
                "error";
                "Config file '{}' not found. Run from the site root or pass --config.",
                cli.config.display()
            );
            std::process::exit(1);
        }

        let mut config = Self::from_path(&config_path)?;
        config.config_path = config_path;
        config.finalize(cli);
        config.validate()?;

        Ok(config)
    }

    /// Resolve config file path by searching upward from cwd.
    fn resolve_config_path(cli: &Cli) -> Result<(PathBuf, bool)> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        match find_config_file(&cli.config) {
            Some(path) => Ok((path, true)),
            None => Ok((cwd.join(&cli.config), false)),
        }
    }

    /// Finalize configuration after loading.
    fn finalize(&mut self, cli: &Cli) {
        let root = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.set_root(&root);

        // Content dir is stored absolute so the watcher and repository agree
        if self.repository.content_dir.is_relative() {
            self.repository.content_dir = root.join(&self.repository.content_dir);
        }

        self.apply_command_options(cli);
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
            if !Self::prompt_continue()? {
                bail!("Aborted due to unknown config fields");
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        // Show only filename (vitrine.toml) since it's always at site root
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        eprintln!();
        log!("warning"; "unknown fields in {}:", display_path);
        log!("warning"; "ignoring:");
        for field in fields {
            eprintln!("- {}", field);
        }
        eprintln!();
    }

    /// Prompt user to continue. Returns true only if user explicitly confirms.
    fn prompt_continue() -> Result<bool> {
        use std::io::{self, Write};

        eprint!("Continue? [y/N] ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        // Default no (empty input), explicit "y" or "yes" to continue
        Ok(input == "y" || input == "yes")
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Join a path with the root directory.
    ///
    /// Shorthand for `config.get_root().join(path)`.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Serve {
                interface,
                port,
                watch,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.repository.watch, watch.as_ref());
            }
            // Query command doesn't modify config
            Commands::Query { .. } => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.site.locale.is_empty() {
            bail!(ConfigError::Validation(
                "site.locale must not be empty".into()
            ));
        }

        if crate::model::ContentSchema::for_content_type(&self.site.content_type).is_none() {
            bail!(ConfigError::Validation(format!(
                "site.content_type '{}' has no registered view model",
                self.site.content_type
            )));
        }

        if !self.repository.content_dir.exists() {
            bail!(ConfigError::Validation(format!(
                "content directory not found: {}",
                self.repository.content_dir.display()
            )));
        }

        if self.preview.enabled {
            if self.preview.message_debounce_ms == 0 || self.preview.push_debounce_ms == 0 {
                bail!(ConfigError::Validation(
                    "preview debounce windows must be nonzero".into()
                ));
            }
            if self.preview.poll_interval_ms == 0 {
                bail!(ConfigError::Validation(
                    "preview.poll_interval_ms must be nonzero".into()
                ));
            }
            if !(200..=600).contains(&self.preview.push_debounce_ms) {
                log!(
                    "warning";
                    "preview.push_debounce_ms {} is outside the usual 200-600ms band",
                    self.preview.push_debounce_ms
                );
            }
        }

        Ok(())
    }
}

/// Find config file by searching upward from current directory.
fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config with a minimal `[site]` section.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> Config {
    let config = format!("[site]\ntitle = \"Test\"\n{extra}");
    let (parsed, ignored) = Config::parse_with_ignored(&config).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_toml_rejected() {
        // Invalid TOML syntax - unclosed bracket
        assert!(Config::parse_with_ignored("[site\ntitle = \"My Site\"").is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.config_path, PathBuf::new());
        assert_eq!(config.get_root(), Path::new(""));
        assert_eq!(config.site.locale, "en-us");
        assert_eq!(config.site.content_type, "homepage");
        assert_eq!(config.repository.content_dir, PathBuf::from("content"));
        assert!(config.repository.watch);
        assert!(config.preview.enabled);
        assert_eq!(config.preview.message_debounce_ms, 400);
        assert_eq!(config.preview.push_debounce_ms, 300);
        assert_eq!(config.preview.poll_interval_ms, 5000);
        assert_eq!(config.serve.port, 4600);
        assert_eq!(config.serve.bridge_port(), 4601);
    }

    #[test]
    fn test_sections_parse() {
        let config = test_parse_config(
            "locale = \"de-de\"\ncontent_type = \"login\"\n\
             [preview]\npush_debounce_ms = 250\n\n[serve]\nport = 9000",
        );

        assert_eq!(config.site.locale, "de-de");
        assert_eq!(config.site.content_type, "login");
        assert_eq!(config.preview.push_debounce_ms, 250);
        // Untouched fields keep their defaults
        assert_eq!(config.preview.message_debounce_ms, 400);
        assert_eq!(config.serve.port, 9000);
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[site]\ntitle = \"Test\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = Config::parse_with_ignored(content).unwrap();

        // Config should parse successfully
        assert_eq!(config.site.title, "Test");

        // Unknown fields should be collected
        assert!(!ignored.is_empty());
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let content = "[site]\ntitle = \"Test\"\nlocale = \"en-us\"";
        let (_, ignored) = Config::parse_with_ignored(content).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_validate_rejects_unknown_content_type() {
        let mut config = Config::default();
        config.site.content_type = "blog".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_windows() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.repository.content_dir = temp.path().to_path_buf();
        config.preview.message_debounce_ms = 0;
        assert!(config.validate().is_err());
    }
}
