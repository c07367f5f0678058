//! Configuration file management for taskgraph.
//!
//! Provides a TOML-based config file at `~/.config/taskgraph/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use taskgraph_core::{ClaudeCliGenerator, DecomposerConfig};

pub const ENV_CLAUDE_BINARY: &str = "TASKGRAPH_CLAUDE_BINARY";
pub const ENV_MODEL: &str = "TASKGRAPH_MODEL";
pub const ENV_VALIDATE_OUTPUT: &str = "TASKGRAPH_VALIDATE_OUTPUT";
pub const ENV_MAX_RETRIES: &str = "TASKGRAPH_MAX_RETRIES";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub generation: GenerationSection,
    pub decompose: DecomposerConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    /// Path or name of the `claude` executable.
    pub claude_binary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            claude_binary: ClaudeCliGenerator::DEFAULT_BINARY.to_string(),
            model: None,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the taskgraph config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/taskgraph` or
/// `~/.config/taskgraph`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("taskgraph");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("taskgraph")
}

/// Return the path to the taskgraph config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns `Ok(None)` if it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Settings the CLI can override per invocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides<'a> {
    pub model: Option<&'a str>,
    pub no_validate: bool,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TaskgraphConfig {
    pub claude_binary: String,
    pub model: Option<String>,
    pub decomposer: DecomposerConfig,
}

impl TaskgraphConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Claude binary: `TASKGRAPH_CLAUDE_BINARY` > `generation.claude_binary` > `claude`
    /// - Model: `--model` > `TASKGRAPH_MODEL` > `generation.model` > none
    /// - Validation: `--no-validate` > `TASKGRAPH_VALIDATE_OUTPUT` > `decompose.validate_output` > on
    /// - Retries: `TASKGRAPH_MAX_RETRIES` > `decompose.max_retries` > 0
    pub fn resolve(overrides: CliOverrides<'_>) -> Result<Self> {
        let file_config = load_config()?.unwrap_or_default();

        let claude_binary = env_var(ENV_CLAUDE_BINARY).unwrap_or(file_config.generation.claude_binary);

        let model = overrides
            .model
            .map(str::to_string)
            .or_else(|| env_var(ENV_MODEL))
            .or(file_config.generation.model);

        let validate_output = if overrides.no_validate {
            false
        } else if let Some(raw) = env_var(ENV_VALIDATE_OUTPUT) {
            parse_bool(&raw).with_context(|| format!("{ENV_VALIDATE_OUTPUT} env var is invalid"))?
        } else {
            file_config.decompose.validate_output
        };

        let max_retries = match env_var(ENV_MAX_RETRIES) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_RETRIES} env var is not a number: {raw:?}"))?,
            None => file_config.decompose.max_retries,
        };

        Ok(Self {
            claude_binary,
            model,
            decomposer: DecomposerConfig {
                validate_output,
                max_retries,
            },
        })
    }

    /// Build the generator these settings describe.
    pub fn generator(&self) -> ClaudeCliGenerator {
        let generator = ClaudeCliGenerator::with_binary(&self.claude_binary);
        match &self.model {
            Some(model) => generator.with_model(model),
            None => generator,
        }
    }
}

/// Read a non-empty env var.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected true or false, got {other:?}"),
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point the config dir at a fresh temp dir and clear taskgraph env vars.
    fn isolated_env() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        for name in [ENV_CLAUDE_BINARY, ENV_MODEL, ENV_VALIDATE_OUTPUT, ENV_MAX_RETRIES] {
            unsafe { std::env::remove_var(name) };
        }
        tmp
    }

    fn clear_env() {
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
        for name in [ENV_CLAUDE_BINARY, ENV_MODEL, ENV_VALIDATE_OUTPUT, ENV_MAX_RETRIES] {
            unsafe { std::env::remove_var(name) };
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let _tmp = isolated_env();

        let original = ConfigFile {
            generation: GenerationSection {
                claude_binary: "/opt/claude/bin/claude".to_string(),
                model: Some("opus".to_string()),
            },
            decompose: DecomposerConfig {
                validate_output: false,
                max_retries: 2,
            },
        };
        save_config(&original).unwrap();
        let loaded = load_config().unwrap().unwrap();
        clear_env();

        assert_eq!(loaded.generation.claude_binary, original.generation.claude_binary);
        assert_eq!(loaded.generation.model, original.generation.model);
        assert_eq!(loaded.decompose, original.decompose);
    }

    #[test]
    fn missing_config_file_is_none() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        let loaded = load_config().unwrap();
        clear_env();
        assert!(loaded.is_none());
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let config: ConfigFile = toml::from_str("[generation]\nmodel = \"sonnet\"\n").unwrap();
        assert_eq!(config.generation.claude_binary, "claude");
        assert_eq!(config.generation.model.as_deref(), Some("sonnet"));
        assert!(config.decompose.validate_output);
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        let config = TaskgraphConfig::resolve(CliOverrides::default());
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.claude_binary, "claude");
        assert!(config.model.is_none());
        assert_eq!(config.decomposer, DecomposerConfig::default());
    }

    #[test]
    fn resolve_env_overrides_config_file() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        save_config(&ConfigFile {
            generation: GenerationSection {
                claude_binary: "from-file".to_string(),
                model: Some("file-model".to_string()),
            },
            decompose: DecomposerConfig {
                validate_output: true,
                max_retries: 1,
            },
        })
        .unwrap();
        unsafe { std::env::set_var(ENV_CLAUDE_BINARY, "from-env") };
        unsafe { std::env::set_var(ENV_MODEL, "env-model") };
        unsafe { std::env::set_var(ENV_VALIDATE_OUTPUT, "false") };
        unsafe { std::env::set_var(ENV_MAX_RETRIES, "5") };

        let config = TaskgraphConfig::resolve(CliOverrides::default());
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.claude_binary, "from-env");
        assert_eq!(config.model.as_deref(), Some("env-model"));
        assert!(!config.decomposer.validate_output);
        assert_eq!(config.decomposer.max_retries, 5);
    }

    #[test]
    fn resolve_with_cli_flags_overrides_all() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        unsafe { std::env::set_var(ENV_MODEL, "env-model") };
        unsafe { std::env::set_var(ENV_VALIDATE_OUTPUT, "true") };

        let config = TaskgraphConfig::resolve(CliOverrides {
            model: Some("cli-model"),
            no_validate: true,
        });
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.model.as_deref(), Some("cli-model"));
        assert!(!config.decomposer.validate_output);
    }

    #[test]
    fn resolve_errors_on_invalid_env_values() {
        let _lock = lock_env();
        let _tmp = isolated_env();
        unsafe { std::env::set_var(ENV_MAX_RETRIES, "many") };
        let result = TaskgraphConfig::resolve(CliOverrides::default());
        unsafe { std::env::remove_var(ENV_MAX_RETRIES) };
        unsafe { std::env::set_var(ENV_VALIDATE_OUTPUT, "maybe") };
        let bool_result = TaskgraphConfig::resolve(CliOverrides::default());
        clear_env();

        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains(ENV_MAX_RETRIES), "unexpected error: {msg}");
        let msg = format!("{:#}", bool_result.unwrap_err());
        assert!(msg.contains("expected true or false"), "unexpected error: {msg}");
    }

    #[test]
    fn resolve_errors_on_malformed_config_file() {
        let _lock = lock_env();
        let tmp = isolated_env();
        let dir = tmp.path().join("taskgraph");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[decompose]\nmax_retries = \"x\"\n").unwrap();

        let result = TaskgraphConfig::resolve(CliOverrides::default());
        clear_env();

        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("failed to parse config file"), "unexpected error: {msg}");
    }

    #[test]
    fn generator_carries_binary_and_model() {
        let config = TaskgraphConfig {
            claude_binary: "/usr/local/bin/claude".to_string(),
            model: Some("opus".to_string()),
            decomposer: DecomposerConfig::default(),
        };
        let generator = config.generator();
        assert_eq!(generator.binary(), "/usr/local/bin/claude");
        assert_eq!(generator.model(), Some("opus"));
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let _lock = lock_env();
        let path = config_path();
        assert!(
            path.ends_with("taskgraph/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
