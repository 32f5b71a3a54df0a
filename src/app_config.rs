//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// TOML-backed file configuration for subconv defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Artifact database file.
    pub db_path: Option<PathBuf>,
    /// Per-fetch timeout in seconds.
    pub fetch_timeout_secs: Option<u64>,
    /// Maximum background refreshes running at once.
    pub refresh_concurrency: Option<usize>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
    /// Optional database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Optional database busy timeout in milliseconds.
    pub db_busy_timeout_ms: Option<u32>,
    /// User-Agent sent with subscription fetches.
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(secs) = self.fetch_timeout_secs
            && !(1..=3600).contains(&secs)
        {
            bail!("Invalid config value for `fetch_timeout_secs`: {secs}. Expected range: 1..=3600");
        }

        if let Some(concurrency) = self.refresh_concurrency
            && !(1..=64).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `refresh_concurrency`: {concurrency}. Expected range: 1..=64"
            );
        }
        validate_db_max_connections(self.db_max_connections)?;
        validate_db_busy_timeout_ms(self.db_busy_timeout_ms)?;

        Ok(())
    }
}

fn validate_db_max_connections(value: Option<u32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=20).contains(&value) {
        bail!("Invalid config value for `db_max_connections`: {value}. Expected range: 1..=20");
    }
    Ok(())
}

fn validate_db_busy_timeout_ms(value: Option<u32>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value > 120_000 {
        bail!("Invalid config value for `db_busy_timeout_ms`: {value}. Expected range: 0..=120000");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the default log filter for this setting.
    #[must_use]
    pub fn filter(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config; empty when no file exists.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/subconv/config.toml`
/// 2. `$HOME/.config/subconv/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("subconv")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("subconv")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` if given (it must exist), otherwise from the
/// default path if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            config: FileConfig::default(),
            loaded_from_file: false,
        }),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_number = line_index + 1;

        match key {
            "db_path" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `db_path` value on line {line_number}"))?;
                cfg.db_path = Some(PathBuf::from(parsed));
            }
            "fetch_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `fetch_timeout_secs` value on line {line_number}")
                })?;
                cfg.fetch_timeout_secs = Some(parsed);
            }
            "refresh_concurrency" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `refresh_concurrency` value on line {line_number}")
                })?;
                let n = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("refresh_concurrency out of range for usize"))?;
                cfg.refresh_concurrency = Some(n);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `verbosity` value on line {line_number}"))?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_number}")
                })?);
            }
            "db_max_connections" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `db_max_connections` value on line {line_number}")
                })?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("db_max_connections out of range for u32"))?;
                cfg.db_max_connections = Some(n);
            }
            "db_busy_timeout_ms" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `db_busy_timeout_ms` value on line {line_number}")
                })?;
                let n = u32::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("db_busy_timeout_ms out of range for u32"))?;
                cfg.db_busy_timeout_ms = Some(n);
            }
            "user_agent" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `user_agent` value on line {line_number}"))?;
                cfg.user_agent = Some(parsed);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}
