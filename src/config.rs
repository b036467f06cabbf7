//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Badge configuration endpoint, queried as `{endpoint}?shop={domain}`
    #[serde(default)]
    pub rule_endpoint: Option<String>,

    /// Shop domain sent to the rule endpoint (defaults to the scanned page's host)
    #[serde(default)]
    pub shop: Option<String>,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Base delay between requests in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Time between re-scan passes
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Upper bound on scan passes per page, initial pass included
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,

    /// Stop after this many consecutive passes that find nothing new
    #[serde(default = "default_idle_passes")]
    pub idle_passes_before_stop: u32,

    /// How far the container fallback walks up from a product link
    #[serde(default = "default_ancestor_depth")]
    pub ancestor_depth: usize,

    #[serde(default = "default_z_index")]
    pub z_index: i32,

    /// Prefix for badge CSS classes
    #[serde(default = "default_prefix")]
    pub class_prefix: String,

    /// Prefix for badge element ids
    #[serde(default = "default_prefix")]
    pub id_prefix: String,

    /// Vertical distance between badges stacked in the same cell
    #[serde(default = "default_stack_spacing_px")]
    pub stack_spacing_px: u32,

    /// ISO 4217 code used when the page does not announce one
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Log per-product skip reasons at debug level
    #[serde(default)]
    pub debug: bool,
}

fn default_delay_ms() -> u64 {
    250
}

fn default_delay_jitter_ms() -> u64 {
    250
}

fn default_scan_interval_ms() -> u64 {
    2000
}

fn default_max_passes() -> u32 {
    5
}

fn default_idle_passes() -> u32 {
    2
}

fn default_ancestor_depth() -> usize {
    6
}

fn default_z_index() -> i32 {
    10
}

fn default_prefix() -> String {
    "sb-badge".to_string()
}

fn default_stack_spacing_px() -> u32 {
    30
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rule_endpoint: None,
            shop: None,
            proxy: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            scan_interval_ms: default_scan_interval_ms(),
            max_passes: default_max_passes(),
            idle_passes_before_stop: default_idle_passes(),
            ancestor_depth: default_ancestor_depth(),
            z_index: default_z_index(),
            class_prefix: default_prefix(),
            id_prefix: default_prefix(),
            stack_spacing_px: default_stack_spacing_px(),
            currency: default_currency(),
            format: OutputFormat::Table,
            debug: false,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("shelf-badges.toml");
        if local_config.exists() {
            debug!("Found shelf-badges.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("shelf-badges").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("BADGE_ENDPOINT") {
            self.rule_endpoint = Some(endpoint);
        }

        if let Ok(shop) = std::env::var("BADGE_SHOP") {
            self.shop = Some(shop);
        }

        if let Ok(proxy) = std::env::var("BADGE_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(delay) = std::env::var("BADGE_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        if let Ok(flag) = std::env::var("BADGE_DEBUG") {
            self.debug = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        self
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
