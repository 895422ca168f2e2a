//! Configuration management for `ghi`.
//!
//! Settings are merged from layers, highest precedence first:
//!
//! 1. CLI overrides (`--repo`, `--workers`, `--api-url`)
//! 2. Environment (`GHI_*`, plus the `GH_*` variables shared with other tools)
//! 3. Project config (`.ghi/config.yaml`, discovered upward from the CWD)
//! 4. User config (`~/.config/ghi/config.yaml`)
//! 5. Built-in defaults
//!
//! Every layer is a flat map of normalized keys (`api-url`, `workers`, ...).
//! Nested YAML mappings flatten to dotted keys.

use crate::error::{GhiError, Result};
use crate::model::Repo;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_WORKERS: i64 = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EDITOR: &str = "vi";

const PROJECT_DIR: &str = ".ghi";
const CONFIG_FILE: &str = "config.yaml";
const ENV_PREFIX: &str = "GHI_";

/// One configuration source as normalized key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "loading config file");
        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        let mut flat = HashMap::new();
        flatten_yaml(&value, "", &mut flat);

        let mut layer = Self::default();
        for (key, value) in flat {
            layer.insert(&key, value);
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from environment-style pairs.
    ///
    /// `GHI_*` keys win over the shared `GH_*` / `EDITOR` aliases.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();
        let mut layer = Self::default();

        // Lowest first: later inserts overwrite.
        let aliases: [(&str, &str); 7] = [
            ("EDITOR", "editor"),
            ("VISUAL", "editor"),
            ("GH_EDITOR", "editor"),
            ("GITHUB_TOKEN", "token"),
            ("GH_TOKEN", "token"),
            ("GH_REPO", "repo"),
            ("GH_PROMPT_DISABLED", "prompt-disabled"),
        ];
        for (var, key) in aliases {
            if let Some(value) = vars.get(var) {
                let value = if key == "prompt-disabled" {
                    // gh treats any non-empty value as set.
                    parse_bool(value).unwrap_or(true).to_string()
                } else {
                    value.clone()
                };
                layer.insert(key, value);
            }
        }

        for (var, value) in &vars {
            if let Some(stripped) = var.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value.clone());
            }
        }

        layer
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub repo: Option<String>,
    pub workers: Option<i64>,
    pub api_url: Option<String>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(repo) = &self.repo {
            layer.insert("repo", repo.clone());
        }
        if let Some(workers) = self.workers {
            layer.insert("workers", workers.to_string());
        }
        if let Some(api_url) = &self.api_url {
            layer.insert("api-url", api_url.clone());
        }

        layer
    }
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    /// Base repository for bare issue numbers.
    pub repo: Option<Repo>,
    /// Worker bound; `<= 0` means the default of 10.
    pub workers: i64,
    pub http_timeout: Duration,
    pub editor: String,
    pub prompt_disabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            repo: None,
            workers: DEFAULT_WORKERS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            editor: DEFAULT_EDITOR.to_string(),
            prompt_disabled: false,
        }
    }
}

impl Settings {
    /// Resolve a merged layer into typed settings.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a value does not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(url) = non_empty(layer.get("api-url")) {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GhiError::Config(format!(
                    "api-url must be an http(s) url, got '{url}'"
                )));
            }
            settings.api_url = url.to_string();
        }
        settings.token = non_empty(layer.get("token")).map(str::to_string);
        if let Some(repo) = non_empty(layer.get("repo")) {
            settings.repo = Some(
                repo.parse()
                    .map_err(|_| GhiError::Config(format!("repo must be OWNER/NAME, got '{repo}'")))?,
            );
        }
        if let Some(workers) = non_empty(layer.get("workers")) {
            settings.workers = workers
                .parse()
                .map_err(|_| GhiError::Config(format!("workers must be an integer, got '{workers}'")))?;
        }
        if let Some(timeout) = non_empty(layer.get("http-timeout")) {
            settings.http_timeout = parse_duration(timeout).ok_or_else(|| {
                GhiError::Config(format!(
                    "http-timeout must be a duration like 30s or 500ms, got '{timeout}'"
                ))
            })?;
        }
        if let Some(editor) = non_empty(layer.get("editor")) {
            settings.editor = editor.to_string();
        }
        if let Some(disabled) = non_empty(layer.get("prompt-disabled")) {
            settings.prompt_disabled = parse_bool(disabled).ok_or_else(|| {
                GhiError::Config(format!("prompt-disabled must be a boolean, got '{disabled}'"))
            })?;
        }

        Ok(settings)
    }
}

/// Find `.ghi/config.yaml` in `start` (or the CWD) or any parent.
///
/// # Errors
///
/// Returns an error if the CWD cannot be read.
pub fn discover_project_config(start: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(PROJECT_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        if !current.pop() {
            return Ok(None);
        }
    }
}

/// Path of the user config file, if a home directory is known.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(Path::new(&xdg).join("ghi").join(CONFIG_FILE));
        }
    }
    let home = env::var("HOME").ok()?;
    Some(Path::new(&home).join(".config").join("ghi").join(CONFIG_FILE))
}

/// Load user config (~/.config/ghi/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    user_config_path().map_or_else(|| Ok(ConfigLayer::default()), |path| ConfigLayer::from_yaml(&path))
}

/// Load project config, searching upward from `start`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(start: Option<&Path>) -> Result<ConfigLayer> {
    match discover_project_config(start)? {
        Some(path) => ConfigLayer::from_yaml(&path),
        None => Ok(ConfigLayer::default()),
    }
}

/// Load configuration with full precedence order.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or a value
/// is invalid.
pub fn load_settings(cli: &CliOverrides) -> Result<Settings> {
    let user = load_user_config()?;
    let project = load_project_config(None)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    let merged = ConfigLayer::merge_layers(&[user, project, env_layer, cli_layer]);
    Settings::from_layer(&merged)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// `30`, `30s`, `500ms`, `2m`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse().ok().map(Duration::from_millis);
    }
    if let Some(minutes) = value.strip_suffix('m') {
        return minutes
            .trim()
            .parse::<u64>()
            .ok()
            .map(|m| Duration::from_secs(m * 60));
    }
    let secs = value.strip_suffix('s').unwrap_or(value);
    secs.trim().parse().ok().map(Duration::from_secs)
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => flatten_yaml(&tagged.value, prefix, out),
        serde_yaml::Value::Bool(v) => {
            out.insert(prefix.to_string(), v.to_string());
        }
        serde_yaml::Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_yaml::Value::Null | serde_yaml::Value::Sequence(_) => {}
    }
}
