use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use toml::Value;

use crate::error::{Error, Result};
use crate::input::Rover;

pub const DEFAULT_CONFIG_FILE: &str = "cosmos.toml";
pub const DEFAULT_IMAGES_BASE_URL: &str = "https://images-api.nasa.gov";
pub const DEFAULT_NEO_BASE_URL: &str = "https://api.nasa.gov/neo/rest/v1";
/// NASA's shared, rate-limited public key.
pub const DEMO_API_KEY: &str = "DEMO_KEY";

pub const ENV_API_KEY: &str = "NASA_API_KEY";
pub const ENV_IMAGES_URL: &str = "COSMOS_IMAGES_URL";
pub const ENV_NEO_URL: &str = "COSMOS_NEO_URL";

fn default_images_base_url() -> String {
    DEFAULT_IMAGES_BASE_URL.into()
}

fn default_neo_base_url() -> String {
    DEFAULT_NEO_BASE_URL.into()
}

fn default_api_key() -> String {
    DEMO_API_KEY.into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_quick_tags() -> Vec<String> {
    ["Saturn", "Jupiter", "Nebula", "Galaxy", "Apollo 11", "Hubble"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(default = "default_images_base_url")]
    pub images_base_url: String,
    #[serde(default = "default_neo_base_url")]
    pub neo_base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            images_base_url: default_images_base_url(),
            neo_base_url: default_neo_base_url(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    #[serde(default = "default_quick_tags")]
    pub quick_tags: Vec<String>,
    #[serde(default)]
    pub default_rover: Rover,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            quick_tags: default_quick_tags(),
            default_rover: Rover::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for the TUI log file; the system temp dir when unset.
    pub dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn tui_log_path(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
            .join("cosmos.log")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

impl Settings {
    pub fn from_doc(doc: &ConfigDoc) -> Result<Self> {
        let mut api: ApiConfig = doc.deserialize_path("api")?.unwrap_or_default();
        let ui: UiConfig = doc.deserialize_path("ui")?.unwrap_or_default();
        let log: LogConfig = doc.deserialize_path("log")?.unwrap_or_default();

        if api.timeout_secs == 0 {
            return Err(Error::msg(format!(
                "invalid api.timeout_secs in {} (must be > 0)",
                doc.path.display()
            )));
        }
        api.images_base_url = api.images_base_url.trim().to_string();
        api.neo_base_url = api.neo_base_url.trim().to_string();
        Ok(Self { api, ui, log })
    }

    /// Environment wins over file values. Empty variables are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = get(ENV_API_KEY) {
            self.api.api_key = v;
        }
        if let Some(v) = get(ENV_IMAGES_URL) {
            self.api.images_base_url = v;
        }
        if let Some(v) = get(ENV_NEO_URL) {
            self.api.neo_base_url = v;
        }
    }

    pub fn uses_demo_key(&self) -> bool {
        self.api.api_key == DEMO_API_KEY
    }
}

/// Resolves settings from an explicit path, `./cosmos.toml` when present,
/// or built-in defaults, then applies environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match path {
        Some(p) => Settings::from_doc(&load(p)?)?,
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.is_file() {
                Settings::from_doc(&load(p)?)?
            } else {
                Settings::default()
            }
        }
    };
    settings.apply_env(|k| dotenv::var(k).ok());
    Ok(settings)
}

#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub path: PathBuf,
    pub value: Value,
}

impl ConfigDoc {
    pub fn value_path(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        if path.is_empty() {
            return Some(&self.value);
        }

        let mut cur = &self.value;
        for seg in path.split('.') {
            let tbl = cur.as_table()?;
            cur = tbl.get(seg)?;
        }
        Some(cur)
    }

    pub fn deserialize_path<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let Some(v) = self.value_path(path) else {
            return Ok(None);
        };
        let owned = v.clone();
        let parsed = owned
            .try_into()
            .map_err(|e| Error::msg(format!("failed to deserialize config at '{}': {e}", path)))?;
        Ok(Some(parsed))
    }
}

pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_tbl), Value::Table(child_tbl)) => {
            for (k, v) in child_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (base_slot, child_val) => {
            *base_slot = child_val;
        }
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn load_value_inner(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::msg(format!(
            "config extends cycle detected at {}",
            canonical.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

    let mut out = Value::Table(Default::default());
    if let Some(ext) = value.get("extends").and_then(Value::as_str) {
        let base_path = resolve_ref_path(path, ext);
        out = load_value_inner(&base_path, stack)?;
    }
    if let Some(tbl) = value.as_table_mut() {
        tbl.remove("extends");
    }

    merge(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

pub fn load(path: &Path) -> Result<ConfigDoc> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value_inner(path, &mut stack)?;
    Ok(ConfigDoc {
        path: path.to_path_buf(),
        value,
    })
}
