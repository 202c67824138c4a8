//! Configuration management for `tree_parity`.
//!
//! Precedence (highest wins): CLI flags, environment, YAML file, defaults.
//! Each source becomes a flat string [`ConfigLayer`]; the merged layer is
//! resolved into a typed [`HarnessConfig`].

use crate::error::{ParityError, Result, ResultExt};
use crate::session::Credentials;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the current directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tree-parity.yaml";
pub const DEFAULT_WORKDIR: &str = "tree-parity-work";
pub const DEFAULT_COMMAND_PREFIX: &str = "mega-";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

const KNOWN_KEYS: &[&str] = &[
    "email",
    "password",
    "verbose",
    "shell",
    "command-prefix",
    "timeout-secs",
    "workdir",
    "continue-on-failure",
];

/// Environment variable → config key. Later entries win over earlier ones
/// for the same key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("MEGA_EMAIL", "email"),
    ("TREE_PARITY_EMAIL", "email"),
    ("MEGA_PWD", "password"),
    ("TREE_PARITY_PASSWORD", "password"),
    ("MEGACMDSHELL", "shell"),
    ("TREE_PARITY_SHELL", "shell"),
    ("TREE_PARITY_COMMAND_PREFIX", "command-prefix"),
    ("TREE_PARITY_TIMEOUT_SECS", "timeout-secs"),
    ("TREE_PARITY_WORKDIR", "workdir"),
    ("TREE_PARITY_CONTINUE", "continue-on-failure"),
];

/// One source of configuration values.
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

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Build a layer from a YAML file. Missing files return an empty layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        let mut layer = Self::default();
        if let serde_yaml::Value::Mapping(map) = value {
            for (key, value) in map {
                let (Some(key), Some(value)) = (key.as_str(), yaml_scalar_to_string(&value)) else {
                    continue;
                };
                layer.set(key, value);
            }
        }
        Ok(layer)
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs.
    #[must_use]
    pub fn from_env_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let mut layer = Self::default();
        for (name, key) in ENV_KEYS {
            if let Some(value) = vars.get(*name) {
                layer.set(key, value.clone());
            }
        }
        // Presence alone turns verbosity on.
        if vars.contains_key("VERBOSE") {
            layer.set("verbose", "true");
        }
        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub workdir: Option<PathBuf>,
    pub shell: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub continue_on_failure: Option<bool>,
    pub verbose: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(path) = &self.workdir {
            layer.set("workdir", path.to_string_lossy());
        }
        if let Some(path) = &self.shell {
            layer.set("shell", path.to_string_lossy());
        }
        if let Some(secs) = self.timeout_secs {
            layer.set("timeout-secs", secs.to_string());
        }
        if let Some(enabled) = self.continue_on_failure {
            layer.set("continue-on-failure", enabled.to_string());
        }
        if let Some(enabled) = self.verbose {
            layer.set("verbose", enabled.to_string());
        }
        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("command-prefix", DEFAULT_COMMAND_PREFIX);
    layer.set("timeout-secs", DEFAULT_TIMEOUT_SECS.to_string());
    layer.set("workdir", DEFAULT_WORKDIR);
    layer.set("verbose", "false");
    layer.set("continue-on-failure", "false");
    layer
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub verbose: bool,
    /// Interactive shell transport; per-command executables when `None`.
    pub shell: Option<PathBuf>,
    pub command_prefix: String,
    pub timeout_secs: u64,
    pub workdir: PathBuf,
    pub continue_on_failure: bool,
}

impl HarnessConfig {
    /// Resolve a merged layer.
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::Config`] for malformed numbers or booleans.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        for key in layer.values.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!(key = %key, "ignoring unknown config key");
            }
        }

        let text = |key: &str| layer.get(key).map(str::trim).filter(|v| !v.is_empty());
        let timeout_secs = match text("timeout-secs") {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| ParityError::Config(format!("timeout-secs must be a number, got '{value}'")))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            email: text("email").map(str::to_string),
            password: layer.get("password").filter(|v| !v.is_empty()).map(str::to_string),
            verbose: bool_value(layer, "verbose")?,
            shell: text("shell").map(PathBuf::from),
            command_prefix: layer
                .get("command-prefix")
                .unwrap_or(DEFAULT_COMMAND_PREFIX)
                .to_string(),
            timeout_secs,
            workdir: PathBuf::from(text("workdir").unwrap_or(DEFAULT_WORKDIR)),
            continue_on_failure: bool_value(layer, "continue-on-failure")?,
        })
    }

    /// Session identity.
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::MissingCredentials`] unless both email and
    /// password are configured.
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Ok(Credentials::new(email.clone(), password.clone())),
            _ => Err(ParityError::MissingCredentials),
        }
    }

    /// Create the working area when missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created.
    pub fn ensure_workdir(&self) -> Result<()> {
        fs::create_dir_all(&self.workdir).with_context(|| format!("creating {}", self.workdir.display()))
    }
}

/// Load configuration with the usual precedence order.
///
/// An explicit `config_path` must exist; the default file is optional.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed, or a
/// value is malformed.
pub fn load_config(config_path: Option<&Path>, cli: &CliOverrides) -> Result<HarnessConfig> {
    load_config_with_env(config_path, cli, ConfigLayer::from_env())
}

/// [`load_config`] with an explicit environment layer.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_with_env(
    config_path: Option<&Path>,
    cli: &CliOverrides,
    env_layer: ConfigLayer,
) -> Result<HarnessConfig> {
    let yaml = match config_path {
        Some(path) if !path.exists() => {
            return Err(ParityError::Config(format!("config file not found: {}", path.display())));
        }
        Some(path) => ConfigLayer::from_yaml(path)?,
        None => ConfigLayer::from_yaml(Path::new(DEFAULT_CONFIG_FILE))?,
    };

    let merged = ConfigLayer::merge_layers(&[default_config_layer(), yaml, env_layer, cli.as_layer()]);
    HarnessConfig::from_layer(&merged)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn bool_value(layer: &ConfigLayer, key: &str) -> Result<bool> {
    match layer.get(key) {
        None => Ok(false),
        Some(value) => parse_bool(value)
            .ok_or_else(|| ParityError::Config(format!("{key} must be a boolean, got '{value}'"))),
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null | serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> ConfigLayer {
        ConfigLayer::from_env_vars(pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())))
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = HarnessConfig::from_layer(&default_config_layer()).unwrap();
        assert_eq!(config.command_prefix, "mega-");
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.workdir, PathBuf::from("tree-parity-work"));
        assert!(config.shell.is_none());
        assert!(!config.verbose);
        assert!(!config.continue_on_failure);
        assert!(matches!(config.credentials(), Err(ParityError::MissingCredentials)));
    }

    #[test]
    fn env_names_map_to_keys() {
        let layer = vars(&[
            ("MEGA_EMAIL", "me@example.com"),
            ("MEGA_PWD", "secret"),
            ("MEGACMDSHELL", "/usr/bin/mega-cmd"),
            ("VERBOSE", ""),
            ("UNRELATED", "x"),
        ]);
        assert_eq!(layer.get("email"), Some("me@example.com"));
        assert_eq!(layer.get("password"), Some("secret"));
        assert_eq!(layer.get("shell"), Some("/usr/bin/mega-cmd"));
        assert_eq!(layer.get("verbose"), Some("true"));
        assert_eq!(layer.values.len(), 4);
    }

    #[test]
    fn prefixed_env_wins_over_legacy_names() {
        let layer = vars(&[("MEGA_EMAIL", "old@example.com"), ("TREE_PARITY_EMAIL", "new@example.com")]);
        assert_eq!(layer.get("email"), Some("new@example.com"));
    }

    #[test]
    fn precedence_cli_over_env_over_yaml_over_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tree-parity.yaml");
        fs::write(&path, "timeout_secs: 30\nworkdir: from-yaml\ncommand-prefix: mc-\nextra: 1\n").unwrap();

        let env_layer = vars(&[("TREE_PARITY_WORKDIR", "from-env")]);
        let cli = CliOverrides {
            timeout_secs: Some(5),
            ..CliOverrides::default()
        };
        let config = load_config_with_env(Some(&path), &cli, env_layer).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.workdir, PathBuf::from("from-env"));
        assert_eq!(config.command_prefix, "mc-");
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let err = load_config_with_env(
            Some(&temp.path().join("absent.yaml")),
            &CliOverrides::default(),
            ConfigLayer::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ParityError::Config(_)));
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let mut layer = default_config_layer();
        layer.set("timeout-secs", "soon");
        assert!(matches!(HarnessConfig::from_layer(&layer), Err(ParityError::Config(_))));

        let mut layer = default_config_layer();
        layer.set("continue-on-failure", "maybe");
        assert!(matches!(HarnessConfig::from_layer(&layer), Err(ParityError::Config(_))));
    }

    #[test]
    fn credentials_need_both_parts() {
        let mut layer = default_config_layer();
        layer.set("email", "me@example.com");
        let config = HarnessConfig::from_layer(&layer).unwrap();
        assert!(config.credentials().is_err());

        layer.set("password", "pw");
        let config = HarnessConfig::from_layer(&layer).unwrap();
        assert_eq!(config.credentials().unwrap().email, "me@example.com");
    }

    #[test]
    fn normalize_key_handles_various_formats() {
        assert_eq!(normalize_key(" Timeout_Secs "), "timeout-secs");
        assert_eq!(normalize_key("command-prefix"), "command-prefix");
    }
}
