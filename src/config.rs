use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used for user and project config
pub const CONFIG_DIR: &str = ".schedbridge";

/// Scheduling store access
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tool server: where clients connect and where the server binds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub bind: String,
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8001/mcp".to_string(),
            bind: "127.0.0.1:8001".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Chat model backend
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    pub api_key_env: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-5".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            timeout_ms: 120_000,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Local servers (Ollama, llama.cpp) need a bearer header but ignore it
    pub fn is_local(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }

    /// Resolve the API key from config, then the named env var.
    pub fn resolve_api_key(&self) -> Result<SecretString> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<SecretString> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(SecretString::from(key.clone()));
        }
        if let Some(key) = lookup(&self.api_key_env).filter(|k| !k.is_empty()) {
            return Ok(SecretString::from(key));
        }
        if self.is_local() {
            return Ok(SecretString::from("local".to_string()));
        }
        bail!("Set {} to use the model API at {}", self.api_key_env, self.base_url)
    }
}

/// Tool-call loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_rounds: usize,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: crate::agent::core::DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration from default paths, then the environment.
    ///
    /// Priority: `explicit` > local (.schedbridge/config.local.toml) >
    /// project (.schedbridge/config.toml) > user (~/.schedbridge/config.toml)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut layers = Vec::new();
        if let Some(dir) = user_dir() {
            layers.push(dir.join("config.toml"));
        }
        layers.push(Path::new(CONFIG_DIR).join("config.toml"));
        layers.push(Path::new(CONFIG_DIR).join("config.local.toml"));

        if let Some(path) = explicit {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            layers.push(path.to_path_buf());
        }

        let mut config = Self::load_layers(&layers)?;
        config.apply_env();
        Ok(config)
    }

    /// Deep-merge the given files in order over the defaults. Missing files
    /// are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths.iter().filter(|p| p.exists()) {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let layer: toml::Table = content
                .parse()
                .with_context(|| format!("invalid TOML in {}", path.display()))?;
            merge_tables(&mut merged, layer);
        }
        let config: Config = toml::Value::Table(merged)
            .try_into()
            .context("invalid configuration")?;
        if config.agent.max_rounds == 0 {
            bail!("agent.max_rounds must be at least 1");
        }
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("SCHEDULER_API_BASE") {
            self.store.base_url = v;
        }
        if let Some(v) = get("MCP_SERVER_URL") {
            self.server.url = v;
        }
        if let Some(v) = get("SCHEDBRIDGE_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.model.name = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.model.base_url = v;
        }
    }
}

/// `~/.schedbridge`, if a home directory is known
pub fn user_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(CONFIG_DIR))
}

/// Overlay `other` onto `base`; nested tables merge key by key.
fn merge_tables(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        if let (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) =
            (base.get_mut(&key), &value)
        {
            merge_tables(existing, incoming.clone());
            continue;
        }
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.base_url, "http://localhost:8000/api");
        assert_eq!(config.server.url, "http://localhost:8001/mcp");
        assert_eq!(config.server.bind, "127.0.0.1:8001");
        assert_eq!(config.model.name, "gpt-5");
        assert_eq!(config.store.timeout(), Duration::from_secs(10));
        assert_eq!(config.model.timeout(), Duration::from_secs(120));
        assert_eq!(config.agent.max_rounds, 12);
    }

    #[test]
    fn test_layers_deep_merge() {
        let dir = tempfile::tempdir().unwrap();
        let user = write(
            dir.path(),
            "user.toml",
            "[store]\nbase_url = \"http://store.internal/api\"\ntimeout_ms = 2000\n\n[model]\nname = \"gpt-4o\"\n",
        );
        let local = write(dir.path(), "local.toml", "[store]\ntimeout_ms = 500\n");
        let missing = dir.path().join("nope.toml");

        let config = Config::load_layers(&[user, missing, local]).unwrap();
        assert_eq!(config.store.base_url, "http://store.internal/api");
        assert_eq!(config.store.timeout_ms, 500);
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.model.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_invalid_toml_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "[store\n");
        let err = Config::load_layers(&[bad]).unwrap_err();
        assert!(format!("{:#}", err).contains("bad.toml"));
    }

    #[test]
    fn test_zero_max_rounds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "[agent]\nmax_rounds = 0\n");
        let err = Config::load_layers(&[path]).unwrap_err();
        assert!(err.to_string().contains("agent.max_rounds"), "{}", err);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCHEDULER_API_BASE", "http://10.0.0.5:8000/api"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("MCP_SERVER_URL", ""),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.store.base_url, "http://10.0.0.5:8000/api");
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.server.url, "http://localhost:8001/mcp");
    }

    #[test]
    fn test_resolve_api_key() {
        let mut model = ModelConfig::default();
        assert!(model.resolve_api_key_with(|_| None).is_err());

        let key = model
            .resolve_api_key_with(|k| (k == "OPENAI_API_KEY").then(|| "sk-env".to_string()))
            .unwrap();
        assert_eq!(key.expose_secret(), "sk-env");

        model.api_key = Some("sk-file".to_string());
        let key = model.resolve_api_key_with(|_| Some("sk-env".to_string())).unwrap();
        assert_eq!(key.expose_secret(), "sk-file");

        let local = ModelConfig {
            base_url: "http://localhost:11434/v1".to_string(),
            ..ModelConfig::default()
        };
        assert!(local.resolve_api_key_with(|_| None).is_ok());
    }

    #[test]
    fn test_debug_redacts_key() {
        let model = ModelConfig {
            api_key: Some("sk-secret".to_string()),
            ..ModelConfig::default()
        };
        let debug = format!("{:?}", model);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
