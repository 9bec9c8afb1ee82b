// Configuration Storage Service
// Handles config file read/write, version backup and API key resolution

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::models::LlmProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub default_provider: Option<LlmProvider>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            default_provider: None,
            search: SearchConfig::default(),
            providers: HashMap::new(),
            api_keys: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub semantic_scholar_limit: u32,
    #[serde(default = "default_limit")]
    pub crossref_rows: u32,
    #[serde(default = "default_limit")]
    pub arxiv_max_results: u32,
    #[serde(default = "default_mailto")]
    pub crossref_mailto: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            semantic_scholar_limit: default_limit(),
            crossref_rows: default_limit(),
            arxiv_max_results: default_limit(),
            crossref_mailto: default_mailto(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_limit() -> u32 {
    20
}

fn default_mailto() -> String {
    "research@academic-finder.com".to_string()
}

/// Environment variables consulted before the config file, per credential name.
fn key_env_vars(name: &str) -> Vec<String> {
    let upper = name.to_ascii_uppercase().replace('-', "_");
    vec![format!("SCHOLARPEN_{}_API_KEY", upper), format!("{}_API_KEY", upper)]
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scholarpen"))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file. A file that does not parse is treated as absent;
    /// the next save backs it up before overwriting.
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(error = %e, "[CONFIG] Unreadable config file, using defaults");
                Ok(AppConfig::default())
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // File names embed the timestamp, so name order is age order
        entries.sort_by_key(|e| e.file_name());

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Resolve a credential: environment first, then config file.
    /// `name` is a credential name such as "openai" or "zerogpt".
    pub fn resolve_api_key(&self, name: &str) -> Result<Option<String>, String> {
        for var in key_env_vars(name) {
            if let Ok(value) = std::env::var(&var) {
                if !value.trim().is_empty() {
                    return Ok(Some(value.trim().to_string()));
                }
            }
        }
        self.get_api_key(name)
    }

    /// Get API key from config file only
    pub fn get_api_key(&self, name: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_keys.get(name).filter(|k| !k.trim().is_empty()).cloned())
    }

    pub fn set_api_key(&self, name: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(name.to_string(), key.trim().to_string());
        self.save(&config)
    }

    pub fn delete_api_key(&self, name: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.remove(name);
        self.save(&config)
    }

    /// Get provider base URL from config file
    pub fn get_provider_url(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.providers.get(provider).and_then(|p| p.base_url.clone()))
    }

    pub fn set_provider_url(&self, provider: &str, url: &str) -> Result<(), String> {
        let mut config = self.load()?;
        let provider_config = config.providers.entry(provider.to_string()).or_default();
        provider_config.base_url = Some(url.to_string());
        self.save(&config)
    }

    /// Model override for a provider, falling back to the catalogue default.
    pub fn model_for(&self, provider: LlmProvider) -> String {
        self.load()
            .ok()
            .and_then(|c| c.providers.get(provider.key()).and_then(|p| p.model.clone()))
            .unwrap_or_else(|| provider.default_model().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search.semantic_scholar_limit, 20);
        assert_eq!(config.search.crossref_mailto, "research@academic-finder.com");
        assert!(config.default_provider.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config.default_provider = Some(LlmProvider::Anthropic);
        config.api_keys.insert("anthropic".to_string(), "sk-ant".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"defaultProvider\":\"anthropic\""));
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.default_provider, Some(LlmProvider::Anthropic));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig = serde_json::from_str(r#"{"apiKeys":{"gemini":"g"}}"#).unwrap();
        assert_eq!(parsed.search.arxiv_max_results, 20);
        assert_eq!(parsed.api_keys.get("gemini").map(String::as_str), Some("g"));
    }

    #[test]
    fn test_malformed_config_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{bad").unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        let config = store.load().unwrap();
        assert_eq!(config.version, "1.0.0");
        assert!(config.api_keys.is_empty());
        assert!(store.get_api_key("openai").unwrap().is_none());

        store.set_api_key("openai", "sk-x").unwrap();
        assert_eq!(store.get_api_key("openai").unwrap().as_deref(), Some("sk-x"));

        let backups: Vec<_> = fs::read_dir(dir.path().join("backups")).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_save_load_and_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());

        assert!(store.get_api_key("sapling").unwrap().is_none());
        store.set_api_key("sapling", "  abc  ").unwrap();
        assert_eq!(store.get_api_key("sapling").unwrap().as_deref(), Some("abc"));

        store.set_provider_url("openai", "http://localhost:9999").unwrap();
        assert_eq!(
            store.get_provider_url("openai").unwrap().as_deref(),
            Some("http://localhost:9999")
        );
        assert!(dir.path().join("backups").exists());

        store.delete_api_key("sapling").unwrap();
        assert!(store.get_api_key("sapling").unwrap().is_none());
    }

    #[test]
    fn test_model_override() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.model_for(LlmProvider::OpenAi), "gpt-4o");

        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig { model: Some("gpt-4.1".to_string()), base_url: None },
        );
        store.save(&config).unwrap();
        assert_eq!(store.model_for(LlmProvider::OpenAi), "gpt-4.1");
    }

    #[test]
    fn test_key_env_var_names() {
        assert_eq!(
            key_env_vars("openai"),
            vec!["SCHOLARPEN_OPENAI_API_KEY".to_string(), "OPENAI_API_KEY".to_string()]
        );
    }
}
