//! Application configuration for BrochureKit.
//!
//! User config lives at `~/.brochurekit/brochurekit.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BrochureKitError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "brochurekit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".brochurekit";

// ---------------------------------------------------------------------------
// Config structs (matching brochurekit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP client settings for site fetches.
    #[serde(default)]
    pub http: HttpConfig,

    /// Text-generation service settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Page text extraction limits.
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding the stage artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "outputs".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout for homepage and page fetches.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,

    /// `User-Agent` sent with every site request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Redirects followed before a fetch fails.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl HttpConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("BrochureKit/", env!("CARGO_PKG_VERSION")).into()
}
fn default_max_redirects() -> usize {
    5
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for link curation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Timeout for the single completion request.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on curated links, applied after post-filtering.
    #[serde(default = "default_max_links")]
    pub max_links: usize,
}

impl LlmConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout(),
            max_links: default_max_links(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_timeout() -> u64 {
    120
}
fn default_max_links() -> usize {
    10
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Blocks whose trimmed text is this long or shorter are dropped.
    #[serde(default = "default_min_block_chars")]
    pub min_block_chars: usize,

    /// Character budget for a page's final text.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_block_chars: default_min_block_chars(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

fn default_min_block_chars() -> usize {
    25
}
fn default_max_text_chars() -> usize {
    15_000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.brochurekit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| BrochureKitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.brochurekit/brochurekit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BrochureKitError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        BrochureKitError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BrochureKitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| BrochureKitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BrochureKitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the configured env var.
///
/// Fails when the variable is unset or empty.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(BrochureKitError::config(format!(
            "API key not found. Set the {var_name} environment variable before running curation."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("gpt-4o-mini"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.http.timeout_secs, 30);
        assert_eq!(parsed.llm.max_links, 10);
        assert_eq!(parsed.extract.min_block_chars, 25);
        assert_eq!(parsed.extract.max_text_chars, 15_000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/brochure"

[llm]
model = "gpt-4.1-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/brochure");
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.http.timeout(), Duration::from_secs(30));
        assert!(config.http.user_agent.starts_with("BrochureKit/"));
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("bk-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.toml");
        std::fs::write(&path, "[llm\nmodel = ").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "BK_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
