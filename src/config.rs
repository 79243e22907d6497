use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mimic::batch::BatchSettings;
use mimic::extract::{BlockExclusions, DEFAULT_BLOCK_EXCLUSIONS};
use mimic::orchestrator::PollSettings;
use mimic::remote::HttpSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub batch: BatchConfig,
    pub extract: ExtractConfig,
}

/// Pipeline service connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the bearer token.
    #[serde(rename = "token-env")]
    pub token_env: String,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            token_env: "MIMIC_TOKEN".to_string(),
            timeout_ms: 30000,
        }
    }
}

impl ApiConfig {
    pub fn http_settings(&self) -> HttpSettings {
        let token = std::env::var(&self.token_env).ok().filter(|t| !t.is_empty());
        if token.is_none() {
            log::warn!("{} not set, sending requests without a token", self.token_env);
        }
        HttpSettings {
            base_url: self.base_url.clone(),
            token,
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

impl PollingConfig {
    pub fn settings(&self) -> PollSettings {
        PollSettings::with_interval(Duration::from_millis(self.interval_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    #[serde(rename = "max-source-chars")]
    pub max_source_chars: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_source_chars: 2000 }
    }
}

impl BatchConfig {
    pub fn settings(&self) -> BatchSettings {
        BatchSettings {
            max_source_chars: self.max_source_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Regexes for blank-line blocks that are never sources.
    #[serde(rename = "excluded-block-patterns")]
    pub excluded_block_patterns: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            excluded_block_patterns: DEFAULT_BLOCK_EXCLUSIONS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ExtractConfig {
    pub fn exclusions(&self) -> Result<BlockExclusions> {
        BlockExclusions::new(&self.excluded_block_patterns).context("Invalid extract.excluded-block-patterns")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            batch: BatchConfig::default(),
            extract: ExtractConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            eyre::bail!("polling.interval-ms must be > 0");
        }
        if self.batch.max_source_chars == 0 {
            eyre::bail!("batch.max-source-chars must be > 0");
        }
        if self.api.base_url.trim().is_empty() {
            eyre::bail!("api.base-url must not be empty");
        }
        self.extract.exclusions()?;
        Ok(())
    }
}
