//! HelpDesk configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main HelpDesk configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpdeskConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Retrieval pipeline configuration
    pub retrieval: RetrievalConfig,

    /// Generative endpoint configuration
    pub llm: LlmConfig,

    /// Knowledge base source
    pub knowledge: KnowledgeConfig,

    /// Registration and login rules
    pub auth: AuthConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl HelpdeskConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.retrieval.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "retrieval.threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be positive".to_string()));
        }
        if self.llm.max_output_tokens == 0 {
            return Err(Error::Config(
                "llm.max_output_tokens must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(Error::Config(format!(
                "auth.bcrypt_cost must be within [4, 31], got {}",
                self.auth.bcrypt_cost
            )));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,

    /// Idle time after which a login session expires
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            cors_origins: Vec::new(),
            session_ttl_secs: 8 * 60 * 60,
        }
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Cosine similarity a lexical match must exceed to be answered directly
    pub threshold: f64,
}

/// Default similarity threshold for a direct knowledge-base answer
pub const DEFAULT_THRESHOLD: f64 = 0.3;

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Generative endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Call the endpoint at all; when false every miss goes to substring search
    pub enabled: bool,

    /// Generate endpoint URL
    pub endpoint: String,

    /// Environment variable holding the bearer credential
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output length in tokens
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.generative.google/v1beta2/models/text-bison-001:generate"
                .to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 15,
            temperature: 0.7,
            max_output_tokens: 512,
        }
    }
}

impl LlmConfig {
    /// Resolve the bearer credential from the environment.
    ///
    /// Tries the configured name, then its UPPER_CASE form.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .or_else(|_| std::env::var(self.api_key_env.to_uppercase()))
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Knowledge base source configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// JSON file with the knowledge base; the builtin one is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

/// Registration and login rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Required email suffix for student accounts
    pub student_email_domain: String,

    /// Required email suffix for admin accounts
    pub admin_email_domain: String,

    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            student_email_domain: "@pvpsit.ac.in".to_string(),
            admin_email_domain: "@pvpsiddhartha.ac.in".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("helpdesk");

        Self {
            database: base.join("helpdesk.db"),
        }
    }
}
