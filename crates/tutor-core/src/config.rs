use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TutorError};

/// Top-level configuration for the tutor.
///
/// Loaded from `~/.tutor/config.toml` by default. Each section corresponds
/// to one crate or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl TutorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TutorConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would make the engine misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.document.chunk_size == 0 {
            return Err(TutorError::Config(
                "document.chunk_size must be greater than zero".into(),
            ));
        }
        if self.llm.max_attempts == 0 {
            return Err(TutorError::Config(
                "llm.max_attempts must be at least 1".into(),
            ));
        }
        if self.llm.timeout_secs == 0 || self.api.turn_timeout_secs == 0 {
            return Err(TutorError::Config("timeouts must be greater than zero".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(TutorError::Config("llm.model must not be empty".into()));
        }
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database and uploaded files.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.tutor".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GeneralConfig {
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_path().join("tutor.db")
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.data_path().join("uploads")
    }
}

/// Document segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Largest accepted upload.
    pub max_upload_mb: usize,
    /// Accepted file extensions, lower-case, without the dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            max_upload_mb: 25,
            allowed_extensions: vec!["pdf".to_string()],
        }
    }
}

impl DocumentConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|a| *a == ext)
            })
            .unwrap_or(false)
    }
}

/// Language model client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier passed to the generateContent endpoint.
    pub model: String,
    /// Inline API key. Prefer `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Base URL of the models endpoint.
    pub base_url: String,
    /// HTTP timeout for a single attempt.
    pub timeout_secs: u64,
    /// Total attempts for rate-limited calls, including the first.
    pub max_attempts: u32,
    /// First backoff delay; doubles on each retry.
    pub base_delay_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-flash-latest".to_string(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            base_delay_secs: 2,
        }
    }
}

impl LlmConfig {
    /// Inline key first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// What to say when a quiz response cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizFallback {
    /// Speak the raw model output.
    #[default]
    PassThrough,
    /// Apologize and ask the user to try again.
    Apology,
}

/// Dialogue behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    pub quiz_fallback: QuizFallback,
    /// Pages sampled for a whole-document summary.
    pub full_summary_pages: usize,
    /// Characters taken from each sampled page.
    pub full_summary_chars_per_page: usize,
    /// How long the voice loop waits for an utterance.
    pub listen_timeout_secs: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            quiz_fallback: QuizFallback::PassThrough,
            full_summary_pages: 5,
            full_summary_chars_per_page: 300,
            listen_timeout_secs: 10,
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
    pub bind_address: String,
    /// Upper bound on a single assistant turn, retries included.
    pub turn_timeout_secs: u64,
    /// Sessions untouched for this long are dropped.
    pub session_idle_secs: u64,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "127.0.0.1".to_string(),
            turn_timeout_secs: 120,
            session_idle_secs: 1800,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = TutorConfig::default();
        assert_eq!(config.general.data_dir, "~/.tutor");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.document.chunk_size, 800);
        assert_eq!(config.llm.max_attempts, 3);
        assert_eq!(config.llm.base_delay_secs, 2);
        assert_eq!(config.dialogue.quiz_fallback, QuizFallback::PassThrough);
        assert_eq!(config.dialogue.full_summary_pages, 5);
        assert_eq!(config.api.port, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/tutor"
log_level = "debug"

[document]
chunk_size = 500

[llm]
model = "gemini-2.5-flash"
max_attempts = 5

[dialogue]
quiz_fallback = "apology"

[api]
port = 8080
"#;
        let file = create_temp_config(content);
        let config = TutorConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/tutor");
        assert_eq!(config.document.chunk_size, 500);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.max_attempts, 5);
        assert_eq!(config.llm.base_delay_secs, 2);
        assert_eq!(config.dialogue.quiz_fallback, QuizFallback::Apology);
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[general]\nlog_level = \"warn\"\n");
        let config = TutorConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.document.chunk_size, 800);
        assert_eq!(config.api.turn_timeout_secs, 120);
        assert_eq!(config.api.session_idle_secs, 1800);
    }

    #[test]
    fn test_load_rejects_zero_chunk_size() {
        let file = create_temp_config("[document]\nchunk_size = 0\n");
        let err = TutorConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, TutorError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_attempts_and_empty_model() {
        let mut config = TutorConfig::default();
        config.llm.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = TutorConfig::default();
        config.llm.model = "  ".into();
        assert!(config.validate().is_err());

        let mut config = TutorConfig::default();
        config.api.turn_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[general\nbroken");
        assert!(TutorConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = TutorConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.tutor");
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = TutorConfig::default();
        config.dialogue.quiz_fallback = QuizFallback::Apology;
        config.save(&path).unwrap();

        let reloaded = TutorConfig::load(&path).unwrap();
        assert_eq!(reloaded.dialogue.quiz_fallback, QuizFallback::Apology);
        assert_eq!(reloaded.llm.model, config.llm.model);
    }

    #[test]
    fn test_allowed_extensions() {
        let doc = DocumentConfig::default();
        assert!(doc.is_allowed("notes.pdf"));
        assert!(doc.is_allowed("NOTES.PDF"));
        assert!(!doc.is_allowed("notes.docx"));
        assert!(!doc.is_allowed("pdf"));
        assert_eq!(doc.max_upload_bytes(), 25 * 1024 * 1024);
    }

    #[test]
    fn test_inline_api_key_wins() {
        let llm = LlmConfig {
            api_key: Some("inline-key".into()),
            api_key_env: "TUTOR_TEST_UNSET_KEY_VAR".into(),
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolve_api_key().as_deref(), Some("inline-key"));

        let llm = LlmConfig {
            api_key: Some("   ".into()),
            api_key_env: "TUTOR_TEST_UNSET_KEY_VAR".into(),
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolve_api_key(), None);
    }

    #[test]
    fn test_expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home("/var/tutor"), PathBuf::from("/var/tutor"));
    }

    #[test]
    fn test_data_paths_derive_from_data_dir() {
        let general = GeneralConfig {
            data_dir: "/srv/tutor".into(),
            ..GeneralConfig::default()
        };
        assert_eq!(general.database_path(), PathBuf::from("/srv/tutor/tutor.db"));
        assert_eq!(general.uploads_path(), PathBuf::from("/srv/tutor/uploads"));
    }
}
