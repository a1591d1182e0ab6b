//! Configuration for story trainer.

use crate::models::MAX_TERMS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub quiz: QuizConfig,
    #[serde(default)]
    pub practice: PracticeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Read `path`, falling back to defaults when it is missing or invalid.
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write this config to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn write_if_missing(&self, path: &Path) -> anyhow::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        self.save_to(path)?;
        Ok(true)
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "story-trainer")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// Directory holding `stories.json`, `learning_stats.json` and logs.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .or_else(|| {
                directories::ProjectDirs::from("", "", "story-trainer")
                    .map(|d| d.data_dir().to_path_buf())
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String { "gemini-2.5-flash-lite".to_string() }
fn default_endpoint() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_api_key_env() -> String { "GEMINI_API_KEY".to_string() }
fn default_timeout() -> u64 { 30 }

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Term pairs kept per story, capped at [`MAX_TERMS`].
    #[serde(default = "default_max_terms")]
    pub max_terms: usize,
    /// Choices shown per card, the correct answer included.
    #[serde(default = "default_max_choices")]
    pub max_choices: usize,
}

fn default_max_terms() -> usize { MAX_TERMS }
fn default_max_choices() -> usize { 4 }

impl QuizConfig {
    pub fn term_limit(&self) -> usize {
        self.max_terms.clamp(1, MAX_TERMS)
    }

    pub fn distractors(&self) -> usize {
        self.max_choices.clamp(2, 8) - 1
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            max_terms: default_max_terms(),
            max_choices: default_max_choices(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default = "default_good")]
    pub good_threshold: f64,
    #[serde(default = "default_fair")]
    pub fair_threshold: f64,
}

fn default_good() -> f64 { 0.7 }
fn default_fair() -> f64 { 0.5 }

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            good_threshold: default_good(),
            fair_threshold: default_fair(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file_name: String,
}

fn default_level() -> String { "info".to_string() }
fn default_log_file() -> String { "story-trainer.log".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_name: default_log_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [ai]
            model = "gemini-2.0-flash"

            [practice]
            good_threshold = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(config.ai.model, "gemini-2.0-flash");
        assert_eq!(config.ai.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.practice.good_threshold, 0.8);
        assert_eq!(config.practice.fair_threshold, 0.5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.quiz.max_terms, 30);
        assert_eq!(config.quiz.distractors(), 3);
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/tmp/stories"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/stories"));
    }

    #[test]
    fn test_quiz_limits_are_clamped() {
        let quiz = QuizConfig { max_terms: 100, max_choices: 1 };
        assert_eq!(quiz.term_limit(), MAX_TERMS);
        assert_eq!(quiz.distractors(), 1);
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.ai.endpoint, config.ai.endpoint);
        assert_eq!(back.logging.file_name, config.logging.file_name);
    }

    #[test]
    fn test_first_run_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(Config::default().write_if_missing(&path).unwrap());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("gemini-2.5-flash-lite"));

        let mut edited = Config::load_from(&path);
        edited.ai.model = "gemini-2.0-flash".to_string();
        edited.save_to(&path).unwrap();

        assert!(!Config::default().write_if_missing(&path).unwrap());
        assert_eq!(Config::load_from(&path).ai.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ai\nmodel = ").unwrap();
        assert_eq!(Config::load_from(&path).ai.model, "gemini-2.5-flash-lite");
        assert_eq!(Config::load_from(&dir.path().join("absent.toml")).quiz.max_terms, MAX_TERMS);
    }
}
