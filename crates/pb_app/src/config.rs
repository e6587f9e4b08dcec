use std::path::{Path, PathBuf};
use std::time::Duration;

use pb_core::{Error, Result};
use pb_publishers::publishers::QiitaConfig;
use pb_publishers::ServicesConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const ENV_OPENAI_API_KEY: &str = "POSTBLOG_OPENAI_API_KEY";
pub const ENV_QIITA_TOKEN: &str = "POSTBLOG_QIITA_TOKEN";
pub const ENV_WORDPRESS_PASSWORD: &str = "POSTBLOG_WORDPRESS_PASSWORD";
pub const ENV_HATENA_API_KEY: &str = "POSTBLOG_HATENA_API_KEY";
pub const ENV_AMEBA_SMTP_PASSWORD: &str = "POSTBLOG_AMEBA_SMTP_PASSWORD";

/// `~/.postblog`, or `./.postblog` without a home directory.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".postblog")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub theme: String,
    pub font_size: u32,
    /// Seconds.
    pub auto_save_interval: u32,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            font_size: 14,
            auto_save_interval: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSection {
    pub preview_position: String,
}

impl Default for EditorSection {
    fn default() -> Self {
        Self {
            preview_position: "right".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `sqlite` or `memory`.
    pub backend: String,
    /// Defaults to `~/.postblog/postblog.db`.
    pub path: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub shutdown_grace_secs: u64,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: crate::runner::DEFAULT_SHUTDOWN_GRACE.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub openai: pb_inference::Config,
    pub editor: EditorSection,
    pub storage: StorageSection,
    pub runner: RunnerSection,
    pub services: ServicesConfig,
}

impl AppConfig {
    /// Reads `path`. A missing or unreadable file yields the defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| Self::from_toml(&text))
        {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load config {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Writes the config as TOML, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Applies one setting by key. Unknown keys are ignored with a warning
    /// and return `Ok(false)`; out-of-range values are validation errors.
    pub fn update(&mut self, key: &str, value: &str) -> Result<bool> {
        match key {
            "theme" => {
                if value != "light" && value != "dark" {
                    return Err(Error::Validation(
                        "Theme must be 'light' or 'dark'.".to_string(),
                    ));
                }
                self.app.theme = value.to_string();
            }
            "font_size" => {
                self.app.font_size = parse_in_range(value, 8, 32)
                    .ok_or_else(|| Error::Validation("Font size must be between 8 and 32.".to_string()))?;
            }
            "auto_save_interval" => {
                self.app.auto_save_interval = parse_in_range(value, 10, 300).ok_or_else(|| {
                    Error::Validation("Auto-save interval must be between 10 and 300 seconds.".to_string())
                })?;
            }
            "model" => {
                if value.trim().is_empty() {
                    return Err(Error::Validation("Model name must not be empty.".to_string()));
                }
                self.openai.model_name = value.trim().to_string();
            }
            "preview_position" => {
                if value != "right" && value != "bottom" {
                    return Err(Error::Validation(
                        "Preview position must be 'right' or 'bottom'.".to_string(),
                    ));
                }
                self.editor.preview_position = value.to_string();
            }
            other => {
                warn!("Unknown config key: {}", other);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Copy with secrets filled in from the environment. Environment values
    /// win over the file.
    pub fn with_env_overrides(&self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(&self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.clone();
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_OPENAI_API_KEY) {
            config.openai.api_key = Some(key);
        }
        if let Some(token) = lookup(ENV_QIITA_TOKEN) {
            config
                .services
                .qiita
                .get_or_insert_with(QiitaConfig::default)
                .token = Some(token);
        }
        if let Some(password) = lookup(ENV_WORDPRESS_PASSWORD) {
            match config.services.wordpress.as_mut() {
                Some(wp) => wp.password = Some(password),
                None => warn!("{} is set but [services.wordpress] is missing", ENV_WORDPRESS_PASSWORD),
            }
        }
        if let Some(api_key) = lookup(ENV_HATENA_API_KEY) {
            match config.services.hatena.as_mut() {
                Some(hatena) => hatena.api_key = Some(api_key),
                None => warn!("{} is set but [services.hatena] is missing", ENV_HATENA_API_KEY),
            }
        }
        if let Some(password) = lookup(ENV_AMEBA_SMTP_PASSWORD) {
            match config.services.ameba.as_mut() {
                Some(ameba) => ameba.smtp_password = Some(password),
                None => warn!("{} is set but [services.ameba] is missing", ENV_AMEBA_SMTP_PASSWORD),
            }
        }
        config
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.runner.shutdown_grace_secs)
    }
}

fn parse_in_range(value: &str, min: u32, max: u32) -> Option<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_publishers::publishers::WordPressConfig;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.toml"));
        assert_eq!(config.app, AppSection::default());
        assert_eq!(config.openai.model_name, "gpt-4o");
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[app\ntheme = ").unwrap();
        assert_eq!(AppConfig::load(&path).app.theme, "dark");
    }

    #[test]
    fn test_partial_file() {
        let config = AppConfig::from_toml(
            r#"
            [app]
            theme = "light"

            [openai]
            model_name = "gpt-4o-mini"

            [services.qiita]
            token = "abc"

            [services.markdown_export]
            labels = ["note"]
            "#,
        )
        .unwrap();
        assert_eq!(config.app.theme, "light");
        assert_eq!(config.app.font_size, 14);
        assert_eq!(config.openai.model_name, "gpt-4o-mini");
        assert_eq!(config.services.qiita.unwrap().token.as_deref(), Some("abc"));
        assert_eq!(config.services.markdown_export.unwrap().labels, vec!["note"]);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.update("theme", "light").unwrap();
        config.update("font_size", "18").unwrap();
        config.openai.api_key = Some("sk-never-written".to_string());
        config.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("sk-never-written"));
        let loaded = AppConfig::load(&path);
        assert_eq!(loaded.app.theme, "light");
        assert_eq!(loaded.app.font_size, 18);
    }

    #[test]
    fn test_update_validation() {
        let mut config = AppConfig::default();
        assert!(config.update("font_size", "7").unwrap_err().is_validation());
        assert!(config.update("auto_save_interval", "301").is_err());
        assert!(config.update("theme", "blue").is_err());
        assert!(config.update("preview_position", "left").is_err());
        assert!(!config.update("colour", "red").unwrap());
        assert!(config.update("model", "gpt-4.1").unwrap());
        assert_eq!(config.openai.model_name, "gpt-4.1");
        assert!(config.update("preview_position", "bottom").unwrap());
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = AppConfig::default();
        config.services.wordpress = Some(WordPressConfig {
            site_url: Some("https://wp.example".to_string()),
            username: Some("admin".to_string()),
            password: Some("from-file".to_string()),
        });
        let env: HashMap<&str, &str> = [
            (ENV_OPENAI_API_KEY, "sk-env"),
            (ENV_QIITA_TOKEN, "qiita-env"),
            (ENV_WORDPRESS_PASSWORD, "wp-env"),
            (ENV_HATENA_API_KEY, "ignored"),
        ]
        .into_iter()
        .collect();

        let effective = config.with_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(effective.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(
            effective.services.qiita.as_ref().unwrap().token.as_deref(),
            Some("qiita-env")
        );
        assert_eq!(
            effective.services.wordpress.as_ref().unwrap().password.as_deref(),
            Some("wp-env")
        );
        assert!(effective.services.hatena.is_none());
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_ameba_section_and_password_from_env() {
        let config = AppConfig::from_toml(
            r#"
            [services.ameba]
            from_email = "me@example.com"
            posting_email = "post@example.ameba.jp"
            smtp_port = 465
            "#,
        )
        .unwrap();
        let ameba = config.services.ameba.clone().unwrap();
        assert_eq!(ameba.smtp_port, Some(465));
        assert!(ameba.smtp_server.is_none());
        assert!(ameba.smtp_password.is_none());

        let effective = config.with_overrides(|k| {
            (k == ENV_AMEBA_SMTP_PASSWORD).then(|| "app-password".to_string())
        });
        assert_eq!(
            effective.services.ameba.unwrap().smtp_password.as_deref(),
            Some("app-password")
        );

        let without_section = AppConfig::default().with_overrides(|k| {
            (k == ENV_AMEBA_SMTP_PASSWORD).then(|| "app-password".to_string())
        });
        assert!(without_section.services.ameba.is_none());
    }
}
