use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pb_core::{Error, Publisher, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod ameba;
pub mod hatena;
pub mod markdown_export;
pub mod qiita;
pub mod wordpress;
pub mod zenn;

pub use ameba::AmebaPublisher;
pub use hatena::HatenaPublisher;
pub use markdown_export::MarkdownExportPublisher;
pub use qiita::QiitaPublisher;
pub use wordpress::WordPressPublisher;
pub use zenn::ZennPublisher;

/// Timeout for a publish request.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a connection check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(PUBLISH_TIMEOUT)
        .user_agent(concat!("postblog/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// The article URL from a service response. A missing or blank URL means
/// the post cannot be confirmed and is reported as a failure.
pub(crate) fn require_url(service: &str, url: Option<String>) -> Result<String> {
    url.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::Publish(format!("{} response did not include an article URL", service)))
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QiitaConfig {
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressConfig {
    pub site_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HatenaConfig {
    pub hatena_id: Option<String>,
    pub blog_id: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AmebaConfig {
    pub from_email: Option<String>,
    pub posting_email: Option<String>,
    /// Defaults to `smtp.gmail.com`.
    pub smtp_server: Option<String>,
    /// Defaults to 587.
    pub smtp_port: Option<u16>,
    pub smtp_password: Option<String>,
    pub blog_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZennConfig {
    pub repo_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownExportConfig {
    /// Defaults to `~/.postblog/exports`.
    pub export_dir: Option<PathBuf>,
    /// One export target is registered per label. Empty means the single
    /// default label `markdown_export`.
    pub labels: Vec<String>,
}

/// Per-service settings, the `[services.*]` tables of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub qiita: Option<QiitaConfig>,
    pub wordpress: Option<WordPressConfig>,
    pub hatena: Option<HatenaConfig>,
    pub ameba: Option<AmebaConfig>,
    pub zenn: Option<ZennConfig>,
    pub markdown_export: Option<MarkdownExportConfig>,
}

/// Builds every publisher whose configuration is complete. Incomplete
/// sections are skipped with a warning.
pub fn create_publishers(config: &ServicesConfig) -> Result<Vec<Arc<dyn Publisher>>> {
    let mut publishers: Vec<Arc<dyn Publisher>> = Vec::new();

    if let Some(qiita) = &config.qiita {
        match &qiita.token {
            Some(token) if is_set(&qiita.token) => {
                let mut publisher = QiitaPublisher::new(token.clone())?;
                if let Some(base_url) = &qiita.base_url {
                    publisher = publisher.with_base_url(base_url.clone());
                }
                publishers.push(Arc::new(publisher));
            }
            _ => warn!("Skipping qiita: token is not configured"),
        }
    }

    if let Some(wp) = &config.wordpress {
        match (&wp.site_url, &wp.username, &wp.password) {
            (Some(site), Some(user), Some(password))
                if is_set(&wp.site_url) && is_set(&wp.username) && is_set(&wp.password) =>
            {
                match WordPressPublisher::new(site.clone(), user.clone(), password.clone()) {
                    Ok(publisher) => publishers.push(Arc::new(publisher)),
                    Err(e) => warn!("Skipping wordpress: {}", e),
                }
            }
            _ => warn!("Skipping wordpress: site_url, username and password are required"),
        }
    }

    if let Some(hatena) = &config.hatena {
        match (&hatena.hatena_id, &hatena.blog_id, &hatena.api_key) {
            (Some(id), Some(blog), Some(key))
                if is_set(&hatena.hatena_id) && is_set(&hatena.blog_id) && is_set(&hatena.api_key) =>
            {
                publishers.push(Arc::new(HatenaPublisher::new(
                    id.clone(),
                    blog.clone(),
                    key.clone(),
                )?));
            }
            _ => warn!("Skipping hatena: hatena_id, blog_id and api_key are required"),
        }
    }

    if let Some(ameba) = &config.ameba {
        match (&ameba.from_email, &ameba.posting_email, &ameba.smtp_password) {
            (Some(from), Some(to), Some(password))
                if is_set(&ameba.from_email) && is_set(&ameba.posting_email) && is_set(&ameba.smtp_password) =>
            {
                let server = ameba
                    .smtp_server
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| ameba::DEFAULT_SMTP_SERVER.to_string());
                let port = ameba.smtp_port.unwrap_or(ameba::DEFAULT_SMTP_PORT);
                match AmebaPublisher::new(from, to, server, port, password.clone()) {
                    Ok(publisher) => {
                        let publisher = match &ameba.blog_url {
                            Some(url) if is_set(&ameba.blog_url) => publisher.with_blog_url(url.clone()),
                            _ => publisher,
                        };
                        publishers.push(Arc::new(publisher));
                    }
                    Err(e) => warn!("Skipping ameba: {}", e),
                }
            }
            _ => warn!("Skipping ameba: from_email, posting_email and smtp_password are required"),
        }
    }

    if let Some(zenn) = &config.zenn {
        match &zenn.repo_path {
            Some(path) => publishers.push(Arc::new(ZennPublisher::new(path.clone()))),
            None => warn!("Skipping zenn: repo_path is not configured"),
        }
    }

    if let Some(export) = &config.markdown_export {
        let dir = export
            .export_dir
            .clone()
            .unwrap_or_else(markdown_export::default_export_dir);
        if export.labels.is_empty() {
            publishers.push(Arc::new(MarkdownExportPublisher::new(dir)));
        } else {
            for label in &export.labels {
                publishers.push(Arc::new(
                    MarkdownExportPublisher::new(dir.clone()).with_label(label.clone()),
                ));
            }
        }
    }

    debug!("Created {} publishers", publishers.len());
    Ok(publishers)
}
