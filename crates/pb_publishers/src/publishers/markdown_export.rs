use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pb_core::{PublishRequest, PublishResult, Publisher, Result};
use tracing::{error, info};

pub const DEFAULT_LABEL: &str = "markdown_export";
const MAX_FILE_STEM_CHARS: usize = 100;

/// `~/.postblog/exports`, or `./.postblog/exports` without a home directory.
pub fn default_export_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".postblog")
        .join("exports")
}

/// Writes articles as markdown files for services without a posting API.
/// The label is the service name, so one directory can back several
/// export-only targets.
#[derive(Debug, Clone)]
pub struct MarkdownExportPublisher {
    export_dir: PathBuf,
    label: String,
}

impl MarkdownExportPublisher {
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    async fn export(&self, request: &PublishRequest) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.export_dir).await?;
        let path = self
            .export_dir
            .join(format!("{}.md", safe_file_stem(&request.title)));
        tokio::fs::write(&path, export_markdown(request)).await?;
        Ok(path)
    }

    async fn check_writable(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.export_dir).await?;
        let marker = self.export_dir.join(".connection_test");
        tokio::fs::write(&marker, "test").await?;
        tokio::fs::remove_file(&marker).await?;
        Ok(())
    }
}

/// Keeps alphanumerics, `-`, `_` and spaces; everything else becomes `_`.
pub(crate) fn safe_file_stem(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_STEM_CHARS)
        .collect()
}

pub(crate) fn export_markdown(request: &PublishRequest) -> String {
    format!(
        "---\ntitle: \"{}\"\ntags: [{}]\n---\n\n{}\n",
        request.title,
        request.tags.join(", "),
        request.body
    )
}

#[async_trait]
impl Publisher for MarkdownExportPublisher {
    fn service_name(&self) -> &str {
        &self.label
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        match self.export(request).await {
            Ok(path) => {
                info!("Exported markdown for {}: {}", self.label, path.display());
                Ok(PublishResult::success(&self.label, path.display().to_string()))
            }
            Err(e) => {
                error!("Markdown export for {} failed: {}", self.label, e);
                Ok(PublishResult::failure(&self.label, e.to_string()))
            }
        }
    }

    async fn test_connection(&self) -> bool {
        match self.check_writable().await {
            Ok(()) => true,
            Err(e) => {
                error!("Export directory {} is not writable: {}", self.export_dir.display(), e);
                false
            }
        }
    }
}
