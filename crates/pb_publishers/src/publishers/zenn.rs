use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pb_core::{Error, PublishRequest, PublishResult, Publisher, Result};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, error, info};

const ZENN_BASE_URL: &str = "https://zenn.dev/articles";
const MAX_TOPICS: usize = 5;
const MIN_SLUG_CHARS: usize = 12;
const MAX_SLUG_CHARS: usize = 50;
const SLUG_HASH_CHARS: usize = 12;

/// Publishes by committing an article into a local Zenn CLI repository and
/// pushing it to `origin`. Zenn's GitHub integration picks it up from there.
#[derive(Debug)]
pub struct ZennPublisher {
    repo_path: PathBuf,
}

impl ZennPublisher {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into() }
    }

    async fn git(&self, args: &[&str]) -> Result<()> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .current_dir(&self.repo_path)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Publish(format!(
                "git {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn commit_and_push(&self, request: &PublishRequest) -> Result<String> {
        let articles_dir = self.repo_path.join("articles");
        tokio::fs::create_dir_all(&articles_dir).await?;

        let slug = slug(&request.title);
        let file_name = format!("{}.md", slug);
        tokio::fs::write(articles_dir.join(&file_name), article_markdown(request)).await?;

        let relative = Path::new("articles").join(&file_name);
        let relative = relative.to_string_lossy();
        self.git(&["add", &*relative]).await?;
        self.git(&["commit", "-m", &format!("Add article: {}", request.title)]).await?;
        self.git(&["push", "origin"]).await?;

        Ok(format!("{}/{}", ZENN_BASE_URL, slug))
    }
}

/// Zenn slug for a title: 12 to 50 chars of `[a-z0-9_-]`.
///
/// Anything outside that set becomes a hyphen, so the slug is always a
/// plain file name. Titles with too few ASCII characters left, such as
/// Japanese ones, get a suffix derived from a hash of the title; the same
/// title always maps to the same slug.
pub(crate) fn slug(title: &str) -> String {
    let mut base = String::new();
    for c in title.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            base.push(c);
        } else if !base.is_empty() && !base.ends_with('-') {
            base.push('-');
        }
    }
    let base: String = base.chars().take(MAX_SLUG_CHARS).collect();
    let base = base.trim_matches('-');
    if base.len() >= MIN_SLUG_CHARS {
        return base.to_string();
    }

    let digest = format!("{:x}", Sha256::digest(title.as_bytes()));
    let prefix = if base.is_empty() { "article" } else { base };
    format!("{}-{}", prefix, &digest[..SLUG_HASH_CHARS])
}

pub(crate) fn article_markdown(request: &PublishRequest) -> String {
    let topics: String = request
        .tags
        .iter()
        .take(MAX_TOPICS)
        .map(|t| format!("  - \"{}\"\n", t))
        .collect();
    let published = !request.status.is_draft();
    format!(
        "---\ntitle: \"{}\"\nemoji: \"📝\"\ntype: \"tech\"\ntopics:\n{}published: {}\n---\n\n{}\n",
        request.title, topics, published, request.body
    )
}

#[async_trait]
impl Publisher for ZennPublisher {
    fn service_name(&self) -> &str {
        "zenn"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult> {
        match self.commit_and_push(request).await {
            Ok(url) => {
                info!("Pushed Zenn article: {}", url);
                Ok(PublishResult::success(self.service_name(), url))
            }
            Err(e) => {
                error!("Zenn publish failed: {}", e);
                Ok(PublishResult::failure(self.service_name(), e.to_string()))
            }
        }
    }

    async fn test_connection(&self) -> bool {
        match self.git(&["remote", "get-url", "origin"]).await {
            Ok(()) => true,
            Err(e) => {
                error!("Zenn connection test failed: {}", e);
                false
            }
        }
    }
}
