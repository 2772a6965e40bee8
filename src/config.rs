use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Clone)]
pub struct Config {
    // Anthropic
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_api_url: String,

    // Translation requests
    pub translation_max_tokens: u32,
    pub translation_timeout_secs: u64,
    pub translation_concurrency: usize,

    // Content layout
    pub content_root: PathBuf,
    pub content_extension: String,
    pub blog_index_route: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Anthropic - the key is the only required setting
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .context("ANTHROPIC_API_KEY not set")?,
            anthropic_model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string()),
            anthropic_api_url: std::env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_API_URL.to_string()),

            // Translation requests
            translation_max_tokens: parse_env("TRANSLATION_MAX_TOKENS").unwrap_or(8192),
            translation_timeout_secs: parse_env("TRANSLATION_TIMEOUT_SECS").unwrap_or(120),
            translation_concurrency: parse_env("TRANSLATION_CONCURRENCY").unwrap_or(1),

            // Content layout
            content_root: std::env::var("CONTENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("content/blog")),
            content_extension: std::env::var("CONTENT_EXTENSION")
                .map(|ext| ext.trim_start_matches('.').to_string())
                .unwrap_or_else(|_| "mdx".to_string()),
            blog_index_route: std::env::var("BLOG_INDEX_ROUTE")
                .unwrap_or_else(|_| "/blog".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.translation_concurrency == 0 {
            bail!("TRANSLATION_CONCURRENCY must be at least 1");
        }
        if self.translation_timeout_secs == 0 {
            bail!("TRANSLATION_TIMEOUT_SECS must be at least 1");
        }
        if self.content_extension.is_empty() {
            bail!("CONTENT_EXTENSION must not be empty");
        }
        if !self.blog_index_route.starts_with('/') {
            bail!(
                "BLOG_INDEX_ROUTE must start with '/', got '{}'",
                self.blog_index_route
            );
        }
        Ok(())
    }

    /// Per-request deadline for a single translation call
    pub fn translation_timeout(&self) -> Duration {
        Duration::from_secs(self.translation_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
