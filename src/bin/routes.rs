//! Route manifest binary - prints every blog route as JSON
//!
//! Usage:
//!   cargo run --bin routes
//!
//! Does not need ANTHROPIC_API_KEY.
//!
//! Optional:
//! - CONTENT_ROOT (defaults to content/blog)
//! - CONTENT_EXTENSION (defaults to mdx)
//! - BLOG_INDEX_ROUTE (defaults to /blog)

use anyhow::{Context, Result};
use bilingual_blog::{
    content::ContentRepository,
    locale_path::{route_manifest, LocalePaths},
};
use std::path::PathBuf;
use tracing::info;

/// Minimal config for the manifest (no translation settings required)
struct RoutesConfig {
    content_root: PathBuf,
    content_extension: String,
    blog_index_route: String,
}

impl RoutesConfig {
    fn from_env() -> Self {
        Self {
            content_root: std::env::var("CONTENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("content/blog")),
            content_extension: std::env::var("CONTENT_EXTENSION")
                .unwrap_or_else(|_| "mdx".to_string()),
            blog_index_route: std::env::var("BLOG_INDEX_ROUTE")
                .unwrap_or_else(|_| "/blog".to_string()),
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bilingual_blog=warn".parse()?),
        )
        .init();

    let config = RoutesConfig::from_env();
    let repo = ContentRepository::new(config.content_root, config.content_extension);
    let paths = LocalePaths::new(&config.blog_index_route);

    let manifest = route_manifest(&repo, &paths)
        .with_context(|| format!("Failed to read content under {}", repo.root().display()))?;
    info!("{} routes", manifest.len());

    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
    println!("{}", json);
    Ok(())
}
