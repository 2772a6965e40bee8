use anyhow::{bail, Result};
use bilingual_blog::{
    anthropic::AnthropicClient,
    config::Config,
    content::ContentRepository,
    pipeline::{PipelineOptions, RunMode, TranslationPipeline},
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in CI)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bilingual_blog=info".parse()?),
        )
        .init();

    let mode = RunMode::from_args(std::env::args().skip(1))?;

    // Missing credentials stop the run before any document is read
    let config = Config::from_env()?;

    info!("Starting blog translation");
    info!("Content root: {}", config.content_root.display());
    let client = AnthropicClient::new(&config)?;
    info!("Model: {}", client.model());
    let repo = ContentRepository::new(&config.content_root, &config.content_extension);
    let pipeline = TranslationPipeline::new(
        repo,
        client,
        PipelineOptions {
            mode,
            concurrency: config.translation_concurrency,
        },
    );

    let report = pipeline.run().await?;

    for failure in &report.failed {
        error!("{}/{}: {}", failure.lang, failure.slug, failure.error);
    }
    if report.has_failures() {
        bail!("{} document(s) failed to translate", report.failed.len());
    }

    info!("Translation finished: {}", report);
    Ok(())
}
