//! Cross-locale translation pipeline.
//!
//! For each direction (default -> secondary, then secondary -> default) every
//! authored document without a counterpart gets one generated through the
//! translator. Title, description and body are translated concurrently; the
//! counterpart is written only when all three succeed.
//!
//! Generated documents carry `lang: <target>` and `translatedFrom: <source>`.
//! Documents with a `translatedFrom` field, or whose `lang` names the other
//! locale, are derived and never used as a translation source, so repeated
//! runs cannot ping-pong a translation back over its original.

use crate::content::{ContentRepository, Document};
use crate::error::{ContentError, PipelineError};
use crate::i18n::Language;
use crate::translation::{translate_field, Translator};
use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Frontmatter field marking a generated document.
pub const TRANSLATED_FROM_KEY: &str = "translatedFrom";

/// Whether existing counterparts are kept or regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Skip documents whose counterpart already exists
    #[default]
    Incremental,
    /// Regenerate and overwrite every counterpart
    Force,
}

impl RunMode {
    /// Parse the command line: no arguments, or `--force`.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mode = RunMode::Incremental;
        for arg in args {
            match arg.as_ref() {
                "--force" => mode = RunMode::Force,
                other => bail!("Unknown argument '{}'. Usage: bilingual-blog [--force]", other),
            }
        }
        Ok(mode)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Incremental => f.write_str("incremental (skip existing)"),
            RunMode::Force => f.write_str("force (re-translate all)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: RunMode,
    /// Documents translated at the same time within one direction
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Incremental,
            concurrency: 1,
        }
    }
}

/// What happened to one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    /// Counterpart already exists (incremental mode)
    Skipped(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub lang: Language,
    pub slug: String,
    pub error: String,
}

/// Summary of a pipeline run. Paths are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// `(lang, slug)` of derived documents that were not used as sources
    pub ignored_derived: Vec<(Language, String)>,
    pub failed: Vec<FailedDocument>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} derived, {} failed",
            self.written.len(),
            self.skipped.len(),
            self.ignored_derived.len(),
            self.failed.len()
        )
    }
}

pub struct TranslationPipeline<T> {
    repo: ContentRepository,
    translator: T,
    options: PipelineOptions,
    in_flight: Mutex<HashSet<PathBuf>>,
}

impl<T: Translator> TranslationPipeline<T> {
    pub fn new(repo: ContentRepository, translator: T, options: PipelineOptions) -> Self {
        Self {
            repo,
            translator,
            options: PipelineOptions {
                concurrency: options.concurrency.max(1),
                ..options
            },
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn repository(&self) -> &ContentRepository {
        &self.repo
    }

    /// Run both directions. Per-document failures are collected in the
    /// report; only failing to enumerate a locale directory aborts the run.
    pub async fn run(&self) -> Result<RunReport, ContentError> {
        info!("Mode: {}", self.options.mode);

        let mut report = RunReport::default();
        for source in Language::all() {
            let target = source.opposite();
            info!("Pass: {} -> {}", source.name(), target.name());
            self.run_direction(source, target, &mut report).await?;
        }

        report.written.sort();
        report.skipped.sort();
        report.ignored_derived.sort_by(|a, b| (a.0.code(), &a.1).cmp(&(b.0.code(), &b.1)));
        report
            .failed
            .sort_by(|a, b| (a.lang.code(), &a.slug).cmp(&(b.lang.code(), &b.slug)));

        info!("Translation complete: {}", report);
        Ok(report)
    }

    async fn run_direction(
        &self,
        source: Language,
        target: Language,
        report: &mut RunReport,
    ) -> Result<(), ContentError> {
        let mut candidates = Vec::new();
        for slug in self.repo.list_slugs(source)? {
            match self.repo.load_document(source, &slug) {
                Ok(document) if is_derived(&document, source) => {
                    info!("  Skipping derived document: {}/{}", source, slug);
                    report.ignored_derived.push((source, slug));
                }
                Ok(document) => candidates.push(document),
                Err(e) => {
                    warn!("  Cannot read {}/{}: {}", source, slug, e);
                    report.failed.push(FailedDocument {
                        lang: source,
                        slug,
                        error: e.to_string(),
                    });
                }
            }
        }

        let results: Vec<_> = stream::iter(candidates)
            .map(|document| async move {
                let slug = document.meta.slug.clone();
                let result = self.translate_document(&document, source, target).await;
                (slug, result)
            })
            .buffer_unordered(self.options.concurrency)
            .collect()
            .await;

        for (slug, result) in results {
            match result {
                Ok(Outcome::Written(path)) => report.written.push(path),
                Ok(Outcome::Skipped(path)) => report.skipped.push(path),
                Err(e) => {
                    error!("  Failed {}/{}: {}", source, slug, e);
                    report.failed.push(FailedDocument {
                        lang: source,
                        slug,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Generate the `target` counterpart of one source document.
    pub async fn translate_document(
        &self,
        document: &Document,
        source: Language,
        target: Language,
    ) -> Result<Outcome, PipelineError> {
        let slug = &document.meta.slug;
        let destination = self.repo.document_path(target, slug)?;

        let exists = tokio::fs::try_exists(&destination)
            .await
            .map_err(|source| PipelineError::Io {
                path: destination.clone(),
                source,
            })?;
        if exists && self.options.mode == RunMode::Incremental {
            info!("  Skipping (exists): {}", destination.display());
            return Ok(Outcome::Skipped(destination));
        }

        let _claim = DestinationClaim::acquire(&self.in_flight, &destination)?;
        info!("  {}/{} -> {}", source, slug, destination.display());

        let title = document.frontmatter.get_non_empty("title");
        let description = document.frontmatter.get_non_empty("description");

        // Dropping the join on the first error cancels the sibling requests
        let (title, description, body) = futures::try_join!(
            self.translate_optional(title.as_deref(), "title", source, target),
            self.translate_optional(description.as_deref(), "description", source, target),
            self.translate_body(&document.body, document.frontmatter.newline(), source, target),
        )?;

        let mut frontmatter = document.frontmatter.clone();
        if let Some(title) = title {
            frontmatter.set_quoted("title", &title);
        }
        if let Some(description) = description {
            frontmatter.set_quoted("description", &description);
        }
        frontmatter.set("lang", target.code());
        frontmatter.set(TRANSLATED_FROM_KEY, source.code());

        let output = format!("{}{}", frontmatter.render(), body);
        write_atomically(&destination, &output)
            .await
            .map_err(|source| PipelineError::Io {
                path: destination.clone(),
                source,
            })?;

        info!("  Written: {}", destination.display());
        Ok(Outcome::Written(destination))
    }

    async fn translate_optional(
        &self,
        text: Option<&str>,
        field: &'static str,
        source: Language,
        target: Language,
    ) -> Result<Option<String>, PipelineError> {
        let Some(text) = text else {
            return Ok(None);
        };
        let translated = translate_field(&self.translator, text, source, target)
            .await
            .map_err(|e| PipelineError::Translation { field, source: e })?;
        Ok(Some(translated))
    }

    async fn translate_body(
        &self,
        body: &str,
        newline: &str,
        source: Language,
        target: Language,
    ) -> Result<String, PipelineError> {
        let translated = translate_field(&self.translator, body, source, target)
            .await
            .map_err(|e| PipelineError::Translation {
                field: "body",
                source: e,
            })?;
        let translated = reattach_outer_whitespace(body, &translated);
        Ok(with_line_endings(&translated, newline))
    }
}

/// Derived documents are never translation sources.
pub fn is_derived(document: &Document, dir_lang: Language) -> bool {
    document.frontmatter.contains_key(TRANSLATED_FROM_KEY) || document.meta.lang != dir_lang
}

/// The translator trims its output; restore the whitespace around the
/// source body: blank lines after the fence, indentation of the first line
/// (indented code or JSX) and the final line ending.
fn reattach_outer_whitespace(original: &str, translated: &str) -> String {
    if original.trim().is_empty() {
        return translated.to_string();
    }
    let leading = &original[..original.len() - original.trim_start().len()];
    let trailing = &original[original.trim_end().len()..];
    format!("{}{}{}", leading, translated.trim(), trailing)
}

/// Rewrite every line break of `text` as `newline`; the translator answers
/// with LF whatever the source used.
fn with_line_endings(text: &str, newline: &str) -> String {
    if newline == "\n" {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\n', newline)
}

/// Marks a destination as being written; released on drop.
struct DestinationClaim<'a> {
    in_flight: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}

impl<'a> DestinationClaim<'a> {
    fn acquire(
        in_flight: &'a Mutex<HashSet<PathBuf>>,
        path: &Path,
    ) -> Result<Self, PipelineError> {
        let mut paths = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !paths.insert(path.to_path_buf()) {
            return Err(PipelineError::DestinationBusy(path.to_path_buf()));
        }
        Ok(Self {
            in_flight,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DestinationClaim<'_> {
    fn drop(&mut self) {
        let mut paths = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        paths.remove(&self.path);
    }
}

/// Write through a temporary sibling and rename, so readers see either the
/// old file or the complete new one.
async fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir).await?;

    let temp_path = staging_path(dir, path);
    tokio::fs::write(&temp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Hidden sibling unique to this process; listing ignores it (leading dot,
/// `tmp` extension).
fn staging_path(dir: &Path, path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!(".{}.{}.tmp", file_name, std::process::id()))
}
