use crate::i18n::Language;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a frontmatter block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrontmatterError {
    /// The same key appears twice in one block. Which value should win is
    /// ambiguous, so the document is rejected instead of guessing.
    #[error("duplicate frontmatter key '{key}' on line {line}")]
    DuplicateKey { key: String, line: usize },
}

/// Errors raised by the content repository.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no {lang} document with slug '{slug}' (looked for {})", .path.display())]
    NotFound {
        lang: Language,
        slug: String,
        path: PathBuf,
    },

    #[error("invalid slug '{0}': slugs must be non-empty file stems without path separators")]
    InvalidSlug(String),

    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed frontmatter in {}", .path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

/// Errors that abort translation of a single document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("failed to translate {field}: {source:#}")]
    Translation {
        field: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("another task is already writing {}", .0.display())]
    DestinationBusy(PathBuf),
}
