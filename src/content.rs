//! Per-locale document repository.
//!
//! Layout: default-locale documents live directly in the content root as
//! `<slug>.<ext>`; the secondary locale's documents live in the locale's
//! subdirectory of that root (`zh/<slug>.<ext>`).

use crate::error::ContentError;
use crate::frontmatter::{self, Frontmatter};
use crate::i18n::Language;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Listing metadata for a document (everything except the body).
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub slug: String,
    pub lang: Language,
    /// Falls back to the slug when the frontmatter has no title
    pub title: String,
    /// Raw `date` value as written
    pub date: String,
    /// `date` parsed as UTC; the Unix epoch when missing or unparseable
    pub published: DateTime<Utc>,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub cover_image: Option<String>,
}

/// A fully loaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub meta: DocumentMeta,
    pub frontmatter: Frontmatter,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct ContentRepository {
    root: PathBuf,
    extension: String,
}

impl ContentRepository {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a locale's documents.
    pub fn locale_dir(&self, lang: Language) -> PathBuf {
        match lang.content_subdir() {
            Some(subdir) => self.root.join(subdir),
            None => self.root.clone(),
        }
    }

    /// Path where the document `(lang, slug)` lives or would live.
    pub fn document_path(&self, lang: Language, slug: &str) -> Result<PathBuf, ContentError> {
        if !is_valid_slug(slug) {
            return Err(ContentError::InvalidSlug(slug.to_string()));
        }
        Ok(self
            .locale_dir(lang)
            .join(format!("{}.{}", slug, self.extension)))
    }

    /// Slugs of every document in the locale, sorted and duplicate-free.
    /// A missing locale directory yields an empty list.
    pub fn list_slugs(&self, lang: Language) -> Result<Vec<String>, ContentError> {
        let dir = self.locale_dir(lang);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No {} content directory at {}", lang, dir.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(ContentError::Io { path: dir, source }),
        };

        let mut slugs = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|source| ContentError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(slug) = self.slug_of(&path) {
                slugs.insert(slug);
            }
        }

        Ok(slugs.into_iter().collect())
    }

    /// Metadata for every document in the locale, newest first.
    ///
    /// Documents without a parseable date sort last. Equal dates keep slug
    /// order. Unreadable or malformed files are skipped with a warning; a
    /// missing locale directory yields an empty list.
    pub fn list_documents(&self, lang: Language) -> Result<Vec<DocumentMeta>, ContentError> {
        let mut documents = Vec::new();
        for slug in self.list_slugs(lang)? {
            match self.load_document(lang, &slug) {
                Ok(document) => documents.push(document.meta),
                Err(e) => warn!("Skipping {} document '{}': {}", lang, slug, e),
            }
        }

        // Stable: ties stay in slug order
        documents.sort_by(|a, b| b.published.cmp(&a.published));
        Ok(documents)
    }

    /// Read and parse one document.
    pub fn load_document(&self, lang: Language, slug: &str) -> Result<Document, ContentError> {
        let path = self.document_path(lang, slug)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ContentError::NotFound {
                    lang,
                    slug: slug.to_string(),
                    path,
                });
            }
            Err(source) => return Err(ContentError::Io { path, source }),
        };

        let parsed = frontmatter::parse(&raw).map_err(|source| ContentError::Frontmatter {
            path: path.clone(),
            source,
        })?;
        let fields = parsed.fields();
        let meta = build_meta(slug, lang, &fields);

        Ok(Document {
            meta,
            frontmatter: fields,
            body: parsed.body,
        })
    }

    fn slug_of(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        if ext != self.extension {
            return None;
        }
        let slug = path.file_stem()?.to_str()?;
        if is_valid_slug(slug) {
            Some(slug.to_string())
        } else {
            debug!("Ignoring {}: not a valid slug", path.display());
            None
        }
    }
}

/// Slugs are file stems: non-empty, no separators, no leading dot (hidden
/// and temporary files).
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(['/', '\\'])
        && !slug.chars().any(char::is_control)
}

fn build_meta(slug: &str, dir_lang: Language, fields: &Frontmatter) -> DocumentMeta {
    let date = fields.get("date").unwrap_or_default();
    DocumentMeta {
        slug: slug.to_string(),
        lang: declared_language(fields, dir_lang),
        title: fields
            .get_non_empty("title")
            .unwrap_or_else(|| slug.to_string()),
        published: parse_date(&date).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        date,
        description: fields.get("description").unwrap_or_default(),
        tags: fields
            .get_list("tags")
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect(),
        cover_image: fields.get_non_empty("coverImage"),
    }
}

/// The document's `lang` tag, defaulting to the directory's locale.
pub fn declared_language(fields: &Frontmatter, dir_lang: Language) -> Language {
    match fields.get_non_empty("lang") {
        Some(code) => Language::from_code(&code).unwrap_or_else(|e| {
            warn!("{}; treating document as {}", e, dir_lang);
            dir_lang
        }),
        None => dir_lang,
    }
}

/// Parse a frontmatter date as a UTC timestamp.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}
