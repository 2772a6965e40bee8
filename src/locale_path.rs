//! Route mapping between the two locale namespaces, and the site route manifest.
//!
//! The default locale owns the blog index (`/blog`) and everything under it;
//! the secondary locale owns `/blog/zh` and everything under that. Mapping a
//! path inserts or strips the secondary segment. Paths outside the blog, and
//! paths already in the requested namespace, come back unchanged.
//!
//! Matching is by whole path segment: `/blog/zhou` is a default-locale path.

use crate::content::ContentRepository;
use crate::error::ContentError;
use crate::i18n::Language;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePaths {
    /// Default-locale index route without a trailing slash; empty for `/`
    index: String,
    /// Secondary-locale index route
    secondary_index: String,
}

impl LocalePaths {
    /// Build the mapper for a blog mounted at `index` (e.g. `/blog`).
    pub fn new(index: &str) -> Self {
        let index = index.trim_end_matches('/').to_string();
        let secondary_index = match Language::secondary().route_segment() {
            Some(segment) => format!("{}/{}", index, segment),
            None => index.clone(),
        };
        Self {
            index,
            secondary_index,
        }
    }

    /// Index route of a locale.
    pub fn index_route(&self, lang: Language) -> String {
        let base = if lang.is_canonical() {
            &self.index
        } else {
            &self.secondary_index
        };
        join(base, "")
    }

    /// Route of a document page.
    pub fn document_route(&self, lang: Language, slug: &str) -> String {
        let base = if lang.is_canonical() {
            &self.index
        } else {
            &self.secondary_index
        };
        join(base, &format!("/{}", slug))
    }

    /// The counterpart of `path` in the default namespace.
    pub fn to_default(&self, path: &str) -> String {
        match strip_base(path, &self.secondary_index) {
            Some(rest) => join(&self.index, rest),
            None => path.to_string(),
        }
    }

    /// The counterpart of `path` in the secondary namespace.
    pub fn to_secondary(&self, path: &str) -> String {
        if strip_base(path, &self.secondary_index).is_some() {
            return path.to_string();
        }
        match strip_base(path, &self.index) {
            Some(rest) => join(&self.secondary_index, rest),
            None => path.to_string(),
        }
    }

    /// The counterpart of `path` in `lang`'s namespace.
    pub fn to_locale(&self, path: &str, lang: Language) -> String {
        if lang.is_canonical() {
            self.to_default(path)
        } else {
            self.to_secondary(path)
        }
    }

    /// The locale whose namespace `path` belongs to.
    pub fn active_locale(&self, path: &str) -> Language {
        if strip_base(path, &self.secondary_index).is_some() {
            Language::secondary()
        } else {
            Language::default_locale()
        }
    }
}

impl Default for LocalePaths {
    fn default() -> Self {
        Self::new("/blog")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Index,
    Document,
}

/// One page of the generated site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub kind: RouteKind,
    pub lang: String,
    pub route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub counterpart_route: String,
    pub counterpart_exists: bool,
}

/// Every index and document route, per locale, newest documents first.
pub fn route_manifest(
    repo: &ContentRepository,
    paths: &LocalePaths,
) -> Result<Vec<RouteEntry>, ContentError> {
    let mut entries = Vec::new();
    for lang in Language::all() {
        let other = lang.opposite();
        entries.push(RouteEntry {
            kind: RouteKind::Index,
            lang: lang.code().to_string(),
            route: paths.index_route(lang),
            slug: None,
            title: None,
            counterpart_route: paths.index_route(other),
            counterpart_exists: true,
        });

        for meta in repo.list_documents(lang)? {
            let counterpart = repo.document_path(other, &meta.slug)?;
            entries.push(RouteEntry {
                kind: RouteKind::Document,
                lang: lang.code().to_string(),
                route: paths.document_route(lang, &meta.slug),
                counterpart_route: paths.document_route(other, &meta.slug),
                counterpart_exists: counterpart.is_file(),
                slug: Some(meta.slug),
                title: Some(meta.title),
            });
        }
    }
    Ok(entries)
}

/// The remainder of `path` below `base` (`""` or starting with `/`).
fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        return match path {
            "/" => Some(""),
            p if p.starts_with('/') => Some(p),
            _ => None,
        };
    }
    let rest = path.strip_prefix(base)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() && rest.is_empty() {
        "/".to_string()
    } else {
        format!("{}{}", base, rest)
    }
}
