//! The locale table: both content locales and where their documents and
//! routes live.
//!
//! The blog is a fixed two-locale system. The default locale owns the content
//! root and the bare index route; the secondary locale lives in a subdirectory
//! of the content root and under an extra route segment.

/// Static description of one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Frontmatter `lang` tag and directory/route name (e.g. "en", "zh")
    pub code: &'static str,
    /// English name, used in translation instructions
    pub name: &'static str,
    /// The default locale; exactly one entry has this set
    pub is_canonical: bool,
    /// Subdirectory of the content root; `None` for the root itself
    pub content_subdir: Option<&'static str>,
    /// Segment appended to the blog index route; `None` for the bare index
    pub route_segment: Option<&'static str>,
}

/// Default locale first.
static LANGUAGES: [LanguageConfig; 2] = [
    LanguageConfig {
        code: "en",
        name: "English",
        is_canonical: true,
        content_subdir: None,
        route_segment: None,
    },
    LanguageConfig {
        code: "zh",
        name: "Simplified Chinese",
        is_canonical: false,
        content_subdir: Some("zh"),
        route_segment: Some("zh"),
    },
];

/// Lookups over the locale table.
pub struct LanguageRegistry;

impl LanguageRegistry {
    pub fn lookup(code: &str) -> Option<&'static LanguageConfig> {
        LANGUAGES.iter().find(|lang| lang.code == code)
    }

    pub fn canonical() -> &'static LanguageConfig {
        &LANGUAGES[0]
    }

    pub fn secondary() -> &'static LanguageConfig {
        &LANGUAGES[1]
    }
}
