//! Language type: validated locale handle for the two-locale system.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};
use std::fmt;

/// One of the two content locales.
///
/// Only codes in the locale table can be turned into a `Language`, so every
/// value has a content directory and a route namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
}

impl Language {
    /// The default locale.
    pub const ENGLISH: Language = Language { code: "en" };

    /// The secondary locale.
    pub const CHINESE: Language = Language { code: "zh" };

    /// Parse a frontmatter `lang` tag. Surrounding whitespace is ignored.
    pub fn from_code(code: &str) -> Result<Language> {
        let Some(config) = LanguageRegistry::lookup(code.trim()) else {
            bail!("Unknown language code '{}' (expected one of: en, zh)", code);
        };
        Ok(Language { code: config.code })
    }

    /// The default locale (content root, bare index route).
    pub fn default_locale() -> Language {
        Language {
            code: LanguageRegistry::canonical().code,
        }
    }

    /// The secondary locale (content subdirectory, prefixed routes).
    pub fn secondary() -> Language {
        Language {
            code: LanguageRegistry::secondary().code,
        }
    }

    /// Both locales, default first.
    pub fn all() -> [Language; 2] {
        [Self::default_locale(), Self::secondary()]
    }

    /// The other locale of the pair.
    pub fn opposite(&self) -> Language {
        if self.is_canonical() {
            Self::secondary()
        } else {
            Self::default_locale()
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    /// The locale table entry.
    pub fn config(&self) -> &'static LanguageConfig {
        match LanguageRegistry::lookup(self.code) {
            Some(config) => config,
            // Constructors only accept codes from the table
            None => unreachable!("'{}' is not in the locale table", self.code),
        }
    }

    /// English name of the language (e.g., "Simplified Chinese").
    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }

    /// Subdirectory of the content root for this locale, if any.
    pub fn content_subdir(&self) -> Option<&'static str> {
        self.config().content_subdir
    }

    /// Route segment under the blog index for this locale, if any.
    pub fn route_segment(&self) -> Option<&'static str> {
        self.config().route_segment
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_match_table() {
        assert_eq!(Language::ENGLISH.config(), LanguageRegistry::canonical());
        assert_eq!(Language::CHINESE.config(), LanguageRegistry::secondary());
        assert!(!Language::CHINESE.is_canonical());
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("en").unwrap(), Language::ENGLISH);
        assert_eq!(Language::from_code("zh").unwrap(), Language::CHINESE);
        assert_eq!(Language::from_code(" zh ").unwrap(), Language::CHINESE);
    }

    #[test]
    fn test_from_code_rejects_other_tags() {
        let error = Language::from_code("es").unwrap_err().to_string();
        assert!(error.contains("'es'"));
        assert!(Language::from_code("").is_err());
        assert!(Language::from_code("zh-CN").is_err());
    }

    #[test]
    fn test_default_and_secondary() {
        assert_eq!(Language::default_locale(), Language::ENGLISH);
        assert_eq!(Language::secondary(), Language::CHINESE);
        assert_eq!(Language::all(), [Language::ENGLISH, Language::CHINESE]);
    }

    #[test]
    fn test_opposite_is_an_involution() {
        assert_eq!(Language::ENGLISH.opposite(), Language::CHINESE);
        assert_eq!(Language::CHINESE.opposite(), Language::ENGLISH);
        for lang in Language::all() {
            assert_eq!(lang.opposite().opposite(), lang);
        }
    }

    #[test]
    fn test_layout_accessors() {
        assert_eq!(Language::ENGLISH.content_subdir(), None);
        assert_eq!(Language::CHINESE.content_subdir(), Some("zh"));
        assert_eq!(Language::CHINESE.route_segment(), Some("zh"));
    }

    #[test]
    fn test_display_writes_code() {
        assert_eq!(Language::CHINESE.to_string(), "zh");
        assert_eq!(format!("{}", Language::ENGLISH), "en");
    }
}
