//! Locales and translation checks.
//!
//! `registry` holds the static locale table, `language` the `Language` handle
//! built from it, and `validator` the checks run on translated text.
//!
//! ```
//! use bilingual_blog::i18n::Language;
//!
//! let secondary = Language::default_locale().opposite();
//! assert_eq!(secondary.content_subdir(), Some("zh"));
//! ```

mod language;
mod registry;
mod validator;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
pub use validator::{TranslationValidator, ValidationReport};
