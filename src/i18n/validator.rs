//! Translation quality validation module.
//!
//! Checks that the parts of a Markdown/MDX document the translator was told to
//! leave alone (fenced code blocks, inline code, URLs, links, component tags)
//! came back unchanged. Reports are advisory: the pipeline logs them and
//! still writes the translation.

use regex::Regex;
use std::sync::OnceLock;

/// Findings from comparing a translation with its original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Verbatim regions (code) that were altered
    pub errors: Vec<String>,
    /// Links, URLs or tags that look different
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

/// How two extractions are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compare {
    /// Same items in the same order
    Exact,
    /// Same number of items; link text is expected to change
    Count,
}

struct Check {
    label: &'static str,
    severity: Severity,
    compare: Compare,
    extract: fn(&str) -> Vec<String>,
}

/// Fenced blocks are compared on the raw text; the rest on prose with fenced
/// blocks removed, so code is not mistaken for links or tags.
const PROSE_CHECKS: &[Check] = &[
    Check {
        label: "Inline code",
        severity: Severity::Error,
        compare: Compare::Exact,
        extract: TranslationValidator::extract_inline_code,
    },
    Check {
        label: "URL",
        severity: Severity::Warning,
        compare: Compare::Exact,
        extract: TranslationValidator::extract_urls,
    },
    Check {
        label: "Markdown link",
        severity: Severity::Warning,
        compare: Compare::Count,
        extract: TranslationValidator::extract_markdown_links,
    },
    Check {
        label: "Component tag",
        severity: Severity::Warning,
        compare: Compare::Exact,
        extract: TranslationValidator::extract_tag_names,
    },
];

/// Checks that regions the translator must leave alone came back unchanged.
pub struct TranslationValidator;

static FENCED_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
static INLINE_CODE_REGEX: OnceLock<Regex> = OnceLock::new();
static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static MARKDOWN_LINK_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn fenced_block_regex() -> &'static Regex {
    FENCED_BLOCK_REGEX.get_or_init(|| Regex::new(r"(?ms)^[ \t]*```.*?^[ \t]*```[^\n]*").unwrap())
}

fn matches(regex: &Regex, text: &str) -> Vec<String> {
    regex.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

impl TranslationValidator {
    /// Compare `translated` against `original`.
    ///
    /// Fenced code blocks and inline code spans must match exactly (errors);
    /// URLs, Markdown link counts and MDX/JSX tag names should match (warnings).
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_blocks = Self::extract_fenced_blocks(original);
        let trans_blocks = Self::extract_fenced_blocks(translated);
        if orig_blocks != trans_blocks {
            report.errors.push(format!(
                "Fenced code block mismatch: original has {} blocks, translation has {} (or contents differ)",
                orig_blocks.len(),
                trans_blocks.len()
            ));
        }

        let orig_prose = Self::without_fenced_blocks(original);
        let trans_prose = Self::without_fenced_blocks(translated);
        for check in PROSE_CHECKS {
            let expected = (check.extract)(&orig_prose);
            let actual = (check.extract)(&trans_prose);
            let message = match check.compare {
                Compare::Exact if expected != actual => format!(
                    "{} mismatch: original has {:?}, translation has {:?}",
                    check.label, expected, actual
                ),
                Compare::Count if expected.len() != actual.len() => format!(
                    "{} count mismatch: original has {}, translation has {}",
                    check.label,
                    expected.len(),
                    actual.len()
                ),
                _ => continue,
            };
            match check.severity {
                Severity::Error => report.errors.push(message),
                Severity::Warning => report.warnings.push(message),
            }
        }

        report
    }

    /// Fenced code blocks, fence lines included
    fn extract_fenced_blocks(text: &str) -> Vec<String> {
        fenced_block_regex()
            .find_iter(text)
            .map(|m| m.as_str().trim_end().to_string())
            .collect()
    }

    fn without_fenced_blocks(text: &str) -> String {
        fenced_block_regex().replace_all(text, "").into_owned()
    }

    fn extract_inline_code(prose: &str) -> Vec<String> {
        let regex = INLINE_CODE_REGEX.get_or_init(|| Regex::new(r"`[^`\n]+`").unwrap());
        matches(regex, prose)
    }

    fn extract_urls(prose: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| Regex::new(r#"https?://[^\s)\]>"'`]+"#).unwrap());
        matches(regex, prose)
    }

    /// `[text](target)` links (approximate)
    fn extract_markdown_links(prose: &str) -> Vec<String> {
        let regex =
            MARKDOWN_LINK_REGEX.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
        matches(regex, prose)
    }

    /// MDX/JSX/HTML tag names in order, closing tags prefixed with '/'.
    /// Attribute values may be translated, so only names count.
    fn extract_tag_names(prose: &str) -> Vec<String> {
        let regex = TAG_REGEX
            .get_or_init(|| Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9.\-]*)(?:\s[^<>]*)?/?>").unwrap());
        regex
            .captures_iter(prose)
            .map(|cap| format!("{}{}", &cap[1], &cap[2]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Fenced Block Tests ====================

    #[test]
    fn test_extract_fenced_blocks() {
        let text = "Intro\n\n```rust\nfn main() {}\n```\n\nOutro";
        let blocks = TranslationValidator::extract_fenced_blocks(text);
        assert_eq!(blocks, vec!["```rust\nfn main() {}\n```"]);
    }

    #[test]
    fn test_extract_fenced_blocks_multiple() {
        let text = "```\na\n```\ntext\n```sh\nb\n```\n";
        let blocks = TranslationValidator::extract_fenced_blocks(text);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_extract_fenced_blocks_none() {
        assert!(TranslationValidator::extract_fenced_blocks("plain prose").is_empty());
    }

    // ==================== Inline Code Tests ====================

    #[test]
    fn test_extract_inline_code() {
        let text = "Run `cargo test` and then `ls -la`.";
        let spans = TranslationValidator::extract_inline_code(text);
        assert_eq!(spans, vec!["`cargo test`", "`ls -la`"]);
    }

    #[test]
    fn test_fenced_blocks_hide_their_inline_code() {
        let text = "Use `x`.\n\n```\nlet y = `template`;\n```\n";
        let prose = TranslationValidator::without_fenced_blocks(text);
        assert_eq!(TranslationValidator::extract_inline_code(&prose), vec!["`x`"]);
    }

    // ==================== URL Tests ====================

    #[test]
    fn test_extract_urls() {
        let text = "See https://example.com and [docs](http://test.org/a).";
        let urls = TranslationValidator::extract_urls(text);
        assert_eq!(urls, vec!["https://example.com", "http://test.org/a"]);
    }

    #[test]
    fn test_extract_urls_in_jsx_attribute() {
        let text = r#"<Figure src="https://cdn.example.com/a.png" />"#;
        let urls = TranslationValidator::extract_urls(text);
        assert_eq!(urls, vec!["https://cdn.example.com/a.png"]);
    }

    // ==================== Tag Tests ====================

    #[test]
    fn test_extract_tag_names() {
        let text = r#"<Callout type="info">Note<br/></Callout>"#;
        let tags = TranslationValidator::extract_tag_names(text);
        assert_eq!(tags, vec!["Callout", "br", "/Callout"]);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_validate_perfect_translation() {
        let original = "# Soil pH\n\nRun `ph-meter` and read the [guide](https://soil.example.org).\n\n```\nph = 6.5\n```\n";
        let translated = "# 土壤 pH\n\n运行 `ph-meter` 并阅读[指南](https://soil.example.org)。\n\n```\nph = 6.5\n```\n";

        let report = TranslationValidator::validate(original, translated);
        assert!(report.is_clean(), "unexpected report: {:?}", report);
    }

    #[test]
    fn test_validate_translated_code_block_is_error() {
        let original = "```\n# compute the mean\n```\n";
        let translated = "```\n# 计算平均值\n```\n";

        let report = TranslationValidator::validate(original, translated);
        assert!(report.has_errors());
        assert!(report.errors[0].contains("Fenced code block mismatch"));
    }

    #[test]
    fn test_validate_translated_inline_code_is_error() {
        let original = "Call `mean()` here.";
        let translated = "在这里调用 `平均()`。";

        let report = TranslationValidator::validate(original, translated);
        assert!(report.has_errors());
        assert!(report.errors[0].contains("Inline code mismatch"));
    }

    #[test]
    fn test_validate_missing_url_is_warning() {
        let original = "Read more at https://example.com";
        let translated = "在此阅读更多";

        let report = TranslationValidator::validate(original, translated);
        assert!(!report.has_errors());
        assert!(report.warnings[0].contains("URL mismatch"));
    }

    #[test]
    fn test_validate_translated_link_text_is_clean() {
        let original = "See [the guide](https://example.com/guide).";
        let translated = "参见[指南](https://example.com/guide)。";

        assert!(TranslationValidator::validate(original, translated).is_clean());
    }

    #[test]
    fn test_validate_dropped_link_is_count_warning() {
        let original = "See [a](/a) and [b](/b).";
        let translated = "参见 [a](/a)。";

        let report = TranslationValidator::validate(original, translated);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("Markdown link count mismatch")));
    }

    #[test]
    fn test_validate_dropped_component_is_warning() {
        let original = "<Callout>Careful</Callout>";
        let translated = "小心";

        let report = TranslationValidator::validate(original, translated);
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("Component tag mismatch")));
    }

    #[test]
    fn test_report_with_only_warnings_has_no_errors() {
        let report = ValidationReport {
            errors: Vec::new(),
            warnings: vec!["URL mismatch".to_string()],
        };
        assert!(!report.is_clean());
        assert!(report.has_warnings());
        assert!(!report.has_errors());
        assert!(ValidationReport::default().is_clean());
    }
}
