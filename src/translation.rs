use crate::i18n::{Language, TranslationValidator};
use anyhow::{bail, Result};
use std::future::Future;
use tracing::warn;

/// An external text-translation capability.
///
/// Receives a system instruction and the text to translate and returns the
/// translated text. Implementations are remote and may fail or time out.
pub trait Translator: Send + Sync {
    fn translate(
        &self,
        instructions: &str,
        text: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Build the system prompt for translating blog content
pub fn build_translation_system_prompt(source: Language, target: Language) -> String {
    format!(
        r#"You are a professional technical translator specializing in academic soil science and knowledge engineering content.
Translate the given {} text to {}.

## Translation Rules

### Preserve EXACTLY as-is:
- All Markdown formatting (headings, bold, italic, lists, tables)
- All MDX/JSX tags (e.g. <ComponentName>, <br/>, etc.)
- All code blocks (content between triple backticks) UNCHANGED - do not translate code
- All inline code (content between single backticks) UNCHANGED
- All URLs and file paths UNCHANGED

### DO translate:
- Natural language prose
- Heading text and list item text

### Output:
- Output ONLY the translated content, no explanations"#,
        source.name(),
        target.name()
    )
}

/// Translate one field of a document from `source` to `target`.
///
/// Blank input and same-language requests return the input without calling
/// the translator. The result is checked against the original for altered
/// code, URLs and tags; problems are logged, not rejected.
pub async fn translate_field<T>(
    translator: &T,
    text: &str,
    source: Language,
    target: Language,
) -> Result<String>
where
    T: Translator,
{
    if source == target || text.trim().is_empty() {
        return Ok(text.to_string());
    }

    let instructions = build_translation_system_prompt(source, target);
    let translated = translator.translate(&instructions, text).await?;

    if translated.trim().is_empty() {
        bail!(
            "Translator returned empty output for {} -> {}",
            source.code(),
            target.code()
        );
    }

    let validation = TranslationValidator::validate(text, &translated);
    if validation.has_warnings() {
        warn!(
            "Translation validation warnings for {} -> {}: {:?}",
            source.code(),
            target.code(),
            validation.warnings
        );
    }
    if validation.has_errors() {
        warn!(
            "Translation validation errors for {} -> {}: {:?}",
            source.code(),
            target.code(),
            validation.errors
        );
    }

    Ok(translated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every request and answers from a fixed function
    struct RecordingTranslator {
        calls: Mutex<Vec<(String, String)>>,
        reply: fn(&str) -> Result<String>,
    }

    impl RecordingTranslator {
        fn new(reply: fn(&str) -> Result<String>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reply,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Translator for RecordingTranslator {
        async fn translate(&self, instructions: &str, text: &str) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((instructions.to_string(), text.to_string()));
            (self.reply)(text)
        }
    }

    // ==================== System Prompt Tests ====================

    #[test]
    fn test_system_prompt_names_both_languages() {
        let prompt = build_translation_system_prompt(Language::ENGLISH, Language::CHINESE);
        assert!(prompt.contains("Translate the given English text to Simplified Chinese"));

        let prompt = build_translation_system_prompt(Language::CHINESE, Language::ENGLISH);
        assert!(prompt.contains("Translate the given Simplified Chinese text to English"));
    }

    #[test]
    fn test_system_prompt_lists_verbatim_regions() {
        let prompt = build_translation_system_prompt(Language::ENGLISH, Language::CHINESE);
        assert!(prompt.contains("Markdown formatting"));
        assert!(prompt.contains("MDX/JSX tags"));
        assert!(prompt.contains("code blocks"));
        assert!(prompt.contains("inline code"));
        assert!(prompt.contains("URLs and file paths"));
        assert!(prompt.contains("Output ONLY the translated content"));
    }

    // ==================== translate_field Tests ====================

    #[tokio::test]
    async fn test_translate_field_delegates_with_instructions() {
        let translator = RecordingTranslator::new(|_| Ok("土壤 pH".to_string()));

        let result = translate_field(&translator, "Soil pH", Language::ENGLISH, Language::CHINESE)
            .await
            .expect("Should succeed");

        assert_eq!(result, "土壤 pH");
        let calls = translator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Simplified Chinese"));
        assert_eq!(calls[0].1, "Soil pH");
    }

    #[tokio::test]
    async fn test_translate_field_skips_blank_text() {
        let translator = RecordingTranslator::new(|_| Ok("unused".to_string()));

        let result = translate_field(&translator, "  \n", Language::ENGLISH, Language::CHINESE)
            .await
            .unwrap();

        assert_eq!(result, "  \n");
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translate_field_same_language_is_identity() {
        let translator = RecordingTranslator::new(|_| Ok("unused".to_string()));

        let result = translate_field(&translator, "Hello", Language::ENGLISH, Language::ENGLISH)
            .await
            .unwrap();

        assert_eq!(result, "Hello");
        assert_eq!(translator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_translate_field_rejects_empty_output() {
        let translator = RecordingTranslator::new(|_| Ok("   ".to_string()));

        let result =
            translate_field(&translator, "Soil pH", Language::ENGLISH, Language::CHINESE).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty output"));
    }

    #[tokio::test]
    async fn test_translate_field_propagates_translator_error() {
        let translator = RecordingTranslator::new(|_| Err(anyhow::anyhow!("Anthropic API error (500): boom")));

        let result =
            translate_field(&translator, "Soil pH", Language::ENGLISH, Language::CHINESE).await;

        assert!(result.unwrap_err().to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_translate_field_keeps_output_with_altered_code() {
        // Validation problems are logged only
        let translator = RecordingTranslator::new(|_| Ok("运行 `程序`".to_string()));

        let result = translate_field(
            &translator,
            "Run `program`",
            Language::ENGLISH,
            Language::CHINESE,
        )
        .await
        .unwrap();

        assert_eq!(result, "运行 `程序`");
    }
}
