//! Description translation seam.
//!
//! Ranking wants English text for keyword matching, but postings often
//! arrive in German. A `Translator` implementation does the actual
//! translation; this module only decides whether one is needed and
//! keeps the failure mode soft (rank on the raw text rather than
//! blocking the record).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Translation backend unavailable: {0}")]
    Unavailable(String),

    #[error("Translation failed: {0}")]
    Failed(String),
}

/// Translates a posting description into the target language.
pub trait Translator {
    fn translate(&self, text: &str, target_language: &str) -> Result<String, TranslateError>;
}

/// Common German function words plus job-posting staples. Postings
/// containing more than `GERMAN_THRESHOLD` of them are treated as
/// German.
const GERMAN_INDICATORS: &[&str] = &[
    "und", "der", "die", "das", "ist", "wir", "sie", "für", "mit", "von", "auf", "bei", "zur",
    "zum", "eine", "einen", "sowie", "oder", "auch", "als", "ihre", "unser", "werden",
    "anforderungen", "aufgaben", "erfahrung", "kenntnisse",
];

const GERMAN_THRESHOLD: usize = 5;

/// Best-effort language detection over the indicator word list.
/// Returns "de" or "en"; anything that is not recognizably German
/// counts as English.
pub fn detect_language(text: &str) -> &'static str {
    let words: std::collections::HashSet<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    let hits = GERMAN_INDICATORS
        .iter()
        .filter(|indicator| words.contains(**indicator))
        .count();

    if hits > GERMAN_THRESHOLD {
        "de"
    } else {
        "en"
    }
}

/// Translates `text` when it is not already in `target_language`.
///
/// Returns `(text, translated?)`. A failing translator is logged and
/// swallowed; the caller gets the original text back and proceeds.
pub fn translate_if_needed(
    translator: &dyn Translator,
    text: &str,
    target_language: &str,
) -> (String, bool) {
    let detected = detect_language(text);
    if detected == target_language || text.trim().is_empty() {
        log::debug!("Text already in target language, skipping translation");
        return (text.to_string(), false);
    }

    log::info!("Translating text from {detected} to {target_language}");
    match translator.translate(text, target_language) {
        Ok(translated) => (translated, true),
        Err(e) => {
            log::warn!("Translation failed, ranking raw text: {e}");
            (text.to_string(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UppercaseTranslator;

    impl Translator for UppercaseTranslator {
        fn translate(&self, text: &str, _target: &str) -> Result<String, TranslateError> {
            Ok(text.to_uppercase())
        }
    }

    struct BrokenTranslator;

    impl Translator for BrokenTranslator {
        fn translate(&self, _text: &str, _target: &str) -> Result<String, TranslateError> {
            Err(TranslateError::Unavailable("no backend".to_string()))
        }
    }

    const GERMAN: &str = "Wir suchen eine Person mit Erfahrung und Kenntnisse. \
        Ihre Aufgaben sind vielseitig, die Anforderungen hoch, und unser Team ist klein.";

    const ENGLISH: &str = "We are looking for a security engineer with SIEM experience \
        and strong incident response skills.";

    #[test]
    fn test_detects_german() {
        assert_eq!(detect_language(GERMAN), "de");
    }

    #[test]
    fn test_detects_english() {
        assert_eq!(detect_language(ENGLISH), "en");
    }

    #[test]
    fn test_a_few_loanwords_stay_english() {
        // Under the threshold: "der", "die" alone do not flip the verdict.
        assert_eq!(detect_language("Der die das, otherwise English text."), "en");
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        assert_eq!(detect_language(&GERMAN.to_uppercase()), "de");
    }

    #[test]
    fn test_translate_if_needed_skips_target_language() {
        let (text, translated) = translate_if_needed(&UppercaseTranslator, ENGLISH, "en");
        assert_eq!(text, ENGLISH);
        assert!(!translated);
    }

    #[test]
    fn test_translate_if_needed_translates_german() {
        let (text, translated) = translate_if_needed(&UppercaseTranslator, GERMAN, "en");
        assert!(translated);
        assert_eq!(text, GERMAN.to_uppercase());
    }

    #[test]
    fn test_translation_failure_falls_back_to_raw_text() {
        let (text, translated) = translate_if_needed(&BrokenTranslator, GERMAN, "en");
        assert_eq!(text, GERMAN);
        assert!(!translated);
    }

    #[test]
    fn test_empty_text_is_never_translated() {
        let (text, translated) = translate_if_needed(&UppercaseTranslator, "  ", "en");
        assert_eq!(text, "  ");
        assert!(!translated);
    }
}
