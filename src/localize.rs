//! Single-locale lookup over translated strings.

use crate::gtfs_rt::TranslatedString;

/// Locale used when none is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// Returns the text of the first translation whose language tag equals
/// `language` exactly. Missing bundles and unmatched locales yield `None`.
pub fn localize<'a>(bundle: Option<&'a TranslatedString>, language: &str) -> Option<&'a str> {
    bundle?
        .translation
        .iter()
        .find(|t| t.language.as_deref() == Some(language))
        .map(|t| t.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::Translation;

    fn bundle(entries: &[(&str, Option<&str>)]) -> TranslatedString {
        TranslatedString {
            translation: entries
                .iter()
                .map(|(text, language)| Translation {
                    text: text.to_string(),
                    language: language.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn test_returns_first_matching_translation() {
        let text = bundle(&[("Bonjour", Some("fr")), ("Hello", Some("en")), ("Hi", Some("en"))]);
        assert_eq!(localize(Some(&text), "en"), Some("Hello"));
    }

    #[test]
    fn test_unsupported_locale_is_absent() {
        let text = bundle(&[("Hello", Some("en"))]);
        assert_eq!(localize(Some(&text), "de"), None);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let text = bundle(&[("Hello", Some("EN"))]);
        assert_eq!(localize(Some(&text), "en"), None);
    }

    #[test]
    fn test_untagged_translation_and_missing_bundle() {
        let text = bundle(&[("Hello", None)]);
        assert_eq!(localize(Some(&text), "en"), None);
        assert_eq!(localize(None, "en"), None);
    }
}
