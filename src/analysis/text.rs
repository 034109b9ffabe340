//! Text resolution
//!
//! Lower-cases recognized words, decides whether a cut passes the inclusion
//! filter and renders the surviving words into the text used for catalog
//! lookup. Inclusion decides pass/fail; exclusion only removes words from
//! the rendered text.

use anyhow::Result;
use std::collections::HashSet;

use crate::vision::{Cut, TextRecognizer};

/// One recognized word after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lower-cased word
    pub text: String,
    /// Member of the inclusion set
    pub included: bool,
    /// Member of the exclusion set
    pub excluded: bool,
}

/// Tokens of one cut plus the inclusion verdict
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognitionResult {
    pub tokens: Vec<Token>,
    pub passed: bool,
}

impl RecognitionResult {
    /// Space-joined non-excluded words, or `None` if the cut did not pass
    pub fn text(&self) -> Option<String> {
        if !self.passed {
            return None;
        }
        let text = self
            .tokens
            .iter()
            .filter(|t| !t.excluded)
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        (!text.is_empty()).then_some(text)
    }

    /// All words as recognized, lower-cased
    pub fn raw_text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Inclusion and exclusion keyword sets
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl KeywordFilter {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            include: include.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
            exclude: exclude.into_iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn classify<S: AsRef<str>>(&self, words: &[S]) -> RecognitionResult {
        let tokens: Vec<Token> = words
            .iter()
            .map(|w| w.as_ref().to_lowercase())
            .filter(|w| !w.is_empty())
            .map(|text| Token {
                included: self.include.contains(&text),
                excluded: self.exclude.contains(&text),
                text,
            })
            .collect();
        let passed = tokens.iter().any(|t| t.included);

        RecognitionResult { tokens, passed }
    }
}

/// Runs recognition on cuts and classifies the words
pub struct TextResolver {
    recognizer: Box<dyn TextRecognizer>,
    filter: KeywordFilter,
}

impl TextResolver {
    pub fn new(recognizer: Box<dyn TextRecognizer>, filter: KeywordFilter) -> Self {
        Self { recognizer, filter }
    }

    pub fn backend(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Recognize and classify one cut.
    ///
    /// Errors only when the engine itself fails; no text is a normal, non-passing result.
    pub fn resolve(&self, cut: &Cut) -> Result<RecognitionResult> {
        let words = self.recognizer.recognize_words(&cut.pixels)?;
        Ok(self.filter.classify(&words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::Rect;
    use image::GrayImage;

    fn filter() -> KeywordFilter {
        KeywordFilter::new(["prime"], ["[radiant]"])
    }

    struct FixedWords(Vec<&'static str>);

    impl TextRecognizer for FixedWords {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn recognize_words(&self, _image: &GrayImage) -> Result<Vec<String>> {
            Ok(self.0.iter().map(|w| w.to_string()).collect())
        }
    }

    #[test]
    fn test_exclusion_does_not_affect_pass() {
        let result = filter().classify(&["prime", "[radiant]", "blade"]);

        assert!(result.passed);
        assert_eq!(result.text(), Some("prime blade".to_string()));
    }

    #[test]
    fn test_no_inclusion_keyword_rejects() {
        let result = filter().classify(&["vulkar", "blade"]);

        assert!(!result.passed);
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_words_are_lower_cased() {
        let result = filter().classify(&["Braton", "PRIME", "Barrel"]);

        assert_eq!(result.text(), Some("braton prime barrel".to_string()));
        assert!(result.tokens[1].included);
    }

    #[test]
    fn test_keywords_are_lower_cased() {
        let filter = KeywordFilter::new(["Forma"], Vec::<String>::new());

        assert!(filter.classify(&["forma", "blueprint"]).passed);
    }

    #[test]
    fn test_empty_recognition_is_not_a_match() {
        let result = filter().classify::<&str>(&[]);

        assert!(!result.passed);
        assert!(result.tokens.is_empty());
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_everything_excluded_yields_nothing() {
        let filter = KeywordFilter::new(["prime"], ["prime"]);

        let result = filter.classify(&["prime"]);

        assert!(result.passed);
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_raw_text_keeps_excluded_words() {
        let result = filter().classify(&["Prime", "[Radiant]"]);

        assert_eq!(result.raw_text(), "prime [radiant]");
    }

    #[test]
    fn test_resolver_uses_recognizer_words() {
        let resolver = TextResolver::new(
            Box::new(FixedWords(vec!["relic", "forma"])),
            KeywordFilter::new(["relic"], Vec::<String>::new()),
        );
        let cut = Cut {
            rect: Rect::new(0, 0, 4, 4),
            pixels: GrayImage::new(4, 4),
        };

        let result = resolver.resolve(&cut).unwrap();

        assert_eq!(result.text(), Some("relic forma".to_string()));
        assert_eq!(resolver.backend(), "fixed");
    }
}
