//! Sentence splitting used when a paragraph has to be broken up.

use unicode_segmentation::UnicodeSegmentation;

/// Sentence splitter capability injected into a chunker.
///
/// Returns the sentences of a paragraph in order, trimmed, without empty
/// entries.
pub trait SentenceSplitter: Send + Sync {
    /// Split a paragraph into sentences.
    fn split(&self, paragraph: &str) -> Vec<String>;
}

/// Splitter following Unicode sentence boundaries (UAX #29).
///
/// Decimal numbers and lowercase continuations do not end a sentence.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split(&self, paragraph: &str) -> Vec<String> {
        paragraph
            .split_sentence_bounds()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Splitter that ends a sentence at a delimiter followed by whitespace.
#[derive(Debug, Clone)]
pub struct PunctuationSentenceSplitter {
    /// Sentence-ending delimiters
    delimiters: Vec<char>,
}

impl PunctuationSentenceSplitter {
    /// Create a splitter with the default delimiters (`.`, `!`, `?`).
    pub fn new() -> Self {
        Self {
            delimiters: vec!['.', '!', '?'],
        }
    }

    /// Create a splitter with custom delimiters.
    pub fn with_delimiters(delimiters: Vec<char>) -> Self {
        Self { delimiters }
    }
}

impl Default for PunctuationSentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceSplitter for PunctuationSentenceSplitter {
    fn split(&self, paragraph: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        let mut chars = paragraph.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);

            if self.delimiters.contains(&c) && chars.peek().map_or(true, |next| next.is_whitespace()) {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
            }
        }

        let trimmed = current.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }

        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unicode_splitting() {
        let sentences = UnicodeSentenceSplitter
            .split("The train arrived at 3.15 pm. He was late! Was anyone surprised?");
        assert_eq!(
            sentences,
            vec![
                "The train arrived at 3.15 pm.",
                "He was late!",
                "Was anyone surprised?",
            ]
        );
    }

    #[test]
    fn test_punctuation_splitting() {
        let splitter = PunctuationSentenceSplitter::new();
        let sentences = splitter.split("This is the first sentence. This is the second sentence! Is this the third?");
        assert_eq!(
            sentences,
            vec![
                "This is the first sentence.",
                "This is the second sentence!",
                "Is this the third?",
            ]
        );
    }

    #[test]
    fn test_punctuation_keeps_inner_dots() {
        let splitter = PunctuationSentenceSplitter::new();
        let sentences = splitter.split("Version 1.2 shipped. No trailing delimiter");
        assert_eq!(sentences, vec!["Version 1.2 shipped.", "No trailing delimiter"]);
    }

    #[test]
    fn test_custom_delimiters() {
        let splitter = PunctuationSentenceSplitter::with_delimiters(vec![';']);
        assert_eq!(splitter.split("one; two; three"), vec!["one;", "two;", "three"]);
    }

    #[test]
    fn test_blank_input() {
        assert!(UnicodeSentenceSplitter.split("   ").is_empty());
        assert!(PunctuationSentenceSplitter::new().split("").is_empty());
    }
}
