//! Tokenization and sentence segmentation
//!
//! Splits text into word tokens and sentences using the Unicode text
//! segmentation rules (UAX #29). Every recognizer backend expresses entity
//! spans in the token indices produced here, so sentence binding and
//! relationship scoring see one consistent token space.

use entrel_core::Sentence;
use unicode_segmentation::UnicodeSegmentation;

/// Titles and short forms whose trailing period does not end a sentence
const NON_TERMINAL_ABBREVIATIONS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Dr", "Prof", "Rev", "Gen", "Sen", "Rep", "Gov", "Lt", "Col", "Sgt",
    "Capt", "St", "Mt", "vs", "etc", "e.g", "i.e", "No", "Fig",
];

/// A token as a byte range into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// Borrow the token's text from its source
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// A document split into tokens and sentences
#[derive(Debug, Clone)]
pub struct TokenizedText<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    sentences: Vec<Sentence>,
}

impl<'a> TokenizedText<'a> {
    /// Tokenize and segment a document
    pub fn new(text: &'a str) -> Self {
        let tokens: Vec<Token> = text
            .split_word_bound_indices()
            .filter(|(_, word)| !word.chars().all(char::is_whitespace))
            .map(|(start, word)| Token {
                start,
                end: start + word.len(),
            })
            .collect();

        let mut doc = Self {
            text,
            tokens,
            sentences: Vec::new(),
        };
        doc.sentences = doc.segment_sentences();
        doc
    }

    /// Source text
    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Text of the token at `index`
    pub fn token_text(&self, index: usize) -> &'a str {
        self.tokens[index].text(self.text)
    }

    /// Source text covered by the half-open token range
    pub fn span_text(&self, start_token: usize, end_token: usize) -> &'a str {
        if start_token >= end_token || end_token > self.tokens.len() {
            return "";
        }
        &self.text[self.tokens[start_token].start..self.tokens[end_token - 1].end]
    }

    /// Byte range covered by a sentence
    pub fn sentence_bytes(&self, sentence: &Sentence) -> (usize, usize) {
        if sentence.is_empty() {
            return (0, 0);
        }
        (
            self.tokens[sentence.start_token].start,
            self.tokens[sentence.end_token - 1].end,
        )
    }

    /// Map a byte range to the half-open range of tokens it touches
    pub fn byte_span_to_tokens(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let first = self.tokens.partition_point(|t| t.end <= start);
        let last = self.tokens.partition_point(|t| t.start < end);
        (first < last).then_some((first, last))
    }

    /// Map a character range (Unicode scalar values) to tokens
    pub fn char_span_to_tokens(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let (start, end) = char_span_to_byte_span(self.text, start, end)?;
        self.byte_span_to_tokens(start, end)
    }

    fn segment_sentences(&self) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        let mut cursor = 0;

        for (offset, sentence) in self.text.split_sentence_bound_indices() {
            let sentence_end = offset + sentence.len();
            let start = cursor;
            while cursor < self.tokens.len() && self.tokens[cursor].start < sentence_end {
                cursor += 1;
            }
            if cursor > start {
                sentences.push(Sentence::new(start, cursor));
            }
        }

        self.merge_abbreviations(sentences)
    }

    /// Re-join sentences that were split after an abbreviation like "Dr."
    fn merge_abbreviations(&self, sentences: Vec<Sentence>) -> Vec<Sentence> {
        let mut merged: Vec<Sentence> = Vec::with_capacity(sentences.len());

        for sentence in sentences {
            match merged.last_mut() {
                Some(previous) if self.ends_with_abbreviation(previous) => {
                    previous.end_token = sentence.end_token;
                }
                _ => merged.push(sentence),
            }
        }

        merged
    }

    fn ends_with_abbreviation(&self, sentence: &Sentence) -> bool {
        if sentence.len() < 2 {
            return false;
        }
        let last = sentence.end_token - 1;
        self.token_text(last) == "."
            && NON_TERMINAL_ABBREVIATIONS.contains(&self.token_text(last - 1))
    }
}

/// Convert a character range into a byte range of `text`
pub fn char_span_to_byte_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    if start > end {
        return None;
    }

    let mut boundaries = text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()));

    let start_byte = boundaries.nth(start)?;
    let end_byte = if end == start {
        start_byte
    } else {
        boundaries.nth(end - start - 1)?
    };

    Some((start_byte, end_byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_texts<'a>(doc: &TokenizedText<'a>) -> Vec<&'a str> {
        (0..doc.token_count()).map(|i| doc.token_text(i)).collect()
    }

    #[test]
    fn test_tokenize_simple_sentence() {
        let doc = TokenizedText::new("Alice met Bob.");

        assert_eq!(token_texts(&doc), vec!["Alice", "met", "Bob", "."]);
        assert_eq!(doc.sentences(), &[Sentence::new(0, 4)]);
    }

    #[test]
    fn test_sentences_cover_all_tokens() {
        let doc = TokenizedText::new("Alice met Bob. Carol stayed home!  Then it rained?");

        let sentences = doc.sentences();
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0].start_token, 0);
        for pair in sentences.windows(2) {
            assert_eq!(pair[0].end_token, pair[1].start_token);
        }
        assert_eq!(sentences.last().unwrap().end_token, doc.token_count());
    }

    #[test]
    fn test_abbreviation_does_not_split() {
        let doc = TokenizedText::new("Dr. Smith visited Paris. He left.");

        assert_eq!(doc.sentences().len(), 2);
        assert_eq!(doc.span_text(0, doc.sentences()[0].end_token), "Dr. Smith visited Paris.");
    }

    #[test]
    fn test_byte_span_to_tokens() {
        let text = "Alice met Bob.";
        let doc = TokenizedText::new(text);

        assert_eq!(doc.byte_span_to_tokens(0, 5), Some((0, 1)));
        assert_eq!(doc.byte_span_to_tokens(10, 13), Some((2, 3)));
        // Partial overlap widens to whole tokens
        assert_eq!(doc.byte_span_to_tokens(2, 8), Some((0, 2)));
        // Whitespace only
        assert_eq!(doc.byte_span_to_tokens(5, 6), None);
    }

    #[test]
    fn test_char_span_to_tokens_multibyte() {
        let text = "Café Müller met José.";
        let doc = TokenizedText::new(text);

        let (start, end) = doc.char_span_to_tokens(16, 20).unwrap();
        assert_eq!(doc.span_text(start, end), "José");

        let (start, end) = doc.char_span_to_tokens(0, 11).unwrap();
        assert_eq!(doc.span_text(start, end), "Café Müller");
    }

    #[test]
    fn test_char_span_out_of_range() {
        assert_eq!(char_span_to_byte_span("abc", 1, 3), Some((1, 3)));
        assert_eq!(char_span_to_byte_span("abc", 2, 9), None);
        assert_eq!(char_span_to_byte_span("abc", 2, 1), None);
    }

    #[test]
    fn test_empty_text() {
        let doc = TokenizedText::new("   ");
        assert_eq!(doc.token_count(), 0);
        assert!(doc.sentences().is_empty());
    }
}
