//! Named Entity Recognition (NER) module
//!
//! Local, rule-based recognizer that runs in-process:
//! - Regex patterns for numeric and temporal expressions
//! - Gazetteer lookup for well-known places, organizations and given names
//! - Capitalized-run heuristics for remaining proper nouns
//!
//! Candidates from all three sources compete for tokens; the longest span
//! wins, with pattern matches preferred over gazetteer hits and gazetteer
//! hits preferred over the capitalization heuristic.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::tokenize::TokenizedText;
use entrel_core::{AnalyzedText, EntityRecognizer, EntitySpan, Result, Sentence};

// ============================================================================
// Entity Labels
// ============================================================================

/// Entity labels produced by the local recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityLabel {
    Person,
    Org,
    Gpe,
    Date,
    Time,
    Money,
    Percent,
    Cardinal,
    Misc,
}

impl EntityLabel {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Money => "MONEY",
            Self::Percent => "PERCENT",
            Self::Cardinal => "CARDINAL",
            Self::Misc => "MISC",
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Word Lists
// ============================================================================

const HONORIFICS: &[&str] = &[
    "Mr", "Mrs", "Ms", "Miss", "Dr", "Prof", "Sir", "Dame", "Lord", "Lady", "Rev", "Gen", "Sen",
    "Rep", "Gov", "President", "Senator", "Judge",
];

const ORG_SUFFIXES: &[&str] = &[
    "Inc", "Corp", "Ltd", "LLC", "Co", "Plc", "GmbH", "AG", "Company", "Corporation",
    "Incorporated", "Group", "Holdings", "University", "College", "Institute", "Bank",
    "Foundation", "Agency", "Association", "Committee", "Council", "Ministry", "Department",
    "Laboratories", "Labs", "Systems", "Technologies",
];

/// Suffixes usually written with a trailing period that belongs to the name
const ABBREVIATED_SUFFIXES: &[&str] = &["Inc", "Corp", "Ltd", "Co"];

/// Lowercase words allowed inside a capitalized run
const CONNECTORS: &[&str] = &["of", "&", "de", "du", "van", "von", "der", "la"];

/// Capitalized words that do not start a name
const LEADING_STOPWORDS: &[&str] = &[
    "The", "A", "An", "This", "That", "These", "Those", "In", "On", "At", "For", "From", "To",
    "By", "With", "And", "But", "Or", "If", "When", "While", "After", "Before", "Since",
    "During", "It", "He", "She", "They", "We", "I", "You", "His", "Her", "Its", "Their", "Our",
    "My", "Your", "There", "Here", "Yesterday", "Today", "Tomorrow", "According", "Meanwhile",
    "However", "Although", "Because", "As", "Of",
];

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December";
const MONTH_ABBREVIATIONS: &str = "Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec";
const WEEKDAYS: &str = "Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday";

// ============================================================================
// Local Recognizer
// ============================================================================

/// Dictionary entry for gazetteer matching
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub term: String,
    pub label: EntityLabel,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    end: usize,
    label: EntityLabel,
    /// Lower wins among equally long candidates
    priority: usize,
}

impl Candidate {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Priority offsets per candidate source
const DICTIONARY_PRIORITY: usize = 1_000;
const HEURISTIC_PRIORITY: usize = 2_000;

/// Rule-based recognizer using regex patterns, a gazetteer and
/// capitalization heuristics
pub struct LocalRecognizer {
    /// Pattern rules (regex -> label), in priority order
    patterns: Vec<(Regex, EntityLabel)>,
    /// Gazetteer of known terms, keyed by canonical term
    dictionary: HashMap<String, DictionaryEntry>,
    /// Lookup index (lowercase, space-joined tokens -> canonical term)
    lookup: HashMap<String, String>,
    /// Longest gazetteer key in tokens
    max_term_tokens: usize,
    /// Given names that mark a capitalized run as a person
    given_names: HashSet<String>,
}

impl LocalRecognizer {
    /// Create a recognizer with the default English rules
    pub fn new() -> Self {
        let mut ner = Self {
            patterns: Vec::new(),
            dictionary: HashMap::new(),
            lookup: HashMap::new(),
            max_term_tokens: 1,
            given_names: HashSet::new(),
        };

        ner.init_patterns();
        ner.init_dictionary();
        ner.init_given_names();
        ner
    }

    fn init_patterns(&mut self) {
        // Money before cardinal so "$5 million" is not split
        self.add_pattern(
            r"[$€£¥]\s?\d+(?:,\d{3})*(?:\.\d+)?(?:\s?(?:thousand|million|billion|trillion))?",
            EntityLabel::Money,
        );
        self.add_pattern(
            r"\b\d+(?:,\d{3})*(?:\.\d+)?\s?(?:dollars|euros|pounds|yen|USD|EUR|GBP|JPY)\b",
            EntityLabel::Money,
        );

        // Percent
        self.add_pattern(r"\b\d+(?:\.\d+)?\s?(?:%|percent\b)", EntityLabel::Percent);

        // Time
        self.add_pattern(
            r"(?i)\b\d{1,2}(?::\d{2})?\s?(?:a\.m\.|p\.m\.|am\b|pm\b)",
            EntityLabel::Time,
        );
        self.add_pattern(r"\b\d{1,2}:\d{2}(?::\d{2})?\b", EntityLabel::Time);

        // Date
        self.add_pattern(r"\b\d{4}-\d{2}-\d{2}\b", EntityLabel::Date);
        self.add_pattern(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b", EntityLabel::Date);
        self.add_pattern(
            &format!(
                r"\b(?:{MONTHS}|(?:{MONTH_ABBREVIATIONS})\.?)\s+\d{{1,2}}(?:st|nd|rd|th)?(?:,\s*\d{{4}})?\b"
            ),
            EntityLabel::Date,
        );
        self.add_pattern(
            &format!(r"\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})(?:\s+\d{{4}})?\b"),
            EntityLabel::Date,
        );
        self.add_pattern(&format!(r"\b(?:{MONTHS})\s+\d{{4}}\b"), EntityLabel::Date);
        // "May" alone is too ambiguous to tag
        self.add_pattern(
            r"\b(?:January|February|March|April|June|July|August|September|October|November|December)\b",
            EntityLabel::Date,
        );
        self.add_pattern(&format!(r"\b(?:{WEEKDAYS})\b"), EntityLabel::Date);
        self.add_pattern(r"\b(?:1[5-9]|20)\d{2}s?\b", EntityLabel::Date);

        // Cardinal
        self.add_pattern(r"\b\d+(?:,\d{3})*(?:\.\d+)?\b", EntityLabel::Cardinal);
    }

    fn init_dictionary(&mut self) {
        // Places
        self.add_term(
            "United States",
            EntityLabel::Gpe,
            vec!["USA", "U.S", "U.S.A", "US", "America", "United States of America"],
        );
        self.add_term("United Kingdom", EntityLabel::Gpe, vec!["UK", "U.K", "Britain", "Great Britain"]);
        self.add_term("New York", EntityLabel::Gpe, vec!["New York City", "NYC"]);
        self.add_term("Los Angeles", EntityLabel::Gpe, vec!["LA"]);
        self.add_term("San Francisco", EntityLabel::Gpe, vec![]);
        self.add_term("Washington", EntityLabel::Gpe, vec!["Washington D.C", "D.C"]);
        self.add_term("South Korea", EntityLabel::Gpe, vec!["Korea", "Republic of Korea"]);
        self.add_term("European Union", EntityLabel::Org, vec!["EU"]);
        for place in [
            "Canada", "Mexico", "Brazil", "Argentina", "France", "Germany", "Italy", "Spain",
            "Portugal", "Netherlands", "Belgium", "Switzerland", "Austria", "Sweden", "Norway",
            "Denmark", "Finland", "Poland", "Ireland", "Russia", "Ukraine", "Turkey", "Israel",
            "Egypt", "Nigeria", "Kenya", "India", "China", "Japan", "Australia", "Singapore",
            "Paris", "London", "Berlin", "Madrid", "Rome", "Tokyo", "Seoul", "Beijing", "Shanghai",
            "Moscow", "Toronto", "Chicago", "Boston", "Seattle", "Sydney", "Dublin", "Amsterdam",
            "Vienna", "Zurich", "Geneva", "Brussels", "Stockholm", "Oslo", "Lisbon", "Mumbai",
            "Delhi", "Cairo", "Texas", "California", "Florida",
        ] {
            self.add_term(place, EntityLabel::Gpe, vec![]);
        }

        // Organizations
        self.add_term("United Nations", EntityLabel::Org, vec!["UN", "U.N"]);
        self.add_term("World Health Organization", EntityLabel::Org, vec!["WHO"]);
        self.add_term("Federal Reserve", EntityLabel::Org, vec!["Fed"]);
        self.add_term("Amazon", EntityLabel::Org, vec!["Amazon.com"]);
        self.add_term("Meta", EntityLabel::Org, vec!["Facebook"]);
        self.add_term("Alphabet", EntityLabel::Org, vec!["Google"]);
        for org in [
            "Microsoft", "Apple", "IBM", "Intel", "Nvidia", "Tesla", "Netflix", "OpenAI",
            "Anthropic", "Samsung", "Sony", "Toyota", "Siemens", "NASA", "FBI", "CIA", "NATO",
            "BBC", "Reuters", "Oracle", "Adobe", "Uber",
        ] {
            self.add_term(org, EntityLabel::Org, vec![]);
        }
    }

    fn init_given_names(&mut self) {
        for name in [
            "Alice", "Bob", "Carol", "Dave", "David", "Eve", "Frank", "Grace", "Heidi", "Ivan",
            "Judy", "Mallory", "Oscar", "Peggy", "Trent", "Victor", "Walter", "John", "Jane",
            "James", "Mary", "Michael", "Sarah", "Robert", "Linda", "William", "Elizabeth",
            "Richard", "Barbara", "Joseph", "Susan", "Thomas", "Jessica", "Charles", "Karen",
            "Daniel", "Nancy", "Matthew", "Lisa", "Anthony", "Emily", "Mark", "Anna", "Paul",
            "Laura", "Steven", "Emma", "Andrew", "Olivia", "Kevin", "Sophia", "Brian", "Maria",
            "George", "Helen", "Edward", "Alan", "Ada", "Marie", "Albert", "Isaac", "Elon", "Tim",
            "Bill", "Steve", "Jeff", "Satya", "Sundar", "Angela", "Emmanuel", "Joe", "Donald",
            "Barack", "Kamala", "Vladimir", "Xi", "Min", "Ji", "Hyun", "Carlos", "Juan", "José",
            "Pierre", "Hans", "Ahmed", "Mohammed", "Wei", "Yuki", "Priya",
        ] {
            self.given_names.insert(name.to_string());
        }
    }

    /// Add a regex pattern
    fn add_pattern(&mut self, pattern: &str, label: EntityLabel) {
        if let Ok(regex) = Regex::new(pattern) {
            self.patterns.push((regex, label));
        }
    }

    /// Add a gazetteer term with its aliases
    fn add_term(&mut self, term: &str, label: EntityLabel, aliases: Vec<&str>) {
        let entry = DictionaryEntry {
            term: term.to_string(),
            label,
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        };

        for surface in std::iter::once(term).chain(aliases.iter().copied()) {
            let key = lookup_key(surface);
            self.max_term_tokens = self.max_term_tokens.max(key.split(' ').count());
            self.lookup.insert(key, term.to_string());
        }

        self.dictionary.insert(term.to_string(), entry);
    }

    /// Look up a gazetteer entry by its surface form
    pub fn lookup(&self, surface: &str) -> Option<&DictionaryEntry> {
        self.lookup
            .get(&lookup_key(surface))
            .and_then(|term| self.dictionary.get(term))
    }

    /// Recognize entities synchronously
    pub fn recognize(&self, text: &str) -> AnalyzedText {
        let doc = TokenizedText::new(text);

        let mut candidates = Vec::new();
        candidates.extend(self.extract_by_patterns(&doc));
        candidates.extend(self.extract_by_dictionary(&doc));
        candidates.extend(self.extract_capitalized_runs(&doc));

        let entities = self
            .deduplicate(candidates, doc.token_count())
            .into_iter()
            .map(|c| EntitySpan::new(doc.span_text(c.start, c.end), c.label.as_str(), c.start, c.end))
            .collect();

        AnalyzedText {
            sentences: doc.sentences().to_vec(),
            entities,
            token_count: doc.token_count(),
        }
    }

    /// Candidates from regex patterns, matched inside one sentence at a time
    /// and widened to whole tokens
    fn extract_by_patterns(&self, doc: &TokenizedText<'_>) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for sentence in doc.sentences().iter().filter(|s| !s.is_empty()) {
            let (s_start, s_end) = doc.sentence_bytes(sentence);
            let slice = &doc.text()[s_start..s_end];

            for (priority, (regex, label)) in self.patterns.iter().enumerate() {
                for mat in regex.find_iter(slice) {
                    if let Some((start, end)) =
                        doc.byte_span_to_tokens(s_start + mat.start(), s_start + mat.end())
                    {
                        candidates.push(Candidate {
                            start,
                            end,
                            label: *label,
                            priority,
                        });
                    }
                }
            }
        }

        candidates
    }

    /// Candidates from gazetteer lookup over token windows within a sentence
    fn extract_by_dictionary(&self, doc: &TokenizedText<'_>) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for sentence in doc.sentences() {
            for start in sentence.start_token..sentence.end_token {
                if !is_capitalized(doc.token_text(start)) {
                    continue;
                }

                let longest = self.max_term_tokens.min(sentence.end_token - start);
                for len in (1..=longest).rev() {
                    let surface = (start..start + len)
                        .map(|i| doc.token_text(i))
                        .collect::<Vec<_>>()
                        .join(" ");

                    if let Some(entry) = self.lookup(&surface) {
                        candidates.push(Candidate {
                            start,
                            end: start + len,
                            label: entry.label,
                            priority: DICTIONARY_PRIORITY,
                        });
                        break;
                    }
                }
            }
        }

        candidates
    }

    /// Candidates from runs of capitalized tokens
    fn extract_capitalized_runs(&self, doc: &TokenizedText<'_>) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for sentence in doc.sentences() {
            let end = sentence.end_token;
            let mut i = sentence.start_token;

            while i < end {
                let token = doc.token_text(i);
                if !is_capitalized(token) || LEADING_STOPWORDS.contains(&token) {
                    i += 1;
                    continue;
                }

                // "Dr. Smith" tags the name, not the title
                let mut start = i;
                let honorific = HONORIFICS.contains(&token);
                if honorific {
                    start += 1;
                    if start < end && doc.token_text(start) == "." {
                        start += 1;
                    }
                    if start >= end || !is_capitalized(doc.token_text(start)) {
                        i = start.max(i + 1);
                        continue;
                    }
                }

                // Personal names do not take "of" ("Alice Johnson of Microsoft")
                let joins_connectors = !self.given_names.contains(doc.token_text(start));

                let mut run_end = start + 1;
                while run_end < end {
                    let next = doc.token_text(run_end);
                    if HONORIFICS.contains(&next) {
                        break;
                    } else if is_capitalized(next) {
                        run_end += 1;
                    } else if joins_connectors
                        && CONNECTORS.contains(&next)
                        && run_end + 1 < end
                        && is_capitalized(doc.token_text(run_end + 1))
                    {
                        run_end += 2;
                    } else {
                        break;
                    }
                }
                i = run_end;

                if let Some(candidate) = self.classify_run(doc, sentence, start, run_end, honorific) {
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }

    fn classify_run(
        &self,
        doc: &TokenizedText<'_>,
        sentence: &Sentence,
        start: usize,
        mut end: usize,
        honorific: bool,
    ) -> Option<Candidate> {
        let first = doc.token_text(start);
        let last = doc.token_text(end - 1);
        let single = end - start == 1;

        let label = if honorific {
            EntityLabel::Person
        } else if ORG_SUFFIXES.contains(&last) && !single {
            if ABBREVIATED_SUFFIXES.contains(&last)
                && end < sentence.end_token
                && doc.token_text(end) == "."
            {
                end += 1;
            }
            EntityLabel::Org
        } else if let Some(entry) = self.lookup(doc.span_text(start, end)) {
            entry.label
        } else if self.given_names.contains(first) {
            EntityLabel::Person
        } else if single && is_acronym(first) {
            EntityLabel::Org
        } else if single && start == sentence.start_token {
            return None;
        } else {
            EntityLabel::Misc
        };

        Some(Candidate {
            start,
            end,
            label,
            priority: HEURISTIC_PRIORITY,
        })
    }

    /// Resolve overlaps: longest span first, then source priority, then position
    fn deduplicate(&self, mut candidates: Vec<Candidate>, token_count: usize) -> Vec<Candidate> {
        candidates.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then(a.priority.cmp(&b.priority))
                .then(a.start.cmp(&b.start))
        });

        let mut result = Vec::new();
        let mut covered = vec![false; token_count];

        for candidate in candidates {
            if candidate.len() == 0 || candidate.end > token_count {
                continue;
            }
            let overlaps = covered[candidate.start..candidate.end].iter().any(|c| *c);

            if !overlaps {
                covered[candidate.start..candidate.end]
                    .iter_mut()
                    .for_each(|c| *c = true);
                result.push(candidate);
            }
        }

        // Sort by position
        result.sort_by_key(|c| c.start);
        result
    }
}

impl Default for LocalRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EntityRecognizer for LocalRecognizer {
    async fn analyze(&self, text: &str) -> Result<AnalyzedText> {
        Ok(self.recognize(text))
    }

    fn name(&self) -> &str {
        "local"
    }
}

fn lookup_key(surface: &str) -> String {
    surface
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_capitalized(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

fn is_acronym(token: &str) -> bool {
    (2..=5).contains(&token.chars().count()) && token.chars().all(|c| c.is_ascii_uppercase())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(analyzed: &AnalyzedText) -> Vec<(&str, &str)> {
        analyzed
            .entities
            .iter()
            .map(|e| (e.text.as_str(), e.label.as_str()))
            .collect()
    }

    #[test]
    fn test_two_people_one_sentence() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("Alice met Bob.");

        assert_eq!(analyzed.token_count, 4);
        assert_eq!(analyzed.sentences, vec![Sentence::new(0, 4)]);
        assert_eq!(
            analyzed.entities,
            vec![
                EntitySpan::new("Alice", "PERSON", 0, 1),
                EntitySpan::new("Bob", "PERSON", 2, 3),
            ]
        );
    }

    #[test]
    fn test_patterns() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("Revenue grew 12% to $5 million on March 3, 2024 at 10:30.");
        let found = labeled(&analyzed);

        assert!(found.contains(&("12%", "PERCENT")));
        assert!(found.contains(&("$5 million", "MONEY")));
        assert!(found.contains(&("March 3, 2024", "DATE")));
        assert!(found.contains(&("10:30", "TIME")));
    }

    #[test]
    fn test_patterns_stay_inside_sentence() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("The launch slipped to March. 5 Teams shipped anyway.");
        let found = labeled(&analyzed);

        assert_eq!(analyzed.sentences.len(), 2);
        assert!(found.contains(&("March", "DATE")));
        assert!(found.contains(&("5", "CARDINAL")));
        assert!(analyzed
            .entities
            .iter()
            .all(|e| analyzed.sentences.iter().any(|s| s.contains(e))));
    }

    #[test]
    fn test_gazetteer_and_aliases() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("Officials in New York met delegates from the UK.");
        let found = labeled(&analyzed);

        assert!(found.contains(&("New York", "GPE")));
        assert!(found.contains(&("UK", "GPE")));
        assert_eq!(ner.lookup("u.s").map(|e| e.term.as_str()), Some("United States"));
    }

    #[test]
    fn test_org_suffix_and_honorific() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("Yesterday Dr. Smith joined Acme Widgets Inc. in Paris.");
        let found = labeled(&analyzed);

        assert!(found.contains(&("Smith", "PERSON")));
        assert!(found.contains(&("Acme Widgets Inc.", "ORG")));
        assert!(found.contains(&("Paris", "GPE")));
        assert!(!found.iter().any(|(text, _)| *text == "Yesterday"));
    }

    #[test]
    fn test_sentence_initial_word_skipped() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("Nothing happened here.");

        assert!(analyzed.entities.is_empty());
    }

    #[test]
    fn test_misc_run() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("We watched Star Wars twice.");

        assert_eq!(labeled(&analyzed), vec![("Star Wars", "MISC")]);
    }

    #[test]
    fn test_spans_do_not_overlap() {
        let ner = LocalRecognizer::new();
        let analyzed =
            ner.recognize("On Monday, Alice Johnson of Microsoft paid $300 to the United Nations.");

        let mut previous_end = 0;
        for entity in &analyzed.entities {
            assert!(entity.start_token >= previous_end, "{entity:?} overlaps");
            assert!(entity.start_token < entity.end_token);
            previous_end = entity.end_token;
        }
        assert!(labeled(&analyzed).contains(&("United Nations", "ORG")));
    }

    #[test]
    fn test_entity_label_display() {
        assert_eq!(EntityLabel::Gpe.to_string(), "GPE");
        assert_eq!(EntityLabel::Person.as_str(), "PERSON");
        assert_eq!(serde_json::to_string(&EntityLabel::Money).unwrap(), "\"MONEY\"");
    }

    #[test]
    fn test_async_analyze() {
        let ner = LocalRecognizer::new();
        let analyzed = tokio_test::block_on(ner.analyze("Alice met Bob.")).unwrap();

        assert_eq!(ner.name(), "local");
        assert_eq!(analyzed.entities.len(), 2);
    }

    #[test]
    fn test_empty_text() {
        let ner = LocalRecognizer::new();
        let analyzed = ner.recognize("");

        assert_eq!(analyzed, AnalyzedText::default());
    }
}
