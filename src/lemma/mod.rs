//! Lemma extraction
//!
//! Turns raw text into lemma occurrence counts per language, dropping
//! function words (prepositions, conjunctions, interjections and, for
//! English, particles and articles). The same rules map a single word to its
//! lemma for snippet highlighting.
//!
//! # Example
//!
//! ```
//! use lemmascope::lemma::{Language, Lemmatizer};
//!
//! let lemmatizer = Lemmatizer::new(&[Language::Russian]);
//! let counts = lemmatizer.lemmas_with_counts("Привет, привет и пока!");
//! assert_eq!(counts.get("привет"), Some(&2));
//! assert!(!counts.contains_key("и"));
//! ```

mod morphology;

pub use morphology::{Morphology, PartOfSpeech, SnowballMorphology, WordForm};

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A language the lemmatizer can process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Russian,
    English,
}

impl Language {
    /// True for lowercase letters of this language's alphabet
    pub fn is_letter(&self, c: char) -> bool {
        match self {
            Self::Russian => matches!(c, 'а'..='я' | 'ё'),
            Self::English => c.is_ascii_lowercase(),
        }
    }

    /// Word classes dropped before indexing
    pub fn filtered_classes(&self) -> &'static [PartOfSpeech] {
        match self {
            Self::Russian => &[
                PartOfSpeech::Preposition,
                PartOfSpeech::Conjunction,
                PartOfSpeech::Interjection,
            ],
            Self::English => &[
                PartOfSpeech::Preposition,
                PartOfSpeech::Conjunction,
                PartOfSpeech::Interjection,
                PartOfSpeech::Particle,
                PartOfSpeech::Article,
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Russian => "russian",
            Self::English => "english",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lemmatizer for one language
#[derive(Clone)]
pub struct LanguageLemmatizer {
    language: Language,
    morphology: Arc<dyn Morphology>,
}

impl LanguageLemmatizer {
    /// Builds a lemmatizer backed by the Snowball analyzer
    pub fn new(language: Language) -> Self {
        Self::with_morphology(language, Arc::new(SnowballMorphology::new(language)))
    }

    /// Builds a lemmatizer around any analyzer
    pub fn with_morphology(language: Language, morphology: Arc<dyn Morphology>) -> Self {
        Self {
            language,
            morphology,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Lowercases the text, blanks out everything outside the alphabet and
    /// splits it into words
    fn words(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| if self.language.is_letter(c) { c } else { ' ' })
            .collect();
        cleaned.split_whitespace().map(str::to_string).collect()
    }

    /// Lemma of one clean token, or None for function words and words
    /// without a normal form
    fn lemma_of_token(&self, token: &str) -> Option<String> {
        let form = self.morphology.analyze(token)?;
        if self
            .language
            .filtered_classes()
            .contains(&form.part_of_speech)
        {
            return None;
        }
        form.normal_forms.into_iter().find(|f| !f.is_empty())
    }

    /// Counts lemma occurrences in the text
    pub fn lemmas_with_counts(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for word in self.words(text) {
            if let Some(lemma) = self.lemma_of_token(&word) {
                *counts.entry(lemma).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Distinct lemmas in the text
    pub fn lemma_set(&self, text: &str) -> HashSet<String> {
        self.words(text)
            .iter()
            .filter_map(|word| self.lemma_of_token(word))
            .collect()
    }

    /// Lemma of a single word
    ///
    /// Returns None for words that contain anything besides this language's
    /// letters (digits, another alphabet) or that the filters reject.
    pub fn lemma_of(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        if word.is_empty() || !word.chars().all(|c| self.language.is_letter(c)) {
            return None;
        }
        self.lemma_of_token(&word)
    }
}

/// Lemmatizer over all configured languages
///
/// The alphabets are disjoint, so counts from each language are simply
/// added together.
#[derive(Clone)]
pub struct Lemmatizer {
    languages: Vec<LanguageLemmatizer>,
}

impl Lemmatizer {
    /// Builds the lemmatizer once for the given languages
    pub fn new(languages: &[Language]) -> Self {
        Self {
            languages: languages.iter().map(|l| LanguageLemmatizer::new(*l)).collect(),
        }
    }

    /// Builds from already constructed per-language lemmatizers
    pub fn from_parts(languages: Vec<LanguageLemmatizer>) -> Self {
        Self { languages }
    }

    pub fn languages(&self) -> Vec<Language> {
        self.languages.iter().map(|l| l.language()).collect()
    }

    /// Lemma occurrence counts summed over all languages
    pub fn lemmas_with_counts(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for lemmatizer in &self.languages {
            for (lemma, count) in lemmatizer.lemmas_with_counts(text) {
                *counts.entry(lemma).or_insert(0) += count;
            }
        }
        counts
    }

    /// Distinct lemmas over all languages (used to parse queries)
    pub fn lemma_set(&self, text: &str) -> HashSet<String> {
        self.languages
            .iter()
            .flat_map(|l| l.lemma_set(text))
            .collect()
    }

    /// Lemma of a single word in the first language that accepts it
    pub fn lemma_of(&self, word: &str) -> Option<String> {
        self.languages.iter().find_map(|l| l.lemma_of(word))
    }
}

impl fmt::Debug for Lemmatizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lemmatizer")
            .field("languages", &self.languages())
            .finish()
    }
}
