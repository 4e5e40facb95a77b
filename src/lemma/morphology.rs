//! Morphological analysis backends
//!
//! A backend turns one lowercase word into its normal forms and a coarse
//! part of speech. The shipped backend stems with Snowball and recognizes
//! closed-class function words from per-language tables.

use crate::lemma::Language;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashMap;

/// Coarse grammatical class of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Preposition,
    Conjunction,
    Interjection,
    Particle,
    Article,
    /// Anything that is not a closed-class function word
    Content,
}

/// Result of analyzing one word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordForm {
    /// Candidate dictionary forms, best first
    pub normal_forms: Vec<String>,
    pub part_of_speech: PartOfSpeech,
}

/// A morphological analyzer for a single language
///
/// Implementations are built once and shared read-only between tasks.
pub trait Morphology: Send + Sync {
    /// Analyzes a lowercase word made only of the language's letters
    ///
    /// Returns `None` when no normal form can be derived.
    fn analyze(&self, word: &str) -> Option<WordForm>;
}

const RUSSIAN_PREPOSITIONS: &[&str] = &[
    "в", "во", "без", "безо", "до", "из", "изо", "к", "ко", "на", "по", "о", "об", "обо", "от",
    "ото", "перед", "передо", "пред", "при", "через", "с", "со", "у", "за", "над", "надо", "под",
    "подо", "про", "для", "вокруг", "около", "после", "среди", "между", "сквозь", "ради",
    "возле", "кроме", "вместо", "вдоль", "мимо", "против", "внутри", "вне", "благодаря",
    "согласно", "ввиду", "вследствие", "насчет", "насчёт",
];

const RUSSIAN_CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "да", "что", "чтобы", "чтоб", "если", "когда", "как",
    "потому", "поэтому", "также", "тоже", "хотя", "хоть", "пока", "будто", "словно", "зато",
    "однако", "ни", "то", "чем", "нежели", "ибо", "коли", "причем", "причём",
];

const RUSSIAN_INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ух", "ой", "ай", "увы", "ура", "эй", "ого", "ага", "фу", "тьфу",
    "алло", "браво", "ахти", "ишь",
];

const ENGLISH_PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "from", "up", "down", "of", "off", "over",
    "under", "per", "via", "upon", "within", "without", "among", "across", "toward", "towards",
    "onto", "beneath", "beside", "besides", "beyond", "inside", "outside", "near", "since",
];

const ENGLISH_CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "nor", "so", "yet", "because", "although", "though", "while", "if",
    "unless", "whether", "than", "as", "whereas", "either", "neither",
];

const ENGLISH_INTERJECTIONS: &[&str] = &["oh", "ah", "wow", "hey", "oops", "ouch", "alas", "hmm"];

const ENGLISH_PARTICLES: &[&str] = &["to", "not"];

const ENGLISH_ARTICLES: &[&str] = &["a", "an", "the"];

fn function_words(language: Language) -> HashMap<&'static str, PartOfSpeech> {
    let tables: &[(&[&str], PartOfSpeech)] = match language {
        Language::Russian => &[
            (RUSSIAN_PREPOSITIONS, PartOfSpeech::Preposition),
            (RUSSIAN_CONJUNCTIONS, PartOfSpeech::Conjunction),
            (RUSSIAN_INTERJECTIONS, PartOfSpeech::Interjection),
        ],
        Language::English => &[
            (ENGLISH_ARTICLES, PartOfSpeech::Article),
            (ENGLISH_PARTICLES, PartOfSpeech::Particle),
            (ENGLISH_PREPOSITIONS, PartOfSpeech::Preposition),
            (ENGLISH_CONJUNCTIONS, PartOfSpeech::Conjunction),
            (ENGLISH_INTERJECTIONS, PartOfSpeech::Interjection),
        ],
    };

    let mut words = HashMap::new();
    for (table, class) in tables {
        for word in table.iter() {
            words.entry(*word).or_insert(*class);
        }
    }
    words
}

/// Snowball stemmer plus function-word tables
pub struct SnowballMorphology {
    stemmer: Stemmer,
    function_words: HashMap<&'static str, PartOfSpeech>,
}

impl SnowballMorphology {
    pub fn new(language: Language) -> Self {
        let algorithm = match language {
            Language::Russian => Algorithm::Russian,
            Language::English => Algorithm::English,
        };
        Self {
            stemmer: Stemmer::create(algorithm),
            function_words: function_words(language),
        }
    }
}

impl Morphology for SnowballMorphology {
    fn analyze(&self, word: &str) -> Option<WordForm> {
        if word.is_empty() {
            return None;
        }

        if let Some(class) = self.function_words.get(word) {
            return Some(WordForm {
                normal_forms: vec![word.to_string()],
                part_of_speech: *class,
            });
        }

        let stem = self.stemmer.stem(word);
        if stem.is_empty() {
            return None;
        }

        Some(WordForm {
            normal_forms: vec![stem.into_owned()],
            part_of_speech: PartOfSpeech::Content,
        })
    }
}
