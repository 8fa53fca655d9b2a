//! Morphology adapters
//!
//! A morphology adapter reduces a word to its base form and reports its
//! grammatical classes. The lemmatizer only depends on the [`Morphology`]
//! trait, so dictionaries can be swapped without touching the index.

use rust_stemmers::{Algorithm, Stemmer};
use thiserror::Error;

/// Per-word normalization failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MorphologyError {
    #[error("Word is not in the supported alphabet: '{0}'")]
    UnsupportedWord(String),

    #[error("Word has no base form: '{0}'")]
    NoBaseForm(String),
}

/// Spells `ё` as `е`, the way most Russian text does
pub fn fold_yo(word: &str) -> String {
    word.replace('ё', "е")
}

/// Grammatical class of a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordClass {
    Conjunction,
    Interjection,
    Preposition,
    Particle,
    /// Any class that carries meaning (noun, verb, adjective, ...)
    Content,
}

impl WordClass {
    /// Returns true for the function-word classes excluded from the index
    pub fn is_functional(&self) -> bool {
        !matches!(self, Self::Content)
    }
}

/// Dictionary interface used by the lemmatizer
pub trait Morphology: Send + Sync {
    /// Reduces a lowercase word to its base form
    fn normalize(&self, word: &str) -> Result<String, MorphologyError>;

    /// Returns every grammatical class the word may belong to
    fn classify(&self, word: &str) -> Vec<WordClass>;
}

const PREPOSITIONS: &[&str] = &[
    "без", "безо", "благодаря", "в", "вблизи", "вдоль", "вместо", "вне", "внутри", "во",
    "возле", "вокруг", "вследствие", "для", "до", "за", "из", "изо", "к", "ко", "кроме",
    "между", "мимо", "на", "над", "надо", "о", "об", "обо", "около", "от", "ото", "перед",
    "передо", "по", "под", "подо", "после", "при", "про", "против", "ради", "с", "сквозь",
    "со", "согласно", "среди", "у", "через",
];

const CONJUNCTIONS: &[&str] = &[
    "а", "будто", "да", "едва", "если", "зато", "и", "ибо", "или", "когда", "либо", "ни",
    "но", "однако", "пока", "поскольку", "потому", "словно", "также", "тоже", "хотя", "хоть",
    "чтоб", "чтобы", "что",
];

const PARTICLES: &[&str] = &[
    "б", "бы", "ведь", "вон", "вот", "да", "даже", "ещё", "еще", "же", "именно", "лишь", "ли",
    "не", "неужели", "нет", "ни", "ну", "пусть", "пускай", "разве", "уж", "уже", "только",
];

const INTERJECTIONS: &[&str] = &[
    "ага", "ай", "алло", "ах", "браво", "увы", "ура", "ух", "фу", "эй", "эх", "ну", "ого",
    "ой", "ох",
];

/// Russian morphology backed by the Snowball stemmer
///
/// Base forms are Snowball stems; function words are recognized from a
/// closed-class table, since prepositions, conjunctions, particles and
/// interjections form a small fixed set.
pub struct RussianMorphology {
    stemmer: Stemmer,
}

impl RussianMorphology {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::Russian),
        }
    }

    fn is_russian(word: &str) -> bool {
        !word.is_empty() && word.chars().all(|c| matches!(c, 'а'..='я' | 'ё'))
    }
}

impl Default for RussianMorphology {
    fn default() -> Self {
        Self::new()
    }
}

impl Morphology for RussianMorphology {
    fn normalize(&self, word: &str) -> Result<String, MorphologyError> {
        if !Self::is_russian(word) {
            return Err(MorphologyError::UnsupportedWord(word.to_string()));
        }

        let folded = fold_yo(word);
        let stem = self.stemmer.stem(&folded);
        if stem.is_empty() {
            return Err(MorphologyError::NoBaseForm(word.to_string()));
        }

        Ok(stem.into_owned())
    }

    fn classify(&self, word: &str) -> Vec<WordClass> {
        let table: [(&[&str], WordClass); 4] = [
            (CONJUNCTIONS, WordClass::Conjunction),
            (INTERJECTIONS, WordClass::Interjection),
            (PREPOSITIONS, WordClass::Preposition),
            (PARTICLES, WordClass::Particle),
        ];

        let classes: Vec<WordClass> = table
            .iter()
            .filter(|(words, _)| words.contains(&word))
            .map(|(_, class)| *class)
            .collect();

        if classes.is_empty() {
            vec![WordClass::Content]
        } else {
            classes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_inflected_forms() {
        let morphology = RussianMorphology::new();

        for form in ["кот", "коты", "кота", "котом"] {
            assert_eq!(morphology.normalize(form).unwrap(), "кот", "form {}", form);
        }

        assert_eq!(morphology.normalize("собака").unwrap(), "собак");
        assert_eq!(morphology.normalize("собаки").unwrap(), "собак");
    }

    #[test]
    fn test_normalize_folds_yo() {
        let morphology = RussianMorphology::new();

        let lemma = morphology.normalize("ёлка").unwrap();
        for form in ["ёлки", "ёлкой", "елки", "елка"] {
            assert_eq!(morphology.normalize(form).unwrap(), lemma, "form {}", form);
        }
        assert!(!lemma.contains('ё'));
    }

    #[test]
    fn test_normalize_rejects_foreign_words() {
        let morphology = RussianMorphology::new();

        assert_eq!(
            morphology.normalize("cat"),
            Err(MorphologyError::UnsupportedWord("cat".to_string()))
        );
        assert!(morphology.normalize("").is_err());
        assert!(morphology.normalize("кот1").is_err());
    }

    #[test]
    fn test_classify_function_words() {
        let morphology = RussianMorphology::new();

        assert_eq!(morphology.classify("в"), vec![WordClass::Preposition]);
        assert_eq!(morphology.classify("и"), vec![WordClass::Conjunction]);
        assert_eq!(morphology.classify("ли"), vec![WordClass::Particle]);
        assert_eq!(morphology.classify("ох"), vec![WordClass::Interjection]);
    }

    #[test]
    fn test_classify_word_with_several_classes() {
        let morphology = RussianMorphology::new();

        let classes = morphology.classify("да");
        assert!(classes.contains(&WordClass::Conjunction));
        assert!(classes.contains(&WordClass::Particle));
    }

    #[test]
    fn test_classify_content_word() {
        let morphology = RussianMorphology::new();

        assert_eq!(morphology.classify("собака"), vec![WordClass::Content]);
        assert!(!WordClass::Content.is_functional());
        assert!(WordClass::Particle.is_functional());
    }

    #[test]
    fn test_tables_are_lowercase_russian() {
        for word in PREPOSITIONS
            .iter()
            .chain(CONJUNCTIONS)
            .chain(PARTICLES)
            .chain(INTERJECTIONS)
        {
            assert!(RussianMorphology::is_russian(word), "bad entry {}", word);
        }
    }
}
