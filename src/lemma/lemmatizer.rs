use crate::crawler::extract_text;
use crate::lemma::morphology::{Morphology, RussianMorphology};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Cyrillic words only; digits, Latin and mixed tokens never match
const WORD_PATTERN: &str = r"\b[а-яё]+\b";

fn word_regex() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(WORD_PATTERN).expect("word regex"))
}

/// Turns page text into lemma occurrence counts
///
/// Pure and side-effect free: no storage, no network. Shared by the crawl
/// path (page -> index) and the query path (query -> lemmas).
#[derive(Clone)]
pub struct Lemmatizer {
    morphology: Arc<dyn Morphology>,
}

impl Lemmatizer {
    pub fn new(morphology: Arc<dyn Morphology>) -> Self {
        Self { morphology }
    }

    /// Lemmatizer backed by [`RussianMorphology`]
    pub fn russian() -> Self {
        Self::new(Arc::new(RussianMorphology::new()))
    }

    /// Maps each lemma found in `text` (HTML or plain) to its occurrence count
    pub fn extract(&self, text: &str) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for lemma in self.lemmas(text) {
            *counts.entry(lemma).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct lemmas of a query, in order of first appearance
    pub fn query_lemmas(&self, query: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for lemma in self.lemmas(query) {
            if !seen.contains(&lemma) {
                seen.push(lemma);
            }
        }
        seen
    }

    /// Lemma of every content word, in text order
    fn lemmas(&self, text: &str) -> Vec<String> {
        let plain = extract_text(text).to_lowercase();
        let mut lemmas = Vec::new();

        for token in word_regex().find_iter(&plain) {
            let word = token.as_str();

            if self
                .morphology
                .classify(word)
                .iter()
                .any(|class| class.is_functional())
            {
                tracing::trace!("Skipping function word '{}'", word);
                continue;
            }

            match self.morphology.normalize(word) {
                Ok(lemma) => lemmas.push(lemma),
                Err(e) => tracing::trace!("Skipping word: {}", e),
            }
        }

        lemmas
    }
}

impl std::fmt::Debug for Lemmatizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lemmatizer")
            .field("pattern", &WORD_PATTERN)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lemma::morphology::{MorphologyError, WordClass};

    /// Dictionary with explicit entries; unknown words are their own lemma
    struct TableMorphology {
        lemmas: HashMap<&'static str, &'static str>,
        classes: HashMap<&'static str, WordClass>,
        broken: Vec<&'static str>,
    }

    impl TableMorphology {
        fn new() -> Self {
            Self {
                lemmas: HashMap::from([
                    ("коты", "кот"),
                    ("кота", "кот"),
                    ("котом", "кот"),
                    ("собаки", "собака"),
                    ("бегут", "бежать"),
                ]),
                classes: HashMap::from([
                    ("и", WordClass::Conjunction),
                    ("в", WordClass::Preposition),
                    ("не", WordClass::Particle),
                    ("ой", WordClass::Interjection),
                ]),
                broken: vec!["сломано"],
            }
        }
    }

    impl Morphology for TableMorphology {
        fn normalize(&self, word: &str) -> Result<String, MorphologyError> {
            if self.broken.iter().any(|b| *b == word) {
                return Err(MorphologyError::NoBaseForm(word.to_string()));
            }
            Ok(self.lemmas.get(word).copied().unwrap_or(word).to_string())
        }

        fn classify(&self, word: &str) -> Vec<WordClass> {
            vec![self.classes.get(word).copied().unwrap_or(WordClass::Content)]
        }
    }

    fn lemmatizer() -> Lemmatizer {
        Lemmatizer::new(Arc::new(TableMorphology::new()))
    }

    #[test]
    fn test_extract_counts_base_forms() {
        let counts = lemmatizer().extract("Коты и кота не видели, ой! Собаки бегут в лес.");

        assert_eq!(counts.get("кот"), Some(&2));
        assert_eq!(counts.get("собака"), Some(&1));
        assert_eq!(counts.get("бежать"), Some(&1));
        assert_eq!(counts.get("видели"), Some(&1));
        assert_eq!(counts.get("лес"), Some(&1));
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn test_extract_strips_markup() {
        let html = "<html><head><title>Кот</title><script>кот = 1</script></head>\
                    <body><p>котом</p><a href='/x'>коты</a></body></html>";
        let counts = lemmatizer().extract(html);

        assert_eq!(counts.get("кот"), Some(&3));
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn test_extract_ignores_other_alphabets_and_digits() {
        let counts = lemmatizer().extract("cat 42 кот2 абвcat кот");

        assert_eq!(counts.get("кот"), Some(&1));
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn test_extract_skips_words_that_fail_normalization() {
        let counts = lemmatizer().extract("сломано кот");

        assert_eq!(counts.get("сломано"), None);
        assert_eq!(counts.get("кот"), Some(&1));
    }

    #[test]
    fn test_extract_empty_text() {
        assert!(lemmatizer().extract("").is_empty());
        assert!(lemmatizer().extract("   ,,, 123").is_empty());
    }

    #[test]
    fn test_query_lemmas_keep_first_seen_order() {
        let lemmas = lemmatizer().query_lemmas("собаки и коты, кота собаки");
        assert_eq!(lemmas, vec!["собака".to_string(), "кот".to_string()]);
    }

    #[test]
    fn test_russian_lemmatizer() {
        let counts = Lemmatizer::russian().extract("Кот и коты, но не собака в доме.");

        assert_eq!(counts.get("кот"), Some(&2));
        assert_eq!(counts.get("собак"), Some(&1));
        assert!(!counts.contains_key("и"));
        assert!(!counts.contains_key("не"));
        assert!(!counts.contains_key("в"));
    }

    #[test]
    fn test_russian_lemmatizer_merges_yo_spellings() {
        let lemmatizer = Lemmatizer::russian();
        let counts = lemmatizer.extract("ёлка ёлки ёлкой");

        assert_eq!(counts.len(), 1);
        assert_eq!(counts.values().sum::<usize>(), 3);

        let lemma = counts.keys().next().unwrap().clone();
        assert_eq!(lemmatizer.query_lemmas("елки"), vec![lemma.clone()]);
        assert_eq!(lemmatizer.query_lemmas("ёлки"), vec![lemma]);
    }
}
