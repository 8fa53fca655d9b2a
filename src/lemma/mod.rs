//! Lemmatization module
//!
//! This module reduces text to lemma occurrence counts:
//! - `Morphology`: dictionary interface (base form + grammatical classes)
//! - `RussianMorphology`: Snowball stemmer with a closed-class word table
//! - `Lemmatizer`: markup stripping, tokenizing and function-word filtering
//!
//! # Example
//!
//! ```
//! use lexicrawl::lemma::Lemmatizer;
//!
//! let lemmatizer = Lemmatizer::russian();
//! let counts = lemmatizer.extract("<p>Коты и кот</p>");
//! assert_eq!(counts.get("кот"), Some(&2));
//! ```

mod lemmatizer;
mod morphology;

pub use lemmatizer::Lemmatizer;
pub use morphology::{fold_yo, Morphology, MorphologyError, RussianMorphology, WordClass};
