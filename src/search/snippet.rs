//! Snippet construction for search results

use crate::crawler::extract_body_text;
use crate::lemma::fold_yo;

const ELLIPSIS: &str = "...";

/// Builds a highlighted excerpt of a page's body text
///
/// The excerpt is centered on the first word containing the first query
/// lemma and reaches `radius` words to each side. Every word starting with
/// any query lemma is wrapped in `<b>`. Returns None when the first lemma
/// does not occur in the body.
pub fn build_snippet(html: &str, lemmas: &[String], radius: usize) -> Option<String> {
    let text = extract_body_text(html);
    snippet_of_text(&text, lemmas, radius)
}

fn snippet_of_text(text: &str, lemmas: &[String], radius: usize) -> Option<String> {
    let lemmas: Vec<String> = lemmas.iter().map(|l| fold_yo(&l.to_lowercase())).collect();
    let anchor_lemma = lemmas.first()?;
    let words: Vec<&str> = text.split_whitespace().collect();

    let anchor = words
        .iter()
        .position(|word| fold_yo(&word.to_lowercase()).contains(anchor_lemma.as_str()))?;

    let start = anchor.saturating_sub(radius);
    let end = (anchor + radius + 1).min(words.len());

    let window: Vec<String> = words[start..end]
        .iter()
        .map(|word| {
            let lower = fold_yo(&word.to_lowercase());
            if lemmas.iter().any(|lemma| lower.starts_with(lemma.as_str())) {
                format!("<b>{}</b>", word)
            } else {
                word.to_string()
            }
        })
        .collect();

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
        snippet.push(' ');
    }
    snippet.push_str(&window.join(" "));
    if end < words.len() {
        snippet.push(' ');
        snippet.push_str(ELLIPSIS);
    }

    Some(snippet)
}
