//! Query-biased snippet extraction
//!
//! Picks the window of consecutive whitespace-separated words that covers
//! the most distinct query terms, preferring the earliest window on ties,
//! and marks matching words with a caller-supplied renderer.

use std::collections::HashSet;

/// Words per snippet window
pub const SNIPPET_WORDS: usize = 30;

/// ANSI bold-red marker for terminal output
pub fn ansi_mark(word: &str) -> String {
    format!("\x1b[1;31m{}\x1b[0m", word)
}

/// Quoting marker for JSON / plain-text output
pub fn quote_mark(word: &str) -> String {
    format!("'{}'", word)
}

/// Lowercase a word and strip ASCII punctuation for matching
fn normalize(word: &str) -> String {
    word.chars()
        .filter(|c| !c.is_ascii_punctuation())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Generate a marked snippet for a document
///
/// `query_terms` must already be analyzed with the same tokenizer variant
/// as the index. Windows that do not touch the document edges gain leading
/// `"... "` / trailing `" ..."` ellipses.
pub fn generate<F>(text: &str, query_terms: &HashSet<String>, mark: F) -> String
where
    F: Fn(&str) -> String,
{
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }

    let normalized: Vec<String> = words.iter().map(|w| normalize(w)).collect();

    let mut best_start = 0;
    let mut best_matched = -1i64;
    if words.len() > SNIPPET_WORDS {
        let mut seen: HashSet<&str> = HashSet::new();
        for start in 0..=words.len() - SNIPPET_WORDS {
            seen.clear();
            for norm in &normalized[start..start + SNIPPET_WORDS] {
                if query_terms.contains(norm) {
                    seen.insert(norm.as_str());
                }
            }
            if seen.len() as i64 > best_matched {
                best_matched = seen.len() as i64;
                best_start = start;
            }
        }
    }

    let end = words.len().min(best_start + SNIPPET_WORDS);
    let mut rendered = Vec::with_capacity(end - best_start);
    for i in best_start..end {
        if query_terms.contains(&normalized[i]) {
            rendered.push(mark(words[i]));
        } else {
            rendered.push(words[i].to_string());
        }
    }

    let mut snippet = String::new();
    if best_start > 0 {
        snippet.push_str("... ");
    }
    snippet.push_str(&rendered.join(" "));
    if end < words.len() {
        snippet.push_str(" ...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_short_document_returned_whole() {
        let snippet = generate("the quick brown fox", &terms(&["fox"]), quote_mark);
        assert_eq!(snippet, "the quick brown 'fox'");
    }

    #[test]
    fn test_window_prefers_most_distinct_terms() {
        // Far past the first window, two query terms appear together
        let mut words: Vec<String> = (0..80).map(|i| format!("filler{}", i)).collect();
        words[60] = "apple".to_string();
        words[61] = "banana".to_string();
        words[5] = "apple".to_string();
        let text = words.join(" ");

        let snippet = generate(&text, &terms(&["apple", "banana"]), quote_mark);
        assert!(snippet.contains("'apple' 'banana'"));
        assert!(snippet.starts_with("... "));
    }

    #[test]
    fn test_tie_resolves_to_earliest_window() {
        let mut words: Vec<String> = (0..100).map(|i| format!("w{}", i)).collect();
        words[10] = "match".to_string();
        words[70] = "match".to_string();
        let text = words.join(" ");

        let snippet = generate(&text, &terms(&["match"]), quote_mark);
        // The window around word 10 wins, so w70 stays unmarked and out
        assert!(snippet.contains("'match'"));
        assert!(snippet.contains("w9"));
        assert!(!snippet.contains("w70"));
    }

    #[test]
    fn test_ellipses_mark_trimmed_edges() {
        let words: Vec<String> = (0..50).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");

        let snippet = generate(&text, &terms(&["w49"]), quote_mark);
        assert!(snippet.starts_with("... "));
        assert!(!snippet.ends_with(" ..."));

        let snippet = generate(&text, &terms(&["w0"]), quote_mark);
        assert!(!snippet.starts_with("... "));
        assert!(snippet.ends_with(" ..."));
    }

    #[test]
    fn test_punctuation_stripped_for_matching() {
        let snippet = generate("A fox, quickly!", &terms(&["fox"]), quote_mark);
        assert_eq!(snippet, "A 'fox,' quickly!");
    }

    #[test]
    fn test_ansi_marker() {
        let snippet = generate("red fox", &terms(&["fox"]), ansi_mark);
        assert_eq!(snippet, "red \x1b[1;31mfox\x1b[0m");
    }

    #[test]
    fn test_no_matches_keeps_head_window() {
        let words: Vec<String> = (0..50).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");

        let snippet = generate(&text, &terms(&["absent"]), quote_mark);
        assert!(snippet.contains("w0"));
        assert!(snippet.ends_with(" ..."));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(generate("", &terms(&["x"]), quote_mark), "");
    }
}
