//! Stable, stateless tokenizer shared by indexing and query paths so BM25
//! scoring stays consistent between the two. Grounded on the pack's BM25
//! tokenizers (`velesdb-core::Bm25Index::tokenize`,
//! `hybrid_search.rs::tokenize`): lowercase, split on non-alphanumeric runs,
//! drop empties.

/// Lowercases `text` and splits it on any run of non-alphanumeric
/// characters, dropping empty tokens. Unlike some of the pack's BM25
/// tokenizers, single-character tokens are kept — there's no defined
/// minimum token length here, and dropping them would silently change
/// recall for short query terms.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_whitespace() {
        assert_eq!(
            tokenize("Vector databases are essential!"),
            vec!["vector", "databases", "are", "essential"]
        );
    }

    #[test]
    fn lowercases_and_drops_empty_runs() {
        assert_eq!(tokenize("  Swift--iOS  "), vec!["swift", "ios"]);
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("   ...   ").is_empty());
    }

    #[test]
    fn is_stable_and_deterministic() {
        let text = "The Quick, Brown Fox!";
        assert_eq!(tokenize(text), tokenize(text));
    }
}
