//! Lexical similarity over content words

use std::collections::HashSet;

/// Function words and modal verbs excluded from content-word comparison.
/// Modal verbs are handled separately by modality classification.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "in", "on", "for", "and", "or", "is", "are",
    "be", "been", "being", "with", "by", "at", "as", "that", "this", "these",
    "those", "it", "its", "from", "will", "was", "were", "has", "have", "had",
    "must", "shall", "should", "may", "might", "can", "could", "would",
    "not", "no", "any", "all", "if", "then", "than", "but", "so", "such",
];

/// Extract the content words of a claim text
///
/// Lowercased alphanumeric tokens with stopwords and single characters
/// removed. Digits survive: "99.5" matters for claim identity.
pub fn content_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '.')
        .map(|t| t.trim_matches('.').to_lowercase())
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Token-set Jaccard similarity over content words
///
/// |A ∩ B| / |A ∪ B|; two empty sets are not similar (0.0), so degenerate
/// all-stopword texts never merge.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_words_drop_stopwords_and_case() {
        let words = content_words("The uptime MUST be at least 99.5 percent");
        assert!(words.contains("uptime"));
        assert!(words.contains("99.5"));
        assert!(words.contains("percent"));
        assert!(!words.contains("the"));
        assert!(!words.contains("must"));
        assert!(!words.contains("be"));
    }

    #[test]
    fn test_jaccard_identical_and_disjoint() {
        let a = content_words("uptime guarantee 99.5 percent");
        assert_eq!(jaccard_similarity(&a, &a), 1.0);

        let b = content_words("response time 200 milliseconds");
        assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a = content_words("uptime guarantee 99.5");
        let b = content_words("uptime commitment 99.5");
        // 2 shared of 4 distinct
        let sim = jaccard_similarity(&a, &b);
        assert!((sim - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_sets_are_not_similar() {
        let empty = content_words("the of and");
        let full = content_words("uptime 99.5");
        assert_eq!(jaccard_similarity(&empty, &empty), 0.0);
        assert_eq!(jaccard_similarity(&empty, &full), 0.0);
    }
}
