/// Levenshtein edit distance over Unicode scalar values, single-row DP.
pub(crate) fn levenshtein(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let next = (diag + cost).min(row[j] + 1).min(row[j + 1] + 1);
            diag = row[j + 1];
            row[j + 1] = next;
        }
    }
    row[b.len()]
}

/// Lowercase, keep alphanumeric runs, join with single spaces.
pub(crate) fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-string similarity in [0.0, 1.0]: normalized Levenshtein over the
/// normalized forms. Case- and punctuation-insensitive.
pub(crate) fn similarity(s1: &str, s2: &str) -> f32 {
    let a = normalize(s1);
    let b = normalize(s2);

    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein(&a, &b) as f32 / max_len as f32)
}

/// Similarity between free-form text (a bank statement line) and a party
/// name. Bank descriptions bury the name among noise words, so plain
/// whole-string distance underestimates badly; score each name token by its
/// best match among the text tokens and average, keeping the whole-string
/// score as a floor.
pub(crate) fn name_similarity(text: &str, name: &str) -> f32 {
    let whole = similarity(text, name);

    let text_norm = normalize(text);
    let name_norm = normalize(name);
    let text_tokens: Vec<&str> = text_norm.split(' ').filter(|t| !t.is_empty()).collect();
    let name_tokens: Vec<&str> = name_norm.split(' ').filter(|t| !t.is_empty()).collect();
    if text_tokens.is_empty() || name_tokens.is_empty() {
        return whole;
    }

    let token_avg = name_tokens
        .iter()
        .map(|n| {
            text_tokens
                .iter()
                .map(|t| similarity(n, t))
                .fold(0.0f32, f32::max)
        })
        .sum::<f32>()
        / name_tokens.len() as f32;

    whole.max(token_avg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levenshtein_identical_is_zero() {
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn levenshtein_empty_is_other_length() {
        assert_eq!(levenshtein("", "abcd"), 4);
        assert_eq!(levenshtein("abcd", ""), 4);
    }

    #[test]
    fn levenshtein_single_edits() {
        assert_eq!(levenshtein("cat", "bat"), 1);
        assert_eq!(levenshtein("cat", "cart"), 1);
        assert_eq!(levenshtein("cart", "cat"), 1);
    }

    #[test]
    fn levenshtein_is_symmetric() {
        assert_eq!(levenshtein("amazon", "amzn"), levenshtein("amzn", "amazon"));
    }

    #[test]
    fn levenshtein_handles_multibyte() {
        assert_eq!(levenshtein("müller", "muller"), 1);
    }

    #[test]
    fn similarity_ignores_case_and_punctuation() {
        assert_eq!(similarity("JANE-DOE", "jane doe"), 1.0);
    }

    #[test]
    fn similarity_unrelated_is_low() {
        assert!(similarity("amazon", "starbucks") < 0.5);
    }

    #[test]
    fn name_similarity_finds_name_inside_noise() {
        // Whole-string distance alone would score this well under 0.5.
        let score = name_similarity("ACH JANE DOE 1204", "Jane Doe");
        assert_eq!(score, 1.0);
    }

    #[test]
    fn name_similarity_partial_initial() {
        let score = name_similarity("J Doe payment", "Jane Doe");
        assert!(score > 0.5 && score < 0.95, "score was {score}");
    }

    #[test]
    fn name_similarity_unrelated_stays_low() {
        assert!(name_similarity("totally different", "Jane Doe") < 0.5);
    }

    #[test]
    fn name_similarity_empty_text() {
        assert_eq!(name_similarity("", "Jane Doe"), 0.0);
    }
}
