//! Keyword matching shared by the detector, assembler, and anonymizer.
//!
//! All table keywords are matched against text normalized by [`normalize`].
//! A keyword that starts and ends with a word character only matches on
//! word boundaries ("mad" does not match "made"); keywords with emoji or
//! punctuation at an edge match as plain substrings on that edge.

/// Lowercase the text and fold typographic apostrophes to ASCII.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace('\u{2019}', "'")
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns true if `keyword` occurs in the already-normalized `haystack`.
pub fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    count_keyword(haystack, keyword) > 0
}

/// Count non-overlapping, boundary-respecting occurrences of `keyword` in
/// the already-normalized `haystack`.
pub fn count_keyword(haystack: &str, keyword: &str) -> usize {
    let keyword = normalize(keyword);
    if keyword.is_empty() {
        return 0;
    }
    let check_start = keyword.chars().next().is_some_and(is_word_char);
    let check_end = keyword.chars().next_back().is_some_and(is_word_char);

    haystack
        .match_indices(keyword.as_str())
        .filter(|(pos, matched)| {
            let before_ok = !check_start
                || !haystack[..*pos].chars().next_back().is_some_and(is_word_char);
            let after_ok = !check_end
                || !haystack[pos + matched.len()..]
                    .chars()
                    .next()
                    .is_some_and(is_word_char);
            before_ok && after_ok
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_keywords_respect_boundaries() {
        assert!(contains_keyword("i am so mad", "mad"));
        assert!(!contains_keyword("i made dinner", "mad"));
        assert!(contains_keyword("mad!", "mad"));
    }

    #[test]
    fn phrase_keywords_match() {
        let text = normalize("I CAN\u{2019}T BELIEVE it");
        assert!(contains_keyword(&text, "can't believe"));
    }

    #[test]
    fn emoji_keywords_match_as_substrings() {
        assert!(contains_keyword("ok😭😭", "😭"));
    }

    #[test]
    fn punctuated_keyword_edges() {
        assert!(contains_keyword("wait what?!", "what?!"));
        assert!(!contains_keyword("somewhat?!", "what?!"));
    }

    #[test]
    fn counts_occurrences() {
        assert_eq!(count_keyword("love you, love love", "love"), 3);
        assert_eq!(count_keyword("lovely", "love"), 0);
    }

    #[test]
    fn empty_keyword_never_matches() {
        assert_eq!(count_keyword("anything", ""), 0);
    }
}
