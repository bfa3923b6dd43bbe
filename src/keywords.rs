//! Token normalisation shared by local titles and catalog item names.
//!
//! Both sides go through the same `clean_line` so that punctuation differences
//! ("2-Sided" vs "2 Sided", "(Smile)" vs "Smile") do not break overlap.

use std::collections::BTreeSet;

use crate::config::MatchingConfig;
use crate::model::PartModel;

const STRIPPED: [char; 5] = ['(', ')', '-', '/', ','];

pub type KeywordSet = BTreeSet<String>;

pub fn clean_line(line: &str) -> String {
    line.chars().filter(|c| !STRIPPED.contains(c)).collect()
}

/// Lower-cased, space-separated tokens of `text` after cleaning
pub fn keywords(text: &str) -> KeywordSet {
    clean_line(text)
        .to_lowercase()
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Search query for a model title, in the catalog's vocabulary
pub fn build_query(title: &str, matching: &MatchingConfig) -> String {
    let words: Vec<String> = title
        .split(' ')
        .filter(|phrase| {
            let lower = phrase.to_lowercase();
            !matching.stop_phrases.iter().any(|stop| stop.to_lowercase() == lower)
        })
        .map(|phrase| {
            let mapped = matching
                .phrase_map
                .get(&phrase.to_lowercase())
                .map(String::as_str)
                .unwrap_or(phrase);
            clean_line(mapped)
        })
        .filter(|word| !word.is_empty())
        .collect();

    truncate_query(&words.join(" "), matching.max_query_len)
}

/// Cut at the last space before `max_len` chars, or hard-cut when there is none
pub fn truncate_query(query: &str, max_len: usize) -> String {
    if query.chars().count() <= max_len {
        return query.to_string();
    }

    let limit = query
        .char_indices()
        .nth(max_len)
        .map(|(idx, _)| idx)
        .unwrap_or(query.len());

    match query[..limit].rfind(' ') {
        Some(cut) => query[..cut].to_string(),
        None => query[..limit].to_string(),
    }
}

/// Query words plus every `!KEYWORDS` token of the model
pub fn model_keywords(query: &str, model: &PartModel) -> KeywordSet {
    let mut set: KeywordSet = query
        .to_lowercase()
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();

    for line in &model.keyword_lines {
        set.extend(keywords(line));
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::Path;

    fn set(words: &[&str]) -> KeywordSet {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("Head (Smile), 2-Sided / Black"), "Head Smile 2Sided  Black");
    }

    #[test]
    fn test_keywords_lowercase_and_dedup() {
        assert_eq!(
            keywords("Minifigure, Head Dual Sided  HEAD (Smile)"),
            set(&["minifigure", "head", "dual", "sided", "smile"])
        );
    }

    #[test]
    fn test_build_query_maps_and_drops_phrases() {
        let matching = MatchingConfig::default();
        let query = build_query("Minifig Head 2-Sided Smile / Frown Pattern", &matching);
        assert_eq!(query, "Minifigure Head Dual Sided Smile Frown");
    }

    #[test]
    fn test_build_query_truncates_at_word_boundary() {
        let matching = MatchingConfig {
            max_query_len: 20,
            ..MatchingConfig::default()
        };
        let query = build_query("Minifig Head Beard Stubble Brown", &matching);
        assert_eq!(query, "Minifigure Head");
    }

    #[test]
    fn test_truncate_without_space_hard_cuts() {
        assert_eq!(truncate_query("abcdefghij", 4), "abcd");
        assert_eq!(truncate_query("short", 75), "short");
    }

    #[test]
    fn test_model_keywords_merges_keyword_lines() {
        let model = PartModel::parse(
            Path::new("3626zz.dat"),
            "0 Minifig Head Beard\n0 !KEYWORDS stubble, Five-O'Clock\n",
        )
        .unwrap();
        let query = build_query(&model.title, &MatchingConfig::default());
        let keywords = model_keywords(&query, &model);
        assert_eq!(
            keywords,
            set(&["minifigure", "head", "beard", "stubble", "fiveo'clock"])
        );
    }

    proptest! {
        #[test]
        fn prop_clean_line_strips_punctuation(line in ".{0,64}") {
            let cleaned = clean_line(&line);
            prop_assert!(!cleaned.contains(STRIPPED));
        }

        #[test]
        fn prop_keywords_are_lowercase_and_non_empty(line in "[A-Za-z(),/ -]{0,64}") {
            for word in keywords(&line) {
                prop_assert!(!word.is_empty());
                prop_assert!(!word.contains(' '));
                prop_assert_eq!(word.clone(), word.to_lowercase());
            }
        }

        #[test]
        fn prop_truncated_query_fits(query in "[a-z ]{0,120}", max_len in 1usize..80) {
            prop_assert!(truncate_query(&query, max_len).chars().count() <= max_len);
        }
    }
}
