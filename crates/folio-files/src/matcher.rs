//! Recovery strategies for edits whose needle was not found verbatim
//!
//! Three strategies run in order after an exact match fails:
//!
//! 1. **Fuzzy line match**: the trimmed needle is scored against every
//!    trimmed line with the Ratcliff–Obershelp ratio `2·M / (|a| + |b|)`,
//!    where `M` is the number of characters in matching blocks.
//! 2. **Key phrase**: section titles and sentence-like spans are pulled out
//!    of the needle with markup removed and looked up verbatim.
//! 3. **Suggestions**: lines are ranked by how many of the needle's words
//!    they contain.
//!
//! Only the first strategy ever leads to a write; the others return
//! diagnostics so the caller can retry with a line-addressed insertion.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::Suggestion;

static SECTION_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(?:(?:sub){0,2}section|chapter)\*?\{([^}]*)\}")
        .expect("section title pattern is valid")
});

static MARKDOWN_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+(.+?)\s*$").expect("heading pattern is valid"));

static CONTROL_SEQUENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\[a-zA-Z]+\*?(?:\[[^\]]*\])?(?:\{[^}]*\})?")
        .expect("control sequence pattern is valid")
});

static SPAN_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?;\n]").expect("span boundary pattern is valid"));

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Spans at or below this many characters are too generic to anchor on
const MIN_PHRASE_CHARS: usize = 20;

/// Spans are cut to this many characters before lookup
const MAX_PHRASE_CHARS: usize = 50;

/// Lines at least this long get their most frequent characters excluded
/// from block seeding
const POPULAR_MIN_CHARS: usize = 200;

/// Ratcliff–Obershelp similarity of two strings in `[0, 1]`
///
/// The longest common block is taken first, then the text left and right
/// of it is matched the same way. Ties go to the block starting earliest in
/// `a`, then in `b`. Two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = BlockMatcher::new(&a, &b).matched_chars();
    2.0 * matched as f64 / total as f64
}

/// Longest-block search over two char slices
struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Ascending positions of each char in `b`
    positions: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            positions.entry(c).or_default().push(j);
        }
        if b.len() >= POPULAR_MIN_CHARS {
            let limit = b.len() / 100 + 1;
            positions.retain(|_, js| js.len() <= limit);
        }
        Self { a, b, positions }
    }

    /// `(i, j, len)` of the longest block in `a[alo..ahi]` and `b[blo..bhi]`
    fn longest_block(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
        // Length of the block ending at each position of `b`, for the previous row
        let mut run: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next = HashMap::new();
            if let Some(js) = self.positions.get(&self.a[i]) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let len = j
                        .checked_sub(1)
                        .and_then(|prev| run.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, len);
                    if len > best_len {
                        best_i = i + 1 - len;
                        best_j = j + 1 - len;
                        best_len = len;
                    }
                }
            }
            run = next;
        }

        // Popular chars never seed a block but may still extend one
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        (best_i, best_j, best_len)
    }

    /// Total length of all matching blocks
    fn matched_chars(&self) -> usize {
        let mut matched = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, len) = self.longest_block(alo, ahi, blo, bhi);
            if len == 0 {
                continue;
            }
            matched += len;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + len < ahi && j + len < bhi {
                pending.push((i + len, ahi, j + len, bhi));
            }
        }

        matched
    }
}

/// Best-scoring line for a needle
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// 0-based line index
    pub line_index: usize,
    /// Line text without its terminator
    pub line_text: String,
    /// Similarity of the trimmed needle to the trimmed line
    pub score: f64,
}

impl FuzzyMatch {
    /// 1-based line number
    pub fn line_number(&self) -> usize {
        self.line_index + 1
    }
}

/// A key phrase of the needle found verbatim in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPhraseHit {
    /// Phrase that was found
    pub phrase: String,
    /// 1-based number of the first line containing it
    pub line_number: usize,
    /// That line's text
    pub line_text: String,
}

/// Runs the fuzzy, key-phrase and suggestion strategies
#[derive(Debug, Clone)]
pub struct FallbackMatcher {
    suggestion_limit: usize,
}

impl FallbackMatcher {
    /// Creates a matcher returning at most `suggestion_limit` suggestions
    pub fn new(suggestion_limit: usize) -> Self {
        Self { suggestion_limit }
    }

    /// Maximum number of suggestions returned
    pub fn suggestion_limit(&self) -> usize {
        self.suggestion_limit
    }

    /// Scores every line and returns the best one, earliest line on ties
    ///
    /// No threshold is applied here; `None` only when the document has no
    /// lines.
    pub fn best_line(&self, needle: &str, content: &str) -> Option<FuzzyMatch> {
        let needle = needle.trim();
        let mut best: Option<FuzzyMatch> = None;

        for (line_index, line) in content.lines().enumerate() {
            let score = similarity_ratio(needle, line.trim());
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    line_index,
                    line_text: line.to_string(),
                    score,
                });
            }
        }

        best
    }

    /// Extracts candidate anchor phrases from a needle
    ///
    /// Section and heading titles come first, then sentence-like spans of
    /// the markup-stripped text. Duplicates are dropped.
    pub fn key_phrases(&self, needle: &str) -> Vec<String> {
        let mut phrases: Vec<String> = Vec::new();
        let mut push = |phrase: String| {
            if !phrase.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        };

        for caps in SECTION_TITLE.captures_iter(needle) {
            push(caps[1].trim().to_string());
        }
        for caps in MARKDOWN_HEADING.captures_iter(needle) {
            push(caps[1].trim().to_string());
        }

        let stripped = CONTROL_SEQUENCE.replace_all(needle, " ");
        for span in SPAN_BOUNDARY.split(&stripped) {
            let span = span.trim();
            if span.chars().count() > MIN_PHRASE_CHARS {
                push(span.chars().take(MAX_PHRASE_CHARS).collect());
            }
        }

        phrases
    }

    /// First key phrase of the needle that occurs verbatim on a single line
    pub fn find_key_phrase(&self, needle: &str, content: &str) -> Option<KeyPhraseHit> {
        self.key_phrases(needle).into_iter().find_map(|phrase| {
            content
                .lines()
                .enumerate()
                .find(|(_, line)| line.contains(phrase.as_str()))
                .map(|(index, line)| KeyPhraseHit {
                    line_number: index + 1,
                    line_text: line.to_string(),
                    phrase: phrase.clone(),
                })
        })
    }

    /// Lines sharing words with the needle, best first
    ///
    /// The score is the fraction of the needle's distinct lowercase words
    /// present in the line. Ties go to the earlier line.
    pub fn suggest(&self, needle: &str, content: &str) -> Vec<Suggestion> {
        let needle_words = word_set(needle);
        if needle_words.is_empty() {
            return Vec::new();
        }

        let mut suggestions: Vec<Suggestion> = content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let overlap = word_set(line).intersection(&needle_words).count();
                (overlap > 0).then(|| Suggestion {
                    line_number: index + 1,
                    line_text: line.to_string(),
                    overlap_word_count: overlap,
                    similarity_score: overlap as f64 / needle_words.len() as f64,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.similarity_score
                .total_cmp(&a.similarity_score)
                .then(a.line_number.cmp(&b.line_number))
        });
        suggestions.truncate(self.suggestion_limit);
        suggestions
    }
}

impl Default for FallbackMatcher {
    fn default() -> Self {
        Self::new(5)
    }
}

fn word_set(text: &str) -> HashSet<String> {
    WORD.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_identity_and_disjoint() {
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_similarity_partial() {
        // "abcd" vs "abxd": 3 matching chars, 2*3/8
        assert_eq!(similarity_ratio("abcd", "abxd"), 0.75);
    }

    #[test]
    fn test_similarity_takes_longest_block_first() {
        // "PPPP" is matched first; nothing is left on either side to pair
        // "qqq" or "rrr", so M = 4
        let ratio = similarity_ratio("PPPPqqqxrrr", "qqqyrrrPPPP");
        assert!((ratio - 8.0 / 22.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_boundary_is_exact() {
        // 3 of 5 chars shared on each side
        assert_eq!(similarity_ratio("abcde", "abcxy"), 0.6);
    }

    #[test]
    fn test_similarity_counts_chars_not_bytes() {
        assert_eq!(similarity_ratio("é", "é"), 1.0);
        assert_eq!(similarity_ratio("éa", "éb"), 0.5);
    }

    #[test]
    fn test_similarity_popular_chars_still_extend_blocks() {
        let line = format!("x{}y", " ".repeat(250));
        assert_eq!(similarity_ratio(&line, &line), 1.0);
    }

    #[test]
    fn test_best_line_prefers_highest_score() {
        let matcher = FallbackMatcher::default();
        let content = "The quick brown fox\nThe results are significant\nunrelated\n";

        let best = matcher
            .best_line("  The results were significant ", content)
            .unwrap();

        assert_eq!(best.line_index, 1);
        assert_eq!(best.line_number(), 2);
        assert_eq!(best.line_text, "The results are significant");
        assert!(best.score > 0.8);
    }

    #[test]
    fn test_best_line_first_wins_ties() {
        let matcher = FallbackMatcher::default();
        let best = matcher.best_line("same", "same\nsame\n").unwrap();
        assert_eq!(best.line_index, 0);
    }

    #[test]
    fn test_best_line_empty_document() {
        assert!(FallbackMatcher::default().best_line("x", "").is_none());
    }

    #[test]
    fn test_key_phrases_titles_first() {
        let matcher = FallbackMatcher::default();
        let needle = "\\section*{Related Work}\nPrior systems rely on version control for history.";

        let phrases = matcher.key_phrases(needle);

        assert_eq!(phrases[0], "Related Work");
        assert!(phrases
            .iter()
            .any(|p| p == "Prior systems rely on version control for history"));
    }

    #[test]
    fn test_key_phrases_markdown_heading() {
        let phrases = FallbackMatcher::default().key_phrases("## Results\n");
        assert_eq!(phrases, vec!["Results".to_string()]);
    }

    #[test]
    fn test_key_phrases_strip_markup_and_truncate() {
        let matcher = FallbackMatcher::default();
        let needle = "\\textbf[x]{bold} This sentence is definitely longer than fifty characters in total; short one.";

        let phrases = matcher.key_phrases(needle);

        assert_eq!(phrases.len(), 1);
        assert!(!phrases[0].contains("textbf"));
        assert_eq!(phrases[0].chars().count(), 50);
        assert!(phrases[0].starts_with("This sentence"));
    }

    #[test]
    fn test_key_phrases_drop_short_spans() {
        let phrases = FallbackMatcher::default().key_phrases("Too short. Also short!");
        assert!(phrases.is_empty());
    }

    #[test]
    fn test_find_key_phrase_reports_line() {
        let matcher = FallbackMatcher::default();
        let content = "\\section{Intro}\nWe measure latency across all regions daily.\n";
        let needle = "We measure latency across all regions daily. Then rewrite.";

        let hit = matcher.find_key_phrase(needle, content).unwrap();

        assert_eq!(hit.line_number, 2);
        assert_eq!(hit.phrase, "We measure latency across all regions daily");
        assert!(hit.line_text.starts_with("We measure"));
    }

    #[test]
    fn test_find_key_phrase_none() {
        let matcher = FallbackMatcher::default();
        assert!(matcher
            .find_key_phrase("A sentence that appears nowhere at all.", "other\ntext\n")
            .is_none());
    }

    #[test]
    fn test_suggest_ranks_by_overlap() {
        let matcher = FallbackMatcher::default();
        let content = "alpha beta\nbeta gamma delta\nnothing here\nalpha beta gamma\n";

        let suggestions = matcher.suggest("Alpha beta gamma", content);

        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].line_number, 4);
        assert_eq!(suggestions[0].overlap_word_count, 3);
        assert_eq!(suggestions[0].similarity_score, 1.0);
        // Equal scores fall back to line order
        assert_eq!(suggestions[1].line_number, 1);
        assert_eq!(suggestions[2].line_number, 2);
    }

    #[test]
    fn test_suggest_respects_limit() {
        let matcher = FallbackMatcher::new(2);
        let content = "word\nword\nword\nword\n";
        assert_eq!(matcher.suggest("word", content).len(), 2);
    }

    #[test]
    fn test_suggest_without_words() {
        assert!(FallbackMatcher::default().suggest("!!!", "a\nb\n").is_empty());
    }
}
