//! Track string normalization and fuzzy similarity
//!
//! [`sequence_ratio`] is the longest-matching-blocks ratio: find the longest
//! common block, recurse on both sides of it, and score `2 * M / T` where
//! `M` is the number of matched characters and `T` the combined length.

use once_cell::sync::Lazy;
use regex::Regex;

/// Parenthesised or bracketed content, e.g. `(VIP)`, `[Live at X]`
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("static regex"));

/// Standalone version words
static VERSION_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:vip|live|bootleg|promo|edit|mix|version|remix)\b").expect("static regex")
});

/// Collaboration delimiters between credited artists
static ARTIST_DELIMITERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfeat\.|\bfeaturing\b|\bfeat\b|&|\band\b|\bwith\b").expect("static regex")
});

const ARTIST_SEPARATOR: &str = "|";

/// Similarity of two strings in `[0, 1]`, case-insensitive
///
/// Two empty strings are identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Title with bracketed content and version words removed, lower-cased
pub fn normalize_title(title: &str) -> String {
    let stripped = BRACKETED.replace_all(title, " ");
    let stripped = VERSION_WORDS.replace_all(&stripped, " ");
    collapse_whitespace(&stripped).to_lowercase()
}

/// First credited artist, lower-cased
///
/// `"DJ Nova feat. MC Flow"` and `"DJ Nova"` both give `"dj nova"`.
pub fn primary_artist(artist: &str) -> String {
    artist_tokens(artist).into_iter().next().unwrap_or_default()
}

/// All credited artists, lower-cased, delimiters merged into single spaces
pub fn normalize_artist(artist: &str) -> String {
    artist_tokens(artist).join(" ")
}

fn artist_tokens(artist: &str) -> Vec<String> {
    let lowered = artist.to_lowercase();
    ARTIST_DELIMITERS
        .replace_all(&lowered, ARTIST_SEPARATOR)
        .split(ARTIST_SEPARATOR)
        .map(collapse_whitespace)
        .filter(|token| !token.is_empty())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Total size of all matching blocks
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    total
}

/// Longest common block in `a[alo..ahi]` x `b[blo..bhi]`
///
/// Ties resolve to the smallest `i`, then the smallest `j`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo + 1;
    let mut best = (alo, blo, 0);
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let col = j - blo + 1;
            cur[col] = if a[i] == b[j] { prev[col - 1] + 1 } else { 0 };
            let k = cur[col];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}
