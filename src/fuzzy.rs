//! Fuzzy string similarity on Unicode scalar values.
//!
//! Scores are normalised to 0–100. Both functions work on `char`s rather
//! than bytes, so Hebrew (or any non-Latin) text is compared letter by
//! letter and never split inside a multi-byte sequence.

use std::collections::HashSet;

/// Normalised indel similarity: `200 · LCS(a, b) / (|a| + |b|)`.
///
/// Two empty strings are identical (100).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against any alignment of it inside
/// the longer one.
///
/// Windows considered, with `m` = shorter length and `n` = longer length:
/// growing prefixes `long[..i]` for `i < m`, full windows `long[i..i+m]`,
/// and shrinking suffixes `long[i..]`. A window is skipped when the
/// character at its open end does not occur in the shorter string, since
/// such a window cannot score better than its neighbour. Equal-length
/// inputs are scored in both directions.
///
/// ```
/// use form_classifier::fuzzy::partial_ratio;
///
/// assert_eq!(partial_ratio("בקשה לקצבה", "בקשה לקצבה והטבות"), 100.0);
/// assert_eq!(partial_ratio("", "anything"), 0.0);
/// ```
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() { 100.0 } else { 0.0 };
    }

    if a.len() == b.len() {
        return partial_ratio_ordered(&a, &b).max(partial_ratio_ordered(&b, &a));
    }

    if a.len() < b.len() {
        partial_ratio_ordered(&a, &b)
    } else {
        partial_ratio_ordered(&b, &a)
    }
}

/// `short.len() <= long.len()`, both non-empty.
fn partial_ratio_ordered(short: &[char], long: &[char]) -> f64 {
    let m = short.len();
    let n = long.len();
    let alphabet: HashSet<char> = short.iter().copied().collect();
    let mut best = 0.0_f64;

    // Growing prefixes of `long`.
    for i in 1..m {
        if !alphabet.contains(&long[i - 1]) {
            continue;
        }
        best = best.max(ratio_chars(short, &long[..i]));
        if best >= 100.0 {
            return 100.0;
        }
    }

    // Full-length windows.
    for i in 0..(n - m) {
        if !alphabet.contains(&long[i + m - 1]) {
            continue;
        }
        best = best.max(ratio_chars(short, &long[i..i + m]));
        if best >= 100.0 {
            return 100.0;
        }
    }

    // Shrinking suffixes, starting with the last full-length window.
    for i in (n - m)..n {
        if !alphabet.contains(&long[i]) {
            continue;
        }
        best = best.max(ratio_chars(short, &long[i..]));
        if best >= 100.0 {
            return 100.0;
        }
    }

    best
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Longest common subsequence length, two-row dynamic programme.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
