//! Ratcliff/Obershelp similarity ratio, matching the semantics of Python's
//! `difflib.SequenceMatcher(None, a, b).ratio()` closely enough for the
//! `>= 0.78` clustering threshold to carry over.

/// Finds the longest common contiguous run between `a` and `b`, returning
/// `(a_start, b_start, len)` for the leftmost-then-longest match, or `None`
/// if the strings share no characters.
fn longest_match(a: &[char], b: &[char]) -> Option<(usize, usize, usize)> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    // prev[j] = length of the matching run ending at a[i-1], b[j-1].
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = (0usize, 0usize, 0usize);
    for (i, &ca) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, &cb) in b.iter().enumerate() {
            if ca == cb {
                let run = prev[j] + 1;
                current[j + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            }
        }
        prev = current;
    }
    if best.2 == 0 { None } else { Some(best) }
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    match longest_match(a, b) {
        None => 0,
        Some((a_start, b_start, len)) => {
            let left = matching_chars(&a[..a_start], &b[..b_start]);
            let right = matching_chars(&a[a_start + len..], &b[b_start + len..]);
            left + len + right
        }
    }
}

/// Similarity ratio in `[0.0, 1.0]`: `2 * matches / (len(a) + len(b))`.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a_chars, &b_chars);
    (2 * matches) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_ratio_one() {
        assert!((ratio("city name", "city name") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_strings_have_ratio_zero() {
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn empty_strings_have_ratio_one() {
        assert_eq!(ratio("", ""), 1.0);
    }

    #[test]
    fn near_matches_cross_the_clustering_threshold() {
        // matches difflib.SequenceMatcher(None, "city name", "citi name").ratio()
        assert!(ratio("city name", "citi name") >= 0.78);
    }

    #[test]
    fn short_shared_prefix_scores_low() {
        assert!(ratio("month", "amount") < 0.78);
    }
}
