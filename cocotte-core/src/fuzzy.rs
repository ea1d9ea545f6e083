//! Fuzzy name matching between extracted ingredients and the master food
//! table.
//!
//! Scoring ladder between two normalized names:
//! exact match 1.0; substring (both sides at least 3 chars) 0.8; otherwise
//! word-set overlap, floored at 0.7 when every word of the shorter set is
//! contained in the longer one. Matches below 0.5 are rejected.

use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;

/// Acceptance threshold for [`best_match`].
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Lower-case, decompose (NFD), strip combining marks, collapse whitespace,
/// trim. `"Tomates Fraîches"` becomes `"tomates fraiches"`.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped: String = lowered
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_combining_mark(c: char) -> bool {
    // Combining Diacritical Marks block plus its supplement; covers the
    // accents NFD produces for Latin text.
    matches!(c, '\u{0300}'..='\u{036F}' | '\u{1AB0}'..='\u{1AFF}' | '\u{1DC0}'..='\u{1DFF}')
}

/// Similarity between two already-normalized names, in `[0.0, 1.0]`.
pub fn score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if shorter.len() >= 3 && longer.contains(shorter) {
        return 0.8;
    }

    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let common = words_a.intersection(&words_b).count() as f64;
    let word_score = common / words_a.len().max(words_b.len()) as f64;

    let (small, large) = if words_a.len() <= words_b.len() {
        (&words_a, &words_b)
    } else {
        (&words_b, &words_a)
    };
    if small.iter().all(|w| large.contains(w)) {
        word_score.max(0.7)
    } else {
        word_score
    }
}

/// Find the best-scoring candidate for a raw ingredient name.
///
/// Returns the index of the winning candidate. Ties break in first-seen
/// order; scores below [`MATCH_THRESHOLD`] return `None`. Deterministic for
/// a fixed candidate snapshot.
pub fn best_match<'a, I>(raw_name: &str, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = normalize_name(raw_name);
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let candidate_score = score(&needle, &normalize_name(candidate));
        let beats_current = match best {
            Some((_, best_score)) => candidate_score > best_score,
            None => true,
        };
        if beats_current {
            best = Some((idx, candidate_score));
        }
    }

    best.filter(|(_, s)| *s >= MATCH_THRESHOLD).map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_case() {
        assert_eq!(normalize_name("Tomates Fraîches"), "tomates fraiches");
        assert_eq!(normalize_name("  Crème   fraîche "), "creme fraiche");
        assert_eq!(normalize_name("Œuf"), "œuf");
    }

    #[test]
    fn test_exact_match_scores_one() {
        assert_eq!(score("tomate", "tomate"), 1.0);
    }

    #[test]
    fn test_substring_scores_point_eight() {
        assert_eq!(score("tomate", "tomates fraiches"), 0.8);
        // Two-character needles never take the substring path.
        assert_eq!(score("ab", "abcdef"), 0.0);
    }

    #[test]
    fn test_word_containment_floor() {
        // Every word of the shorter set appears in the longer set, but the
        // word order differs so the substring rung does not apply.
        let s = score("roti poulet", "poulet roti fermier");
        assert!((s - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn test_word_overlap_without_containment() {
        // One word out of two in common, no containment: 1/2.
        let s = score("sauce tomate", "sauce soja");
        assert!((s - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_best_match_accepts_scenario_tomate() {
        // "tomates fraîches" against a food table containing "Tomate":
        // substring after normalization, accepted well above threshold.
        let foods = ["Carotte", "Tomate", "Oignon"];
        let idx = best_match("tomates fraîches", foods.iter().copied());
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn test_best_match_rejects_below_threshold() {
        let foods = ["farine de blé", "sucre glace"];
        assert_eq!(best_match("poivron rouge", foods.iter().copied()), None);
    }

    #[test]
    fn test_best_match_tie_breaks_first_seen() {
        // Both candidates normalize to the same name; the first wins.
        let foods = ["Tomate", "tomate"];
        assert_eq!(best_match("tomate", foods.iter().copied()), Some(0));
    }

    #[test]
    fn test_best_match_is_deterministic() {
        let foods = ["oignon jaune", "oignon rouge", "echalote"];
        let first = best_match("oignon", foods.iter().copied());
        for _ in 0..10 {
            assert_eq!(best_match("oignon", foods.iter().copied()), first);
        }
    }
}
