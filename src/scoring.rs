//! Summary scoring
//!
//! [`RougeScorer`] is the seam for an external ROUGE implementation.
//! [`NgramRecallScorer`] is a small in-process stand-in computing ROUGE-1,
//! ROUGE-2 and ROUGE-SU4 recall over Unicode word tokens.

use crate::types::RougeScores;
use rustc_hash::FxHashMap;
use std::hash::Hash;
use unicode_segmentation::UnicodeSegmentation;

/// Scores a candidate summary against reference summaries
pub trait RougeScorer {
    /// Recall triple of `candidate`, truncated to `target_length` words
    fn score(&self, candidate: &str, references: &[String], target_length: usize) -> RougeScores;
}

/// Lower-cased word-token ROUGE recall.
///
/// Counts are clipped per reference and summed over all references, so a
/// reference with more n-grams weighs more.
#[derive(Debug, Clone, Copy, Default)]
pub struct NgramRecallScorer;

/// Maximum number of words between the two words of a skip bigram
const SKIP_DISTANCE: usize = 4;

fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

fn counts<T: Eq + Hash>(items: impl IntoIterator<Item = T>) -> FxHashMap<T, usize> {
    let mut map = FxHashMap::default();
    for item in items {
        *map.entry(item).or_insert(0) += 1;
    }
    map
}

fn unigrams(tokens: &[String]) -> FxHashMap<&str, usize> {
    counts(tokens.iter().map(String::as_str))
}

fn bigrams(tokens: &[String]) -> FxHashMap<(&str, &str), usize> {
    counts(tokens.windows(2).map(|w| (w[0].as_str(), w[1].as_str())))
}

fn skip_bigrams(tokens: &[String]) -> FxHashMap<(&str, &str), usize> {
    let pairs = (0..tokens.len()).flat_map(|i| {
        let end = (i + SKIP_DISTANCE + 2).min(tokens.len());
        (i + 1..end).map(move |j| (tokens[i].as_str(), tokens[j].as_str()))
    });
    // SU4 also counts unigrams, encoded as (token, "")
    counts(pairs.chain(tokens.iter().map(|t| (t.as_str(), ""))))
}

fn overlap<K: Eq + Hash>(candidate: &FxHashMap<K, usize>, reference: &FxHashMap<K, usize>) -> (usize, usize) {
    let hits = reference
        .iter()
        .map(|(gram, &n)| n.min(candidate.get(gram).copied().unwrap_or(0)))
        .sum();
    (hits, reference.values().sum())
}

fn recall((hits, total): (usize, usize)) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl RougeScorer for NgramRecallScorer {
    fn score(&self, candidate: &str, references: &[String], target_length: usize) -> RougeScores {
        let mut tokens = tokenize(candidate);
        tokens.truncate(target_length);

        let cand_1 = unigrams(&tokens);
        let cand_2 = bigrams(&tokens);
        let cand_su4 = skip_bigrams(&tokens);

        let mut r1 = (0, 0);
        let mut r2 = (0, 0);
        let mut su4 = (0, 0);
        for reference in references {
            let ref_tokens = tokenize(reference);
            let add = |acc: &mut (usize, usize), (h, t): (usize, usize)| {
                acc.0 += h;
                acc.1 += t;
            };
            add(&mut r1, overlap(&cand_1, &unigrams(&ref_tokens)));
            add(&mut r2, overlap(&cand_2, &bigrams(&ref_tokens)));
            add(&mut su4, overlap(&cand_su4, &skip_bigrams(&ref_tokens)));
        }

        RougeScores::new(recall(r1), recall(r2), recall(su4))
    }
}
