// Corpus building: tokens to a vocabulary and a bag-of-words vector.
//
// The pipeline only ever sees one document per request, so the "corpus" is a
// single bag of words. Ids are assigned in first-seen order so test output is
// reproducible; beyond that they carry no meaning.

use std::collections::HashMap;

use serde::Serialize;

/// Bidirectional term <-> id mapping. Ids are dense and start at 0.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    #[serde(skip)]
    ids: HashMap<String, usize>,
}

impl Vocabulary {
    /// Return the id for `term`, assigning the next free id if it's new.
    fn intern(&mut self, term: &str) -> usize {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.terms.len();
        self.terms.push(term.to_string());
        self.ids.insert(term.to_string(), id);
        id
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.terms.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.terms.iter().enumerate().map(|(id, t)| (id, t.as_str()))
    }
}

/// Sparse term counts for one document. Every stored count is >= 1 and
/// entries are ordered by term id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BagOfWords {
    counts: Vec<(usize, u32)>,
}

impl BagOfWords {
    /// Count for a term id; absent ids are zero.
    pub fn count(&self, term_id: usize) -> u32 {
        self.counts
            .binary_search_by_key(&term_id, |&(id, _)| id)
            .map(|idx| self.counts[idx].1)
            .unwrap_or(0)
    }

    pub fn unique_terms(&self) -> usize {
        self.counts.len()
    }

    pub fn total_tokens(&self) -> u64 {
        self.counts.iter().map(|&(_, c)| c as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.counts.iter().copied()
    }
}

/// The singleton corpus for one transcript.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Corpus {
    pub vocabulary: Vocabulary,
    pub bow: BagOfWords,
}

/// Map tokens to ids and count them.
pub fn build(tokens: &[String]) -> Corpus {
    let mut vocabulary = Vocabulary::default();
    let mut counts: Vec<u32> = Vec::new();

    for token in tokens {
        let id = vocabulary.intern(token);
        if id == counts.len() {
            counts.push(0);
        }
        counts[id] += 1;
    }

    // Ids are dense, so the position is the id
    let counts = counts.into_iter().enumerate().collect();

    Corpus {
        vocabulary,
        bow: BagOfWords { counts },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_ids_assigned_in_first_seen_order() {
        let corpus = build(&toks(&["cloud", "revenu", "cloud", "demand"]));
        assert_eq!(corpus.vocabulary.id("cloud"), Some(0));
        assert_eq!(corpus.vocabulary.id("revenu"), Some(1));
        assert_eq!(corpus.vocabulary.id("demand"), Some(2));
        assert_eq!(corpus.vocabulary.term(2), Some("demand"));
        assert_eq!(corpus.vocabulary.id("missing"), None);
    }

    #[test]
    fn test_counts_match_occurrences() {
        let corpus = build(&toks(&["cloud", "revenu", "cloud", "cloud"]));
        assert_eq!(corpus.bow.count(0), 3);
        assert_eq!(corpus.bow.count(1), 1);
        assert_eq!(corpus.bow.count(7), 0);
        assert_eq!(corpus.bow.unique_terms(), 2);
        assert_eq!(corpus.bow.total_tokens(), 4);
    }

    #[test]
    fn test_empty_tokens_give_empty_corpus() {
        let corpus = build(&[]);
        assert!(corpus.vocabulary.is_empty());
        assert!(corpus.bow.is_empty());
    }
}
