// Latent Dirichlet Allocation over a single-document corpus.
//
// Fit with collapsed Gibbs sampling: every token instance carries a topic
// assignment, and each sweep resamples the assignments from the conditional
// given all the others. Priors are symmetric (alpha = eta = 1/K), matching the
// usual "symmetric" defaults. The sampler is seeded, so a fixed seed gives
// identical topics on every run.
//
// Modeling caveat: with exactly one document there is no co-occurrence signal
// across documents. The K "topics" are partitions of one word-count vector
// into K groups, not themes discovered across a corpus. The output is still a
// valid set of K distributions, which is what callers rely on.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::corpus::Corpus;
use crate::error::AnalysisError;

pub const MIN_TOPICS: usize = 2;
pub const MAX_TOPICS: usize = 10;
pub const DEFAULT_TOPICS: usize = 5;

/// How many terms each surfaced topic lists.
pub const TOP_TERMS_PER_TOPIC: usize = 5;

/// Sampler settings. Everything that affects the output lives here.
#[derive(Debug, Clone)]
pub struct LdaParams {
    /// Full Gibbs sweeps over every token instance
    pub iterations: usize,
    /// RNG seed for the initial assignment and every draw
    pub seed: u64,
}

impl Default for LdaParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            seed: 42,
        }
    }
}

/// A fitted topic model. Each row of `topic_word` is a distribution over the
/// whole vocabulary and sums to 1.0.
#[derive(Debug, Clone, Serialize)]
pub struct TopicModel {
    terms: Vec<String>,
    topic_word: Vec<Vec<f64>>,
    doc_topic: Vec<f64>,
}

impl TopicModel {
    pub fn num_topics(&self) -> usize {
        self.topic_word.len()
    }

    /// Full term distribution for one topic, indexed by vocabulary id.
    pub fn topic_distribution(&self, topic: usize) -> Option<&[f64]> {
        self.topic_word.get(topic).map(Vec::as_slice)
    }

    /// The document's mixture over topics (theta). Sums to 1.0.
    pub fn document_topics(&self) -> &[f64] {
        &self.doc_topic
    }
}

/// One (term, weight) pair in a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTerm {
    pub term: String,
    pub weight: f64,
}

/// The surfaced view of one topic: top terms by descending weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Zero-based topic index
    pub topic: usize,
    pub terms: Vec<TopicTerm>,
}

/// Reject topic counts outside `MIN_TOPICS..=MAX_TOPICS`.
pub fn validate_topic_count(num_topics: usize) -> Result<(), AnalysisError> {
    if (MIN_TOPICS..=MAX_TOPICS).contains(&num_topics) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidTopicCount(num_topics))
    }
}

/// Fit `num_topics` topics to the corpus.
pub fn fit(
    corpus: &Corpus,
    num_topics: usize,
    params: &LdaParams,
) -> Result<TopicModel, AnalysisError> {
    validate_topic_count(num_topics)?;
    if corpus.bow.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let k = num_topics;
    let v = corpus.vocabulary.len();
    let alpha = 1.0 / k as f64;
    let eta = 1.0 / k as f64;
    let v_eta = v as f64 * eta;

    // One entry per token occurrence, ordered by term id
    let words: Vec<usize> = corpus
        .bow
        .iter()
        .flat_map(|(id, count)| std::iter::repeat(id).take(count as usize))
        .collect();

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut assignments: Vec<usize> = words.iter().map(|_| rng.random_range(0..k)).collect();

    // With a single document, the document-topic counts are the topic totals
    let mut topic_word = vec![vec![0u32; v]; k];
    let mut topic_totals = vec![0u32; k];
    for (&w, &z) in words.iter().zip(&assignments) {
        topic_word[z][w] += 1;
        topic_totals[z] += 1;
    }

    let mut cumulative = vec![0.0f64; k];
    for _ in 0..params.iterations {
        for (i, &w) in words.iter().enumerate() {
            let old = assignments[i];
            topic_word[old][w] -= 1;
            topic_totals[old] -= 1;

            let mut total = 0.0;
            for t in 0..k {
                let n_t = topic_totals[t] as f64;
                total += (n_t + alpha) * (topic_word[t][w] as f64 + eta) / (n_t + v_eta);
                cumulative[t] = total;
            }

            let draw = rng.random::<f64>() * total;
            let new = cumulative.iter().position(|&c| draw < c).unwrap_or(k - 1);

            assignments[i] = new;
            topic_word[new][w] += 1;
            topic_totals[new] += 1;
        }
    }

    let phi: Vec<Vec<f64>> = topic_word
        .iter()
        .zip(&topic_totals)
        .map(|(row, &n_t)| {
            let denom = n_t as f64 + v_eta;
            row.iter().map(|&n| (n as f64 + eta) / denom).collect()
        })
        .collect();

    let n = words.len() as f64;
    let theta: Vec<f64> = topic_totals
        .iter()
        .map(|&n_t| (n_t as f64 + alpha) / (n + k as f64 * alpha))
        .collect();

    info!(
        topics = k,
        vocabulary = v,
        tokens = words.len(),
        iterations = params.iterations,
        seed = params.seed,
        "Fitted LDA topic model"
    );

    Ok(TopicModel {
        terms: corpus
            .vocabulary
            .iter()
            .map(|(_, term)| term.to_string())
            .collect(),
        topic_word: phi,
        doc_topic: theta,
    })
}

/// Top `TOP_TERMS_PER_TOPIC` terms for every topic, in topic order.
///
/// Ties on weight are broken by ascending vocabulary id, so uniform (unused)
/// topics list terms in first-seen order.
pub fn extract_top_terms(model: &TopicModel) -> Vec<TopicRecord> {
    model
        .topic_word
        .iter()
        .enumerate()
        .map(|(topic, row)| {
            let mut ranked: Vec<usize> = (0..row.len()).collect();
            ranked.sort_by(|&a, &b| row[b].total_cmp(&row[a]).then(a.cmp(&b)));

            let terms = ranked
                .into_iter()
                .take(TOP_TERMS_PER_TOPIC)
                .filter(|&id| row[id] > 0.0)
                .map(|id| TopicTerm {
                    term: model.terms[id].clone(),
                    weight: row[id],
                })
                .collect();

            TopicRecord { topic, terms }
        })
        .collect()
}
