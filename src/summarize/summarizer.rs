// Length-constrained greedy summarization.
//
// Decoding is plain argmax at every step, so the same input and bounds always
// give the same summary. Length bounds count generated content tokens (the
// decoder start and forced-BOS prefix are not counted):
//   - the end-of-sequence token is masked out until `min_len` tokens exist
//   - generation stops once `max_len` tokens have been produced
// Special tokens are masked at every step, and no trigram may repeat anywhere
// in the decoder sequence, prefix included. The CNN checkpoints ship with a
// 4-beam search config; beam search is intentionally not implemented here, and
// a single greedy hypothesis is decoded instead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::traits::{SpecialTokens, SummaryModel};
use crate::error::SummarizationError;

pub const DEFAULT_MIN_LENGTH: usize = 30;
pub const DEFAULT_MAX_LENGTH: usize = 150;

/// Inputs with fewer content tokens than this are rejected as too short.
pub const DEFAULT_MIN_INPUT_TOKENS: usize = 10;

const NO_REPEAT_NGRAM_SIZE: usize = 3;

/// A generated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub text: String,
    /// Generated tokens, by the model's own tokenization
    pub token_count: usize,
}

/// Drives a `SummaryModel` through greedy decoding.
pub struct Summarizer {
    model: Arc<dyn SummaryModel>,
    min_input_tokens: usize,
}

impl Summarizer {
    pub fn new(model: Arc<dyn SummaryModel>) -> Self {
        Self {
            model,
            min_input_tokens: DEFAULT_MIN_INPUT_TOKENS,
        }
    }

    pub fn with_min_input_tokens(mut self, min_input_tokens: usize) -> Self {
        self.min_input_tokens = min_input_tokens;
        self
    }

    /// Summarize `text` into between `min_len` and `max_len` tokens.
    pub fn summarize(
        &self,
        text: &str,
        min_len: usize,
        max_len: usize,
    ) -> Result<SummaryResult, SummarizationError> {
        if max_len == 0 || min_len > max_len {
            return Err(SummarizationError::InvalidLengths {
                min: min_len,
                max: max_len,
            });
        }

        let special = self.model.special_tokens();
        let content = self
            .model
            .tokenize(text)
            .map_err(SummarizationError::Model)?;

        if content.len() < self.min_input_tokens.max(1) {
            return Err(SummarizationError::InsufficientContent {
                tokens: content.len(),
                required: self.min_input_tokens.max(1),
            });
        }

        let mut input_ids = Vec::with_capacity(content.len() + 2);
        input_ids.push(special.bos);
        input_ids.extend_from_slice(&content);
        input_ids.push(special.eos);

        let limit = self.model.context_window();
        if input_ids.len() > limit {
            return Err(SummarizationError::ContextOverflow {
                tokens: input_ids.len(),
                limit,
            });
        }

        let encoded = self
            .model
            .encode(&input_ids)
            .map_err(SummarizationError::Model)?;

        let mut decoder_ids = vec![special.decoder_start];
        decoder_ids.extend(special.forced_bos);
        let mut generated: Vec<u32> = Vec::new();

        while generated.len() < max_len {
            let mut logits = self
                .model
                .next_token_logits(&encoded, &decoder_ids)
                .map_err(SummarizationError::Model)?;

            mask_logits(&mut logits, &special, &decoder_ids, generated.len(), min_len);

            let next = argmax(&logits).ok_or_else(|| {
                SummarizationError::Model(anyhow::anyhow!(
                    "no admissible token after {} generated tokens",
                    generated.len()
                ))
            })?;

            if next == special.eos {
                break;
            }
            decoder_ids.push(next);
            generated.push(next);
        }

        debug!(
            input_tokens = content.len(),
            generated = generated.len(),
            "Greedy decoding finished"
        );

        let text = self
            .model
            .detokenize(&generated)
            .map_err(SummarizationError::Model)?
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(SummarizationError::Model(anyhow::anyhow!(
                "model produced an empty summary"
            )));
        }

        info!(
            input_tokens = content.len(),
            summary_tokens = generated.len(),
            "Generated summary"
        );

        Ok(SummaryResult {
            text,
            token_count: generated.len(),
        })
    }
}

/// Mask special tokens, early EOS, and tokens that would repeat a trigram of
/// `decoder_ids` (the decoder prefix followed by `generated_len` new tokens).
fn mask_logits(
    logits: &mut [f32],
    special: &SpecialTokens,
    decoder_ids: &[u32],
    generated_len: usize,
    min_len: usize,
) {
    for (id, logit) in logits.iter_mut().enumerate() {
        let id = id as u32;
        if id == special.eos {
            if generated_len < min_len {
                *logit = f32::NEG_INFINITY;
            }
        } else if special.is_special(id) {
            *logit = f32::NEG_INFINITY;
        }
    }

    for banned in repeated_ngram_completions(decoder_ids, NO_REPEAT_NGRAM_SIZE) {
        if let Some(logit) = logits.get_mut(banned as usize) {
            *logit = f32::NEG_INFINITY;
        }
    }
}

/// Tokens that would complete an n-gram already present in `seq`.
fn repeated_ngram_completions(seq: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || seq.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &seq[seq.len() + 1 - n..];
    seq.windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}

/// Index of the largest finite logit; lowest id wins ties.
fn argmax(logits: &[f32]) -> Option<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (id, &logit) in logits.iter().enumerate() {
        if !logit.is_finite() {
            continue;
        }
        match best {
            Some((_, top)) if logit <= top => {}
            _ => best = Some((id, logit)),
        }
    }
    best.map(|(id, _)| id as u32)
}
