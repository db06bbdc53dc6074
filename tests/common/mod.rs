// Shared test helpers: a scripted summarization model that needs no model files.
//
// ScriptedModel tokenizes on whitespace, so token counts are word counts. Its
// decoder always prefers the next id in a fixed cycle, and prefers EOS once
// `eos_after` content tokens have been generated. That is enough to exercise
// the length bounds, masking, and determinism of the real decoding loop.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;

use transcript_lens::pipeline::analyze::ModelLoader;
use transcript_lens::summarize::traits::{EncoderOutput, SpecialTokens, SummaryModel};

pub const VOCAB_SIZE: usize = 40;
const FIRST_CONTENT_ID: u32 = 3;

pub const SPECIAL: SpecialTokens = SpecialTokens {
    bos: 0,
    eos: 2,
    pad: 1,
    decoder_start: 2,
    forced_bos: Some(0),
};

pub struct ScriptedModel {
    pub eos_after: usize,
    pub context_window: usize,
    pub encode_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(eos_after: usize) -> Self {
        Self {
            eos_after,
            context_window: 1024,
            encode_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }
}

impl SummaryModel for ScriptedModel {
    fn special_tokens(&self) -> SpecialTokens {
        SPECIAL
    }

    fn context_window(&self) -> usize {
        self.context_window
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let span = (VOCAB_SIZE as u32) - FIRST_CONTENT_ID;
        Ok(text
            .split_whitespace()
            .map(|word| {
                let sum: u32 = word.bytes().map(u32::from).sum();
                FIRST_CONTENT_ID + sum % span
            })
            .collect())
    }

    fn detokenize(&self, ids: &[u32]) -> Result<String> {
        Ok(ids
            .iter()
            .filter(|&&id| !SPECIAL.is_special(id))
            .map(|id| format!("w{id}"))
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn encode(&self, input_ids: &[u32]) -> Result<EncoderOutput> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(EncoderOutput {
            input_ids: input_ids.to_vec(),
            attention_mask: vec![1; input_ids.len()],
            hidden_states: Vec::new(),
            hidden_size: 0,
        })
    }

    fn next_token_logits(&self, _encoded: &EncoderOutput, decoder_ids: &[u32]) -> Result<Vec<f32>> {
        // decoder_start + forced BOS come first
        let generated = decoder_ids.len().saturating_sub(2);
        let span = VOCAB_SIZE - FIRST_CONTENT_ID as usize;

        let mut logits = vec![0.0f32; VOCAB_SIZE];
        // Every special id scores highest, so masking is what keeps them out
        logits[SPECIAL.bos as usize] = 50.0;
        logits[SPECIAL.pad as usize] = 50.0;
        logits[FIRST_CONTENT_ID as usize + generated % span] = 5.0;
        logits[SPECIAL.eos as usize] = if generated >= self.eos_after { 100.0 } else { -1.0 };
        Ok(logits)
    }
}

/// A loader that hands out one shared scripted model and counts its calls.
pub fn counting_loader(model: Arc<ScriptedModel>, calls: Arc<AtomicUsize>) -> ModelLoader {
    Arc::new(move || -> Result<Arc<dyn SummaryModel>> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&model) as Arc<dyn SummaryModel>)
    })
}

/// A loader for a model whose files are missing.
pub fn failing_loader(calls: Arc<AtomicUsize>) -> ModelLoader {
    Arc::new(move || -> Result<Arc<dyn SummaryModel>> {
        calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("Model files not found in /nonexistent")
    })
}

/// Roughly a paragraph of an earnings call, long enough for both branches.
pub const EARNINGS_CALL: &str = "Good afternoon everyone and welcome to the quarterly earnings call. \
Revenue grew twelve percent year over year, driven by strong cloud adoption across enterprise \
customers. Cloud revenue now represents the majority of total revenue. Operating margin expanded \
as infrastructure costs declined. Management raised full year guidance, citing continued \
enterprise demand and a healthy pipeline. Subscription renewals remained strong and churn \
declined. We expect cloud growth to continue into next quarter as customers migrate workloads.";

pub const REVENUE_EXAMPLE: &str = "Revenue grew 12% year over year driven by strong cloud \
adoption. Management raised guidance for next quarter citing continued enterprise demand.";
