// Summary model trait: the swap-ready abstraction over the seq2seq model.
//
// The decoding loop in `summarizer.rs` only needs tokenization, one encoder
// pass, and next-token logits. Anything that can provide those (the local
// ONNX BART export, or a scripted model in tests) can back the summarizer.

use anyhow::Result;

/// Special token ids the decoding loop needs to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub bos: u32,
    pub eos: u32,
    pub pad: u32,
    /// First token fed to the decoder
    pub decoder_start: u32,
    /// Token the decoder is forced to emit first, if the model requires one
    pub forced_bos: Option<u32>,
}

impl SpecialTokens {
    /// True for ids that must never appear in summary text.
    pub fn is_special(&self, id: u32) -> bool {
        id == self.bos
            || id == self.eos
            || id == self.pad
            || id == self.decoder_start
            || self.forced_bos == Some(id)
    }
}

/// Output of one encoder pass, reused for every decoding step.
#[derive(Debug, Clone)]
pub struct EncoderOutput {
    /// Encoder input including special tokens
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<i64>,
    /// Flattened [seq_len, hidden_size] hidden states
    pub hidden_states: Vec<f32>,
    pub hidden_size: usize,
}

impl EncoderOutput {
    pub fn seq_len(&self) -> usize {
        self.input_ids.len()
    }
}

/// A frozen encoder-decoder summarization model. Inference only.
pub trait SummaryModel: Send + Sync {
    fn special_tokens(&self) -> SpecialTokens;

    /// Maximum encoder input length, special tokens included.
    fn context_window(&self) -> usize;

    /// Tokenize text into content token ids (no special tokens).
    fn tokenize(&self, text: &str) -> Result<Vec<u32>>;

    /// Turn generated ids back into text, skipping special tokens.
    fn detokenize(&self, ids: &[u32]) -> Result<String>;

    /// Run the encoder over a full input sequence.
    fn encode(&self, input_ids: &[u32]) -> Result<EncoderOutput>;

    /// Logits over the vocabulary for the token following `decoder_ids`.
    fn next_token_logits(&self, encoded: &EncoderOutput, decoder_ids: &[u32]) -> Result<Vec<f32>>;
}
