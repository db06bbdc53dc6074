// Local ONNX summarization model: BART-large-CNN exported as separate
// encoder and decoder graphs.
//
// The decoder graph has no past-key-value inputs, so every step re-runs the
// decoder over the whole prefix. That's slower than a cached decoder but keeps
// the model files to the two plain exports plus the tokenizer.
//
// Files expected in the model directory:
//   encoder_model.onnx   inputs: input_ids, attention_mask -> last_hidden_state
//   decoder_model.onnx   inputs: input_ids, encoder_hidden_states,
//                                encoder_attention_mask -> logits
//   tokenizer.json

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::download::{DECODER_FILE, ENCODER_FILE, TOKENIZER_FILE};
use super::traits::{EncoderOutput, SpecialTokens, SummaryModel};

/// BART's maximum position embeddings.
const BART_CONTEXT_WINDOW: usize = 1024;

/// BART special token ids, used when the tokenizer doesn't name them.
const BART_BOS: u32 = 0;
const BART_PAD: u32 = 1;
const BART_EOS: u32 = 2;

/// Encoder-decoder summarization model running on ONNX Runtime.
pub struct OnnxBartModel {
    // ort::Session::run takes &mut self, so each graph sits behind a Mutex.
    // Callers already run inference on blocking threads.
    encoder: Mutex<Session>,
    decoder: Mutex<DecoderState>,
    tokenizer: Tokenizer,
    special: SpecialTokens,
}

/// The decoder session plus the encoder-side tensors it reads every step.
struct DecoderState {
    session: Session,
    encoder_inputs: PerInput<EncoderTensors>,
}

/// `encoder_hidden_states` and `encoder_attention_mask`, as fed to the decoder.
struct EncoderTensors {
    hidden_states: Tensor<f32>,
    attention_mask: Tensor<i64>,
}

impl EncoderTensors {
    fn from_output(encoded: &EncoderOutput) -> Result<Self> {
        let seq_len = encoded.seq_len() as i64;
        let hidden_states = Tensor::from_array((
            [1i64, seq_len, encoded.hidden_size as i64],
            encoded.hidden_states.clone(),
        ))
        .context("Failed to create encoder_hidden_states tensor")?;
        let attention_mask = Tensor::from_array(([1i64, seq_len], encoded.attention_mask.clone()))
            .context("Failed to create encoder_attention_mask tensor")?;
        Ok(Self {
            hidden_states,
            attention_mask,
        })
    }
}

/// Holds one value built for the most recent encoder input. Decoding steps
/// for the same input reuse it; a different input replaces it.
struct PerInput<T> {
    slot: Option<(Vec<u32>, T)>,
}

impl<T> PerInput<T> {
    fn new() -> Self {
        Self { slot: None }
    }

    fn get_or_try_build<F>(&mut self, input_ids: &[u32], build: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        let fresh = matches!(&self.slot, Some((ids, _)) if ids.as_slice() == input_ids);
        if !fresh {
            self.slot = None;
            let value = build()?;
            self.slot = Some((input_ids.to_vec(), value));
        }
        self.slot
            .as_ref()
            .map(|(_, value)| value)
            .ok_or_else(|| anyhow::anyhow!("encoder inputs were not built"))
    }
}

impl OnnxBartModel {
    /// Load both ONNX graphs and the tokenizer from `model_dir`.
    ///
    /// Run `transcript-lens download-model` first if the files are missing.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let encoder_path = model_dir.join(ENCODER_FILE);
        let decoder_path = model_dir.join(DECODER_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        for path in [&encoder_path, &decoder_path, &tokenizer_path] {
            if !path.exists() {
                anyhow::bail!(
                    "Model file not found: {}\nRun `transcript-lens download-model` to download it.",
                    path.display()
                );
            }
        }

        let encoder = load_session(&encoder_path)?;
        let decoder = load_session(&decoder_path)?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let bos = tokenizer.token_to_id("<s>").unwrap_or(BART_BOS);
        let pad = tokenizer.token_to_id("<pad>").unwrap_or(BART_PAD);
        let eos = tokenizer.token_to_id("</s>").unwrap_or(BART_EOS);
        let special = SpecialTokens {
            bos,
            eos,
            pad,
            // BART starts decoding from </s> and forces <s> as the first token
            decoder_start: eos,
            forced_bos: Some(bos),
        };

        debug!("Loaded ONNX summarization model from {}", model_dir.display());

        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(DecoderState {
                session: decoder,
                encoder_inputs: PerInput::new(),
            }),
            tokenizer,
            special,
        })
    }
}

fn load_session(path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create ONNX session builder")?
        .commit_from_file(path)
        .with_context(|| format!("Failed to load ONNX model from {}", path.display()))
}

impl SummaryModel for OnnxBartModel {
    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }

    fn context_window(&self) -> usize {
        BART_CONTEXT_WINDOW
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn detokenize(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Detokenization failed: {}", e))
    }

    fn encode(&self, input_ids: &[u32]) -> Result<EncoderOutput> {
        let seq_len = input_ids.len();
        let shape = [1i64, seq_len as i64];
        let ids: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask = vec![1i64; seq_len];

        let input_ids_tensor =
            Tensor::from_array((shape, ids)).context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask.clone()))
            .context("Failed to create attention_mask tensor")?;

        let hidden_states = {
            let mut session = self
                .encoder
                .lock()
                .map_err(|e| anyhow::anyhow!("Encoder session lock poisoned: {}", e))?;

            let outputs = session
                .run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor
                })
                .context("ONNX encoder inference failed")?;

            // Output shape: [1, seq_len, hidden_size]
            let (_out_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract encoder hidden states")?;

            data.to_vec()
        };

        if seq_len == 0 || hidden_states.len() % seq_len != 0 {
            anyhow::bail!(
                "Encoder returned {} values for {} input tokens",
                hidden_states.len(),
                seq_len
            );
        }
        let hidden_size = hidden_states.len() / seq_len;

        Ok(EncoderOutput {
            input_ids: input_ids.to_vec(),
            attention_mask,
            hidden_states,
            hidden_size,
        })
    }

    fn next_token_logits(&self, encoded: &EncoderOutput, decoder_ids: &[u32]) -> Result<Vec<f32>> {
        let dec_len = decoder_ids.len();

        let ids: Vec<i64> = decoder_ids.iter().map(|&id| id as i64).collect();
        let decoder_ids_tensor = Tensor::from_array(([1i64, dec_len as i64], ids))
            .context("Failed to create decoder input_ids tensor")?;

        let mut guard = self
            .decoder
            .lock()
            .map_err(|e| anyhow::anyhow!("Decoder session lock poisoned: {}", e))?;
        let DecoderState {
            session,
            encoder_inputs,
        } = &mut *guard;

        // Built on the first step for this input, then reused until it changes
        let encoder_tensors = encoder_inputs
            .get_or_try_build(&encoded.input_ids, || EncoderTensors::from_output(encoded))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => decoder_ids_tensor,
                "encoder_hidden_states" => &encoder_tensors.hidden_states,
                "encoder_attention_mask" => &encoder_tensors.attention_mask
            })
            .context("ONNX decoder inference failed")?;

        // Output shape: [1, dec_len, vocab_size]; keep only the last position
        let (_out_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract decoder logits")?;

        if dec_len == 0 || data.len() % dec_len != 0 {
            anyhow::bail!(
                "Decoder returned {} logits for {} decoder tokens",
                data.len(),
                dec_len
            );
        }
        let vocab_size = data.len() / dec_len;
        Ok(data[data.len() - vocab_size..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_input_builds_once_per_input() {
        let mut slot: PerInput<usize> = PerInput::new();
        let mut builds = 0;

        for _ in 0..5 {
            let value = slot
                .get_or_try_build(&[0, 7, 8, 2], || {
                    builds += 1;
                    Ok(builds)
                })
                .unwrap();
            assert_eq!(*value, 1);
        }
        assert_eq!(builds, 1);

        let value = slot
            .get_or_try_build(&[0, 9, 2], || {
                builds += 1;
                Ok(builds)
            })
            .unwrap();
        assert_eq!(*value, 2);
    }

    #[test]
    fn test_per_input_failed_build_is_retried() {
        let mut slot: PerInput<u32> = PerInput::new();
        assert!(slot
            .get_or_try_build(&[1], || anyhow::bail!("no tensor"))
            .is_err());
        assert_eq!(*slot.get_or_try_build(&[1], || Ok(3)).unwrap(), 3);
    }
}
