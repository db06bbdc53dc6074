use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::summarize::download::{default_model_dir, model_files_present};
use crate::summarize::summarizer::{
    DEFAULT_MAX_LENGTH, DEFAULT_MIN_INPUT_TOKENS, DEFAULT_MIN_LENGTH,
};
use crate::topics::lda::{LdaParams, DEFAULT_TOPICS};

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. Every value has a default;
/// CLI flags override the analysis settings per run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the ONNX summarization model files
    pub model_dir: PathBuf,
    /// Default topic count (2-10)
    pub num_topics: usize,
    /// Summary length bounds, in model tokens
    pub summary_min_length: usize,
    pub summary_max_length: usize,
    /// Inputs shorter than this many model tokens are not summarized
    pub min_input_tokens: usize,
    /// Gibbs sweeps for the topic model
    pub lda_iterations: usize,
    /// Seed for the topic model sampler
    pub lda_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        let lda = LdaParams::default();
        Self {
            model_dir: default_model_dir(),
            num_topics: DEFAULT_TOPICS,
            summary_min_length: DEFAULT_MIN_LENGTH,
            summary_max_length: DEFAULT_MAX_LENGTH,
            min_input_tokens: DEFAULT_MIN_INPUT_TOKENS,
            lda_iterations: lda.iterations,
            lda_seed: lda.seed,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Unset variables use the default; set-but-unparseable ones are an error
    /// so a typo doesn't silently change results.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            model_dir: env::var("TRANSCRIPT_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            num_topics: parse_var("TRANSCRIPT_NUM_TOPICS", defaults.num_topics)?,
            summary_min_length: parse_var("TRANSCRIPT_SUMMARY_MIN", defaults.summary_min_length)?,
            summary_max_length: parse_var("TRANSCRIPT_SUMMARY_MAX", defaults.summary_max_length)?,
            min_input_tokens: parse_var("TRANSCRIPT_MIN_INPUT_TOKENS", defaults.min_input_tokens)?,
            lda_iterations: parse_var("TRANSCRIPT_LDA_ITERATIONS", defaults.lda_iterations)?,
            lda_seed: parse_var("TRANSCRIPT_LDA_SEED", defaults.lda_seed)?,
        })
    }

    /// Sampler settings for the topic model.
    pub fn lda_params(&self) -> LdaParams {
        LdaParams {
            iterations: self.lda_iterations,
            seed: self.lda_seed,
        }
    }

    /// Check that the summarization model files are present.
    /// Call this before any operation that needs the summarizer.
    pub fn require_model(&self) -> Result<()> {
        if !model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Summarization model files not found in {}\n\
                 Run `transcript-lens download-model` to download them,\n\
                 or set TRANSCRIPT_MODEL_DIR to an existing model directory.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.num_topics, 5);
        assert_eq!(config.summary_min_length, 30);
        assert_eq!(config.summary_max_length, 150);
        assert_eq!(config.lda_params().seed, 42);
    }

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        let value: usize = parse_var("TRANSCRIPT_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_require_model_fails_for_missing_dir() {
        let config = Config {
            model_dir: std::env::temp_dir().join("transcript-lens-config-missing"),
            ..Config::default()
        };
        assert!(config.require_model().is_err());
    }
}
