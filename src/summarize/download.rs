// Model download helper for the ONNX summarization model.
//
// Pulls the quantized BART-large-CNN export (encoder, decoder, tokenizer)
// from HuggingFace. Files are stored in a platform-appropriate directory
// (~/.local/share/transcript-lens/models/ on Linux) so they persist across runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace repo for the summarization model.
const SUMMARIZER_HF_URL: &str = "https://huggingface.co/Xenova/bart-large-cnn/resolve/main";

/// Local file names the model loader expects.
pub const ENCODER_FILE: &str = "encoder_model.onnx";
pub const DECODER_FILE: &str = "decoder_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// (remote path, local name, show progress)
const MODEL_FILES: [(&str, &str, bool); 3] = [
    ("tokenizer.json", TOKENIZER_FILE, false),
    ("onnx/encoder_model_quantized.onnx", ENCODER_FILE, true),
    ("onnx/decoder_model_quantized.onnx", DECODER_FILE, true),
];

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/transcript-lens/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("transcript-lens")
        .join("models")
}

/// Check whether every required model file exists.
pub fn model_files_present(dir: &Path) -> bool {
    MODEL_FILES
        .iter()
        .all(|(_, local, _)| dir.join(local).exists())
}

/// Download the summarization model files into `dir`.
///
/// Skips files that already exist. Creates the directory as needed.
pub async fn download_model(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    println!("\nSummarization model (bart-large-cnn, quantized):");

    for (remote, local, show_progress) in MODEL_FILES {
        let dest = dir.join(local);
        if dest.exists() {
            info!(file = local, "Model file already exists, skipping");
            println!("  {} (already exists)", local);
            continue;
        }
        println!("  Downloading {}...", local);
        download_file(&format!("{}/{}", SUMMARIZER_HF_URL, remote), &dest, show_progress).await?;
    }

    Ok(())
}

/// Progress display for one download: a byte bar when the size is known,
/// otherwise a spinner.
fn progress_for(total_size: Option<u64>) -> Result<ProgressBar> {
    let pb = match total_size {
        Some(size) => ProgressBar::new(size).with_style(
            ProgressStyle::default_bar()
                .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .context("invalid progress template")?
                .progress_chars("=> "),
        ),
        None => ProgressBar::new_spinner().with_style(
            ProgressStyle::default_spinner()
                .template("    {spinner} {bytes}")
                .context("invalid progress template")?,
        ),
    };
    Ok(pb)
}

/// Stream `url` into `dest`, optionally with a progress bar.
///
/// The body goes to `<dest>.part` and is renamed once complete, so an
/// interrupted download is never mistaken for a model file.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        Some(progress_for(response.content_length())?)
    } else {
        None
    };

    let partial = dest.with_extension("part");
    let mut file = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .with_context(|| format!("Download interrupted: {}", url))?
    {
        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        if let Some(pb) = &pb {
            pb.inc(chunk.len() as u64);
        }
    }
    file.flush()?;
    drop(file);

    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move {} into place", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!(url, dest = %dest.display(), "Downloaded model file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_app_dir() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("transcript-lens") && path_str.contains("models"),
            "Expected path containing transcript-lens/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("transcript-lens-test-nonexistent");
        assert!(!model_files_present(&dir));
    }

    #[test]
    fn test_model_files_present_true_when_files_exist() {
        let dir = std::env::temp_dir().join("transcript-lens-model-test");
        std::fs::create_dir_all(&dir).unwrap();
        for name in [ENCODER_FILE, DECODER_FILE, TOKENIZER_FILE] {
            std::fs::write(dir.join(name), b"fake").unwrap();
        }

        assert!(model_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
