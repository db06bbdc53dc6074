// Abstractive summarization: trait-based abstraction over a frozen seq2seq model.
//
// The SummaryModel trait defines what the decoding loop needs. OnnxBartModel
// implements it with a local ONNX export of BART-large-CNN; tests plug in a
// scripted model instead.

pub mod download;
pub mod onnx;
pub mod summarizer;
pub mod traits;
