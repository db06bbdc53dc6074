// transcript-lens: abstractive summaries and topic charts for call transcripts
//
// `topics` and `summarize` are the two independent analysis branches.
// `pipeline::analyze` runs them side by side over a shared `cache`, and
// `output` renders whatever each branch produced.

pub mod cache;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod summarize;
pub mod topics;
