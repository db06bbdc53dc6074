// Transcript analysis: runs the topic and summary branches side by side.
//
// The two branches share nothing mutable except the resource cache. Each runs
// on a blocking thread (tokenization, Gibbs sampling, and ONNX inference are
// all CPU-bound) and returns its own Result, so one failing never costs the
// caller the other's output.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::ResourceCache;
use crate::config::Config;
use crate::error::{AnalysisError, SummarizationError};
use crate::output::chart::{format_for_chart, ChartData};
use crate::summarize::summarizer::{
    SummaryResult, Summarizer, DEFAULT_MAX_LENGTH, DEFAULT_MIN_INPUT_TOKENS, DEFAULT_MIN_LENGTH,
};
use crate::summarize::traits::SummaryModel;
use crate::topics::lda::{self, LdaParams, TopicRecord, DEFAULT_TOPICS};
use crate::topics::{corpus, preprocess};

/// Loads the summarization model. Called at most once per cache.
pub type ModelLoader = Arc<dyn Fn() -> anyhow::Result<Arc<dyn SummaryModel>> + Send + Sync>;

/// Per-request settings exposed to the caller.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub num_topics: usize,
    pub min_length: usize,
    pub max_length: usize,
    pub min_input_tokens: usize,
    pub lda: LdaParams,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            num_topics: DEFAULT_TOPICS,
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            min_input_tokens: DEFAULT_MIN_INPUT_TOKENS,
            lda: LdaParams::default(),
        }
    }
}

impl From<&Config> for AnalysisOptions {
    fn from(config: &Config) -> Self {
        Self {
            num_topics: config.num_topics,
            min_length: config.summary_min_length,
            max_length: config.summary_max_length,
            min_input_tokens: config.min_input_tokens,
            lda: config.lda_params(),
        }
    }
}

/// Output of the topic branch.
#[derive(Debug, Clone, Serialize)]
pub struct TopicReport {
    /// One record per topic, in topic order
    pub records: Vec<TopicRecord>,
    /// Flattened rows for charting
    pub chart: ChartData,
    /// The transcript's mixture over topics, in topic order
    pub topic_shares: Vec<f64>,
}

/// Both branch results. Either may have failed independently.
#[derive(Debug)]
pub struct AnalysisReport {
    pub summary: Result<SummaryResult, AnalysisError>,
    pub topics: Result<TopicReport, AnalysisError>,
}

/// Entry point for the analysis core. Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct Analyzer {
    resources: Arc<ResourceCache>,
    loader: ModelLoader,
}

impl Analyzer {
    /// New analyzer with its own empty resource cache.
    pub fn new(loader: ModelLoader) -> Self {
        Self::with_resources(Arc::new(ResourceCache::new()), loader)
    }

    pub fn with_resources(resources: Arc<ResourceCache>, loader: ModelLoader) -> Self {
        Self { resources, loader }
    }

    pub fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    /// Topic branch: preprocess (cached per transcript), fit, extract, format.
    ///
    /// The topic count is checked first, so an invalid count never reaches
    /// preprocessing or the trainer.
    pub fn extract_topics(
        &self,
        text: &str,
        options: &AnalysisOptions,
    ) -> Result<TopicReport, AnalysisError> {
        lda::validate_topic_count(options.num_topics)?;

        let corpus = self.resources.corpus(text, || {
            preprocess::preprocess(text).map(|tokens| corpus::build(&tokens))
        })?;

        let model = lda::fit(&corpus, options.num_topics, &options.lda)?;
        let records = lda::extract_top_terms(&model);
        let chart = format_for_chart(&records);

        info!(
            topics = records.len(),
            rows = chart.len(),
            "Extracted topics"
        );

        Ok(TopicReport {
            records,
            chart,
            topic_shares: model.document_topics().to_vec(),
        })
    }

    /// Summary branch: load the model (once) and run length-bounded decoding.
    pub fn summarize_text(
        &self,
        text: &str,
        options: &AnalysisOptions,
    ) -> Result<SummaryResult, AnalysisError> {
        let model = self
            .resources
            .summarizer(|| (self.loader)())
            .map_err(SummarizationError::Model)?;

        let summary = Summarizer::new(model)
            .with_min_input_tokens(options.min_input_tokens)
            .summarize(text, options.min_length, options.max_length)?;
        Ok(summary)
    }

    /// Topic branch on a blocking thread.
    pub async fn topics(
        &self,
        text: Arc<str>,
        options: AnalysisOptions,
    ) -> Result<TopicReport, AnalysisError> {
        let this = self.clone();
        run_blocking(move || this.extract_topics(&text, &options)).await
    }

    /// Summary branch on a blocking thread.
    pub async fn summarize(
        &self,
        text: Arc<str>,
        options: AnalysisOptions,
    ) -> Result<SummaryResult, AnalysisError> {
        let this = self.clone();
        run_blocking(move || this.summarize_text(&text, &options)).await
    }

    /// Run both branches concurrently and collect both results.
    pub async fn analyze(&self, text: &str, options: &AnalysisOptions) -> AnalysisReport {
        let text: Arc<str> = Arc::from(text);

        let (topics, summary) = tokio::join!(
            self.topics(Arc::clone(&text), options.clone()),
            self.summarize(Arc::clone(&text), options.clone()),
        );

        if let Err(e) = &topics {
            warn!(kind = e.kind(), error = %e, "Topic extraction failed");
        }
        if let Err(e) = &summary {
            warn!(kind = e.kind(), error = %e, "Summarization failed");
        }

        AnalysisReport { summary, topics }
    }
}

/// Run CPU-bound work off the async runtime. A panicking task becomes a
/// `Pipeline` error instead of taking the caller down.
async fn run_blocking<T, F>(work: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AnalysisError::Pipeline(anyhow::Error::new(e).context("analysis task failed")))?
}
