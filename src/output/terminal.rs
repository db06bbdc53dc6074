// Colored terminal output for summaries and topic charts.
//
// This is the presentation side of the pipeline: it only reads finished
// results. Failed branches are shown as warnings, never as errors, so the
// other branch's output is still on screen.

use colored::{Color, Colorize};

use super::chart::topic_label;
use super::truncate_chars;
use crate::error::{AnalysisError, SummarizationError};
use crate::pipeline::analyze::{AnalysisReport, TopicReport};
use crate::summarize::summarizer::SummaryResult;

const BAR_WIDTH: usize = 30;

/// One color per topic so bars from different topics are easy to compare.
const TOPIC_COLORS: [Color; 5] = [
    Color::BrightCyan,
    Color::BrightMagenta,
    Color::BrightGreen,
    Color::BrightYellow,
    Color::BrightBlue,
];

/// Display both branches of a report.
pub fn display_report(report: &AnalysisReport) {
    match &report.summary {
        Ok(summary) => display_summary(summary),
        Err(e) => display_branch_warning("Summarization", e),
    }
    match &report.topics {
        Ok(topics) => display_topics(topics),
        Err(e) => display_branch_warning("Topic extraction", e),
    }
}

/// Display the generated summary.
pub fn display_summary(summary: &SummaryResult) {
    println!("\n{}", "=== Transcript Summary ===".bold());
    println!();
    println!("{}", summary.text);
    println!(
        "\n{}",
        format!("({} tokens)", summary.token_count).dimmed()
    );
}

/// Display topics as a comparative bar chart: one block per topic, each bar
/// scaled against the largest weight across all topics.
pub fn display_topics(report: &TopicReport) {
    println!("\n{}", "=== Topic Distribution ===".bold());

    if report.chart.is_empty() {
        println!(
            "\n  {} No topics could be extracted. Please ensure the transcript is substantial enough for topic modeling.",
            "Warning:".yellow()
        );
        return;
    }

    let max_weight = report.chart.max_weight();

    for (i, (label, rows)) in report.chart.topics().into_iter().enumerate() {
        let color = TOPIC_COLORS[i % TOPIC_COLORS.len()];
        let share = (0..report.topic_shares.len())
            .find(|&idx| topic_label(idx) == label)
            .map(|idx| report.topic_shares[idx]);

        match share {
            Some(share) => println!(
                "\n  {} {}",
                label.color(color).bold(),
                format!("(share {:.2})", share).dimmed()
            ),
            None => println!("\n  {}", label.color(color).bold()),
        }

        for row in rows {
            let filled = if max_weight > 0.0 {
                ((row.weight / max_weight) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let bar = format!(
                "[{}{}]",
                "=".repeat(filled.min(BAR_WIDTH)),
                " ".repeat(BAR_WIDTH.saturating_sub(filled))
            );
            println!(
                "    {:<18} {} {}",
                truncate_chars(&row.term, 18),
                bar.color(color),
                row.weight_display()
            );
        }
    }
    println!();
}

/// Show a failed branch as a non-fatal warning.
pub fn display_branch_warning(branch: &str, err: &AnalysisError) {
    println!(
        "\n{} {} failed: {}",
        "Warning:".yellow().bold(),
        branch,
        err
    );
    if let AnalysisError::Summarization(SummarizationError::Model(_)) = err {
        println!(
            "{}",
            "  Tip: run `transcript-lens download-model` if the model files are missing.".dimmed()
        );
    }
}
