// Chart data: flattens topic records into rows for the comparative bar chart.
//
// Topic records come out of the trainer already structured, so there is no
// string parsing here. The formatter's job is labeling, cleaning terms, and
// signalling "nothing to draw" explicitly.

use serde::{Deserialize, Serialize};

use crate::topics::lda::TopicRecord;

/// Decimal digits used when displaying weights (tooltips, terminal, exports).
pub const WEIGHT_DISPLAY_PRECISION: usize = 4;

/// One bar: a term's weight within a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    /// "Topic 1", "Topic 2", ...
    pub topic_label: String,
    pub term: String,
    /// Full precision; round only for display
    pub weight: f64,
}

impl ChartRow {
    /// Weight formatted with fixed precision for hover/tooltip text.
    pub fn weight_display(&self) -> String {
        format!("{:.*}", WEIGHT_DISPLAY_PRECISION, self.weight)
    }
}

/// Flat table of (topic, term, weight) rows, in topic order then rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub rows: Vec<ChartRow>,
}

impl ChartData {
    /// True when there's nothing to chart. Callers show a notice instead.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows grouped by topic label, preserving the original order.
    pub fn topics(&self) -> Vec<(&str, Vec<&ChartRow>)> {
        let mut groups: Vec<(&str, Vec<&ChartRow>)> = Vec::new();
        for row in &self.rows {
            if let Some((label, rows)) = groups.last_mut() {
                if *label == row.topic_label.as_str() {
                    rows.push(row);
                    continue;
                }
            }
            groups.push((row.topic_label.as_str(), vec![row]));
        }
        groups
    }

    /// Largest weight in the table (0.0 when empty). Used to scale bars.
    pub fn max_weight(&self) -> f64 {
        self.rows.iter().map(|r| r.weight).fold(0.0, f64::max)
    }
}

/// Display label for a zero-based topic index.
pub fn topic_label(index: usize) -> String {
    format!("Topic {}", index + 1)
}

/// Strip surrounding whitespace and quote characters from a term.
fn clean_term(term: &str) -> &str {
    term.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

/// Flatten topic records into chart rows.
///
/// Records with no terms contribute no rows; if nothing is left the result is
/// an empty `ChartData` rather than an error.
pub fn format_for_chart(topics: &[TopicRecord]) -> ChartData {
    let rows = topics
        .iter()
        .enumerate()
        .flat_map(|(i, record)| {
            let label = topic_label(i);
            record.terms.iter().filter_map(move |t| {
                let term = clean_term(&t.term);
                if term.is_empty() {
                    return None;
                }
                Some(ChartRow {
                    topic_label: label.clone(),
                    term: term.to_string(),
                    weight: t.weight,
                })
            })
        })
        .collect();

    ChartData { rows }
}
