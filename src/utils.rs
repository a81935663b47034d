/// Utility functions for data processing and formatting
use std::collections::HashMap;
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable output
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Render an optional measurement, "-" when absent
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Summary statistics of one metric over a window of readings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricStats {
    pub samples: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    /// Sample standard deviation (n - 1), needs at least two values
    pub std_dev: Option<f64>,
}

/// Calculate mean, min, max, range and standard deviation
///
/// Absent values are skipped rather than treated as zero, so `samples` may
/// be smaller than the window.
pub fn calculate_stats<I>(values: I) -> MetricStats
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values: Vec<f64> = values.into_iter().flatten().collect();
    if values.is_empty() {
        return MetricStats::default();
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let std_dev = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };

    MetricStats {
        samples: values.len(),
        mean: Some(mean),
        min: Some(min),
        max: Some(max),
        range: Some(max - min),
        std_dev,
    }
}

/// Count occurrences of each label, most frequent first, ties by label
pub fn count_labels<'a, I>(labels: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}
