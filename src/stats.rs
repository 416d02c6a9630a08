//! Column summaries for feature tables.

use std::collections::HashMap;

use ndarray::Array1;
use serde::Serialize;

/// Descriptive statistics over the defined values of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent for fewer than two values.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Frequency of one category in a nominal column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
    pub percent: f64,
}

/// Summarise the defined, finite entries of `values`. `None` when there are
/// none.
pub fn summarize_numeric(values: &[Option<f64>]) -> Option<NumericSummary> {
    let mut defined: Vec<f64> =
        values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if defined.is_empty() {
        return None;
    }
    defined.sort_by(f64::total_cmp);
    let count = defined.len();
    let median = if count % 2 == 1 {
        defined[count / 2]
    } else {
        0.5 * (defined[count / 2 - 1] + defined[count / 2])
    };
    let min = defined[0];
    let max = defined[count - 1];
    let array = Array1::from(defined);
    Some(NumericSummary {
        count,
        mean: array.mean()?,
        median,
        std_dev: (count >= 2).then(|| array.std(1.0)),
        min,
        max,
    })
}

/// Count each distinct label, most frequent first and ties alphabetically.
pub fn summarize_nominal<S: AsRef<str>>(labels: &[S]) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label.as_ref()).or_default() += 1;
    }
    let total = labels.len() as f64;
    let mut summary: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
            percent: 100.0 * count as f64 / total,
        })
        .collect();
    summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn numeric_summary_skips_missing_values() {
        let values = [Some(4.0), None, Some(1.0), Some(2.0), Some(f64::NAN)];
        let summary = summarize_numeric(&values).unwrap();
        assert_eq!(summary.count, 3);
        assert_relative_eq!(summary.mean, 7.0 / 3.0);
        assert_relative_eq!(summary.median, 2.0);
        assert_relative_eq!(summary.std_dev.unwrap(), (7.0_f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!((summary.min, summary.max), (1.0, 4.0));
    }

    #[test]
    fn even_count_median_and_single_value() {
        let summary = summarize_numeric(&[Some(1.0), Some(2.0), Some(3.0), Some(10.0)]).unwrap();
        assert_relative_eq!(summary.median, 2.5);
        let single = summarize_numeric(&[Some(5.0)]).unwrap();
        assert_eq!(single.std_dev, None);
        assert!(summarize_numeric(&[None, None]).is_none());
    }

    #[test]
    fn nominal_summary_orders_by_count_then_name() {
        let summary = summarize_nominal(&["b", "a", "c", "a", "b", "d"]);
        let order: Vec<_> = summary.iter().map(|c| (c.category.as_str(), c.count)).collect();
        assert_eq!(order, vec![("a", 2), ("b", 2), ("c", 1), ("d", 1)]);
        assert_relative_eq!(summary[0].percent, 100.0 / 3.0);
        assert!(summarize_nominal::<&str>(&[]).is_empty());
    }
}
