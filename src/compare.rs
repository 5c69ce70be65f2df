//! Side-by-side comparison of two companies' ratios.

use crate::formatting::to_title;
use crate::model::{MetricValue, RatioMap};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub category: String,
    pub metric: String,
    pub title: String,
    pub left: Option<f64>,
    pub right: Option<f64>,
    /// `(left - right) / right * 100`; `None` when a side is missing or `right` is zero.
    pub difference: Option<f64>,
}

impl ComparisonRow {
    /// The left company is ahead on this metric.
    pub fn left_leads(&self) -> bool {
        matches!((self.left, self.right), (Some(left), Some(right)) if left > right)
    }
}

/// One row per metric found in either company, grouped by category in key order.
/// `category` limits the table to a single category.
pub fn compare_ratios(
    left: &RatioMap,
    right: &RatioMap,
    category: Option<&str>,
) -> Vec<ComparisonRow> {
    let categories: BTreeSet<&str> = left
        .keys()
        .chain(right.keys())
        .map(String::as_str)
        .filter(|name| category.is_none_or(|wanted| wanted == *name))
        .collect();

    let mut rows = Vec::new();
    for name in categories {
        let metrics: BTreeSet<&str> = left
            .get(name)
            .into_iter()
            .chain(right.get(name))
            .flat_map(|metrics| metrics.keys().map(String::as_str))
            .collect();
        for metric in metrics {
            let left_value = lookup(left, name, metric);
            let right_value = lookup(right, name, metric);
            rows.push(ComparisonRow {
                category: name.to_string(),
                metric: metric.to_string(),
                title: to_title(metric),
                left: left_value,
                right: right_value,
                difference: percent_difference(left_value, right_value),
            });
        }
    }
    rows
}

pub fn percent_difference(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    let (left, right) = (left?, right?);
    if right == 0.0 {
        return None;
    }
    let difference = (left - right) / right * 100.0;
    difference.is_finite().then_some(difference)
}

fn lookup(ratios: &RatioMap, category: &str, metric: &str) -> Option<f64> {
    ratios
        .get(category)
        .and_then(|metrics| metrics.get(metric))
        .and_then(MetricValue::as_f64)
}
