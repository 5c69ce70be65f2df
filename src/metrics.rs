//! Ratio formatter: turns one category of a ratios payload into metric cards.

use crate::formatting::{format_fixed, to_title};
use crate::model::{MetricValue, RatioMap};
use rustc_hash::{FxHashMap, FxHasher};
use serde::Serialize;
use std::hash::{Hash, Hasher};
use tracing::debug;

pub const DEFAULT_CHANGE_LABEL: &str = "vs previous period";
pub const FALLBACK_DESCRIPTION: &str = "Financial performance metric";
pub const DEFAULT_BENCHMARK_FACTOR: f64 = 0.85;
pub const NOT_AVAILABLE: &str = "N/A";

const BUILTIN_DESCRIPTIONS: [(&str, &str); 14] = [
    ("currentRatio", "Current assets divided by current liabilities"),
    ("quickRatio", "Quick assets divided by current liabilities"),
    ("cashRatio", "Cash and equivalents divided by current liabilities"),
    ("loanToDepositRatio", "Net loans divided by total customer deposits"),
    ("roe", "Net income divided by shareholders' equity"),
    ("roa", "Net income divided by total assets"),
    ("npm", "Net profit divided by total revenue"),
    ("gpm", "Gross profit divided by total revenue"),
    ("nim", "Net interest income divided by total assets"),
    ("der", "Total liabilities divided by shareholders' equity"),
    ("dar", "Total liabilities divided by total assets"),
    ("debtToAssets", "Total liabilities divided by total assets"),
    ("equityMultiplier", "Total assets divided by shareholders' equity"),
    ("assetTurnover", "Revenue divided by total assets"),
];

/// One metric card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMetric {
    pub key: String,
    pub title: String,
    pub value: String,
    /// Synthetic. Produced by a [`ChangeSource`], never measured from history.
    pub change: f64,
    pub change_label: String,
    pub benchmark: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl DisplayMetric {
    pub fn direction(&self) -> Direction {
        if self.change > 0.0 {
            Direction::Up
        } else if self.change < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}

/// Metric key to one-sentence explanation.
#[derive(Debug, Clone)]
pub struct DescriptionTable {
    entries: FxHashMap<String, String>,
    fallback: String,
}

impl DescriptionTable {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_DESCRIPTIONS
                .into_iter()
                .map(|(key, text)| (key.to_string(), text.to_string()))
                .collect(),
            fallback: FALLBACK_DESCRIPTION.to_string(),
        }
    }

    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, text) in overrides {
            self.entries.insert(key.into(), text.into());
        }
        self
    }

    pub fn describe(&self, key: &str) -> &str {
        self.entries.get(key).map_or(self.fallback.as_str(), String::as_str)
    }
}

impl Default for DescriptionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Supplies the presentation-only "change" figure of a metric card.
///
/// The ratios service carries no period-over-period deltas, so whatever a
/// source returns is a placeholder and must be labelled as such.
pub trait ChangeSource {
    fn change_for(&mut self, key: &str, value: &MetricValue) -> f64;
}

impl<F> ChangeSource for F
where
    F: FnMut(&str, &MetricValue) -> f64,
{
    fn change_for(&mut self, key: &str, value: &MetricValue) -> f64 {
        self(key, value)
    }
}

/// Deterministic placeholder: a value in [-5.0, 10.0] derived from a hash of
/// the key and value, so the same payload always renders the same cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedChange;

impl ChangeSource for HashedChange {
    fn change_for(&mut self, key: &str, value: &MetricValue) -> f64 {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        value.to_string().hash(&mut hasher);
        let bucket = hasher.finish() % 151;
        f64::from(u32::try_from(bucket).unwrap_or(0)) / 10.0 - 5.0
    }
}

/// Same change for every metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedChange(pub f64);

impl ChangeSource for FixedChange {
    fn change_for(&mut self, _key: &str, _value: &MetricValue) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct FormatterConfig {
    pub benchmark_factor: f64,
    pub change_label: String,
    pub descriptions: DescriptionTable,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            benchmark_factor: DEFAULT_BENCHMARK_FACTOR,
            change_label: DEFAULT_CHANGE_LABEL.to_string(),
            descriptions: DescriptionTable::builtin(),
        }
    }
}

/// Metric cards for `category` using the default configuration and the
/// deterministic change placeholder.
pub fn format_metrics(ratios: Option<&RatioMap>, category: &str) -> Vec<DisplayMetric> {
    format_metrics_with(ratios, category, &FormatterConfig::default(), &mut HashedChange)
}

/// Metric cards for `category`, one per key, in key order.
///
/// An absent or empty category yields no cards; rendering a "no data" state
/// is up to the caller.
pub fn format_metrics_with<C>(
    ratios: Option<&RatioMap>,
    category: &str,
    config: &FormatterConfig,
    changes: &mut C,
) -> Vec<DisplayMetric>
where
    C: ChangeSource + ?Sized,
{
    let Some(metrics) = ratios.and_then(|ratios| ratios.get(category)) else {
        debug!(category, "no ratios for category");
        return Vec::new();
    };

    metrics
        .iter()
        .map(|(key, value)| DisplayMetric {
            key: key.clone(),
            title: to_title(key),
            value: format_value(key, value),
            change: changes.change_for(key, value),
            change_label: config.change_label.clone(),
            benchmark: format_benchmark(value, config.benchmark_factor),
            description: config.descriptions.describe(key).to_string(),
        })
        .collect()
}

/// Two decimals; a `%` suffix unless the key names a ratio.
pub fn format_value(key: &str, value: &MetricValue) -> String {
    match value.as_f64() {
        Some(number) if is_ratio_key(key) => format_fixed(number),
        Some(number) => format!("{}%", format_fixed(number)),
        None => value.to_string(),
    }
}

pub fn format_benchmark(value: &MetricValue, factor: f64) -> String {
    value
        .as_f64()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |number| format_fixed(number * factor))
}

fn is_ratio_key(key: &str) -> bool {
    key.to_lowercase().contains("ratio")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CategoryRatios;

    fn ratios() -> RatioMap {
        let mut liquidity = CategoryRatios::new();
        liquidity.insert("quickRatio".to_string(), MetricValue::Number(1.67));
        liquidity.insert("currentRatio".to_string(), MetricValue::Number(2.346));
        let mut profitability = CategoryRatios::new();
        profitability.insert("roe".to_string(), MetricValue::Number(20.0));
        profitability.insert("nim".to_string(), MetricValue::Text("pending".to_string()));
        profitability.insert("customYield".to_string(), MetricValue::Number(-3.0));
        let mut ratios = RatioMap::new();
        ratios.insert("liquidity".to_string(), liquidity);
        ratios.insert("profitability".to_string(), profitability);
        ratios.insert("activity".to_string(), CategoryRatios::new());
        ratios
    }

    #[test]
    fn liquidity_cards_in_key_order() {
        let ratios = ratios();
        let cards = format_metrics_with(
            Some(&ratios),
            "liquidity",
            &FormatterConfig::default(),
            &mut FixedChange(2.5),
        );
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Current Ratio");
        assert_eq!(cards[0].value, "2.35");
        assert_eq!(cards[0].benchmark, "1.99");
        assert_eq!(
            cards[0].description,
            "Current assets divided by current liabilities"
        );
        assert_eq!(cards[0].change_label, DEFAULT_CHANGE_LABEL);
        assert!((cards[0].change - 2.5).abs() < f64::EPSILON);
        assert_eq!(cards[1].title, "Quick Ratio");
        assert_eq!(cards[1].value, "1.67");
    }

    #[test]
    fn percentages_and_non_numeric_values() {
        let ratios = ratios();
        let cards = format_metrics(Some(&ratios), "profitability");
        let by_key: FxHashMap<&str, &DisplayMetric> =
            cards.iter().map(|card| (card.key.as_str(), card)).collect();

        assert_eq!(by_key["roe"].value, "20.00%");
        assert_eq!(by_key["roe"].benchmark, "17.00");
        assert_eq!(by_key["customYield"].value, "-3.00%");
        assert_eq!(by_key["customYield"].description, FALLBACK_DESCRIPTION);
        assert_eq!(by_key["nim"].value, "pending");
        assert_eq!(by_key["nim"].benchmark, NOT_AVAILABLE);
    }

    #[test]
    fn absent_or_empty_category_gives_no_cards() {
        let ratios = ratios();
        assert!(format_metrics(Some(&ratios), "leverage").is_empty());
        assert!(format_metrics(Some(&ratios), "activity").is_empty());
        assert!(format_metrics(Some(&ratios), "solvency").is_empty());
        assert!(format_metrics(None, "liquidity").is_empty());
    }

    #[test]
    fn ratio_detection_ignores_case() {
        assert_eq!(format_value("CASHRATIO", &MetricValue::Number(0.5)), "0.50");
        assert_eq!(format_value("der", &MetricValue::Number(0.5)), "0.50%");
        assert_eq!(format_value("der", &MetricValue::Null), "null");
        assert_eq!(format_value("der", &MetricValue::Bool(true)), "true");
    }

    #[test]
    fn hashed_change_is_reproducible_and_bounded() {
        let value = MetricValue::Number(2.34);
        let first = HashedChange.change_for("currentRatio", &value);
        assert!((HashedChange.change_for("currentRatio", &value) - first).abs() < f64::EPSILON);
        for key in ["roe", "roa", "der", "npm", "quickRatio"] {
            let change = HashedChange.change_for(key, &value);
            assert!((-5.0..=10.0).contains(&change));
        }
    }

    #[test]
    fn closures_and_overrides_are_injectable() {
        let ratios = ratios();
        let config = FormatterConfig {
            benchmark_factor: 1.0,
            change_label: "vs previous quarter".to_string(),
            descriptions: DescriptionTable::builtin()
                .with_overrides([("currentRatio", "Liquidity headroom")]),
        };
        let mut calls = 0;
        let mut counter = |_: &str, _: &MetricValue| {
            calls += 1;
            -1.0
        };
        let cards = format_metrics_with(Some(&ratios), "liquidity", &config, &mut counter);
        assert_eq!(calls, 2);
        assert_eq!(cards[0].description, "Liquidity headroom");
        assert_eq!(cards[0].benchmark, "2.35");
        assert_eq!(cards[0].change_label, "vs previous quarter");
        assert_eq!(cards[0].direction(), Direction::Down);
    }
}
