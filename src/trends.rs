//! Trend transformer: reshapes named trend series into chart rows.

use crate::formatting::to_title;
use crate::model::{TrendMap, TrendPoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

pub const INDUSTRY_AVG_KEY: &str = "industryAvg";
pub const DEFAULT_MAX_PERIODS: usize = 6;
pub const DEFAULT_MAX_PRIMARY_SERIES: usize = 4;

const SAMPLE_PERIODS: [&str; 6] = ["Q1 2023", "Q2 2023", "Q3 2023", "Q4 2023", "Q1 2024", "Q2 2024"];
const SAMPLE_CURRENT_RATIO: [f64; 6] = [1.8, 1.9, 2.1, 2.0, 2.2, 2.3];
const SAMPLE_QUICK_RATIO: [f64; 6] = [1.2, 1.3, 1.4, 1.3, 1.5, 1.6];
const SAMPLE_INDUSTRY_AVG: [f64; 6] = [1.5, 1.5, 1.6, 1.6, 1.7, 1.7];

/// One x-axis position: the period plus whichever series have a point there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub period: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl ChartRow {
    pub fn get(&self, series: &str) -> Option<f64> {
        self.values.get(series).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub rows: Vec<ChartRow>,
    /// Field names that occur in at least one row, in series order.
    pub series_keys: Vec<String>,
    /// True when the rows are the built-in illustration rather than real data.
    pub sample: bool,
}

/// Which series a renderer draws as solid lines and which as the dashed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPlan {
    pub primary: Vec<String>,
    pub reference: Option<String>,
}

impl ChartData {
    pub fn plan(&self, max_primary: usize) -> ChartPlan {
        let primary = self
            .series_keys
            .iter()
            .filter(|key| key.as_str() != INDUSTRY_AVG_KEY)
            .take(max_primary)
            .cloned()
            .collect();
        let reference = self
            .series_keys
            .iter()
            .find(|key| key.as_str() == INDUSTRY_AVG_KEY)
            .cloned();
        ChartPlan { primary, reference }
    }

    /// Finite values across every row, for axis scaling.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .flat_map(|row| row.values.values().copied())
            .filter(|value| value.is_finite())
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((low, high)) => Some((low.min(value), high.max(value))),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Most recent periods kept; 0 keeps all of them.
    pub max_periods: usize,
    pub max_primary_series: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            max_periods: DEFAULT_MAX_PERIODS,
            max_primary_series: DEFAULT_MAX_PRIMARY_SERIES,
        }
    }
}

/// The illustration shown when there is nothing real to chart.
pub fn sample_chart() -> ChartData {
    let rows = SAMPLE_PERIODS
        .iter()
        .enumerate()
        .map(|(idx, period)| ChartRow {
            period: (*period).to_string(),
            values: BTreeMap::from([
                ("currentRatio".to_string(), SAMPLE_CURRENT_RATIO[idx]),
                ("quickRatio".to_string(), SAMPLE_QUICK_RATIO[idx]),
                (INDUSTRY_AVG_KEY.to_string(), SAMPLE_INDUSTRY_AVG[idx]),
            ]),
        })
        .collect();
    ChartData {
        rows,
        series_keys: vec![
            "currentRatio".to_string(),
            "quickRatio".to_string(),
            INDUSTRY_AVG_KEY.to_string(),
        ],
        sample: true,
    }
}

pub fn build_chart_rows(trends: &TrendMap, category: Option<&str>) -> ChartData {
    build_chart_rows_with(trends, category, &ChartSettings::default())
}

/// Merges the series of `trends` (optionally only `<category>_*` ones) into
/// rows ordered by period, keeping the latest `settings.max_periods`.
///
/// Falls back to [`sample_chart`] when the input is empty or the filter
/// leaves nothing.
pub fn build_chart_rows_with(
    trends: &TrendMap,
    category: Option<&str>,
    settings: &ChartSettings,
) -> ChartData {
    let category = category.filter(|category| !category.is_empty());
    if trends.is_empty() {
        debug!("no trend series, using sample chart");
        return sample_chart();
    }

    let prefix = category.map(|category| format!("{category}_"));
    let retained: Vec<(String, &[TrendPoint])> = trends
        .iter()
        .filter(|(key, _)| {
            prefix
                .as_deref()
                .is_none_or(|prefix| key.starts_with(prefix))
        })
        .map(|(key, points)| (clean_series_name(key, category), points.as_slice()))
        .collect();

    if retained.is_empty() {
        debug!(category, "no trend series for category, using sample chart");
        return sample_chart();
    }

    let periods: BTreeSet<&str> = retained
        .iter()
        .flat_map(|(_, points)| points.iter().map(|point| point.period.as_str()))
        .collect();

    let mut rows: Vec<ChartRow> = periods
        .into_iter()
        .map(|period| {
            let mut values = BTreeMap::new();
            for (name, points) in &retained {
                if let Some(point) = points.iter().find(|point| point.period == period) {
                    values.insert(name.clone(), point.value);
                }
            }
            ChartRow {
                period: period.to_string(),
                values,
            }
        })
        .collect();

    if settings.max_periods > 0 && rows.len() > settings.max_periods {
        let excess = rows.len() - settings.max_periods;
        rows.drain(..excess);
    }

    let mut series_keys: Vec<String> = Vec::with_capacity(retained.len());
    for (name, _) in retained {
        let shown = rows.iter().any(|row| row.values.contains_key(&name));
        if shown && !series_keys.contains(&name) {
            series_keys.push(name);
        }
    }

    ChartData {
        rows,
        series_keys,
        sample: false,
    }
}

/// Display name of a series key.
///
/// With a category the `<category>_` prefix is dropped (`liquidity_currentRatio`
/// becomes `Current Ratio`); without one the whole key is title-cased so that
/// equal metric names from different categories stay apart.
pub fn clean_series_name(key: &str, category: Option<&str>) -> String {
    let stripped = category
        .and_then(|category| key.strip_prefix(category))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(key);
    to_title(stripped)
}

/// Legend text for raw metric keys; anything else is shown as is.
pub fn legend_label(key: &str) -> &str {
    match key {
        "currentRatio" => "Current Ratio",
        "quickRatio" => "Quick Ratio",
        "cashRatio" => "Cash Ratio",
        "roe" => "ROE (%)",
        "roa" => "ROA (%)",
        "npm" => "Net Profit Margin (%)",
        "nim" => "Net Interest Margin (%)",
        "gpm" => "Gross Profit Margin (%)",
        "der" => "Debt to Equity",
        "dar" => "Debt to Assets",
        "assetTurnover" => "Asset Turnover",
        "loanToDepositRatio" => "Loan to Deposit Ratio",
        "equityMultiplier" => "Equity Multiplier",
        INDUSTRY_AVG_KEY => "Industry Average",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(&str, f64)]) -> Vec<TrendPoint> {
        points
            .iter()
            .map(|(period, value)| TrendPoint::new(*period, *value))
            .collect()
    }

    #[test]
    fn empty_input_returns_sample_unmodified() {
        let chart = build_chart_rows(&TrendMap::new(), None);
        assert_eq!(chart, sample_chart());
        assert!(chart.sample);
        assert_eq!(chart.rows.len(), 6);
        assert_eq!(chart.rows[0].period, "Q1 2023");
        assert_eq!(chart.rows[5].get("currentRatio"), Some(2.3));
    }

    #[test]
    fn filtered_series_get_clean_names() {
        let mut trends = TrendMap::new();
        trends.insert(
            "liquidity_currentRatio".to_string(),
            series(&[("Q2", 2.0), ("Q1", 1.0)]),
        );
        trends.insert("profitability_roe".to_string(), series(&[("Q1", 18.0)]));

        let chart = build_chart_rows(&trends, Some("liquidity"));
        assert!(!chart.sample);
        assert_eq!(chart.rows.len(), 2);
        assert_eq!(chart.rows[0].period, "Q1");
        assert_eq!(chart.rows[0].get("Current Ratio"), Some(1.0));
        assert_eq!(chart.rows[1].period, "Q2");
        assert_eq!(chart.rows[1].get("Current Ratio"), Some(2.0));
        assert_eq!(chart.rows[0].values.len(), 1);
        assert_eq!(chart.series_keys, vec!["Current Ratio".to_string()]);
    }

    #[test]
    fn filter_matching_nothing_falls_back_to_sample() {
        let mut trends = TrendMap::new();
        trends.insert("liquidity_currentRatio".to_string(), series(&[("2023", 1.0)]));
        assert!(build_chart_rows(&trends, Some("leverage")).sample);
        // the separator is part of the prefix
        trends.clear();
        trends.insert("liquidityish_currentRatio".to_string(), series(&[("2023", 1.0)]));
        assert!(build_chart_rows(&trends, Some("liquidity")).sample);
    }

    #[test]
    fn missing_points_are_absent_not_zero() {
        let mut trends = TrendMap::new();
        trends.insert(
            "leverage_der".to_string(),
            series(&[("2021", 1.1), ("2022", 1.2), ("2023", 1.3)]),
        );
        trends.insert("leverage_dar".to_string(), series(&[("2022", 0.4)]));

        let chart = build_chart_rows(&trends, Some("leverage"));
        assert_eq!(chart.rows.len(), 3);
        assert_eq!(chart.rows[0].get("Dar"), None);
        assert_eq!(chart.rows[1].get("Dar"), Some(0.4));
        assert_eq!(chart.rows[2].values.len(), 1);
        assert_eq!(chart.series_keys, vec!["Dar".to_string(), "Der".to_string()]);
    }

    #[test]
    fn keeps_latest_six_periods() {
        let points: Vec<(String, f64)> = (2015..2024)
            .map(|year| (year.to_string(), f64::from(year - 2000)))
            .collect();
        let borrowed: Vec<(&str, f64)> = points.iter().map(|(p, v)| (p.as_str(), *v)).collect();
        let mut trends = TrendMap::new();
        trends.insert("activity_assetTurnover".to_string(), series(&borrowed));

        let chart = build_chart_rows(&trends, Some("activity"));
        let periods: Vec<&str> = chart.rows.iter().map(|row| row.period.as_str()).collect();
        assert_eq!(periods, vec!["2018", "2019", "2020", "2021", "2022", "2023"]);

        let unlimited = ChartSettings {
            max_periods: 0,
            ..ChartSettings::default()
        };
        assert_eq!(
            build_chart_rows_with(&trends, Some("activity"), &unlimited).rows.len(),
            9
        );
    }

    #[test]
    fn unfiltered_keys_keep_their_category() {
        let mut trends = TrendMap::new();
        trends.insert("liquidity_currentRatio".to_string(), series(&[("2023", 1.4)]));
        trends.insert("profitability_roe".to_string(), series(&[("2023", 17.0)]));
        let chart = build_chart_rows(&trends, None);
        assert_eq!(
            chart.series_keys,
            vec![
                "Liquidity Current Ratio".to_string(),
                "Profitability Roe".to_string()
            ]
        );
        assert_eq!(build_chart_rows(&trends, Some("")).series_keys.len(), 2);
    }

    #[test]
    fn first_point_wins_for_duplicate_periods() {
        let mut trends = TrendMap::new();
        trends.insert(
            "liquidity_cashRatio".to_string(),
            series(&[("2023", 0.5), ("2023", 0.9)]),
        );
        let chart = build_chart_rows(&trends, Some("liquidity"));
        assert_eq!(chart.rows.len(), 1);
        assert_eq!(chart.rows[0].get("Cash Ratio"), Some(0.5));
    }

    #[test]
    fn plan_caps_primary_lines_and_keeps_reference() {
        let chart = ChartData {
            rows: Vec::new(),
            series_keys: ["A", "B", INDUSTRY_AVG_KEY, "C", "D", "E"]
                .iter()
                .map(|key| (*key).to_string())
                .collect(),
            sample: false,
        };
        let plan = chart.plan(DEFAULT_MAX_PRIMARY_SERIES);
        assert_eq!(plan.primary, vec!["A", "B", "C", "D"]);
        assert_eq!(plan.reference.as_deref(), Some(INDUSTRY_AVG_KEY));

        let sample_plan = sample_chart().plan(DEFAULT_MAX_PRIMARY_SERIES);
        assert_eq!(sample_plan.primary, vec!["currentRatio", "quickRatio"]);
    }

    #[test]
    fn rows_serialize_with_a_single_period_key() {
        let chart = sample_chart();
        let json = serde_json::to_value(&chart.rows[0]).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert_eq!(object["period"], "Q1 2023");
        assert_eq!(object["quickRatio"], 1.2);
    }

    #[test]
    fn legend_and_range_helpers() {
        assert_eq!(legend_label("roe"), "ROE (%)");
        assert_eq!(legend_label(INDUSTRY_AVG_KEY), "Industry Average");
        assert_eq!(legend_label("Current Ratio"), "Current Ratio");
        assert_eq!(sample_chart().value_range(), Some((1.2, 2.3)));
    }
}
