use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Metric key to value for one ratio category.
pub type CategoryRatios = BTreeMap<String, MetricValue>;

/// Category name to its metrics, as delivered by the ratios service.
pub type RatioMap = BTreeMap<String, CategoryRatios>;

/// Series key (usually `<category>_<metric>`) to its time-ordered points.
pub type TrendMap = BTreeMap<String, Vec<TrendPoint>>;

/// A single ratio value.
///
/// The service normally sends numbers, but nothing stops it from sending a
/// string or a null, so the raw shape is kept and the formatter decides what
/// to do with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub value: f64,
}

impl TrendPoint {
    pub fn new(period: impl Into<String>, value: f64) -> Self {
        Self {
            period: period.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub sector: String,
}

/// Latest ratios and trend series for one company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatioSnapshot {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub latest_period: String,
    #[serde(default)]
    pub ratios: RatioMap,
    #[serde(default)]
    pub trends: TrendMap,
}

impl RatioSnapshot {
    /// Known categories that carry at least one metric, in sidebar order.
    pub fn available_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| {
                self.ratios
                    .get(category.as_str())
                    .is_some_and(|metrics| !metrics.is_empty())
            })
            .collect()
    }
}

/// Full company record from `/company/{ticker}`, including every reported period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub snapshot: RatioSnapshot,
    #[serde(default)]
    pub all_periods: BTreeMap<String, RatioMap>,
}

impl CompanyDetail {
    /// Metrics of `category` for every period that reports it, oldest first.
    pub fn category_history(&self, category: &str) -> Vec<(&str, &CategoryRatios)> {
        self.all_periods
            .iter()
            .filter_map(|(period, ratios)| {
                ratios
                    .get(category)
                    .filter(|metrics| !metrics.is_empty())
                    .map(|metrics| (period.as_str(), metrics))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparedCompany {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub ratios: RatioMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyRatios {
    #[serde(default)]
    pub roe: f64,
    #[serde(default)]
    pub roa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorMember {
    pub ticker: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub latest_period: String,
    #[serde(default)]
    pub key_ratios: KeyRatios,
}

pub type SectorMap = BTreeMap<String, Vec<SectorMember>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub companies_loaded: usize,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOutcome {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Liquidity,
    Profitability,
    Leverage,
    Activity,
}

impl Category {
    pub const ALL: [Self; 4] = [
        Self::Liquidity,
        Self::Profitability,
        Self::Leverage,
        Self::Activity,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Liquidity => "liquidity",
            Self::Profitability => "profitability",
            Self::Leverage => "leverage",
            Self::Activity => "activity",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Liquidity => "Liquidity",
            Self::Profitability => "Profitability",
            Self::Leverage => "Leverage",
            Self::Activity => "Activity",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Liquidity => "Short-term financial health",
            Self::Profitability => "Revenue and profit metrics",
            Self::Leverage => "Debt and equity ratios",
            Self::Activity => "Asset utilization efficiency",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ratio category '{0}' (expected liquidity, profitability, leverage or activity)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Case-insensitive ticker/name search with an optional exact sector filter.
pub fn filter_companies<'a>(
    companies: &'a [Company],
    query: Option<&str>,
    sector: Option<&str>,
) -> Vec<&'a Company> {
    let needle = query.map(str::to_lowercase).unwrap_or_default();
    companies
        .iter()
        .filter(|company| {
            needle.is_empty()
                || company.ticker.to_lowercase().contains(&needle)
                || company.name.to_lowercase().contains(&needle)
        })
        .filter(|company| sector.is_none_or(|wanted| company.sector.eq_ignore_ascii_case(wanted)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn companies() -> Vec<Company> {
        vec![
            Company {
                ticker: "BBCA.JK".to_string(),
                name: "Bank Central Asia Tbk".to_string(),
                sector: "Banking".to_string(),
            },
            Company {
                ticker: "TLKM.JK".to_string(),
                name: "Telkom Indonesia Tbk".to_string(),
                sector: "Telecommunications".to_string(),
            },
            Company {
                ticker: "BMRI.JK".to_string(),
                name: "Bank Mandiri Tbk".to_string(),
                sector: "Banking".to_string(),
            },
        ]
    }

    #[test]
    fn snapshot_deserializes_mixed_values() {
        let json = r#"{
            "ticker": "BBCA.JK",
            "name": "Bank Central Asia Tbk",
            "sector": "Banking",
            "latest_period": "2024",
            "ratios": {
                "liquidity": {"loanToDepositRatio": 0.78},
                "profitability": {"roe": 21.5, "nim": "n/a", "roa": null},
                "activity": {}
            },
            "trends": {
                "liquidity_loanToDepositRatio": [{"period": "2023", "value": 0.8}]
            }
        }"#;
        let snapshot: RatioSnapshot = serde_json::from_str(json).unwrap();
        let profitability = &snapshot.ratios["profitability"];
        assert_eq!(profitability["roe"], MetricValue::Number(21.5));
        assert_eq!(profitability["nim"], MetricValue::Text("n/a".to_string()));
        assert_eq!(profitability["roa"], MetricValue::Null);
        assert_eq!(snapshot.trends["liquidity_loanToDepositRatio"].len(), 1);
        assert_eq!(
            snapshot.available_categories(),
            vec![Category::Liquidity, Category::Profitability]
        );
    }

    #[test]
    fn company_detail_flattens_snapshot_and_keeps_periods() {
        let json = r#"{
            "ticker": "TLKM.JK",
            "name": "Telkom Indonesia Tbk",
            "sector": "Telecommunications",
            "latest_period": "2024",
            "ratios": {"leverage": {"der": 0.9}},
            "all_periods": {
                "2022": {"leverage": {"der": 1.1}},
                "2023": {"liquidity": {"currentRatio": 0.8}},
                "2024": {"leverage": {"der": 0.9}}
            }
        }"#;
        let detail: CompanyDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.snapshot.name, "Telkom Indonesia Tbk");
        assert!(detail.snapshot.trends.is_empty());
        let history = detail.category_history("leverage");
        let periods: Vec<&str> = history.iter().map(|(period, _)| *period).collect();
        assert_eq!(periods, vec!["2022", "2024"]);
        assert_eq!(history[0].1["der"], MetricValue::Number(1.1));
        assert!(detail.category_history("activity").is_empty());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Leverage".parse::<Category>(), Ok(Category::Leverage));
        assert_eq!(" activity ".parse::<Category>(), Ok(Category::Activity));
        let err = "solvency".parse::<Category>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown ratio category 'solvency' (expected liquidity, profitability, leverage or activity)"
        );
    }

    #[test]
    fn metric_value_numeric_view() {
        assert_eq!(MetricValue::Number(1.5).as_f64(), Some(1.5));
        assert_eq!(MetricValue::Number(f64::NAN).as_f64(), None);
        assert_eq!(MetricValue::Text("1.5".to_string()).as_f64(), None);
        assert_eq!(MetricValue::Null.to_string(), "null");
    }

    #[test]
    fn company_filter_matches_ticker_name_and_sector() {
        let all = companies();
        let bank = filter_companies(&all, Some("bank"), None);
        assert_eq!(bank.len(), 2);
        let telkom = filter_companies(&all, Some("tlkm"), None);
        assert_eq!(telkom[0].ticker, "TLKM.JK");
        let banking = filter_companies(&all, Some("mandiri"), Some("banking"));
        assert_eq!(banking.len(), 1);
        assert_eq!(filter_companies(&all, None, None).len(), 3);
        assert!(filter_companies(&all, Some("unvr"), None).is_empty());
    }
}
