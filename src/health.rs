//! Health scorer: a single 0-100 indicator from a handful of ratio thresholds.
//!
//! The rule table is a heuristic placeholder, not a validated credit model.
//! It lives in [`HealthRules`] so deployments and tests can swap thresholds
//! without touching the scoring code.

use crate::model::RatioMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Above,
    Below,
}

impl Comparison {
    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Above => value > threshold,
            Self::Below => value < threshold,
        }
    }
}

/// Adds `delta` when `category.metric` is numeric and strictly beyond `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRule {
    pub category: String,
    pub metric: String,
    pub comparison: Comparison,
    pub threshold: f64,
    pub delta: i32,
}

impl HealthRule {
    pub fn new(
        category: &str,
        metric: &str,
        comparison: Comparison,
        threshold: f64,
        delta: i32,
    ) -> Self {
        Self {
            category: category.to_string(),
            metric: metric.to_string(),
            comparison,
            threshold,
            delta,
        }
    }

    fn applies(&self, ratios: &RatioMap) -> bool {
        ratios
            .get(&self.category)
            .and_then(|metrics| metrics.get(&self.metric))
            .and_then(crate::model::MetricValue::as_f64)
            .is_some_and(|value| self.comparison.holds(value, self.threshold))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthRules {
    pub base: i32,
    pub min: u8,
    pub max: u8,
    pub rules: Vec<HealthRule>,
}

impl Default for HealthRules {
    fn default() -> Self {
        Self {
            base: 50,
            min: 0,
            max: 100,
            rules: vec![
                HealthRule::new("profitability", "roe", Comparison::Above, 15.0, 20),
                HealthRule::new("profitability", "roa", Comparison::Above, 5.0, 15),
                HealthRule::new("liquidity", "currentRatio", Comparison::Above, 1.2, 10),
                HealthRule::new("liquidity", "loanToDepositRatio", Comparison::Below, 0.9, 10),
                HealthRule::new("leverage", "der", Comparison::Above, 2.0, -15),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct HealthScore(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl fmt::Display for HealthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// Colour band of a score: gauges use three colours but four grade labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Caution,
    Negative,
}

impl HealthScore {
    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn grade(self) -> HealthGrade {
        match self.0 {
            80.. => HealthGrade::Excellent,
            60..=79 => HealthGrade::Good,
            40..=59 => HealthGrade::Fair,
            _ => HealthGrade::Poor,
        }
    }

    pub const fn tone(self) -> Tone {
        match self.0 {
            80.. => Tone::Positive,
            60..=79 => Tone::Caution,
            _ => Tone::Negative,
        }
    }
}

impl fmt::Display for HealthScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn compute_health_score(ratios: Option<&RatioMap>) -> HealthScore {
    compute_health_score_with(ratios, &HealthRules::default())
}

/// Base plus every rule that fires, clamped to `[min, max]`.
///
/// A missing or empty ratios mapping scores 0 regardless of the rule table.
pub fn compute_health_score_with(ratios: Option<&RatioMap>, rules: &HealthRules) -> HealthScore {
    let Some(ratios) = ratios.filter(|ratios| !ratios.is_empty()) else {
        return HealthScore(0);
    };

    let raw = rules
        .rules
        .iter()
        .filter(|rule| rule.applies(ratios))
        .fold(i64::from(rules.base), |acc, rule| acc + i64::from(rule.delta));

    let low = i64::from(rules.min.min(rules.max));
    let high = i64::from(rules.max.max(rules.min));
    let clamped = raw.clamp(low, high);
    HealthScore(u8::try_from(clamped).unwrap_or(rules.max))
}
