//! Client-side transformation layer for an Indonesian listed-company
//! financial-ratio dashboard: metric cards, a health score, chart rows and
//! a typed client for the ratios service.

pub mod client;
pub mod compare;
pub mod export;
pub mod formatting;
pub mod health;
pub mod metrics;
pub mod model;
pub mod report;
pub mod settings;
pub mod state;
pub mod trends;

pub use client::{ClientError, RatiosClient};
pub use compare::{ComparisonRow, compare_ratios};
pub use health::{HealthRules, HealthScore, compute_health_score, compute_health_score_with};
pub use metrics::{ChangeSource, DisplayMetric, FormatterConfig, format_metrics, format_metrics_with};
pub use model::{Category, MetricValue, RatioMap, RatioSnapshot, TrendMap, TrendPoint};
pub use settings::{Settings, SettingsError};
pub use state::{Action, ViewState};
pub use trends::{ChartData, ChartRow, ChartSettings, build_chart_rows, build_chart_rows_with};
