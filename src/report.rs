use crate::export::{ExportError, write_output_file};
use crate::formatting::{format_change, format_optional_fixed};
use crate::health::{HealthScore, Tone};
use crate::metrics::{DisplayMetric, Direction};
use crate::model::{Category, RatioSnapshot};
use crate::trends::{ChartData, ChartPlan, legend_label};
use chrono::{DateTime, Local};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use minify_html::{Cfg, minify};
use std::f64::consts::PI;
use std::fmt::Write as _;
use std::path::Path;

const CHART_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 280.0;
const CHART_PADDING: f64 = 36.0;
const GAUGE_RADIUS: f64 = 52.0;
const SERIES_COLORS: [&str; 4] = ["#2563eb", "#16a34a", "#d97706", "#9333ea"];
const REFERENCE_COLOR: &str = "#6b7280";

pub struct DashboardContext<'a> {
    pub snapshot: &'a RatioSnapshot,
    pub category: Category,
    pub metrics: &'a [DisplayMetric],
    pub health: HealthScore,
    pub chart: &'a ChartData,
    pub max_primary_series: usize,
    pub show_descriptions: bool,
    pub generated_at: &'a DateTime<Local>,
}

pub async fn save_dashboard(path: &Path, context: &DashboardContext<'_>) -> Result<(), ExportError> {
    let html = render_dashboard(context);
    write_output_file(path, html.as_bytes()).await
}

/// Minified single-page dashboard.
pub fn render_dashboard(context: &DashboardContext<'_>) -> String {
    let markup = dashboard_markup(context).into_string();
    let cfg = Cfg {
        minify_css: true,
        ..Cfg::default()
    };
    String::from_utf8_lossy(&minify(markup.as_bytes(), &cfg)).into_owned()
}

fn dashboard_markup(context: &DashboardContext<'_>) -> Markup {
    let snapshot = context.snapshot;
    let title = if snapshot.name.is_empty() {
        snapshot.ticker.clone()
    } else {
        format!("{} ({})", snapshot.name, snapshot.ticker)
    };
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Financial Ratios" }
                style { (PreEscaped(DASHBOARD_STYLE)) }
            }
            body {
                main.page {
                    header.hero {
                        div {
                            p.eyebrow { (snapshot.sector) }
                            h1 { (title) }
                            p.muted {
                                "Latest period " strong { (snapshot.latest_period) }
                                " · generated " (context.generated_at.format("%Y-%m-%d %H:%M %Z").to_string())
                            }
                        }
                        (health_gauge(context.health))
                    }
                    section.panel {
                        h2 { (context.category.label()) }
                        p.muted { (context.category.description()) }
                        (metric_cards(context.metrics, context.show_descriptions))
                    }
                    section.panel {
                        h2 { "Trend" }
                        @if context.chart.sample {
                            p.notice { "No trend data for this company; showing an illustrative sample." }
                        }
                        (trend_chart(context.chart, &context.chart.plan(context.max_primary_series)))
                        (chart_table(context.chart))
                    }
                }
            }
        }
    }
}

fn health_gauge(score: HealthScore) -> Markup {
    let circumference = 2.0 * PI * GAUGE_RADIUS;
    let offset = circumference * (1.0 - f64::from(score.value()) / 100.0);
    let tone = tone_class(score.tone());
    html! {
        figure.gauge {
            svg viewBox="0 0 120 120" width="120" height="120" role="img" aria-label={ "Health score " (score) } {
                circle.track cx="60" cy="60" r=(GAUGE_RADIUS) {}
                circle class={ "value " (tone) } cx="60" cy="60" r=(GAUGE_RADIUS)
                    stroke-dasharray=(format!("{circumference:.2}"))
                    stroke-dashoffset=(format!("{offset:.2}"))
                    transform="rotate(-90 60 60)" {}
                text x="60" y="66" text-anchor="middle" { (score) }
            }
            figcaption { "Health " span class=(tone) { (score.grade()) } }
        }
    }
}

fn metric_cards(metrics: &[DisplayMetric], show_descriptions: bool) -> Markup {
    html! {
        @if metrics.is_empty() {
            p.empty { "No data available for this category." }
        } @else {
            div.cards {
                @for metric in metrics {
                    article.card {
                        h3 { (metric.title) }
                        p.value { (metric.value) }
                        p class={ "change " (direction_class(metric.direction())) } {
                            (direction_arrow(metric.direction())) " " (format_change(metric.change))
                            " " span.muted { (metric.change_label) }
                        }
                        p.benchmark { "Benchmark " (metric.benchmark) }
                        @if show_descriptions {
                            p.description { (metric.description) }
                        }
                    }
                }
            }
        }
    }
}

fn trend_chart(chart: &ChartData, plan: &ChartPlan) -> Markup {
    let Some((low, high)) = chart.value_range() else {
        return html! { p.empty { "Nothing to plot." } };
    };
    let (low, high) = if (high - low).abs() < f64::EPSILON {
        (low - 1.0, high + 1.0)
    } else {
        (low, high)
    };
    let scale = AxisScale {
        low,
        high,
        count: chart.rows.len(),
    };
    html! {
        svg.chart viewBox={ "0 0 " (CHART_WIDTH) " " (CHART_HEIGHT) } role="img" aria-label="Ratio trend chart" {
            line.axis x1=(CHART_PADDING) y1=(CHART_HEIGHT - CHART_PADDING)
                x2=(CHART_WIDTH - CHART_PADDING) y2=(CHART_HEIGHT - CHART_PADDING) {}
            text.tick x="4" y=(CHART_PADDING) { (format!("{high:.2}")) }
            text.tick x="4" y=(CHART_HEIGHT - CHART_PADDING) { (format!("{low:.2}")) }
            @for (idx, row) in chart.rows.iter().enumerate() {
                text.tick x=(format!("{:.1}", scale.x(idx))) y=(CHART_HEIGHT - 12.0) text-anchor="middle" { (row.period) }
            }
            @for (idx, key) in plan.primary.iter().enumerate() {
                polyline fill="none" stroke=(SERIES_COLORS[idx % SERIES_COLORS.len()]) stroke-width="2"
                    points=(series_points(chart, key, &scale)) {}
            }
            @if let Some(reference) = &plan.reference {
                polyline fill="none" stroke=(REFERENCE_COLOR) stroke-width="2" stroke-dasharray="6 4"
                    points=(series_points(chart, reference, &scale)) {}
            }
        }
        ul.legend {
            @for (idx, key) in plan.primary.iter().enumerate() {
                li { span.swatch style={ "background:" (SERIES_COLORS[idx % SERIES_COLORS.len()]) } {} (legend_label(key)) }
            }
            @if let Some(reference) = &plan.reference {
                li { span.swatch.dashed {} (legend_label(reference)) }
            }
        }
    }
}

fn chart_table(chart: &ChartData) -> Markup {
    html! {
        table.trend {
            thead {
                tr {
                    th { "Period" }
                    @for key in &chart.series_keys { th { (legend_label(key)) } }
                }
            }
            tbody {
                @for row in &chart.rows {
                    tr {
                        td { (row.period) }
                        @for key in &chart.series_keys { td { (format_optional_fixed(row.get(key))) } }
                    }
                }
            }
        }
    }
}

struct AxisScale {
    low: f64,
    high: f64,
    count: usize,
}

impl AxisScale {
    fn x(&self, idx: usize) -> f64 {
        let span = CHART_WIDTH - 2.0 * CHART_PADDING;
        if self.count <= 1 {
            return CHART_PADDING + span / 2.0;
        }
        let steps = u32::try_from(self.count - 1).unwrap_or(u32::MAX);
        let idx = u32::try_from(idx).unwrap_or(u32::MAX);
        CHART_PADDING + span * f64::from(idx) / f64::from(steps)
    }

    fn y(&self, value: f64) -> f64 {
        let span = CHART_HEIGHT - 2.0 * CHART_PADDING;
        CHART_PADDING + span * (self.high - value) / (self.high - self.low)
    }
}

/// Points of one series; periods without a value are skipped.
fn series_points(chart: &ChartData, key: &str, scale: &AxisScale) -> String {
    let mut points = String::new();
    for (idx, row) in chart.rows.iter().enumerate() {
        let Some(value) = row.get(key) else { continue };
        if !points.is_empty() {
            points.push(' ');
        }
        let _ = write!(points, "{:.1},{:.1}", scale.x(idx), scale.y(value));
    }
    points
}

const fn tone_class(tone: Tone) -> &'static str {
    match tone {
        Tone::Positive => "positive",
        Tone::Caution => "caution",
        Tone::Negative => "negative",
    }
}

const fn direction_class(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Flat => "flat",
    }
}

const fn direction_arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "▲",
        Direction::Down => "▼",
        Direction::Flat => "■",
    }
}

const DASHBOARD_STYLE: &str = r"
:root {
  --ink: #111827;
  --muted: #6b7280;
  --card: #ffffff;
  --border: #e5e7eb;
  --positive: #16a34a;
  --caution: #d97706;
  --negative: #dc2626;
}
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, sans-serif; color: var(--ink); background: #f3f4f6; }
.page { max-width: 1100px; margin: 0 auto; padding: 32px 20px 48px; }
.hero, .panel { background: var(--card); border: 1px solid var(--border); border-radius: 16px; padding: 24px 28px; margin-bottom: 20px; }
.hero { display: flex; justify-content: space-between; align-items: center; gap: 16px; flex-wrap: wrap; }
.eyebrow { text-transform: uppercase; letter-spacing: 0.08em; font-size: 12px; color: var(--muted); margin: 0; }
h1 { margin: 4px 0; }
.muted { color: var(--muted); }
.notice { background: #fef3c7; border-radius: 8px; padding: 8px 12px; }
.gauge { margin: 0; text-align: center; }
.gauge circle { fill: none; stroke-width: 10; }
.gauge .track { stroke: var(--border); }
.gauge .value { stroke-linecap: round; }
.gauge text { font-size: 28px; font-weight: 700; }
.positive { color: var(--positive); stroke: var(--positive); }
.caution { color: var(--caution); stroke: var(--caution); }
.negative { color: var(--negative); stroke: var(--negative); }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 14px; }
.card { border: 1px solid var(--border); border-radius: 12px; padding: 14px 16px; }
.card h3 { margin: 0; font-size: 14px; color: var(--muted); }
.card .value { font-size: 26px; font-weight: 700; margin: 6px 0; }
.change.up { color: var(--positive); }
.change.down { color: var(--negative); }
.change.flat { color: var(--muted); }
.benchmark, .description { font-size: 13px; color: var(--muted); margin: 4px 0 0; }
.chart { width: 100%; height: auto; }
.chart .axis { stroke: var(--border); }
.chart .tick { font-size: 11px; fill: var(--muted); }
.legend { list-style: none; display: flex; gap: 16px; padding: 0; flex-wrap: wrap; }
.swatch { display: inline-block; width: 14px; height: 4px; margin-right: 6px; vertical-align: middle; }
.swatch.dashed { border-top: 2px dashed #6b7280; height: 0; }
table.trend { width: 100%; border-collapse: collapse; margin-top: 12px; font-variant-numeric: tabular-nums; }
table.trend th, table.trend td { padding: 6px 10px; border-bottom: 1px solid var(--border); text-align: right; }
table.trend th:first-child, table.trend td:first-child { text-align: left; }
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::compute_health_score;
    use crate::metrics::{FixedChange, FormatterConfig, format_metrics_with};
    use crate::model::{CategoryRatios, MetricValue, RatioMap};
    use crate::trends::sample_chart;

    fn snapshot() -> RatioSnapshot {
        let mut liquidity = CategoryRatios::new();
        liquidity.insert("currentRatio".to_string(), MetricValue::Number(1.5));
        let mut ratios = RatioMap::new();
        ratios.insert("liquidity".to_string(), liquidity);
        RatioSnapshot {
            ticker: "TLKM.JK".to_string(),
            name: "Telkom <Indonesia>".to_string(),
            sector: "Telecommunications".to_string(),
            latest_period: "2024".to_string(),
            ratios,
            ..RatioSnapshot::default()
        }
    }

    fn render(show_descriptions: bool) -> String {
        let snapshot = snapshot();
        let metrics = format_metrics_with(
            Some(&snapshot.ratios),
            "liquidity",
            &FormatterConfig::default(),
            &mut FixedChange(-1.2),
        );
        let chart = sample_chart();
        let now = Local::now();
        let context = DashboardContext {
            snapshot: &snapshot,
            category: Category::Liquidity,
            metrics: &metrics,
            health: compute_health_score(Some(&snapshot.ratios)),
            chart: &chart,
            max_primary_series: 4,
            show_descriptions,
            generated_at: &now,
        };
        dashboard_markup(&context).into_string()
    }

    #[test]
    fn dashboard_escapes_and_shows_cards() {
        let html = render(true);
        assert!(html.contains("Telkom &lt;Indonesia&gt; (TLKM.JK)"));
        assert!(html.contains("Current Ratio"));
        assert!(html.contains("1.50"));
        assert!(html.contains("▼ 1.2%"));
        assert!(html.contains("Current assets divided by current liabilities"));
        assert!(html.contains("illustrative sample"));
        assert!(html.contains("Industry Average"));
        assert!(html.contains("stroke-dasharray=\"6 4\""));
    }

    #[test]
    fn compact_view_hides_descriptions() {
        let html = render(false);
        assert!(!html.contains("Current assets divided by current liabilities"));
    }

    #[test]
    fn gauge_offset_tracks_score() {
        let full = health_gauge(HealthScore::default()).into_string();
        assert!(full.contains(&format!("stroke-dashoffset=\"{:.2}\"", 2.0 * PI * GAUGE_RADIUS)));
    }

    #[test]
    fn minified_output_keeps_content() {
        let snapshot = snapshot();
        let chart = sample_chart();
        let now = Local::now();
        let context = DashboardContext {
            snapshot: &snapshot,
            category: Category::Leverage,
            metrics: &[],
            health: HealthScore::default(),
            chart: &chart,
            max_primary_series: 4,
            show_descriptions: true,
            generated_at: &now,
        };
        let html = render_dashboard(&context);
        assert!(html.contains("No data available for this category."));
        assert!(html.contains("Debt and equity ratios"));
    }

    #[test]
    fn series_points_skip_gaps() {
        let chart = sample_chart();
        let scale = AxisScale {
            low: 1.0,
            high: 3.0,
            count: chart.rows.len(),
        };
        let points = series_points(&chart, "currentRatio", &scale);
        assert_eq!(points.split(' ').count(), 6);
        assert!(series_points(&chart, "roe", &scale).is_empty());
    }
}
