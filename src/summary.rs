use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use idxratio::compare::ComparisonRow;
use idxratio::formatting::{format_change, format_difference, format_optional_fixed, to_title};
use idxratio::health::{HealthScore, Tone};
use idxratio::metrics::{Direction, DisplayMetric, format_value};
use idxratio::model::{
    Category, CategoryRatios, Company, RatioSnapshot, RefreshOutcome, SectorMap, ServiceHealth,
};
use idxratio::trends::{ChartData, legend_label};
use std::path::Path;

const RULE_WIDTH: usize = 61;

pub struct OutputPaths<'a> {
    pub(crate) html: Option<&'a Path>,
    pub(crate) chart_csv: Option<&'a Path>,
    pub(crate) metrics_csv: Option<&'a Path>,
}

pub struct DashboardSummary<'a> {
    pub(crate) snapshot: &'a RatioSnapshot,
    pub(crate) category: Category,
    pub(crate) metrics: &'a [DisplayMetric],
    pub(crate) health: HealthScore,
    pub(crate) chart: &'a ChartData,
    pub(crate) show_descriptions: bool,
    pub(crate) run_started_at: &'a DateTime<Local>,
    pub(crate) paths: OutputPaths<'a>,
}

pub fn print_dashboard(summary: &DashboardSummary<'_>) {
    let snapshot = summary.snapshot;
    println!();
    print_banner(&format!(" {} ", snapshot.ticker));
    println!(
        "{} {}",
        "Company".bright_yellow().bold(),
        snapshot.name.bright_white()
    );
    println!(
        "{} {} | {} {}",
        "Sector".bright_yellow().bold(),
        snapshot.sector.bright_white(),
        "Latest period".bright_yellow().bold(),
        snapshot.latest_period.bright_white()
    );
    println!(
        "{} {} {}",
        "Health".bright_yellow().bold(),
        tone_paint(summary.health.tone(), &format!("{}/100", summary.health)).bold(),
        tone_paint(summary.health.tone(), &format!("({})", summary.health.grade()))
    );
    println!(
        "{} {}",
        "Run started".bright_yellow().bold(),
        summary
            .run_started_at
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
            .bright_white()
    );
    println!();
    println!(
        "{} {}",
        summary.category.label().bold().bright_magenta(),
        summary.category.description().bright_black()
    );
    print_metric_cards(summary.metrics, summary.show_descriptions);
    println!();
    print_chart_table(summary.chart);
    println!();
    print_path_line("HTML Dashboard", summary.paths.html, "not saved (use --save-html)");
    print_path_line("Chart CSV", summary.paths.chart_csv, "not saved (use --save-chart-csv)");
    print_path_line(
        "Metrics CSV",
        summary.paths.metrics_csv,
        "not saved (use --save-metrics-csv)",
    );
    println!("{}", "=".repeat(RULE_WIDTH).bright_cyan());
}

fn print_metric_cards(metrics: &[DisplayMetric], show_descriptions: bool) {
    if metrics.is_empty() {
        println!("{}", "No data available for this category.".bright_black());
        return;
    }
    println!(
        "{}",
        format!("{:<26} | {:>12} | {:>9} | {:>10}", "Metric", "Value", "Change", "Benchmark").bold()
    );
    for metric in metrics {
        let change = format!("{:>9}", format!("{} {}", arrow(metric.direction()), format_change(metric.change)));
        let change = match metric.direction() {
            Direction::Up => change.bright_green(),
            Direction::Down => change.bright_red(),
            Direction::Flat => change.bright_black(),
        };
        println!(
            "{:<26} | {:>12} | {} | {:>10}",
            metric.title.bright_white(),
            metric.value.bold(),
            change,
            metric.benchmark
        );
        if show_descriptions {
            println!("  {}", metric.description.bright_black());
        }
    }
    if let Some(metric) = metrics.first() {
        println!("{}", format!("Change is {} (placeholder)", metric.change_label).bright_black());
    }
}

fn print_chart_table(chart: &ChartData) {
    let title = if chart.sample {
        "Trend (sample data)"
    } else {
        "Trend"
    };
    println!("{}", title.bold().bright_magenta());
    let header: Vec<String> = chart
        .series_keys
        .iter()
        .map(|key| format!("{:>14}", truncate(legend_label(key), 14)))
        .collect();
    println!("{}", format!("{:<10} | {}", "Period", header.join(" | ")).bold());
    for row in &chart.rows {
        let cells: Vec<String> = chart
            .series_keys
            .iter()
            .map(|key| format!("{:>14}", format_optional_fixed(row.get(key))))
            .collect();
        println!("{:<10} | {}", row.period.bright_white(), cells.join(" | "));
    }
}

/// One row per reported period; columns are every metric any period carries.
pub fn print_history(category: Category, history: &[(&str, &CategoryRatios)]) {
    println!();
    println!("{}", format!("{} history", category.as_str()).bold().bright_magenta());
    if history.is_empty() {
        println!("{}", "No earlier periods reported.".bright_black());
        return;
    }
    let mut keys: Vec<&str> = history
        .iter()
        .flat_map(|(_, metrics)| metrics.keys().map(String::as_str))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    let header: Vec<String> = keys
        .iter()
        .map(|key| format!("{:>14}", truncate(&to_title(key), 14)))
        .collect();
    println!("{}", format!("{:<10} | {}", "Period", header.join(" | ")).bold());
    for (period, metrics) in history {
        let cells: Vec<String> = keys
            .iter()
            .map(|key| {
                let value = metrics
                    .get(*key)
                    .map_or_else(|| format_optional_fixed(None), |value| format_value(key, value));
                format!("{value:>14}")
            })
            .collect();
        println!("{:<10} | {}", period.bright_white(), cells.join(" | "));
    }
}

pub fn print_companies(companies: &[&Company], total: usize) {
    println!();
    print_banner(" Companies ");
    if companies.is_empty() {
        println!("{}", "No companies match the filter.".bright_black());
    }
    for company in companies {
        println!(
            "{:<10} {:<40} {}",
            company.ticker.bright_white().bold(),
            truncate(&company.name, 40),
            company.sector.bright_black()
        );
    }
    println!(
        "{}",
        format!("Showing {} of {total} companies", companies.len()).bright_black()
    );
}

pub fn print_comparison(left: &str, right: &str, rows: &[ComparisonRow]) {
    println!();
    print_banner(&format!(" {left} vs {right} "));
    if rows.is_empty() {
        println!("{}", "No ratios to compare.".bright_black());
        return;
    }
    println!(
        "{}",
        format!("{:<14} | {:<24} | {:>10} | {:>10} | {:>9}", "Category", "Metric", left, right, "Diff").bold()
    );
    for row in rows {
        let diff = format!("{:>9}", format_difference(row.difference));
        let diff = match row.difference {
            Some(value) if value > 0.0 => diff.bright_green(),
            Some(value) if value < 0.0 => diff.bright_red(),
            _ => diff.bright_black(),
        };
        let left_value = format!("{:>10}", format_optional_fixed(row.left));
        let left_value = if row.left_leads() {
            left_value.bold()
        } else {
            left_value.normal()
        };
        println!(
            "{:<14} | {:<24} | {} | {:>10} | {}",
            row.category.bright_black(),
            row.title.bright_white(),
            left_value,
            format_optional_fixed(row.right),
            diff
        );
    }
}

pub fn print_sectors(sectors: &SectorMap) {
    println!();
    print_banner(" Sectors ");
    for (sector, members) in sectors {
        println!("{} {}", sector.bold().bright_magenta(), format!("({})", members.len()).bright_black());
        for member in members {
            println!(
                "  {:<10} {:<36} ROE {:>7} ROA {:>7} {}",
                member.ticker.bright_white(),
                truncate(&member.name, 36),
                format_optional_fixed(Some(member.key_ratios.roe)),
                format_optional_fixed(Some(member.key_ratios.roa)),
                member.latest_period.bright_black()
            );
        }
    }
}

pub fn print_status(base_url: &str, health: &ServiceHealth) {
    let status = if health.status.eq_ignore_ascii_case("healthy") {
        health.status.bright_green().bold()
    } else {
        health.status.bright_red().bold()
    };
    println!("{} {}", "Service".bright_yellow().bold(), base_url.bright_white());
    println!("{} {}", "Status".bright_yellow().bold(), status);
    println!(
        "{} {}",
        "Companies loaded".bright_yellow().bold(),
        health.companies_loaded
    );
    print_optional_line("Last updated", health.last_updated.as_deref());
    print_optional_line("Server time", health.timestamp.as_deref());
}

pub fn print_refresh(outcome: &RefreshOutcome) {
    println!(
        "{} {}",
        "Refresh".bright_yellow().bold(),
        outcome
            .message
            .as_deref()
            .unwrap_or("data refreshed")
            .bright_green()
    );
    print_optional_line("Last updated", outcome.last_updated.as_deref());
}

fn print_optional_line(label: &str, value: Option<&str>) {
    println!(
        "{} {}",
        label.bright_yellow().bold(),
        value.unwrap_or("unknown").bright_white()
    );
}

fn print_path_line(label: &str, path: Option<&Path>, hint: &str) {
    let label_colored = label.bright_yellow().bold();
    match path {
        Some(path) => println!(
            "{} {}",
            label_colored,
            path.display().to_string().bright_white()
        ),
        None => println!("{} {}", label_colored, hint.bright_black()),
    }
}

fn print_banner(title: &str) {
    let width = RULE_WIDTH.saturating_sub(title.chars().count());
    let left = width / 2;
    let banner = format!("{}{title}{}", "=".repeat(left), "=".repeat(width - left));
    println!("{}", banner.bold().bright_cyan());
}

fn tone_paint(tone: Tone, text: &str) -> ColoredString {
    match tone {
        Tone::Positive => text.bright_green(),
        Tone::Caution => text.bright_yellow(),
        Tone::Negative => text.bright_red(),
    }
}

const fn arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "▲",
        Direction::Down => "▼",
        Direction::Flat => "■",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}
