use criterion::{Criterion, black_box, criterion_group, criterion_main};
use idxratio::metrics::{FormatterConfig, HashedChange, format_metrics_with};
use idxratio::model::{CategoryRatios, MetricValue, RatioMap, TrendMap, TrendPoint};
use idxratio::{build_chart_rows, compute_health_score};

fn ratios() -> RatioMap {
    let mut liquidity = CategoryRatios::new();
    for (key, value) in [
        ("currentRatio", 2.1),
        ("quickRatio", 1.4),
        ("cashRatio", 0.6),
        ("loanToDepositRatio", 0.82),
    ] {
        liquidity.insert(key.to_string(), MetricValue::Number(value));
    }
    let mut profitability = CategoryRatios::new();
    for (key, value) in [("roe", 18.2), ("roa", 3.1), ("npm", 31.0), ("nim", 5.4)] {
        profitability.insert(key.to_string(), MetricValue::Number(value));
    }
    let mut leverage = CategoryRatios::new();
    leverage.insert("der".to_string(), MetricValue::Number(4.9));
    let mut ratios = RatioMap::new();
    ratios.insert("liquidity".to_string(), liquidity);
    ratios.insert("profitability".to_string(), profitability);
    ratios.insert("leverage".to_string(), leverage);
    ratios
}

fn trends() -> TrendMap {
    let mut trends = TrendMap::new();
    for key in [
        "liquidity_currentRatio",
        "liquidity_quickRatio",
        "liquidity_cashRatio",
        "profitability_roe",
        "profitability_roa",
    ] {
        let points = (2010..2024)
            .map(|year| TrendPoint::new(year.to_string(), f64::from(year - 2000) / 10.0))
            .collect();
        trends.insert(key.to_string(), points);
    }
    trends
}

fn bench_transform(c: &mut Criterion) {
    let ratios = ratios();
    let trends = trends();
    let config = FormatterConfig::default();

    c.bench_function("format_metrics", |b| {
        b.iter(|| {
            format_metrics_with(
                black_box(Some(&ratios)),
                black_box("profitability"),
                &config,
                &mut HashedChange,
            )
        });
    });
    c.bench_function("compute_health_score", |b| {
        b.iter(|| compute_health_score(black_box(Some(&ratios))));
    });
    c.bench_function("build_chart_rows", |b| {
        b.iter(|| build_chart_rows(black_box(&trends), black_box(Some("liquidity"))));
    });
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
