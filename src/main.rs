use crate::cli::{Cli, Commands, ShowArgs};
use crate::progress::{Progress, Stage};
use crate::summary::{DashboardSummary, OutputPaths};
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use idxratio::client::RatiosClient;
use idxratio::compare::compare_ratios;
use idxratio::export::{chart_rows_csv, metrics_csv, save_csv};
use idxratio::health::compute_health_score_with;
use idxratio::metrics::{HashedChange, format_metrics_with};
use idxratio::model::{Category, CompanyDetail, filter_companies};
use idxratio::report::{DashboardContext, save_dashboard};
use idxratio::settings::Settings;
use idxratio::state::{Action, ViewState};
use idxratio::trends::build_chart_rows_with;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod progress;
mod summary;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let Cli {
        config,
        base_url,
        no_progress,
        command,
    } = Cli::parse();

    if let Commands::Completions {
        shell,
        output_dir,
        install,
    } = command
    {
        return cli::generate_completions(shell, output_dir, install);
    }

    let settings = Settings::load(config.as_deref())
        .context("failed to load settings")?
        .with_base_url(base_url)
        .validated()
        .context("invalid settings")?;
    debug!(base_url = %settings.api.base_url, "settings loaded");

    let client = RatiosClient::new(&settings.api).context("failed to build HTTP client")?;
    let progress = Progress::new(!no_progress);

    let result = run(command, &settings, &client, &progress).await;
    progress.clear();
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("idxratio=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(
    command: Commands,
    settings: &Settings,
    client: &RatiosClient,
    progress: &Progress,
) -> Result<()> {
    match command {
        Commands::Companies { search, sector } => {
            let companies = progress
                .run(Stage::Fetch, "companies", async {
                    client.companies().await.context("failed to list companies")
                })
                .await?;
            progress.clear();
            let matches = filter_companies(&companies, search.as_deref(), sector.as_deref());
            summary::print_companies(&matches, companies.len());
        }
        Commands::Show(args) => show(args, settings, client, progress).await?,
        Commands::Compare {
            ticker,
            other,
            category,
        } => {
            let state = ViewState::default().replay([
                Action::SelectCompany(ticker),
                Action::CompareWith(other),
            ]);
            let (Some(left), Some(right)) = (state.company.clone(), state.compare_with.clone())
            else {
                return Err(anyhow!("pick two different companies to compare"));
            };
            let compared = progress
                .run(Stage::Fetch, &format!("{left} and {right}"), async {
                    client
                        .compare(&[left.as_str(), right.as_str()])
                        .await
                        .with_context(|| format!("failed to compare {left} with {right}"))
                })
                .await?;
            progress.clear();
            let left_ratios = compared
                .get(&left)
                .map(|company| &company.ratios)
                .ok_or_else(|| anyhow!("no ratios returned for {left}"))?;
            let right_ratios = compared
                .get(&right)
                .map(|company| &company.ratios)
                .ok_or_else(|| anyhow!("no ratios returned for {right}"))?;
            let rows = compare_ratios(left_ratios, right_ratios, category.map(Category::as_str));
            summary::print_comparison(&left, &right, &rows);
        }
        Commands::Sectors => {
            let sectors = progress
                .run(Stage::Fetch, "sectors", async {
                    client.sectors().await.context("failed to load sectors")
                })
                .await?;
            progress.clear();
            summary::print_sectors(&sectors);
        }
        Commands::Refresh => {
            let outcome = progress
                .run(Stage::Fetch, "refresh", async {
                    client.refresh().await.context("failed to refresh service data")
                })
                .await?;
            progress.clear();
            summary::print_refresh(&outcome);
        }
        Commands::Status => {
            let health = client
                .health()
                .await
                .with_context(|| format!("ratios service at {} is unreachable", client.base_url()))?;
            summary::print_status(client.base_url(), &health);
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

async fn show(
    args: ShowArgs,
    settings: &Settings,
    client: &RatiosClient,
    progress: &Progress,
) -> Result<()> {
    let run_started_at = Local::now();
    let mut state = ViewState::default().reduce(Action::SelectCompany(args.ticker));
    if let Some(category) = args.category {
        state = state.reduce(Action::SelectCategory(category));
    }
    if args.compact {
        state = state.reduce(Action::ToggleSidebar);
    }
    let ticker = state
        .company
        .clone()
        .ok_or_else(|| anyhow!("no company selected"))?;

    let detail = progress
        .run(Stage::Fetch, &ticker, async {
            if args.history {
                client
                    .company(&ticker)
                    .await
                    .with_context(|| format!("failed to load company record for {ticker}"))
            } else {
                client
                    .ratios(&ticker)
                    .await
                    .map(|snapshot| CompanyDetail {
                        snapshot,
                        all_periods: Default::default(),
                    })
                    .with_context(|| format!("failed to load ratios for {ticker}"))
            }
        })
        .await?;
    let snapshot = &detail.snapshot;

    if args.category.is_none() {
        state = state.reduce(Action::DataLoaded {
            available: snapshot.available_categories(),
        });
    }
    info!(ticker = %ticker, category = %state.category, "rendering dashboard");

    let formatter = settings.metrics.formatter_config();
    let metrics = format_metrics_with(
        Some(&snapshot.ratios),
        state.category.as_str(),
        &formatter,
        &mut HashedChange,
    );
    let health = compute_health_score_with(Some(&snapshot.ratios), &settings.health);
    let chart = build_chart_rows_with(&snapshot.trends, Some(state.category.as_str()), &settings.chart);
    let show_descriptions = !state.sidebar_collapsed;

    let written = progress
        .run(Stage::Render, "outputs", async {
            let mut written = Written::default();
            if let Some(path) = args.save_chart_csv.as_deref() {
                let csv = chart_rows_csv(&chart).context("failed to build chart CSV")?;
                written.chart_csv = Some(save_csv(path, &csv, args.archive_csv).await?);
            }
            if let Some(path) = args.save_metrics_csv.as_deref() {
                let csv = metrics_csv(&metrics).context("failed to build metrics CSV")?;
                written.metrics_csv = Some(save_csv(path, &csv, args.archive_csv).await?);
            }
            if let Some(path) = args.save_html.as_deref() {
                let context = DashboardContext {
                    snapshot,
                    category: state.category,
                    metrics: &metrics,
                    health,
                    chart: &chart,
                    max_primary_series: settings.chart.max_primary_series,
                    show_descriptions,
                    generated_at: &run_started_at,
                };
                save_dashboard(path, &context).await?;
                written.html = Some(path.to_path_buf());
            }
            Ok::<_, anyhow::Error>(written)
        })
        .await?;
    progress.clear();

    summary::print_dashboard(&DashboardSummary {
        snapshot,
        category: state.category,
        metrics: &metrics,
        health,
        chart: &chart,
        show_descriptions,
        run_started_at: &run_started_at,
        paths: OutputPaths {
            html: written.html.as_deref(),
            chart_csv: written.chart_csv.as_deref(),
            metrics_csv: written.metrics_csv.as_deref(),
        },
    });
    if args.history {
        summary::print_history(state.category, &detail.category_history(state.category.as_str()));
    }
    Ok(())
}

#[derive(Default)]
struct Written {
    html: Option<PathBuf>,
    chart_csv: Option<PathBuf>,
    metrics_csv: Option<PathBuf>,
}
