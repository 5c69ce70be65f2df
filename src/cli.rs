use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate, generate_to};
use idxratio::model::Category;

pub const DEFAULT_HTML_PATH: &str = "data/output/dashboard.html";
pub const DEFAULT_CHART_CSV_PATH: &str = "data/output/chart.csv";
pub const DEFAULT_METRICS_CSV_PATH: &str = "data/output/metrics.csv";

pub const SAVE_HTML_HELP: &str = "Save the HTML dashboard to the given file (defaults to data/output/dashboard.html when no path is provided).";
pub const SAVE_CHART_CSV_HELP: &str = "Save the trend chart rows to the given CSV file (defaults to data/output/chart.csv when no path is provided). Use --archive-csv to store a .gz instead.";
pub const SAVE_METRICS_CSV_HELP: &str = "Save the metric cards to the given CSV file (defaults to data/output/metrics.csv when no path is provided). Use --archive-csv to store a .gz instead.";
pub const ARCHIVE_CSV_HELP: &str = "Archive saved CSV outputs into .gz files.";

#[derive(Debug, Parser)]
#[command(
    name = "idxratio",
    about = "Browse financial ratios, health scores and trends of Indonesian listed companies.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Settings file (TOML, YAML or JSON). Defaults to ./idxratio.* when present."
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Base URL of the ratios service, overriding api.base_url."
    )]
    pub base_url: Option<String>,
    #[arg(long, global = true, help = "Disable progress spinner output.")]
    pub no_progress: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List companies known to the ratios service.
    Companies {
        #[arg(long, help = "Case-insensitive match on ticker or company name.")]
        search: Option<String>,
        #[arg(long, help = "Only companies in this sector.")]
        sector: Option<String>,
    },
    /// Metric cards, health score and trend table for one company.
    Show(ShowArgs),
    /// Side-by-side ratios of two companies.
    Compare {
        ticker: String,
        other: String,
        #[arg(long, help = "Limit the table to one ratio category.")]
        category: Option<Category>,
    },
    /// Companies grouped by sector with their key ratios.
    Sectors,
    /// Ask the service to reload its data.
    Refresh,
    /// Service health check.
    Status,
    /// Generate shell completion scripts, optionally installing them for the current user.
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for.")]
        shell: Shell,
        #[arg(
            long,
            value_name = "DIR",
            help = "Directory to write the completion script to."
        )]
        output_dir: Option<PathBuf>,
        #[arg(
            long,
            help = "Install the completion script into the default location for the selected shell."
        )]
        install: bool,
    },
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub ticker: String,
    #[arg(
        long,
        help = "Ratio category: liquidity, profitability, leverage or activity (defaults to the first one with data)."
    )]
    pub category: Option<Category>,
    #[arg(long, help = "Collapse the sidebar: hide metric descriptions.")]
    pub compact: bool,
    #[arg(
        long,
        help = "Load the full company record and list the category for every reported period."
    )]
    pub history: bool,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_HTML_PATH,
        help = SAVE_HTML_HELP
    )]
    pub save_html: Option<PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_CHART_CSV_PATH,
        help = SAVE_CHART_CSV_HELP
    )]
    pub save_chart_csv: Option<PathBuf>,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_METRICS_CSV_PATH,
        help = SAVE_METRICS_CSV_HELP
    )]
    pub save_metrics_csv: Option<PathBuf>,
    #[arg(long, help = ARCHIVE_CSV_HELP)]
    pub archive_csv: bool,
}

/// Per-user completion directories, relative to `$HOME`.
const INSTALL_DIRS: &[(Shell, &str)] = &[
    (Shell::Bash, ".local/share/bash-completion/completions"),
    (Shell::Elvish, ".elvish/lib/completions"),
    (Shell::Fish, ".config/fish/completions"),
    (Shell::PowerShell, ".local/share/powershell/Scripts"),
    (Shell::Zsh, ".local/share/zsh/site-functions"),
];

#[derive(Debug, PartialEq, Eq)]
enum CompletionTarget {
    Stdout,
    Dir(PathBuf),
}

impl CompletionTarget {
    /// An explicit directory wins over `--install`; neither means stdout.
    fn resolve(
        shell: Shell,
        output_dir: Option<PathBuf>,
        install: bool,
        home: Option<&Path>,
    ) -> Result<Self> {
        match (output_dir, install) {
            (Some(dir), _) => Ok(Self::Dir(dir)),
            (None, true) => {
                let home = home.ok_or_else(|| {
                    anyhow!("HOME is not set; pass --output-dir to choose where completions go")
                })?;
                install_dir(shell, home).map(Self::Dir)
            }
            (None, false) => Ok(Self::Stdout),
        }
    }
}

fn install_dir(shell: Shell, home: &Path) -> Result<PathBuf> {
    INSTALL_DIRS
        .iter()
        .find(|(known, _)| *known == shell)
        .map(|(_, relative)| home.join(relative))
        .ok_or_else(|| anyhow!("{shell} has no default completion directory; pass --output-dir"))
}

pub fn generate_completions(shell: Shell, output_dir: Option<PathBuf>, install: bool) -> Result<()> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let target = CompletionTarget::resolve(shell, output_dir, install, home.as_deref())?;
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    match target {
        CompletionTarget::Stdout => {
            let mut stdout = io::stdout().lock();
            generate(shell, &mut command, bin_name, &mut stdout);
            stdout.flush().context("failed to flush completion script")
        }
        CompletionTarget::Dir(dir) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let script = generate_to(shell, &mut command, bin_name, &dir)
                .with_context(|| format!("failed to write {shell} completions"))?;
            println!("{shell} completions written to {}", script.display());
            Ok(())
        }
    }
}
