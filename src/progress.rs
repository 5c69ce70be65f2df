use anyhow::Result;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::future::Future;
use std::time::Duration;

const SPINNER_TICKS_BRAILLE: [&str; 8] = ["⠁", "⠂", "⠄", "⡀", "⢀", "⠠", "⠐", "⠈"];
const SPINNER_TICKS_ASCII: &str = "|/-\\";

#[derive(Clone, Copy)]
pub enum Stage {
    Fetch,
    Render,
}

impl Stage {
    const TOTAL: u8 = 2;

    const fn index(self) -> u8 {
        match self {
            Self::Fetch => 1,
            Self::Render => 2,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Fetch => "Fetching",
            Self::Render => "Rendering",
        }
    }
}

/// Spinners on stderr, or nothing at all when disabled.
pub struct Progress {
    multi: Option<MultiProgress>,
    style: ProgressStyle,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        let multi = enabled.then(|| {
            let multi = MultiProgress::new();
            multi.set_draw_target(ProgressDrawTarget::stderr_with_hz(15));
            multi
        });
        let style = ProgressStyle::with_template("{spinner:.cyan.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let style = if is_dumb_term() {
            style.tick_chars(SPINNER_TICKS_ASCII)
        } else {
            style.tick_strings(&SPINNER_TICKS_BRAILLE)
        };
        Self { multi, style }
    }

    pub async fn run<T>(
        &self,
        stage: Stage,
        label: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(multi) = &self.multi else {
            return fut.await;
        };
        let message = format_stage_message(stage, label);
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(self.style.clone());
        bar.set_message(message.clone());
        bar.enable_steady_tick(Duration::from_millis(100));

        let result = fut.await;
        let outcome = if result.is_ok() {
            "done".bright_green().bold()
        } else {
            "failed".bright_red().bold()
        };
        bar.finish_with_message(format!("{message} {outcome}"));
        result
    }

    pub fn clear(&self) {
        if let Some(multi) = &self.multi {
            let _ = multi.clear();
        }
    }
}

fn is_dumb_term() -> bool {
    std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
}

fn format_stage_message(stage: Stage, label: &str) -> String {
    let prefix = format!("[{}/{}]", stage.index(), Stage::TOTAL);
    format!(
        "{} {}: {}",
        prefix.bright_yellow().bold(),
        stage.label().bright_cyan().bold(),
        label.bright_white().bold()
    )
}
