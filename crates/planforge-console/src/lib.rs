//! Colorful console output for PlanForge.
//!
//! Provides a `tracing` layer that renders engine events with colors.
//!
//! ## Log Levels
//!
//! - **INFO**: Lifecycle events (optimization, training and forecast start/end)
//! - **DEBUG**: Per-generation progress and store retries
//! - **TRACE**: Individual evaluations

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: OnceLock<()> = OnceLock::new();
static EPOCH: OnceLock<Instant> = OnceLock::new();
static RUN_START_NANOS: AtomicU64 = AtomicU64::new(0);

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes the console output.
///
/// Safe to call multiple times; only the first call has effect.
/// Prints the banner and installs a global subscriber unless one exists.
pub fn init() {
    INIT.get_or_init(|| {
        print_banner();

        let default: Directive = "planforge=info"
            .parse()
            .unwrap_or_else(|_| LevelFilter::INFO.into());
        let filter = EnvFilter::builder()
            .with_default_directive(default)
            .from_env_lossy();

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(PlanForgeConsoleLayer)
            .try_init();
    });
}

// Marks the start of a run for elapsed time tracking.
fn mark_run_start() {
    let epoch = EPOCH.get_or_init(Instant::now);
    let nanos = epoch.elapsed().as_nanos() as u64;
    RUN_START_NANOS.store(nanos, Ordering::Relaxed);
}

fn elapsed_secs() -> f64 {
    let Some(epoch) = EPOCH.get() else {
        return 0.0;
    };
    let start_nanos = RUN_START_NANOS.load(Ordering::Relaxed);
    let now_nanos = epoch.elapsed().as_nanos() as u64;
    now_nanos.saturating_sub(start_nanos) as f64 / 1_000_000_000.0
}

fn print_banner() {
    let banner = r#"
 ____  _             _____
|  _ \| | __ _ _ __ |  ___|__  _ __ __ _  ___
| |_) | |/ _` | '_ \| |_ / _ \| '__/ _` |/ _ \
|  __/| | (_| | | | |  _| (_) | | | (_| |  __/
|_|   |_|\__,_|_| |_|_|  \___/|_|  \__, |\___|
                                   |___/
"#;

    let version_line = format!(
        "              v{} - Resource Allocation & Forecasting\n",
        VERSION
    );

    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{}", banner.bright_cyan());
    let _ = writeln!(stdout, "{}", version_line.bright_white().bold());
    let _ = stdout.flush();
}

/// A tracing layer that formats PlanForge events with colors.
pub struct PlanForgeConsoleLayer;

impl<S: Subscriber> Layer<S> for PlanForgeConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("planforge") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let output = format_event(&visitor, *metadata.level());
        if !output.is_empty() {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }
}

#[derive(Debug, Default)]
struct EventVisitor {
    event: Option<String>,
    project_id: Option<String>,
    result_id: Option<String>,
    goal: Option<String>,
    model_id: Option<String>,
    model_type: Option<String>,
    termination: Option<String>,
    forecast_type: Option<String>,
    risk_level: Option<String>,
    source: Option<String>,
    operation: Option<String>,
    error: Option<String>,
    tasks: Option<u64>,
    resources: Option<u64>,
    population: Option<u64>,
    generation: Option<u64>,
    generations: Option<u64>,
    samples: Option<u64>,
    epochs: Option<u64>,
    best_epoch: Option<u64>,
    version: Option<u64>,
    horizon: Option<u64>,
    attempt: Option<u64>,
    delay_ms: Option<u64>,
    duration_ms: Option<u64>,
    best: Option<f64>,
    mean: Option<f64>,
    diversity: Option<f64>,
    fitness: Option<f64>,
    projected_cost: Option<f64>,
    accuracy: Option<f64>,
    residual_std: Option<f64>,
    variance_pct: Option<f64>,
    partial: Option<bool>,
    stopped_early: Option<bool>,
}

impl EventVisitor {
    fn set_text(&mut self, name: &str, value: String) {
        let slot = match name {
            "event" => &mut self.event,
            "project_id" => &mut self.project_id,
            "result_id" => &mut self.result_id,
            "goal" => &mut self.goal,
            "model_id" => &mut self.model_id,
            "model_type" => &mut self.model_type,
            "termination" => &mut self.termination,
            "forecast_type" => &mut self.forecast_type,
            "risk_level" => &mut self.risk_level,
            "source" => &mut self.source,
            "operation" => &mut self.operation,
            "error" => &mut self.error,
            _ => return,
        };
        *slot = Some(value);
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        self.set_text(field.name(), s.trim_matches('"').to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            "tasks" => self.tasks = Some(value),
            "resources" => self.resources = Some(value),
            "population" => self.population = Some(value),
            "generation" => self.generation = Some(value),
            "generations" => self.generations = Some(value),
            "samples" => self.samples = Some(value),
            "epochs" => self.epochs = Some(value),
            "best_epoch" => self.best_epoch = Some(value),
            "version" => self.version = Some(value),
            "horizon" => self.horizon = Some(value),
            "attempt" => self.attempt = Some(value),
            "delay_ms" => self.delay_ms = Some(value),
            "duration_ms" => self.duration_ms = Some(value),
            _ => {}
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_u64(field, value.max(0) as u64);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        match field.name() {
            "best" => self.best = Some(value),
            "mean" => self.mean = Some(value),
            "diversity" => self.diversity = Some(value),
            "fitness" | "best_fitness" => self.fitness = Some(value),
            "projected_cost" => self.projected_cost = Some(value),
            "accuracy" => self.accuracy = Some(value),
            "residual_std" => self.residual_std = Some(value),
            "variance_pct" => self.variance_pct = Some(value),
            _ => {}
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        match field.name() {
            "partial" => self.partial = Some(value),
            "stopped_early" => self.stopped_early = Some(value),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.set_text(field.name(), value.to_string());
    }
}

fn format_event(v: &EventVisitor, level: Level) -> String {
    match v.event.as_deref().unwrap_or("") {
        "optimize_start" => format_optimize_start(v),
        "generation" => format_generation(v, level),
        "optimize_end" => format_optimize_end(v),
        "train_start" => format_train_start(v),
        "train_end" => format_train_end(v),
        "forecast_end" => format_forecast_end(v),
        "store_retry" => format_store_retry(v),
        _ => String::new(),
    }
}

fn format_elapsed() -> String {
    format!("{:>7.3}s", elapsed_secs())
        .bright_black()
        .to_string()
}

fn count(n: Option<u64>) -> String {
    n.unwrap_or(0).to_formatted_string(&Locale::en)
}

fn format_optimize_start(v: &EventVisitor) -> String {
    mark_run_start();
    let mut output = format!(
        "{} {} Optimizing {} │ {} tasks │ {} resources",
        format_elapsed(),
        "▶".bright_green().bold(),
        v.project_id.as_deref().unwrap_or("?").white().bold(),
        count(v.tasks).bright_yellow(),
        count(v.resources).bright_yellow(),
    );
    if let Some(goal) = &v.goal {
        output.push_str(&format!(" │ goal {}", goal.bright_magenta()));
    }
    if v.population.is_some() {
        output.push_str(&format!(" │ population {}", count(v.population).bright_yellow()));
    }
    output
}

fn format_generation(v: &EventVisitor, level: Level) -> String {
    if level == Level::TRACE {
        return String::new();
    }
    format!(
        "{} {} gen {:>6} │ best {} │ mean {} │ diversity {:.3}",
        format_elapsed(),
        "⚡".bright_cyan(),
        count(v.generation).white(),
        format_fitness(v.best.unwrap_or(0.0)),
        format!("{:.4}", v.mean.unwrap_or(0.0)).white(),
        v.diversity.unwrap_or(0.0),
    )
}

fn format_optimize_end(v: &EventVisitor) -> String {
    let termination = v.termination.as_deref().unwrap_or("unknown");
    let partial = v.partial.unwrap_or(false);
    let status = if partial {
        "PARTIAL".bright_yellow().bold().to_string()
    } else {
        "COMPLETE".bright_green().bold().to_string()
    };

    let mut output = format!(
        "{} {} Optimization {} │ {} │ {} generations │ {} │ {}",
        format_elapsed(),
        "■".bright_cyan().bold(),
        status,
        format_duration_ms(v.duration_ms.unwrap_or(0)).yellow(),
        count(v.generations).white(),
        termination,
        format_fitness(v.fitness.unwrap_or(0.0)),
    );
    if let Some(cost) = v.projected_cost {
        output.push_str(&format!(
            " │ cost {}",
            (cost.round() as u64).to_formatted_string(&Locale::en).bright_yellow()
        ));
    }
    output
}

fn format_train_start(v: &EventVisitor) -> String {
    format!(
        "{} {} Training {} ({}) │ {} samples │ {} epochs",
        format_elapsed(),
        "▶".bright_blue(),
        v.model_id.as_deref().unwrap_or("?").white().bold(),
        v.model_type.as_deref().unwrap_or("?"),
        count(v.samples).bright_yellow(),
        count(v.epochs).bright_yellow(),
    )
}

fn format_train_end(v: &EventVisitor) -> String {
    let mut output = format!(
        "{} {} Trained {} v{} │ {} epochs",
        format_elapsed(),
        "◀".bright_blue(),
        v.model_id.as_deref().unwrap_or("?").white().bold(),
        v.version.unwrap_or(0),
        count(v.epochs).white(),
    );
    if v.stopped_early == Some(true) {
        output.push_str(&format!(" (early stop, best {})", count(v.best_epoch)));
    }
    if let Some(accuracy) = v.accuracy {
        output.push_str(&format!(
            " │ accuracy {}",
            format!("{:.1}%", accuracy * 100.0).bright_magenta().bold()
        ));
    }
    if let Some(std) = v.residual_std {
        output.push_str(&format!(" │ residual σ {:.3}", std));
    }
    output
}

fn format_forecast_end(v: &EventVisitor) -> String {
    let risk = v.risk_level.as_deref().unwrap_or("unknown");
    let risk = match risk {
        "low" => risk.bright_green().to_string(),
        "medium" => risk.yellow().to_string(),
        "high" => risk.bright_red().to_string(),
        "critical" => risk.bright_red().bold().to_string(),
        _ => risk.white().to_string(),
    };
    let mut output = format!(
        "{} {} Forecast {} {} │ {} days │ risk {}",
        format_elapsed(),
        "◆".bright_magenta(),
        v.project_id.as_deref().unwrap_or("?").white().bold(),
        v.forecast_type.as_deref().unwrap_or("?"),
        count(v.horizon).bright_yellow(),
        risk,
    );
    if let Some(pct) = v.variance_pct {
        output.push_str(&format!(" │ variance {:+.1}%", pct));
    }
    if let Some(source) = &v.source {
        output.push_str(&format!(" │ {}", source.bright_black()));
    }
    if v.partial == Some(true) {
        output.push_str(&format!(" │ {}", "PARTIAL".bright_yellow()));
    }
    output
}

fn format_store_retry(v: &EventVisitor) -> String {
    format!(
        "{} {} Store {} retry {} in {} │ {}",
        format_elapsed(),
        "↻".yellow(),
        v.operation.as_deref().unwrap_or("?"),
        count(v.attempt).yellow(),
        format_duration_ms(v.delay_ms.unwrap_or(0)),
        v.error.as_deref().unwrap_or("").bright_red(),
    )
}

fn format_duration_ms(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.2}s", ms as f64 / 1000.0)
    } else {
        let mins = ms / 60_000;
        let secs = (ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

fn format_fitness(fitness: f64) -> String {
    let text = format!("{:.4}", fitness);
    if fitness >= 0.75 {
        text.bright_green().to_string()
    } else if fitness >= 0.5 {
        text.yellow().to_string()
    } else {
        text.bright_red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visitor(event: &str) -> EventVisitor {
        EventVisitor {
            event: Some(event.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_event_is_silent() {
        assert!(format_event(&visitor("store_save"), Level::INFO).is_empty());
        assert!(format_event(&EventVisitor::default(), Level::INFO).is_empty());
    }

    #[test]
    fn test_optimize_start_shows_problem_size() {
        let mut v = visitor("optimize_start");
        v.project_id = Some("apollo".into());
        v.tasks = Some(1200);
        v.resources = Some(15);
        let out = format_event(&v, Level::INFO);
        assert!(out.contains("apollo"));
        assert!(out.contains("1,200"));
        assert!(out.contains("resources"));
    }

    #[test]
    fn test_generation_hidden_at_trace() {
        let mut v = visitor("generation");
        v.generation = Some(4);
        v.best = Some(0.8);
        assert!(format_event(&v, Level::TRACE).is_empty());
        assert!(format_event(&v, Level::DEBUG).contains("0.8000"));
    }

    #[test]
    fn test_optimize_end_marks_partial() {
        let mut v = visitor("optimize_end");
        v.partial = Some(true);
        v.termination = Some("deadline".into());
        v.duration_ms = Some(2500);
        let out = format_event(&v, Level::INFO);
        assert!(out.contains("PARTIAL"));
        assert!(out.contains("deadline"));
        assert!(out.contains("2.50s"));
    }

    #[test]
    fn test_train_end_reports_accuracy() {
        let mut v = visitor("train_end");
        v.model_id = Some("risk_classifier".into());
        v.version = Some(3);
        v.accuracy = Some(0.925);
        let out = format_event(&v, Level::INFO);
        assert!(out.contains("v3"));
        assert!(out.contains("92.5%"));
    }

    #[test]
    fn test_forecast_end_shows_variance() {
        let mut v = visitor("forecast_end");
        v.forecast_type = Some("cost".into());
        v.variance_pct = Some(12.34);
        v.risk_level = Some("medium".into());
        let out = format_event(&v, Level::INFO);
        assert!(out.contains("+12.3%"));
        assert!(out.contains("medium"));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration_ms(950), "950ms");
        assert_eq!(format_duration_ms(1500), "1.50s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
    }
}
