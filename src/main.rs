//! `retail-etl` command-line entry point.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use retail_etl::config::{DedupPolicy, PipelineConfig};
use retail_etl::logging::{LogConfig, LogFormat, LogLevel, init_logging};
use retail_etl::pipeline::{CompositeObserver, NarrativeObserver, Pipeline, TracingObserver};
use retail_etl::report::ReportOutcome;

#[derive(Debug, Parser)]
#[command(name = "retail-etl", version, about = "Retail sales batch ETL: CSV → Parquet → SQLite")]
struct Cli {
    /// TOML config file; `RETAIL_ETL_*` environment variables override it.
    #[arg(long, global = true, env = "RETAIL_ETL_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format.
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full pipeline from the bronze CSV.
    Run(RunArgs),
    /// Validate, load and report from the existing silver snapshot.
    LoadSnapshot(LoadArgs),
    /// Run the reports against the existing warehouse.
    Report {
        #[arg(long)]
        warehouse: Option<PathBuf>,
        #[arg(long)]
        analytics_script: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    #[arg(long)]
    bronze: Option<PathBuf>,
    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Debug, clap::Args)]
struct LoadArgs {
    #[arg(long)]
    silver: Option<PathBuf>,
    #[arg(long)]
    warehouse: Option<PathBuf>,
    #[arg(long)]
    schema_script: Option<PathBuf>,
    #[arg(long)]
    analytics_script: Option<PathBuf>,
    /// Which rows an incremental run skips.
    #[arg(long, value_parser = parse_dedup)]
    dedup: Option<DedupPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_dedup(s: &str) -> Result<DedupPolicy, String> {
    s.parse().map_err(|e: retail_etl::PipelineError| e.to_string())
}

impl LoadArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(p) = &self.silver {
            config.silver_path = p.clone();
        }
        if let Some(p) = &self.warehouse {
            config.warehouse_path = p.clone();
        }
        if let Some(p) = &self.schema_script {
            config.schema_script = Some(p.clone());
        }
        if let Some(p) = &self.analytics_script {
            config.analytics_script = Some(p.clone());
        }
        if let Some(policy) = self.dedup {
            config.dedup_policy = policy;
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env().unwrap_or_default();
    log_config.level = log_config.level.raised_by(cli.verbose);
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    // The pipeline works without a subscriber, but say why logs are missing.
    if let Err(e) = init_logging(&log_config) {
        eprintln!("{}", logging_warning(&e));
    }

    if let Err(e) = execute(&cli) {
        error!(error = %e, "command failed");
        eprintln!("Error: {e:?}");
        process::exit(1);
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match &cli.command {
        Command::Run(args) => {
            if let Some(p) = &args.bronze {
                config.bronze_path = p.clone();
            }
            args.load.apply(&mut config);
            let summary = narrated(config)
                .run()
                .context("pipeline run failed")?;
            tracing::info!(
                fact_rows = summary.load.fact_rows_written,
                skipped = summary.load.rows_skipped,
                "run complete"
            );
        }
        Command::LoadSnapshot(args) => {
            args.apply(&mut config);
            let silver = config.silver_path.clone();
            narrated(config)
                .reload()
                .with_context(|| format!("reload from '{}' failed", silver.display()))?;
        }
        Command::Report {
            warehouse,
            analytics_script,
            format,
        } => {
            if let Some(p) = warehouse {
                config.warehouse_path = p.clone();
            }
            if let Some(p) = analytics_script {
                config.analytics_script = Some(p.clone());
            }
            let run = Pipeline::new(config)
                .with_observer(Arc::new(TracingObserver))
                .report()
                .context("running reports")?;
            print_reports(&run.outcomes, *format)?;
        }
    }
    Ok(())
}

fn logging_warning(e: &anyhow::Error) -> String {
    format!("Warning: logging disabled: {e:#}")
}

fn narrated(config: PipelineConfig) -> Pipeline {
    let observer = CompositeObserver::new(vec![
        Arc::new(NarrativeObserver::stdout()),
        Arc::new(TracingObserver),
    ]);
    Pipeline::new(config).with_observer(Arc::new(observer))
}

fn print_reports(outcomes: &[ReportOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for outcome in outcomes {
                println!("\n{outcome}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(outcomes).context("serialising reports")?;
            println!("{json}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_override_config() {
        let cli = Cli::try_parse_from([
            "retail-etl",
            "-v",
            "run",
            "--bronze",
            "in.csv",
            "--warehouse",
            "out.db",
            "--dedup",
            "line_level",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        let mut config = PipelineConfig::default();
        args.load.apply(&mut config);
        assert_eq!(config.warehouse_path, PathBuf::from("out.db"));
        assert_eq!(config.dedup_policy, DedupPolicy::LineLevel);
        assert_eq!(args.bronze, Some(PathBuf::from("in.csv")));
    }

    #[test]
    fn report_defaults_to_text() {
        let cli = Cli::try_parse_from(["retail-etl", "report"]).unwrap();
        assert!(matches!(cli.command, Command::Report { format: OutputFormat::Text, .. }));
    }

    #[test]
    fn logging_failure_is_reported_with_its_cause() {
        let e = anyhow::anyhow!("global default already set").context("installing subscriber");
        assert_eq!(
            logging_warning(&e),
            "Warning: logging disabled: installing subscriber: global default already set"
        );
    }
}
