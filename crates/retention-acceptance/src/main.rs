use clap::Parser;
use colored::Colorize;
use retention_acceptance::{CaseReport, Driver, HarnessConfig, periods};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "retention-acceptance")]
#[command(about = "Provision one bucket per data_expiry label and check its lifecycle policy and tags", long_about = None)]
struct Cli {
    /// Run only this period label (repeatable)
    #[arg(short = 'c', long = "case", value_name = "LABEL")]
    cases: Vec<String>,

    /// Print the period table and exit
    #[arg(long)]
    list: bool,

    /// Deadline for the whole run in seconds (overrides RETENTION_RUN_TIMEOUT_SECS)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cases = periods::select(&cli.cases)?;

    if cli.list {
        for case in &cases {
            match case.expected_days {
                Some(days) => println!("{:<22} {} days", case.period_label, days),
                None => println!("{:<22} no expiration", case.period_label),
            }
        }
        return Ok(());
    }

    let mut config = HarnessConfig::from_env()?;
    if let Some(secs) = cli.timeout {
        config = config.with_run_timeout(Duration::from_secs(secs));
    }

    println!(
        "{}",
        format!(
            "Checking {} retention periods in {} ({})",
            cases.len(),
            config.region,
            config.module_root.join(&config.example_dir).display()
        )
        .bold()
    );

    let driver = Driver::from_config(config).await?;
    let report = driver.run(&cases).await;

    println!();
    for case in &report.cases {
        print_case(case);
    }

    let summary = report.summary();
    println!();
    if report.is_success() {
        println!(
            "{} {} ({:.1}s)",
            "✓".green().bold(),
            summary,
            report.duration.as_secs_f64()
        );
    } else {
        println!(
            "{} {} ({:.1}s)",
            "✗".red().bold(),
            summary,
            report.duration.as_secs_f64()
        );
        anyhow::bail!("{} of {} retention cases failed", summary.failed, report.cases.len());
    }

    Ok(())
}

fn print_case(case: &CaseReport) {
    let name = case.environment.as_deref().unwrap_or("-");
    match case.error() {
        None => println!(
            "  {} {:<22} {}",
            "✓".green(),
            case.case.period_label,
            name.dimmed()
        ),
        Some(e) => println!(
            "  {} {:<22} {} {}",
            "✗".red(),
            case.case.period_label,
            name.dimmed(),
            e.to_string().red()
        ),
    }
    if let Some(teardown) = &case.teardown_error {
        println!(
            "    {} destroy failed: {}",
            "⚠".yellow(),
            teardown.yellow()
        );
    }
}
