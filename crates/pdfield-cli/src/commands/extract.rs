//! Extract command - run jobs described in a JSON file.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pdfield_core::JobBatch;

use super::output::{render, OutputFormat};
use super::{build_orchestrator, load_config, with_data_root};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// JSON file with one job or an array of jobs ("-" reads stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Directory job paths are resolved against
    #[arg(short, long)]
    data_root: Option<PathBuf>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = with_data_root(load_config(config_path)?, args.data_root);

    let content = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        if !args.input.exists() {
            anyhow::bail!("Input file not found: {}", args.input.display());
        }
        fs::read_to_string(&args.input)?
    };

    let jobs = serde_json::from_str::<JobBatch>(&content)
        .map_err(|e| anyhow::anyhow!("Invalid job file {}: {}", args.input.display(), e))?
        .into_jobs();
    info!("Loaded {} job(s) from {}", jobs.len(), args.input.display());

    let orchestrator = build_orchestrator(&config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting {} document(s)", jobs.len()));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let results = orchestrator.run_batch(&jobs).await;
    pb.finish_and_clear();
    let results = results?;

    let output = render(&results, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} {} result(s) written to {} in {:?}",
            style("✓").green(),
            results.len(),
            output_path.display(),
            start.elapsed()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}
