//! Batch command - extract the same fields from every matching PDF.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use pdfield_core::{ExtractionJob, ExtractionMethod, ExtractionSchema, Label};

use super::output::{render, OutputFormat};
use super::{build_orchestrator, load_config, with_data_root};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for input PDFs
    #[arg(required = true)]
    input: String,

    /// Document label (selects the pattern bank)
    #[arg(short, long)]
    label: String,

    /// Requested field as name=description (repeatable)
    #[arg(long = "field", value_name = "NAME=DESCRIPTION", required = true)]
    fields: Vec<String>,

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

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = with_data_root(load_config(config_path)?, args.data_root.clone());
    let schema = parse_fields(&args.fields)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!("{} Found {} files to process", style("ℹ").blue(), files.len());

    let data_root = &config.documents.data_root;
    let label = Label::new(args.label.as_str());
    let jobs: Vec<ExtractionJob> = files
        .iter()
        .map(|file| ExtractionJob::new(label.clone(), schema.clone(), job_path(file, data_root)))
        .collect();

    let orchestrator = build_orchestrator(&config)?;

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // fail fast: the first error aborts the run
    let mut results = Vec::with_capacity(jobs.len());
    for job in &jobs {
        debug!("Processing {}", job.pdf_path);
        match orchestrator.run_job(job).await {
            Ok(result) => results.push(result),
            Err(e) => {
                pb.abandon();
                anyhow::bail!("Processing {} failed: {}", job.pdf_path, e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let output = render(&results, args.format)?;
    match &args.output {
        Some(path) => fs::write(path, &output)?,
        None => println!("{}", output),
    }

    let mixed = results
        .iter()
        .filter(|r| r.extracao_com == ExtractionMethod::Mixed)
        .count();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} pattern-only, {} with fallback",
        style(results.len() - mixed).green(),
        style(mixed).yellow()
    );

    Ok(())
}

/// Parse `name=description` pairs; the description may be empty.
fn parse_fields(fields: &[String]) -> anyhow::Result<ExtractionSchema> {
    let mut schema = ExtractionSchema::new();
    for field in fields {
        let (name, description) = field
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid field '{}': expected name=description", field))?;
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Invalid field '{}': empty name", field);
        }
        schema.insert(name, description.trim());
    }
    Ok(schema)
}

/// Path of `file` relative to the data root, or absolute when it lies outside it.
fn job_path(file: &Path, data_root: &Path) -> String {
    let file = fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
    let root = fs::canonicalize(data_root).unwrap_or_else(|_| data_root.to_path_buf());

    match file.strip_prefix(&root) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => std::path::absolute(&file)
            .unwrap_or(file)
            .to_string_lossy()
            .into_owned(),
    }
}
