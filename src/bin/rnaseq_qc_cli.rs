use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use rnaseq_qc_rs::{analyze_directory, AnalysisError, AnalysisKind, EngineConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Analysis {
    Complexity,
    Contamination,
    Strand,
    Full,
}

impl From<Analysis> for AnalysisKind {
    fn from(a: Analysis) -> Self {
        match a {
            Analysis::Complexity => AnalysisKind::Complexity,
            Analysis::Contamination => AnalysisKind::Contamination,
            Analysis::Strand => AnalysisKind::Strand,
            Analysis::Full => AnalysisKind::Full,
        }
    }
}

/// Library complexity, contamination and strandedness QC for gzip FASTQ files.
#[derive(Debug, Parser)]
#[command(name = "rnaseq-qc", version, about)]
struct Args {
    /// Directory searched recursively for *.fastq.gz / *.fq.gz
    #[arg(long, default_value = "fastq_downloads")]
    input_dir: PathBuf,

    /// Where reports are written
    #[arg(long, default_value = "qc_reports")]
    output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Analysis::Full)]
    analysis: Analysis,

    /// Files analysed concurrently (overrides QC_MAX_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// K-mer length for the contamination screen (overrides KMER_SIZE)
    #[arg(long)]
    kmer_size: Option<usize>,

    /// Reads sampled for strand inference (overrides STRAND_DETECT_SAMPLE_SIZE)
    #[arg(long)]
    strand_sample_size: Option<usize>,

    /// Analyse files even if FASTQ validation fails
    #[arg(long)]
    allow_invalid: bool,
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))
            .expect("Invalid spinner template"),
    );
    pb.set_message(msg);
    pb
}

fn build_config(args: &Args) -> Result<EngineConfig, AnalysisError> {
    let mut cfg = EngineConfig::from_env()?;
    if let Some(w) = args.workers {
        cfg.workers = w;
    }
    if let Some(k) = args.kmer_size {
        cfg.kmer_size = k;
    }
    if let Some(n) = args.strand_sample_size {
        cfg.strand_sample_size = n;
    }
    if args.allow_invalid {
        cfg.require_valid_format = false;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let kind = AnalysisKind::from(args.analysis);

    let cfg = match build_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(2);
        }
    };

    // 1. Analyse every file under the input directory
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .expect("Invalid progress template")
            .progress_chars("#>-"),
    );
    let results = match analyze_directory(&args.input_dir, kind, &cfg, Some(&pb)) {
        Ok(r) => r,
        Err(e) => {
            pb.abandon();
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    pb.finish_with_message("Analysis finished.");

    // 2. Write reports
    let sp = spinner("yellow", "Writing reports...");
    match results.write_reports(&args.output_dir) {
        Ok(paths) => sp.finish_with_message(format!(
            "{} report file(s) written to {}",
            paths.len(),
            args.output_dir.display()
        )),
        Err(e) => {
            sp.abandon();
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    // 3. Summary to stdout
    match results.get_summary() {
        Ok(summary) => println!("{summary}"),
        Err(e) => log::error!("{e}"),
    }

    let failed = results.failed().count();
    if failed > 0 {
        log::warn!("{} of {} file(s) could not be analysed", failed, results.records.len());
    }
    ExitCode::SUCCESS
}
