use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod config;
mod error;

use config::{Config, Overrides};
use error::{format_error_with_suggestions, CliError};
use tracy_core::io::{load_reference, load_trace_input};
use tracy_core::{AnalysisContext, PipelineConfig, ReferenceIndex};

#[derive(Parser)]
#[command(name = "tracy")]
#[command(about = "Tracy - Sanger trace decomposition and variant calling")]
#[command(version)]
#[command(long_about = "
Tracy locates a Sanger trace in a reference genome, aligns its signal profile,
separates heterozygous indels into two alleles and reports their variants.

Examples:
  tracy decompose --genome hg38.fa.gz --call-variants --output out.json sample.json
  tracy decompose --genome wildtype.json sample.json
  tracy locate --genome hg38.fa.gz sample.json
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to ./tracy.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a trace into two alleles and report the alignments
    Decompose {
        #[command(flatten)]
        input: InputArgs,

        /// Max. indel size expected in the trace
        #[arg(short = 'i', long = "maxindel")]
        max_indel: Option<usize>,

        /// MAD cutoff of the profile-shift detector
        #[arg(long, hide = true)]
        madc: Option<f64>,

        /// Extract variants from the allele alignments
        #[arg(long)]
        call_variants: bool,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Only locate the trace in the genome
    Locate {
        #[command(flatten)]
        input: InputArgs,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    Config,
}

#[derive(Args)]
struct InputArgs {
    /// Base-call JSON of the trace
    trace: PathBuf,

    /// Reference genome (FASTA, optionally gzipped) or wildtype base-call JSON
    #[arg(short, long)]
    genome: PathBuf,

    /// Peak ratio to call a secondary base
    #[arg(short = 'p', long = "pratio")]
    peak_ratio: Option<f32>,

    /// K-mer size for locating the trace
    #[arg(short, long)]
    kmer: Option<usize>,

    /// Required number of agreeing k-mers
    #[arg(short, long)]
    support: Option<usize>,

    /// Trim size for the 5' end
    #[arg(short = 'l', long)]
    trim_left: Option<usize>,

    /// Trim size for the 3' end
    #[arg(short = 'r', long)]
    trim_right: Option<usize>,
}

impl InputArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            peak_ratio: self.peak_ratio,
            kmer: self.kmer,
            min_kmer_support: self.support,
            trim_left: self.trim_left,
            trim_right: self.trim_right,
            ..Default::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if let Err(err) = run(cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => eprintln!("Error: {}", format_error_with_suggestions(cli_err)),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Decompose { input, max_indel, madc, call_variants, output } => {
            let overrides = Overrides { max_indel, madc, call_variants, ..input.overrides() };
            let pipeline = Config::load(cli.config.as_deref())?.with_overrides(&overrides)?;
            cmd_decompose(&input, pipeline, output.as_deref())
        }
        Commands::Locate { input, output } => {
            let pipeline = Config::load(cli.config.as_deref())?.with_overrides(&input.overrides())?;
            cmd_locate(&input, pipeline, output.as_deref())
        }
        Commands::Config => {
            print!("{}", Config::example_toml()?);
            Ok(())
        }
    }
}

/// Load the genome and the trace, build the index and set up the analysis.
fn prepare(input: &InputArgs, pipeline: &PipelineConfig) -> Result<(ReferenceIndex, tracy_core::Trace, tracy_core::BaseCalls)> {
    let records = load_reference(&input.genome, pipeline.peak_ratio).map_err(CliError::from)?;
    let index = ReferenceIndex::build(records).map_err(CliError::from)?;
    let (trace, calls) = load_trace_input(&input.trace, pipeline.peak_ratio).map_err(CliError::from)?;
    Ok((index, trace, calls))
}

fn cmd_decompose(input: &InputArgs, pipeline: PipelineConfig, output: Option<&Path>) -> Result<()> {
    let (index, trace, calls) = prepare(input, &pipeline)?;
    let ctx = AnalysisContext::new(pipeline, trace, calls, &index).map_err(CliError::from)?;
    let result = ctx.run().map_err(CliError::from)?;
    write_json(&result, output)
}

fn cmd_locate(input: &InputArgs, pipeline: PipelineConfig, output: Option<&Path>) -> Result<()> {
    let (index, trace, calls) = prepare(input, &pipeline)?;
    let ctx = AnalysisContext::new(pipeline, trace, calls, &index).map_err(CliError::from)?;
    let slice = ctx.locate().map_err(CliError::from)?;
    write_json(&slice, output)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write report: {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
