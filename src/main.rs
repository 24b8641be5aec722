use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use volume_compare::batch::{BatchManifest, BatchRunner};
use volume_compare::config::{load_config_or_default, CompareOptions, Config, OutputLocators};
use volume_compare::data::RawVolumeCodec;
use volume_compare::logging::{init_logging, new_correlation_id, LoggingConfig};
use volume_compare::report::{compare_and_report, write_report, ComparisonReport};

#[derive(Parser)]
#[command(name = "volume-compare")]
#[command(about = "Compare two 3-D image volumes against difference tolerances")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// TOML or JSON file with default tolerances, masking and logging
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (defaults to one per core)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare one pair of volumes
    Compare(CompareArgs),

    /// Run every case of a manifest
    Batch {
        /// TOML manifest with [[case]] entries
        #[arg(long)]
        manifest: PathBuf,

        /// Write a JSON report of all cases
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CompareArgs {
    /// First image
    #[arg(short = 'a', long)]
    image_a: PathBuf,

    /// Second image
    #[arg(short = 'b', long)]
    image_b: PathBuf,

    /// Label volume applied to both images
    #[arg(short = 'k', long)]
    mask: Option<PathBuf>,

    /// Keep voxels outside the label instead of inside it
    #[arg(short = 'o', long)]
    outside: bool,

    /// Target label in the mask
    #[arg(short = 'l', long)]
    label: Option<u16>,

    /// Value written into masked-out voxels
    #[arg(short = 'u', long, allow_hyphen_values = true)]
    value: Option<f32>,

    /// Write masked image A
    #[arg(short = 'A', long)]
    masked_a: Option<PathBuf>,

    /// Write masked image B
    #[arg(short = 'B', long)]
    masked_b: Option<PathBuf>,

    /// Write the absolute difference volume
    #[arg(short = 'd', long)]
    difference: Option<PathBuf>,

    /// Ceiling for the maximum difference
    #[arg(short = 'M', long)]
    max: Option<f64>,

    /// Ceiling for the minimum difference
    #[arg(short = 'm', long)]
    min: Option<f64>,

    /// Ceiling for the mean difference
    #[arg(short = 'e', long)]
    mean: Option<f64>,

    /// Ceiling for the standard deviation of the difference
    #[arg(short = 's', long)]
    sigma: Option<f64>,

    /// Write a JSON report of the run
    #[arg(long)]
    report: Option<PathBuf>,
}

impl CompareArgs {
    /// Command-line values win over the config file
    fn to_options(&self, config: &Config) -> CompareOptions {
        let defaults = config.tolerance;
        let tolerance = defaults
            .with_max(self.max.unwrap_or(defaults.max_ceiling))
            .with_min(self.min.unwrap_or(defaults.min_ceiling))
            .with_mean(self.mean.unwrap_or(defaults.mean_ceiling))
            .with_sigma(self.sigma.unwrap_or(defaults.sigma_ceiling));

        CompareOptions {
            image_a: self.image_a.clone(),
            image_b: self.image_b.clone(),
            mask: self.mask.clone(),
            mask_outside: self.outside,
            mask_label: self.label.unwrap_or(config.masking.label),
            mask_value: self.value.unwrap_or(config.masking.fill_value),
            tolerance,
            outputs: OutputLocators {
                masked_a: self.masked_a.clone(),
                masked_b: self.masked_b.clone(),
                difference: self.difference.clone(),
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn logging_config(cli: &Cli, config: &Config) -> LoggingConfig {
    if cli.quiet {
        return config.logging.clone().with_level("error");
    }
    match cli.verbose {
        0 => config.logging.clone(),
        1 => config.logging.clone().with_level("info"),
        2 => config.logging.clone().with_level("debug"),
        _ => config.logging.clone().with_level("trace"),
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = load_config_or_default(cli.config.as_deref())?;
    if cli.threads.is_some() {
        config.execution.threads = cli.threads;
    }

    let _log_guard = init_logging(&logging_config(&cli, &config))?;
    config.execution.configure_thread_pool()?;

    match &cli.command {
        Commands::Compare(args) => handle_compare(args, &config),
        Commands::Batch { manifest, report } => handle_batch(manifest, report.as_deref(), &config),
    }
}

fn handle_compare(args: &CompareArgs, config: &Config) -> anyhow::Result<bool> {
    let options = args.to_options(config);
    new_correlation_id();

    let codec = RawVolumeCodec::new();
    let outcome = compare_and_report(
        &options,
        &codec,
        &codec,
        io::stdout().lock(),
        io::stderr().lock(),
    )?;

    if let Some(path) = &args.report {
        write_report(&ComparisonReport::new(&options, &outcome), path)?;
    }

    Ok(outcome.verdict.passed)
}

fn handle_batch(
    manifest_path: &Path,
    report: Option<&Path>,
    config: &Config,
) -> anyhow::Result<bool> {
    let manifest = BatchManifest::load(manifest_path)?;
    let codec = RawVolumeCodec::new();
    let runner = BatchRunner::new(&codec, &codec, config);

    let outcome = runner.run(&manifest, manifest_path);
    for case in &outcome.cases {
        println!("{}", case);
    }
    println!(
        "{}/{} cases passed",
        outcome.passed_count(),
        outcome.cases.len()
    );

    if let Some(path) = report {
        write_report(&outcome, path)?;
    }

    Ok(outcome.all_passed())
}
