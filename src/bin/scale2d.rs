//! scale2d - two-way normalization CLI
//!
//! Reads a delimited table, removes row/column location and scale effects
//! until the estimates settle, and writes the normalized table back out.

use clap::{Parser, Subcommand, ValueEnum};
use scale2d::data::{DataMatrix, MalformedPolicy, ReadOptions, WriteOptions};
use scale2d::error::{Result, ScaleError};
use scale2d::normalize::{norm_scale2d_with_config, ScaleConfig, ZeroVariancePolicy};
use scale2d::profile::profile_missing;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI-friendly malformed-field policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMalformed {
    /// Abort on the first unparseable field
    Error,
    /// Treat unparseable fields as missing
    Missing,
    /// Treat unparseable fields as zero
    Zero,
}

impl From<CliMalformed> for MalformedPolicy {
    fn from(policy: CliMalformed) -> Self {
        match policy {
            CliMalformed::Error => MalformedPolicy::Error,
            CliMalformed::Missing => MalformedPolicy::Missing,
            CliMalformed::Zero => MalformedPolicy::Zero,
        }
    }
}

/// CLI-friendly zero-variance policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliZeroVariance {
    /// Use a unit scale for constant rows/columns
    Unit,
    /// Abort on a constant row/column
    Error,
}

impl From<CliZeroVariance> for ZeroVariancePolicy {
    fn from(policy: CliZeroVariance) -> Self {
        match policy {
            CliZeroVariance::Unit => ZeroVariancePolicy::Unit,
            CliZeroVariance::Error => ZeroVariancePolicy::Error,
        }
    }
}

/// Output format for the profile command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileFormat {
    Text,
    Json,
    Yaml,
}

/// Iterative double-centering and double-scaling of numeric tables
#[derive(Parser)]
#[command(name = "scale2d")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a table until the row/column estimates converge
    Normalize {
        /// Input file path
        #[arg(short, long, default_value = "data.csv")]
        input: PathBuf,

        /// Output file path
        #[arg(short, long, default_value = "convergence.csv")]
        output: PathBuf,

        /// Path to a YAML configuration (flags below override it)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of rescale steps
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Convergence tolerance on consecutive heuristic values
        #[arg(long)]
        tolerance: Option<f64>,

        /// Significant digits in the output
        #[arg(long, default_value = "8")]
        digits: usize,

        /// Field delimiter for input and output
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// How to handle fields that are not numbers
        #[arg(long, value_enum, default_value = "error")]
        on_malformed: CliMalformed,

        /// How to handle constant rows/columns
        #[arg(long, value_enum)]
        zero_variance: Option<CliZeroVariance>,

        /// Z-score the whole table before fitting
        #[arg(long)]
        standardize: bool,

        /// Write the input header to the output
        #[arg(long)]
        write_header: bool,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Profile missing values in a table
    Profile {
        /// Input file path
        #[arg(short, long, default_value = "data.csv")]
        input: PathBuf,

        /// Field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ProfileFormat,
    },

    /// Write the default configuration as YAML
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "scale2d.yaml")]
        output: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize {
            input,
            output,
            config,
            max_iterations,
            tolerance,
            digits,
            delimiter,
            on_malformed,
            zero_variance,
            standardize,
            write_header,
            report,
        } => load_config(config.as_deref()).and_then(|mut scale_config| {
            if let Some(n) = max_iterations {
                scale_config.max_iterations = n;
            }
            if let Some(t) = tolerance {
                scale_config.tolerance = t;
            }
            if let Some(policy) = zero_variance {
                scale_config.zero_variance = policy.into();
            }
            scale_config.standardize |= standardize;

            let delimiter = delimiter_byte(delimiter)?;
            let read_options = ReadOptions {
                delimiter,
                malformed: on_malformed.into(),
                ..Default::default()
            };
            let write_options = WriteOptions {
                delimiter,
                significant_digits: digits,
                write_header,
            };
            cmd_normalize(
                &input,
                &output,
                &scale_config,
                &read_options,
                &write_options,
                report.as_deref(),
            )
        }),

        Commands::Profile {
            input,
            delimiter,
            format,
        } => cmd_profile(&input, delimiter, format),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<ScaleConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            let text = std::fs::read_to_string(path)?;
            ScaleConfig::from_yaml(&text)
        }
        None => Ok(ScaleConfig::default()),
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(ScaleError::InvalidParameter(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            delimiter
        )))
    }
}

/// Normalize a table and write the result
fn cmd_normalize(
    input: &Path,
    output: &Path,
    config: &ScaleConfig,
    read_options: &ReadOptions,
    write_options: &WriteOptions,
    report: Option<&Path>,
) -> Result<()> {
    info!("Loading {:?}...", input);
    let matrix = DataMatrix::from_csv_with_options(input, read_options)?;
    info!(
        "Loaded {} rows x {} columns ({} missing)",
        matrix.n_rows(),
        matrix.n_cols(),
        matrix.n_missing()
    );

    let result = norm_scale2d_with_config(&matrix, config)?;

    info!("Writing normalized table to {:?}...", output);
    result.data.to_csv_with_options(output, write_options)?;

    if let Some(report_path) = report {
        info!("Writing run report to {:?}...", report_path);
        std::fs::write(report_path, result.to_json()?).map_err(|e| ScaleError::OutputWrite {
            path: report_path.to_path_buf(),
            source: Box::new(e.into()),
        })?;
    }

    info!(
        "Done! {} iterations, {}",
        result.iterations,
        if result.converged { "converged" } else { "not converged" }
    );
    Ok(())
}

/// Profile missing values in a table
fn cmd_profile(input: &Path, delimiter: char, format: ProfileFormat) -> Result<()> {
    let options = ReadOptions {
        delimiter: delimiter_byte(delimiter)?,
        malformed: MalformedPolicy::Missing,
        ..Default::default()
    };
    let matrix = DataMatrix::from_csv_with_options(input, &options)?;
    let profile = profile_missing(&matrix);

    match format {
        ProfileFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
        ProfileFormat::Yaml => println!("{}", serde_yaml::to_string(&profile)?),
        ProfileFormat::Text => print!("{}", profile),
    }
    Ok(())
}

/// Write the default configuration
fn cmd_example(output: &Path) -> Result<()> {
    let yaml = ScaleConfig::default().to_yaml()?;
    std::fs::write(output, yaml)?;
    info!("Wrote example configuration to {:?}", output);
    Ok(())
}
