//! CLI entry point for the register map generator binary.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use regmap_core::{AllocationResult, MaskStyle, RegionKind};
use regmap_gen::config::GeneratorConfig;
use regmap_gen::generate::{generate, GenerateError, GenerateResult};
use serde as _;
use simple_logger::SimpleLogger;
use thiserror as _;
use toml as _;
#[cfg(test)]
use tempfile as _;

const DEFAULT_HEADER_NAME: &str = "c_regmap.h";
const DEFAULT_DOC_NAME: &str = "regmap.md";

/// Register map generator.
#[derive(Debug, Parser)]
#[command(name = "regmap-gen", version, about)]
struct Cli {
    /// Log progress; repeat for per-field detail.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the C header and Markdown table.
    Build(BuildArgs),
    /// Validate declarations and print the address listing.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Declaration header or literate Markdown file.
    input: PathBuf,

    /// Header output path (default: c_regmap.h next to the input).
    #[arg(long, value_name = "FILE")]
    header: Option<PathBuf>,

    /// Documentation output path (default: regmap.md next to the input).
    #[arg(long, value_name = "FILE")]
    doc: Option<PathBuf>,

    #[command(flatten)]
    options: ConfigArgs,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Declaration header or literate Markdown file.
    input: PathBuf,

    #[command(flatten)]
    options: ConfigArgs,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Constant name prefix.
    #[arg(long)]
    prefix: Option<String>,

    /// Emit masks in the legacy GENMASK encoding.
    #[arg(long)]
    legacy_masks: bool,

    /// Emit only the documentation table header.
    #[arg(long)]
    header_only_doc: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<GeneratorConfig, String> {
        let mut config = match &self.config {
            Some(path) => GeneratorConfig::load(path).map_err(|e| e.to_string())?,
            None => GeneratorConfig::default(),
        };
        if let Some(prefix) = &self.prefix {
            config.prefix.clone_from(prefix);
        }
        if self.legacy_masks {
            config.mask_style = MaskStyle::Legacy;
        }
        if self.header_only_doc {
            config.doc_rows = false;
        }
        Ok(config)
    }
}

const fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

fn sibling_path(input: &Path, name: &str) -> PathBuf {
    input.parent().unwrap_or_else(|| Path::new("")).join(name)
}

fn run_pipeline(input: &Path, config: &ConfigArgs) -> Result<GenerateResult, i32> {
    let config = config.resolve().map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;
    let result = generate(input, &config).map_err(|e| {
        report_generate_error(&e);
        1
    })?;
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(result)
}

fn report_generate_error(e: &GenerateError) {
    if let Some(loc) = &e.location {
        eprintln!("{loc}: error: {}", e.kind);
    } else {
        eprintln!("error: {}", e.kind);
    }
}

fn run_build(args: &BuildArgs) -> Result<(), i32> {
    let result = run_pipeline(&args.input, &args.options)?;

    let header_path = args
        .header
        .clone()
        .unwrap_or_else(|| sibling_path(&args.input, DEFAULT_HEADER_NAME));
    let doc_path = args
        .doc
        .clone()
        .unwrap_or_else(|| sibling_path(&args.input, DEFAULT_DOC_NAME));

    for (path, text) in [(&header_path, &result.header), (&doc_path, &result.documentation)] {
        if let Err(e) = fs::write(path, text) {
            eprintln!("error: failed to write {}: {e}", path.display());
            return Err(1);
        }
    }

    println!(
        "Generated {} regions ({} registers) from {} -> {}, {}",
        result.map.regions.len(),
        result.map.end_address,
        args.input.display(),
        header_path.display(),
        doc_path.display()
    );
    Ok(())
}

fn run_check(args: &CheckArgs) -> Result<(), i32> {
    let result = run_pipeline(&args.input, &args.options)?;
    for line in listing(&result) {
        println!("{line}");
    }
    Ok(())
}

fn listing(result: &GenerateResult) -> Vec<String> {
    let mut lines = Vec::new();
    for allocation in &result.map.regions {
        let region = &allocation.region.name;
        if allocation.region.kind == RegionKind::Opaque {
            lines.push(format!(
                "0x{:02X}  {region}  -  opaque",
                allocation.start_address
            ));
            continue;
        }
        for field in &allocation.results {
            let kind = match field {
                AllocationResult::ByteField { .. } => "byte".to_string(),
                AllocationResult::WordField { .. } => "word".to_string(),
                AllocationResult::BitField {
                    bit_low, bit_high, ..
                } => format!("bits {}..={}", bit_low, bit_high - 1),
            };
            lines.push(format!(
                "0x{:02X}  {region}  {}  {kind}",
                field.address(),
                field.name()
            ));
        }
    }
    lines
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = SimpleLogger::new()
        .with_level(level_for(cli.verbose))
        .init()
    {
        eprintln!("error: failed to initialise logging: {e}");
    }

    let outcome = match &cli.command {
        Command::Build(args) => run_build(args),
        Command::Check(args) => run_check(args),
    };
    std::process::exit(outcome.err().unwrap_or(0));
}
