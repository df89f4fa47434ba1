//! Build CPR, CDR and recovery curves from a cashflow panel and static table
//!
//! ```bash
//! build_curves --panel panel_2022.csv --panel panel_2023.csv \
//!     --static-table loans.csv --pivot product --output-dir curves/
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use loan_curves::curves::save_curve;
use loan_curves::loan::load_static_table;
use loan_curves::panel::load_panel;
use loan_curves::{
    build_curve, CurveKind, DefaultRate, EngineConfig, Portfolio, PrepaymentRate, RecoveryRate,
};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "build_curves")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Long-format panel CSV (repeat for multiple files)
    #[arg(long, required = true)]
    panel: Vec<PathBuf>,

    /// Static loan table CSV
    #[arg(long)]
    static_table: PathBuf,

    /// Engine settings JSON; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Static attribute to split cohorts by (repeatable)
    #[arg(long)]
    pivot: Vec<String>,

    /// Directory to write one file per curve into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Keep negative index values (pre-origination, pre-default months)
    #[arg(long)]
    keep_negative: bool,

    /// Write JSON instead of CSV
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let config = match &args.config {
        Some(path) => EngineConfig::from_json_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let panel = load_panel(args.panel.as_slice()).context("Failed to load cashflow panel")?;
    let statics = load_static_table(&args.static_table)
        .with_context(|| format!("Failed to load static table {}", args.static_table.display()))?;
    println!(
        "Loaded {} panel loans, {} static loans, {} months in {:?}",
        panel.loan_ids().len(),
        statics.len(),
        panel.n_months(),
        start.elapsed()
    );

    let mut portfolio = Portfolio::with_config(panel, statics, config);
    portfolio.derive_all().context("Metric derivation failed")?;
    println!("Derived metrics in {:?}", start.elapsed());

    let pivots: Vec<&str> = args.pivot.iter().map(String::as_str).collect();
    let kinds: [&dyn CurveKind; 3] = [&PrepaymentRate, &DefaultRate, &RecoveryRate];
    let portfolio = &portfolio;
    let curves = kinds
        .par_iter()
        .map(|kind| {
            build_curve(portfolio, *kind, kind.default_index(), &pivots, !args.keep_negative)
                .with_context(|| format!("Failed to build {} curve", kind.name()))
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
    for set in &curves {
        let path = save_curve(set, &args.output_dir, args.json)?;
        println!("{}: {} series -> {}", set.kind, set.series.len(), path.display());
    }

    println!("Done in {:?}", start.elapsed());
    Ok(())
}
