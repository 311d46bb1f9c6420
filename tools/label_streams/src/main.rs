//! Assigns hierarchical stream labels to every NHDPlus flowline in a set of
//! HUC8 watersheds and writes one CSV + one statistics log per watershed.
use std::fmt::{Debug, Display};
use std::fs::{self, File};
use std::hash::Hash;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use streamnet_core::{fully_qualify, label_watershed, DigitBase, FlowlineStore};

mod store;

use store::{HighResStore, MediumResStore};

#[derive(Parser, Debug)]
#[command(name = "label_streams", about = "Assign hierarchical labels to NHDPlus stream reaches")]
struct Args {
    /// Path to the SQLite database holding flowline geometries/attributes.
    #[arg(short = 'f', long)]
    flowline: String,

    /// Path to the SQLite database holding the PlusFlow edge table. Required
    /// unless --nhdhr is set.
    #[arg(short = 'p', long)]
    plusflow: Option<String>,

    /// CSV file of watersheds to process (`WS_code,HUC8,Name`).
    #[arg(short = 'w', long, default_value = "input/LWI_watersheds.csv")]
    watersheds: String,

    /// Number of watersheds to process concurrently. Defaults to the host
    /// CPU count.
    #[arg(short = 'n', long)]
    num_threads: Option<usize>,

    /// Use the NHDPlus HR schema instead of medium-resolution.
    #[arg(long)]
    nhdhr: bool,

    /// Encode stream labels as Crockford base-32.
    #[arg(long)]
    base32: bool,

    /// Encode stream labels as hexadecimal. Wins over --base32 if both are given.
    #[arg(long)]
    hexadecimal: bool,

    /// Directory output CSV and log files are written to.
    #[arg(short = 'o', long, default_value = "output")]
    output: String,
}

#[derive(Debug, Deserialize, Clone)]
struct WatershedRow {
    #[serde(rename = "WS_code")]
    ws_code: String,
    #[serde(rename = "HUC8")]
    huc8: String,
    #[allow(dead_code)]
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Serialize)]
struct StreamLabelRow<'a> {
    stream_label: String,
    ws_code: &'a str,
    huc8: &'a str,
    comid: String,
    reachcode: &'a str,
    divergence: u32,
}

fn load_watersheds(path: &str) -> Result<Vec<WatershedRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening watersheds file {path}"))?;
    reader
        .deserialize()
        .collect::<Result<Vec<WatershedRow>, csv::Error>>()
        .with_context(|| format!("parsing watersheds file {path}"))
}

fn digit_base(args: &Args) -> DigitBase {
    if args.hexadecimal {
        DigitBase::Hex
    } else {
        DigitBase::Crockford
    }
}

fn process_watershed<S>(store: &S, ws: &WatershedRow, base: DigitBase, output_dir: &Path) -> Result<()>
where
    S: FlowlineStore,
    S::Id: Display + Eq + Hash + Copy + Debug,
{
    tracing::info!(ws_code = %ws.ws_code, huc8 = %ws.huc8, "labeling watershed");

    let labeling = label_watershed(store, &ws.huc8, base)
        .with_context(|| format!("labeling watershed {} ({})", ws.ws_code, ws.huc8))?;

    if let Some(err) = store.take_error() {
        anyhow::bail!(
            "watershed {} ({}) hit a malformed row or database error mid-traversal: {err}",
            ws.ws_code,
            ws.huc8
        );
    }

    let csv_path = output_dir.join(format!("{}_{}.csv", ws.ws_code, ws.huc8));
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;

    let mut max_fq_len = 0usize;
    for reach in &labeling.reaches {
        let (fq, too_long) = fully_qualify(&ws.ws_code, &reach.compact_label)?;
        max_fq_len = max_fq_len.max(fq.len());
        if too_long {
            tracing::warn!(
                label = %fq,
                len = fq.len(),
                ws_code = %ws.ws_code,
                huc8 = %ws.huc8,
                "fully-qualified stream label exceeds max length"
            );
        }
        writer.serialize(StreamLabelRow {
            stream_label: fq,
            ws_code: &ws.ws_code,
            huc8: &ws.huc8,
            comid: reach.flowline.id.to_string(),
            reachcode: &reach.flowline.reachcode,
            divergence: reach.flowline.divergence,
        })?;
    }
    writer.flush()?;

    let log_path = output_dir.join(format!("{}_{}.txt", ws.ws_code, ws.huc8));
    let mut log = File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?;
    writeln!(log, "Statistics for watershed {}, HUC8 '{}'", ws.ws_code, ws.huc8)?;
    writeln!(log, "Number of roots: {}", labeling.stats.num_roots)?;
    writeln!(log, "Max hierarchy depth: {}", labeling.stats.max_hack_order)?;
    writeln!(
        log,
        "Max compact label length: {}",
        labeling.stats.max_compact_label_len
    )?;
    writeln!(log, "Max fully-qualified label length: {max_fq_len}")?;
    for (order, count) in labeling.stats.reaches_per_order.iter().enumerate() {
        writeln!(log, "Reaches at hierarchy order {order}: {count}")?;
    }

    tracing::info!(
        ws_code = %ws.ws_code,
        huc8 = %ws.huc8,
        reaches = labeling.reaches.len(),
        "finished labeling watershed"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let base = digit_base(&args);
    let output_dir = Path::new(&args.output);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let watersheds = load_watersheds(&args.watersheds)?;

    if let Some(n) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("building rayon thread pool")?;
    }

    let results: Vec<(WatershedRow, Result<()>)> = watersheds
        .into_par_iter()
        .map(|ws| {
            let result = if args.nhdhr {
                HighResStore::open(&args.flowline)
                    .and_then(|store| process_watershed(&store, &ws, base, output_dir))
            } else {
                let plusflow = args
                    .plusflow
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("--plusflow is required unless --nhdhr is set"));
                match plusflow {
                    Ok(plusflow) => MediumResStore::open(&args.flowline, plusflow)
                        .and_then(|store| process_watershed(&store, &ws, base, output_dir)),
                    Err(e) => Err(e),
                }
            };
            (ws, result)
        })
        .collect();

    let mut failures = 0usize;
    for (ws, result) in results {
        if let Err(e) = result {
            tracing::error!(ws_code = %ws.ws_code, huc8 = %ws.huc8, error = %e, "watershed failed");
            failures += 1;
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} watersheds failed", failures);
    }
    Ok(())
}
