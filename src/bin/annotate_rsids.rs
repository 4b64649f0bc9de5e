// ==============================================================================
// annotate_rsids.rs - rsID Annotation Entry Point
// ==============================================================================
// Description: Writes a plink2 --update-name file mapping .pvar/.bim variant
//              IDs to rsIDs via a CPRA lookup table
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use gwas_qc::joiner::{JoinerConfig, VariantIdJoiner, DEFAULT_OUTPUT};
use gwas_qc::logging::init_tracing;

/// Single-dash long flags accepted for compatibility with the original script
const SHORT_ALIASES: [(&str, &str); 2] = [("-out", "--output_var_conv"), ("-pvar", "--pvar_file")];

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate variant IDs with rsIDs", long_about = None)]
struct Args {
    /// Tab-delimited lookup table with columns chr, pos, c1, c2, rsid
    #[arg(long = "rsid_cpra_table")]
    rsid_cpra_table: PathBuf,

    /// Output path of the rsID -> variant ID mapping
    #[arg(long = "output_var_conv", default_value = DEFAULT_OUTPUT)]
    output_var_conv: PathBuf,

    /// Headerless .pvar/.bim-style variant table
    #[arg(long = "pvar_file")]
    pvar_file: PathBuf,
}

/// Rewrite `-out`/`-pvar` (and `-out=x`) to their double-dash forms
fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            for (alias, long) in SHORT_ALIASES {
                if arg == alias {
                    return long.to_string();
                }
                if let Some(value) = arg.strip_prefix(alias).and_then(|rest| rest.strip_prefix('=')) {
                    return format!("{}={}", long, value);
                }
            }
            arg
        })
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse_from(normalize_args(std::env::args()));
    init_tracing(env!("CARGO_CRATE_NAME"));

    info!("rsID annotation starting...");

    let summary = VariantIdJoiner::new(JoinerConfig {
        rsid_table: args.rsid_cpra_table,
        pvar_file: args.pvar_file,
        output: args.output_var_conv,
    })
    .run()?;

    info!(
        "Done: {} of {} variants annotated",
        summary.written, summary.variant_rows
    );

    Ok(())
}
