//! # Catalog Pricing Runner
//!
//! Prices a catalog file and prints results, compliance findings and a
//! coverage report as JSON.
//!
//! ## Usage
//! ```bash
//! # Price with the default config lookup
//! cargo run -p margo-config --bin margo-price -- catalog.json
//!
//! # Use a specific config file
//! cargo run -p margo-config --bin margo-price -- catalog.json --config ./pricing.toml
//!
//! # More logging
//! RUST_LOG=margo_core=debug cargo run -p margo-config --bin margo-price -- catalog.json
//! ```
//!
//! The catalog is a JSON array of product descriptions. Logs go to stderr,
//! the report to stdout.

use std::env;
use std::path::PathBuf;

use margo_config::global;
use margo_core::compliance::{check_compliance, ComplianceFinding};
use margo_core::engine::CatalogEntry;
use margo_core::report::CoverageReport;
use margo_core::{PricingEngine, ProductDescription};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct BatchOutput {
    entries: Vec<CatalogEntry>,
    findings: Vec<ComplianceFinding>,
    report: CoverageReport,
}

fn print_help() {
    println!("Margo Catalog Pricing");
    println!();
    println!("Usage: margo-price <CATALOG.json> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Pricing config TOML (default: $MARGO_CONFIG or platform dir)");
    println!("  -h, --help           Show this help message");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut catalog_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => catalog_path = Some(PathBuf::from(other)),
        }
        i += 1;
    }

    let Some(catalog_path) = catalog_path else {
        print_help();
        return Err("missing catalog file".into());
    };

    let config = global::load_global(config_path)?;
    let catalog = std::fs::read_to_string(&catalog_path)?;
    let products: Vec<ProductDescription> = serde_json::from_str(&catalog)?;
    info!(path = ?catalog_path, products = products.len(), "Pricing catalog");

    let engine = PricingEngine::new(config);
    let entries = engine.price_catalog(&products);

    let mut findings = Vec::new();
    for result in entries.iter().filter_map(CatalogEntry::result) {
        findings.extend(check_compliance(result, config)?);
    }

    let report = CoverageReport::from_catalog(&entries);
    info!(
        priced = report.products,
        failed = report.failed,
        findings = findings.len(),
        "Catalog priced"
    );

    let output = BatchOutput {
        entries,
        findings,
        report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
