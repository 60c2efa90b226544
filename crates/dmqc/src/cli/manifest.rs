//! Manifest command - Show a site's expected scans

use crate::cli::output::{print_json, print_table};
use crate::cli::{load_config, require_site};
use dmqc::manifest::ExpectedManifest;
use std::path::PathBuf;

/// Arguments for the manifest command
#[derive(Debug)]
pub struct ManifestArgs {
    pub config: PathBuf,
    pub site: String,
    pub json: bool,
}

pub fn run(args: ManifestArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    require_site(&config, &args.site)?;
    let manifest = ExpectedManifest::build(&config, &args.site)?;

    if args.json {
        return print_json(&manifest);
    }

    if manifest.is_empty() {
        println!("No scans expected for site {}", manifest.site());
        return Ok(());
    }

    let rows = manifest
        .entries()
        .iter()
        .map(|entry| {
            vec![
                entry.tag.clone(),
                entry.expected_count.to_string(),
                entry.order_key.to_string(),
            ]
        })
        .collect();
    print_table(&["Tag", "Count", "Order"], rows);
    Ok(())
}
