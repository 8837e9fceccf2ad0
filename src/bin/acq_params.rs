//! Acquisition parameters and slice images for individual NIfTI files

use anyhow::Context;
use clap::Parser;
use execsummary::config::ToolPaths;
use execsummary::report::csv;
use execsummary::subject::SubjectInfo;
use execsummary::tools::params::{nifti_params, AcquisitionParams};
use execsummary::tools::slicer::slice_nifti;
use std::fs::File;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "acq-params")]
#[command(author, version, about = "Print acquisition parameters of NIfTI files")]
struct Args {
    /// NIfTI files to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Also write slice images of each file into this directory
    #[arg(long)]
    slices: Option<PathBuf>,

    /// With --slices, also write the three single-plane images
    #[arg(long)]
    planes: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let tools = ToolPaths::default();

    let mut rows: Vec<AcquisitionParams> = Vec::new();
    for file in &args.files {
        let info = SubjectInfo::from_path(file);
        let params = nifti_params(&tools, file, info.as_ref());
        println!(
            "{:<40} {}",
            file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            params.record().join("  ")
        );

        if let Some(dir) = &args.slices {
            std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
            let written = slice_nifti(&tools, file, dir, args.planes)
                .with_context(|| format!("cannot slice {}", file.display()))?;
            for path in written {
                println!("    wrote {}", path.display());
            }
        }
        rows.push(params);
    }

    let Some(first) = args.files.first() else {
        return Ok(());
    };
    let csv_path = first
        .parent()
        .map(|p| p.join("Params.csv"))
        .unwrap_or_else(|| PathBuf::from("Params.csv"));
    let mut out = File::create(&csv_path).with_context(|| format!("cannot create {}", csv_path.display()))?;
    csv::write(&mut out, &rows)?;
    println!("\nSaved: {}", csv_path.display());
    Ok(())
}
