use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use execsummary::config::{optional_arg, Config, DEFAULT_TILE};
use execsummary::discover::{find_and_copy_files, func_path, list_tasks, nifti_files};
use execsummary::mosaic::{preprocess_tx, write_placeholders};
use execsummary::report::{self, Summary};
use execsummary::tools::params::{collect_params, AcquisitionParams};
use execsummary::tools::preproc;
use execsummary::{GapPolicy, Report, SessionLayout};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "execsummary")]
#[command(author, version, about = "Build the executive summary QC page for one subject/session")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// The pipeline's `files` directory for the subject/session
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Subject label, with or without the `sub-` prefix
    #[arg(short, long)]
    participant_label: Option<String>,

    /// Session label, with or without the `ses-` prefix
    #[arg(short, long)]
    session_id: Option<String>,

    /// Raw BIDS input: dataset root or the subject's `func` directory
    #[arg(short = 'i', long)]
    bids_input: Option<PathBuf>,

    /// Subdirectory of the output directory holding the summary images
    #[arg(short = 'd', long)]
    dcan_summary: Option<PathBuf>,

    /// Atlas used for the registration images
    #[arg(short, long)]
    atlas: Option<PathBuf>,

    /// Only lay out the page from images already in place
    #[arg(long)]
    layout_only: bool,

    /// Collect acquisition parameters from the NIfTI files
    #[arg(long)]
    params: bool,

    /// Also write the acquisition parameters as CSV
    #[arg(long)]
    csv: bool,

    /// Also write a JSON manifest of the page
    #[arg(long)]
    json: bool,

    /// Which task rows to show when series numbers have gaps
    #[arg(long, value_enum, default_value_t = GapPolicy::Observed)]
    gap_policy: GapPolicy,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Edge length of one mosaic tile, in pixels
    #[arg(long, default_value_t = DEFAULT_TILE)]
    tile: u32,

    /// Open the report when done
    #[arg(long)]
    open: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preview generated reports in the browser
    Serve {
        /// Report directory to serve
        path: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("execsummary={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    // Handle subcommands first
    if let Some(Command::Serve { path, port }) = &args.command {
        if let Err(e) = execsummary::serve::start(*port, path.clone()) {
            error!("server error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn config_from(args: &Args) -> anyhow::Result<Config> {
    let Some(output_dir) = &args.output_dir else {
        bail!("--output-dir is required");
    };
    let Some(subject) = optional_arg(args.participant_label.clone()) else {
        bail!("--participant-label is required");
    };
    if !output_dir.is_dir() {
        bail!("output directory {} does not exist", output_dir.display());
    }
    if let Some(atlas) = &args.atlas {
        if !atlas.exists() {
            bail!("atlas {} does not exist", atlas.display());
        }
    }

    let bids_input = optional_arg(args.bids_input.as_ref().map(|p| p.to_string_lossy().to_string()))
        .map(PathBuf::from);
    let summary_dir = optional_arg(args.dcan_summary.as_ref().map(|p| p.to_string_lossy().to_string()))
        .map(PathBuf::from);

    Ok(Config::new(output_dir, subject)
        .with_session(optional_arg(args.session_id.clone()))
        .with_summary_dir(summary_dir)
        .with_bids_input(bids_input)
        .with_atlas(args.atlas.clone())
        .with_layout_only(args.layout_only)
        .with_params(args.params || args.csv)
        .with_outputs(args.csv, args.json)
        .with_gap_policy(args.gap_policy)
        .with_tile(args.tile))
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = config_from(args)?;

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let layout = SessionLayout::prepare(&config.files_path, config.summary_dir.as_deref(), config.layout_only)
        .context("cannot prepare the summary directory")?;

    if !args.quiet {
        eprintln!("\x1b[1mExecutive Summary\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Subject: {}", config.subject_label());
        if let Some(ses) = config.session_label() {
            eprintln!("Session: {}", ses);
        }
        eprintln!("Summary: {}\n", layout.summary_path.display());
    }

    if !config.layout_only {
        let func = config
            .bids_input
            .as_deref()
            .and_then(|bids| func_path(bids, &config.subject_label(), config.session_label().as_deref()));

        if let Err(e) = preproc::run(&config, &layout, func.as_deref()) {
            warn!("preprocessing failed, continuing with the images in place: {}", e);
        }

        for tx in ["T1", "T2"] {
            preprocess_tx(tx, &layout.summary_path, &layout.images_path, config.tile);
        }
    }

    let copied = find_and_copy_files(&layout.summary_path, "*DVARS_and_FD*.png", &layout.images_path)
        .context("cannot copy the gray plots")?;
    info!("copied {} gray plot(s)", copied.len());

    write_placeholders(&layout.images_path, config.tile).context("cannot write the placeholder images")?;

    let tasks = list_tasks(&config.files_path).context("cannot list the processed tasks")?;

    let params = if config.collect_params {
        acquisition_params(&config, args.quiet)
    } else {
        Vec::new()
    };

    let report = Report::collect(&config, &layout, &tasks, params).context("cannot collect the report images")?;
    let page = report::write_report(&layout, &report)?;

    let mut written = vec![page.clone()];
    if config.write_csv {
        let path = layout.html_path.join("acquisition_params.csv");
        report::generate(&path, &report)?;
        written.push(path);
    }
    if config.write_json {
        let path = layout.html_path.join("executive_summary.json");
        report::generate(&path, &report)?;
        written.push(path);
    }

    let summary = Summary::from_report(&report);
    if !args.quiet {
        eprintln!("\n{}", "─".repeat(70));
        eprintln!("\x1b[1mSummary:\x1b[0m");
        eprintln!("  Tasks:        {}", summary.tasks);
        eprintln!("  Rows:         {}", summary.rows);
        eprintln!("  Placeholders: {}", summary.placeholders);
        if summary.params > 0 {
            eprintln!("  Parameters:   {}", summary.params);
        }
        for path in &written {
            eprintln!("\n\x1b[32mSaved: {}\x1b[0m", path.display());
        }
    }

    if args.open {
        if let Err(e) = open::that(&page) {
            warn!("failed to open report: {}", e);
        }
    }

    Ok(())
}

fn acquisition_params(config: &Config, quiet: bool) -> Vec<AcquisitionParams> {
    let files = nifti_files(&config.files_path);
    if files.is_empty() {
        warn!("no NIfTI files under {}", config.files_path.display());
        return Vec::new();
    }

    // Set up progress bar
    let pb = if !quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let params = collect_params(&config.tools, &files, |p| {
        if let Some(ref pb) = pb {
            pb.inc(1);
            pb.set_message(
                p.file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
        }
    });

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    params
}
