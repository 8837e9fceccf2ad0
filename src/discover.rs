//! Locating pipeline outputs on disk
//!
//! The pipeline leaves its results under a `files` directory:
//!
//! ```text
//! files/
//! ├── MNINonLinear/Results/task-rest_run-01/   (one directory per run)
//! └── <summary-dir>/                           (optional subdirectory)
//!     ├── T1_pngs/  T2_pngs/
//!     ├── *DVARS_and_FD*.png  *.gif
//!     └── executivesummary/                    (created here)
//!         └── img/
//! ```

use crate::error::{Error, Result};
use crate::series::natural_sort;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Name of the report directory inside the summary path
pub const HTML_DIR: &str = "executivesummary";
/// Name of the image directory inside the report directory
pub const IMG_DIR: &str = "img";

/// Path segments that mark NIfTI files not worth summarizing
const SKIPPED_SEGMENTS: [&str; 3] = ["unused", "cortex", "FieldMap"];

/// Where the summary images are read from and the report is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLayout {
    pub files_path: PathBuf,
    pub summary_path: PathBuf,
    pub html_path: PathBuf,
    pub images_path: PathBuf,
}

impl SessionLayout {
    /// Resolve the summary path and create the report directories.
    ///
    /// A stale report directory is removed first, unless `layout_only` is set
    /// (the images in it were produced by an earlier run and are reused).
    pub fn prepare(
        files_path: impl Into<PathBuf>,
        summary_dir: Option<&Path>,
        layout_only: bool,
    ) -> Result<Self> {
        let files_path = files_path.into();
        let summary_path = match summary_dir {
            Some(dir) => files_path.join(dir),
            None => files_path.clone(),
        };

        if !summary_path.is_dir() {
            return Err(Error::MissingDirectory(summary_path));
        }

        let html_path = summary_path.join(HTML_DIR);
        if html_path.exists() && !layout_only {
            debug!("removing previous report in {}", html_path.display());
            fs::remove_dir_all(&html_path).map_err(|e| Error::io(&html_path, e))?;
        }

        let images_path = html_path.join(IMG_DIR);
        fs::create_dir_all(&images_path).map_err(|e| Error::io(&images_path, e))?;

        Ok(Self {
            files_path,
            summary_path,
            html_path,
            images_path,
        })
    }

    /// Image directory as referenced from the HTML file.
    pub fn images_href(&self) -> String {
        format!("./{}", IMG_DIR)
    }
}

/// A processed task run, e.g. `rest` / `01`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Task {
    pub name: String,
    pub run: String,
}

impl Task {
    pub fn run_number(&self) -> Option<u32> {
        self.run.parse().ok()
    }

    /// Parse a run directory name such as `ses-TWO_task-rest_run-01` or
    /// `task-rest01`.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        task_regex().captures(name).map(|caps| Task {
            name: caps[1].to_string(),
            run: caps[2].to_string(),
        })
    }
}

fn task_regex() -> Regex {
    // Literal pattern; it cannot fail to compile.
    match Regex::new(r"task-([^_\d]+)\D*(\d+)") {
        Ok(re) => re,
        Err(e) => unreachable!("task pattern: {e}"),
    }
}

/// Names of the subdirectories of `root` that start with `prefix`, prefix
/// stripped, sorted.
pub fn id_list(root: &Path, prefix: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(root).map_err(|e| Error::io(root, e))?;
    let mut ids: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            e.file_name()
                .to_str()
                .and_then(|n| n.strip_prefix(prefix))
                .map(str::to_string)
        })
        .collect();
    natural_sort(&mut ids);
    Ok(ids)
}

/// Every processed task run of the session.
///
/// `MNINonLinear/Results` is preferred; without it the files directory itself
/// is scanned.
pub fn list_tasks(files_path: &Path) -> Result<Vec<Task>> {
    let results = files_path.join("MNINonLinear").join("Results");
    let scan = if results.is_dir() { results } else { files_path.to_path_buf() };
    info!("processed tasks will be found in {}", scan.display());

    let entries = fs::read_dir(&scan).map_err(|e| Error::io(&scan, e))?;
    let mut tasks: Vec<Task> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(Task::from_dir_name))
        .collect();
    tasks.sort();
    tasks.dedup();

    if tasks.is_empty() {
        warn!("no tasks were found in {}", scan.display());
    }
    Ok(tasks)
}

fn glob_in(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    let mut files: Vec<PathBuf> = glob::glob_with(&full, options)?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort_by(|a, b| {
        crate::series::natural_cmp(&a.to_string_lossy(), &b.to_string_lossy())
    });
    Ok(files)
}

/// First file in `dir` matching `pattern`, in natural order.
pub fn find_one_file(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    Ok(glob_in(dir, pattern)?.into_iter().next())
}

/// Every file in `dir` matching `pattern`, in natural order.
pub fn find_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    glob_in(dir, pattern)
}

/// Copy every file in `src` matching `pattern` into `dst`.
pub fn find_and_copy_files(src: &Path, pattern: &str, dst: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for file in glob_in(src, pattern)? {
        let Some(name) = file.file_name() else { continue };
        let target = dst.join(name);
        fs::copy(&file, &target).map_err(|e| Error::io(&file, e))?;
        debug!("copied {} -> {}", file.display(), target.display());
        copied.push(target);
    }
    Ok(copied)
}

/// The raw BIDS `func` directory for a subject, if there is one.
///
/// `bids_input` may already point at a `func` directory; otherwise it is
/// treated as the dataset root and searched under the subject and then the
/// session.
pub fn func_path(bids_input: &Path, subject: &str, session: Option<&str>) -> Option<PathBuf> {
    if bids_input.file_name().map(|n| n == "func").unwrap_or(false) && bids_input.is_dir() {
        return Some(bids_input.to_path_buf());
    }

    let subject_dir = bids_input.join(subject);
    let mut candidates = vec![subject_dir.join("func")];
    if let Some(ses) = session {
        candidates.push(subject_dir.join(ses).join("func"));
    }

    let found = candidates.into_iter().find(|p| p.is_dir());
    match &found {
        Some(p) => info!("raw BIDS task data will be found in {}", p.display()),
        None => warn!("no raw BIDS task data under {}", bids_input.display()),
    }
    found
}

fn is_nifti(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}

/// NIfTI files under `dir`, skipping unused, cortex and field map data.
pub fn nifti_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_nifti(e.path()))
        .filter(|e| {
            let path = e.path().to_string_lossy();
            !SKIPPED_SEGMENTS.iter().any(|s| path.contains(s))
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort_by(|a, b| {
        crate::series::natural_cmp(&a.to_string_lossy(), &b.to_string_lossy())
    });
    files
}
