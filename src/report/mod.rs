//! Report generation
//!
//! The executive summary is collected into a [`Report`] and then written in
//! one of several formats:
//!
//! - **HTML**: The QC page with BrainSprite viewers and image sliders
//! - **JSON**: Manifest of every image (or placeholder) the page shows
//! - **CSV**: The acquisition parameter table
//!
//! # Usage
//!
//! ```ignore
//! use execsummary::report;
//!
//! // Automatically picks format based on extension
//! report::generate("executive_summary_sub-01.html", &report)?;
//! report::generate("executive_summary.json", &report)?;
//! report::generate("acquisition_params.csv", &report)?;
//! ```

pub mod csv;
pub mod html;
pub mod json;
pub mod modal;

use crate::config::Config;
use crate::discover::{find_files, find_one_file, SessionLayout, Task};
use crate::error::{Error, Result};
use crate::series::{natural_sort, Category, Cell, Placeholder, SeriesMatcher, SeriesTable};
use crate::tools::params::AcquisitionParams;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Number of single-plane PNGs the preprocessing writes per anatomical scan
const EXPECTED_TX_PNGS: usize = 9;

/// Images of the T1 or T2 section.
#[derive(Debug, Clone, Serialize)]
pub struct TxImages {
    pub tx: String,
    /// BrainSprite sheet, when one was built
    pub mosaic: Option<String>,
    /// Slices shown in the slider
    pub pngs: Vec<String>,
}

/// Session-wide gray plots and atlas registrations.
#[derive(Debug, Clone, Serialize)]
pub struct AnatImages {
    pub pre_reg_gray: Cell,
    pub post_reg_gray: Cell,
    pub atlas_in_t1: Cell,
    pub t1_in_atlas: Cell,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub subject: String,
    pub session: Option<String>,
    pub generated: String,
    /// Image directory relative to the HTML file
    pub images_dir: String,
    /// Slice size of the BrainSprite sheets
    pub tile: u32,
    pub t1: TxImages,
    pub t2: TxImages,
    pub anat: AnatImages,
    pub params: Vec<AcquisitionParams>,
    pub tasks: Vec<SeriesTable>,
}

impl Report {
    /// Gather everything the page shows from the session's image directory.
    pub fn collect(
        config: &Config,
        layout: &SessionLayout,
        tasks: &[Task],
        params: Vec<AcquisitionParams>,
    ) -> Result<Self> {
        let images = &layout.images_path;
        let href = layout.images_href();

        let t1 = tx_images("T1", images, &href)?;
        let t2 = tx_images("T2", images, &href)?;
        let anat = anat_images(images, &href)?;

        let mut tables = Vec::new();
        for (name, runs) in group_runs(tasks) {
            let lists = category_lists(images, &name, &href)?;
            let matcher = SeriesMatcher::new(&name)?;
            let table = matcher.align_expecting(&lists, config.gap_policy, &runs);
            info!(
                "task {}: {} row(s), {} placeholder(s)",
                name,
                table.len(),
                table.placeholder_count()
            );
            tables.push(table);
        }

        Ok(Self {
            subject: config.subject_label(),
            session: config.session_label(),
            generated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            images_dir: href,
            tile: config.tile,
            t1,
            t2,
            anat,
            params,
            tasks: tables,
        })
    }

    /// Page header, e.g. `sub-01: ses-A`.
    pub fn title(&self) -> String {
        match &self.session {
            Some(ses) => format!("{}: {}", self.subject, ses),
            None => self.subject.clone(),
        }
    }

    /// `executive_summary_<sub>[_<ses>].html`
    pub fn file_name(&self) -> String {
        match &self.session {
            Some(ses) => format!("executive_summary_{}_{}.html", self.subject, ses),
            None => format!("executive_summary_{}.html", self.subject),
        }
    }
}

/// Counts shown at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub tasks: usize,
    pub rows: usize,
    pub placeholders: usize,
    pub params: usize,
}

impl Summary {
    pub fn from_report(report: &Report) -> Self {
        Self {
            tasks: report.tasks.len(),
            rows: report.tasks.iter().map(|t| t.len()).sum(),
            placeholders: report.tasks.iter().map(|t| t.placeholder_count()).sum(),
            params: report.params.len(),
        }
    }
}

fn href_for(href: &str, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}/{}", href.trim_end_matches('/'), name)
}

fn tx_images(tx: &str, images: &Path, href: &str) -> Result<TxImages> {
    let mosaic_path = images.join(format!("{tx}_mosaic.jpg"));
    let mosaic = mosaic_path.is_file().then(|| href_for(href, &mosaic_path));

    let pngs: Vec<String> = find_files(images, &format!("*_{tx}-*.png"))?
        .iter()
        .map(|p| href_for(href, p))
        .collect();
    if pngs.len() != EXPECTED_TX_PNGS {
        warn!("expected {} {} pngs but found {}", EXPECTED_TX_PNGS, tx, pngs.len());
    }

    Ok(TxImages {
        tx: tx.to_string(),
        mosaic,
        pngs,
    })
}

fn anat_images(images: &Path, href: &str) -> Result<AnatImages> {
    let one = |pattern: &str| -> Result<Cell> {
        Ok(match find_one_file(images, pattern)? {
            Some(path) => Cell::Image(href_for(href, &path)),
            None => {
                warn!("no image matching {} in {}", pattern, images.display());
                Cell::Placeholder(Placeholder::Square)
            }
        })
    };

    Ok(AnatImages {
        pre_reg_gray: one("DVARS_and_FD_CONCA*.png")?,
        post_reg_gray: one("DVARS_and_FD_CONCP*.png")?,
        atlas_in_t1: one("*atlas_in_t1*.gif")?,
        t1_in_atlas: one("*t1_in_atlas*.gif")?,
    })
}

/// Candidate file name globs per category. The series patterns make the
/// final decision; these only narrow the directory listing.
fn category_globs(category: Category, task: &str) -> Vec<String> {
    let t = glob::Pattern::escape(task);
    match category {
        Category::PreRegGray => vec![format!("DVARS_and_FD*{t}*.png")],
        Category::PostRegGray => vec![format!("postreg_DVARS_and_FD*{t}*.png")],
        Category::TaskInT1 => vec![format!("*{t}*_in_t1*.gif")],
        Category::T1InTask => vec![format!("*t1_in_*{t}*.gif")],
        Category::Reference => vec![format!("*{t}*ref.png"), format!("SBRef_*{t}*.png")],
        Category::Bold => vec![format!("*{t}*_bold.png"), format!("{t}*.png")],
    }
}

/// The six category lists of `task`, as paths relative to the HTML.
pub fn category_lists(images: &Path, task: &str, href: &str) -> Result<[Vec<String>; 6]> {
    let mut lists: [Vec<String>; 6] = Default::default();
    for category in Category::ALL {
        let list = &mut lists[category.index()];
        for pattern in category_globs(category, task) {
            for path in find_files(images, &pattern)? {
                list.push(href_for(href, &path));
            }
        }
        natural_sort(list);
        list.dedup();
    }
    Ok(lists)
}

/// Task names in order, each with the run numbers found for it.
fn group_runs(tasks: &[Task]) -> Vec<(String, Vec<u32>)> {
    let mut groups: Vec<(String, Vec<u32>)> = Vec::new();
    for task in tasks {
        let run = task.run_number();
        match groups.iter_mut().find(|(name, _)| *name == task.name) {
            Some((_, runs)) => runs.extend(run),
            None => groups.push((task.name.clone(), run.into_iter().collect())),
        }
    }
    groups
}

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, report: &Report) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, report).map_err(|e| Error::io(path, e)),
        "json" => json::write(&mut file, report),
        _ => csv::write(&mut file, &report.params).map_err(|e| Error::io(path, e)),
    }
}

/// Write the HTML page into the report directory.
pub fn write_report(layout: &SessionLayout, report: &Report) -> Result<PathBuf> {
    let path = layout.html_path.join(report.file_name());
    generate(&path, report)?;
    info!("executive summary written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::GapPolicy;
    use std::fs;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    fn task(name: &str, run: &str) -> Task {
        Task {
            name: name.into(),
            run: run.into(),
        }
    }

    // ==========================================================================
    // COLLECTION TESTS
    // ==========================================================================
    //
    // A session directory with a typical set of preprocessed images is laid
    // out in a temp dir and collected into a Report.
    // ==========================================================================

    fn session() -> (tempfile::TempDir, SessionLayout) {
        let dir = tempdir().unwrap();
        let layout = SessionLayout::prepare(dir.path(), None, false).unwrap();
        let img = &layout.images_path;
        for name in [
            "DVARS_and_FD_CONCA.png",
            "sub-01_atlas_in_t1.gif",
            "DVARS_and_FD_task-rest_run-01.png",
            "postreg_DVARS_and_FD_task-rest_run-01.png",
            "sub-01_task-rest_run-02_in_t1.gif",
            "sub-01_t1_in_task-rest_run-02.gif",
            "sub-01_task-rest_run-02_ref.png",
            "sub-01_task-rest_run-01_bold.png",
            "sub-01_task-nback_run-01_bold.png",
            "sub-01_T1-x-55.png",
            "T1_mosaic.jpg",
        ] {
            touch(img, name);
        }
        (dir, layout)
    }

    #[test]
    fn test_collect_aligns_tasks() {
        let (_dir, layout) = session();
        let config = crate::config::Config::new(&layout.files_path, "01");
        let tasks = vec![task("nback", "01"), task("rest", "01"), task("rest", "02")];

        let report = Report::collect(&config, &layout, &tasks, vec![]).unwrap();
        assert_eq!(report.tasks.len(), 2);

        let rest = &report.tasks[1];
        assert_eq!(rest.task, "rest");
        assert_eq!(rest.series(), vec![1, 2]);
        assert_eq!(
            rest.rows[0].cell(Category::PreRegGray),
            &Cell::Image("./img/DVARS_and_FD_task-rest_run-01.png".into())
        );
        assert!(rest.rows[0].cell(Category::Reference).is_placeholder());
        assert!(rest.rows[1].cell(Category::PreRegGray).is_placeholder());
        assert_eq!(
            rest.rows[1].cell(Category::T1InTask),
            &Cell::Image("./img/sub-01_t1_in_task-rest_run-02.gif".into())
        );
    }

    #[test]
    fn test_collect_anat_and_tx() {
        let (_dir, layout) = session();
        let config = crate::config::Config::new(&layout.files_path, "01");
        let report = Report::collect(&config, &layout, &[], vec![]).unwrap();

        assert_eq!(report.anat.pre_reg_gray, Cell::Image("./img/DVARS_and_FD_CONCA.png".into()));
        assert_eq!(report.anat.post_reg_gray, Cell::Placeholder(Placeholder::Square));
        assert_eq!(report.anat.atlas_in_t1, Cell::Image("./img/sub-01_atlas_in_t1.gif".into()));
        assert_eq!(report.t1.mosaic.as_deref(), Some("./img/T1_mosaic.jpg"));
        assert_eq!(report.t1.pngs, vec!["./img/sub-01_T1-x-55.png".to_string()]);
        assert_eq!(report.t2.mosaic, None);
    }

    #[test]
    fn test_discovered_run_without_images_gets_a_row() {
        let (_dir, layout) = session();
        let config = crate::config::Config::new(&layout.files_path, "01")
            .with_gap_policy(GapPolicy::Observed);
        let tasks = vec![task("rest", "03")];
        let report = Report::collect(&config, &layout, &tasks, vec![]).unwrap();
        assert_eq!(report.tasks[0].series(), vec![1, 2, 3]);
    }

    #[test]
    fn test_category_lists_legacy_names() {
        let dir = tempdir().unwrap();
        for name in ["SBRef_REST1.png", "REST1.png", "REST1_x-65.png", "REST2.png"] {
            touch(dir.path(), name);
        }
        let lists = category_lists(dir.path(), "REST", "./img").unwrap();
        assert_eq!(lists[Category::Reference.index()], vec!["./img/SBRef_REST1.png".to_string()]);
        // The slice plane is listed here and rejected by the series pattern.
        assert!(lists[Category::Bold.index()].contains(&"./img/REST2.png".to_string()));
    }

    #[test]
    fn test_category_lists_ignore_label_case() {
        let dir = tempdir().unwrap();
        for name in ["DVARS_and_FD_task-rest_run-01.png", "sub-01_task-rest_run-01_bold.png"] {
            touch(dir.path(), name);
        }
        let lists = category_lists(dir.path(), "REST", "./img").unwrap();
        let table = SeriesMatcher::new("REST").unwrap().align(&lists, GapPolicy::Observed);
        assert_eq!(table.series(), vec![1]);
        assert_eq!(
            table.rows[0].cell(Category::Bold),
            &Cell::Image("./img/sub-01_task-rest_run-01_bold.png".into())
        );
    }

    #[test]
    fn test_group_runs() {
        let groups = group_runs(&[task("nback", "01"), task("rest", "01"), task("rest", "02")]);
        assert_eq!(
            groups,
            vec![("nback".to_string(), vec![1]), ("rest".to_string(), vec![1, 2])]
        );
    }

    // ==========================================================================
    // NAMING TESTS
    // ==========================================================================

    #[test]
    fn test_title_and_file_name() {
        let (_dir, layout) = session();
        let config = crate::config::Config::new(&layout.files_path, "01");
        let mut report = Report::collect(&config, &layout, &[], vec![]).unwrap();
        assert_eq!(report.title(), "sub-01");
        assert_eq!(report.file_name(), "executive_summary_sub-01.html");

        report.session = Some("ses-A".into());
        assert_eq!(report.title(), "sub-01: ses-A");
        assert_eq!(report.file_name(), "executive_summary_sub-01_ses-A.html");
    }

    #[test]
    fn test_write_report_creates_html() {
        let (_dir, layout) = session();
        let config = crate::config::Config::new(&layout.files_path, "01");
        let report = Report::collect(&config, &layout, &[task("rest", "01")], vec![]).unwrap();
        let path = write_report(&layout, &report).unwrap();
        assert_eq!(path, layout.html_path.join("executive_summary_sub-01.html"));
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("task-rest run-01"));
    }

    #[test]
    fn test_summary_counts() {
        let (_dir, layout) = session();
        let config = crate::config::Config::new(&layout.files_path, "01");
        let tasks = vec![task("rest", "01"), task("rest", "02")];
        let report = Report::collect(&config, &layout, &tasks, vec![]).unwrap();
        let summary = Summary::from_report(&report);
        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.rows, 2);
        // run 1: ref + both registrations missing; run 2: both gray plots + bold missing
        assert_eq!(summary.placeholders, 6);
    }
}
