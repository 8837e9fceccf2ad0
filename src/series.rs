//! Series alignment for the tasks table
//!
//! Every task row in the report shows six images for one run (series) of a
//! task. The images come from different pipeline steps and any of them may
//! be missing, so the per-category file lists have to be lined up by the
//! series number embedded in their file names before they can be rendered.
//!
//! # How Alignment Works
//!
//! 1. Each [`Category`] has a pattern, built from the task label, that
//!    locates the series number inside a file name.
//! 2. The union of the series numbers seen in any category decides which
//!    rows exist ([`GapPolicy`] controls whether gaps between them are
//!    fabricated).
//! 3. Every row gets, per category, either the matching file or the
//!    category's placeholder image.
//!
//! ```text
//! category        | REST1              | REST2
//! ----------------|--------------------|-------------------------
//! pre-reg gray    | DVARS_..._REST1    | square placeholder
//! reference       | rect. placeholder  | ..._REST2_sbref.png
//! ```
//!
//! Placeholders carry no series number, so aligning an already aligned set
//! of columns gives back the same table.

use crate::error::Result;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

/// Placeholder for the four plot/registration columns
pub const SQUARE_PLACEHOLDER: &str = "square_placeholder_text.png";
/// Placeholder for the reference and BOLD columns
pub const RECTANGLE_PLACEHOLDER: &str = "rectangular_placeholder_text.png";
/// Widest series range `GapPolicy::Contiguous` will fill
pub const MAX_CONTIGUOUS_SPAN: u32 = 1000;

/// The six image columns of a task row, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// DVARS/FD gray plot before regression
    PreRegGray,
    /// DVARS/FD gray plot after regression
    PostRegGray,
    /// Task registered into T1 space
    TaskInT1,
    /// T1 registered into task space
    T1InTask,
    /// SBRef / reference image
    Reference,
    /// BOLD image
    Bold,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::PreRegGray,
        Category::PostRegGray,
        Category::TaskInT1,
        Category::T1InTask,
        Category::Reference,
        Category::Bold,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn placeholder(self) -> Placeholder {
        match self {
            Category::Reference | Category::Bold => Placeholder::Rectangle,
            _ => Placeholder::Square,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::PreRegGray => "Pre-Reg Gray Plot",
            Category::PostRegGray => "Post-Reg Gray Plot",
            Category::TaskInT1 => "Task in T1",
            Category::T1InTask => "T1 in Task",
            Category::Reference => "Reference",
            Category::Bold => "BOLD",
        }
    }

    /// Pattern locating the series number for `task`. `run` starts with the
    /// separator in front of the task label, so the prefixes below stop
    /// right before it.
    fn pattern(self, run: &str) -> String {
        match self {
            Category::PreRegGray => format!(r"^DVARS_and_FD.*?{run}"),
            Category::PostRegGray => format!(r"^postreg_DVARS_and_FD.*?{run}"),
            Category::TaskInT1 => format!(r"{run}[^/]*_in_t1[^/]*\.gif$"),
            Category::T1InTask => format!(r"(?:^|_)t1_in.*?{run}[^/]*\.gif$"),
            Category::Reference => format!(r"{run}[^/]*ref\.png$|^SBRef.*?{run}"),
            Category::Bold => format!(r"{run}[^/]*_bold\.png$|^{run}\.png$"),
        }
    }

    /// Pattern for an image that names the task but no run. Only the
    /// reference and BOLD images are shared across runs this way.
    fn shared_pattern(self, task: &str) -> Option<String> {
        let label = format!(r"(?:^|[^a-z0-9]){task}(?:[^a-z0-9][^/]*)?");
        match self {
            Category::Reference => Some(format!(r"{label}ref\.png$")),
            Category::Bold => Some(format!(r"{label}_bold\.png$")),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    Square,
    Rectangle,
}

impl Placeholder {
    pub fn file_name(self) -> &'static str {
        match self {
            Placeholder::Square => SQUARE_PLACEHOLDER,
            Placeholder::Rectangle => RECTANGLE_PLACEHOLDER,
        }
    }
}

/// One image slot of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Cell {
    Image(String),
    Placeholder(Placeholder),
}

impl Cell {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Cell::Placeholder(_))
    }

    /// Path to put in the HTML; placeholders live in `img_dir`.
    pub fn resolve(&self, img_dir: &str) -> String {
        match self {
            Cell::Image(path) => path.clone(),
            Cell::Placeholder(kind) => {
                format!("{}/{}", img_dir.trim_end_matches('/'), kind.file_name())
            }
        }
    }
}

/// Which rows the table gets when series numbers have gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum GapPolicy {
    /// One row per series number seen in any category
    #[default]
    Observed,
    /// One row per number from the lowest to the highest seen, even when a
    /// number was never seen in any category
    Contiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRow {
    pub series: u32,
    pub cells: [Cell; 6],
}

impl SeriesRow {
    pub fn cell(&self, category: Category) -> &Cell {
        &self.cells[category.index()]
    }
}

/// Rows for one task, sorted by series number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesTable {
    pub task: String,
    pub rows: Vec<SeriesRow>,
}

impl SeriesTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn series(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.series).collect()
    }

    /// The table as six equally long path lists, one per category.
    pub fn columns(&self, img_dir: &str) -> [Vec<String>; 6] {
        let mut columns: [Vec<String>; 6] = Default::default();
        for row in &self.rows {
            for (column, cell) in columns.iter_mut().zip(row.cells.iter()) {
                column.push(cell.resolve(img_dir));
            }
        }
        columns
    }

    pub fn placeholder_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .filter(|c| c.is_placeholder())
            .count()
    }
}

/// Compiled category patterns for one task label.
#[derive(Debug, Clone)]
pub struct SeriesMatcher {
    task: String,
    patterns: [Regex; 6],
    shared: [Option<Regex>; 6],
}

impl SeriesMatcher {
    pub fn new(task: &str) -> Result<Self> {
        let escaped = regex::escape(task);
        // The label stands alone on the left ("MID" inside a subject ID like
        // "NDARINVXMID12" does not count). On the right come either digits
        // ("REST1") or BIDS entities up to the run ("rest_acq-mb3_run-01").
        let run = format!(
            r"(?:^|[^a-z0-9]){escaped}(?:(\d+)|[_-](?:[a-z]+-[a-z0-9]+_)*(?:run-?)?(\d+))"
        );

        let mut patterns = Vec::with_capacity(6);
        let mut shared = Vec::with_capacity(6);
        for category in Category::ALL {
            patterns.push(compile(&category.pattern(&run))?);
            shared.push(match category.shared_pattern(&escaped) {
                Some(p) => Some(compile(&p)?),
                None => None,
            });
        }

        Ok(Self {
            task: task.to_string(),
            patterns: to_array(patterns),
            shared: to_array(shared),
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn regex(&self, category: Category) -> &Regex {
        &self.patterns[category.index()]
    }

    /// Series number in the file name of `path`, if it belongs to `category`.
    pub fn series_number(&self, category: Category, path: &str) -> Option<u32> {
        extract_number(self.regex(category), file_name(path))
    }

    fn is_shared(&self, category: Category, path: &str) -> bool {
        self.shared[category.index()]
            .as_ref()
            .map(|re| re.is_match(file_name(path)))
            .unwrap_or(false)
    }

    /// Line up the six category lists by series number.
    pub fn align(&self, lists: &[Vec<String>; 6], policy: GapPolicy) -> SeriesTable {
        self.align_expecting(lists, policy, &[])
    }

    /// Like [`align`](Self::align), but `expected` series (runs found on
    /// disk) get a row even when none of their images exist.
    pub fn align_expecting(
        &self,
        lists: &[Vec<String>; 6],
        policy: GapPolicy,
        expected: &[u32],
    ) -> SeriesTable {
        let mut by_series: [BTreeMap<u32, String>; 6] = Default::default();
        let mut shared: [Option<String>; 6] = Default::default();

        for category in Category::ALL {
            let idx = category.index();
            let mut paths = lists[idx].clone();
            natural_sort(&mut paths);

            for path in paths {
                match self.series_number(category, &path) {
                    Some(series) => {
                        if let Some(kept) = by_series[idx].get(&series) {
                            warn!(
                                "duplicate {} image for {} series {}: keeping {}, ignoring {}",
                                category, self.task, series, kept, path
                            );
                        } else {
                            by_series[idx].insert(series, path);
                        }
                    }
                    None if shared[idx].is_none() && self.is_shared(category, &path) => {
                        debug!("{} image {} is shared by every {} run", category, path, self.task);
                        shared[idx] = Some(path);
                    }
                    None => debug!("no {} series number in {}", category, path),
                }
            }
        }

        let observed: BTreeSet<u32> = by_series
            .iter()
            .flat_map(|m| m.keys().copied())
            .chain(expected.iter().copied())
            .collect();
        let bounds = observed.first().copied().zip(observed.last().copied());
        let series: Vec<u32> = match (policy, bounds) {
            (GapPolicy::Contiguous, Some((lo, hi))) if hi - lo < MAX_CONTIGUOUS_SPAN => {
                (lo..=hi).collect()
            }
            (GapPolicy::Contiguous, Some((lo, hi))) => {
                warn!(
                    "{} series {}..={} span more than {} rows, showing observed series only",
                    self.task, lo, hi, MAX_CONTIGUOUS_SPAN
                );
                observed.into_iter().collect()
            }
            _ => observed.into_iter().collect(),
        };

        let rows = series
            .into_iter()
            .map(|series| {
                let cells = Category::ALL.map(|category| {
                    let idx = category.index();
                    if let Some(path) = by_series[idx].get(&series) {
                        Cell::Image(path.clone())
                    } else if let Some(path) = &shared[idx] {
                        Cell::Image(path.clone())
                    } else {
                        warn!(
                            "{} image expected for {} series {} and not found in summary folder",
                            category, self.task, series
                        );
                        Cell::Placeholder(category.placeholder())
                    }
                });
                SeriesRow { series, cells }
            })
            .collect();

        SeriesTable {
            task: self.task.clone(),
            rows,
        }
    }
}

/// Align the category lists of `task` with freshly built patterns.
pub fn align(task: &str, lists: &[Vec<String>; 6], policy: GapPolicy) -> Result<SeriesTable> {
    Ok(SeriesMatcher::new(task)?.align(lists, policy))
}

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn to_array<T>(items: Vec<T>) -> [T; 6] {
    match items.try_into() {
        Ok(array) => array,
        Err(_) => unreachable!("one entry per category"),
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// The first all-digit capture group, or else the first digit run of the
/// whole match (patterns like `(REST|MID)\d+` capture the label only).
fn extract_number(regex: &Regex, name: &str) -> Option<u32> {
    let caps = regex.captures(name)?;
    let digits = caps
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .find(|g| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit()));
    match digits {
        Some(d) => d.parse().ok(),
        None => first_digits(caps.get(0)?.as_str()).and_then(|d| d.parse().ok()),
    }
}

/// Series numbers of every path whose file name matches `regex`, ascending.
///
/// The number is taken from the first capture group made only of digits, or
/// from the first digit run of the match when there is none.
pub fn find_series_numbers<S: AsRef<str>>(paths: &[S], regex: &Regex) -> Vec<u32> {
    let mut numbers: Vec<u32> = paths
        .iter()
        .filter_map(|p| extract_number(regex, file_name(p.as_ref())))
        .collect();
    numbers.sort_unstable();
    numbers
}

fn first_digits(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

// ============================================================================
// Natural sort
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Text(String),
    Number(&'a str),
}

/// Text and digit runs, always starting with a (possibly empty) text run so
/// that chunks at the same position have the same kind.
fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut rest = s;
    loop {
        let text_end = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        out.push(Chunk::Text(rest[..text_end].to_lowercase()));
        rest = &rest[text_end..];
        if rest.is_empty() {
            break;
        }
        let num_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        out.push(Chunk::Number(&rest[..num_end]));
        rest = &rest[num_end..];
        if rest.is_empty() {
            break;
        }
    }
    out
}

fn cmp_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Compare so that `item2` sorts before `item10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x, y) {
            (Chunk::Number(x), Chunk::Number(y)) => cmp_numbers(x, y),
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

pub fn natural_sort<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
