//! Run configuration
//!
//! Built once from the command line and passed down the pipeline.

use crate::series::GapPolicy;
use std::path::PathBuf;

/// Default edge length of one mosaic tile, in pixels.
pub const DEFAULT_TILE: u32 = 218;

/// Names (or paths) of the external programs the pipeline calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub fslval: String,
    pub mri_info: String,
    pub slicer: String,
    pub preproc: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            fslval: "fslval".to_string(),
            mri_info: "mri_info".to_string(),
            slicer: "slicer".to_string(),
            preproc: "executivesummary_preproc.sh".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The pipeline's `files` directory
    pub files_path: PathBuf,
    pub subject: String,
    pub session: Option<String>,
    /// Subdirectory of `files_path` holding the summary images
    pub summary_dir: Option<PathBuf>,
    pub bids_input: Option<PathBuf>,
    pub atlas: Option<PathBuf>,
    /// Only rebuild the HTML from existing images
    pub layout_only: bool,
    pub collect_params: bool,
    pub write_csv: bool,
    pub write_json: bool,
    pub gap_policy: GapPolicy,
    pub tile: u32,
    pub tools: ToolPaths,
}

impl Config {
    pub fn new(files_path: impl Into<PathBuf>, subject: impl Into<String>) -> Self {
        Self {
            files_path: files_path.into(),
            subject: subject.into(),
            session: None,
            summary_dir: None,
            bids_input: None,
            atlas: None,
            layout_only: false,
            collect_params: false,
            write_csv: false,
            write_json: false,
            gap_policy: GapPolicy::default(),
            tile: DEFAULT_TILE,
            tools: ToolPaths::default(),
        }
    }

    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session;
        self
    }

    pub fn with_summary_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.summary_dir = dir;
        self
    }

    pub fn with_bids_input(mut self, dir: Option<PathBuf>) -> Self {
        self.bids_input = dir;
        self
    }

    pub fn with_atlas(mut self, atlas: Option<PathBuf>) -> Self {
        self.atlas = atlas;
        self
    }

    pub fn with_layout_only(mut self, layout_only: bool) -> Self {
        self.layout_only = layout_only;
        self
    }

    pub fn with_params(mut self, collect: bool) -> Self {
        self.collect_params = collect;
        self
    }

    pub fn with_outputs(mut self, csv: bool, json: bool) -> Self {
        self.write_csv = csv;
        self.write_json = json;
        self
    }

    pub fn with_gap_policy(mut self, policy: GapPolicy) -> Self {
        self.gap_policy = policy;
        self
    }

    pub fn with_tile(mut self, tile: u32) -> Self {
        self.tile = tile;
        self
    }

    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    /// `sub-<id>`, whether or not the label was given with its prefix.
    pub fn subject_label(&self) -> String {
        bids_label("sub-", &self.subject)
    }

    pub fn session_label(&self) -> Option<String> {
        self.session.as_deref().map(|s| bids_label("ses-", s))
    }
}

fn bids_label(prefix: &str, id: &str) -> String {
    if id.starts_with(prefix) {
        id.to_string()
    } else {
        format!("{prefix}{id}")
    }
}

/// Treat the literal `NONE` (any case) and empty strings as absent.
pub fn optional_arg(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("none"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("/data/files", "sub01");
        assert_eq!(config.tile, 218);
        assert_eq!(config.gap_policy, GapPolicy::Observed);
        assert_eq!(config.tools.slicer, "slicer");
        assert!(config.session.is_none());
        assert!(!config.layout_only);
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::new("/data/files", "sub01")
            .with_session(Some("ses-A".into()))
            .with_gap_policy(GapPolicy::Contiguous)
            .with_outputs(true, false)
            .with_tile(100);
        assert_eq!(config.session.as_deref(), Some("ses-A"));
        assert_eq!(config.gap_policy, GapPolicy::Contiguous);
        assert!(config.write_csv);
        assert!(!config.write_json);
        assert_eq!(config.tile, 100);
    }

    #[test]
    fn test_labels_keep_existing_prefix() {
        let config = Config::new("/f", "sub-01").with_session(Some("ses-A".into()));
        assert_eq!(config.subject_label(), "sub-01");
        assert_eq!(config.session_label().as_deref(), Some("ses-A"));
    }

    #[test]
    fn test_optional_arg_none_values() {
        assert_eq!(optional_arg(Some("NONE".into())), None);
        assert_eq!(optional_arg(Some("none".into())), None);
        assert_eq!(optional_arg(Some("  ".into())), None);
        assert_eq!(optional_arg(None), None);
        assert_eq!(optional_arg(Some("ses-1".into())), Some("ses-1".into()));
    }
}
