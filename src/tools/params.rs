//! Acquisition parameters from `fslval` and `mri_info`

use super::run;
use crate::config::ToolPaths;
use crate::subject::SubjectInfo;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

pub const NOT_FOUND: &str = "Not found";

/// Column names of the parameter table
pub const HEADER: [&str; 8] = ["Modality", "x", "y", "z", "TE", "TR", "frames", "TI"];

/// One row of the parameter table. Values are already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionParams {
    pub file: PathBuf,
    pub modality: String,
    pub x: String,
    pub y: String,
    pub z: String,
    pub te: String,
    pub tr: String,
    pub frames: String,
    pub ti: String,
}

impl AcquisitionParams {
    pub fn record(&self) -> [&str; 8] {
        [
            self.modality.as_str(),
            self.x.as_str(),
            self.y.as_str(),
            self.z.as_str(),
            self.te.as_str(),
            self.tr.as_str(),
            self.frames.as_str(),
            self.ti.as_str(),
        ]
    }
}

/// TE, TR and TI as printed by `mri_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timing {
    pub te: Option<String>,
    pub tr: Option<String>,
    pub ti: Option<String>,
}

/// Two decimals, or `Not found` for anything that is not a number.
pub fn format_value(raw: Option<&str>) -> String {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

/// Pull TE, TR and TI out of `mri_info` output, where they appear as
/// `TR: 2400.00 msec  TE: 2.14 msec  TI: 1000.00 msec`.
pub fn parse_mri_info(text: &str) -> Timing {
    let re = match Regex::new(r"\bT([REI]):\s*(\S+)") {
        Ok(re) => re,
        Err(e) => unreachable!("timing pattern: {e}"),
    };

    let mut timing = Timing::default();
    for caps in re.captures_iter(text) {
        let slot = match &caps[1] {
            "E" => &mut timing.te,
            "R" => &mut timing.tr,
            _ => &mut timing.ti,
        };
        if slot.is_none() {
            *slot = Some(caps[2].to_string());
        }
    }
    timing
}

fn fslval(tools: &ToolPaths, path: &Path, key: &str) -> Option<String> {
    match run(Command::new(&tools.fslval).arg(path).arg(key)) {
        Ok(out) => Some(out),
        Err(e) => {
            warn!("{} {} on {}: {}", tools.fslval, key, path.display(), e);
            None
        }
    }
}

/// Collect the parameters of one NIfTI file. Tool failures leave the
/// affected values as `Not found`.
pub fn nifti_params(tools: &ToolPaths, path: &Path, subject: Option<&SubjectInfo>) -> AcquisitionParams {
    info!("getting parameters of {}", path.display());

    let modality = subject
        .cloned()
        .or_else(|| SubjectInfo::from_path(path))
        .map(|s| s.modality_or_unknown().to_string())
        .unwrap_or_else(|| "UnknownModality".to_string());

    let timing = match run(Command::new(&tools.mri_info).arg(path)) {
        Ok(out) => parse_mri_info(&out),
        Err(e) => {
            warn!("{} on {}: {}", tools.mri_info, path.display(), e);
            Timing::default()
        }
    };

    let value = |key: &str| format_value(fslval(tools, path, key).as_deref());

    AcquisitionParams {
        file: path.to_path_buf(),
        modality,
        x: value("pixdim1"),
        y: value("pixdim2"),
        z: value("pixdim3"),
        te: format_value(timing.te.as_deref()),
        tr: format_value(timing.tr.as_deref()),
        frames: value("dim4"),
        ti: format_value(timing.ti.as_deref()),
    }
}

/// Parameters of every file, extracted in parallel; order follows `files`.
pub fn collect_params<F>(tools: &ToolPaths, files: &[PathBuf], on_done: F) -> Vec<AcquisitionParams>
where
    F: Fn(&AcquisitionParams) + Sync,
{
    files
        .par_iter()
        .map(|path| {
            let params = nifti_params(tools, path, None);
            on_done(&params);
            params
        })
        .collect()
}
