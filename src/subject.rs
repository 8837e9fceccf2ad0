//! Subject, modality and series from legacy NIfTI file names
//!
//! Older pipeline outputs encode everything in underscore separated file
//! names (`SUBJ_T1w_MPR1.nii.gz`, `ABCDPILOT_MSC02_REST1.nii.gz`, ...). The
//! parser below recognises the variants those pipelines produced.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, error};

/// Coarse scan type used to pick slice positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Modality {
    T1,
    T2,
    /// SBRef and resting state EPI data
    Epi,
    Other,
}

impl Modality {
    pub fn classify(modality: &str) -> Self {
        // SBRef first, since those names may also contain REST.
        if modality.contains("SBRef") || modality.contains("REST") {
            Modality::Epi
        } else if modality.contains("T2") {
            Modality::T2
        } else if modality.contains("T1") {
            Modality::T1
        } else {
            Modality::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectInfo {
    pub subject_code: String,
    pub modality: String,
    pub series: String,
}

impl SubjectInfo {
    /// Parse a `.nii` / `.nii.gz` path. Other files yield `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name
            .strip_suffix(".nii.gz")
            .or_else(|| file_name.strip_suffix(".nii"))?;

        let parts: Vec<&str> = stem.split('_').collect();
        debug!("file name has {} parts: {:?}", parts.len(), parts);

        fn info(subject: &str, modality: &str, series: &str) -> SubjectInfo {
            SubjectInfo {
                subject_code: subject.to_string(),
                modality: modality.to_string(),
                series: series.to_string(),
            }
        }

        let parsed = match parts.as_slice() {
            [] | [_] => {
                error!("not enough file name parts to summarize: {}", file_name);
                info("", "", "")
            }
            [subject, _] if parts.contains(&"Scout") => {
                // Series is the last character of the parent directory.
                let series = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.chars().last())
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                info(subject, "SBRef", &series)
            }
            [subject, modality] if modality.contains("SBRef") => info(subject, modality, subject),
            [subject, modality] if modality.starts_with("REST") => info(subject, modality, modality),
            [a, b, modality] if !parts.contains(&"SBRef") && modality.starts_with("REST") => {
                info(&format!("{a}_{b}"), modality, modality)
            }
            [subject, modality, series] if parts.contains(&"T1w") || parts.contains(&"T2w") => {
                info(subject, modality, series)
            }
            [_, subject, series, modality] if parts.contains(&"SBRef") => {
                info(subject, &format!("{modality}_{series}"), series)
            }
            [_, subject, modality, series] => {
                let modality = if *modality == "T1w" || *modality == "T2w" {
                    format!("{modality}{series}")
                } else {
                    modality.to_string()
                };
                info(subject, &modality, series)
            }
            [_, subject, _, modality, series] => info(subject, modality, series),
            _ if parts.len() > 5 => {
                error!("too many parts ({}) in file name: {}", parts.len(), file_name);
                info("", "", "")
            }
            _ => info("", "", ""),
        };
        Some(parsed)
    }

    /// Modality name, `UnknownModality` when the file name did not give one.
    pub fn modality_or_unknown(&self) -> &str {
        if self.modality.is_empty() {
            "UnknownModality"
        } else {
            &self.modality
        }
    }

    pub fn kind(&self) -> Modality {
        Modality::classify(&self.modality)
    }
}

/// Slice positions handed to `slicer` for the single-plane images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceSet {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl SliceSet {
    pub fn for_modality(modality: Modality) -> Self {
        match modality {
            Modality::Epi => SliceSet { x: 65, y: 55, z: 45 },
            // Unknown data gets the anatomical positions.
            Modality::T1 | Modality::T2 | Modality::Other => SliceSet { x: 55, y: 115, z: 145 },
        }
    }

    pub fn planes(&self) -> [(char, u32); 3] {
        [('x', self.x), ('y', self.y), ('z', self.z)]
    }
}
