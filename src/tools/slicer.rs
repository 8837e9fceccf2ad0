//! Slice images with FSL `slicer`

use super::run;
use crate::config::ToolPaths;
use crate::error::Result;
use crate::subject::{Modality, SliceSet, SubjectInfo};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::warn;

/// Mid-volume sagittal, coronal and axial slices side by side
/// (`slicer <in> -u -a <dst>`).
pub fn ortho_row(tools: &ToolPaths, input: &Path, dst: &Path) -> Result<PathBuf> {
    run(Command::new(&tools.slicer).arg(input).args(["-u", "-a"]).arg(dst))?;
    Ok(dst.to_path_buf())
}

/// One slice at `position` along `plane` (`x`, `y` or `z`).
pub fn plane(tools: &ToolPaths, input: &Path, plane: char, position: u32, dst: &Path) -> Result<PathBuf> {
    run(Command::new(&tools.slicer)
        .arg(input)
        .arg("-u")
        .arg(format!("-{plane}"))
        .arg(format!("-{position}"))
        .arg(dst))?;
    Ok(dst.to_path_buf())
}

/// Write `<modality>.png` and, with `with_planes`, the three single-plane
/// images `<modality>_<plane>-<position>.png` into `dest_dir`.
pub fn slice_nifti(
    tools: &ToolPaths,
    input: &Path,
    dest_dir: &Path,
    with_planes: bool,
) -> Result<Vec<PathBuf>> {
    let info = SubjectInfo::from_path(input);
    let name = info
        .as_ref()
        .map(|i| i.modality_or_unknown().to_string())
        .unwrap_or_else(|| "UnknownModality".to_string());

    let mut written = vec![ortho_row(tools, input, &dest_dir.join(format!("{name}.png")))?];

    if with_planes {
        let slices = SliceSet::for_modality(info.map(|i| i.kind()).unwrap_or(Modality::Other));
        for (p, pos) in slices.planes() {
            let dst = dest_dir.join(format!("{name}_{p}-{pos}.png"));
            match plane(tools, input, p, pos, &dst) {
                Ok(path) => written.push(path),
                Err(e) => warn!("slicing {} along {}: {}", input.display(), p, e),
            }
        }
    }
    Ok(written)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// `echo` stands in for slicer so the argument list can be checked.
    fn echo_tools() -> ToolPaths {
        ToolPaths {
            slicer: "echo".into(),
            ..ToolPaths::default()
        }
    }

    #[test]
    fn test_plane_arguments() {
        let dst = plane(&echo_tools(), Path::new("in.nii.gz"), 'x', 65, Path::new("out.png")).unwrap();
        assert_eq!(dst, PathBuf::from("out.png"));
    }

    #[test]
    fn test_slice_nifti_names() {
        let dir = tempdir().unwrap();
        let written = slice_nifti(&echo_tools(), Path::new("/raw/SUBJ_REST1.nii.gz"), dir.path(), true).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["REST1.png", "REST1_x-65.png", "REST1_y-55.png", "REST1_z-45.png"]);
    }

    #[test]
    fn test_missing_slicer_fails() {
        let tools = ToolPaths {
            slicer: "no-such-slicer-xyz".into(),
            ..ToolPaths::default()
        };
        assert!(ortho_row(&tools, Path::new("a.nii"), Path::new("a.png")).is_err());
    }
}
