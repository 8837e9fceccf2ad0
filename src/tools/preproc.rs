//! The image preprocessing wrapper script
//!
//! `executivesummary_preproc.sh` slices the anatomical and functional
//! volumes and writes the registration GIFs into the summary directory.

use super::run as run_tool;
use crate::config::Config;
use crate::discover::SessionLayout;
use crate::error::Result;
use std::path::Path;
use std::process::Command;
use tracing::info;

/// Build the wrapper invocation for one subject/session.
pub fn command(config: &Config, layout: &SessionLayout, func_path: Option<&Path>) -> Command {
    let mut cmd = Command::new(&config.tools.preproc);
    cmd.arg("--output-dir")
        .arg(&layout.files_path)
        .arg("--html-path")
        .arg(&layout.html_path)
        .arg("--subject-id")
        .arg(config.subject_label());
    if let Some(ses) = config.session_label() {
        cmd.arg("--session-id").arg(ses);
    }
    if let Some(func) = func_path {
        cmd.arg("--bids-input").arg(func);
    }
    if let Some(atlas) = &config.atlas {
        cmd.arg("--atlas").arg(atlas);
    }
    cmd
}

/// Run the wrapper. Its output is logged; failure is left to the caller.
pub fn run(config: &Config, layout: &SessionLayout, func_path: Option<&Path>) -> Result<()> {
    let mut cmd = command(config, layout, func_path);
    info!("running preprocessing: {:?}", cmd);
    let out = run_tool(&mut cmd)?;
    for line in out.lines() {
        info!("preproc: {}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn layout() -> SessionLayout {
        SessionLayout {
            files_path: PathBuf::from("/out/files"),
            summary_path: PathBuf::from("/out/files"),
            html_path: PathBuf::from("/out/files/executivesummary"),
            images_path: PathBuf::from("/out/files/executivesummary/img"),
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect()
    }

    #[test]
    fn test_minimal_command() {
        let config = Config::new("/out/files", "01");
        let cmd = command(&config, &layout(), None);
        assert_eq!(cmd.get_program(), "executivesummary_preproc.sh");
        assert_eq!(
            args(&cmd),
            vec![
                "--output-dir",
                "/out/files",
                "--html-path",
                "/out/files/executivesummary",
                "--subject-id",
                "sub-01",
            ]
        );
    }

    #[test]
    fn test_optional_arguments() {
        let config = Config::new("/out/files", "01")
            .with_session(Some("A".into()))
            .with_atlas(Some(PathBuf::from("/atlas/MNI.nii.gz")));
        let cmd = command(&config, &layout(), Some(Path::new("/bids/sub-01/func")));
        let a = args(&cmd);
        assert_eq!(
            &a[6..],
            &[
                "--session-id",
                "ses-A",
                "--bids-input",
                "/bids/sub-01/func",
                "--atlas",
                "/atlas/MNI.nii.gz",
            ]
        );
    }
}
