use super::{Report, Summary};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Manifest<'a> {
    title: String,
    summary: Summary,
    #[serde(flatten)]
    report: &'a Report,
}

/// Write the report as a pretty-printed JSON manifest.
pub fn write<W: Write>(writer: &mut W, report: &Report) -> Result<()> {
    let manifest = Manifest {
        title: report.title(),
        summary: Summary::from_report(report),
        report,
    };
    serde_json::to_writer_pretty(&mut *writer, &manifest)?;
    writeln!(writer).map_err(serde_json::Error::io)?;
    Ok(())
}
