use crate::tools::params::{AcquisitionParams, HEADER};
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, params: &[AcquisitionParams]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER.join(","))?;

    for p in params {
        let record: Vec<String> = p.record().iter().map(|v| escape_csv(v)).collect();
        writeln!(writer, "{}", record.join(","))?;
    }

    Ok(())
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
