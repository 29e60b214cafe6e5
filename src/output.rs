use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::models::{DoctorRecord, OutputFormat};

/// Write records to `destination`, or to stdout when there is none.
pub fn write_records(
    records: &[DoctorRecord],
    format: OutputFormat,
    destination: Option<&Path>,
) -> Result<()> {
    match destination {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_to(records, format, &mut out)?;
            out.flush()?;
            info!(path = %path.display(), records = records.len(), %format, "wrote output");
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_to(records, format, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

pub fn write_to<W: Write>(records: &[DoctorRecord], format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, records)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => {
            write_row(&mut out, DoctorRecord::FIELDS.iter().copied())?;
            for record in records {
                let row = record.to_row();
                write_row(&mut out, row.iter().map(String::as_str))?;
            }
        }
    }
    Ok(())
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// One CSV line, quoting only the cells that need it.
fn write_row<'a, W: Write>(mut w: W, cells: impl Iterator<Item = &'a str>) -> io::Result<()> {
    let mut first = true;
    for cell in cells {
        if !first {
            w.write_all(b",")?;
        }
        first = false;
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}
