//! CSV export of the diagnosis history.
//!
//! `timestamp` is RFC 3339 UTC with second precision. Rows written by older
//! releases stored a naive local time; the store reads those as UTC, so they
//! export with their original wall-clock digits and a `Z` suffix the source
//! data never carried.

use std::io;

use chrono::SecondsFormat;

use crate::{Result, record::DiagnosisRecord};

/// Column order of every export. Existing consumers depend on it.
pub const HEADER: [&str; 6] =
  ["id", "machine", "problem", "diagnosis", "urgency", "timestamp"];

/// Suggested download name.
pub const FILE_NAME: &str = "diagnosticos.csv";

/// Write `records` to `out`, one row each, in the order given.
pub fn write_csv<W: io::Write>(records: &[DiagnosisRecord], out: W) -> Result<()> {
  let mut writer = csv::Writer::from_writer(out);
  writer.write_record(HEADER)?;
  for r in records {
    writer.write_record([
      r.id.to_string().as_str(),
      r.machine.as_str(),
      r.problem.as_str(),
      r.diagnosis.as_str(),
      r.urgency.label(),
      r.created_at.to_rfc3339_opts(SecondsFormat::Secs, true).as_str(),
    ])?;
  }
  writer.flush()?;
  Ok(())
}

pub fn to_csv_string(records: &[DiagnosisRecord]) -> Result<String> {
  let mut buf = Vec::new();
  write_csv(records, &mut buf)?;
  String::from_utf8(buf)
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}
