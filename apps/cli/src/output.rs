//! Human and JSON rendering of command results.

use serde::Serialize;
use std::io::{self, Write};

use crate::commands::auth::AuthStatus;
use crate::commands::record::RecordDto;
use crate::commands::resolve::Resolution;
use crate::commands::scan::{ScanOutcome, ScanStatus};
use crate::error::CliResult;

/// Writes either JSON or the human form to stdout.
pub struct Printer {
    json: bool,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Printer { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn record(&self, record: &RecordDto) -> CliResult<()> {
        self.emit(record, |out| write_record(out, record))
    }

    pub fn records(&self, records: &[RecordDto]) -> CliResult<()> {
        self.emit(records, |out| write_table(out, records))
    }

    /// A partial list of a larger store.
    pub fn listing(&self, records: &[RecordDto], total: i64) -> CliResult<()> {
        #[derive(Serialize)]
        struct Listing<'a> {
            total: i64,
            records: &'a [RecordDto],
        }

        self.emit(&Listing { total, records }, |out| {
            write_table(out, records)?;
            writeln!(out, "{} stored in total", total)
        })
    }

    pub fn resolution(&self, resolution: Resolution) -> CliResult<()> {
        #[derive(Serialize)]
        struct ResolutionDto {
            existing: bool,
            record: RecordDto,
        }

        let dto = ResolutionDto {
            existing: resolution.is_existing(),
            record: resolution.into_record().into(),
        };
        self.emit(&dto, |out| {
            let heading = if dto.existing { "stored" } else { "new (not saved)" };
            writeln!(out, "{}", heading)?;
            write_record(out, &dto.record)
        })
    }

    pub fn scan(&self, outcome: &ScanOutcome) -> CliResult<()> {
        self.emit(outcome, |out| {
            let status = match outcome.status {
                ScanStatus::Existing => "stored",
                ScanStatus::Draft => "new",
                ScanStatus::Saved => "saved",
                ScanStatus::Failed => "failed",
            };
            match (&outcome.record, &outcome.error) {
                (Some(r), _) => writeln!(
                    out,
                    "{:<7} {}  {}  qty {}  @ {}",
                    status,
                    r.barcode,
                    r.label,
                    r.quantity,
                    r.location
                ),
                (None, Some(e)) => writeln!(out, "{:<7} {}  {}", status, outcome.barcode, e.message),
                (None, None) => writeln!(out, "{:<7} {}", status, outcome.barcode),
            }
        })
    }

    pub fn auth(&self, status: &AuthStatus) -> CliResult<()> {
        self.emit(status, |out| {
            let credentials = if status.credentials_configured { "set" } else { "missing" };
            writeln!(out, "state:         {}", status.state)?;
            writeln!(out, "credentials:   {}", credentials)?;
            writeln!(out, "access until:  {}", status.access_expires.as_deref().unwrap_or("-"))?;
            writeln!(out, "refresh until: {}", status.refresh_expires.as_deref().unwrap_or("-"))?;
            writeln!(out, "config:        {}", status.config_path.as_deref().unwrap_or("(not saved)"))
        })
    }

    pub fn message(&self, text: &str) -> CliResult<()> {
        #[derive(Serialize)]
        struct Message<'a> {
            message: &'a str,
        }
        self.emit(&Message { message: text }, |out| writeln!(out, "{}", text))
    }

    fn emit<T, F>(&self, value: &T, human: F) -> CliResult<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if self.json {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        } else {
            human(&mut out)?;
        }
        out.flush()?;
        Ok(())
    }
}

fn write_record(out: &mut dyn Write, r: &RecordDto) -> io::Result<()> {
    let rows = [
        ("barcode", r.barcode.as_str()),
        ("name", r.name.as_str()),
        ("supplier p/n", r.supplier_pn.as_str()),
        ("mfg p/n", r.manufacturer_pn.as_str()),
        ("location", r.location.as_str()),
        ("category", r.category.as_str()),
        ("description", r.description.as_str()),
        ("supplier", r.supplier.as_str()),
        ("manufacturer", r.manufacturer.as_str()),
        ("project", r.used_by_project.as_str()),
        ("customer ref", r.customer_ref.as_str()),
        ("comment", r.comment.as_str()),
    ];
    for (label, value) in rows {
        writeln!(out, "{:<13} {}", label, value)?;
    }
    writeln!(out, "{:<13} {}", "quantity", r.quantity)
}

fn write_table(out: &mut dyn Write, records: &[RecordDto]) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "no records");
    }

    let width = records.iter().map(|r| r.barcode.len()).max().unwrap_or(7).max(7);
    writeln!(out, "{:<width$}  {:<24} {:<16} {:>6}  {}", "BARCODE", "PART", "LOCATION", "QTY", "PROJECT")?;
    for r in records {
        writeln!(
            out,
            "{:<width$}  {:<24} {:<16} {:>6}  {}",
            r.barcode,
            r.label,
            r.location,
            r.quantity,
            r.used_by_project
        )?;
    }
    writeln!(out, "{} record(s)", records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{Barcode, ComponentRecord};

    fn dto() -> RecordDto {
        RecordDto::from(ComponentRecord {
            manufacturer_pn: "NE555P".into(),
            location: "A1".into(),
            quantity: 12,
            ..ComponentRecord::with_barcode(Barcode::new(b"\x1dP1".to_vec()))
        })
    }

    #[test]
    fn test_table_lists_each_record() {
        let mut buf = Vec::new();
        write_table(&mut buf, &[dto(), dto()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.contains("NE555P"));
        assert!(text.ends_with("2 record(s)\n"));
    }

    #[test]
    fn test_empty_table() {
        let mut buf = Vec::new();
        write_table(&mut buf, &[]).unwrap();
        assert_eq!(buf, b"no records\n");
    }

    #[test]
    fn test_record_shows_escaped_barcode() {
        let mut buf = Vec::new();
        write_record(&mut buf, &dto()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("barcode       \\x1dP1\n"));
        assert!(text.contains("quantity      12"));
    }
}
