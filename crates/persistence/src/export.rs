//! CSV export of ledger records

use crate::{write_atomic, StoreResult};
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// A record that can be written as one CSV line
pub trait CsvRow {
    fn header() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Write `rows` (already filtered and ordered) to `path` with a header line
pub fn write_csv<R: CsvRow>(path: &Path, rows: &[&R]) -> StoreResult<()> {
    let mut out = String::new();
    push_line(&mut out, R::header().iter().map(|h| Cow::Borrowed(*h)));
    for row in rows {
        push_line(&mut out, row.fields().into_iter().map(Cow::Owned));
    }

    write_atomic(path, out.as_bytes())?;
    info!(path = %path.display(), rows = rows.len(), "CSV exported");
    Ok(())
}

fn push_line<'a>(out: &mut String, fields: impl Iterator<Item = Cow<'a, str>>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(&field));
    }
    out.push('\n');
}

/// RFC 4180 quoting: wrap in quotes when the field holds a delimiter, quote or newline
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Shortest representation that round-trips; avoids `1e21`-style noise for money
pub fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        v.to_string()
    }
}
