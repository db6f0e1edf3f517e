//! Text rendering of spreadsheet cells.

use calamine::Data;

/// Render a cell the way it appears in the canonical delimited file.
///
/// Integral numbers lose their fractional part, booleans become
/// `TRUE`/`FALSE`, dates become ISO-8601 and errors keep their code.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_text(*f),
        Data::Bool(true) => "TRUE".to_string(),
        Data::Bool(false) => "FALSE".to_string(),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return float_text(dt.as_f64());
            }
            match dt.as_datetime() {
                Some(value) if value.time() == chrono::NaiveTime::MIN => {
                    value.format("%Y-%m-%d").to_string()
                }
                Some(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
                None => float_text(dt.as_f64()),
            }
        }
        Data::Error(e) => e.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_text(f: f64) -> String {
    // Beyond 2^53 integral floats are no longer exact; keep the float form.
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}
