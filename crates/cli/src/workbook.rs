//! Loads an `.xlsx`/`.xls` workbook into the core sheet model.
//!
//! Every cell is carried as a string; the core's locale-aware parsing decides
//! what is numeric. Error cells read as empty so they fall under the normal
//! missing-value rules instead of leaking Excel error markers into names.

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use offerkit_core::sheet::{Sheet, Workbook};

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let mut source = open_workbook_auto(path)
        .with_context(|| format!("could not open workbook `{}`", path.display()))?;

    let mut workbook = Workbook::new();
    for name in source.sheet_names().to_owned() {
        let range = source
            .worksheet_range(&name)
            .with_context(|| format!("could not read sheet `{name}`"))?;
        let rows: Vec<Vec<String>> =
            range.rows().map(|row| row.iter().map(cell_to_string).collect()).collect();
        workbook.insert(name, Sheet::from_rows(rows));
    }
    Ok(workbook)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(value) => value.clone(),
        // Whole floats render without the trailing `.0` Excel stores them
        // with, so integer quantities survive the string round-trip.
        Data::Float(value) => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value.as_f64().to_string(),
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
    }
}
