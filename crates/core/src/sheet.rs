//! In-memory tabular input model.
//!
//! The builder never touches files; callers (the CLI, tests) load whatever
//! source they have into a [`Workbook`] of string cells. Column headers are
//! matched case-insensitively against an ordered alias list per logical field,
//! resolved once per sheet instead of at every use site.

use std::collections::HashMap;

pub const SHEET_OFFER: &str = "Angebot";
pub const SHEET_CUSTOMER: &str = "Kunde";
pub const SHEET_LINE_ITEMS: &str = "Positionen";

/// One named sheet: a header row plus zero or more data rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sheet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Treats the first row as the header. An empty input produces an empty
    /// sheet with no columns.
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Self {
        if rows.is_empty() {
            return Self::default();
        }
        let header = rows.remove(0);
        Self { header, rows }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Workbook {
    sheets: Vec<(String, Sheet)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, sheet: Sheet) {
        self.sheets.push((name.into(), sheet));
    }

    /// Sheet lookup is case-insensitive on the trimmed name.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        let wanted = name.trim().to_ascii_lowercase();
        self.sheets
            .iter()
            .find(|(candidate, _)| candidate.trim().to_ascii_lowercase() == wanted)
            .map(|(_, sheet)| sheet)
    }
}

/// A logical field and the column headers that may carry it, in priority
/// order.
#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

/// Recognized `Positionen` columns. Error attribution uses the canonical
/// name even when the input used an alias.
pub const LINE_ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec { canonical: "type", aliases: &["type"] },
    FieldSpec { canonical: "articleId", aliases: &["articleid"] },
    FieldSpec { canonical: "name", aliases: &["name"] },
    FieldSpec { canonical: "description", aliases: &["description"] },
    FieldSpec { canonical: "quantity", aliases: &["quantity", "qty"] },
    FieldSpec { canonical: "unitName", aliases: &["unitname", "unit"] },
    FieldSpec { canonical: "unitPriceAmount", aliases: &["unitpriceamount", "price"] },
    FieldSpec { canonical: "taxRatePercentage", aliases: &["taxratepercentage", "taxrate"] },
    FieldSpec { canonical: "discountPercent", aliases: &["discountpercent", "discount"] },
];

const FIELD_COLUMN_ALIASES: &[&str] = &["field", "feld"];
const VALUE_COLUMN_ALIASES: &[&str] = &["value", "wert"];

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    for alias in aliases {
        if let Some(position) =
            header.iter().position(|column| column.trim().eq_ignore_ascii_case(alias))
        {
            return Some(position);
        }
    }
    None
}

fn non_empty(cell: Option<&String>) -> Option<&str> {
    cell.map(|value| value.trim()).filter(|value| !value.is_empty())
}

/// Column positions for the recognized fields of one sheet, resolved once.
#[derive(Clone, Debug)]
pub struct RowSchema {
    positions: Vec<Option<usize>>,
    fields: &'static [FieldSpec],
}

impl RowSchema {
    pub fn resolve(header: &[String], fields: &'static [FieldSpec]) -> Self {
        let positions =
            fields.iter().map(|field| find_column(header, field.aliases)).collect();
        Self { positions, fields }
    }

    /// Trimmed cell value for a canonical field; empty cells read as absent.
    pub fn value<'r>(&self, row: &'r [String], canonical: &str) -> Option<&'r str> {
        let slot = self.fields.iter().position(|field| field.canonical == canonical)?;
        let column = self.positions[slot]?;
        non_empty(row.get(column))
    }

    /// A row is blank when every recognized field is empty; such rows are
    /// tolerated and skipped.
    pub fn is_blank(&self, row: &[String]) -> bool {
        self.fields.iter().all(|field| self.value(row, field.canonical).is_none())
    }
}

/// Extracts a metadata section as a lowercase key/value map.
///
/// The vertical layout (a `field`/`value` column pair, one entry per row) is
/// tried first; when no such column pair exists the sheet is read as a
/// horizontal layout (one data row whose columns are the field names).
pub fn section_values(sheet: &Sheet) -> HashMap<String, String> {
    let mut values = HashMap::new();

    let field_column = find_column(&sheet.header, FIELD_COLUMN_ALIASES);
    let value_column = find_column(&sheet.header, VALUE_COLUMN_ALIASES);

    if let (Some(field_column), Some(value_column)) = (field_column, value_column) {
        for row in &sheet.rows {
            let Some(key) = non_empty(row.get(field_column)) else { continue };
            let Some(value) = non_empty(row.get(value_column)) else { continue };
            values.insert(key.to_ascii_lowercase(), value.to_string());
        }
        return values;
    }

    if let Some(row) = sheet.rows.first() {
        for (index, column) in sheet.header.iter().enumerate() {
            let key = column.trim();
            if key.is_empty() {
                continue;
            }
            if let Some(value) = non_empty(row.get(index)) {
                values.insert(key.to_ascii_lowercase(), value.to_string());
            }
        }
    }

    values
}

/// Reads one logical field from an extracted section, first alias wins.
pub fn section_field<'v>(
    values: &'v HashMap<String, String>,
    aliases: &[&str],
) -> Option<&'v str> {
    aliases.iter().find_map(|alias| values.get(*alias).map(String::as_str))
}
