//! Validation issue types.
//!
//! Field-level problems are collected, never thrown: a single pass over the
//! input reports every discoverable error so the caller can fix the sheet in
//! one round instead of burning remote quota on repeated attempts. Only
//! structural problems (a required sheet missing entirely) abort the pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::LineItemType;

/// A field-level validation error with positional attribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub sheet: String,
    pub row: u32,
    pub field: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub sheet: String,
    pub row: u32,
    pub message: String,
}

/// Records a line item whose name was synthesized rather than supplied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoNamedLineItem {
    pub row: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    pub name: String,
}

/// Append-only accumulator threaded through the single validation pass.
///
/// If `errors` is non-empty no payload is returned; errors and payload are
/// mutually exclusive outcomes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub by_type: BTreeMap<LineItemType, u32>,
    pub auto_named_line_items: Vec<AutoNamedLineItem>,
}

impl ValidationSummary {
    pub fn error(
        &mut self,
        sheet: &str,
        row: u32,
        field: &str,
        message: impl Into<String>,
    ) {
        self.errors.push(ValidationError {
            sheet: sheet.to_string(),
            row,
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn warning(&mut self, sheet: &str, row: u32, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            sheet: sheet.to_string(),
            row,
            message: message.into(),
        });
    }

    pub fn tally(&mut self, item_type: LineItemType) {
        *self.by_type.entry(item_type).or_insert(0) += 1;
    }

    pub fn auto_named(&mut self, row: u32, article_id: Option<&str>, name: &str) {
        self.auto_named_line_items.push(AutoNamedLineItem {
            row,
            article_id: article_id.map(str::to_string),
            name: name.to_string(),
        });
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
