//! Describing the fields of a form to a person, and deriving a value map to start from.

use serde::Serialize;
use serde_json::Value;

use crate::field::{FieldDirectory, FieldKind};
use crate::filler::ValueMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescription {
    pub name: String,
    pub kind: FieldKind,
}

/// Lists the name and kind of every field, in the order of the document.
pub fn describe(directory: &FieldDirectory) -> Vec<FieldDescription> {
    directory
        .list()
        .iter()
        .map(|field| FieldDescription {
            name: field.name.clone(),
            kind: field.kind,
        })
        .collect()
}

/// Builds a value map with an empty placeholder for every field which can be filled:
/// an empty string for text fields, dropdowns and radio groups, `false` for checkboxes.
pub fn derive_template(directory: &FieldDirectory) -> ValueMap {
    directory
        .list()
        .iter()
        .filter_map(|field| {
            let placeholder = match field.kind {
                FieldKind::TextField | FieldKind::Dropdown | FieldKind::RadioGroup => {
                    Value::String(String::new())
                }
                FieldKind::CheckBox => Value::Bool(false),
                FieldKind::Unsupported => return None,
            };
            Some((field.name.clone(), placeholder))
        })
        .collect()
}
