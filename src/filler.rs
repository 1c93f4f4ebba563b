//! The value application engine: maps every entry of a value map onto the field of the same
//! name, with semantics depending on the kind of the field. A failure on one field is recorded
//! in the report as a skipped outcome and never stops the remaining entries from being applied.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::field::{FieldDirectory, FieldKind, FormField};
use crate::form::{FieldError, PdfForm};

/// Field names mapped to the values to apply, in the order of the data file.
pub type ValueMap = serde_json::Map<String, Value>;

/// Why an entry of the value map was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    FieldNotFound,
    InvalidOption,
    UnsupportedFieldType,
    ValueNotText,
    ExceedsMaxLength { length: usize, max_length: usize },
    /// The field objects are structurally broken, with a description of what is wrong.
    Malformed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::FieldNotFound => write!(formatter, "field not found"),
            SkipReason::InvalidOption => write!(formatter, "invalid option"),
            SkipReason::UnsupportedFieldType => write!(formatter, "unsupported field type"),
            SkipReason::ValueNotText => write!(formatter, "value cannot be converted to text"),
            SkipReason::ExceedsMaxLength { length, max_length } => write!(
                formatter,
                "text length {} exceeds maximum length {}",
                length, max_length
            ),
            SkipReason::Malformed(description) => write!(formatter, "{}", description),
        }
    }
}

impl Serialize for SkipReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<FieldError> for SkipReason {
    fn from(error: FieldError) -> Self {
        match error {
            FieldError::InvalidOption { .. } => SkipReason::InvalidOption,
            FieldError::ExceedsMaxLength { length, max_length } => {
                SkipReason::ExceedsMaxLength { length, max_length }
            }
            FieldError::WrongKind { .. } => SkipReason::UnsupportedFieldType,
            FieldError::Malformed { description } => SkipReason::Malformed(description),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum FieldStatus {
    Applied,
    Skipped(SkipReason),
}

/// What happened to a single entry of the value map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: FieldStatus,
}

/// The result of applying a value map: one outcome per entry, in the order of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReport {
    pub applied_count: usize,
    pub total_attempted: usize,
    pub outcomes: Vec<ApplicationOutcome>,
}

impl ApplicationReport {
    /// Builds the report, deriving the counts from the outcomes.
    pub fn from_outcomes(outcomes: Vec<ApplicationOutcome>) -> ApplicationReport {
        let applied_count = outcomes
            .iter()
            .filter(|outcome| outcome.status == FieldStatus::Applied)
            .count();
        ApplicationReport {
            applied_count,
            total_attempted: outcomes.len(),
            outcomes,
        }
    }

    /// The outcomes of the entries which were not applied, with their reasons.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.status {
            FieldStatus::Skipped(reason) => Some((outcome.name.as_str(), reason)),
            FieldStatus::Applied => None,
        })
    }
}

/// Applies every entry of the value map to the form, returning one outcome per entry.
pub fn apply(form: &mut PdfForm, values: &ValueMap) -> ApplicationReport {
    let directory = form.directory();
    log::info!("Filling {} values into the form fields", values.len());

    let outcomes: Vec<ApplicationOutcome> = values
        .iter()
        .map(|(name, value)| {
            let status = match apply_value(form, &directory, name, value) {
                Ok(()) => FieldStatus::Applied,
                Err(reason) => {
                    log::warn!("Skipping the field {:?}: {}", name, reason);
                    FieldStatus::Skipped(reason)
                }
            };
            ApplicationOutcome {
                name: name.clone(),
                status,
            }
        })
        .collect();

    let report = ApplicationReport::from_outcomes(outcomes);
    log::info!(
        "Successfully filled {} out of {} fields",
        report.applied_count,
        report.total_attempted
    );
    report
}

fn apply_value(
    form: &mut PdfForm,
    directory: &FieldDirectory,
    name: &str,
    value: &Value,
) -> Result<(), SkipReason> {
    let field: &FormField = directory
        .lookup(name)
        .map_err(|_| SkipReason::FieldNotFound)?;

    match field.kind {
        FieldKind::TextField => {
            let text = value_as_text(value).ok_or(SkipReason::ValueNotText)?;
            form.set_text(field, &text)?;
        }
        FieldKind::CheckBox => form.set_checked(field, value == &Value::Bool(true))?,
        FieldKind::RadioGroup | FieldKind::Dropdown => {
            let option = value_as_text(value).ok_or(SkipReason::ValueNotText)?;
            form.select(field, &option)?;
        }
        FieldKind::Unsupported => return Err(SkipReason::UnsupportedFieldType),
    }

    Ok(())
}

/// Converts a JSON value to the text written into a field. Null and objects have no text form.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(boolean) => Some(boolean.to_string()),
        Value::Array(elements) => elements
            .iter()
            .map(|element| match element {
                Value::Null => Some(String::new()),
                element => value_as_text(element),
            })
            .collect::<Option<Vec<_>>>()
            .map(|texts| texts.join(",")),
        Value::Null | Value::Object(_) => None,
    }
}
