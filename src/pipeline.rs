//! The operations of the command line tool: filling, converting or converting then filling a
//! single document, and the same over every document of a directory.
//!
//! Batches are processed strictly one document after another. A document which cannot be
//! processed is logged and recorded in the summary, then the batch moves on to the next one.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::conversion::DocumentConverter;
use crate::error::ContextError;
use crate::filler::{self, ApplicationReport, ValueMap};
use crate::form::PdfForm;
use crate::storage;

/// Options of the filling step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillOptions {
    /// Whether the form is flattened after the values have been applied.
    pub flatten: bool,
    /// Whether the names of the fields found in the form are logged.
    pub list_fields: bool,
    /// Prepended to the file names of the documents filled in batch.
    pub output_prefix: String,
}

impl Default for FillOptions {
    fn default() -> Self {
        FillOptions {
            flatten: false,
            list_fields: false,
            output_prefix: "filled_".to_string(),
        }
    }
}

/// A document of a batch which could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub file: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// The number of documents written to the output directory.
    pub processed: usize,
    pub failed: Vec<BatchFailure>,
}

/// Reads a JSON data file, whose top level must be an object mapping field names to values.
pub fn load_value_map(path: &Path) -> Result<ValueMap, ContextError> {
    let bytes = storage::read_all(path)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|error| {
        ContextError::with_error(
            format!("Failed to parse the data file {}", path.display()),
            &error,
        )
    })?;

    match value {
        Value::Object(values) => Ok(values),
        _ => Err(ContextError::with_context(format!(
            "The data file {} does not contain a JSON object",
            path.display()
        ))),
    }
}

/// Fills a document held in memory, returning the bytes of the filled document.
pub fn fill_bytes(
    bytes: &[u8],
    values: &ValueMap,
    options: &FillOptions,
) -> Result<(Vec<u8>, ApplicationReport), ContextError> {
    let mut form = PdfForm::load(bytes)?;
    if form.remove_xfa() {
        log::warn!("Removed the XFA form data, the static AcroForm fields are filled instead");
    }

    let directory = form.directory();
    log::info!("Found {} fields in the form", directory.len());
    if options.list_fields {
        for field in directory.list() {
            log::info!("Field name: {}", field.name);
        }
    } else {
        for field in directory.list() {
            log::debug!("Field name: {} ({})", field.name, field.kind);
        }
    }

    let report = filler::apply(&mut form, values);
    if options.flatten {
        form.flatten()?;
        log::info!("The form has been flattened and is no longer editable");
    }

    Ok((form.save_to_bytes()?, report))
}

/// Fills the document at the input path and writes the result to the output path.
pub fn fill_file(
    input: &Path,
    output: &Path,
    values: &ValueMap,
    options: &FillOptions,
) -> Result<ApplicationReport, ContextError> {
    log::info!("Starting to fill {}", input.display());
    let bytes = storage::read_all(input)?;
    let (filled_bytes, report) = fill_bytes(&bytes, values, options).map_err(|error| ContextError {
        context: format!("Failed to fill {}", input.display()),
        source_error: Some(error.to_string()),
    })?;
    storage::write_all(output, &filled_bytes)?;
    log::info!("Filled PDF saved to {}", output.display());

    Ok(report)
}

/// Converts the document at the input path into an AcroForm document.
pub fn convert_file(
    converter: &dyn DocumentConverter,
    input: &Path,
    output: &Path,
) -> Result<(), ContextError> {
    let bytes = storage::read_all(input)?;
    let converted_bytes = convert_bytes(converter, &bytes, input)?;
    storage::write_all(output, &converted_bytes)?;
    log::info!("AcroForm PDF saved to {}", output.display());

    Ok(())
}

/// Converts the document at the input path, then fills the converted document.
pub fn convert_and_fill_file(
    converter: &dyn DocumentConverter,
    input: &Path,
    output: &Path,
    values: &ValueMap,
    options: &FillOptions,
) -> Result<ApplicationReport, ContextError> {
    log::info!("Starting the process for {}", input.display());
    let bytes = storage::read_all(input)?;
    let converted_bytes = convert_bytes(converter, &bytes, input)?;

    let (filled_bytes, report) =
        fill_bytes(&converted_bytes, values, options).map_err(|error| ContextError {
            context: format!("Failed to fill the converted {}", input.display()),
            source_error: Some(error.to_string()),
        })?;
    storage::write_all(output, &filled_bytes)?;
    log::info!("Form filled successfully, final PDF saved to {}", output.display());

    Ok(report)
}

/// Converts then fills every PDF document of the input directory. The filled documents keep
/// their file name, prefixed with the output prefix of the options.
pub fn batch_fill(
    converter: &dyn DocumentConverter,
    input_directory: &Path,
    output_directory: &Path,
    values: &ValueMap,
    options: &FillOptions,
) -> Result<BatchSummary, ContextError> {
    run_batch(input_directory, output_directory, |input, file_name| {
        let output = output_directory.join(format!("{}{}", options.output_prefix, file_name));
        let report = convert_and_fill_file(converter, input, &output, values, options)?;
        for (name, reason) in report.skipped() {
            log::debug!("Skipped {:?} in {}: {}", name, file_name, reason);
        }
        Ok(())
    })
}

/// Converts every PDF document of the input directory, keeping their file names.
pub fn batch_convert(
    converter: &dyn DocumentConverter,
    input_directory: &Path,
    output_directory: &Path,
) -> Result<BatchSummary, ContextError> {
    run_batch(input_directory, output_directory, |input, file_name| {
        convert_file(converter, input, &output_directory.join(file_name))
    })
}

/// Runs the processing of every document of a directory in turn. Only the creation of the
/// output directory and the listing of the input directory are fatal.
fn run_batch<F>(
    input_directory: &Path,
    output_directory: &Path,
    mut process: F,
) -> Result<BatchSummary, ContextError>
where
    F: FnMut(&Path, &str) -> Result<(), ContextError>,
{
    storage::ensure_directory(output_directory)?;
    let files = storage::list_files(input_directory, ".pdf")?;
    if files.is_empty() {
        log::info!("No PDF files found in {}", input_directory.display());
        return Ok(BatchSummary::default());
    }
    log::info!("Found {} PDF files, starting the batch processing", files.len());

    let mut summary = BatchSummary::default();
    for input in files {
        let file_name = input
            .file_name()
            .map(|file_name| file_name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match process(&input, &file_name) {
            Ok(()) => {
                log::info!("Successfully processed {}", file_name);
                summary.processed += 1;
            }
            Err(error) => {
                log::error!("Failed to process {}: {}", file_name, error);
                summary.failed.push(BatchFailure {
                    file: input,
                    error: error.to_string(),
                });
            }
        }
    }
    log::info!(
        "Batch processing completed: {} processed, {} failed",
        summary.processed,
        summary.failed.len()
    );

    Ok(summary)
}

fn convert_bytes(
    converter: &dyn DocumentConverter,
    bytes: &[u8],
    input: &Path,
) -> Result<Vec<u8>, ContextError> {
    let file_name = input
        .file_name()
        .map(|file_name| file_name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());

    converter
        .convert(bytes, &file_name)
        .map_err(|error| ContextError::with_error(format!("Failed to convert {}", input.display()), &error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use serde_json::json;

    #[test]
    fn value_maps_must_be_objects() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("data.json");

        std::fs::write(&path, r#"{ "b": 1, "a": true }"#).unwrap();
        let values = load_value_map(&path).unwrap();
        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["b", "a"]);

        std::fs::write(&path, r#"["not", "an", "object"]"#).unwrap();
        assert!(load_value_map(&path).is_err());
    }

    #[test]
    fn filling_removes_xfa_and_applies_values() {
        let bytes = test_fixtures::to_bytes(test_fixtures::form_document());
        let values = match json!({ "name": "Jane Smith", "country": "UK" }) {
            Value::Object(values) => values,
            _ => unreachable!(),
        };
        let (filled_bytes, report) = fill_bytes(&bytes, &values, &FillOptions::default()).unwrap();

        assert_eq!(report.applied_count, 2);
        let form = PdfForm::load(&filled_bytes).unwrap();
        assert!(!form.has_xfa());
        assert_eq!(form.directory().lookup("country").unwrap().value.as_deref(), Some("UK"));
    }

    #[test]
    fn malformed_documents_are_fatal() {
        let error = fill_bytes(b"%PDF-1.7 garbage", &ValueMap::new(), &FillOptions::default())
            .unwrap_err();
        assert!(error.to_string().starts_with("Failed to load the PDF document"));
    }
}
