//! acrofill fills the interactive (AcroForm) fields of PDF documents with the values found in a
//! JSON data file, and can flatten the result so that it is no longer editable. Forms built with
//! the legacy XFA technology can be converted into AcroForm documents beforehand through the
//! pdfRest web API.
//!
//! In this crate, a form document is represented by the struct `PdfForm`, which exposes a snapshot
//! of its fields as a `FieldDirectory` and the operations for setting their values. The function
//! `filler::apply` maps a whole set of values onto a form, reporting for each of them whether it
//! was applied or skipped, and why.

/// The module where the fields of a form are enumerated.
///
/// The entry point is the `FieldDirectory` struct, built from a `lopdf::Document` by walking the
/// field tree of its interactive form. Each terminal field is described by a `FormField`, carrying
/// its fully qualified name, its `FieldKind` and its current value.
pub mod field;

/// The module where the `PdfForm` wrapper around a loaded document is presented.
///
/// Values are set one field at a time through `set_text`, `set_checked` and `select`. Each of these
/// operations fails with a `FieldError` rather than a `ContextError`, since the failure of a single
/// field is never fatal for the document.
pub mod form;

/// The value application engine, which turns a value map into an `ApplicationReport`.
pub mod filler;

/// Listing the fields of a form and deriving a template value map from them.
pub mod template;

/// The client of the remote service converting XFA forms into AcroForm documents.
///
/// The `DocumentConverter` trait abstracts the service, so that the pipeline can be driven by
/// another implementation. `PdfRestClient` implements it over the pdfRest API with a blocking
/// HTTP client, configured explicitly through a `ConversionConfiguration`.
pub mod conversion;

/// Reading, writing and listing files.
pub mod storage;

/// The single document and batch operations of the command line tool.
pub mod pipeline;

/// The configuration of a run, read from a JSON file and from the environment.
pub mod configuration;

/// This module contains the `ContextError` type which is the error type used for every fatal failure of this library.
///
/// Whenever a function of this crate returns a `ContextError`, the end user can expect to obtain an explanation of
/// what was being done, and if the error was propagated from another library, the message of that error as well.
///
/// The `ContextError` type implements `std::fmt::Display` and `Debug`, so it can be explicitly printed out.
pub mod error;

mod appearance;
mod flatten;
mod objects;

#[cfg(test)]
mod test_fixtures;
