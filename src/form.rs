use lopdf::{dictionary, Dictionary, Object, ObjectId};
use time::OffsetDateTime;
use unicode_normalization::UnicodeNormalization as _;

use crate::appearance;
use crate::error::ContextError;
use crate::field::{self, FieldDirectory, FieldKind, FormField};
use crate::flatten;
use crate::objects;

/// The reasons for which setting a value on a single field can fail. None of these
/// is fatal for a run, the filler turns them into skipped outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The option is not among the ones the field permits.
    InvalidOption { option: String },
    /// The text is longer than the `/MaxLen` of the field.
    ExceedsMaxLength { length: usize, max_length: usize },
    /// The operation does not apply to a field of this kind.
    WrongKind { kind: FieldKind },
    /// The objects of the field are not what the PDF specification requires.
    Malformed { description: String },
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::InvalidOption { option } => {
                write!(formatter, "{:?} is not one of the field's options", option)
            }
            FieldError::ExceedsMaxLength { length, max_length } => write!(
                formatter,
                "text length {} exceeds maximum length {}",
                length, max_length
            ),
            FieldError::WrongKind { kind } => {
                write!(formatter, "operation not supported by a {} field", kind)
            }
            FieldError::Malformed { description } => write!(formatter, "{}", description),
        }
    }
}

impl std::error::Error for FieldError {}

/// A PDF document holding an interactive form, loaded in memory and exclusively owned for
/// the duration of one run.
///
/// Values are applied through `set_text`, `set_checked` and `select`, each of which takes a
/// field from the `FieldDirectory` previously obtained through `directory`.
pub struct PdfForm {
    /// The underlying PDF document, exposed for callers needing low-level access.
    pub inner_document: lopdf::Document,
}

impl PdfForm {
    /// Parses a PDF document from its bytes.
    pub fn load(bytes: &[u8]) -> Result<PdfForm, ContextError> {
        let inner_document = lopdf::Document::load_mem(bytes).map_err(|error| {
            ContextError::with_error("Failed to load the PDF document", &error)
        })?;
        if objects::catalog_id(&inner_document).is_none() {
            return Err(ContextError::with_context(
                "Failed to load the PDF document: the trailer does not reference a catalog",
            ));
        }

        Ok(PdfForm { inner_document })
    }

    /// Wraps an already constructed document.
    pub fn from_document(inner_document: lopdf::Document) -> PdfForm {
        PdfForm { inner_document }
    }

    /// Takes a snapshot of the fields currently present in the document.
    pub fn directory(&self) -> FieldDirectory {
        FieldDirectory::from_document(&self.inner_document)
    }

    /// Whether the form carries a legacy XFA description besides its AcroForm fields.
    pub fn has_xfa(&self) -> bool {
        objects::acroform(&self.inner_document).is_some_and(|acroform| acroform.has(b"XFA"))
    }

    /// Drops the XFA description, so that viewers render the static AcroForm fields instead.
    /// Returns whether there was anything to remove.
    pub fn remove_xfa(&mut self) -> bool {
        objects::acroform_mut(&mut self.inner_document)
            .and_then(|acroform| acroform.remove(b"XFA"))
            .is_some()
    }

    /// Sets the text content of a text field and regenerates the appearance of its widgets.
    /// The text is stored in its NFC form. The value is left untouched when an appearance
    /// cannot be written.
    pub fn set_text(&mut self, field: &FormField, text: &str) -> Result<(), FieldError> {
        if field.kind != FieldKind::TextField {
            return Err(FieldError::WrongKind { kind: field.kind });
        }
        let text: String = text.nfc().collect();
        if let Some(max_length) = field.max_length {
            let length = text.chars().count();
            if length > max_length {
                return Err(FieldError::ExceedsMaxLength { length, max_length });
            }
        }

        let multiline = field.flags & field::FLAG_MULTILINE != 0;
        for widget_id in &field.widget_ids {
            appearance::write_text_appearance(&mut self.inner_document, field, *widget_id, &text, multiline)?;
        }
        self.field_dictionary_mut(field)?
            .set("V", objects::encode_text_string(&text));
        self.request_appearance_regeneration();

        Ok(())
    }

    /// Checks or unchecks a checkbox. The on state is the one named by the widget's appearance.
    pub fn set_checked(&mut self, field: &FormField, checked: bool) -> Result<(), FieldError> {
        if field.kind != FieldKind::CheckBox {
            return Err(FieldError::WrongKind { kind: field.kind });
        }
        let state = if checked {
            field
                .widget_ids
                .iter()
                .find_map(|widget_id| {
                    field::on_states(&self.inner_document, *widget_id)
                        .into_iter()
                        .next()
                })
                .unwrap_or_else(|| "Yes".to_string())
        } else {
            "Off".to_string()
        };

        self.set_widget_states(field, &state)?;
        self.field_dictionary_mut(field)?
            .set("V", Object::Name(state.into_bytes()));
        Ok(())
    }

    /// Selects one of the options of a radio group or of a dropdown. Options are matched
    /// against their labels first, then against the values they write.
    pub fn select(&mut self, field: &FormField, option: &str) -> Result<(), FieldError> {
        let position = field
            .options
            .iter()
            .position(|label| label == option)
            .or_else(|| field.option_values.iter().position(|value| value == option));
        match field.kind {
            FieldKind::RadioGroup => {
                let Some(state) = position.and_then(|position| field.option_values.get(position))
                else {
                    return Err(FieldError::InvalidOption { option: option.into() });
                };
                self.set_widget_states(field, state)?;
                self.field_dictionary_mut(field)?
                    .set("V", Object::Name(state.as_bytes().to_vec()));
                Ok(())
            }
            FieldKind::Dropdown => {
                let (value, label) = match position {
                    Some(position) => (
                        field.option_values[position].clone(),
                        field.options[position].clone(),
                    ),
                    None if field.is_editable() => (option.to_string(), option.to_string()),
                    None => return Err(FieldError::InvalidOption { option: option.into() }),
                };

                for widget_id in &field.widget_ids {
                    appearance::write_text_appearance(&mut self.inner_document, field, *widget_id, &label, false)?;
                }
                self.field_dictionary_mut(field)?
                    .set("V", objects::encode_text_string(&value));
                self.request_appearance_regeneration();

                Ok(())
            }
            kind => Err(FieldError::WrongKind { kind }),
        }
    }

    /// Bakes the widget appearances into the pages and removes the interactive form.
    /// This cannot be undone, and does nothing on a document which is already flat.
    pub fn flatten(&mut self) -> Result<(), ContextError> {
        flatten::flatten_form(&mut self.inner_document)
    }

    /// Serializes the document, stamping its modification date and producer first.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, ContextError> {
        self.stamp_information_dictionary();

        let mut pdf_document_bytes = Vec::new();
        self.inner_document
            .save_to(&mut pdf_document_bytes)
            .map_err(|error| {
                ContextError::with_error("Error while saving the PDF document to bytes", &error)
            })?;

        Ok(pdf_document_bytes)
    }

    /// Sets the appearance state of every widget of a button field, widgets which do not know
    /// the given state are switched off.
    fn set_widget_states(&mut self, field: &FormField, state: &str) -> Result<(), FieldError> {
        for widget_id in &field.widget_ids {
            let widget_state = if field::on_states(&self.inner_document, *widget_id)
                .iter()
                .any(|candidate| candidate == state)
            {
                state
            } else {
                "Off"
            };
            dictionary_mut(&mut self.inner_document, *widget_id)?
                .set("AS", Object::Name(widget_state.as_bytes().to_vec()));
        }

        Ok(())
    }

    fn field_dictionary_mut(&mut self, field: &FormField) -> Result<&mut Dictionary, FieldError> {
        dictionary_mut(&mut self.inner_document, field.object_id)
    }

    /// Asks viewers to regenerate the appearances, since the generated ones only cover Latin-1 text.
    fn request_appearance_regeneration(&mut self) {
        if let Some(acroform) = objects::acroform_mut(&mut self.inner_document) {
            acroform.set("NeedAppearances", Object::Boolean(true));
        }
    }

    /// Writes the modification date and the producer into the document information dictionary,
    /// creating the dictionary if the document has none.
    fn stamp_information_dictionary(&mut self) {
        let modification_date = Object::string_literal(to_pdf_timestamp_format(&OffsetDateTime::now_utc()));
        let producer = Object::string_literal(concat!("acrofill ", env!("CARGO_PKG_VERSION")));

        let information_id = match self.inner_document.trailer.get(b"Info") {
            Ok(Object::Reference(object_id)) => Some(*object_id),
            _ => None,
        };
        let information = information_id
            .and_then(|object_id| self.inner_document.get_object_mut(object_id).ok())
            .and_then(|object| object.as_dict_mut().ok());
        match information {
            Some(information) => {
                information.set("ModDate", modification_date);
                information.set("Producer", producer);
            }
            None => {
                let information_id = self.inner_document.add_object(dictionary! {
                    "ModDate" => modification_date,
                    "Producer" => producer,
                });
                self.inner_document.trailer.set("Info", information_id);
            }
        }
    }
}

/// Retrieves the dictionary stored at an object identifier for modification.
pub(crate) fn dictionary_mut(
    document: &mut lopdf::Document,
    object_id: ObjectId,
) -> Result<&mut Dictionary, FieldError> {
    document
        .get_object_mut(object_id)
        .ok()
        .and_then(|object| object.as_dict_mut().ok())
        .ok_or_else(|| FieldError::Malformed {
            description: format!("object {} {} is not a dictionary", object_id.0, object_id.1),
        })
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
