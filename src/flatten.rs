//! Flattening of a form: the appearances of the field widgets are drawn into the page
//! contents, then the widgets and the interactive form are removed from the document.
//! The operation is irreversible, and a no-op on documents without an interactive form.

use std::collections::BTreeSet;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::appearance;
use crate::error::ContextError;
use crate::field::{self, FieldDirectory, FieldKind};
use crate::objects;

/// Annotation flag (bit 2) of annotations which are neither displayed nor printed.
const ANNOTATION_FLAG_HIDDEN: i64 = 1 << 1;

/// Where a widget appearance has to be drawn: the form XObject and the matrix mapping its
/// bounding box onto the rectangle of the widget.
struct Placement {
    appearance_id: ObjectId,
    matrix: [f32; 6],
}

/// Flattens every field of the document's interactive form.
pub(crate) fn flatten_form(document: &mut Document) -> Result<(), ContextError> {
    if objects::acroform(document).is_none() {
        log::debug!("The document has no interactive form, there is nothing to flatten");
        return Ok(());
    }

    let directory = FieldDirectory::from_document(document);
    complete_missing_appearances(document, &directory)?;
    let widget_ids: BTreeSet<ObjectId> = directory.widget_ids().collect();
    for (page_number, page_id) in document.get_pages() {
        flatten_page(document, page_id, &widget_ids).map_err(|error| ContextError {
            context: format!("Failed to flatten page {}", page_number),
            source_error: Some(error.to_string()),
        })?;
    }

    if let Some(catalog) = objects::catalog_id(document)
        .and_then(|catalog_id| document.get_object_mut(catalog_id).ok())
        .and_then(|catalog| catalog.as_dict_mut().ok())
    {
        catalog.remove(b"AcroForm");
    }
    let pruned_objects = document.prune_objects();
    log::debug!(
        "Flattened {} fields, pruning {} objects",
        directory.len(),
        pruned_objects.len()
    );

    Ok(())
}

/// Generates the appearance of the text fields and dropdowns holding a value but whose widgets
/// have no normal appearance, so that their value is not lost when the widgets are removed.
fn complete_missing_appearances(
    document: &mut Document,
    directory: &FieldDirectory,
) -> Result<(), ContextError> {
    for field in directory.list() {
        let Some(value) = field.value.as_deref().filter(|value| !value.is_empty()) else {
            continue;
        };
        let (text, multiline) = match field.kind {
            FieldKind::TextField => (value, field.flags & field::FLAG_MULTILINE != 0),
            FieldKind::Dropdown => {
                let label = field
                    .option_values
                    .iter()
                    .position(|option_value| option_value == value)
                    .and_then(|position| field.options.get(position))
                    .map_or(value, String::as_str);
                (label, false)
            }
            _ => continue,
        };

        for widget_id in &field.widget_ids {
            let has_normal_appearance = objects::dictionary_at(document, *widget_id)
                .and_then(|widget| objects::dictionary_entry(document, widget, b"AP"))
                .is_some_and(|appearance| appearance.has(b"N"));
            if has_normal_appearance {
                continue;
            }
            log::debug!("Generating the missing appearance of {:?} before flattening", field.name);
            appearance::write_text_appearance(document, field, *widget_id, text, multiline)
                .map_err(|error| {
                    ContextError::with_error(
                        format!("Unable to generate the appearance of {:?}", field.name),
                        &error,
                    )
                })?;
        }
    }

    Ok(())
}

/// Removes the form widgets from the annotations of a page and draws their appearances.
fn flatten_page(
    document: &mut Document,
    page_id: ObjectId,
    widget_ids: &BTreeSet<ObjectId>,
) -> Result<(), ContextError> {
    let Some(page) = objects::dictionary_at(document, page_id) else {
        return Ok(());
    };
    let annotations: Vec<Object> = objects::entry(document, page, b"Annots")
        .and_then(|annotations| annotations.as_array().ok())
        .cloned()
        .unwrap_or_default();

    let (widgets, remaining): (Vec<Object>, Vec<Object>) = annotations
        .into_iter()
        .partition(|annotation| {
            matches!(annotation, Object::Reference(object_id) if widget_ids.contains(object_id))
        });
    if widgets.is_empty() {
        return Ok(());
    }

    let placements: Vec<Placement> = widgets
        .iter()
        .filter_map(|widget| match widget {
            Object::Reference(widget_id) => placement(document, *widget_id),
            _ => None,
        })
        .collect();

    let mut resources = objects::dictionary_at(document, page_id)
        .and_then(|page| objects::inherited_entry(document, page, b"Resources"))
        .and_then(|resources| resources.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);
    let mut xobjects = objects::dictionary_entry(document, &resources, b"XObject")
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut operations = vec![Operation::new("Q", vec![])];
    for placement in &placements {
        let xobject_name = unused_name(&xobjects);
        xobjects.set(xobject_name.clone(), Object::Reference(placement.appearance_id));
        operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                placement.matrix.iter().map(|&value| Object::Real(value.into())).collect(),
            ),
            Operation::new("Do", vec![Object::Name(xobject_name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
    }
    resources.set("XObject", xobjects);

    let content = Content { operations }.encode().map_err(|error| {
        ContextError::with_error("Unable to encode the flattened field appearances", &error)
    })?;
    let save_state_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let flattened_fields_id = document.add_object(Stream::new(Dictionary::new(), content));

    let mut contents = vec![Object::Reference(save_state_id)];
    let existing_contents = objects::dictionary_at(document, page_id)
        .and_then(|page| page.get(b"Contents").ok())
        .cloned();
    match existing_contents {
        Some(Object::Reference(contents_id)) => match document.get_object(contents_id) {
            Ok(Object::Array(array)) => contents.extend(array.iter().cloned()),
            _ => contents.push(Object::Reference(contents_id)),
        },
        Some(Object::Array(array)) => contents.extend(array),
        _ => {}
    }
    contents.push(Object::Reference(flattened_fields_id));

    let page = document
        .get_object_mut(page_id)
        .and_then(|page| page.as_dict_mut())
        .map_err(|error| ContextError::with_error("Unable to modify the page dictionary", &error))?;
    if remaining.is_empty() {
        page.remove(b"Annots");
    } else {
        page.set("Annots", remaining);
    }
    page.set("Resources", resources);
    page.set("Contents", contents);

    Ok(())
}

/// Determines how a widget is drawn, or `None` if it is hidden or has no normal appearance.
/// The appearance stream is completed with the entries a form XObject requires.
fn placement(document: &mut Document, widget_id: ObjectId) -> Option<Placement> {
    let widget = objects::dictionary_at(document, widget_id)?;
    let flags = objects::entry(document, widget, b"F")
        .and_then(objects::integer)
        .unwrap_or(0);
    if flags & ANNOTATION_FLAG_HIDDEN != 0 {
        return None;
    }
    let [x0, y0, x1, y1] = objects::rectangle(document, widget, b"Rect")?;

    let normal_appearance = objects::dictionary_entry(document, widget, b"AP")?
        .get(b"N")
        .ok()?;
    let state = objects::entry(document, widget, b"AS").and_then(objects::text);
    let appearance_id = match objects::resolve(document, normal_appearance)? {
        Object::Stream(_) => match normal_appearance {
            Object::Reference(appearance_id) => *appearance_id,
            _ => return None,
        },
        Object::Dictionary(states) => match states.get(state?.as_bytes()).ok()? {
            Object::Reference(appearance_id) => *appearance_id,
            _ => return None,
        },
        _ => return None,
    };

    let Ok(Object::Stream(appearance)) = document.get_object_mut(appearance_id) else {
        return None;
    };
    let bounding_box = match appearance.dict.get(b"BBox").ok().and_then(|bbox| bbox.as_array().ok()) {
        Some(bbox) => match bbox.iter().map(objects::number).collect::<Option<Vec<_>>>()?[..] {
            [bx0, by0, bx1, by1] => [bx0.min(bx1), by0.min(by1), bx0.max(bx1), by0.max(by1)],
            _ => return None,
        },
        None => {
            let bounding_box = [0.0, 0.0, x1 - x0, y1 - y0];
            appearance.dict.set(
                "BBox",
                bounding_box
                    .iter()
                    .map(|&value| Object::Real(value.into()))
                    .collect::<Vec<_>>(),
            );
            bounding_box
        }
    };
    appearance.dict.set("Type", "XObject");
    appearance.dict.set("Subtype", "Form");

    let [bx0, by0, bx1, by1] = bounding_box;
    let scale_x = if bx1 > bx0 { (x1 - x0) / (bx1 - bx0) } else { 1.0 };
    let scale_y = if by1 > by0 { (y1 - y0) / (by1 - by0) } else { 1.0 };

    Some(Placement {
        appearance_id,
        matrix: [
            scale_x,
            0.0,
            0.0,
            scale_y,
            x0 - bx0 * scale_x,
            y0 - by0 * scale_y,
        ],
    })
}

/// Picks an XObject resource name which is not taken yet.
fn unused_name(xobjects: &Dictionary) -> String {
    (0..)
        .map(|index| format!("FlatField{}", index))
        .find(|name| !xobjects.has(name.as_bytes()))
        .unwrap_or_else(|| "FlatField".to_string())
}
