use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::objects;

/// Field flag (bit 13) of text fields which may contain multiple lines of text.
pub(crate) const FLAG_MULTILINE: u32 = 1 << 12;
/// Field flag (bit 16) of button fields which are radio groups.
const FLAG_RADIO: u32 = 1 << 15;
/// Field flag (bit 17) of button fields which are push buttons.
const FLAG_PUSH_BUTTON: u32 = 1 << 16;
/// Field flag (bit 18) of choice fields which are combo boxes rather than list boxes.
const FLAG_COMBO: u32 = 1 << 17;
/// Field flag (bit 19) of combo boxes which accept text besides their options.
pub(crate) const FLAG_EDIT: u32 = 1 << 18;

/// Depth at which the walk of the field tree gives up.
const MAXIMUM_FIELD_DEPTH: usize = 64;

/// The behavioral category of a form field, which determines how a value is applied to it.
///
/// The classification is derived from the `/FT` field type together with the `/Ff` field flags,
/// both of which can be inherited from the ancestors of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    TextField,
    CheckBox,
    RadioGroup,
    Dropdown,
    /// Push buttons, list boxes, signatures and anything not recognized.
    Unsupported,
}

impl FieldKind {
    /// Classifies a field from its `/FT` name and its `/Ff` flags.
    pub fn classify(field_type: Option<&[u8]>, flags: u32) -> FieldKind {
        match field_type {
            Some(b"Tx") => FieldKind::TextField,
            Some(b"Btn") if flags & FLAG_PUSH_BUTTON != 0 => FieldKind::Unsupported,
            Some(b"Btn") if flags & FLAG_RADIO != 0 => FieldKind::RadioGroup,
            Some(b"Btn") => FieldKind::CheckBox,
            Some(b"Ch") if flags & FLAG_COMBO != 0 => FieldKind::Dropdown,
            _ => FieldKind::Unsupported,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::TextField => "TextField",
            FieldKind::CheckBox => "CheckBox",
            FieldKind::RadioGroup => "RadioGroup",
            FieldKind::Dropdown => "Dropdown",
            FieldKind::Unsupported => "Unsupported",
        };
        write!(formatter, "{}", name)
    }
}

/// One terminal interactive field of a form, as found when the document was read.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// The fully qualified name, partial names of the ancestors are joined with `.`.
    pub name: String,
    pub kind: FieldKind,
    /// The current `/V` value, if the field has one.
    pub value: Option<String>,
    /// The options which can be selected, only populated for dropdowns and radio groups.
    pub options: Vec<String>,
    /// The values written to `/V` for each of the options, parallel to `options`.
    pub(crate) option_values: Vec<String>,
    pub(crate) object_id: ObjectId,
    pub(crate) widget_ids: Vec<ObjectId>,
    pub(crate) flags: u32,
    pub(crate) max_length: Option<usize>,
}

impl FormField {
    /// Whether a checkbox (or a radio group) is currently in an on state.
    pub fn is_checked(&self) -> bool {
        self.value.as_deref().is_some_and(|value| value != "Off")
    }

    /// Whether a combo box accepts arbitrary text besides its options.
    pub fn is_editable(&self) -> bool {
        self.flags & FLAG_EDIT != 0
    }
}

/// Raised when a field name cannot be resolved against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNotFound {
    pub name: String,
}

impl std::fmt::Display for FieldNotFound {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "No form field named {:?}", self.name)
    }
}

impl std::error::Error for FieldNotFound {}

/// A read-only view over the form fields of a document, in the order the document declares them.
#[derive(Debug, Clone, Default)]
pub struct FieldDirectory {
    fields: Vec<FormField>,
}

impl FieldDirectory {
    /// Walks the `/Fields` array of the document's `/AcroForm` and collects every terminal field.
    /// A document without an interactive form has an empty directory.
    pub fn from_document(document: &Document) -> FieldDirectory {
        let mut fields = Vec::new();
        let mut visited = HashSet::new();

        let Some(root_fields) = objects::acroform(document)
            .and_then(|acroform| objects::entry(document, acroform, b"Fields"))
            .and_then(|fields| fields.as_array().ok())
        else {
            return FieldDirectory { fields };
        };

        for root_field in root_fields {
            if let Object::Reference(field_id) = root_field {
                walk_field_tree(
                    document,
                    *field_id,
                    None,
                    Inherited::default(),
                    0,
                    &mut visited,
                    &mut fields,
                );
            }
        }

        FieldDirectory { fields }
    }

    /// Every field of the document, in the document's native order.
    pub fn list(&self) -> &[FormField] {
        &self.fields
    }

    /// Resolves a field by exact, case-sensitive name.
    pub fn lookup(&self, name: &str) -> Result<&FormField, FieldNotFound> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| FieldNotFound { name: name.into() })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The widget annotations of all the fields, used when flattening.
    pub(crate) fn widget_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.fields
            .iter()
            .flat_map(|field| field.widget_ids.iter().copied())
    }
}

/// The inheritable attributes passed down from the ancestors of a field.
#[derive(Debug, Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: u32,
}

/// Recursively walks the field tree, collecting the terminal fields. Intermediate nodes carry
/// partial names and possibly the field type and flags their descendants inherit. A node reached
/// a second time, through a circular or shared reference, is not walked again.
fn walk_field_tree(
    document: &Document,
    field_id: ObjectId,
    parent_name: Option<&str>,
    inherited: Inherited,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
    fields: &mut Vec<FormField>,
) {
    if depth >= MAXIMUM_FIELD_DEPTH {
        log::warn!("The form field tree is nested too deeply, ignoring {:?}", field_id);
        return;
    }
    if !visited.insert(field_id) {
        log::warn!("The form field {:?} is referenced more than once, ignoring it", field_id);
        return;
    }
    let Some(field_dictionary) = objects::dictionary_at(document, field_id) else {
        return;
    };

    let partial_name = objects::entry(document, field_dictionary, b"T").and_then(objects::text);
    let full_name = match (parent_name, partial_name) {
        (Some(parent), Some(name)) => format!("{parent}.{name}"),
        (Some(parent), None) => parent.to_string(),
        (None, Some(name)) => name,
        (None, None) => String::new(),
    };

    let inherited = Inherited {
        field_type: match objects::entry(document, field_dictionary, b"FT") {
            Some(Object::Name(name)) => Some(name.clone()),
            _ => inherited.field_type,
        },
        flags: objects::entry(document, field_dictionary, b"Ff")
            .and_then(objects::integer)
            .map(|flags| flags as u32)
            .unwrap_or(inherited.flags),
    };

    let kids: Vec<ObjectId> = objects::entry(document, field_dictionary, b"Kids")
        .and_then(|kids| kids.as_array().ok())
        .map(|kids| {
            kids.iter()
                .filter_map(|kid| match kid {
                    Object::Reference(kid_id) => Some(*kid_id),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    // Kids carrying a partial name are child fields, the others are the widgets of this field
    let (child_ids, widget_kids): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.iter().copied().partition(|kid_id| {
            objects::dictionary_at(document, *kid_id).is_some_and(|kid| kid.has(b"T"))
        });
    for child_id in child_ids.iter().copied() {
        walk_field_tree(
            document,
            child_id,
            Some(&full_name),
            inherited.clone(),
            depth + 1,
            visited,
            fields,
        );
    }
    if !child_ids.is_empty() && widget_kids.is_empty() {
        return;
    }

    if full_name.is_empty() {
        log::debug!("Ignoring the unnamed form field {:?}", field_id);
        return;
    }

    let widget_ids = if kids.is_empty() { vec![field_id] } else { widget_kids };
    let kind = FieldKind::classify(inherited.field_type.as_deref(), inherited.flags);
    let (options, option_values) = match kind {
        FieldKind::Dropdown => choice_options(document, field_dictionary),
        FieldKind::RadioGroup => radio_options(document, field_dictionary, &widget_ids),
        _ => (Vec::new(), Vec::new()),
    };

    fields.push(FormField {
        name: full_name,
        kind,
        value: field_value(document, field_dictionary),
        options,
        option_values,
        object_id: field_id,
        widget_ids,
        flags: inherited.flags,
        max_length: objects::inherited_entry(document, field_dictionary, b"MaxLen")
            .and_then(objects::integer)
            .and_then(|max_length| usize::try_from(max_length).ok()),
    });
}

/// Reads the `/V` value of a field, joining the entries of multiple selections.
fn field_value(document: &Document, field_dictionary: &Dictionary) -> Option<String> {
    let value = objects::inherited_entry(document, field_dictionary, b"V")?;
    match value {
        Object::Array(values) => {
            let values: Vec<String> = values
                .iter()
                .filter_map(|value| objects::resolve(document, value).and_then(objects::text))
                .collect();
            (!values.is_empty()).then(|| values.join(", "))
        }
        other => objects::text(other),
    }
}

/// Reads the `/Opt` entry of a choice field, returning the displayed labels and the exported values.
/// An option is either a single string or an `[export, display]` pair.
fn choice_options(document: &Document, field_dictionary: &Dictionary) -> (Vec<String>, Vec<String>) {
    let Some(options) = objects::inherited_entry(document, field_dictionary, b"Opt")
        .and_then(|options| options.as_array().ok())
    else {
        return (Vec::new(), Vec::new());
    };

    options
        .iter()
        .filter_map(|option| match objects::resolve(document, option)? {
            Object::Array(pair) => {
                let export = objects::resolve(document, pair.first()?).and_then(objects::text)?;
                let display = pair
                    .get(1)
                    .and_then(|display| objects::resolve(document, display))
                    .and_then(objects::text)
                    .unwrap_or_else(|| export.clone());
                Some((display, export))
            }
            other => objects::text(other).map(|text| (text.clone(), text)),
        })
        .unzip()
}

/// The labels and on-states of a radio group. With an `/Opt` entry, the label of the widget at
/// each index is the option at that index and selecting it writes the widget's on-state.
/// Without one, the on-states are their own labels.
fn radio_options(
    document: &Document,
    field_dictionary: &Dictionary,
    widget_ids: &[ObjectId],
) -> (Vec<String>, Vec<String>) {
    let labels: Vec<String> = objects::inherited_entry(document, field_dictionary, b"Opt")
        .and_then(|options| options.as_array().ok())
        .map(|options| {
            options
                .iter()
                .filter_map(|option| objects::resolve(document, option).and_then(objects::text))
                .collect()
        })
        .unwrap_or_default();
    if labels.is_empty() {
        let states = radio_states(document, widget_ids);
        return (states.clone(), states);
    }
    if labels.len() != widget_ids.len() {
        log::debug!(
            "The radio group has {} options for {} widgets, pairing them by index",
            labels.len(),
            widget_ids.len()
        );
    }

    let mut options = Vec::new();
    let mut option_values = Vec::new();
    for (label, widget_id) in labels.into_iter().zip(widget_ids) {
        let Some(state) = on_states(document, *widget_id).into_iter().next() else {
            continue;
        };
        if !options.contains(&label) {
            options.push(label);
            option_values.push(state);
        }
    }

    (options, option_values)
}

/// Collects the on-state appearance names of the widgets of a radio group, in widget order.
fn radio_states(document: &Document, widget_ids: &[ObjectId]) -> Vec<String> {
    let mut states = Vec::new();
    for widget_id in widget_ids {
        for state in on_states(document, *widget_id) {
            if !states.contains(&state) {
                states.push(state);
            }
        }
    }

    states
}

/// The names of the appearance states of a widget other than `Off`.
pub(crate) fn on_states(document: &Document, widget_id: ObjectId) -> Vec<String> {
    objects::dictionary_at(document, widget_id)
        .and_then(|widget| objects::dictionary_entry(document, widget, b"AP"))
        .and_then(|appearance| objects::dictionary_entry(document, appearance, b"N"))
        .map(|normal_appearance| {
            normal_appearance
                .iter()
                .map(|(state, _)| String::from_utf8_lossy(state).into_owned())
                .filter(|state| state != "Off")
                .collect()
        })
        .unwrap_or_default()
}
