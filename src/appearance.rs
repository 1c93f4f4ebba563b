//! Generation of the normal appearance of text-like widgets, so that a filled value is
//! displayed by viewers which do not regenerate appearances and survives flattening.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat, Stream};

use crate::field::FormField;
use crate::form::{self, FieldError};
use crate::objects;

/// Used when neither the widget, the field nor the form specify a default appearance.
const FALLBACK_DEFAULT_APPEARANCE: &str = "/Helv 0 Tf 0 g";
/// Horizontal and vertical padding between the border of the widget and its text.
const PADDING: f32 = 2.0;
/// Bounds of the font size chosen when the default appearance asks for automatic sizing.
const MINIMUM_AUTO_FONT_SIZE: f32 = 4.0;
const MAXIMUM_AUTO_FONT_SIZE: f32 = 12.0;

/// The parsed `/DA` default appearance string of a variable text field.
#[derive(Debug, Clone)]
pub(crate) struct DefaultAppearance {
    pub font_name: String,
    /// A font size of zero means that the text is sized to fit the widget.
    pub font_size: f32,
    /// The color operation (`g`, `rg` or `k`) setting the color of the text, if any.
    pub color: Option<Operation>,
}

impl DefaultAppearance {
    /// Parses a default appearance string such as `/Helv 12 Tf 0 0 1 rg`.
    pub fn parse(default_appearance: &str) -> Option<DefaultAppearance> {
        let mut operands: Vec<&str> = Vec::new();
        let mut font: Option<(String, f32)> = None;
        let mut color = None;

        for token in default_appearance.split_whitespace() {
            match token {
                "Tf" => {
                    if let [.., name, size] = operands[..] {
                        font = Some((name.trim_start_matches('/').to_string(), size.parse().ok()?));
                    }
                    operands.clear();
                }
                "g" | "rg" | "k" => {
                    let components = operands
                        .iter()
                        .map(|operand| operand.parse::<f32>().ok().map(|value| Object::Real(value.into())))
                        .collect::<Option<Vec<_>>>()?;
                    color = Some(Operation::new(token, components));
                    operands.clear();
                }
                operand => operands.push(operand),
            }
        }

        let (font_name, font_size) = font?;
        Some(DefaultAppearance {
            font_name,
            font_size,
            color,
        })
    }
}

/// Generates a form XObject displaying the given text inside the widget's rectangle and sets
/// it as the widget's normal appearance. Widgets without a rectangle are left untouched.
pub(crate) fn write_text_appearance(
    document: &mut Document,
    field: &FormField,
    widget_id: ObjectId,
    text: &str,
    multiline: bool,
) -> Result<(), FieldError> {
    let widget = objects::dictionary_at(document, widget_id).ok_or_else(|| FieldError::Malformed {
        description: format!("widget {} {} is not a dictionary", widget_id.0, widget_id.1),
    })?;
    let Some([x0, y0, x1, y1]) = objects::rectangle(document, widget, b"Rect") else {
        log::debug!("The widget of {:?} has no rectangle, not generating its appearance", field.name);
        return Ok(());
    };
    let (width, height) = (x1 - x0, y1 - y0);

    let default_appearance = default_appearance(document, field, widget_id);
    let (font_name, font) = font_resource(document, &default_appearance.font_name);
    let font_size = if default_appearance.font_size > 0.0 {
        default_appearance.font_size
    } else if multiline {
        MAXIMUM_AUTO_FONT_SIZE
    } else {
        (height * 0.65).clamp(MINIMUM_AUTO_FONT_SIZE, MAXIMUM_AUTO_FONT_SIZE)
    };

    let mut operations = vec![
        Operation::new("BMC", vec![Object::Name(b"Tx".to_vec())]),
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
    ];
    operations.extend(default_appearance.color);
    operations.push(Operation::new(
        "Tf",
        vec![Object::Name(font_name.clone().into_bytes()), Object::Real(font_size.into())],
    ));
    if multiline {
        let leading = font_size * 1.15;
        operations.push(Operation::new("TL", vec![Object::Real(leading.into())]));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(PADDING.into()), Object::Real((height - PADDING - font_size).into())],
        ));
        for (index, line) in text.lines().enumerate() {
            if index > 0 {
                operations.push(Operation::new("T*", vec![]));
            }
            operations.push(show_text(line));
        }
    } else {
        let baseline = ((height - font_size) / 2.0 + font_size * 0.2).max(0.0);
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(PADDING.into()), Object::Real(baseline.into())],
        ));
        operations.push(show_text(text));
    }
    operations.extend([
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
        Operation::new("EMC", vec![]),
    ]);

    let content = Content { operations }.encode().map_err(|error| FieldError::Malformed {
        description: format!("unable to encode the appearance of {:?}: {}", field.name, error),
    })?;
    let appearance_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), Object::Real(width.into()), Object::Real(height.into())],
            "Resources" => dictionary! { "Font" => dictionary! { font_name => font } },
        },
        content,
    );
    let appearance_id = document.add_object(appearance_stream);
    form::dictionary_mut(document, widget_id)?
        .set("AP", dictionary! { "N" => appearance_id });

    Ok(())
}

/// Builds the text showing operation, characters outside of Latin-1 are replaced because
/// the standard fonts cannot display them.
fn show_text(text: &str) -> Operation {
    let bytes = text
        .chars()
        .map(|character| u8::try_from(u32::from(character)).unwrap_or(b'?'))
        .collect();
    Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)])
}

/// Looks up the default appearance on the widget, on the field and its ancestors and on the form.
fn default_appearance(document: &Document, field: &FormField, widget_id: ObjectId) -> DefaultAppearance {
    let field_dictionary = objects::dictionary_at(document, field.object_id);
    let candidates = [
        objects::dictionary_at(document, widget_id)
            .and_then(|widget| objects::entry(document, widget, b"DA")),
        field_dictionary.and_then(|field| objects::inherited_entry(document, field, b"DA")),
        objects::acroform(document).and_then(|acroform| objects::entry(document, acroform, b"DA")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(objects::text)
        .find_map(|default_appearance| DefaultAppearance::parse(&default_appearance))
        .or_else(|| DefaultAppearance::parse(FALLBACK_DEFAULT_APPEARANCE))
        .unwrap_or(DefaultAppearance {
            font_name: "Helv".into(),
            font_size: 0.0,
            color: None,
        })
}

/// Finds the font in the form's default resources, or creates a standard Helvetica font.
/// Returns the resource name together with the font object.
fn font_resource(document: &mut Document, font_name: &str) -> (String, Object) {
    let existing_font = objects::acroform(document)
        .and_then(|acroform| objects::dictionary_entry(document, acroform, b"DR"))
        .and_then(|resources| objects::dictionary_entry(document, resources, b"Font"))
        .and_then(|fonts| fonts.get(font_name.as_bytes()).ok())
        .cloned();

    match existing_font {
        Some(font) => (font_name.to_string(), font),
        None => {
            let font_id = document.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            });
            ("Helv".to_string(), Object::Reference(font_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    #[test]
    fn default_appearance_with_gray_color() {
        let parsed = DefaultAppearance::parse("/Helv 0 Tf 0 g").unwrap();
        assert_eq!(parsed.font_name, "Helv");
        assert_eq!(parsed.font_size, 0.0);
        assert_eq!(parsed.color.unwrap().operator, "g");
    }

    #[test]
    fn default_appearance_with_rgb_color_first() {
        let parsed = DefaultAppearance::parse("0 0 1 rg /TiRo 9.5 Tf").unwrap();
        assert_eq!(parsed.font_name, "TiRo");
        assert_eq!(parsed.font_size, 9.5);
        assert_eq!(parsed.color.unwrap().operands.len(), 3);
    }

    #[test]
    fn default_appearance_without_font_is_rejected() {
        assert!(DefaultAppearance::parse("0 g").is_none());
        assert!(DefaultAppearance::parse("/Helv large Tf").is_none());
    }

    #[test]
    fn non_latin_characters_are_replaced_in_the_appearance() {
        let operation = show_text("Zürich 東京");
        assert_eq!(
            operation.operands,
            vec![Object::String(b"Z\xfcrich ??".to_vec(), StringFormat::Literal)]
        );
    }

    #[test]
    fn multiline_appearance_breaks_lines() {
        let mut document = test_fixtures::form_document();
        let directory = crate::field::FieldDirectory::from_document(&document);
        let field = directory.lookup("name").unwrap();
        write_text_appearance(&mut document, field, field.widget_ids[0], "first\nsecond", true).unwrap();

        let widget = objects::dictionary_at(&document, field.widget_ids[0]).unwrap();
        let appearance = objects::dictionary_entry(&document, widget, b"AP").unwrap();
        let Some(Object::Stream(stream)) = objects::entry(&document, appearance, b"N") else {
            panic!("expected a normal appearance stream");
        };
        let content = Content::decode(&stream.content).unwrap();
        let operators: Vec<_> = content
            .operations
            .iter()
            .map(|operation| operation.operator.as_str())
            .collect();
        assert_eq!(
            operators,
            vec!["BMC", "q", "BT", "g", "Tf", "TL", "Td", "Tj", "T*", "Tj", "ET", "Q", "EMC"]
        );
    }
}
