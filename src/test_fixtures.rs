//! In-memory form documents shared by the unit tests.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::objects;

/// A form XObject drawing a filled square, used as the appearance of button states.
fn appearance_stream(document: &mut Document) -> ObjectId {
    document.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 20.into(), 20.into()],
        },
        b"0 g 4 4 12 12 re f".to_vec(),
    ))
}

/// A one page document with a text field, a checkbox, a radio group with two buttons, a
/// dropdown, a signature field and a hierarchical text field named `taxpayer.address`.
pub(crate) fn form_document() -> Document {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();
    let page_id = document.new_object_id();

    let content_id = document.add_object(Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let name_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("name"),
        "FT" => "Tx",
        "V" => Object::string_literal("John Doe"),
        "MaxLen" => 20,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "Rect" => vec![50.into(), 700.into(), 200.into(), 720.into()],
        "P" => page_id,
    });

    let yes_id = appearance_stream(&mut document);
    let off_id = appearance_stream(&mut document);
    let agree_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("agree"),
        "FT" => "Btn",
        "V" => "Off",
        "AS" => "Off",
        "Rect" => vec![50.into(), 650.into(), 70.into(), 670.into()],
        "AP" => dictionary! { "N" => dictionary! { "Yes" => yes_id, "Off" => off_id } },
        "P" => page_id,
    });

    let gender_id = document.new_object_id();
    let mut radio_widgets = Vec::new();
    for (index, state) in ["Male", "Female"].iter().enumerate() {
        let on_id = appearance_stream(&mut document);
        let off_id = appearance_stream(&mut document);
        let left = 50 + 30 * index as i64;
        radio_widgets.push(Object::Reference(document.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => gender_id,
            "AS" => "Off",
            "Rect" => vec![left.into(), 600.into(), (left + 20).into(), 620.into()],
            "AP" => dictionary! { "N" => dictionary! { *state => on_id, "Off" => off_id } },
            "P" => page_id,
        })));
    }
    document.objects.insert(
        gender_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("gender"),
            "FT" => "Btn",
            "Ff" => 49152,
            "Kids" => radio_widgets.clone(),
        }),
    );

    let country_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("country"),
        "FT" => "Ch",
        "Ff" => 131072,
        "Opt" => vec![
            Object::Array(vec![
                Object::string_literal("US"),
                Object::string_literal("United States"),
            ]),
            Object::string_literal("UK"),
            Object::string_literal("FR"),
        ],
        "Rect" => vec![50.into(), 550.into(), 200.into(), 570.into()],
        "P" => page_id,
    });

    let signature_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("signature"),
        "FT" => "Sig",
        "Rect" => vec![50.into(), 500.into(), 200.into(), 520.into()],
        "P" => page_id,
    });

    let taxpayer_id = document.new_object_id();
    let address_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => taxpayer_id,
        "T" => Object::string_literal("address"),
        "Rect" => vec![50.into(), 450.into(), 300.into(), 470.into()],
        "P" => page_id,
    });
    document.objects.insert(
        taxpayer_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("taxpayer"),
            "FT" => "Tx",
            "Kids" => vec![Object::Reference(address_id)],
        }),
    );

    let mut annotations = vec![
        Object::Reference(name_id),
        Object::Reference(agree_id),
    ];
    annotations.extend(radio_widgets);
    annotations.extend([
        Object::Reference(country_id),
        Object::Reference(signature_id),
        Object::Reference(address_id),
    ]);
    document.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Annots" => annotations,
        }),
    );
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let acroform_id = document.add_object(dictionary! {
        "Fields" => vec![
            Object::Reference(name_id),
            Object::Reference(agree_id),
            Object::Reference(gender_id),
            Object::Reference(country_id),
            Object::Reference(signature_id),
            Object::Reference(taxpayer_id),
        ],
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => font_id } },
        "XFA" => Object::string_literal("<xdp:xdp/>"),
    });
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    document.trailer.set("Root", catalog_id);

    document
}

/// Declares one more root field in the interactive form of the document.
pub(crate) fn add_root_field(document: &mut Document, field: Dictionary) -> ObjectId {
    let field_id = document.add_object(field);
    objects::acroform_mut(document)
        .and_then(|acroform| acroform.get_mut(b"Fields").ok())
        .and_then(|fields| fields.as_array_mut().ok())
        .expect("the test document has no form fields")
        .push(Object::Reference(field_id));
    field_id
}

/// A radio group `choice` whose two widgets have the on-states `0` and `1`, labelled by an
/// `/Opt` entry of `Male` and `Female`.
pub(crate) fn add_labelled_radio_group(document: &mut Document) -> ObjectId {
    let choice_id = document.new_object_id();
    let mut widgets = Vec::new();
    for state in ["0", "1"] {
        let on_id = appearance_stream(document);
        let off_id = appearance_stream(document);
        widgets.push(Object::Reference(document.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => choice_id,
            "AS" => "Off",
            "Rect" => vec![50.into(), 400.into(), 70.into(), 420.into()],
            "AP" => dictionary! { "N" => dictionary! { state => on_id, "Off" => off_id } },
        })));
    }
    document.objects.insert(
        choice_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("choice"),
            "FT" => "Btn",
            "Ff" => 49152,
            "Opt" => vec![Object::string_literal("Male"), Object::string_literal("Female")],
            "Kids" => widgets,
        }),
    );
    objects::acroform_mut(document)
        .and_then(|acroform| acroform.get_mut(b"Fields").ok())
        .and_then(|fields| fields.as_array_mut().ok())
        .expect("the test document has no form fields")
        .push(Object::Reference(choice_id));
    choice_id
}

/// A one page document without any interactive form.
pub(crate) fn plain_document() -> Document {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();
    let page_id = document.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document
}

/// Serializes a document, as if it was read from a file.
pub(crate) fn to_bytes(mut document: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .expect("failed to serialize the test document");
    bytes
}
