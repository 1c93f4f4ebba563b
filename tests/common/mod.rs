#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

/// Serializes a one page form with a text field `taxpayer`, a checkbox `agree` and a dropdown
/// `state` offering `CA` and `NY`.
pub fn form_bytes() -> Vec<u8> {
    let mut document = Document::with_version("1.7");
    let pages_id = document.new_object_id();
    let page_id = document.new_object_id();

    let content_id = document.add_object(Stream::new(dictionary! {}, b"0 0 m 10 10 l S".to_vec()));
    let checked_id = document.add_object(Stream::new(
        dictionary! { "BBox" => vec![0.into(), 0.into(), 20.into(), 20.into()] },
        b"0 g 4 4 12 12 re f".to_vec(),
    ));
    let unchecked_id = document.add_object(Stream::new(
        dictionary! { "BBox" => vec![0.into(), 0.into(), 20.into(), 20.into()] },
        Vec::new(),
    ));

    let taxpayer_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("taxpayer"),
        "FT" => "Tx",
        "Rect" => vec![50.into(), 700.into(), 250.into(), 720.into()],
        "P" => page_id,
    });
    let agree_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("agree"),
        "FT" => "Btn",
        "AS" => "Off",
        "Rect" => vec![50.into(), 650.into(), 70.into(), 670.into()],
        "AP" => dictionary! { "N" => dictionary! { "On" => checked_id, "Off" => unchecked_id } },
        "P" => page_id,
    });
    let state_id = document.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("state"),
        "FT" => "Ch",
        "Ff" => 1 << 17,
        "Opt" => vec![Object::string_literal("CA"), Object::string_literal("NY")],
        "Rect" => vec![50.into(), 600.into(), 150.into(), 620.into()],
        "P" => page_id,
    });

    document.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Annots" => vec![
                Object::Reference(taxpayer_id),
                Object::Reference(agree_id),
                Object::Reference(state_id),
            ],
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
            Object::Reference(taxpayer_id),
            Object::Reference(agree_id),
            Object::Reference(state_id),
        ],
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
    });
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .expect("failed to serialize the test form");
    bytes
}

/// Parses a JSON object literal into a value map.
pub fn value_map(json: serde_json::Value) -> acrofill::filler::ValueMap {
    match json {
        serde_json::Value::Object(values) => values,
        other => panic!("expected a JSON object, got {}", other),
    }
}
