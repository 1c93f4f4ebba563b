//! Small helpers over `lopdf` objects which are shared by the form modules: resolving
//! references, walking inheritable entries and converting PDF text strings.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// Maximum number of `/Parent` links followed when looking for an inheritable entry.
const MAXIMUM_PARENT_DEPTH: usize = 64;

/// Follows a reference to the object it points to, non-reference objects are returned as they are.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(object_id) => document.get_object(*object_id).ok(),
        other => Some(other),
    }
}

/// Retrieves the entry of a dictionary, already resolved.
pub(crate) fn entry<'a>(
    document: &'a Document,
    dictionary: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    resolve(document, dictionary.get(key).ok()?)
}

/// Retrieves the entry of a dictionary as another dictionary, already resolved.
pub(crate) fn dictionary_entry<'a>(
    document: &'a Document,
    dictionary: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    entry(document, dictionary, key)?.as_dict().ok()
}

/// Retrieves the dictionary stored at the given object identifier. Streams are not dictionaries.
pub(crate) fn dictionary_at(document: &Document, object_id: ObjectId) -> Option<&Dictionary> {
    document.get_object(object_id).ok()?.as_dict().ok()
}

/// Looks up an entry on a field dictionary or, if absent, on its ancestors through `/Parent`.
pub(crate) fn inherited_entry<'a>(
    document: &'a Document,
    dictionary: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dictionary;
    for _ in 0..MAXIMUM_PARENT_DEPTH {
        if let Some(object) = entry(document, current, key) {
            return Some(object);
        }
        current = dictionary_entry(document, current, b"Parent")?;
    }

    None
}

/// The identifier of the document catalog, referenced by the trailer's `/Root`.
pub(crate) fn catalog_id(document: &Document) -> Option<ObjectId> {
    match document.trailer.get(b"Root").ok()? {
        Object::Reference(object_id) => Some(*object_id),
        _ => None,
    }
}

/// The interactive form dictionary of the document, if there is one.
pub(crate) fn acroform(document: &Document) -> Option<&Dictionary> {
    let catalog = dictionary_at(document, catalog_id(document)?)?;
    dictionary_entry(document, catalog, b"AcroForm")
}

/// The interactive form dictionary of the document for in-place modification.
pub(crate) fn acroform_mut(document: &mut Document) -> Option<&mut Dictionary> {
    let catalog_id = catalog_id(document)?;
    let acroform_reference = match dictionary_at(document, catalog_id)?.get(b"AcroForm").ok()? {
        Object::Reference(object_id) => Some(*object_id),
        _ => None,
    };

    match acroform_reference {
        Some(object_id) => document.get_object_mut(object_id).ok()?.as_dict_mut().ok(),
        None => document
            .get_object_mut(catalog_id)
            .ok()?
            .as_dict_mut()
            .ok()?
            .get_mut(b"AcroForm")
            .ok()?
            .as_dict_mut()
            .ok(),
    }
}

/// Reads a numeric object as a float, whether it is stored as an integer or as a real.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(integer) => Some(*integer as f32),
        Object::Real(real) => Some(*real as f32),
        _ => None,
    }
}

/// Reads a rectangle entry such as `/Rect` or `/BBox`, normalized so that the lower-left corner comes first.
pub(crate) fn rectangle(
    document: &Document,
    dictionary: &Dictionary,
    key: &[u8],
) -> Option<[f32; 4]> {
    let array = entry(document, dictionary, key)?.as_array().ok()?;
    let coordinates = array
        .iter()
        .map(|object| resolve(document, object).and_then(number))
        .collect::<Option<Vec<_>>>()?;
    match coordinates[..] {
        [x0, y0, x1, y1] => Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]),
        _ => None,
    }
}

/// Reads an integer entry, resolving references.
pub(crate) fn integer(object: &Object) -> Option<i64> {
    match object {
        Object::Integer(integer) => Some(*integer),
        _ => None,
    }
}

/// Reads a name or a string object as text, as found in `/V`, `/T` and `/Opt` entries.
pub(crate) fn text(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decodes a PDF text string, which is either UTF-16BE with a byte order mark or a single-byte encoding.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let code_units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&code_units)
        }
        _ => bytes.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// Encodes text as a PDF text string: single bytes when every character fits into Latin-1,
/// UTF-16BE with a byte order mark otherwise.
pub(crate) fn encode_text_string(text: &str) -> Object {
    match latin1_bytes(text) {
        Some(bytes) => Object::String(bytes, StringFormat::Literal),
        None => {
            let mut bytes = vec![0xFE, 0xFF];
            for code_unit in text.encode_utf16() {
                bytes.extend_from_slice(&code_unit.to_be_bytes());
            }
            Object::String(bytes, StringFormat::Hexadecimal)
        }
    }
}

/// Converts text to Latin-1 bytes, failing if any character falls outside of it.
pub(crate) fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|character| u8::try_from(u32::from(character)).ok())
        .collect()
}
