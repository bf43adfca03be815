//! AcroForm field lookup and value writes.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::HashSet;

use super::appearance;
use super::FieldError;

/// Field flag marking a button field as a push button.
const FF_PUSHBUTTON: i64 = 1 << 16;
/// Field flag marking a button field as a radio group.
const FF_RADIO: i64 = 1 << 15;
const DEFAULT_ON_STATE: &[u8] = b"Yes";

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub id: ObjectId,
    pub name: String,
    pub field_type: Option<Vec<u8>>,
    pub default_appearance: Option<String>,
    pub flags: i64,
    pub widgets: Vec<ObjectId>,
}

impl FormField {
    fn kind(&self) -> String {
        self.field_type
            .as_deref()
            .map(|ft| String::from_utf8_lossy(ft).to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}

fn acro_form(doc: &Document) -> Option<&Dictionary> {
    let root = doc.trailer.get(b"Root").ok()?;
    let (_, catalog) = doc.dereference(root).ok()?;
    let form = catalog.as_dict().ok()?.get(b"AcroForm").ok()?;
    let (_, form) = doc.dereference(form).ok()?;
    form.as_dict().ok()
}

pub fn has_acro_form(doc: &Document) -> bool {
    acro_form(doc).is_some()
}

fn partial_name(dict: &Dictionary) -> Option<String> {
    dict.get(b"T")
        .and_then(Object::as_str)
        .ok()
        .map(decode_text_string)
}

fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// PDFDocEncoding for ASCII, UTF-16BE with a byte order mark otherwise.
pub fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn reference_ids(object: Option<&Object>) -> Vec<ObjectId> {
    object
        .and_then(|o| o.as_array().ok())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_reference().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Every terminal field of the form with its fully qualified name.
pub fn fields(doc: &Document) -> Vec<FormField> {
    let Some(form) = acro_form(doc) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    let mut visited = HashSet::new();
    for id in reference_ids(form.get(b"Fields").ok()) {
        walk(doc, id, None, None, None, 0, &mut visited, &mut found);
    }
    found
}

#[allow(clippy::too_many_arguments)]
fn walk(
    doc: &Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited_type: Option<&[u8]>,
    inherited_da: Option<&str>,
    inherited_flags: i64,
    visited: &mut HashSet<ObjectId>,
    found: &mut Vec<FormField>,
) {
    if !visited.insert(id) {
        return;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return;
    };

    let name = match (parent_name, partial_name(dict)) {
        (Some(parent), Some(partial)) => format!("{parent}.{partial}"),
        (None, Some(partial)) => partial,
        (Some(parent), None) => parent.to_string(),
        (None, None) => return,
    };
    let field_type = dict
        .get(b"FT")
        .and_then(Object::as_name)
        .ok()
        .or(inherited_type);
    let da = dict
        .get(b"DA")
        .and_then(Object::as_str)
        .ok()
        .map(|da| String::from_utf8_lossy(da).to_string())
        .or_else(|| inherited_da.map(str::to_string));
    let flags = dict
        .get(b"Ff")
        .and_then(Object::as_i64)
        .unwrap_or(inherited_flags);

    let kids: Vec<ObjectId> = reference_ids(dict.get(b"Kids").ok())
        .into_iter()
        .filter(|kid| !visited.contains(kid))
        .collect();
    let field_kids: Vec<ObjectId> = kids
        .iter()
        .copied()
        .filter(|kid| {
            doc.get_dictionary(*kid)
                .map(|k| k.has(b"T"))
                .unwrap_or(false)
        })
        .collect();

    if !field_kids.is_empty() {
        for kid in field_kids {
            walk(
                doc,
                kid,
                Some(&name),
                field_type,
                da.as_deref(),
                flags,
                visited,
                found,
            );
        }
        return;
    }

    let widgets = if kids.is_empty() { vec![id] } else { kids };
    found.push(FormField {
        id,
        name,
        field_type: field_type.map(<[u8]>::to_vec),
        default_appearance: da,
        flags,
        widgets,
    });
}

/// Match a fully qualified name first, then a terminal name.
pub fn find_field(doc: &Document, name: &str) -> Result<FormField, FieldError> {
    let all = fields(doc);
    let by_terminal = |f: &FormField| f.name.rsplit('.').next() == Some(name);
    all.iter()
        .find(|f| f.name == name)
        .or_else(|| all.iter().find(|f| by_terminal(f)))
        .cloned()
        .ok_or_else(|| FieldError::Missing(name.to_string()))
}

fn widget_size(doc: &Document, widget: ObjectId) -> (f32, f32) {
    let rect = doc
        .get_dictionary(widget)
        .and_then(|w| w.get(b"Rect"))
        .and_then(Object::as_array)
        .ok()
        .and_then(|r| {
            let values: Vec<f32> = r.iter().filter_map(|v| v.as_float().ok()).collect();
            (values.len() == 4).then(|| {
                (
                    (values[2] - values[0]).abs(),
                    (values[3] - values[1]).abs(),
                )
            })
        });
    rect.unwrap_or((100.0, 20.0))
}

pub fn set_text(doc: &mut Document, name: &str, value: &str) -> Result<(), FieldError> {
    let field = find_field(doc, name)?;
    if field.field_type.as_deref() != Some(b"Tx".as_slice()) {
        return Err(FieldError::WrongType {
            name: name.to_string(),
            expected: "text",
            found: field.kind(),
        });
    }

    let write_error = |e: lopdf::Error| FieldError::Write {
        name: name.to_string(),
        reason: e.to_string(),
    };

    doc.get_dictionary_mut(field.id)
        .map_err(write_error)?
        .set("V", encode_text_string(value));

    for widget in field.widgets {
        let (width, height) = widget_size(doc, widget);
        let stream = appearance::text_appearance(
            value,
            field.default_appearance.as_deref(),
            width,
            height,
        );
        let stream_id = doc.add_object(stream);
        doc.get_dictionary_mut(widget)
            .map_err(write_error)?
            .set("AP", lopdf::dictionary! { "N" => Object::Reference(stream_id) });
    }
    Ok(())
}

/// Name of a widget's "on" appearance state.
fn on_state(doc: &Document, widget: ObjectId) -> Vec<u8> {
    let normal = doc
        .get_dictionary(widget)
        .and_then(|w| w.get(b"AP"))
        .and_then(|ap| doc.dereference(ap))
        .and_then(|(_, ap)| ap.as_dict())
        .and_then(|ap| ap.get(b"N"))
        .and_then(|n| doc.dereference(n))
        .and_then(|(_, n)| n.as_dict());

    normal
        .ok()
        .and_then(|states| {
            states
                .iter()
                .map(|(key, _)| key.clone())
                .find(|key| key.as_slice() != b"Off")
        })
        .unwrap_or_else(|| DEFAULT_ON_STATE.to_vec())
}

pub fn set_checked(doc: &mut Document, name: &str) -> Result<(), FieldError> {
    let field = find_field(doc, name)?;
    let is_checkbox = field.field_type.as_deref() == Some(b"Btn".as_slice())
        && field.flags & (FF_PUSHBUTTON | FF_RADIO) == 0;
    if !is_checkbox {
        return Err(FieldError::WrongType {
            name: name.to_string(),
            expected: "checkbox",
            found: field.kind(),
        });
    }

    let write_error = |e: lopdf::Error| FieldError::Write {
        name: name.to_string(),
        reason: e.to_string(),
    };

    let Some(&first) = field.widgets.first() else {
        return Err(FieldError::Write {
            name: name.to_string(),
            reason: "field has no widgets".to_string(),
        });
    };
    let state = on_state(doc, first);

    doc.get_dictionary_mut(field.id)
        .map_err(write_error)?
        .set("V", Object::Name(state.clone()));
    for widget in field.widgets {
        doc.get_dictionary_mut(widget)
            .map_err(write_error)?
            .set("AS", Object::Name(state.clone()));
    }
    Ok(())
}

/// Ask viewers to regenerate appearances for any field we did not draw.
pub fn set_need_appearances(doc: &mut Document) -> Result<(), lopdf::Error> {
    let root = doc.trailer.get(b"Root")?.as_reference()?;
    let form = doc.get_dictionary(root)?.get(b"AcroForm")?.clone();
    match form {
        Object::Reference(form_id) => doc.get_dictionary_mut(form_id)?,
        _ => doc
            .get_dictionary_mut(root)?
            .get_mut(b"AcroForm")?
            .as_dict_mut()?,
    }
    .set("NeedAppearances", true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn form_with(fields: Vec<Dictionary>) -> Document {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.new_object_id();
        let mut refs = Vec::new();
        for mut field in fields {
            field.set("P", Object::Reference(page_id));
            refs.push(Object::Reference(doc.add_object(field)));
        }
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        });
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Annots" => refs.clone(),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => dictionary! { "Fields" => refs },
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn text_field(name: &str) -> Dictionary {
        dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal(name),
            "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
            "Rect" => vec![100.into(), 700.into(), 300.into(), 720.into()],
        }
    }

    #[test]
    fn test_set_text_writes_value_and_appearance() {
        let mut doc = form_with(vec![text_field("Name")]);
        set_text(&mut doc, "Name", "Jane Buyer").unwrap();

        let field = find_field(&doc, "Name").unwrap();
        let dict = doc.get_dictionary(field.id).unwrap();
        assert_eq!(dict.get(b"V").unwrap().as_str().unwrap(), b"Jane Buyer");
        assert!(dict.get(b"AP").unwrap().as_dict().unwrap().has(b"N"));
    }

    #[test]
    fn test_missing_and_mistyped_fields() {
        let mut doc = form_with(vec![text_field("Name")]);
        assert_eq!(
            set_text(&mut doc, "StartDate", "01/01/2024"),
            Err(FieldError::Missing("StartDate".to_string()))
        );
        assert!(matches!(
            set_checked(&mut doc, "Name"),
            Err(FieldError::WrongType { expected: "checkbox", .. })
        ));
    }

    #[test]
    fn test_checkbox_uses_widget_on_state() {
        let on = dictionary! {};
        let mut doc = form_with(vec![dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal("Residential"),
            "AS" => "Off",
            "AP" => dictionary! {
                "N" => dictionary! { "Off" => on.clone(), "On" => on },
            },
        }]);
        set_checked(&mut doc, "Residential").unwrap();

        let field = find_field(&doc, "Residential").unwrap();
        let dict = doc.get_dictionary(field.id).unwrap();
        assert_eq!(dict.get(b"V").unwrap().as_name().unwrap(), b"On");
        assert_eq!(dict.get(b"AS").unwrap().as_name().unwrap(), b"On");
    }

    #[test]
    fn test_hierarchical_names_match_terminal_part() {
        let parent = dictionary! {
            "T" => Object::string_literal("agreement"),
            "FT" => "Tx",
        };
        let mut doc = form_with(vec![]);
        let kid_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("SigDate"),
            "Subtype" => "Widget",
            "Rect" => vec![0.into(), 0.into(), 80.into(), 14.into()],
        });
        let mut parent = parent;
        parent.set("Kids", vec![Object::Reference(kid_id)]);
        let parent_id = doc.add_object(parent);
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(root)
            .unwrap()
            .get_mut(b"AcroForm")
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Fields", vec![Object::Reference(parent_id)]);

        let field = find_field(&doc, "SigDate").unwrap();
        assert_eq!(field.name, "agreement.SigDate");
        assert_eq!(field.field_type.as_deref(), Some(b"Tx".as_slice()));
        set_text(&mut doc, "SigDate", "05/01/2024").unwrap();
    }

    #[test]
    fn test_cyclic_kids_are_visited_once() {
        let mut doc = form_with(vec![]);
        let parent_id = doc.new_object_id();
        let kid_id = doc.add_object(dictionary! {
            "T" => Object::string_literal("Loop"),
            "FT" => "Tx",
            "Kids" => vec![Object::Reference(parent_id)],
        });
        doc.objects.insert(
            parent_id,
            Object::Dictionary(dictionary! {
                "T" => Object::string_literal("agreement"),
                "Kids" => vec![Object::Reference(kid_id)],
            }),
        );
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        doc.get_dictionary_mut(root)
            .unwrap()
            .get_mut(b"AcroForm")
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Fields", vec![Object::Reference(parent_id)]);

        let found = fields(&doc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "agreement.Loop");
    }

    #[test]
    fn test_utf16_for_non_ascii_values() {
        match encode_text_string("Zoë") {
            Object::String(bytes, _) => assert_eq!(&bytes[..2], &[0xFE, 0xFF]),
            other => panic!("unexpected object: {other:?}"),
        }
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x41]), "A");
    }
}
