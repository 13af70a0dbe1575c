//! XML encoding of [`Snapshot`].
//!
//! Layout:
//!
//! ```text
//! <snapshot version="1.0">
//!   <canvas originX=".." originY=".." originZ=".."/>
//!   <nodes><node id=".." .../></nodes>
//!   <edges><edge id=".." .../></edges>
//!   <parts><part id=".." .../></parts>
//!   <components><component id=".." .../></components>
//!   <rootComponent children="id,id"/>
//!   <bones><bone id=".." .../></bones>
//!   <boneIdList><boneId id=".."/></boneIdList>
//! </snapshot>
//! ```
//!
//! Every record is an empty element whose attributes are exactly the
//! record's key/value pairs. Records without an `id` attribute are
//! ignored on load; unknown elements are skipped.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, XmlError};
use crate::{Attributes, RecordMap, Snapshot};

/// Format version written on the root element.
pub const FORMAT_VERSION: &str = "1.0";

const ROOT: &[u8] = b"snapshot";

/// Encode a snapshot as an indented XML document.
pub fn save_snapshot_to_xml_string(snapshot: &Snapshot) -> Result<String> {
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(Cursor::new(&mut buffer), b' ', 2);

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut root = BytesStart::new("snapshot");
    root.push_attribute(("version", FORMAT_VERSION));
    write(&mut writer, Event::Start(root))?;

    if !snapshot.canvas.is_empty() {
        write_record(&mut writer, "canvas", &snapshot.canvas)?;
    }
    write_section(&mut writer, "nodes", "node", &snapshot.nodes)?;
    write_section(&mut writer, "edges", "edge", &snapshot.edges)?;
    write_section(&mut writer, "parts", "part", &snapshot.parts)?;
    write_section(&mut writer, "components", "component", &snapshot.components)?;
    write_record(&mut writer, "rootComponent", &snapshot.root_component)?;
    write_section(&mut writer, "bones", "bone", &snapshot.bones)?;

    if !snapshot.bone_id_list.is_empty() {
        write(&mut writer, Event::Start(BytesStart::new("boneIdList")))?;
        for id in &snapshot.bone_id_list {
            let mut element = BytesStart::new("boneId");
            element.push_attribute(("id", id.as_str()));
            write(&mut writer, Event::Empty(element))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("boneIdList")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("snapshot")))?;

    Ok(String::from_utf8(buffer)?)
}

fn write<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

fn write_record<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    attributes: &Attributes,
) -> Result<()> {
    let mut element = BytesStart::new(name);
    for (key, value) in attributes {
        element.push_attribute((key.as_str(), value.as_str()));
    }
    write(writer, Event::Empty(element))
}

fn write_section<W: std::io::Write>(
    writer: &mut Writer<W>,
    section: &str,
    item: &str,
    records: &RecordMap,
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    write(writer, Event::Start(BytesStart::new(section)))?;
    for record in records.values() {
        write_record(writer, item, record)?;
    }
    write(writer, Event::End(BytesEnd::new(section)))
}

/// Decode a snapshot from XML text.
pub fn load_snapshot_from_xml_string(content: &str) -> Result<Snapshot> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut snapshot = Snapshot::new();
    let mut seen_root = false;

    loop {
        let event = reader.read_event().map_err(|e| XmlError::Parse {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.name();
                if !seen_root {
                    if name.as_ref() != ROOT {
                        return Err(XmlError::UnexpectedRoot(
                            String::from_utf8_lossy(name.as_ref()).into_owned(),
                        ));
                    }
                    seen_root = true;
                    continue;
                }
                match name.as_ref() {
                    b"canvas" => snapshot.canvas = read_attributes(e),
                    b"rootComponent" => snapshot.root_component = read_attributes(e),
                    b"node" => insert_record(&mut snapshot.nodes, read_attributes(e)),
                    b"edge" => insert_record(&mut snapshot.edges, read_attributes(e)),
                    b"part" => insert_record(&mut snapshot.parts, read_attributes(e)),
                    b"component" => {
                        insert_record(&mut snapshot.components, read_attributes(e))
                    }
                    b"bone" => insert_record(&mut snapshot.bones, read_attributes(e)),
                    b"boneId" => {
                        if let Some(id) = read_attributes(e).remove("id") {
                            snapshot.bone_id_list.push(id);
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.name().as_ref() == ROOT => break,
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(XmlError::MissingRoot);
    }
    Ok(snapshot)
}

fn read_attributes(element: &BytesStart<'_>) -> Attributes {
    let mut attributes = Attributes::new();
    for attr in element.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attributes.insert(key, value);
    }
    attributes
}

fn insert_record(records: &mut RecordMap, attributes: Attributes) {
    let Some(id) = attributes.get("id").cloned() else {
        return;
    };
    records.insert(id, attributes);
}

/// True when `content` looks like it carries at least one node record.
pub fn contains_node_records(content: &str) -> bool {
    content.contains("<node ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.canvas.insert("originX".into(), "0.500000".into());
        for (id, x) in [("n1", "0.0"), ("n2", "1.0")] {
            let mut node = Attributes::new();
            node.insert("id".into(), id.into());
            node.insert("x".into(), x.into());
            node.insert("partId".into(), "p1".into());
            snapshot.nodes.insert(id.into(), node);
        }
        let mut edge = Attributes::new();
        edge.insert("id".into(), "e1".into());
        edge.insert("from".into(), "n1".into());
        edge.insert("to".into(), "n2".into());
        edge.insert("partId".into(), "p1".into());
        snapshot.edges.insert("e1".into(), edge);
        let mut part = Attributes::new();
        part.insert("id".into(), "p1".into());
        part.insert("name".into(), "Arm & \"hand\" <left>".into());
        snapshot.parts.insert("p1".into(), part);
        let mut component = Attributes::new();
        component.insert("id".into(), "c1".into());
        component.insert("linkData".into(), "p1".into());
        component.insert("linkDataType".into(), "partId".into());
        snapshot.components.insert("c1".into(), component);
        snapshot
            .root_component
            .insert("children".into(), "c1".into());
        let mut bone = Attributes::new();
        bone.insert("id".into(), "b1".into());
        bone.insert("jointNodeIdList".into(), "n1,n2".into());
        snapshot.bones.insert("b1".into(), bone);
        snapshot.bone_id_list.push("b1".into());
        snapshot
    }

    #[test]
    fn test_xml_roundtrip() {
        let snapshot = sample();
        let xml = save_snapshot_to_xml_string(&snapshot).unwrap();
        assert!(xml.contains("<snapshot version=\"1.0\">"));
        assert!(contains_node_records(&xml));
        let restored = load_snapshot_from_xml_string(&xml).unwrap();
        assert_eq!(snapshot, restored);
    }

    #[test]
    fn test_escaped_attribute_values_survive() {
        let xml = save_snapshot_to_xml_string(&sample()).unwrap();
        let restored = load_snapshot_from_xml_string(&xml).unwrap();
        assert_eq!(restored.parts["p1"]["name"], "Arm & \"hand\" <left>");
    }

    #[test]
    fn test_empty_snapshot() {
        let xml = save_snapshot_to_xml_string(&Snapshot::new()).unwrap();
        assert!(!contains_node_records(&xml));
        let restored = load_snapshot_from_xml_string(&xml).unwrap();
        assert!(restored.is_empty());
    }

    #[test]
    fn test_records_without_id_are_skipped() {
        let xml = r#"<snapshot><nodes><node x="1"/><node id="a" x="2"/></nodes></snapshot>"#;
        let snapshot = load_snapshot_from_xml_string(xml).unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.nodes["a"]["x"], "2");
    }

    #[test]
    fn test_wrong_root_rejected() {
        let err = load_snapshot_from_xml_string("<model/>").unwrap_err();
        assert!(matches!(err, XmlError::UnexpectedRoot(ref name) if name == "model"));
        let err = load_snapshot_from_xml_string("").unwrap_err();
        assert!(matches!(err, XmlError::MissingRoot));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        let err = load_snapshot_from_xml_string("<snapshot><nodes></edges></snapshot>").unwrap_err();
        assert!(matches!(err, XmlError::Parse { .. }));
    }
}
