//! MRML scene files.
//!
//! ```text
//! <MRML version="Slicer4">
//!   <Volume id="vtkMRMLScalarVolumeNode1" name="CT" references="display:vtkMRMLScalarVolumeDisplayNode1"/>
//!   <VolumeDisplay id="vtkMRMLScalarVolumeDisplayNode1" window="400" level="40"/>
//! </MRML>
//! ```
//!
//! One element per node, named by the node type's tag, with the node's
//! serialized attributes as XML attributes. Elements nested inside a node
//! element are read as further records in document order.

use super::Scene;
use crate::error::{MrmlError, Result};
use crate::node::attributes::AttributeList;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;

const ROOT_TAG: &str = "MRML";

/// One serialized node: element name plus attributes, `id` included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub tag: String,
    pub attributes: AttributeList,
}

impl NodeRecord {
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id")
    }
}

/// A parsed (or captured) scene, not yet bound to any node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSnapshot {
    pub version: String,
    pub records: Vec<NodeRecord>,
}

impl SceneSnapshot {
    /// Parses scene text. Fails on malformed XML, a missing or foreign root
    /// element, or a node element without `id`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut version = None;
        let mut records = Vec::new();
        let mut depth = 0usize;
        let mut root_closed = false;

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event()
                .map_err(|e| MrmlError::parse_at(position, e.to_string()))?;
            match event {
                Event::Start(element) if depth == 0 => {
                    version = Some(read_root(&reader, &element, position, root_closed)?);
                    depth = 1;
                }
                Event::Empty(element) if depth == 0 => {
                    version = Some(read_root(&reader, &element, position, root_closed)?);
                    root_closed = true;
                }
                Event::Start(element) => {
                    records.push(read_record(&reader, &element, position)?);
                    depth += 1;
                }
                Event::Empty(element) => {
                    records.push(read_record(&reader, &element, position)?);
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        root_closed = true;
                    }
                }
                Event::Text(content) if depth == 0 && !content.is_empty() => {
                    return Err(MrmlError::parse_at(position, "text outside the MRML root"));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if depth != 0 {
            return Err(MrmlError::parse_at(
                text.len() as u64,
                "unexpected end of file inside an element",
            ));
        }
        let version = version.ok_or_else(|| MrmlError::parse("missing <MRML> root element"))?;
        Ok(Self { version, records })
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;

        let mut root = BytesStart::new(ROOT_TAG);
        root.push_attribute(("version", self.version.as_str()));
        if self.records.is_empty() {
            writer.write_event(Event::Empty(root)).map_err(write_error)?;
        } else {
            writer.write_event(Event::Start(root)).map_err(write_error)?;
            for record in &self.records {
                let mut element = BytesStart::new(record.tag.as_str());
                for (key, value) in record.attributes.iter() {
                    element.push_attribute((key, value));
                }
                writer.write_event(Event::Empty(element)).map_err(write_error)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(ROOT_TAG)))
                .map_err(write_error)?;
        }

        let mut out = String::from_utf8(writer.into_inner())
            .map_err(|e| MrmlError::Xml(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

fn write_error(err: impl std::fmt::Display) -> MrmlError {
    MrmlError::Xml(err.to_string())
}

/// Validates the root element and returns its `version`.
fn read_root(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    position: u64,
    root_closed: bool,
) -> Result<String> {
    if root_closed {
        return Err(MrmlError::parse_at(position, "content after the MRML root"));
    }
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    if tag != ROOT_TAG {
        return Err(MrmlError::parse_at(
            position,
            format!("expected <{}> root, found <{}>", ROOT_TAG, tag),
        ));
    }
    let attributes = read_attributes(reader, element, position)?;
    Ok(attributes.get("version").unwrap_or_default().to_string())
}

fn read_attributes(
    reader: &Reader<&[u8]>,
    element: &BytesStart<'_>,
    position: u64,
) -> Result<AttributeList> {
    let mut out = AttributeList::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| MrmlError::parse_at(position, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| MrmlError::parse_at(position, e.to_string()))?;
        out.push(key, value.into_owned());
    }
    Ok(out)
}

fn read_record(reader: &Reader<&[u8]>, element: &BytesStart<'_>, position: u64) -> Result<NodeRecord> {
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let attributes = read_attributes(reader, element, position)?;
    match attributes.get("id") {
        Some(id) if !id.is_empty() => Ok(NodeRecord { tag, attributes }),
        _ => Err(MrmlError::parse_at(
            position,
            format!("<{}> element has no id", tag),
        )),
    }
}

impl Scene {
    /// Captures the scene as records, in node order.
    pub fn snapshot(&self) -> SceneSnapshot {
        let records = self
            .nodes()
            .iter()
            .filter_map(|node| {
                let id = node.id()?;
                let mut attributes = AttributeList::new();
                attributes.push("id", id.to_string());
                for (key, value) in node.write_attributes() {
                    attributes.push(key, value);
                }
                Some(NodeRecord {
                    tag: node.tag_name().to_string(),
                    attributes,
                })
            })
            .collect();
        SceneSnapshot {
            version: self.config().version.clone(),
            records,
        }
    }

    pub fn write_string(&self) -> Result<String> {
        self.snapshot().to_xml()
    }

    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let xml = self.write_string()?;
        fs::write(path.as_ref(), xml).map_err(MrmlError::Io)?;
        tracing::info!(path = %path.as_ref().display(), nodes = self.len(), "scene written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MRML version="Slicer4">
  <Volume id="vtkMRMLScalarVolumeNode1" name="CT &amp; PET" references="display:vtkMRMLScalarVolumeDisplayNode1"/>
  <VolumeDisplay id="vtkMRMLScalarVolumeDisplayNode1" window="400"></VolumeDisplay>
</MRML>
"#;

    #[test]
    fn parses_records_in_order() {
        let snapshot = SceneSnapshot::parse(SAMPLE).unwrap();
        assert_eq!(snapshot.version, "Slicer4");
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.records[0].tag, "Volume");
        assert_eq!(snapshot.records[0].attributes.get("name"), Some("CT & PET"));
        assert_eq!(snapshot.records[1].id(), Some("vtkMRMLScalarVolumeDisplayNode1"));
    }

    #[test]
    fn written_text_parses_back() {
        let snapshot = SceneSnapshot::parse(SAMPLE).unwrap();
        let text = snapshot.to_xml().unwrap();
        assert!(text.contains("CT &amp; PET"));
        assert_eq!(SceneSnapshot::parse(&text).unwrap(), snapshot);
    }

    #[test]
    fn empty_scene_round_trips() {
        let snapshot = SceneSnapshot {
            version: "Slicer4".into(),
            records: Vec::new(),
        };
        let text = snapshot.to_xml().unwrap();
        assert_eq!(SceneSnapshot::parse(&text).unwrap(), snapshot);
        assert!(SceneSnapshot::parse("<MRML/>").unwrap().records.is_empty());
    }

    #[test]
    fn rejects_missing_ids() {
        let err = SceneSnapshot::parse(r#"<MRML><Volume name="x"/></MRML>"#).unwrap_err();
        assert!(err.to_string().contains("no id"), "{}", err);
    }

    #[test]
    fn rejects_foreign_roots_and_truncation() {
        assert!(SceneSnapshot::parse("<Scene/>").is_err());
        assert!(SceneSnapshot::parse("").is_err());
        assert!(SceneSnapshot::parse(r#"<MRML><Volume id="a"/>"#).is_err());
        assert!(SceneSnapshot::parse(r#"<MRML></Volume>"#).is_err());
        assert!(SceneSnapshot::parse(r#"<MRML/><MRML/>"#).is_err());
    }
}
