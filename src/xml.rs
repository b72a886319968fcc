//! XML to XML-derived JSON projection.
//!
//! The vendor serves CVRF as XML while cached documents are stored in the
//! JSON projection of that XML: attributes become `@name` keys, element text
//! becomes `#text` (or the whole value when the element has neither
//! attributes nor children), and repeated sibling elements become arrays.
//! Converting network documents into the same projection lets every source
//! feed the same decoder.

use crate::error::{AdvisoryError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: Map::new(),
            text: String::new(),
        }
    }

    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut frame = Self::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| AdvisoryError::xml(e.to_string()))?;
            let key = format!("@{}", String::from_utf8_lossy(attribute.key.as_ref()));
            let value = attribute
                .unescape_value()
                .map_err(|e| AdvisoryError::xml(e.to_string()))?;
            frame.fields.insert(key, Value::String(value.into_owned()));
        }
        Ok(frame)
    }

    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.fields.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(fields)
        }
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self.fields.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }
}

/// Project an XML document into its JSON form.
pub fn to_json(xml: &[u8]) -> Result<Value> {
    let xml = std::str::from_utf8(xml).map_err(|e| AdvisoryError::xml(e.to_string()))?;
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));

    // The bottom frame collects the root element.
    let mut stack = vec![Frame::new(String::new())];

    loop {
        match reader
            .read_event()
            .map_err(|e| AdvisoryError::xml(format!("at byte {}: {}", reader.buffer_position(), e)))?
        {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let frame = Frame::open(&start)?;
                let name = frame.name.clone();
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(name, frame.into_value());
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| AdvisoryError::xml(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(AdvisoryError::xml("unbalanced closing tag"));
                }
                if let Some(frame) = stack.pop() {
                    let name = frame.name.clone();
                    if let Some(parent) = stack.last_mut() {
                        parent.push_child(name, frame.into_value());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(AdvisoryError::xml("unexpected end of document"));
    }

    let root = stack.pop().map(|frame| frame.fields).unwrap_or_default();
    if root.is_empty() {
        return Err(AdvisoryError::xml("document has no root element"));
    }
    Ok(Value::Object(root))
}
