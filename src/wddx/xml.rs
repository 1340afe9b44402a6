//! XML form of a [`Packet`].
//!
//! Output is written with `quick-xml` and has no XML declaration. Input is read with
//! `roxmltree`; only malformed XML is an error, anything the WDDX vocabulary does not
//! cover simply produces no value.
use std::fmt::Display;

use quick_xml::{
    Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use roxmltree::{Document, Node};

use super::{MAX_ARRAY_LEN, Packet, Value, WddxError, format_number};

const STRUCT_TYPE: &str = "java.util.HashMap";

fn xml_error(e: impl Display) -> WddxError {
    WddxError::Xml(e.to_string())
}

pub fn to_xml(packet: &Packet) -> Result<String, WddxError> {
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("wddxPacket");
    root.push_attribute(("version", "1.0"));
    writer.write_event(Event::Start(root)).map_err(xml_error)?;
    write_container(&mut writer, BytesStart::new("header"), packet.header())?;
    write_container(&mut writer, BytesStart::new("data"), packet.data())?;
    writer
        .write_event(Event::End(BytesEnd::new("wddxPacket")))
        .map_err(xml_error)?;

    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

pub fn value_to_xml(value: &Value) -> Result<String, WddxError> {
    let mut writer = Writer::new(Vec::new());
    write_value(&mut writer, value)?;
    String::from_utf8(writer.into_inner()).map_err(xml_error)
}

/// Writes `start` wrapping `value`, or an empty element when there is nothing inside.
fn write_container(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    value: Option<&Value>,
) -> Result<(), WddxError> {
    let Some(value) = value else {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    };

    let end = start.to_end().into_owned();
    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    write_value(writer, value)?;
    writer.write_event(Event::End(end)).map_err(xml_error)
}

fn write_value(writer: &mut Writer<Vec<u8>>, value: &Value) -> Result<(), WddxError> {
    match value {
        Value::Boolean(b) => {
            let mut element = BytesStart::new("boolean");
            element.push_attribute(("value", if *b { "true" } else { "false" }));
            writer.write_event(Event::Empty(element)).map_err(xml_error)
        }
        Value::Number(n) => write_text(writer, "number", &format_number(*n)),
        Value::String(s) => write_string(writer, s),
        Value::Array(items) => {
            let length = items.len().to_string();
            let mut element = BytesStart::new("array");
            element.push_attribute(("length", length.as_str()));

            if items.iter().all(Option::is_none) {
                return writer.write_event(Event::Empty(element)).map_err(xml_error);
            }
            writer.write_event(Event::Start(element)).map_err(xml_error)?;
            for item in items.iter().flatten() {
                write_value(writer, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("array")))
                .map_err(xml_error)
        }
        Value::Struct(fields) => {
            let mut element = BytesStart::new("struct");
            element.push_attribute(("type", STRUCT_TYPE));

            if fields.is_empty() {
                return writer.write_event(Event::Empty(element)).map_err(xml_error);
            }
            writer.write_event(Event::Start(element)).map_err(xml_error)?;
            for (name, value) in fields {
                let mut var = BytesStart::new("var");
                var.push_attribute(("name", name.as_str()));
                write_container(writer, var, value.as_ref())?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("struct")))
                .map_err(xml_error)
        }
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), WddxError> {
    if text.is_empty() {
        return writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(xml_error);
    }
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_error)
}

/// Strings carry control characters XML cannot hold as `<char code="hh"/>`.
fn write_string(writer: &mut Writer<Vec<u8>>, s: &str) -> Result<(), WddxError> {
    if !s.chars().any(needs_char_element) {
        return write_text(writer, "string", s);
    }

    writer
        .write_event(Event::Start(BytesStart::new("string")))
        .map_err(xml_error)?;
    let mut run = String::new();
    for c in s.chars() {
        if !needs_char_element(c) {
            run.push(c);
            continue;
        }
        if !run.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&run)))
                .map_err(xml_error)?;
            run.clear();
        }
        let code = format!("{:02x}", u32::from(c));
        let mut element = BytesStart::new("char");
        element.push_attribute(("code", code.as_str()));
        writer.write_event(Event::Empty(element)).map_err(xml_error)?;
    }
    if !run.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&run)))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("string")))
        .map_err(xml_error)
}

fn needs_char_element(c: char) -> bool {
    c.is_ascii_control() && !matches!(c, '\t' | '\n' | '\r')
}

pub fn from_xml(text: &str) -> Result<Packet, WddxError> {
    let doc = Document::parse(text).map_err(xml_error)?;
    let root = doc.root_element();
    if root.tag_name().name() != "wddxPacket" {
        return Ok(Packet::default());
    }

    Ok(Packet {
        header: child_element(root, "header").and_then(container_value),
        data: child_element(root, "data").and_then(container_value),
    })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Value held by a `<header>`, `<data>` or `<var>`: its first element child.
fn container_value(node: Node<'_, '_>) -> Option<Value> {
    node.children().find(Node::is_element).and_then(parse_value)
}

fn parse_value(node: Node<'_, '_>) -> Option<Value> {
    match node.tag_name().name() {
        "boolean" => match node.attribute("value")? {
            "true" => Some(Value::Boolean(true)),
            "false" => Some(Value::Boolean(false)),
            _ => None,
        },
        "number" => text_content(node).trim().parse().ok().map(Value::Number),
        "string" => Some(Value::String(string_content(node))),
        "array" => {
            let elements = node.children().filter(Node::is_element);
            let length = match node.attribute("length") {
                Some(length) => length.trim().parse::<usize>().ok()?,
                None => elements.clone().count(),
            }
            .min(MAX_ARRAY_LEN);

            let mut items = vec![None; length];
            for (slot, child) in items.iter_mut().zip(elements) {
                *slot = parse_value(child);
            }
            Some(Value::Array(items))
        }
        "struct" => {
            let mut fields: Vec<(String, Option<Value>)> = Vec::new();
            for var in node
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "var")
            {
                let Some(name) = var.attribute("name") else {
                    continue;
                };
                let value = container_value(var);
                match fields.iter_mut().find(|(n, _)| n == name) {
                    Some(field) => field.1 = value,
                    None => fields.push((name.to_string(), value)),
                }
            }
            Some(Value::Struct(fields))
        }
        _ => None,
    }
}

fn text_content(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn string_content(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.children() {
        if child.is_text() {
            out.push_str(child.text().unwrap_or_default());
        } else if child.is_element() && child.tag_name().name() == "char" {
            let code = child
                .attribute("code")
                .and_then(|c| u32::from_str_radix(c, 16).ok())
                .and_then(char::from_u32);
            if let Some(c) = code {
                out.push(c);
            }
        }
    }
    out
}
