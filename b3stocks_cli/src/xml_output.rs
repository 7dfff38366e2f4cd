use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::io::Cursor;

/// Child element name for items of an array field.
fn singular(field: &str) -> &str {
    match field {
        "tickers" | "defaults" => "ticker",
        "periods" => "period",
        "bars" => "bar",
        "rows" => "row",
        "values" => "value",
        "failures" => "failure",
        "empty" => "ticker",
        "cumulative_ranking" | "volatility_ranking" | "variation_ranking" => "entry",
        "sentences" => "sentence",
        _ => field,
    }
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Recursively write a serde_json::Value as XML elements.
///
/// Null object fields are omitted. Null array items become empty elements
/// so positions in matrix rows are kept.
fn write_value<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    value: &serde_json::Value,
) -> Result<(), quick_xml::Error> {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Bool(b) => write_text(writer, tag, if *b { "true" } else { "false" })?,
        serde_json::Value::Number(n) => write_text(writer, tag, &n.to_string())?,
        serde_json::Value::String(s) => write_text(writer, tag, s)?,
        serde_json::Value::Array(arr) => {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            let child_tag = singular(tag);
            for item in arr {
                if item.is_null() {
                    writer.write_event(Event::Empty(BytesStart::new(child_tag)))?;
                } else {
                    write_value(writer, child_tag, item)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
        serde_json::Value::Object(map) => {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            for (key, val) in map {
                write_value(writer, key, val)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
    }
    Ok(())
}

/// Serialize a value into an XML document rooted at `root_tag`.
pub fn to_xml<T: Serialize>(root_tag: &str, value: &T) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .context("write xml declaration")?;

    let val = serde_json::to_value(value).context("serialize to json value")?;
    if val.is_null() || val.as_array().is_some_and(|a| a.is_empty()) {
        writer
            .write_event(Event::Empty(BytesStart::new(root_tag)))
            .context("write empty root")?;
    } else {
        write_value(&mut writer, root_tag, &val).context("write xml value")?;
    }

    let buf = writer.into_inner().into_inner();
    String::from_utf8(buf).context("xml output is not valid UTF-8")
}
