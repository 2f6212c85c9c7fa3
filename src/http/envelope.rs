//! Builds the `<FooResponse>` / `<ResponseMetadata>` XML envelope every
//! successful action response shares, in the same `quick_xml::Writer` style
//! as the teacher's metadata XML writer: `Writer::new_with_indent` plus
//! explicit `BytesStart`/`BytesText`/`BytesEnd` events.

use std::io::Cursor;
use std::time::Instant;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use uuid::Uuid;

use crate::error::BasicDbError;

/// Renders one successful action response: `root_element` wraps whatever
/// `body` writes, followed by a `ResponseMetadata` block carrying a fresh
/// request id and the elapsed wall-clock time as `BoxUsage`.
pub fn render<F>(root_element: &str, started: Instant, body: F) -> Result<String, BasicDbError>
where
    F: FnOnce(&mut Writer<Cursor<Vec<u8>>>) -> Result<(), BasicDbError>,
{
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Start(BytesStart::new(root_element)))?;
    body(&mut writer)?;
    write_response_metadata(&mut writer, started)?;
    writer.write_event(Event::End(BytesEnd::new(root_element)))?;

    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| BasicDbError::Internal {
        message: format!("non-utf8 xml output: {e}"),
    })
}

fn write_response_metadata(writer: &mut Writer<Cursor<Vec<u8>>>, started: Instant) -> Result<(), BasicDbError> {
    writer.write_event(Event::Start(BytesStart::new("ResponseMetadata")))?;
    write_text_element(writer, "RequestId", &Uuid::new_v4().to_string())?;
    write_text_element(writer, "BoxUsage", &format!("{:.7}", started.elapsed().as_secs_f64()))?;
    writer.write_event(Event::End(BytesEnd::new("ResponseMetadata")))?;
    Ok(())
}

pub fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, value: &str) -> Result<(), BasicDbError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
