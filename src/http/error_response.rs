//! Maps a [`BasicDbError`] to an HTTP status and an XML body named for the
//! error kind, per the error table in the spec's error-handling section.

use std::io::Cursor;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::BasicDbError;

use super::envelope::write_text_element;

pub fn to_response(err: BasicDbError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = render_error(&err).unwrap_or_else(|_| format!("<InternalError><Message>{}</Message></InternalError>", err));
    (status, [("Content-Type", "text/xml")], body).into_response()
}

fn render_error(err: &BasicDbError) -> Result<String, BasicDbError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    let element = err.element_name();
    writer.write_event(Event::Start(BytesStart::new(element)))?;
    write_text_element(&mut writer, "Message", &err.to_string())?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| BasicDbError::Internal {
        message: format!("non-utf8 xml output: {e}"),
    })
}
