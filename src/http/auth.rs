//! Owner extraction. Real SimpleDB-style request signing is out of scope
//! (see the overview's explicit non-goal); this reads an opaque owner
//! identifier from an `Authorization` header, or from `X-Owner` for local
//! testing when no signing front-end is in front of the server. Still a
//! real extraction step, not a TODO: the rest of the HTTP layer needs a
//! concrete owner string to call the backend with.

use axum::http::HeaderMap;

use crate::error::BasicDbError;

pub fn extract_owner(headers: &HeaderMap) -> Result<String, BasicDbError> {
    if let Some(value) = headers.get("x-owner") {
        return header_to_owner(value);
    }
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        return header_to_owner(value);
    }
    Err(BasicDbError::MissingParameter {
        name: "Authorization".to_string(),
    })
}

fn header_to_owner(value: &axum::http::HeaderValue) -> Result<String, BasicDbError> {
    value
        .to_str()
        .map(str::to_string)
        .map_err(|_| BasicDbError::MissingParameter {
            name: "Authorization".to_string(),
        })
}
