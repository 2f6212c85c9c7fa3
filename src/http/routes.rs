//! One handler function per action, dispatched on the `Action` parameter,
//! matching the original falcon `DomainResource.on_get`/`on_post` (aliased
//! to the same handler, since BasicDB accepts either verb).

use std::time::Instant;

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, instrument};

use crate::backend::StorageBackend;
use crate::error::BasicDbError;
use crate::query::{self, SelectResult};

use super::envelope::write_text_element;
use super::params::{self, Params};
use super::{auth, envelope, error_response, AppState};

pub async fn get_handler(state: State<AppState>, headers: HeaderMap, Query(params): Query<Params>) -> Response {
    dispatch(state, headers, params).await
}

pub async fn post_handler(state: State<AppState>, headers: HeaderMap, Form(params): Form<Params>) -> Response {
    dispatch(state, headers, params).await
}

async fn dispatch(State(state): State<AppState>, headers: HeaderMap, params: Params) -> Response {
    let started = Instant::now();

    let owner = match auth::extract_owner(&headers) {
        Ok(owner) => owner,
        Err(e) => return error_response::to_response(e),
    };
    let action = match params::get(&params, "Action") {
        Some(a) => a.to_string(),
        None => return error_response::to_response(BasicDbError::MissingParameter { name: "Action".to_string() }),
    };

    let backend = state.backend.clone();
    let span = tracing::info_span!("action", action = %action, owner = %owner);
    let result = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        run_action(backend.as_ref(), &owner, &action, &params, started)
    })
    .await;

    match result {
        Ok(Ok(body)) => (StatusCode::OK, [("Content-Type", "text/xml")], body).into_response(),
        Ok(Err(e)) => {
            log_error(&e);
            error_response::to_response(e)
        }
        Err(join_err) => error_response::to_response(BasicDbError::Internal {
            message: format!("action task panicked: {join_err}"),
        }),
    }
}

fn log_error(err: &BasicDbError) {
    match err {
        BasicDbError::ConditionalCheckFailed | BasicDbError::AttributeDoesNotExist { .. } => debug!(%err, "backend rejected request"),
        BasicDbError::Io(_) | BasicDbError::Internal { .. } => error!(%err, "backend failure"),
        _ => debug!(%err, "request rejected"),
    }
}

#[instrument(skip(backend, params))]
fn run_action(
    backend: &dyn StorageBackend,
    owner: &str,
    action: &str,
    params: &Params,
    started: Instant,
) -> Result<String, BasicDbError> {
    match action {
        "CreateDomain" => {
            let domain = params::require(params, "DomainName")?;
            backend.create_domain(owner, domain)?;
            envelope::render("CreateDomainResponse", started, |_| Ok(()))
        }
        "DeleteDomain" => {
            let domain = params::require(params, "DomainName")?;
            backend.delete_domain(owner, domain)?;
            envelope::render("DeleteDomainResponse", started, |_| Ok(()))
        }
        "ListDomains" => {
            let domains = backend.list_domains(owner)?;
            envelope::render("ListDomainsResponse", started, |w| {
                w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                    "ListDomainsResult",
                )))?;
                for domain in &domains {
                    write_text_element(w, "DomainName", domain)?;
                }
                w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new(
                    "ListDomainsResult",
                )))?;
                Ok(())
            })
        }
        "DomainMetadata" => {
            let domain = params::require(params, "DomainName")?;
            let meta = backend.domain_metadata(owner, domain)?;
            envelope::render("DomainMetadataResponse", started, |w| {
                w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                    "DomainMetadataResult",
                )))?;
                write_text_element(w, "ItemCount", &meta.item_count.to_string())?;
                write_text_element(w, "ItemNamesSizeBytes", &meta.item_names_size_bytes.to_string())?;
                write_text_element(w, "AttributeNameCount", &meta.attribute_name_count.to_string())?;
                write_text_element(w, "AttributeNamesSizeBytes", &meta.attribute_names_size_bytes.to_string())?;
                write_text_element(w, "AttributeValueCount", &meta.attribute_value_count.to_string())?;
                write_text_element(w, "AttributeValuesSizeBytes", &meta.attribute_values_size_bytes.to_string())?;
                write_text_element(w, "Timestamp", &meta.timestamp.to_string())?;
                w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new(
                    "DomainMetadataResult",
                )))?;
                Ok(())
            })
        }
        "PutAttributes" => {
            let domain = params::require(params, "DomainName")?;
            let item = params::require(params, "ItemName")?;
            let request = params::build_put_request(params);
            backend.put_attributes(owner, domain, item, &request)?;
            envelope::render("PutAttributesResponse", started, |_| Ok(()))
        }
        "BatchPutAttributes" => {
            let domain = params::require(params, "DomainName")?;
            let requests: Vec<(String, crate::backend::PutRequest)> = params::split_batch_items(params)
                .into_iter()
                .map(|(name, item_params)| (name, params::build_put_request(&item_params)))
                .collect();
            backend.batch_put_attributes(owner, domain, &requests)?;
            envelope::render("BatchPutAttributesResponse", started, |_| Ok(()))
        }
        "DeleteAttributes" => {
            let domain = params::require(params, "DomainName")?;
            let item = params::require(params, "ItemName")?;
            let expectations = params::build_expectations(params);
            if !expectations.is_empty() && !backend.check_expectations(owner, domain, item, &expectations)? {
                return Err(BasicDbError::ConditionalCheckFailed);
            }
            let deletions = params::build_deletion_map(params);
            backend.delete_attributes(owner, domain, item, &deletions)?;
            envelope::render("DeleteAttributesResponse", started, |_| Ok(()))
        }
        "BatchDeleteAttributes" => {
            let domain = params::require(params, "DomainName")?;
            let deletions: Vec<(String, crate::backend::DeletionMap)> = params::split_batch_items(params)
                .into_iter()
                .map(|(name, item_params)| (name, params::build_deletion_map(&item_params)))
                .collect();
            backend.batch_delete_attributes(owner, domain, &deletions)?;
            envelope::render("BatchDeleteAttributesResponse", started, |_| Ok(()))
        }
        "GetAttributes" => {
            let domain = params::require(params, "DomainName")?;
            let item = params::require(params, "ItemName")?;
            let attrs = backend.get_attributes(owner, domain, item)?;
            envelope::render("GetAttributesResponse", started, |w| {
                w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                    "GetAttributesResult",
                )))?;
                write_attributes(w, &attrs)?;
                w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new(
                    "GetAttributesResult",
                )))?;
                Ok(())
            })
        }
        "Select" => {
            let sql = params::require(params, "SelectExpression")?;
            let parsed = query::parse_select(sql)?;
            let result = backend.select(owner, &parsed)?;
            envelope::render("SelectResponse", started, |w| {
                w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                    "SelectResult",
                )))?;
                match result {
                    SelectResult::Count(count) => {
                        w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new("Item")))?;
                        write_text_element(w, "Name", "Domain")?;
                        w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                            "Attribute",
                        )))?;
                        write_text_element(w, "Name", "count")?;
                        write_text_element(w, "Value", &count.to_string())?;
                        w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new(
                            "Attribute",
                        )))?;
                        w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new("Item")))?;
                    }
                    SelectResult::Items(items) => {
                        for (name, attrs) in items {
                            w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                                "Item",
                            )))?;
                            write_text_element(w, "Name", &name)?;
                            write_attributes(w, &attrs)?;
                            w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new("Item")))?;
                        }
                    }
                }
                w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new(
                    "SelectResult",
                )))?;
                Ok(())
            })
        }
        other => Err(BasicDbError::UnknownAction { action: other.to_string() }),
    }
}

fn write_attributes(
    w: &mut quick_xml::Writer<std::io::Cursor<Vec<u8>>>,
    attrs: &crate::model::AttributeMap,
) -> Result<(), BasicDbError> {
    for (name, values) in attrs.iter() {
        for value in values {
            w.write_event(quick_xml::events::Event::Start(quick_xml::events::BytesStart::new(
                "Attribute",
            )))?;
            write_text_element(w, "Name", name)?;
            write_text_element(w, "Value", value)?;
            w.write_event(quick_xml::events::Event::End(quick_xml::events::BytesEnd::new(
                "Attribute",
            )))?;
        }
    }
    Ok(())
}
