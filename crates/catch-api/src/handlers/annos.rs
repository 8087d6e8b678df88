//! Annotation CRUD, import and search endpoints.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde_json::{json, Value as JsonValue};

use catch_core::annojs::to_legacy;
use catch_core::defaults::RESPONSE_FORMAT_HEADER;
use catch_core::{generate_uid, Annotation, Error, ResponseFormat, Result, TokenClaims};
use catch_search::{SearchDialect, SearchParams};

use crate::error::ApiError;
use crate::services::parse_body;
use crate::AppState;

type Pairs = Vec<(String, String)>;

// =============================================================================
// RESPONSE SHAPING
// =============================================================================

/// Format requested by the client, or the configured default.
pub fn negotiate_format(headers: &HeaderMap, default: ResponseFormat) -> Result<ResponseFormat> {
    match headers.get(RESPONSE_FORMAT_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| Error::UnknownResponseFormat("unknown response format(?)".to_string()))?
            .parse(),
        None => Ok(default),
    }
}

fn render_record(anno: &Annotation, format: ResponseFormat) -> Result<JsonValue> {
    match format {
        ResponseFormat::Catcha => anno.serialized(),
        ResponseFormat::AnnotatorJs => to_legacy(anno),
    }
}

/// Response for a completed operation.
///
/// The operation already took effect, so a record that cannot be shaped into
/// the requested format yields 203 with `{id, msg}` instead of an error.
fn record_response(
    state: &AppState,
    headers: &HeaderMap,
    anno: &Annotation,
    with_location: bool,
) -> Response {
    let shaped =
        negotiate_format(headers, state.default_format).and_then(|f| render_record(anno, f));
    match shaped {
        Ok(body) => {
            let mut response = (StatusCode::OK, Json(body)).into_response();
            if with_location {
                if let Ok(location) = HeaderValue::from_str(&format!("/annos/{}", anno.id)) {
                    response.headers_mut().insert(header::LOCATION, location);
                }
            }
            response
        }
        Err(e) => {
            tracing::info!(
                subsystem = "api",
                anno_id = %anno.id,
                error = %e,
                "Operation done but response could not be formatted"
            );
            (
                StatusCode::NON_AUTHORITATIVE_INFORMATION,
                Json(json!({"id": anno.id, "msg": e.to_string()})),
            )
                .into_response()
        }
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// `/annos/{id}` for every method.
pub async fn crud_api(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(anno_id): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    dispatch(&state, &claims, &anno_id, &method, &headers, &body).await
}

async fn dispatch(
    state: &AppState,
    claims: &TokenClaims,
    anno_id: &str,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> std::result::Result<Response, ApiError> {
    let input = if *method == Method::POST || *method == Method::PUT {
        parse_body(body)?
    } else {
        None
    };
    let anno = state.crud.handle(method, claims, anno_id, input).await?;
    let with_location = *method == Method::POST || *method == Method::PUT;
    Ok(record_response(state, headers, &anno, with_location))
}

/// `POST /annos/` creates with a generated id; `GET /annos/` searches.
pub async fn create_or_search(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    if method == Method::POST {
        let anno_id = generate_uid(false);
        return dispatch(&state, &claims, &anno_id, &method, &headers, &body).await;
    }
    let params = SearchParams::from_pairs(query);
    run_search(&state, &claims, &params, SearchDialect::Current, &headers).await
}

/// `POST /annos/compat/create`: generated integer id for legacy clients.
pub async fn compat_create(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    let anno_id = generate_uid(true);
    dispatch(&state, &claims, &anno_id, &Method::POST, &headers, &body).await
}

pub async fn compat_update(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(anno_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    let input = parse_body(&body)?;
    let anno = state.crud.compat_update(&claims, &anno_id, input).await?;
    Ok(record_response(&state, &headers, &anno, true))
}

pub async fn compat_delete(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    Path(anno_id): Path<String>,
    headers: HeaderMap,
) -> std::result::Result<Response, ApiError> {
    dispatch(&state, &claims, &anno_id, &Method::DELETE, &headers, &[]).await
}

/// `POST /annos/stash`: bulk import of a JSON array of records.
pub async fn stash(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    let records = match parse_body(&body)? {
        Some(JsonValue::Array(records)) => records,
        Some(_) => {
            return Err(Error::InvalidInput("expected a json array of annotations".to_string()).into())
        }
        None => {
            return Err(
                Error::MissingAnnotationInput("missing json in body request for import".to_string())
                    .into(),
            )
        }
    };
    let summary = state.crud.import(&claims, records).await?;
    Ok(Json(summary).into_response())
}

// =============================================================================
// SEARCH
// =============================================================================

/// `GET /annos/search`
pub async fn search(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
) -> std::result::Result<Response, ApiError> {
    let params = SearchParams::from_pairs(query);
    run_search(&state, &claims, &params, SearchDialect::Current, &headers).await
}

/// `GET /annos/compat/search`
pub async fn compat_search(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
) -> std::result::Result<Response, ApiError> {
    let params = SearchParams::from_pairs(query);
    run_search(&state, &claims, &params, SearchDialect::Legacy, &headers).await
}

/// `POST /annos/compat/search` with a form body; query-string parameters
/// are honored too.
pub async fn compat_search_form(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    headers: HeaderMap,
    Query(query): Query<Pairs>,
    Form(form): Form<Pairs>,
) -> std::result::Result<Response, ApiError> {
    let mut params = SearchParams::from_pairs(query);
    params.extend(form);
    run_search(&state, &claims, &params, SearchDialect::Legacy, &headers).await
}

async fn run_search(
    state: &AppState,
    claims: &TokenClaims,
    params: &SearchParams,
    dialect: SearchDialect,
    headers: &HeaderMap,
) -> std::result::Result<Response, ApiError> {
    let format = match dialect {
        SearchDialect::Legacy => ResponseFormat::AnnotatorJs,
        SearchDialect::Current => negotiate_format(headers, state.default_format)?,
    };
    let result = state.search.search(params, claims, dialect).await?;
    Ok(Json(result.render(format)?).into_response())
}

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
