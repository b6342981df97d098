use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use hyper::{Body, Method, Request, Response, StatusCode};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::RealValues;
use crate::scoring::ranking;
use crate::store::{Store, StoreError};

#[derive(Deserialize)]
struct RegisterRequest {
    name: Option<String>,
    projections: Option<HashMap<String, Value>>,
}

#[derive(Deserialize)]
struct RealRequest {
    real: Option<HashMap<String, Value>>,
}

// Single entry point: route the request to its handler, turn store errors
// into status codes, and stamp CORS headers on whatever goes out.
pub async fn route(store: Arc<Store>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    info!("{} {}", method, path);

    let result = match (&method, path.as_str()) {
        (&Method::GET, "/api/candidates") => candidates(&store),
        (&Method::POST, "/api/register") => register(&store, req).await,
        (&Method::GET, "/api/results") => results(&store),
        (&Method::GET, "/api/admin/real") => get_real(&store),
        (&Method::POST, "/api/admin/real") => set_real(&store, req).await,
        (&Method::GET, "/api/admin/ranking") => ranking_table(&store),
        (&Method::GET, "/api/admin/download-excel") => download(&store),
        (&Method::DELETE, "/api/admin/reset-excel") => reset(&store),
        (&Method::OPTIONS, _) => Ok(preflight()),
        _ => Ok(json_response(
            StatusCode::NOT_FOUND,
            json!({ "error": "not found" }),
        )),
    };

    let mut response = match result {
        Ok(response) => response,
        Err(e) => {
            let status = match e {
                StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                error!("{} {} failed: {}", method, path, e);
            } else {
                warn!("{} {} rejected: {}", method, path, e);
            }
            json_response(status, json!({ "error": e.to_string() }))
        }
    };
    apply_cors(&mut response);
    Ok(response)
}

fn candidates(store: &Store) -> Result<Response<Body>, StoreError> {
    Ok(json_response(
        StatusCode::OK,
        json!({ "candidates": store.outcomes() }),
    ))
}

async fn register(store: &Store, req: Request<Body>) -> Result<Response<Body>, StoreError> {
    let body = match read_json::<RegisterRequest>(req).await {
        Ok(body) => body,
        Err(response) => return Ok(response),
    };

    let (name, projections) = match (body.name, body.projections) {
        (Some(name), Some(projections)) => (name, projections),
        _ => {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "missing fields (name, projections)" }),
            ))
        }
    };

    let values = numeric_entries(&projections);
    store.append_submission(&name, &values)?;
    Ok(json_response(StatusCode::OK, json!({ "status": "OK" })))
}

fn results(store: &Store) -> Result<Response<Body>, StoreError> {
    let (header, rows) = store.results_table();
    Ok(json_response(
        StatusCode::OK,
        json!({ "header": header, "rows": rows }),
    ))
}

fn get_real(store: &Store) -> Result<Response<Body>, StoreError> {
    let known = store.real_values();
    let mut real = serde_json::Map::new();
    for outcome in store.outcomes() {
        let value = match known.get(outcome) {
            Some(v) => json!(v),
            None => Value::Null,
        };
        real.insert(outcome.clone(), value);
    }
    Ok(json_response(StatusCode::OK, json!({ "real": real })))
}

async fn set_real(store: &Store, req: Request<Body>) -> Result<Response<Body>, StoreError> {
    let body = match read_json::<RealRequest>(req).await {
        Ok(body) => body,
        Err(response) => return Ok(response),
    };

    let incoming = body.real.unwrap_or_default();
    let real: RealValues = numeric_entries(&incoming);
    store.set_real_values(&real)?;
    Ok(json_response(StatusCode::OK, json!({ "status": "OK" })))
}

fn ranking_table(store: &Store) -> Result<Response<Body>, StoreError> {
    let submissions = store.list_submissions();
    let real = store.real_values();
    let entries = ranking::build_ranking(&submissions, &real, store.outcomes());

    // JSON has no infinity; an unscoreable entry serializes its score as null.
    let ranking: Vec<Value> = entries
        .iter()
        .map(|e| {
            json!({
                "position": e.position,
                "name": e.name,
                "score": if e.score.is_finite() { Some(e.score) } else { None },
                "isLast": e.is_last,
            })
        })
        .collect();
    Ok(json_response(StatusCode::OK, json!({ "ranking": ranking })))
}

fn download(store: &Store) -> Result<Response<Body>, StoreError> {
    let bytes = store.export_table()?;
    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    response.headers_mut().insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"resultados.csv\""),
    );
    Ok(response)
}

fn reset(store: &Store) -> Result<Response<Body>, StoreError> {
    store.reset_all()?;
    info!("pool reset: submissions and real values cleared");
    Ok(json_response(StatusCode::OK, json!({ "status": "RESET_OK" })))
}

// Keep the entries that carry a usable number: JSON numbers as-is, numeric
// strings parsed. Anything else is dropped, never coerced to zero.
fn numeric_entries(raw: &HashMap<String, Value>) -> HashMap<String, f64> {
    let mut out = HashMap::new();
    for (key, value) in raw {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(v) = parsed {
            if v.is_finite() {
                out.insert(key.clone(), v);
            }
        }
    }
    out
}

async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<Body>,
) -> Result<T, Response<Body>> {
    let bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to read request body: {}", e);
            return Err(json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "unreadable body" }),
            ));
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        warn!("malformed json body: {}", e);
        json_response(
            StatusCode::BAD_REQUEST,
            json!({ "error": "malformed json body" }),
        )
    })
}

fn json_response(status: StatusCode, value: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn preflight() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

fn apply_cors(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
