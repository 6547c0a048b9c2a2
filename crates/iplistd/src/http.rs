//! HTTP surface
//!
//! ```text
//! GET /                      HTML list of configured app names
//! GET /healthcheck           liveness text, touches nothing
//! GET /favicon.ico           static asset
//! GET /{appname}?verbose=1&region=us-east-1
//!                            JSON IPs serving the app, or 302 to / when
//!                            nothing matched
//! ```
//!
//! Unless disabled, `/` and `/{appname}` first redirect plain-HTTP requests
//! (as reported by `X-Forwarded-Proto`) to HTTPS.

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use iplist_core::{Error, Resolution, ResolutionEngine, ResolveRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Fixed liveness answer of `/healthcheck`
pub const HEALTHCHECK_BODY: &str = "I'm still here.";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ResolutionEngine>,
    /// Redirect plain-HTTP requests to HTTPS
    pub https_redirect: bool,
}

/// Query parameters of `/{appname}`
#[derive(Debug, Default, Deserialize)]
pub struct AppQuery {
    verbose: Option<String>,
    region: Option<String>,
}

impl AppQuery {
    fn is_verbose(&self) -> bool {
        self.verbose
            .as_deref()
            .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    fn region(&self) -> Option<&str> {
        self.region.as_deref().filter(|r| !r.is_empty())
    }
}

/// Build the service router
///
/// # Parameters
///
/// - `state`: Engine and redirect setting shared by all handlers
/// - `static_dir`: Directory holding `favicon.ico`
pub fn router(state: AppState, static_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthcheck", get(healthcheck))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .route("/:appname", get(app_ips))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthcheck() -> &'static str {
    HEALTHCHECK_BODY
}

async fn index(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    if let Some(redirect) = https_redirect(&state, &headers, &uri) {
        return redirect;
    }

    let catalog = state.engine.store().snapshot().await;
    Html(render_index(&catalog.app_names())).into_response()
}

async fn app_ips(
    State(state): State<AppState>,
    Path(appname): Path<String>,
    Query(query): Query<AppQuery>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if query.is_verbose() {
        debug!("Verbose request: {}", uri);
    }
    if let Some(redirect) = https_redirect(&state, &headers, &uri) {
        return redirect;
    }

    let mut request = ResolveRequest::new(appname).verbose(query.is_verbose());
    if let Some(region) = query.region() {
        request = request.with_region(region);
    }

    match state.engine.resolve(&request).await {
        Ok(Resolution::NoMatch) => {
            info!("No entries for {}, redirecting to /", request.app);
            found("/")
        }
        Ok(Resolution::Regions(regions)) => pretty_json(StatusCode::OK, &regions),
        Ok(Resolution::Document(document)) => pretty_json(StatusCode::OK, &document),
        Err(e) => {
            error!("Resolving {} failed: {}", request.app, e);
            error_response(&e)
        }
    }
}

/// `302` to HTTPS when redirects are on and the request came in over HTTP
fn https_redirect(state: &AppState, headers: &HeaderMap, uri: &Uri) -> Option<Response> {
    if !state.https_redirect {
        return None;
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if proto.eq_ignore_ascii_case("https") {
        return None;
    }

    let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) else {
        debug!("No Host header, cannot redirect {} to HTTPS", uri);
        return None;
    };

    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Some(found(&format!("https://{}{}", host, path)))
}

/// `302 Found` to `location`
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// JSON body with 4-space indentation
fn pretty_json<T: Serialize>(status: StatusCode, value: &T) -> Response {
    let mut body = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut body, formatter);

    if let Err(e) = value.serialize(&mut serializer) {
        error!("Failed to serialize response: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

fn error_response(e: &Error) -> Response {
    let message = e.to_string();
    pretty_json(
        status_for(e),
        &ErrorBody {
            error: e.kind(),
            message: &message,
        },
    )
}

/// Upstream failures are `502`, local ones `500`
fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::ProviderTransient { .. }
        | Error::ProviderFatal { .. }
        | Error::NameResolution(_)
        | Error::Json(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn render_index(apps: &[&str]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>IP List</title></head>\n<body>\n<h1>Applications</h1>\n<ul>\n",
    );
    for app in apps {
        let app = escape_html(app);
        html.push_str(&format!("<li><a href=\"/{0}\">{0}</a></li>\n", app));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
