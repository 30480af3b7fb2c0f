//! Request wrapper handed to route handlers.
//!
//! # Responsibilities
//! - Expose query and path parameters next to the platform request
//! - Read the body once (bytes, text, JSON, urlencoded form)
//! - Generate request IDs for the hosting server
//!
//! # Design Decisions
//! - Query is parsed eagerly and is mutable; params are fixed per dispatch
//! - Reading the body consumes it; a second read fails like a used stream
//! - The app back-reference is weak so requests never keep an app alive

use std::sync::{Arc, Weak};

use axum::body::{Body, Bytes};
use axum::http::{Extensions, HeaderMap, HeaderValue, Method, Request, Uri};
use serde::de::DeserializeOwned;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::app::App;
use crate::http::query::QueryParams;
use crate::routing::Params;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Largest body the readers will buffer.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Errors raised while reading a request body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("body has already been read")]
    AlreadyUsed,

    #[error("failed to read body: {0}")]
    Read(#[source] axum::Error),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decorated request.
#[derive(Debug)]
pub struct HttpRequest {
    inner: Request<Body>,
    app: Weak<App>,
    query: QueryParams,
    params: Params,
    body_used: bool,
}

impl HttpRequest {
    /// Wrap a platform request. The query is parsed from the URI and params
    /// start empty.
    pub fn new(request: Request<Body>) -> Self {
        let query = QueryParams::parse(request.uri().query().unwrap_or_default());
        Self::dispatched(request, Params::new(), query, Weak::new())
    }

    pub(crate) fn dispatched(
        request: Request<Body>,
        params: Params,
        query: QueryParams,
        app: Weak<App>,
    ) -> Self {
        Self {
            inner: request,
            app,
            query,
            params,
            body_used: false,
        }
    }

    /// Replace the path parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// The owning app, if the request came through dispatch and the app is
    /// still alive.
    pub fn app(&self) -> Option<Arc<App>> {
        self.app.upgrade()
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut QueryParams {
        &mut self.query
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Header value as a string, if present and printable.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// Correlation ID set by the hosting server.
    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    pub fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }

    /// Typed storage for passing values to later handlers in the chain.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.inner.extensions_mut()
    }

    pub fn body_used(&self) -> bool {
        self.body_used
    }

    /// Read the whole body.
    pub async fn bytes(&mut self) -> Result<Bytes, BodyError> {
        if self.body_used {
            return Err(BodyError::AlreadyUsed);
        }
        self.body_used = true;

        let body = std::mem::take(self.inner.body_mut());
        axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(BodyError::Read)
    }

    pub async fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Parse the body as JSON.
    pub async fn read_json<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub async fn form(&mut self) -> Result<QueryParams, BodyError> {
        let bytes = self.bytes().await?;
        Ok(QueryParams::parse_bytes(&bytes))
    }

    /// Split into the platform request, path params and query.
    pub fn into_parts(self) -> (Request<Body>, Params, QueryParams) {
        (self.inner, self.params, self.query)
    }
}

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, body: &'static str) -> HttpRequest {
        HttpRequest::new(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
    }

    #[test]
    fn test_query_parsed_from_uri() {
        let req = request("https://workers.dev/search?q=cute+cat", "");
        assert_eq!(req.query().get("q"), Some("cute cat"));
        assert_eq!(req.path(), "/search");
        assert!(req.params().is_empty());
        assert!(req.app().is_none());
    }

    #[test]
    fn test_query_is_mutable() {
        let mut req = request("/search?q=cat", "");
        req.query_mut().append("orderBy", "playfulness");
        assert_eq!(req.query().to_string(), "q=cat&orderBy=playfulness");
    }

    #[tokio::test]
    async fn test_form_body() {
        let mut req = request("/login", "username=bayu&password=test");
        let form = req.form().await.unwrap();
        assert_eq!(form.get("username"), Some("bayu"));
        assert_eq!(form.get("password"), Some("test"));
        assert!(req.body_used());
    }

    #[tokio::test]
    async fn test_empty_form_has_no_fields() {
        let mut req = request("/login", "");
        let form = req.form().await.unwrap();
        assert_eq!(form.get("username"), None);
    }

    #[tokio::test]
    async fn test_body_reads_once() {
        let mut req = request("/echo", "hello");
        assert_eq!(req.text().await.unwrap(), "hello");
        assert!(matches!(req.text().await, Err(BodyError::AlreadyUsed)));
    }

    #[tokio::test]
    async fn test_json_body() {
        let mut req = request("/cats", r#"{"name":"Tom"}"#);
        let value: serde_json::Value = req.read_json().await.unwrap();
        assert_eq!(value["name"], "Tom");
    }

    #[test]
    fn test_with_params_and_into_parts() {
        let params: Params = [("id", "7")].into_iter().collect();
        let req = request("/cat/7?lives=9", "").with_params(params);
        assert_eq!(req.param("id"), Some("7"));

        let (inner, params, query) = req.into_parts();
        assert_eq!(inner.uri().path(), "/cat/7");
        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(query.get("lives"), Some("9"));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let mut make = MakeRequestUuid;
        let req = Request::new(());
        let a = make.make_request_id(&req).unwrap();
        let b = make.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
    }
}
