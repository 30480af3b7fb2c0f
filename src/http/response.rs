//! Response builder handed to route handlers.
//!
//! # Responsibilities
//! - Carry status, headers and a buffered body through the handler chain
//! - Provide fluent builders (`header`, `code`, `html`, `json`, `send`)
//! - Convert into the platform [`Response`] once dispatch completes
//!
//! # Design Decisions
//! - Value semantics: every builder takes `&self` and returns a new
//!   response, leaving the receiver untouched (including `header`)
//! - Copies carry status, headers and the app back-reference
//! - Producing JSON (`json`) and reading it back (`read_json`) are separate

use std::sync::{Arc, Weak};

use axum::body::{Body, Bytes};
use axum::http::header::{InvalidHeaderName, InvalidHeaderValue, CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::App;

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=UTF-8";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Errors raised by response builders and readers.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("invalid header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),

    #[error("invalid header value: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid redirect status {0}")]
    RedirectStatus(StatusCode),
}

/// Decorated response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    app: Weak<App>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            app: Weak::new(),
        }
    }
}

impl HttpResponse {
    /// Empty `200 OK` response not attached to any app.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attached(app: Weak<App>) -> Self {
        Self {
            app,
            ..Self::default()
        }
    }

    /// Redirect to `url`. Only 301, 302, 303, 307 and 308 are accepted.
    pub fn redirect(url: &str, status: StatusCode) -> Result<Self, ResponseError> {
        if !matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            return Err(ResponseError::RedirectStatus(status));
        }
        let mut response = Self::new().code(status);
        response.headers.insert(LOCATION, HeaderValue::from_str(url)?);
        Ok(response)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical reason phrase for the status, if it has one.
    pub fn status_text(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The owning app, if it is still alive.
    pub fn app(&self) -> Option<Arc<App>> {
        self.app.upgrade()
    }

    pub fn text(&self) -> Result<&str, ResponseError> {
        Ok(std::str::from_utf8(&self.body)?)
    }

    /// Parse the body as JSON.
    pub fn read_json<T: DeserializeOwned>(&self) -> Result<T, ResponseError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    fn copy_with_body(&self, body: Bytes) -> Self {
        Self {
            status: self.status,
            headers: self.headers.clone(),
            body,
            app: self.app.clone(),
        }
    }

    /// Copy with header `key` set to `value`, replacing any existing value.
    /// An empty `value` leaves the headers unchanged.
    pub fn header(&self, key: &str, value: &str) -> Result<Self, ResponseError> {
        self.with_headers([(key, value)])
    }

    /// Copy with every `(key, value)` pair set. Pairs with an empty value
    /// are skipped.
    pub fn with_headers<I, K, V>(&self, headers: I) -> Result<Self, ResponseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut response = self.copy_with_body(self.body.clone());
        for (key, value) in headers {
            if value.as_ref().is_empty() {
                continue;
            }
            let name = HeaderName::try_from(key.as_ref())?;
            let value = HeaderValue::from_str(value.as_ref())?;
            response.headers.insert(name, value);
        }
        Ok(response)
    }

    /// Copy with a new status.
    pub fn code(&self, status: StatusCode) -> Self {
        let mut response = self.copy_with_body(self.body.clone());
        response.status = status;
        response
    }

    /// Copy with an HTML body.
    pub fn html(&self, body: impl Into<String>) -> Self {
        let mut response = self.copy_with_body(Bytes::from(body.into()));
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_HTML));
        response
    }

    /// Copy with `value` serialized as the JSON body.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Self, ResponseError> {
        let body = serde_json::to_vec(value)?;
        let mut response = self.copy_with_body(Bytes::from(body));
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        Ok(response)
    }

    /// Copy with a raw body. Headers are carried over unchanged.
    pub fn send(&self, body: impl Into<Bytes>) -> Self {
        self.copy_with_body(body.into())
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl From<HttpResponse> for Response<Body> {
    fn from(response: HttpResponse) -> Self {
        response.into_response()
    }
}
