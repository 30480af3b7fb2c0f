//! Route handlers and the chain protocol.
//!
//! A handler receives the request and the working response and either
//! finishes dispatch ([`Outcome::Respond`]) or passes a possibly updated
//! pair to the next handler in the chain ([`Outcome::Next`]).

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::http::{HttpRequest, HttpResponse};

/// Error type handlers may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running one handler.
#[derive(Debug)]
pub enum Outcome {
    /// Stop the chain and send this response.
    Respond(HttpResponse),
    /// Continue with the next handler.
    Next(HttpRequest, HttpResponse),
}

impl Outcome {
    pub fn next(request: HttpRequest, response: HttpResponse) -> Self {
        Self::Next(request, response)
    }

    pub fn respond(response: HttpResponse) -> Self {
        Self::Respond(response)
    }
}

impl From<HttpResponse> for Outcome {
    fn from(response: HttpResponse) -> Self {
        Self::Respond(response)
    }
}

impl From<(HttpRequest, HttpResponse)> for Outcome {
    fn from((request, response): (HttpRequest, HttpResponse)) -> Self {
        Self::Next(request, response)
    }
}

/// Values a handler future may resolve to.
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, BoxError>;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        Ok(self)
    }
}

impl IntoOutcome for HttpResponse {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        Ok(Outcome::Respond(self))
    }
}

impl IntoOutcome for (HttpRequest, HttpResponse) {
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        Ok(self.into())
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<BoxError>,
{
    fn into_outcome(self) -> Result<Outcome, BoxError> {
        self.map_err(Into::into)?.into_outcome()
    }
}

/// An async route handler.
///
/// Implemented for every `Fn(HttpRequest, HttpResponse) -> impl Future`
/// whose output implements [`IntoOutcome`].
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        request: HttpRequest,
        response: HttpResponse,
    ) -> BoxFuture<'static, Result<Outcome, BoxError>>;
}

impl<F, Fut, O> Handler for F
where
    F: Fn(HttpRequest, HttpResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: IntoOutcome + 'static,
{
    fn call(
        &self,
        request: HttpRequest,
        response: HttpResponse,
    ) -> BoxFuture<'static, Result<Outcome, BoxError>> {
        (self)(request, response)
            .map(IntoOutcome::into_outcome)
            .boxed()
    }
}

pub type BoxedHandler = Box<dyn Handler>;

pub fn boxed<H: Handler>(handler: H) -> BoxedHandler {
    Box::new(handler)
}

/// Build a `Vec<BoxedHandler>` from a list of handlers.
///
/// ```ignore
/// app.get_chain("/admin", handlers![auth, dashboard])?;
/// ```
#[macro_export]
macro_rules! handlers {
    ($($handler:expr),* $(,)?) => {
        vec![$($crate::app::handler::boxed($handler)),*]
    };
}
