//! Route handlers and how a matched route is run.
//!
//! A handler is a plain async function that takes the [`Request`] by value:
//!
//! ```text
//! async fn index(mut req: Request) -> Result<Response, Error>
//! ```
//!
//! Registering it on the [`Router`](crate::Router) erases its type into an
//! [`Endpoint`]. Every request runs the endpoint on a task of its own. The
//! request, and with it the [`RequestContext`] and any connection it opened,
//! is dropped when that task ends, whether the handler returned or panicked.
//!
//! [`RequestContext`]: crate::context::RequestContext

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;
use tracing::error;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;
type HandlerFn = dyn Fn(Request) -> HandlerFuture + Send + Sync + 'static;

/// A registered handler, shared by every request routed to it.
#[doc(hidden)]
#[derive(Clone)]
pub struct Endpoint(Arc<HandlerFn>);

impl Endpoint {
    /// Runs the handler to completion on its own task. A panic is logged and
    /// answered with a bare `500`.
    pub(crate) async fn run(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path = req.path().to_owned();

        match tokio::spawn((self.0)(req)).await {
            Ok(response) => response,
            Err(e) => {
                error!(%method, %path, "handler failed: {e}");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Implemented for every async function usable as a route:
/// `Fn(Request) -> impl Future<Output = impl IntoResponse>`.
///
/// Sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_endpoint(self) -> Endpoint;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_endpoint(self) -> Endpoint {
        Endpoint(Arc::new(move |req: Request| -> HandlerFuture {
            let fut = self(req);
            Box::pin(async move { fut.await.into_response() })
        }))
    }
}
