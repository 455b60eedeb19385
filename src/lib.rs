//! # jotter
//!
//! A small blogging service: a hyper server, a radix-tree router, two route
//! groups (authentication and posts), and one SQLite file.
//!
//! ## Connections
//!
//! There is no pool. Every request gets a [`RequestContext`] holding an empty
//! connection slot ([`DbContext`]). The first `req.db()` opens the SQLite
//! file; later calls in the same request reuse that connection. When the
//! handler finishes, the context is dropped and the connection is closed,
//! including when the handler returned an error or panicked.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), jotter::Error> {
//! let app = jotter::create_app("instance", None)?;
//! app.run_command(jotter::INIT_DB)?;
//! app.serve("127.0.0.1:5000".parse().unwrap()).await
//! # }
//! ```
//!
//! ## Handlers
//!
//! ```rust,no_run
//! use jotter::{Error, Request, Response};
//!
//! async fn count_users(mut req: Request) -> Result<Response, Error> {
//!     let n: i64 = req.db()?.query_row("SELECT count(*) FROM user", [], |r| r.get(0))?;
//!     Ok(Response::text(n.to_string()))
//! }
//! ```

mod app;
mod config;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod db;
pub mod models;
pub mod password;
pub mod routes;
pub mod session;

pub use app::{App, Command, INIT_DB, create_app};
pub use config::{Config, Overrides};
pub use context::RequestContext;
pub use db::{Database, DbContext};
pub use error::Error;
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
