//! Application assembly and per-request dispatch.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use tracing::info;

use crate::config::{Config, Overrides};
use crate::context::RequestContext;
use crate::db::{self, Database};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::routes;
use crate::server::Server;
use crate::session::Session;

/// An administrative action run outside request handling. Returns the line
/// to show the operator.
pub type Command = fn(&App) -> Result<String, Error>;

/// Name of the destructive schema command.
pub const INIT_DB: &str = "init-db";

/// A configured application, ready to serve requests or run commands.
pub struct App {
    config: Arc<Config>,
    database: Database,
    router: Router,
    commands: BTreeMap<&'static str, Command>,
}

/// Builds the application rooted at `instance_path`.
///
/// Configuration is merged from defaults, `<instance>/config.toml` and
/// `overrides`. The instance directory is created if needed; an existing one
/// is fine. The schema is *not* touched, run [`INIT_DB`] for that.
pub fn create_app(instance_path: impl Into<PathBuf>, overrides: Option<Overrides>) -> Result<App, Error> {
    let config = Config::load(instance_path, overrides.as_ref())?;
    ensure_instance_dir(&config)?;

    let database = Database::new(config.database());
    let router = routes::register(Router::new());

    let mut commands: BTreeMap<&'static str, Command> = BTreeMap::new();
    commands.insert(INIT_DB, init_db_command);

    info!(
        instance = %config.instance_path().display(),
        database = %database.path().display(),
        "application configured"
    );
    Ok(App { config: Arc::new(config), database, router, commands })
}

fn ensure_instance_dir(config: &Config) -> Result<(), Error> {
    let path = config.instance_path();
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(Error::InstanceDir { path: path.to_owned(), source }),
    }
}

fn init_db_command(app: &App) -> Result<String, Error> {
    db::init_schema(&app.database)?;
    Ok("Initialized the database.".to_owned())
}

impl App {
    pub fn config(&self) -> &Config { &self.config }
    pub fn database(&self) -> &Database { &self.database }

    /// Adds another route group next to the built-in ones.
    pub fn mount(mut self, group: impl FnOnce(Router) -> Router) -> Self {
        self.router = group(std::mem::take(&mut self.router));
        self
    }

    /// Names of the registered administrative commands.
    pub fn commands(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn run_command(&self, name: &str) -> Result<String, Error> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| Error::UnknownCommand(name.to_owned()))?;
        command(self)
    }

    /// Routes one request and produces one response.
    ///
    /// The matched handler owns the request context and runs on its own task
    /// (see [`Handler`](crate::Handler)), so the context is torn down even
    /// when the handler panics. A panic becomes a `500`.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_owned();

        let response = match self.router.lookup(&method, &path) {
            Some((endpoint, params)) => {
                let cookie = parts.headers.get(http::header::COOKIE).and_then(|v| v.to_str().ok());
                let session = Session::from_cookie_header(cookie, self.config.secret_key());
                let ctx = RequestContext::new(Arc::clone(&self.config), self.database.context(), session);

                endpoint.run(Request::new(parts, body, params, ctx)).await
            }
            None => Response::status(StatusCode::NOT_FOUND),
        };

        info!(
            %method,
            %path,
            status = response.code().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request"
        );
        response
    }

    /// Serves HTTP on `addr` until SIGTERM or Ctrl-C.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), Error> {
        Server::bind(addr).serve(self).await
    }
}
