//! Per-request state.

use std::sync::Arc;

use rusqlite::Connection;

use crate::config::Config;
use crate::db::DbContext;
use crate::error::Error;
use crate::models::{self, User};
use crate::session::Session;

/// Everything that lives exactly as long as one request.
///
/// Created by [`App::handle`](crate::App::handle) before the handler runs and
/// dropped when the handler's future completes, which closes the database
/// connection if one was opened.
#[derive(Debug)]
pub struct RequestContext {
    config: Arc<Config>,
    db: DbContext,
    session: Session,
    // None: not looked up yet. Some(None): looked up, nobody logged in.
    user: Option<Option<User>>,
}

impl RequestContext {
    pub fn new(config: Arc<Config>, db: DbContext, session: Session) -> Self {
        Self { config, db, session, user: None }
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn session(&self) -> &Session { &self.session }

    /// The request's database connection. See [`DbContext::acquire`].
    pub fn db(&mut self) -> Result<&Connection, Error> {
        self.db.acquire()
    }

    /// The logged-in user, loaded from the session on first call.
    ///
    /// A session pointing at a user that no longer exists counts as logged
    /// out. Requests without a session never touch the database here.
    pub fn current_user(&mut self) -> Result<Option<User>, Error> {
        if self.user.is_none() {
            let user = match self.session.user_id {
                Some(id) => models::find_user_by_id(self.db.acquire()?, id)?,
                None => None,
            };
            self.user = Some(user);
        }
        Ok(self.user.clone().flatten())
    }
}
