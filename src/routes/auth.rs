//! Registration, login and logout.

use serde::Deserialize;

use crate::error::Error;
use crate::models::{self, User};
use crate::password::{hash_password, verify_password};
use crate::session::Session;
use crate::{Request, Response, Router};

pub const LOGIN_PATH: &str = "/auth/login";

pub fn mount(router: Router) -> Router {
    router
        .post("/auth/register", register)
        .post(LOGIN_PATH, login)
        .get("/auth/logout", logout)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    fn validate(&self) -> Result<(), Error> {
        if self.username.is_empty() {
            return Err(Error::Validation("Username is required.".into()));
        }
        if self.password.is_empty() {
            return Err(Error::Validation("Password is required.".into()));
        }
        Ok(())
    }
}

/// Runs CPU-heavy password work off the async workers.
async fn blocking<T: Send + 'static>(work: impl FnOnce() -> T + Send + 'static) -> Result<T, Error> {
    Ok(tokio::task::spawn_blocking(work).await?)
}

/// The logged-in user, or [`Error::LoginRequired`].
pub fn login_required(req: &mut Request) -> Result<User, Error> {
    req.current_user()?.ok_or(Error::LoginRequired)
}

async fn register(mut req: Request) -> Result<Response, Error> {
    let form: Credentials = req.json()?;
    form.validate()?;

    let rounds = req.config().password_rounds();
    let password = form.password.clone();
    let hash = blocking(move || hash_password(&password, rounds)).await?;
    match models::insert_user(req.db()?, &form.username, &hash)? {
        Some(id) => {
            tracing::info!(user_id = id, "user registered");
            Ok(Response::redirect(LOGIN_PATH))
        }
        None => Err(Error::Validation(format!("User {} is already registered.", form.username))),
    }
}

async fn login(mut req: Request) -> Result<Response, Error> {
    let form: Credentials = req.json()?;

    let user = models::find_user_by_name(req.db()?, &form.username)?
        .ok_or_else(|| Error::Validation("Incorrect username.".into()))?;
    let (stored, password) = (user.password.clone(), form.password);
    if !blocking(move || verify_password(&stored, &password)).await? {
        return Err(Error::Validation("Incorrect password.".into()));
    }

    let cookie = Session::for_user(user.id).to_set_cookie(req.config().secret_key())?;
    Ok(Response::redirect("/").with_header("set-cookie", cookie))
}

async fn logout(_req: Request) -> Response {
    Response::redirect("/").with_header("set-cookie", Session::clear_cookie())
}
