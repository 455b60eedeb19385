//! Listing, creating, editing and deleting posts.

use serde::Deserialize;

use crate::error::Error;
use crate::models::{self, Post};
use crate::routes::auth::login_required;
use crate::{Request, Response, Router};

pub fn mount(router: Router) -> Router {
    router
        .get("/", index)
        .post("/create", create)
        .get("/{id}/update", edit)
        .post("/{id}/update", update)
        .post("/{id}/delete", delete)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    title: String,
    body: String,
}

impl PostForm {
    fn validate(&self) -> Result<(), Error> {
        if self.title.is_empty() {
            return Err(Error::Validation("Title is required.".into()));
        }
        Ok(())
    }
}

fn post_id(req: &Request) -> Result<i64, Error> {
    let raw = req.param("id").unwrap_or_default();
    raw.parse()
        .map_err(|_| Error::NotFound(format!("Post id {raw} doesn't exist.")))
}

/// Loads post `id`, which the current user must have written.
fn author_post(req: &mut Request, id: i64) -> Result<Post, Error> {
    let user = login_required(req)?;
    let post = models::find_post(req.db()?, id)?
        .ok_or_else(|| Error::NotFound(format!("Post id {id} doesn't exist.")))?;
    if post.author_id != user.id {
        return Err(Error::Forbidden);
    }
    Ok(post)
}

async fn index(mut req: Request) -> Result<Response, Error> {
    let posts = models::list_posts(req.db()?)?;
    Response::json_of(&posts)
}

async fn create(mut req: Request) -> Result<Response, Error> {
    let user = login_required(&mut req)?;
    let form: PostForm = req.json()?;
    form.validate()?;

    models::insert_post(req.db()?, user.id, &form.title, &form.body)?;
    Ok(Response::redirect("/"))
}

async fn edit(mut req: Request) -> Result<Response, Error> {
    let id = post_id(&req)?;
    let post = author_post(&mut req, id)?;
    Response::json_of(&post)
}

async fn update(mut req: Request) -> Result<Response, Error> {
    let id = post_id(&req)?;
    author_post(&mut req, id)?;
    let form: PostForm = req.json()?;
    form.validate()?;

    models::update_post(req.db()?, id, &form.title, &form.body)?;
    Ok(Response::redirect("/"))
}

async fn delete(mut req: Request) -> Result<Response, Error> {
    let id = post_id(&req)?;
    author_post(&mut req, id)?;
    models::delete_post(req.db()?, id)?;
    Ok(Response::redirect("/"))
}
