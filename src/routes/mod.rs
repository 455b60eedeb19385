//! Route groups.
//!
//! | Group | Prefix | Module |
//! |---|---|---|
//! | authentication | `/auth` | [`auth`] |
//! | posts | `/` | [`blog`] |

pub mod auth;
pub mod blog;

use crate::Router;

/// Adds every route group, plus `/hello`, to `router`.
pub fn register(router: Router) -> Router {
    let router = router.get("/hello", hello);
    let router = auth::mount(router);
    blog::mount(router)
}

async fn hello(_req: crate::Request) -> &'static str {
    "Hi Mom"
}
