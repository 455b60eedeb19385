//! Application assembly, admin command and route integration tests

use bytes::Bytes;
use jotter::{App, Error, INIT_DB, Method, Overrides, Request, Response, StatusCode, create_app};
use serde_json::{Value, json};

// ──────────────────────── Helper ────────────────────────

fn overrides() -> Overrides {
    Overrides::from([
        ("SECRET_KEY".to_owned(), "test".to_owned()),
        ("PASSWORD_ROUNDS".to_owned(), "1000".to_owned()),
    ])
}

fn test_app() -> (tempfile::TempDir, App) {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(dir.path().join("instance"), Some(overrides())).unwrap();
    app.run_command(INIT_DB).unwrap();
    (dir, app)
}

fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> http::Request<Bytes> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    let body = body.map(|b| Bytes::from(b.to_string())).unwrap_or_default();
    builder.body(body).unwrap()
}

fn error_text(res: &Response) -> String {
    let body: Value = serde_json::from_slice(res.body()).unwrap();
    body["error"].as_str().unwrap().to_owned()
}

async fn register(app: &App, username: &str, password: &str) -> Response {
    app.handle(request(
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": password })),
    ))
    .await
}

/// Registers and logs in; returns the `name=value` cookie pair.
async fn login(app: &App, username: &str) -> String {
    register(app, username, "pw").await;
    let res = app
        .handle(request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": "pw" })),
        ))
        .await;
    assert_eq!(res.code(), StatusCode::FOUND);
    res.header("set-cookie").unwrap().split(';').next().unwrap().to_owned()
}

async fn create_post(app: &App, cookie: &str, title: &str) -> Response {
    app.handle(request(
        Method::POST,
        "/create",
        Some(cookie),
        Some(json!({ "title": title, "body": "text" })),
    ))
    .await
}

async fn posts(app: &App) -> Vec<Value> {
    let res = app.handle(request(Method::GET, "/", None, None)).await;
    assert_eq!(res.code(), StatusCode::OK);
    serde_json::from_slice(res.body()).unwrap()
}

// ══════════════════════════════════════════════════════════
//  create_app
// ══════════════════════════════════════════════════════════

#[test]
fn create_app_twice_on_the_same_instance_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("nested").join("instance");
    create_app(&instance, None).unwrap();
    assert!(instance.is_dir());
    create_app(&instance, None).unwrap();
}

#[test]
fn create_app_does_not_touch_the_schema() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(dir.path(), None).unwrap();
    assert!(!app.config().database().exists());
}

#[test]
fn instance_path_occupied_by_a_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("instance");
    std::fs::write(&file, "").unwrap();
    let err = create_app(&file, None).err().unwrap();
    assert!(matches!(err, Error::InstanceDir { .. }), "got {err:?}");
}

#[test]
fn instance_file_and_overrides_are_merged() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "SECRET_KEY = \"file\"\nDATABASE = \"blog.sqlite\"\n",
    )
    .unwrap();
    let app = create_app(
        dir.path(),
        Some(Overrides::from([("SECRET_KEY".to_owned(), "override".to_owned())])),
    )
    .unwrap();
    assert_eq!(app.config().secret_key(), "override");
    assert_eq!(app.config().database(), dir.path().join("blog.sqlite"));
}

// ══════════════════════════════════════════════════════════
//  init-db
// ══════════════════════════════════════════════════════════

#[test]
fn init_db_on_a_fresh_instance_creates_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(dir.path().join("instance"), None).unwrap();
    assert!(app.commands().any(|name| name == INIT_DB));

    assert_eq!(app.run_command(INIT_DB).unwrap(), "Initialized the database.");

    let conn = rusqlite::Connection::open(app.config().database()).unwrap();
    for table in ["user", "post"] {
        let n: i64 = conn
            .query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0, "{table}");
    }
}

#[test]
fn init_db_wipes_existing_rows() {
    let (_dir, app) = test_app();
    let mut ctx = app.database().context();
    ctx.acquire()
        .unwrap()
        .execute("INSERT INTO user (username, password) VALUES ('a', 'b')", [])
        .unwrap();
    ctx.release();

    app.run_command(INIT_DB).unwrap();

    let n: i64 = ctx.acquire().unwrap().query_row("SELECT count(*) FROM user", [], |r| r.get(0)).unwrap();
    assert_eq!(n, 0);
}

#[test]
fn unknown_commands_are_rejected() {
    let (_dir, app) = test_app();
    assert!(matches!(app.run_command("drop-everything"), Err(Error::UnknownCommand(_))));
}

// ══════════════════════════════════════════════════════════
//  dispatch
// ══════════════════════════════════════════════════════════

#[tokio::test]
async fn hello_says_hi() {
    let (_dir, app) = test_app();
    let res = app.handle(request(Method::GET, "/hello", None, None)).await;
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(res.body(), b"Hi Mom");
}

#[tokio::test]
async fn unknown_routes_are_404() {
    let (_dir, app) = test_app();
    let res = app.handle(request(Method::GET, "/nope/nope/nope", None, None)).await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
}

async fn lock_then_panic(mut req: Request) -> Response {
    req.db().unwrap().execute_batch("BEGIN EXCLUSIVE").unwrap();
    panic!("boom");
}

#[tokio::test]
async fn panicking_handler_is_a_500_and_releases_its_connection() {
    let (_dir, app) = test_app();
    let app = app.mount(|router| router.get("/boom", lock_then_panic));

    let res = app.handle(request(Method::GET, "/boom", None, None)).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);

    let conn = rusqlite::Connection::open(app.config().database()).unwrap();
    conn.busy_timeout(std::time::Duration::ZERO).unwrap();
    conn.execute_batch("BEGIN EXCLUSIVE; COMMIT").unwrap();
}

#[tokio::test]
async fn missing_database_file_directory_is_a_500() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone").join("db.sqlite");
    let app = create_app(
        dir.path(),
        Some(Overrides::from([("DATABASE".to_owned(), missing.to_string_lossy().into_owned())])),
    )
    .unwrap();

    let res = app.handle(request(Method::GET, "/", None, None)).await;
    assert_eq!(res.code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_text(&res), "internal server error");
}

// ══════════════════════════════════════════════════════════
//  auth
// ══════════════════════════════════════════════════════════

#[tokio::test]
async fn register_validates_input() {
    let (_dir, app) = test_app();

    let res = register(&app, "", "pw").await;
    assert_eq!(res.code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&res), "Username is required.");

    let res = register(&app, "alice", "").await;
    assert_eq!(error_text(&res), "Password is required.");

    let res = app.handle(request(Method::POST, "/auth/register", None, None)).await;
    assert_eq!(res.code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_redirects_to_login_and_rejects_duplicates() {
    let (_dir, app) = test_app();

    let res = register(&app, "alice", "pw").await;
    assert_eq!(res.code(), StatusCode::FOUND);
    assert_eq!(res.header("location"), Some("/auth/login"));

    let res = register(&app, "alice", "pw").await;
    assert_eq!(res.code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&res), "User alice is already registered.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_registrations_hash_off_the_workers() {
    let (_dir, app) = test_app();
    let (a, b, hello) = tokio::join!(
        register(&app, "alice", "pw"),
        register(&app, "bob", "pw"),
        app.handle(request(Method::GET, "/hello", None, None)),
    );
    assert_eq!(a.code(), StatusCode::FOUND);
    assert_eq!(b.code(), StatusCode::FOUND);
    assert_eq!(hello.body(), b"Hi Mom");
    assert_eq!(login(&app, "alice").await.split('=').next(), Some("session"));
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let (_dir, app) = test_app();
    register(&app, "alice", "pw").await;

    let attempt = |username: &str, password: &str| {
        request(Method::POST, "/auth/login", None, Some(json!({ "username": username, "password": password })))
    };

    let res = app.handle(attempt("bob", "pw")).await;
    assert_eq!(error_text(&res), "Incorrect username.");

    let res = app.handle(attempt("alice", "nope")).await;
    assert_eq!(error_text(&res), "Incorrect password.");
    assert!(res.header("set-cookie").is_none());
}

#[tokio::test]
async fn logout_clears_the_session() {
    let (_dir, app) = test_app();
    let res = app.handle(request(Method::GET, "/auth/logout", None, None)).await;
    assert_eq!(res.code(), StatusCode::FOUND);
    assert!(res.header("set-cookie").unwrap().contains("Max-Age=0"));
}

// ══════════════════════════════════════════════════════════
//  blog
// ══════════════════════════════════════════════════════════

#[tokio::test]
async fn create_requires_login() {
    let (_dir, app) = test_app();
    let res = app
        .handle(request(Method::POST, "/create", None, Some(json!({ "title": "t", "body": "b" }))))
        .await;
    assert_eq!(res.code(), StatusCode::FOUND);
    assert_eq!(res.header("location"), Some("/auth/login"));
    assert!(posts(&app).await.is_empty());
}

#[tokio::test]
async fn forged_session_counts_as_logged_out() {
    let (_dir, app) = test_app();
    login(&app, "alice").await;

    let res = create_post(&app, "session=eyJ1c2VyX2lkIjoxfQ.AAAA", "t").await;
    assert_eq!(res.header("location"), Some("/auth/login"));
}

#[tokio::test]
async fn created_posts_are_listed_with_their_author() {
    let (_dir, app) = test_app();
    let cookie = login(&app, "alice").await;

    let res = create_post(&app, &cookie, "").await;
    assert_eq!(error_text(&res), "Title is required.");

    let res = create_post(&app, &cookie, "first").await;
    assert_eq!(res.code(), StatusCode::FOUND);
    assert_eq!(res.header("location"), Some("/"));
    create_post(&app, &cookie, "second").await;

    let listed = posts(&app).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["title"], "second");
    assert_eq!(listed[0]["username"], "alice");
    assert!(listed[0]["created"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn authors_can_edit_and_delete_their_posts() {
    let (_dir, app) = test_app();
    let cookie = login(&app, "alice").await;
    create_post(&app, &cookie, "draft").await;
    let id = posts(&app).await[0]["id"].as_i64().unwrap();

    let res = app.handle(request(Method::GET, &format!("/{id}/update"), Some(cookie.as_str()), None)).await;
    assert_eq!(res.code(), StatusCode::OK);
    let post: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(post["title"], "draft");

    let res = app
        .handle(request(
            Method::POST,
            &format!("/{id}/update"),
            Some(cookie.as_str()),
            Some(json!({ "title": "final", "body": "done" })),
        ))
        .await;
    assert_eq!(res.code(), StatusCode::FOUND);
    assert_eq!(posts(&app).await[0]["title"], "final");

    let res = app.handle(request(Method::POST, &format!("/{id}/delete"), Some(cookie.as_str()), None)).await;
    assert_eq!(res.code(), StatusCode::FOUND);
    assert!(posts(&app).await.is_empty());
}

#[tokio::test]
async fn other_users_cannot_touch_a_post() {
    let (_dir, app) = test_app();
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;
    create_post(&app, &alice, "mine").await;
    let id = posts(&app).await[0]["id"].as_i64().unwrap();

    let res = app.handle(request(Method::GET, &format!("/{id}/update"), Some(bob.as_str()), None)).await;
    assert_eq!(res.code(), StatusCode::FORBIDDEN);

    let edit = json!({ "title": "hijacked", "body": "" });
    let res = app
        .handle(request(Method::POST, &format!("/{id}/update"), Some(bob.as_str()), Some(edit)))
        .await;
    assert_eq!(res.code(), StatusCode::FORBIDDEN);

    let res = app.handle(request(Method::POST, &format!("/{id}/delete"), Some(bob.as_str()), None)).await;
    assert_eq!(res.code(), StatusCode::FORBIDDEN);

    let remaining = posts(&app).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["title"], "mine");
}

#[tokio::test]
async fn update_requires_login() {
    let (_dir, app) = test_app();
    let alice = login(&app, "alice").await;
    create_post(&app, &alice, "mine").await;
    let id = posts(&app).await[0]["id"].as_i64().unwrap();

    for method in [Method::GET, Method::POST] {
        let body = (method == Method::POST).then(|| json!({ "title": "anon", "body": "" }));
        let res = app.handle(request(method, &format!("/{id}/update"), None, body)).await;
        assert_eq!(res.code(), StatusCode::FOUND);
        assert_eq!(res.header("location"), Some("/auth/login"));
    }
    assert_eq!(posts(&app).await[0]["title"], "mine");
}

#[tokio::test]
async fn update_rejects_an_empty_title() {
    let (_dir, app) = test_app();
    let alice = login(&app, "alice").await;
    create_post(&app, &alice, "mine").await;
    let id = posts(&app).await[0]["id"].as_i64().unwrap();

    let edit = json!({ "title": "", "body": "changed" });
    let res = app
        .handle(request(Method::POST, &format!("/{id}/update"), Some(alice.as_str()), Some(edit)))
        .await;
    assert_eq!(res.code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_text(&res), "Title is required.");
    assert_eq!(posts(&app).await[0]["title"], "mine");
}

#[tokio::test]
async fn missing_posts_are_404() {
    let (_dir, app) = test_app();
    let cookie = login(&app, "alice").await;

    let res = app.handle(request(Method::GET, "/99/update", Some(cookie.as_str()), None)).await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
    assert_eq!(error_text(&res), "Post id 99 doesn't exist.");

    let res = app.handle(request(Method::GET, "/abc/update", Some(cookie.as_str()), None)).await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
}
