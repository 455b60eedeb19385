//! Row types and the queries the route groups run.

use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Stored hash, see [`crate::password`].
    pub password: String,
}

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            password: row.get("password")?,
        })
    }
}

/// A post joined with its author's name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub created: NaiveDateTime,
    pub author_id: i64,
    pub username: String,
}

impl Post {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            body: row.get("body")?,
            created: row.get("created")?,
            author_id: row.get("author_id")?,
            username: row.get("username")?,
        })
    }
}

const POST_COLUMNS: &str = "SELECT p.id, title, body, created, author_id, username \
                            FROM post p JOIN user u ON p.author_id = u.id";

pub fn find_user_by_id(conn: &Connection, id: i64) -> Result<Option<User>, Error> {
    Ok(conn
        .query_row("SELECT * FROM user WHERE id = ?1", params![id], User::from_row)
        .optional()?)
}

pub fn find_user_by_name(conn: &Connection, username: &str) -> Result<Option<User>, Error> {
    Ok(conn
        .query_row("SELECT * FROM user WHERE username = ?1", params![username], User::from_row)
        .optional()?)
}

/// Inserts a user. Returns `Ok(None)` when the username is already taken.
pub fn insert_user(conn: &Connection, username: &str, password_hash: &str) -> Result<Option<i64>, Error> {
    match conn.execute(
        "INSERT INTO user (username, password) VALUES (?1, ?2)",
        params![username, password_hash],
    ) {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Every post, newest first.
pub fn list_posts(conn: &Connection) -> Result<Vec<Post>, Error> {
    let mut stmt = conn.prepare(&format!("{POST_COLUMNS} ORDER BY created DESC, p.id DESC"))?;
    let posts = stmt
        .query_map([], Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn find_post(conn: &Connection, id: i64) -> Result<Option<Post>, Error> {
    Ok(conn
        .query_row(&format!("{POST_COLUMNS} WHERE p.id = ?1"), params![id], Post::from_row)
        .optional()?)
}

pub fn insert_post(conn: &Connection, author_id: i64, title: &str, body: &str) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO post (title, body, author_id) VALUES (?1, ?2, ?3)",
        params![title, body, author_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_post(conn: &Connection, id: i64, title: &str, body: &str) -> Result<(), Error> {
    conn.execute(
        "UPDATE post SET title = ?1, body = ?2 WHERE id = ?3",
        params![title, body, id],
    )?;
    Ok(())
}

pub fn delete_post(conn: &Connection, id: i64) -> Result<(), Error> {
    conn.execute("DELETE FROM post WHERE id = ?1", params![id])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SCHEMA;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    #[test]
    fn duplicate_usernames_are_reported_not_raised() {
        let conn = memory_db();
        assert!(insert_user(&conn, "alice", "h").unwrap().is_some());
        assert_eq!(insert_user(&conn, "alice", "h").unwrap(), None);
    }

    #[test]
    fn created_decodes_as_a_datetime() {
        let conn = memory_db();
        let author = insert_user(&conn, "alice", "h").unwrap().unwrap();
        conn.execute(
            "INSERT INTO post (title, body, author_id, created) VALUES ('t', 'b', ?1, '2024-05-01 12:30:00')",
            params![author],
        )
        .unwrap();

        let posts = list_posts(&conn).unwrap();
        let post = &posts[0];
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(post.created, expected);
        assert_eq!(post.username, "alice");
    }

    #[test]
    fn posts_are_listed_newest_first() {
        let conn = memory_db();
        let author = insert_user(&conn, "alice", "h").unwrap().unwrap();
        for (title, created) in [("old", "2024-01-01T00:00:00"), ("new", "2024-02-01T00:00:00")] {
            conn.execute(
                "INSERT INTO post (title, body, author_id, created) VALUES (?1, '', ?2, ?3)",
                params![title, author, created],
            )
            .unwrap();
        }
        let titles: Vec<_> = list_posts(&conn).unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, ["new", "old"]);
    }
}
