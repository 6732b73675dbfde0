// MIT License
// Copyright (c) 2024 Graham King

use rusqlite::{Connection, OptionalExtension};

use crate::{Error, Id, Result};

/// A user together with their contribution statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Author {
    pub id: Id,
    pub username: String,
    pub display_name: String,
    pub is_superuser: bool,
    pub can_publish: bool,
    pub score: i64,
    pub articles_published_count: i64,
    pub edits_count: i64,
    pub kudos_given_count: i64,
}

const AUTHOR_COLUMNS: &str = "id, username, display_name, is_superuser, can_publish, score, \
     articles_published_count, edits_count, kudos_given_count";

impl Author {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Author> {
        Ok(Author {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            is_superuser: row.get(3)?,
            can_publish: row.get(4)?,
            score: row.get(5)?,
            articles_published_count: row.get(6)?,
            edits_count: row.get(7)?,
            kudos_given_count: row.get(8)?,
        })
    }

    pub fn github_profile_url(&self) -> String {
        format!("https://github.com/{}", self.username)
    }
}

/// New profile, display name defaults to the username
pub fn create_author(db_conn: &Connection, username: &str, is_superuser: bool) -> Result<Author> {
    if username.trim().is_empty() {
        return Err(Error::validation("username", "must not be empty"));
    }
    let id = db_conn.query_row(
        "INSERT INTO author (username, display_name, is_superuser) VALUES (?1, ?1, ?2) RETURNING id",
        (username, is_superuser),
        |row| row.get::<_, Id>(0),
    )?;
    tracing::info!(id, username, "author created");
    get_author(db_conn, id)
}

pub fn get_author(db_conn: &Connection, id: Id) -> Result<Author> {
    db_conn
        .query_row(
            &format!("SELECT {AUTHOR_COLUMNS} FROM author WHERE id = ?1"),
            [id],
            Author::from_row,
        )
        .optional()?
        .ok_or(Error::not_found("author", id))
}

pub fn find_by_username(db_conn: &Connection, username: &str) -> Result<Option<Author>> {
    Ok(db_conn
        .query_row(
            &format!("SELECT {AUTHOR_COLUMNS} FROM author WHERE username = ?1"),
            [username],
            Author::from_row,
        )
        .optional()?)
}

pub(crate) fn refresh_published_count(db_conn: &Connection, author_id: Id) -> Result<()> {
    db_conn.execute(
        r#"UPDATE author SET articles_published_count = (
            SELECT COUNT(*) FROM article
            WHERE original_author_id = ?1 AND published_at IS NOT NULL
        ) WHERE id = ?1"#,
        [author_id],
    )?;
    Ok(())
}

pub(crate) fn increment_edits(db_conn: &Connection, author_id: Id) -> Result<()> {
    db_conn.execute(
        "UPDATE author SET edits_count = edits_count + 1 WHERE id = ?1",
        [author_id],
    )?;
    Ok(())
}

pub(crate) fn increment_kudos_given(db_conn: &Connection, author_id: Id) -> Result<()> {
    db_conn.execute(
        "UPDATE author SET kudos_given_count = kudos_given_count + 1 WHERE id = ?1",
        [author_id],
    )?;
    Ok(())
}
