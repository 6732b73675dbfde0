// MIT License
// Copyright (c) 2024 Graham King

//! Hand-picked sets of articles shown in a named homepage block. The group
//! on show is the one with the latest `publish_start` that has already begun.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::article::{self, Article};
use crate::{db, Error, Id, Result};

pub const EDITORS_PICKS: &str = "editors_picks";
pub const WIP_BLOCK: &str = "wip";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ArticleGroup {
    pub id: Id,
    pub target_block: String,
    /// Not shown anywhere until set
    pub publish_start: Option<DateTime<Utc>>,
}

impl ArticleGroup {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<ArticleGroup> {
        Ok(ArticleGroup {
            id: row.get(0)?,
            target_block: row.get(1)?,
            publish_start: row.get(2)?,
        })
    }
}

pub fn create_group(
    db_conn: &Connection,
    target_block: &str,
    publish_start: Option<DateTime<Utc>>,
) -> Result<ArticleGroup> {
    if target_block.trim().is_empty() {
        return Err(Error::validation("target_block", "must not be empty"));
    }
    let id = db_conn.query_row(
        "INSERT INTO article_group (target_block, publish_start) VALUES (?1, ?2) RETURNING id",
        (target_block, publish_start),
        |row| row.get::<_, Id>(0),
    )?;
    tracing::info!(id, target_block, "article group created");
    get_group(db_conn, id)
}

pub fn get_group(db_conn: &Connection, id: Id) -> Result<ArticleGroup> {
    db_conn
        .query_row(
            "SELECT id, target_block, publish_start FROM article_group WHERE id = ?1",
            [id],
            ArticleGroup::from_row,
        )
        .optional()?
        .ok_or(Error::not_found("article group", id))
}

/// Adding an article twice is a no-op
pub fn add_to_group(db_conn: &mut Connection, group_id: Id, article_ids: &[Id]) -> Result<()> {
    let tx = db::write_tx(db_conn)?;
    get_group(&tx, group_id)?;
    for &article_id in article_ids {
        article::find_visible(&tx, article_id)?;
        tx.execute(
            "INSERT OR IGNORE INTO article_group_member (group_id, article_id) VALUES (?1, ?2)",
            (group_id, article_id),
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Member ids in the order they were added
pub fn group_article_ids(db_conn: &Connection, group_id: Id) -> Result<Vec<Id>> {
    let mut stmt = db_conn
        .prepare("SELECT article_id FROM article_group_member WHERE group_id = ?1 ORDER BY id")?;
    let ids = stmt.query_map([group_id], |row| row.get(0))?;
    Ok(ids.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn current_for_block(db_conn: &Connection, block: &str) -> Result<Option<ArticleGroup>> {
    current_for_block_at(db_conn, block, Utc::now())
}

/// Latest group for the block whose `publish_start` is at or before `now`
pub fn current_for_block_at(
    db_conn: &Connection,
    block: &str,
    now: DateTime<Utc>,
) -> Result<Option<ArticleGroup>> {
    let mut stmt = db_conn.prepare(
        "SELECT id, target_block, publish_start FROM article_group
         WHERE target_block = ?1 AND publish_start IS NOT NULL",
    )?;
    let groups = stmt
        .query_map([block], ArticleGroup::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(groups
        .into_iter()
        .filter(|g| g.publish_start.is_some_and(|start| start <= now))
        .max_by_key(|g| (g.publish_start, g.id)))
}

/// Members of the block's current group that `user` may see
pub fn current_articles(db_conn: &Connection, block: &str, user: Option<Id>) -> Result<Vec<Article>> {
    let Some(group) = current_for_block(db_conn, block)? else {
        return Ok(vec![]);
    };
    let mut articles = vec![];
    for id in group_article_ids(db_conn, group.id)? {
        match article::get_for_user(db_conn, id, user) {
            Ok(a) => articles.push(a),
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(articles)
}

pub fn editors_picks(db_conn: &Connection, user: Option<Id>) -> Result<Vec<Article>> {
    current_articles(db_conn, EDITORS_PICKS, user)
}

pub fn promoted_wip(db_conn: &Connection, user: Option<Id>) -> Result<Vec<Article>> {
    current_articles(db_conn, WIP_BLOCK, user)
}

/// Member of any group, shown or not
pub fn is_editors_pick(db_conn: &Connection, article_id: Id) -> Result<bool> {
    Ok(db_conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM article_group_member WHERE article_id = ?1)",
        [article_id],
        |row| row.get(0),
    )?)
}
