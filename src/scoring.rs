// MIT License
// Copyright (c) 2024 Graham King

//! The score ledger. Every change to an author's score is an appended
//! `score_transaction` row plus the matching update of `author.score`, in the
//! same transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params_from_iter, Connection};

use crate::article::Article;
use crate::config::ActivityPoints;
use crate::{db, profile, Error, Id, Result};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScoreTransaction {
    pub id: Id,
    pub user_id: Id,
    pub change: i64,
    pub operation: String,
    pub happened_at: DateTime<Utc>,
}

/// Append a ledger entry and apply it to the user's score.
/// No floor is enforced here, see [`score_change`].
pub fn record(db_conn: &mut rusqlite::Connection, user_id: Id, change: i64, operation: &str) -> Result<()> {
    let tx = db::write_tx(db_conn)?;
    record_in(&tx, user_id, change, operation)?;
    tx.commit()?;
    Ok(())
}

pub(crate) fn record_in(db_conn: &Connection, user_id: Id, change: i64, operation: &str) -> Result<()> {
    let updated = db_conn.execute(
        "UPDATE author SET score = score + ?1 WHERE id = ?2",
        (change, user_id),
    )?;
    if updated == 0 {
        return Err(Error::not_found("author", user_id));
    }
    db_conn.execute(
        "INSERT INTO score_transaction (user_id, change, operation, happened_at) VALUES (?1, ?2, ?3, ?4)",
        (user_id, change, operation, Utc::now()),
    )?;
    tracing::debug!(user_id, change, operation, "score recorded");
    Ok(())
}

/// Same change for many users: one bulk score update, one ledger row each
pub(crate) fn record_bulk_in(
    db_conn: &Connection,
    user_ids: &[Id],
    change: i64,
    operation: &str,
) -> Result<()> {
    if user_ids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "UPDATE author SET score = score + ? WHERE id IN ({})",
        db::placeholders(user_ids.len())
    );
    let params = std::iter::once(change).chain(user_ids.iter().copied());
    db_conn.execute(&sql, params_from_iter(params))?;
    let now = Utc::now();
    let mut stmt = db_conn.prepare(
        "INSERT INTO score_transaction (user_id, change, operation, happened_at) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for user_id in user_ids {
        stmt.execute((user_id, change, operation, now))?;
    }
    Ok(())
}

/// Record `delta` unless it would take the user's score below zero
pub fn score_change(
    db_conn: &mut rusqlite::Connection,
    user_id: Id,
    delta: i64,
    operation: &str,
) -> Result<()> {
    let tx = db::write_tx(db_conn)?;
    let current = profile::get_author(&tx, user_id)?.score;
    if current + delta < 0 {
        return Err(Error::Forbidden(format!(
            "{operation} needs {} points, user {user_id} has {current}",
            -delta
        )));
    }
    record_in(&tx, user_id, delta, operation)?;
    tx.commit()?;
    Ok(())
}

/// Does the user have at least `minimum` points?
pub fn score_check(db_conn: &Connection, user_id: Id, minimum: i64) -> Result<bool> {
    Ok(profile::get_author(db_conn, user_id)?.score >= minimum)
}

/// Points for creating an article, with a bonus per link
pub fn award_for_create(
    db_conn: &mut rusqlite::Connection,
    points: &ActivityPoints,
    article: &Article,
    user_id: Id,
) -> Result<i64> {
    let links = article.links_count;
    let mut operation = format!("Created article {}", article.id);
    if links > 0 {
        let s = if links > 1 { "s" } else { "" };
        operation.push_str(&format!(" with {links} link{s}"));
    }
    let change = points.creating_article + points.adding_links * links;
    record(db_conn, user_id, change, &operation)?;
    Ok(change)
}

/// Points for an edit, plus a bonus for each link the edit added
pub fn award_for_edit(
    db_conn: &mut rusqlite::Connection,
    points: &ActivityPoints,
    article: &Article,
    user_id: Id,
    previous_links: i64,
) -> Result<i64> {
    let tx = db::write_tx(db_conn)?;
    let mut total = points.editing_article;
    record_in(&tx, user_id, total, &format!("Edited article {}", article.id))?;
    let link_diff = article.links_count - previous_links;
    if link_diff > 0 {
        let change = points.adding_links * link_diff;
        let s = if link_diff > 1 { "s" } else { "" };
        record_in(
            &tx,
            user_id,
            change,
            &format!("Added {link_diff} link{s} to article {}", article.id),
        )?;
        total += change;
    }
    tx.commit()?;
    Ok(total)
}

/// Newest first
pub fn transactions_for(db_conn: &Connection, user_id: Id) -> Result<Vec<ScoreTransaction>> {
    let mut stmt = db_conn.prepare(
        "SELECT id, user_id, change, operation, happened_at FROM score_transaction
         WHERE user_id = ?1 ORDER BY id DESC",
    )?;
    let rows = stmt.query_map([user_id], |row| {
        Ok(ScoreTransaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            change: row.get(2)?,
            operation: row.get(3)?,
            happened_at: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
