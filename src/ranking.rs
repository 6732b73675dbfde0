// MIT License
// Copyright (c) 2024 Graham King

//! "Hotness": recent kudos, decayed by how long ago the article was published.
//!
//! `hotness = ln((kudos + 1) * exp(-0.05 * days^2))` with `days` capped at a
//! week, so the decay is gentle for the first few days and flat afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params_from_iter, Connection, ToSql};

use crate::article::{self, Article};
use crate::tags::{self, TagCount, Taggable};
use crate::{db, Id, Result};

/// Kudos older than this don't count towards a listing's ranking
pub const HOT_WINDOW_DAYS: i64 = 7;

/// Window used for trending tags
pub const TRENDING_WINDOW_DAYS: i64 = 31;

const MAX_DECAY_DAYS: i64 = 7;
const DECAY: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Ranked {
    #[serde(flatten)]
    pub article: Article,
    pub hotness: f64,
    /// Kudos inside the window
    pub recent_kudos: i64,
}

pub fn hotness(kudos: i64, days_since_published: i64) -> f64 {
    // Cap before squaring, old articles must not underflow exp
    let days = days_since_published.clamp(0, MAX_DECAY_DAYS) as f64;
    ((kudos.max(0) as f64 + 1.0) * (-DECAY * days * days).exp()).ln()
}

/// Kudos the article received strictly after `from`
pub fn kudos_count_since(db_conn: &Connection, article_id: Id, from: DateTime<Utc>) -> Result<i64> {
    let count = db_conn
        .prepare_cached("SELECT COUNT(*) FROM kudos WHERE article_id = ?1 AND timestamp > ?2")?
        .query_row((article_id, from), |row| row.get(0))?;
    Ok(count)
}

/// [`kudos_count_since`] for many articles in one query.
/// Articles without recent kudos are absent from the map.
fn kudos_counts_since(
    db_conn: &Connection,
    article_ids: &[Id],
    from: DateTime<Utc>,
) -> Result<HashMap<Id, i64>> {
    if article_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!(
        "SELECT article_id, COUNT(*) FROM kudos
         WHERE timestamp > ? AND article_id IN ({})
         GROUP BY article_id",
        db::placeholders(article_ids.len())
    );
    let mut stmt = db_conn.prepare(&sql)?;
    let mut params: Vec<&dyn ToSql> = vec![&from];
    params.extend(article_ids.iter().map(|id| id as &dyn ToSql));
    let rows = stmt.query_map(params_from_iter(params), |row| Ok((row.get(0)?, row.get(1)?)))?;
    Ok(rows.collect::<rusqlite::Result<HashMap<_, _>>>()?)
}

/// Published articles, hottest first. Unpublished ones are dropped.
/// `from` defaults to a week ago.
pub fn sorted_by_hot(
    db_conn: &Connection,
    articles: Vec<Article>,
    from: Option<DateTime<Utc>>,
) -> Result<Vec<Ranked>> {
    sorted_by_hot_at(db_conn, articles, from, Utc::now())
}

/// [`sorted_by_hot`] as seen at `now`
pub fn sorted_by_hot_at(
    db_conn: &Connection,
    articles: Vec<Article>,
    from: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Vec<Ranked>> {
    let from = from.unwrap_or(now - Duration::days(HOT_WINDOW_DAYS));
    let published: Vec<Id> = articles
        .iter()
        .filter(|a| a.is_published())
        .map(|a| a.id)
        .collect();
    let counts = kudos_counts_since(db_conn, &published, from)?;
    let mut ranked = Vec::with_capacity(published.len());
    for article in articles {
        let Some(published_at) = article.published_at else {
            continue;
        };
        let recent_kudos = counts.get(&article.id).copied().unwrap_or(0);
        let days = (now - published_at).num_days();
        ranked.push(Ranked {
            hotness: hotness(recent_kudos, days),
            recent_kudos,
            article,
        });
    }
    // stable, ties keep their input order
    ranked.sort_by(|a, b| b.hotness.total_cmp(&a.hotness));
    Ok(ranked)
}

/// Tags of the articles that are hot over the last month, most used first
pub fn get_trending_tags(db_conn: &Connection) -> Result<Vec<TagCount>> {
    get_trending_tags_at(db_conn, Utc::now())
}

pub fn get_trending_tags_at(db_conn: &Connection, now: DateTime<Utc>) -> Result<Vec<TagCount>> {
    let from = now - Duration::days(TRENDING_WINDOW_DAYS);
    let candidates = article::all_visible(db_conn)?;
    let hot: Vec<Id> = sorted_by_hot_at(db_conn, candidates, Some(from), now)?
        .into_iter()
        .filter(|r| r.hotness > 0.0)
        .map(|r| r.article.id)
        .collect();
    tracing::debug!(hot = hot.len(), "trending tags candidates");
    tags::get_tags_by_count(db_conn, Article::KIND, &hot)
}
