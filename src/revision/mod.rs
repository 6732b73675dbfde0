// MIT License
// Copyright (c) 2024 Graham King

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::article::{self, Article};
use crate::profile::{self, Author};
use crate::{Error, Id, Result};

mod diff;

pub use diff::{diff, DiffRow, DiffStatus};

/// The content fields a revision freezes
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Snapshot {
    pub title: String,
    pub description: String,
    pub punchline: String,
    pub raw_content: String,
    pub rendered_html: String,
}

impl Snapshot {
    pub fn of(article: &Article) -> Snapshot {
        Snapshot {
            title: article.title.clone(),
            description: article.description.clone(),
            punchline: article.punchline.clone(),
            raw_content: article.raw_content.clone(),
            rendered_html: article.rendered_html.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Revision {
    pub id: Id,
    pub article_id: Id,
    pub author_id: Id,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl Revision {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Revision> {
        Ok(Revision {
            id: row.get(0)?,
            article_id: row.get(1)?,
            author_id: row.get(2)?,
            created_at: row.get(3)?,
            snapshot: Snapshot {
                title: row.get(4)?,
                description: row.get(5)?,
                punchline: row.get(6)?,
                raw_content: row.get(7)?,
                rendered_html: row.get(8)?,
            },
        })
    }

    /// Show the article as it was at this revision
    pub fn apply_to(&self, article: &mut Article) {
        article.title = self.snapshot.title.clone();
        article.description = self.snapshot.description.clone();
        article.punchline = self.snapshot.punchline.clone();
        article.raw_content = self.snapshot.raw_content.clone();
        article.rendered_html = self.snapshot.rendered_html.clone();
    }
}

const REVISION_COLUMNS: &str = "id, article_id, author_id, created_at, title, description, \
     punchline, raw_content, rendered_html";

pub(crate) fn snapshot_exists(db_conn: &Connection, article_id: Id, s: &Snapshot) -> Result<bool> {
    Ok(db_conn.query_row(
        r#"SELECT EXISTS (
            SELECT 1 FROM revision
            WHERE article_id = ?1 AND title = ?2 AND description = ?3 AND punchline = ?4
              AND raw_content = ?5 AND rendered_html = ?6
        )"#,
        (
            article_id,
            &s.title,
            &s.description,
            &s.punchline,
            &s.raw_content,
            &s.rendered_html,
        ),
        |row| row.get(0),
    )?)
}

pub(crate) fn insert(db_conn: &Connection, article_id: Id, author_id: Id, s: &Snapshot) -> Result<Id> {
    let id = db_conn.query_row(
        r#"INSERT INTO revision
            (article_id, author_id, created_at, title, description, punchline, raw_content, rendered_html)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           RETURNING id"#,
        (
            article_id,
            author_id,
            Utc::now(),
            &s.title,
            &s.description,
            &s.punchline,
            &s.raw_content,
            &s.rendered_html,
        ),
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Distinct authors of the article's revisions other than `author_id`
pub(crate) fn editors_except(db_conn: &Connection, article_id: Id, author_id: Id) -> Result<Vec<Id>> {
    let mut stmt = db_conn.prepare(
        "SELECT DISTINCT author_id FROM revision WHERE article_id = ?1 AND author_id != ?2 ORDER BY author_id",
    )?;
    let ids = stmt.query_map((article_id, author_id), |row| row.get(0))?;
    Ok(ids.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Newest first
pub fn revisions(db_conn: &Connection, article_id: Id) -> Result<Vec<Revision>> {
    let mut stmt = db_conn.prepare(&format!(
        "SELECT {REVISION_COLUMNS} FROM revision WHERE article_id = ?1 ORDER BY id DESC"
    ))?;
    let revs = stmt.query_map([article_id], Revision::from_row)?;
    Ok(revs.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn latest_revision(db_conn: &Connection, article_id: Id) -> Result<Option<Revision>> {
    Ok(db_conn
        .query_row(
            &format!(
                "SELECT {REVISION_COLUMNS} FROM revision WHERE article_id = ?1 ORDER BY id DESC LIMIT 1"
            ),
            [article_id],
            Revision::from_row,
        )
        .optional()?)
}

/// A revision, only if it belongs to the article
pub fn get_revision(db_conn: &Connection, article_id: Id, revision_id: Id) -> Result<Revision> {
    db_conn
        .query_row(
            &format!("SELECT {REVISION_COLUMNS} FROM revision WHERE id = ?1 AND article_id = ?2"),
            (revision_id, article_id),
            Revision::from_row,
        )
        .optional()?
        .ok_or(Error::not_found("revision", revision_id))
}

/// Everyone who authored a revision, by their first revision
pub fn contributors(db_conn: &Connection, article_id: Id) -> Result<Vec<Author>> {
    let mut stmt = db_conn.prepare(
        r#"SELECT author_id FROM revision WHERE article_id = ?1
           GROUP BY author_id ORDER BY MIN(id)"#,
    )?;
    let ids = stmt
        .query_map([article_id], |row| row.get::<_, Id>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    ids.into_iter()
        .map(|id| profile::get_author(db_conn, id))
        .collect()
}

pub fn other_contributors(db_conn: &Connection, article: &Article) -> Result<Vec<Author>> {
    let original = article.original_author();
    Ok(contributors(db_conn, article.id)?
        .into_iter()
        .filter(|a| a.id != original)
        .collect())
}

/// Diff an old revision's markdown against the article's current markdown
pub fn diff_revision(db_conn: &Connection, article_id: Id, revision_id: Id) -> Result<Vec<DiffRow>> {
    let current = article::find_visible(db_conn, article_id)?;
    let revision = get_revision(db_conn, article_id, revision_id)?;
    Ok(diff(&revision.snapshot.raw_content, &current.raw_content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::save;
    use crate::db;
    use crate::profile::create_author;
    use assert_matches::assert_matches;

    #[test]
    fn contributors_in_order_of_first_edit() {
        let mut db_conn = db::open_in_memory().unwrap();
        let first = create_author(&db_conn, "first", false).unwrap();
        let second = create_author(&db_conn, "second", false).unwrap();
        let mut a = Article::new(first.id, "# One\n");
        save(&mut db_conn, &mut a).unwrap();
        a.author_id = second.id;
        a.raw_content = "# Two\n".to_string();
        save(&mut db_conn, &mut a).unwrap();
        a.author_id = first.id;
        a.raw_content = "# Three\n".to_string();
        save(&mut db_conn, &mut a).unwrap();

        let names: Vec<String> = contributors(&db_conn, a.id)
            .unwrap()
            .into_iter()
            .map(|c| c.username)
            .collect();
        assert_eq!(names, ["first", "second"]);
        let others = other_contributors(&db_conn, &a).unwrap();
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, second.id);

        let revs = revisions(&db_conn, a.id).unwrap();
        assert_eq!(revs.len(), 3);
        assert_eq!(revs[0].snapshot.title, "Three");
        assert_eq!(latest_revision(&db_conn, a.id).unwrap(), Some(revs[0].clone()));
    }

    #[test]
    fn revision_can_be_shown_and_diffed() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, "# Title\n\nfirst line\nsecond line\n");
        save(&mut db_conn, &mut a).unwrap();
        let old = latest_revision(&db_conn, a.id).unwrap().unwrap();
        a.raw_content = "# Title\n\nfirst line\nsecond line, edited\n".to_string();
        save(&mut db_conn, &mut a).unwrap();

        let rows = diff_revision(&db_conn, a.id, old.id).unwrap();
        let statuses: Vec<DiffStatus> = rows.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [DiffStatus::Equal, DiffStatus::Equal, DiffStatus::Equal, DiffStatus::Changed]
        );

        let mut shown = a.clone();
        old.apply_to(&mut shown);
        assert_eq!(shown.raw_content, "# Title\n\nfirst line\nsecond line\n");
    }

    #[test]
    fn revisions_of_other_articles_are_not_found() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, "# A\n");
        save(&mut db_conn, &mut a).unwrap();
        let mut b = Article::new(author.id, "# B\n");
        save(&mut db_conn, &mut b).unwrap();
        let rev_b = latest_revision(&db_conn, b.id).unwrap().unwrap();
        assert_matches!(
            get_revision(&db_conn, a.id, rev_b.id),
            Err(Error::NotFound { entity: "revision", .. })
        );
    }
}
