// MIT License
// Copyright (c) 2024 Graham King

//! Articles: the entity, its repository queries and permission checks.
//! Save, kudos and view handling live in [`lifecycle`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::profile::Author;
use crate::tags::{self, Tag, TagCount, TagType, Taggable, WIP_TAG};
use crate::{db, Error, Id, Result};

mod lifecycle;

pub use lifecycle::{publish, receive_kudos, receive_view, save, soft_delete, SaveOutcome};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Article {
    /// 0 until the first save
    pub id: Id,
    /// Who authored the current revision
    pub author_id: Id,
    /// Who authored the first revision, set on first save
    pub original_author_id: Option<Id>,

    /// Always `slugify(title)`
    pub slug: String,
    pub title: String,
    pub description: String,
    pub punchline: String,
    pub rendered_html: String,
    /// Markdown, the source of truth for the four fields above
    pub raw_content: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// None for drafts
    pub published_at: Option<DateTime<Utc>>,
    /// Soft delete
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_wiki: bool,

    pub views_count: i64,
    pub received_kudos_count: i64,
    pub editors_count: i64,
    pub revisions_count: i64,
    pub links_count: i64,
}

impl Taggable for Article {
    const KIND: &'static str = "article";

    fn tag_key(&self) -> Id {
        self.id
    }
}

impl Article {
    pub fn new(author_id: Id, raw_content: &str) -> Article {
        Article {
            id: 0, // we don't know yet
            author_id,
            original_author_id: None,
            slug: String::new(),
            title: String::new(),
            description: String::new(),
            punchline: String::new(),
            rendered_html: String::new(),
            raw_content: raw_content.to_string(),
            created_at: Utc::now(),
            updated_at: None,
            published_at: None,
            deleted_at: None,
            is_wiki: false,
            views_count: 0,
            received_kudos_count: 0,
            editors_count: 1,
            revisions_count: 0,
            links_count: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn original_author(&self) -> Id {
        self.original_author_id.unwrap_or(self.author_id)
    }

    /// The author, a superuser, or anyone at all for wiki articles
    pub fn is_editable_by(&self, user: Option<&Author>) -> bool {
        if let Some(user) = user {
            if user.id == self.author_id || user.is_superuser {
                return true;
            }
        }
        self.is_wiki
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Article> {
        Ok(Article {
            id: row.get(0)?,
            author_id: row.get(1)?,
            original_author_id: row.get(2)?,
            slug: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            punchline: row.get(6)?,
            rendered_html: row.get(7)?,
            raw_content: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            published_at: row.get(11)?,
            deleted_at: row.get(12)?,
            is_wiki: row.get(13)?,
            views_count: row.get(14)?,
            received_kudos_count: row.get(15)?,
            editors_count: row.get(16)?,
            revisions_count: row.get(17)?,
            links_count: row.get(18)?,
        })
    }
}

const ARTICLE_COLUMNS: &str = "a.id, a.author_id, a.original_author_id, a.slug, a.title, \
     a.description, a.punchline, a.rendered_html, a.raw_content, a.created_at, a.updated_at, \
     a.published_at, a.deleted_at, a.is_wiki, a.views_count, a.received_kudos_count, \
     a.editors_count, a.revisions_count, a.links_count";

fn query_articles<P: rusqlite::Params>(
    db_conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<Article>> {
    let mut stmt = db_conn.prepare(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM article a WHERE {filter} ORDER BY a.id"
    ))?;
    let articles = stmt.query_map(params, Article::from_row)?;
    Ok(articles.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Any article, soft-deleted ones included. For admin paths only.
pub fn find_all(db_conn: &Connection, id: Id) -> Result<Article> {
    db_conn
        .query_row(
            &format!("SELECT {ARTICLE_COLUMNS} FROM article a WHERE a.id = ?1"),
            [id],
            Article::from_row,
        )
        .optional()?
        .ok_or(Error::not_found("article", id))
}

/// A non-deleted article
pub fn find_visible(db_conn: &Connection, id: Id) -> Result<Article> {
    let article = find_all(db_conn, id)?;
    if article.is_deleted() {
        return Err(Error::not_found("article", id));
    }
    Ok(article)
}

/// What `user` may read: published articles plus their own drafts.
/// Anything else is reported as not found so drafts don't leak.
pub fn get_for_user(db_conn: &Connection, id: Id, user: Option<Id>) -> Result<Article> {
    let article = find_visible(db_conn, id)?;
    if article.is_published() || user == Some(article.author_id) {
        Ok(article)
    } else {
        Err(Error::not_found("article", id))
    }
}

/// Every non-deleted article
pub fn all_visible(db_conn: &Connection) -> Result<Vec<Article>> {
    query_articles(db_conn, "a.deleted_at IS NULL", ())
}

/// Non-deleted articles that are published or authored by `user`
pub fn visible_for_user(db_conn: &Connection, user: Option<Id>) -> Result<Vec<Article>> {
    query_articles(
        db_conn,
        "a.deleted_at IS NULL AND (a.published_at IS NOT NULL OR a.author_id = ?1)",
        [user.unwrap_or(-1)],
    )
}

/// Non-deleted wiki articles plus the user's own
pub fn editable_for_user(db_conn: &Connection, user: Option<Id>) -> Result<Vec<Article>> {
    query_articles(
        db_conn,
        "a.deleted_at IS NULL AND (a.is_wiki OR a.author_id = ?1)",
        [user.unwrap_or(-1)],
    )
}

/// Non-deleted articles carrying the tag
pub fn with_tag(db_conn: &Connection, tag_title: &str) -> Result<Vec<Article>> {
    query_articles(
        db_conn,
        r#"a.deleted_at IS NULL AND a.id IN (
            SELECT ti.entity_id FROM tagged_item ti JOIN tag t ON t.id = ti.tag_id
            WHERE ti.entity_kind = ?1 AND t.title = ?2
        )"#,
        (Article::KIND, crate::slug::slugify(tag_title)),
    )
}

pub fn wip_articles(db_conn: &Connection) -> Result<Vec<Article>> {
    with_tag(db_conn, WIP_TAG)
}

/// Tag usage over the given articles, or over every non-deleted one
pub fn tags_by_count(db_conn: &Connection, subset: Option<&[Id]>) -> Result<Vec<TagCount>> {
    match subset {
        Some(ids) => tags::get_tags_by_count(db_conn, Article::KIND, ids),
        None => {
            let ids: Vec<Id> = all_visible(db_conn)?.iter().map(|a| a.id).collect();
            tags::get_tags_by_count(db_conn, Article::KIND, &ids)
        }
    }
}

/// The oldest technology or field tag
pub fn primary_tag(db_conn: &Connection, article: &Article) -> Result<Option<Tag>> {
    Ok(tags::tags_for(db_conn, article)?
        .into_iter()
        .find(|t| t.tag_type.is_primary()))
}

/// WIP is not a column, it's membership of the `wip` status tag
pub fn is_wip(db_conn: &Connection, article: &Article) -> Result<bool> {
    if article.is_new() {
        return Ok(false);
    }
    tags::has_tag(db_conn, article, WIP_TAG)
}

/// Marking as WIP also makes the article a wiki. Unmarking only drops the tag.
///
/// An unsaved article is saved and tagged in the same transaction, and
/// `article` is only updated if it commits.
pub fn set_wip(db_conn: &mut Connection, article: &mut Article, value: bool) -> Result<()> {
    if article.is_new() && !value {
        return Ok(());
    }
    let tx = db::write_tx(db_conn)?;
    let mut updated = article.clone();
    if value {
        updated.is_wiki = true;
        if updated.is_new() {
            lifecycle::save_in(&tx, &mut updated)?;
        } else {
            tx.execute("UPDATE article SET is_wiki = 1 WHERE id = ?1", [updated.id])?;
        }
        let wip = match tags::find_by_title(&tx, WIP_TAG)? {
            Some(tag) => tag,
            None => tags::create_tag_in(&tx, WIP_TAG, TagType::Status)?,
        };
        tags::set_tag_in(&tx, &updated, tags::TagRef::from(&wip), TagType::Status)?;
    } else {
        tags::remove_tag(&tx, &updated, WIP_TAG)?;
    }
    tx.commit()?;
    *article = updated;
    Ok(())
}
