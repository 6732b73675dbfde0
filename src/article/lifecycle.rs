// MIT License
// Copyright (c) 2024 Graham King

use chrono::Utc;
use rusqlite::Connection;

use super::{find_visible, Article};
use crate::config::ActivityPoints;
use crate::error::is_unique_violation;
use crate::profile::{self, Author};
use crate::revision::{self, Snapshot};
use crate::slug::slugify;
use crate::tags::{self, WIP_TAG};
use crate::{content, db, scoring, Error, Id, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    pub created: bool,
    /// False for a no-op edit: the content matched an existing revision
    pub revision_created: bool,
}

/// Create or update an article from its `raw_content`, all in one transaction:
///
/// - title, punchline, description and rendered HTML are re-extracted from the
///   markdown. Empty extracted values leave the current field alone.
/// - `links_count` and `slug` are recomputed
/// - a revision is stored unless an identical one already exists
/// - the original author's published count and the editor's edit count are kept
///   up to date
///
/// `article` is only updated if the transaction commits.
pub fn save(db_conn: &mut Connection, article: &mut Article) -> Result<SaveOutcome> {
    let tx = db::write_tx(db_conn)?;
    let mut updated = article.clone();
    let outcome = save_in(&tx, &mut updated)?;
    tx.commit()?;
    *article = updated;
    Ok(outcome)
}

pub(super) fn save_in(db_conn: &Connection, a: &mut Article) -> Result<SaveOutcome> {
    profile::get_author(db_conn, a.author_id)?;

    let extracted = content::extract(&a.raw_content);
    for (field, value) in [
        (&mut a.title, extracted.title),
        (&mut a.punchline, extracted.punchline),
        (&mut a.description, extracted.description),
        (&mut a.rendered_html, extracted.rendered_html),
    ] {
        if !value.is_empty() {
            *field = value;
        }
    }
    if a.title.trim().is_empty() {
        return Err(Error::validation(
            "title",
            "the content needs a '# Title' heading",
        ));
    }
    a.links_count = content::count_links(&a.raw_content) as i64;
    a.slug = slugify(&a.title);

    let snapshot = Snapshot::of(a);
    let created = a.is_new();
    let mut revision_created = true;

    if created {
        a.original_author_id = Some(a.author_id);
        a.created_at = Utc::now();
        a.id = insert_article(db_conn, a)?;
        tracing::info!(id = a.id, slug = %a.slug, "article created");
    } else {
        let stored = find_visible(db_conn, a.id)?;
        // Not ours to change
        a.original_author_id = stored.original_author_id;
        a.created_at = stored.created_at;
        a.views_count = stored.views_count;
        a.received_kudos_count = stored.received_kudos_count;
        a.published_at = stored.published_at;
        a.deleted_at = stored.deleted_at;

        if revision::snapshot_exists(db_conn, a.id, &snapshot)? {
            revision_created = false;
            a.revisions_count = stored.revisions_count;
            a.editors_count = stored.editors_count;
            a.updated_at = stored.updated_at;
            tracing::debug!(id = a.id, "content matches an existing revision, no new revision");
        } else {
            a.revisions_count = stored.revisions_count + 1;
            a.editors_count = 1 + revision::editors_except(db_conn, a.id, a.author_id)?.len() as i64;
            a.updated_at = Some(Utc::now());
        }
        if !a.is_wiki {
            tags::remove_tag(db_conn, &*a, WIP_TAG)?;
        }
        update_article(db_conn, a)?;
    }

    profile::refresh_published_count(db_conn, a.original_author())?;

    if revision_created {
        let revision_id = revision::insert(db_conn, a.id, a.author_id, &snapshot)?;
        profile::increment_edits(db_conn, a.author_id)?;
        tracing::info!(id = a.id, revision_id, author_id = a.author_id, "revision stored");
    }

    Ok(SaveOutcome {
        created,
        revision_created,
    })
}

fn insert_article(db_conn: &Connection, a: &Article) -> Result<Id> {
    let id = db_conn.query_row(
        r#"INSERT INTO article (
            author_id, original_author_id, slug, title, description, punchline,
            rendered_html, raw_content, created_at, updated_at, published_at, deleted_at,
            is_wiki, editors_count, revisions_count, links_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        RETURNING id"#,
        rusqlite::params![
            a.author_id,
            a.original_author_id,
            a.slug,
            a.title,
            a.description,
            a.punchline,
            a.rendered_html,
            a.raw_content,
            a.created_at,
            a.updated_at,
            a.published_at,
            a.deleted_at,
            a.is_wiki,
            a.editors_count,
            a.revisions_count,
            a.links_count,
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

// views, kudos, publication and deletion are only ever changed by their own updates
fn update_article(db_conn: &Connection, a: &Article) -> Result<()> {
    db_conn.execute(
        r#"UPDATE article SET
            author_id = ?1, slug = ?2, title = ?3, description = ?4, punchline = ?5,
            rendered_html = ?6, raw_content = ?7, updated_at = ?8, is_wiki = ?9,
            editors_count = ?10, revisions_count = ?11, links_count = ?12
        WHERE id = ?13"#,
        rusqlite::params![
            a.author_id,
            a.slug,
            a.title,
            a.description,
            a.punchline,
            a.rendered_html,
            a.raw_content,
            a.updated_at,
            a.is_wiki,
            a.editors_count,
            a.revisions_count,
            a.links_count,
            a.id,
        ],
    )?;
    Ok(())
}

fn check_owner(article: &Article, user: &Author, action: &str) -> Result<()> {
    if user.id == article.author_id || user.is_superuser {
        Ok(())
    } else {
        Err(Error::Forbidden(format!(
            "user {} may not {action} article {}",
            user.id, article.id
        )))
    }
}

/// Set `published_at` to now, unless already published
pub fn publish(db_conn: &mut Connection, article_id: Id, user: &Author) -> Result<Article> {
    let tx = db::write_tx(db_conn)?;
    let article = find_visible(&tx, article_id)?;
    check_owner(&article, user, "publish")?;
    if !article.is_published() {
        tx.execute(
            "UPDATE article SET published_at = ?1 WHERE id = ?2",
            (Utc::now(), article_id),
        )?;
        profile::refresh_published_count(&tx, article.original_author())?;
        tracing::info!(id = article_id, "article published");
    }
    let article = find_visible(&tx, article_id)?;
    tx.commit()?;
    Ok(article)
}

/// Set `deleted_at` to now. The row and its revisions stay.
pub fn soft_delete(db_conn: &mut Connection, article_id: Id, user: &Author) -> Result<Article> {
    let tx = db::write_tx(db_conn)?;
    let article = find_visible(&tx, article_id)?;
    check_owner(&article, user, "delete")?;
    tx.execute(
        "UPDATE article SET deleted_at = ?1 WHERE id = ?2",
        (Utc::now(), article_id),
    )?;
    let article = super::find_all(&tx, article_id)?;
    tx.commit()?;
    tracing::info!(id = article_id, "article deleted");
    Ok(article)
}

/// Record a kudos from a session (and user, if logged in) and return the
/// article's kudos count. A second kudos from the same session or user is
/// silently ignored.
///
/// The original author and every other editor are awarded points in the
/// same transaction.
pub fn receive_kudos(
    db_conn: &mut Connection,
    points: &ActivityPoints,
    article_id: Id,
    session_id: &str,
    user: Option<Id>,
) -> Result<i64> {
    let tx = db::write_tx(db_conn)?;
    let article = find_visible(&tx, article_id)?;
    if let Some(user_id) = user {
        profile::get_author(&tx, user_id)?;
    }

    let inserted = tx.execute(
        "INSERT INTO kudos (article_id, session_id, user_id, timestamp) VALUES (?1, ?2, ?3, ?4)",
        (article_id, session_id, user, Utc::now()),
    );
    match inserted {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(article_id, session_id, ?user, "duplicate kudos ignored");
            return Ok(article.received_kudos_count);
        }
        Err(err) => return Err(err.into()),
    }

    tx.execute(
        "UPDATE article SET received_kudos_count = received_kudos_count + 1 WHERE id = ?1",
        [article_id],
    )?;

    let original = article.original_author();
    scoring::record_in(
        &tx,
        original,
        points.receiving_kudos_as_author,
        &format!("Received kudos for article {article_id}"),
    )?;
    let editors = revision::editors_except(&tx, article_id, original)?;
    scoring::record_bulk_in(
        &tx,
        &editors,
        points.receiving_kudos_as_editor,
        &format!("Received kudos for editing article {article_id}"),
    )?;
    if let Some(user_id) = user {
        profile::increment_kudos_given(&tx, user_id)?;
    }

    tx.commit()?;
    Ok(article.received_kudos_count + 1)
}

/// Log a page view and bump `views_count` in place
pub fn receive_view(
    db_conn: &mut Connection,
    article_id: Id,
    session_id: &str,
    user: Option<Id>,
) -> Result<()> {
    let tx = db::write_tx(db_conn)?;
    find_visible(&tx, article_id)?;
    tx.execute(
        "INSERT INTO article_view (article_id, session_id, user_id, timestamp) VALUES (?1, ?2, ?3, ?4)",
        (article_id, session_id, user, Utc::now()),
    )?;
    tx.execute(
        "UPDATE article SET views_count = views_count + 1 WHERE id = ?1",
        [article_id],
    )?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{create_author, get_author};
    use assert_matches::assert_matches;

    const CONTENT: &str = "# Hello, World!\n\n> Punchy\n\nDescribed here.\n\n## Part one\n\nSee http://a.com\n";

    fn revision_count(db_conn: &Connection, article_id: Id) -> usize {
        revision::revisions(db_conn, article_id).unwrap().len()
    }

    #[test]
    fn first_save_fills_fields_from_markdown() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        let outcome = save(&mut db_conn, &mut a).unwrap();
        assert!(outcome.created && outcome.revision_created);

        assert!(a.id > 0);
        assert_eq!(a.title, "Hello, World!");
        assert_eq!(a.slug, "hello-world");
        assert_eq!(a.punchline, "Punchy");
        assert_eq!(a.description, "Described here.");
        assert_eq!(a.links_count, 1);
        assert_eq!(a.original_author_id, Some(author.id));
        assert_eq!(a.revisions_count, 0);
        assert_eq!(revision_count(&db_conn, a.id), 1);
        assert_eq!(find_visible(&db_conn, a.id).unwrap(), a);
        assert_eq!(get_author(&db_conn, author.id).unwrap().edits_count, 1);
    }

    #[test]
    fn identical_resave_is_a_no_op_edit() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        let outcome = save(&mut db_conn, &mut a).unwrap();
        assert!(!outcome.revision_created);
        assert_eq!(a.revisions_count, 0);
        assert_eq!(revision_count(&db_conn, a.id), 1);
        assert_eq!(get_author(&db_conn, author.id).unwrap().edits_count, 1);

        a.raw_content.push_str("\nMore.\n");
        assert!(save(&mut db_conn, &mut a).unwrap().revision_created);
        assert_eq!(a.revisions_count, 1);
        assert_eq!(revision_count(&db_conn, a.id), 2);
        assert!(a.updated_at.is_some());
    }

    #[test]
    fn empty_extractions_keep_existing_fields() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        a.raw_content = "# New title\n\nNo quote, no sections.\n".to_string();
        save(&mut db_conn, &mut a).unwrap();
        assert_eq!(a.title, "New title");
        assert_eq!(a.slug, "new-title");
        assert_eq!(a.punchline, "Punchy");
        assert_eq!(a.description, "Described here.");
        assert_eq!(a.links_count, 0);
    }

    #[test]
    fn content_without_title_is_rejected_and_nothing_is_stored() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, "no heading here");
        assert_matches!(
            save(&mut db_conn, &mut a),
            Err(Error::Validation { field: "title", .. })
        );
        assert!(a.is_new());
        let count: i64 = db_conn
            .query_row("SELECT COUNT(*) FROM article", (), |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn unknown_author_is_not_found() {
        let mut db_conn = db::open_in_memory().unwrap();
        let mut a = Article::new(99, CONTENT);
        assert_matches!(
            save(&mut db_conn, &mut a),
            Err(Error::NotFound { entity: "author", .. })
        );
    }

    #[test]
    fn editors_count_tracks_distinct_editors() {
        let mut db_conn = db::open_in_memory().unwrap();
        let authors: Vec<Author> = ["a", "b", "c"]
            .iter()
            .map(|name| create_author(&db_conn, name, false).unwrap())
            .collect();
        let mut a = Article::new(authors[0].id, "# Title\n\nv0\n");
        save(&mut db_conn, &mut a).unwrap();
        for (n, author) in authors.iter().enumerate().skip(1) {
            a.author_id = author.id;
            a.raw_content = format!("# Title\n\nv{n}\n");
            save(&mut db_conn, &mut a).unwrap();
            // re-saving identical content changes nothing
            save(&mut db_conn, &mut a).unwrap();
        }
        assert_eq!(a.editors_count, 3);
        assert_eq!(a.original_author_id, Some(authors[0].id));
        assert_eq!(a.author_id, authors[2].id);
    }

    #[test]
    fn published_count_follows_the_original_author() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let editor = create_author(&db_conn, "editor", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        assert_eq!(get_author(&db_conn, author.id).unwrap().articles_published_count, 0);

        publish(&mut db_conn, a.id, &author).unwrap();
        assert_eq!(get_author(&db_conn, author.id).unwrap().articles_published_count, 1);

        let mut a = find_visible(&db_conn, a.id).unwrap();
        a.author_id = editor.id;
        a.raw_content.push_str("\nEdited\n");
        save(&mut db_conn, &mut a).unwrap();
        assert_eq!(get_author(&db_conn, author.id).unwrap().articles_published_count, 1);
        assert_eq!(get_author(&db_conn, editor.id).unwrap().articles_published_count, 0);
        assert_eq!(get_author(&db_conn, editor.id).unwrap().edits_count, 1);
    }

    #[test]
    fn stale_copy_does_not_unpublish() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        let published_at = publish(&mut db_conn, a.id, &author).unwrap().published_at;
        assert!(published_at.is_some());

        // `a` was loaded before publishing
        assert!(a.published_at.is_none());
        a.raw_content.push_str("
Edited
");
        save(&mut db_conn, &mut a).unwrap();
        assert_eq!(a.published_at, published_at);
        assert_eq!(find_visible(&db_conn, a.id).unwrap().published_at, published_at);
        assert_eq!(get_author(&db_conn, author.id).unwrap().articles_published_count, 1);
    }

    #[test]
    fn stale_copy_does_not_undelete() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        soft_delete(&mut db_conn, a.id, &author).unwrap();

        a.raw_content.push_str("
Edited
");
        assert_matches!(save(&mut db_conn, &mut a), Err(Error::NotFound { .. }));
        assert!(crate::article::find_all(&db_conn, a.id).unwrap().deleted_at.is_some());
    }

    #[test]
    fn failed_save_leaves_nothing_behind() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        db_conn
            .execute_batch(
                "CREATE TRIGGER no_revisions BEFORE INSERT ON revision
                 BEGIN SELECT RAISE(ABORT, 'revisions disabled'); END;",
            )
            .unwrap();

        let mut a = Article::new(author.id, CONTENT);
        assert_matches!(save(&mut db_conn, &mut a), Err(Error::Db(_)));
        assert!(a.is_new());
        let articles: i64 = db_conn
            .query_row("SELECT COUNT(*) FROM article", (), |r| r.get(0))
            .unwrap();
        assert_eq!(articles, 0);
        assert_eq!(get_author(&db_conn, author.id).unwrap().edits_count, 0);

        db_conn.execute_batch("DROP TRIGGER no_revisions").unwrap();
        save(&mut db_conn, &mut a).unwrap();
        db_conn
            .execute_batch(
                "CREATE TRIGGER no_revisions BEFORE INSERT ON revision
                 BEGIN SELECT RAISE(ABORT, 'revisions disabled'); END;",
            )
            .unwrap();

        let before = find_visible(&db_conn, a.id).unwrap();
        let mut edit = a.clone();
        edit.raw_content = "# Other title\n\nRewritten.\n".to_string();
        assert_matches!(save(&mut db_conn, &mut edit), Err(Error::Db(_)));
        // the caller's copy is untouched too
        assert_eq!(edit.title, before.title);
        assert_eq!(find_visible(&db_conn, a.id).unwrap(), before);
        assert_eq!(revision_count(&db_conn, a.id), 1);
        assert_eq!(get_author(&db_conn, author.id).unwrap().edits_count, 1);
    }

    #[test]
    fn publish_and_delete_need_the_author() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let visitor = create_author(&db_conn, "visitor", false).unwrap();
        let admin = create_author(&db_conn, "admin", true).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();

        assert_matches!(publish(&mut db_conn, a.id, &visitor), Err(Error::Forbidden(_)));
        let published = publish(&mut db_conn, a.id, &admin).unwrap();
        let first = published.published_at;
        assert!(first.is_some());
        // publishing again keeps the first date
        assert_eq!(publish(&mut db_conn, a.id, &author).unwrap().published_at, first);

        assert_matches!(soft_delete(&mut db_conn, a.id, &visitor), Err(Error::Forbidden(_)));
        soft_delete(&mut db_conn, a.id, &author).unwrap();
        assert_matches!(soft_delete(&mut db_conn, a.id, &author), Err(Error::NotFound { .. }));
        assert_eq!(revision_count(&db_conn, a.id), 1);
    }

    #[test]
    fn kudos_once_per_session_and_user() {
        let mut db_conn = db::open_in_memory().unwrap();
        let points = ActivityPoints::default();
        let author = create_author(&db_conn, "author", false).unwrap();
        let fan = create_author(&db_conn, "fan", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();

        assert_eq!(receive_kudos(&mut db_conn, &points, a.id, "s1", None).unwrap(), 1);
        assert_eq!(receive_kudos(&mut db_conn, &points, a.id, "s1", None).unwrap(), 1);
        assert_eq!(receive_kudos(&mut db_conn, &points, a.id, "s2", Some(fan.id)).unwrap(), 2);
        // same user, new session
        assert_eq!(receive_kudos(&mut db_conn, &points, a.id, "s3", Some(fan.id)).unwrap(), 2);

        assert_eq!(find_visible(&db_conn, a.id).unwrap().received_kudos_count, 2);
        assert_eq!(get_author(&db_conn, fan.id).unwrap().kudos_given_count, 1);
        assert_eq!(get_author(&db_conn, author.id).unwrap().score, 1 + 2 * 5);
    }

    #[test]
    fn kudos_reward_every_other_editor_once() {
        let mut db_conn = db::open_in_memory().unwrap();
        let points = ActivityPoints::default();
        let author = create_author(&db_conn, "author", false).unwrap();
        let editor = create_author(&db_conn, "editor", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        for n in 0..2 {
            a.author_id = editor.id;
            a.raw_content = format!("{CONTENT}\nedit {n}\n");
            save(&mut db_conn, &mut a).unwrap();
        }
        receive_kudos(&mut db_conn, &points, a.id, "s", None).unwrap();
        assert_eq!(get_author(&db_conn, author.id).unwrap().score, 6);
        assert_eq!(get_author(&db_conn, editor.id).unwrap().score, 2);
        let ops = scoring::transactions_for(&db_conn, editor.id).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation, format!("Received kudos for editing article {}", a.id));
    }

    #[test]
    fn failed_award_rolls_back_the_kudos() {
        let mut db_conn = db::open_in_memory().unwrap();
        let points = ActivityPoints::default();
        let author = create_author(&db_conn, "author", false).unwrap();
        let fan = create_author(&db_conn, "fan", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        db_conn
            .execute_batch(
                "CREATE TRIGGER no_ledger BEFORE INSERT ON score_transaction
                 BEGIN SELECT RAISE(ABORT, 'ledger closed'); END;",
            )
            .unwrap();

        assert_matches!(
            receive_kudos(&mut db_conn, &points, a.id, "s", Some(fan.id)),
            Err(Error::Db(_))
        );
        let kudos: i64 = db_conn
            .query_row("SELECT COUNT(*) FROM kudos", (), |r| r.get(0))
            .unwrap();
        assert_eq!(kudos, 0);
        assert_eq!(find_visible(&db_conn, a.id).unwrap().received_kudos_count, 0);
        assert_eq!(get_author(&db_conn, author.id).unwrap().score, 1);
        assert_eq!(get_author(&db_conn, fan.id).unwrap().kudos_given_count, 0);

        // the same session can try again once the ledger works
        db_conn.execute_batch("DROP TRIGGER no_ledger").unwrap();
        assert_eq!(receive_kudos(&mut db_conn, &points, a.id, "s", Some(fan.id)).unwrap(), 1);
    }

    #[test]
    fn kudos_for_missing_or_deleted_articles() {
        let mut db_conn = db::open_in_memory().unwrap();
        let points = ActivityPoints::default();
        let author = create_author(&db_conn, "author", false).unwrap();
        assert_matches!(
            receive_kudos(&mut db_conn, &points, 5, "s", None),
            Err(Error::NotFound { .. })
        );
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        soft_delete(&mut db_conn, a.id, &author).unwrap();
        assert_matches!(
            receive_kudos(&mut db_conn, &points, a.id, "s", None),
            Err(Error::NotFound { .. })
        );
        assert_matches!(
            receive_kudos(&mut db_conn, &points, a.id, "s", Some(404)),
            Err(Error::NotFound { .. })
        );
    }

    #[test]
    fn views_are_logged_and_counted() {
        let mut db_conn = db::open_in_memory().unwrap();
        let author = create_author(&db_conn, "author", false).unwrap();
        let mut a = Article::new(author.id, CONTENT);
        save(&mut db_conn, &mut a).unwrap();
        receive_view(&mut db_conn, a.id, "s", None).unwrap();
        receive_view(&mut db_conn, a.id, "s", Some(author.id)).unwrap();
        assert_eq!(find_visible(&db_conn, a.id).unwrap().views_count, 2);
        let logged: i64 = db_conn
            .query_row("SELECT COUNT(*) FROM article_view", (), |r| r.get(0))
            .unwrap();
        assert_eq!(logged, 2);
        // the view didn't create a revision
        assert_eq!(revision_count(&db_conn, a.id), 1);

        // a stale in-memory copy doesn't clobber the counter on save
        a.raw_content.push_str("\nmore\n");
        save(&mut db_conn, &mut a).unwrap();
        assert_eq!(a.views_count, 2);
        assert_eq!(find_visible(&db_conn, a.id).unwrap().views_count, 2);
    }
}
