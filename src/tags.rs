// MIT License
// Copyright (c) 2024 Graham King

//! Tags and the tag graph. Anything implementing [`Taggable`] can carry tags;
//! links are stored per (entity kind, entity id).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};

use crate::slug::slugify;
use crate::{db, Error, Id, Result};

/// The status tag marking work-in-progress articles
pub const WIP_TAG: &str = "wip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Technology,
    Field,
    Status,
    Category,
}

impl TagType {
    pub const PRIMARY: [TagType; 2] = [TagType::Technology, TagType::Field];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagType::Technology => "technology",
            TagType::Field => "field",
            TagType::Status => "status",
            TagType::Category => "category",
        }
    }

    pub fn is_primary(&self) -> bool {
        Self::PRIMARY.contains(self)
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagType {
    type Err = Error;

    fn from_str(s: &str) -> Result<TagType> {
        match s {
            "technology" => Ok(TagType::Technology),
            "field" => Ok(TagType::Field),
            "status" => Ok(TagType::Status),
            "category" => Ok(TagType::Category),
            other => Err(Error::validation(
                "tag_type",
                format!("unknown tag type '{other}'"),
            )),
        }
    }
}

impl ToSql for TagType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TagType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: Error| FromSqlError::Other(Box::new(err)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Tag {
    pub id: Id,
    /// Always a slug, unique
    pub title: String,
    pub verbose_title: String,
    pub description: String,
    pub tag_type: TagType,
    /// Bumped every time the tag is applied to something
    pub updated: DateTime<Utc>,
}

impl Tag {
    pub fn display_title(&self) -> &str {
        if self.verbose_title.is_empty() {
            &self.title
        } else {
            &self.verbose_title
        }
    }

    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: row.get(0)?,
            title: row.get(1)?,
            verbose_title: row.get(2)?,
            description: row.get(3)?,
            tag_type: row.get(4)?,
            updated: row.get(5)?,
        })
    }
}

const TAG_COLUMNS: &str = "t.id, t.title, t.verbose_title, t.description, t.tag_type, t.updated";

/// A tag with the number of items (in some set) carrying it
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TagCount {
    pub tag: Tag,
    pub uses_count: i64,
}

/// An entity that can carry tags
pub trait Taggable {
    /// Stored alongside the id, keeps tag links of different entity types apart
    const KIND: &'static str;

    fn tag_key(&self) -> Id;
}

/// Either a tag we already hold, or a title to look up or create
#[derive(Debug, Clone, Copy)]
pub enum TagRef<'a> {
    Existing(Id),
    Title(&'a str),
}

impl<'a> From<&'a Tag> for TagRef<'a> {
    fn from(tag: &'a Tag) -> Self {
        TagRef::Existing(tag.id)
    }
}

impl<'a> From<&'a str> for TagRef<'a> {
    fn from(title: &'a str) -> Self {
        TagRef::Title(title)
    }
}

pub fn get_tag(db_conn: &Connection, id: Id) -> Result<Tag> {
    db_conn
        .query_row(
            &format!("SELECT {TAG_COLUMNS} FROM tag t WHERE t.id = ?1"),
            [id],
            Tag::from_row,
        )
        .optional()?
        .ok_or(Error::not_found("tag", id))
}

/// Exact lookup, the title is slugified first
pub fn find_by_title(db_conn: &Connection, title: &str) -> Result<Option<Tag>> {
    Ok(db_conn
        .query_row(
            &format!("SELECT {TAG_COLUMNS} FROM tag t WHERE t.title = ?1"),
            [slugify(title)],
            Tag::from_row,
        )
        .optional()?)
}

/// All tags, alphabetically
pub fn list_tags(db_conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = db_conn.prepare(&format!("SELECT {TAG_COLUMNS} FROM tag t ORDER BY t.title"))?;
    let tags = stmt.query_map((), Tag::from_row)?;
    Ok(tags.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Create a tag. Its title is slugified, and disambiguated with the lowest
/// free `-N` suffix if the slug is taken.
pub fn create_tag(db_conn: &mut Connection, title: &str, tag_type: TagType) -> Result<Tag> {
    let tx = db::write_tx(db_conn)?;
    let tag = create_tag_in(&tx, title, tag_type)?;
    tx.commit()?;
    Ok(tag)
}

pub(crate) fn create_tag_in(db_conn: &Connection, title: &str, tag_type: TagType) -> Result<Tag> {
    let base = slugify(title);
    if base.is_empty() {
        return Err(Error::validation("title", format!("'{title}' has no usable characters")));
    }
    let title = available_title(db_conn, &base, None)?;
    let id = db_conn.query_row(
        "INSERT INTO tag (title, tag_type, updated) VALUES (?1, ?2, ?3) RETURNING id",
        (&title, tag_type, Utc::now()),
        |row| row.get::<_, Id>(0),
    )?;
    if title != base {
        tracing::info!(%base, %title, "tag title disambiguated");
    }
    get_tag(db_conn, id)
}

pub fn rename_tag(db_conn: &mut Connection, id: Id, new_title: &str) -> Result<Tag> {
    let tx = db::write_tx(db_conn)?;
    get_tag(&tx, id)?;
    let base = slugify(new_title);
    if base.is_empty() {
        return Err(Error::validation("title", format!("'{new_title}' has no usable characters")));
    }
    let title = available_title(&tx, &base, Some(id))?;
    tx.execute("UPDATE tag SET title = ?1 WHERE id = ?2", (&title, id))?;
    let tag = get_tag(&tx, id)?;
    tx.commit()?;
    Ok(tag)
}

pub fn update_tag_details(
    db_conn: &Connection,
    id: Id,
    verbose_title: &str,
    description: &str,
) -> Result<Tag> {
    let updated = db_conn.execute(
        "UPDATE tag SET verbose_title = ?1, description = ?2 WHERE id = ?3",
        (verbose_title, description, id),
    )?;
    if updated == 0 {
        return Err(Error::not_found("tag", id));
    }
    get_tag(db_conn, id)
}

/// Deletes the tag and every link to it
pub fn delete_tag(db_conn: &Connection, id: Id) -> Result<()> {
    if db_conn.execute("DELETE FROM tag WHERE id = ?1", [id])? == 0 {
        return Err(Error::not_found("tag", id));
    }
    Ok(())
}

// `base` if free, else `base-K` with the smallest K >= 1 not in use.
fn available_title(db_conn: &Connection, base: &str, exclude: Option<Id>) -> Result<String> {
    let mut stmt = db_conn.prepare(
        "SELECT title FROM tag WHERE substr(title, 1, ?2) = ?1 AND id != ?3",
    )?;
    let titles = stmt.query_map((base, base.len() as i64, exclude.unwrap_or(-1)), |row| {
        row.get::<_, String>(0)
    })?;

    let mut used = BTreeSet::new();
    for title in titles {
        if let Some(idx) = suffix_index(base, &title?) {
            used.insert(idx);
        }
    }
    if !used.contains(&0) {
        return Ok(base.to_string());
    }
    let free = (1..).find(|k| !used.contains(k)).unwrap_or(1);
    Ok(format!("{base}-{free}"))
}

// 0 for the bare base, N for `base-N`, None for anything else
fn suffix_index(base: &str, title: &str) -> Option<u64> {
    let rest = title.strip_prefix(base)?;
    if rest.is_empty() {
        return Some(0);
    }
    let digits = rest.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// Attach a tag, creating it from the title if needed. Always bumps the
/// tag's `updated`, even when the link already existed.
pub fn set_tag<'a, T: Taggable>(
    db_conn: &mut Connection,
    item: &T,
    tag: impl Into<TagRef<'a>>,
) -> Result<Tag> {
    let tx = db::write_tx(db_conn)?;
    let tag = set_tag_in(&tx, item, tag.into(), TagType::Category)?;
    tx.commit()?;
    Ok(tag)
}

pub(crate) fn set_tag_in<T: Taggable>(
    db_conn: &Connection,
    item: &T,
    tag: TagRef<'_>,
    default_type: TagType,
) -> Result<Tag> {
    let tag = match tag {
        TagRef::Existing(id) => get_tag(db_conn, id)?,
        TagRef::Title(title) => match find_by_title(db_conn, title)? {
            Some(tag) => tag,
            None => create_tag_in(db_conn, title, default_type)?,
        },
    };
    db_conn.execute(
        "UPDATE tag SET updated = ?1 WHERE id = ?2",
        (Utc::now(), tag.id),
    )?;
    db_conn.execute(
        "INSERT OR IGNORE INTO tagged_item (tag_id, entity_kind, entity_id) VALUES (?1, ?2, ?3)",
        (tag.id, T::KIND, item.tag_key()),
    )?;
    get_tag(db_conn, tag.id)
}

/// Returns whether a link was removed
pub fn remove_tag<T: Taggable>(db_conn: &Connection, item: &T, title: &str) -> Result<bool> {
    let removed = db_conn.execute(
        r#"DELETE FROM tagged_item
           WHERE entity_kind = ?1 AND entity_id = ?2
             AND tag_id IN (SELECT id FROM tag WHERE title = ?3)"#,
        (T::KIND, item.tag_key(), slugify(title)),
    )?;
    Ok(removed > 0)
}

pub fn has_tag<T: Taggable>(db_conn: &Connection, item: &T, title: &str) -> Result<bool> {
    Ok(db_conn.query_row(
        r#"SELECT EXISTS (
            SELECT 1 FROM tagged_item ti JOIN tag t ON t.id = ti.tag_id
            WHERE ti.entity_kind = ?1 AND ti.entity_id = ?2 AND t.title = ?3
        )"#,
        (T::KIND, item.tag_key(), slugify(title)),
        |row| row.get(0),
    )?)
}

/// The item's tags, oldest tag first
pub fn tags_for<T: Taggable>(db_conn: &Connection, item: &T) -> Result<Vec<Tag>> {
    let mut stmt = db_conn.prepare(&format!(
        "SELECT {TAG_COLUMNS} FROM tag t JOIN tagged_item ti ON t.id = ti.tag_id
         WHERE ti.entity_kind = ?1 AND ti.entity_id = ?2 ORDER BY t.id"
    ))?;
    let tags = stmt.query_map((T::KIND, item.tag_key()), Tag::from_row)?;
    Ok(tags.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Ids of the items of `kind` carrying the tag
pub fn tagged_ids(db_conn: &Connection, kind: &str, tag_id: Id) -> Result<Vec<Id>> {
    let mut stmt = db_conn.prepare(
        "SELECT entity_id FROM tagged_item WHERE entity_kind = ?1 AND tag_id = ?2 ORDER BY entity_id",
    )?;
    let ids = stmt.query_map((kind, tag_id), |row| row.get(0))?;
    Ok(ids.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Every tag used by at least one of the given items, with how many of them
/// use it. Most used first, ties by tag id.
pub fn get_tags_by_count(db_conn: &Connection, kind: &str, ids: &[Id]) -> Result<Vec<TagCount>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let sql = format!(
        "SELECT {TAG_COLUMNS}, COUNT(DISTINCT ti.entity_id) AS uses_count
         FROM tag t JOIN tagged_item ti ON t.id = ti.tag_id
         WHERE ti.entity_kind = ? AND ti.entity_id IN ({})
         GROUP BY t.id
         ORDER BY uses_count DESC, t.id ASC",
        db::placeholders(ids.len())
    );
    let mut stmt = db_conn.prepare(&sql)?;
    let params = std::iter::once(rusqlite::types::Value::from(kind.to_string()))
        .chain(ids.iter().map(|id| rusqlite::types::Value::from(*id)));
    let counts = stmt.query_map(params_from_iter(params), |row| {
        Ok(TagCount {
            tag: Tag::from_row(row)?,
            uses_count: row.get(6)?,
        })
    })?;
    Ok(counts.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Candidates for the "related" blocks next to a listing under `primary`.
///
/// Tags of the other primary type used in the main set come first, then the
/// rest of `all_counts`, both by usage. `primary` itself never appears.
pub fn related_tags(main_counts: &[TagCount], all_counts: &[TagCount], primary: &Tag) -> Vec<Tag> {
    let alternate: Vec<&Tag> = main_counts
        .iter()
        .map(|tc| &tc.tag)
        .filter(|t| t.id != primary.id && t.tag_type != primary.tag_type && t.tag_type.is_primary())
        .collect();
    let padding = all_counts
        .iter()
        .map(|tc| &tc.tag)
        .filter(|t| t.id != primary.id && !alternate.iter().any(|a| a.id == t.id));
    alternate.iter().copied().chain(padding).cloned().collect()
}
