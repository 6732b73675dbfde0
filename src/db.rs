// MIT License
// Copyright (c) 2024 Graham King

use rusqlite::{Connection, Transaction, TransactionBehavior};

// score starts at 1, not 0
pub const CREATE_AUTHOR_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS author (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    display_name TEXT NOT NULL,
    is_superuser BOOL NOT NULL DEFAULT 0,
    can_publish BOOL NOT NULL DEFAULT 0,
    score INTEGER NOT NULL DEFAULT 1,
    articles_published_count INTEGER NOT NULL DEFAULT 0,
    edits_count INTEGER NOT NULL DEFAULT 0,
    kudos_given_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE (username)
)
"#;

// slug is not unique: two articles may share a title
pub const CREATE_ARTICLE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS article (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id INTEGER NOT NULL,
    original_author_id INTEGER NULL,
    slug TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    punchline TEXT NOT NULL,
    rendered_html TEXT NOT NULL,
    raw_content TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NULL,
    published_at DATETIME NULL,
    deleted_at DATETIME NULL,
    is_wiki BOOL NOT NULL DEFAULT 0,
    views_count INTEGER NOT NULL DEFAULT 0,
    received_kudos_count INTEGER NOT NULL DEFAULT 0,
    editors_count INTEGER NOT NULL DEFAULT 1,
    revisions_count INTEGER NOT NULL DEFAULT 0,
    links_count INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (author_id) REFERENCES author (id),
    FOREIGN KEY (original_author_id) REFERENCES author (id)
)
"#;

pub const CREATE_REVISION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS revision (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    created_at DATETIME NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    punchline TEXT NOT NULL,
    raw_content TEXT NOT NULL,
    rendered_html TEXT NOT NULL,
    FOREIGN KEY (article_id) REFERENCES article (id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES author (id)
)
"#;

pub const CREATE_TAG_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    verbose_title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    tag_type TEXT NOT NULL,
    updated DATETIME NOT NULL,
    UNIQUE (title)
)
"#;

// Tag links for any taggable entity, keyed by kind + id
pub const CREATE_TAGGED_ITEM_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tagged_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag_id INTEGER NOT NULL,
    entity_kind TEXT NOT NULL,
    entity_id INTEGER NOT NULL,
    FOREIGN KEY (tag_id) REFERENCES tag (id) ON DELETE CASCADE,
    UNIQUE (tag_id, entity_kind, entity_id)
)
"#;

// NULL user_id never collides, so anonymous kudos are limited by session only
pub const CREATE_KUDOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS kudos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL,
    session_id TEXT NOT NULL,
    user_id INTEGER NULL,
    timestamp DATETIME NOT NULL,
    FOREIGN KEY (article_id) REFERENCES article (id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES author (id),
    UNIQUE (article_id, session_id),
    UNIQUE (article_id, user_id)
)
"#;

pub const CREATE_ARTICLE_VIEW_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS article_view (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL,
    session_id TEXT NOT NULL,
    user_id INTEGER NULL,
    timestamp DATETIME NOT NULL,
    FOREIGN KEY (article_id) REFERENCES article (id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES author (id)
)
"#;

pub const CREATE_ARTICLE_GROUP_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS article_group (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_block TEXT NOT NULL,
    publish_start DATETIME NULL
)
"#;

pub const CREATE_ARTICLE_GROUP_MEMBER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS article_group_member (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    group_id INTEGER NOT NULL,
    article_id INTEGER NOT NULL,
    FOREIGN KEY (group_id) REFERENCES article_group (id) ON DELETE CASCADE,
    FOREIGN KEY (article_id) REFERENCES article (id) ON DELETE CASCADE,
    UNIQUE (group_id, article_id)
)
"#;

pub const CREATE_SCORE_TRANSACTION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS score_transaction (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    change INTEGER NOT NULL,
    operation TEXT NOT NULL,
    happened_at DATETIME NOT NULL,
    FOREIGN KEY (user_id) REFERENCES author (id)
)
"#;

const ALL_TABLES: [&str; 10] = [
    CREATE_AUTHOR_TABLE,
    CREATE_ARTICLE_TABLE,
    CREATE_REVISION_TABLE,
    CREATE_TAG_TABLE,
    CREATE_TAGGED_ITEM_TABLE,
    CREATE_KUDOS_TABLE,
    CREATE_ARTICLE_VIEW_TABLE,
    CREATE_ARTICLE_GROUP_TABLE,
    CREATE_ARTICLE_GROUP_MEMBER_TABLE,
    CREATE_SCORE_TRANSACTION_TABLE,
];

pub fn open(db_path: &str) -> rusqlite::Result<Connection> {
    let db_conn = Connection::open(db_path)?;
    migrate(&db_conn)?;
    Ok(db_conn)
}

pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let db_conn = Connection::open_in_memory()?;
    migrate(&db_conn)?;
    Ok(db_conn)
}

pub fn migrate(db_conn: &Connection) -> rusqlite::Result<()> {
    db_conn.pragma_update(None, "foreign_keys", true)?;
    for create in ALL_TABLES {
        db_conn.execute(create, ())?;
    }
    Ok(())
}

/// Start a write transaction. IMMEDIATE takes the write lock up front, so
/// check-then-insert sequences inside it can't interleave with another writer.
pub fn write_tx(db_conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    db_conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// `?, ?, ?` for an IN clause
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
