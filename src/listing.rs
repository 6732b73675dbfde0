// MIT License
// Copyright (c) 2024 Graham King

//! What the listing, tag and detail pages show: sorted article lists, the WIP
//! split, and the two "related" blocks.
//!
//! Related blocks never repeat an article already on the page. The first
//! excludes the main list, the second excludes the main list and the first.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;

use crate::article::{self, Article};
use crate::profile::Author;
use crate::tags::{self, Tag, TagCount, Taggable, WIP_TAG};
use crate::{groups, ranking, revision, Error, Id, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    #[default]
    Hot,
    New,
    Views,
    Kudos,
    LastEdited,
}

impl FromStr for Sort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Sort> {
        match s {
            "hot" | "" => Ok(Sort::Hot),
            "new" => Ok(Sort::New),
            "views" => Ok(Sort::Views),
            "kudos" => Ok(Sort::Kudos),
            "last_edited" | "last-edited" => Ok(Sort::LastEdited),
            other => Err(Error::validation("sort", format!("unknown sort '{other}'"))),
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Sort::Hot => "hot",
            Sort::New => "new",
            Sort::Views => "views",
            Sort::Kudos => "kudos",
            Sort::LastEdited => "last_edited",
        };
        f.write_str(s)
    }
}

/// Hot drops unpublished articles, the other orders keep everything.
/// Missing dates sort last.
pub fn sort_articles(db_conn: &Connection, mut articles: Vec<Article>, sort: Sort) -> Result<Vec<Article>> {
    match sort {
        Sort::Hot => {
            return Ok(ranking::sorted_by_hot(db_conn, articles, None)?
                .into_iter()
                .map(|r| r.article)
                .collect())
        }
        Sort::New => articles.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        Sort::Views => articles.sort_by_key(|a| std::cmp::Reverse(a.views_count)),
        Sort::Kudos => articles.sort_by_key(|a| std::cmp::Reverse(a.received_kudos_count)),
        Sort::LastEdited => articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
    }
    Ok(articles)
}

/// Everything `user` may read, sorted
pub fn list_articles(db_conn: &Connection, user: Option<Id>, sort: Sort) -> Result<Vec<Article>> {
    sort_articles(db_conn, article::visible_for_user(db_conn, user)?, sort)
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RelatedList {
    pub tag: Tag,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RelatedLists {
    pub one: Option<RelatedList>,
    pub two: Option<RelatedList>,
}

// Fill the two related blocks from the first two candidate tags
fn related_lists(
    db_conn: &Connection,
    visible: &[Article],
    candidates: &[Tag],
    mut shown: HashSet<Id>,
) -> Result<RelatedLists> {
    let mut lists = vec![];
    for tag in candidates.iter().take(2) {
        let tagged: HashSet<Id> = tags::tagged_ids(db_conn, Article::KIND, tag.id)?
            .into_iter()
            .collect();
        let articles: Vec<Article> = visible
            .iter()
            .filter(|a| tagged.contains(&a.id) && !shown.contains(&a.id))
            .cloned()
            .collect();
        shown.extend(articles.iter().map(|a| a.id));
        lists.push(RelatedList {
            tag: tag.clone(),
            articles,
        });
    }
    let mut lists = lists.into_iter();
    Ok(RelatedLists {
        one: lists.next(),
        two: lists.next(),
    })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TagListing {
    /// Slugified main tag
    pub tag: String,
    pub drilldown: Vec<String>,
    /// Matching articles that are not WIP
    pub articles: Vec<Article>,
    pub wip_articles: Vec<Article>,
    /// Tags used by the matching articles, main tag excluded
    pub related_tags: Vec<TagCount>,
    pub related: RelatedLists,
}

/// Articles carrying `tag` and every drilldown tag. An unknown tag gives an
/// empty listing.
pub fn list_by_tag(
    db_conn: &Connection,
    user: Option<Id>,
    tag: &str,
    drilldown: &[&str],
    sort: Sort,
) -> Result<TagListing> {
    let main_tag = crate::slug::slugify(tag);
    let drilldown: Vec<String> = drilldown
        .iter()
        .map(|t| crate::slug::slugify(t))
        .filter(|t| *t != main_tag)
        .collect();

    let visible = article::visible_for_user(db_conn, user)?;
    let mut matching = vec![];
    for a in &visible {
        if !tags::has_tag(db_conn, a, &main_tag)? {
            continue;
        }
        let mut keep = true;
        for t in &drilldown {
            if !tags::has_tag(db_conn, a, t)? {
                keep = false;
                break;
            }
        }
        if keep {
            matching.push(a.clone());
        }
    }
    let matching = sort_articles(db_conn, matching, sort)?;
    let main_ids: Vec<Id> = matching.iter().map(|a| a.id).collect();

    let related_tags: Vec<TagCount> = tags::get_tags_by_count(db_conn, Article::KIND, &main_ids)?
        .into_iter()
        .filter(|tc| tc.tag.title != main_tag)
        .collect();
    let candidates: Vec<Tag> = related_tags.iter().map(|tc| tc.tag.clone()).collect();
    let related = related_lists(db_conn, &visible, &candidates, main_ids.iter().copied().collect())?;

    let mut articles = vec![];
    let mut wip_articles = vec![];
    for a in matching {
        if tags::has_tag(db_conn, &a, WIP_TAG)? {
            wip_articles.push(a);
        } else {
            articles.push(a);
        }
    }

    Ok(TagListing {
        tag: main_tag,
        drilldown,
        articles,
        wip_articles,
        related_tags,
        related,
    })
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ArticleRelated {
    pub primary_tag: Option<Tag>,
    /// Other articles under the primary tag
    pub read_more: Vec<Article>,
    pub related: RelatedLists,
}

/// The "read more" and related blocks of an article page. Empty when the
/// article has no primary tag.
pub fn article_related(db_conn: &Connection, a: &Article, user: Option<Id>) -> Result<ArticleRelated> {
    let Some(primary) = article::primary_tag(db_conn, a)? else {
        return Ok(ArticleRelated::default());
    };
    let visible = article::visible_for_user(db_conn, user)?;
    let under_primary: HashSet<Id> = tags::tagged_ids(db_conn, Article::KIND, primary.id)?
        .into_iter()
        .collect();
    let read_more: Vec<Article> = visible
        .iter()
        .filter(|other| other.id != a.id && under_primary.contains(&other.id))
        .cloned()
        .collect();

    let read_more_ids: Vec<Id> = read_more.iter().map(|a| a.id).collect();
    let main_counts = tags::get_tags_by_count(db_conn, Article::KIND, &read_more_ids)?;
    let all_counts = article::tags_by_count(db_conn, None)?;
    let candidates = tags::related_tags(&main_counts, &all_counts, &primary);

    let mut shown: HashSet<Id> = read_more_ids.into_iter().collect();
    shown.insert(a.id);
    let related = related_lists(db_conn, &visible, &candidates, shown)?;

    Ok(ArticleRelated {
        primary_tag: Some(primary),
        read_more,
        related,
    })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ArticleDetail {
    pub article: Article,
    /// Set when showing an old revision
    pub revision_id: Option<Id>,
    pub tags: Vec<Tag>,
    pub is_wip: bool,
    pub is_editors_pick: bool,
    pub other_contributors: Vec<Author>,
    #[serde(flatten)]
    pub related: ArticleRelated,
}

/// An article page as `user` sees it, optionally with the fields of one of
/// its revisions swapped in
pub fn article_detail(
    db_conn: &Connection,
    article_id: Id,
    user: Option<Id>,
    revision_id: Option<Id>,
) -> Result<ArticleDetail> {
    let mut a = article::get_for_user(db_conn, article_id, user)?;
    if let Some(revision_id) = revision_id {
        revision::get_revision(db_conn, article_id, revision_id)?.apply_to(&mut a);
    }
    let related = article_related(db_conn, &a, user)?;
    Ok(ArticleDetail {
        tags: tags::tags_for(db_conn, &a)?,
        is_wip: article::is_wip(db_conn, &a)?,
        is_editors_pick: groups::is_editors_pick(db_conn, a.id)?,
        other_contributors: revision::other_contributors(db_conn, &a)?,
        revision_id,
        related,
        article: a,
    })
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Homepage {
    pub hot: Vec<Article>,
    pub editors_picks: Vec<Article>,
    pub wip_articles: Vec<Article>,
    /// Published articles only, newest first, whoever is asking
    pub new_articles: Vec<Article>,
    pub trending_tags: Vec<TagCount>,
}

pub fn homepage(db_conn: &Connection, user: Option<Id>) -> Result<Homepage> {
    Ok(Homepage {
        hot: list_articles(db_conn, user, Sort::Hot)?,
        editors_picks: groups::editors_picks(db_conn, user)?,
        wip_articles: groups::promoted_wip(db_conn, user)?,
        new_articles: list_articles(db_conn, None, Sort::New)?,
        trending_tags: ranking::get_trending_tags(db_conn)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{publish, receive_kudos, receive_view, save, set_wip};
    use crate::config::ActivityPoints;
    use crate::db;
    use crate::profile::create_author;
    use crate::tags::{create_tag, set_tag, TagType};
    use assert_matches::assert_matches;

    struct Site {
        db_conn: Connection,
        author: Author,
    }

    impl Site {
        fn new() -> Site {
            let db_conn = db::open_in_memory().unwrap();
            let author = create_author(&db_conn, "author", false).unwrap();
            Site { db_conn, author }
        }

        fn article(&mut self, title: &str, tag_titles: &[&str]) -> Article {
            let mut a = Article::new(self.author.id, &format!("# {title}\n\nAbout {title}.\n"));
            save(&mut self.db_conn, &mut a).unwrap();
            let a = publish(&mut self.db_conn, a.id, &self.author).unwrap();
            for t in tag_titles {
                set_tag(&mut self.db_conn, &a, *t).unwrap();
            }
            a
        }
    }

    fn ids(articles: &[Article]) -> Vec<Id> {
        articles.iter().map(|a| a.id).collect()
    }

    #[test]
    fn sort_names() {
        assert_eq!("".parse::<Sort>().unwrap(), Sort::Hot);
        assert_eq!("last_edited".parse::<Sort>().unwrap(), Sort::LastEdited);
        assert_eq!(Sort::LastEdited.to_string().parse::<Sort>().unwrap(), Sort::LastEdited);
        assert_matches!("best".parse::<Sort>(), Err(Error::Validation { field: "sort", .. }));
    }

    #[test]
    fn sorting() {
        let mut site = Site::new();
        let a = site.article("A", &[]);
        let b = site.article("B", &[]);
        let mut draft = Article::new(site.author.id, "# Draft\n");
        save(&mut site.db_conn, &mut draft).unwrap();

        receive_view(&mut site.db_conn, b.id, "s", None).unwrap();
        receive_kudos(&mut site.db_conn, &ActivityPoints::default(), a.id, "s", None).unwrap();

        let me = Some(site.author.id);
        let db_conn = &site.db_conn;
        assert_eq!(ids(&list_articles(db_conn, me, Sort::Views).unwrap()), [b.id, a.id, draft.id]);
        assert_eq!(ids(&list_articles(db_conn, me, Sort::Kudos).unwrap()), [a.id, b.id, draft.id]);
        assert_eq!(ids(&list_articles(db_conn, me, Sort::New).unwrap()), [b.id, a.id, draft.id]);
        assert_eq!(ids(&list_articles(db_conn, me, Sort::Hot).unwrap()), [a.id, b.id]);
        assert_eq!(ids(&list_articles(db_conn, None, Sort::New).unwrap()), [b.id, a.id]);
    }

    #[test]
    fn tag_listing_with_drilldown_and_wip() {
        let mut site = Site::new();
        let a = site.article("A", &["rust", "web"]);
        let b = site.article("B", &["rust"]);
        let mut c = site.article("C", &["rust", "web"]);
        site.article("D", &["go"]);
        set_wip(&mut site.db_conn, &mut c, true).unwrap();

        let listing = list_by_tag(&site.db_conn, None, "Rust", &[], Sort::New).unwrap();
        assert_eq!(listing.tag, "rust");
        assert_eq!(ids(&listing.articles), [b.id, a.id]);
        assert_eq!(ids(&listing.wip_articles), [c.id]);
        assert!(listing.related_tags.iter().all(|tc| tc.tag.title != "rust"));
        assert_eq!(listing.related_tags[0].tag.title, "web");
        assert_eq!(listing.related_tags[0].uses_count, 2);

        let drilled = list_by_tag(&site.db_conn, None, "rust", &["web", "rust"], Sort::New).unwrap();
        assert_eq!(drilled.drilldown, ["web"]);
        assert_eq!(ids(&drilled.articles), [a.id]);

        let nothing = list_by_tag(&site.db_conn, None, "cobol", &[], Sort::Hot).unwrap();
        assert!(nothing.articles.is_empty() && nothing.related_tags.is_empty());
    }

    #[test]
    fn related_lists_never_repeat_articles() {
        let mut site = Site::new();
        let main = site.article("Main", &["rust", "web", "db"]);
        let web_only = site.article("Web", &["web", "db"]);
        let db_only = site.article("Db", &["db"]);

        let listing = list_by_tag(&site.db_conn, None, "rust", &[], Sort::New).unwrap();
        assert_eq!(ids(&listing.articles), [main.id]);
        let one = listing.related.one.unwrap();
        let two = listing.related.two.unwrap();
        assert_eq!(one.tag.title, "web");
        assert_eq!(ids(&one.articles), [web_only.id]);
        assert_eq!(two.tag.title, "db");
        assert_eq!(ids(&two.articles), [db_only.id]);
    }

    #[test]
    fn article_related_prefers_the_other_primary_type() {
        let mut site = Site::new();
        let db_conn = &mut site.db_conn;
        let rust = create_tag(db_conn, "rust", TagType::Technology).unwrap();
        let web = create_tag(db_conn, "web", TagType::Field).unwrap();
        let howto = create_tag(db_conn, "howto", TagType::Category).unwrap();

        let subject = site.article("Subject", &[]);
        let sibling = site.article("Sibling", &[]);
        let web_article = site.article("Web", &[]);
        let howto_article = site.article("Howto", &[]);
        let db_conn = &mut site.db_conn;
        for (a, t) in [
            (&subject, &rust),
            (&sibling, &rust),
            (&sibling, &web),
            (&web_article, &web),
            (&howto_article, &howto),
            (&sibling, &howto),
            (&web_article, &howto),
        ] {
            set_tag(db_conn, a, t).unwrap();
        }

        let related = article_related(db_conn, &subject, None).unwrap();
        assert_eq!(related.primary_tag.map(|t| t.id), Some(rust.id));
        assert_eq!(ids(&related.read_more), [sibling.id]);
        let one = related.related.one.unwrap();
        let two = related.related.two.unwrap();
        // field tag first even though howto is used more
        assert_eq!(one.tag.id, web.id);
        assert_eq!(ids(&one.articles), [web_article.id]);
        assert_eq!(two.tag.id, howto.id);
        assert_eq!(ids(&two.articles), [howto_article.id]);
    }

    #[test]
    fn no_primary_tag_no_related() {
        let mut site = Site::new();
        let a = site.article("Plain", &["howto"]);
        let related = article_related(&site.db_conn, &a, None).unwrap();
        assert_eq!(related, ArticleRelated::default());
    }

    #[test]
    fn detail_can_show_an_old_revision() {
        let mut site = Site::new();
        let a = site.article("First", &[]);
        let first_rev = revision::latest_revision(&site.db_conn, a.id).unwrap().unwrap();
        let mut a = article::find_visible(&site.db_conn, a.id).unwrap();
        a.raw_content = "# Second\n".to_string();
        save(&mut site.db_conn, &mut a).unwrap();

        let now = article_detail(&site.db_conn, a.id, None, None).unwrap();
        assert_eq!(now.article.title, "Second");
        let then = article_detail(&site.db_conn, a.id, None, Some(first_rev.id)).unwrap();
        assert_eq!(then.article.title, "First");
        assert_eq!(then.revision_id, Some(first_rev.id));
        assert_matches!(
            article_detail(&site.db_conn, a.id, None, Some(first_rev.id + 100)),
            Err(Error::NotFound { entity: "revision", .. })
        );
    }

    #[test]
    fn homepage_blocks() {
        let mut site = Site::new();
        let a = site.article("A", &["rust"]);
        let b = site.article("B", &[]);
        receive_kudos(&mut site.db_conn, &ActivityPoints::default(), a.id, "s", None).unwrap();
        let group = groups::create_group(
            &site.db_conn,
            groups::EDITORS_PICKS,
            Some(chrono::Utc::now() - chrono::Duration::minutes(1)),
        )
        .unwrap();
        groups::add_to_group(&mut site.db_conn, group.id, &[b.id]).unwrap();

        let home = homepage(&site.db_conn, None).unwrap();
        assert_eq!(ids(&home.hot), [a.id, b.id]);
        assert_eq!(ids(&home.editors_picks), [b.id]);
        assert!(home.wip_articles.is_empty());
        assert_eq!(ids(&home.new_articles), [b.id, a.id]);
        assert_eq!(home.trending_tags[0].tag.title, "rust");
    }
}
