// MIT License
// Copyright (c) 2024 Graham King

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;

use devcharm::article::{self, Article};
use devcharm::config::Config;
use devcharm::listing::{self, RelatedLists, Sort};
use devcharm::profile::{self, Author};
use devcharm::revision::{self, DiffStatus};
use devcharm::{content, ranking, scoring, Error, Id};

use crate::term;

mod group;
mod tag;

/// Everything a command needs
pub struct Ctx {
    pub db_conn: Connection,
    pub db_path: String,
    pub config: Config,
    pub user: Option<Author>,
    pub json: bool,
}

impl Ctx {
    fn user(&self) -> anyhow::Result<Author> {
        self.user
            .clone()
            .context("this command needs a user, pass --user USERNAME")
    }

    fn user_id(&self) -> Option<Id> {
        self.user.as_ref().map(|u| u.id)
    }

    /// JSON if asked for, otherwise whatever `text` writes
    fn emit<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&mut io::StdoutLock<'_>) -> io::Result<()>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        } else {
            text(&mut out)?;
        }
        Ok(())
    }
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create the database tables
    Init,

    /// Manage users
    Author {
        #[command(subcommand)]
        subcommand: AuthorCommands,
    },

    /// Create an article from a markdown file, or update one with --id.
    /// Awards activity points.
    Save {
        /// Markdown file. First '# ' heading is the title.
        file: PathBuf,
        /// Update this article instead of creating one
        #[arg(long)]
        id: Option<Id>,
        /// Let anyone edit it
        #[arg(long)]
        wiki: bool,
    },

    /// Show what would be extracted from a markdown file, saves nothing
    Preview { file: PathBuf },

    Publish { id: Id },

    /// Soft delete
    Delete { id: Id },

    /// Give kudos, once per session and user
    Kudos {
        id: Id,
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Record a page view
    View {
        id: Id,
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Tag management
    Tag {
        #[command(subcommand)]
        subcommand: tag::Commands,
    },

    /// Mark as work in progress, which also makes it a wiki
    Wip {
        id: Id,
        /// Remove the mark instead
        #[arg(long)]
        off: bool,
    },

    /// Published articles by hotness
    Hot {
        /// Only count kudos from the last N days
        #[arg(long, default_value_t = ranking::HOT_WINDOW_DAYS)]
        days: i64,
    },

    /// Tags of this month's hot articles
    Trending,

    /// List articles, optionally under a tag
    List {
        /// hot, new, views, kudos or last_edited
        #[arg(long, default_value = "hot")]
        sort: Sort,
        #[arg(long)]
        tag: Option<String>,
        /// Also require these tags, needs --tag
        #[arg(long, requires = "tag")]
        drilldown: Vec<String>,
    },

    /// An article page: fields, tags and related articles
    Show {
        id: Id,
        /// Show this old revision's content
        #[arg(long)]
        revision: Option<Id>,
    },

    /// Revision history, newest first
    Revisions { id: Id },

    /// Compare an old revision with the current content
    Diff { id: Id, revision: Id },

    /// Score and ledger of a user (default --user)
    Score {
        username: Option<String>,
        /// Spend (negative) or grant points. Refused below zero.
        #[arg(long, allow_hyphen_values = true, requires = "operation")]
        change: Option<i64>,
        #[arg(long)]
        operation: Option<String>,
    },

    /// Editors' picks and promoted WIP groups
    Group {
        #[command(subcommand)]
        subcommand: group::Commands,
    },
}

#[derive(clap::Subcommand)]
pub enum AuthorCommands {
    Add {
        username: String,
        #[arg(long)]
        superuser: bool,
    },
    Show {
        username: String,
    },
}

pub fn run(ctx: &mut Ctx, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Init => {
            println!("Database ready at {}", ctx.db_path);
            Ok(())
        }
        Commands::Author { subcommand } => do_author(ctx, subcommand),
        Commands::Save { file, id, wiki } => do_save(ctx, &file, id, wiki),
        Commands::Preview { file } => do_preview(ctx, &file),
        Commands::Publish { id } => {
            let user = ctx.user()?;
            let a = article::publish(&mut ctx.db_conn, id, &user)?;
            ctx.emit(&a, |out| writeln!(out, "Published {} '{}'", a.id, a.title))
        }
        Commands::Delete { id } => {
            let user = ctx.user()?;
            let a = article::soft_delete(&mut ctx.db_conn, id, &user)?;
            ctx.emit(&a, |out| writeln!(out, "Deleted {} '{}'", a.id, a.title))
        }
        Commands::Kudos { id, session } => {
            let user_id = ctx.user_id();
            let points = ctx.config.activity_points;
            let count = article::receive_kudos(&mut ctx.db_conn, &points, id, &session, user_id)?;
            ctx.emit(&serde_json::json!({ "id": id, "kudos": count }), |out| {
                writeln!(out, "{count} kudos")
            })
        }
        Commands::View { id, session } => {
            let user_id = ctx.user_id();
            article::receive_view(&mut ctx.db_conn, id, &session, user_id)?;
            Ok(())
        }
        Commands::Tag { subcommand } => tag::run(ctx, subcommand),
        Commands::Wip { id, off } => do_wip(ctx, id, !off),
        Commands::Hot { days } => do_hot(ctx, days),
        Commands::Trending => {
            let trending = ranking::get_trending_tags(&ctx.db_conn)?;
            tag::print_counts(ctx, &trending)
        }
        Commands::List {
            sort,
            tag,
            drilldown,
        } => do_list(ctx, sort, tag.as_deref(), &drilldown),
        Commands::Show { id, revision } => do_show(ctx, id, revision),
        Commands::Revisions { id } => do_revisions(ctx, id),
        Commands::Diff { id, revision } => do_diff(ctx, id, revision),
        Commands::Score {
            username,
            change,
            operation,
        } => do_score(ctx, username.as_deref(), change, operation.as_deref()),
        Commands::Group { subcommand } => group::run(ctx, subcommand),
    }
}

fn do_author(ctx: &mut Ctx, cmd: AuthorCommands) -> anyhow::Result<()> {
    let author = match cmd {
        AuthorCommands::Add {
            username,
            superuser,
        } => profile::create_author(&ctx.db_conn, &username, superuser)?,
        AuthorCommands::Show { username } => find_author(ctx, &username)?,
    };
    ctx.emit(&author, |out| print_author(out, &author))
}

fn find_author(ctx: &Ctx, username: &str) -> anyhow::Result<Author> {
    profile::find_by_username(&ctx.db_conn, username)?
        .with_context(|| format!("no such user '{username}'"))
}

fn print_author(out: &mut impl Write, a: &Author) -> io::Result<()> {
    writeln!(out, "{} ({}) {}", a.username, a.id, a.github_profile_url())?;
    writeln!(
        out,
        "score {}, {} published, {} edits, {} kudos given",
        a.score, a.articles_published_count, a.edits_count, a.kudos_given_count
    )
}

#[derive(Serialize)]
struct SaveReport<'a> {
    article: &'a Article,
    created: bool,
    revision_created: bool,
    points: i64,
}

fn do_save(ctx: &mut Ctx, file: &Path, id: Option<Id>, wiki: bool) -> anyhow::Result<()> {
    let user = ctx.user()?;
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;

    let (mut a, previous_links) = match id {
        Some(id) => {
            let a = article::find_visible(&ctx.db_conn, id)?;
            if !a.is_editable_by(Some(&user)) {
                return Err(Error::Forbidden(format!("{} may not edit article {id}", user.username)).into());
            }
            let links = a.links_count;
            (a, links)
        }
        None => (Article::new(user.id, &raw), 0),
    };
    a.author_id = user.id;
    a.raw_content = raw;
    a.is_wiki |= wiki;

    let outcome = article::save(&mut ctx.db_conn, &mut a)?;
    let points = ctx.config.activity_points;
    let awarded = if outcome.created {
        scoring::award_for_create(&mut ctx.db_conn, &points, &a, user.id)?
    } else if outcome.revision_created {
        scoring::award_for_edit(&mut ctx.db_conn, &points, &a, user.id, previous_links)?
    } else {
        0
    };

    let report = SaveReport {
        article: &a,
        created: outcome.created,
        revision_created: outcome.revision_created,
        points: awarded,
    };
    ctx.emit(&report, |out| {
        let verb = match (outcome.created, outcome.revision_created) {
            (true, _) => "Created",
            (false, true) => "Updated",
            (false, false) => "Unchanged",
        };
        writeln!(out, "{verb} {} '{}' ({})", a.id, a.title, a.slug)?;
        writeln!(out, "{} links, +{awarded} points", a.links_count)
    })
}

fn do_preview(ctx: &Ctx, file: &Path) -> anyhow::Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let extracted = content::extract(&raw);
    let links = content::count_links(&raw);
    ctx.emit(&extracted, |out| {
        writeln!(out, "Title:       {}", extracted.title)?;
        writeln!(out, "Punchline:   {}", extracted.punchline)?;
        writeln!(out, "Description: {}", extracted.description)?;
        writeln!(out, "Links:       {links}")?;
        writeln!(out)?;
        write!(out, "{}", extracted.rendered_html)
    })
}

fn do_wip(ctx: &mut Ctx, id: Id, value: bool) -> anyhow::Result<()> {
    let user = ctx.user()?;
    let mut a = article::find_visible(&ctx.db_conn, id)?;
    if !a.is_editable_by(Some(&user)) {
        return Err(Error::Forbidden(format!("{} may not edit article {id}", user.username)).into());
    }
    article::set_wip(&mut ctx.db_conn, &mut a, value)?;
    let state = if value { "is" } else { "is no longer" };
    println!("{} '{}' {state} a work in progress", a.id, a.title);
    Ok(())
}

fn do_hot(ctx: &Ctx, days: i64) -> anyhow::Result<()> {
    let candidates = article::visible_for_user(&ctx.db_conn, ctx.user_id())?;
    let from = Utc::now() - Duration::days(days.max(0));
    let ranked = ranking::sorted_by_hot(&ctx.db_conn, candidates, Some(from))?;
    let width = term::width();
    ctx.emit(&ranked, |out| {
        for r in &ranked {
            let right = format!("{:.3} ({} kudos)", r.hotness, r.recent_kudos);
            term::row(out, width, &format!("{:>5} {}", r.article.id, r.article.title), &right)?;
        }
        Ok(())
    })
}

pub(crate) fn print_articles(out: &mut impl Write, articles: &[Article]) -> io::Result<()> {
    let width = term::width();
    for a in articles {
        let mut left = format!("{:>5} {}", a.id, a.title);
        if !a.is_published() {
            left.push_str(" [draft]");
        }
        let right = format!("{} kudos {} views", a.received_kudos_count, a.views_count);
        term::row(out, width, &left, &right)?;
    }
    Ok(())
}

fn print_related(out: &mut impl Write, related: &RelatedLists) -> io::Result<()> {
    for list in [&related.one, &related.two].into_iter().flatten() {
        writeln!(out, "\nMore on {}:", list.tag.display_title())?;
        print_articles(out, &list.articles)?;
    }
    Ok(())
}

fn do_list(ctx: &Ctx, sort: Sort, tag: Option<&str>, drilldown: &[String]) -> anyhow::Result<()> {
    let user = ctx.user_id();
    let Some(tag) = tag else {
        let articles = listing::list_articles(&ctx.db_conn, user, sort)?;
        return ctx.emit(&articles, |out| print_articles(out, &articles));
    };
    let drilldown: Vec<&str> = drilldown.iter().map(String::as_str).collect();
    let tag_listing = listing::list_by_tag(&ctx.db_conn, user, tag, &drilldown, sort)?;
    ctx.emit(&tag_listing, |out| {
        print_articles(out, &tag_listing.articles)?;
        if !tag_listing.wip_articles.is_empty() {
            writeln!(out, "\nWork in progress:")?;
            print_articles(out, &tag_listing.wip_articles)?;
        }
        if !tag_listing.related_tags.is_empty() {
            let titles: Vec<&str> = tag_listing.related_tags.iter().map(|tc| tc.tag.title.as_str()).collect();
            writeln!(out, "\nRelated tags: {}", titles.join(", "))?;
        }
        print_related(out, &tag_listing.related)
    })
}

fn do_show(ctx: &Ctx, id: Id, revision_id: Option<Id>) -> anyhow::Result<()> {
    let detail = listing::article_detail(&ctx.db_conn, id, ctx.user_id(), revision_id)?;
    ctx.emit(&detail, |out| {
        let a = &detail.article;
        writeln!(out, "# {}", a.title)?;
        if !a.punchline.is_empty() {
            writeln!(out, "> {}", a.punchline)?;
        }
        if !a.description.is_empty() {
            writeln!(out, "{}", a.description)?;
        }
        let tags: Vec<&str> = detail.tags.iter().map(|t| t.title.as_str()).collect();
        writeln!(out, "\ntags: {}", tags.join(", "))?;
        writeln!(
            out,
            "{} kudos, {} views, {} editors, {} revisions, {} links",
            a.received_kudos_count, a.views_count, a.editors_count, a.revisions_count, a.links_count
        )?;
        if detail.is_wip {
            writeln!(out, "work in progress")?;
        }
        if detail.is_editors_pick {
            writeln!(out, "editors' pick")?;
        }
        if !detail.other_contributors.is_empty() {
            let names: Vec<&str> = detail.other_contributors.iter().map(|u| u.username.as_str()).collect();
            writeln!(out, "also edited by: {}", names.join(", "))?;
        }
        if let Some(primary) = &detail.related.primary_tag {
            if !detail.related.read_more.is_empty() {
                writeln!(out, "\nRead more about {}:", primary.display_title())?;
                print_articles(out, &detail.related.read_more)?;
            }
        }
        print_related(out, &detail.related.related)
    })
}

fn do_revisions(ctx: &Ctx, id: Id) -> anyhow::Result<()> {
    let a = article::get_for_user(&ctx.db_conn, id, ctx.user_id())?;
    let revisions = revision::revisions(&ctx.db_conn, a.id)?;
    let width = term::width();
    ctx.emit(&revisions, |out| {
        for r in &revisions {
            let left = format!("{:>5} {}", r.id, r.snapshot.title);
            let right = format!("by {} at {}", r.author_id, r.created_at.format("%Y-%m-%d %H:%M"));
            term::row(out, width, &left, &right)?;
        }
        Ok(())
    })
}

fn do_diff(ctx: &Ctx, id: Id, revision_id: Id) -> anyhow::Result<()> {
    article::get_for_user(&ctx.db_conn, id, ctx.user_id())?;
    let rows = revision::diff_revision(&ctx.db_conn, id, revision_id)?;
    ctx.emit(&rows, |out| {
        for row in &rows {
            let left = row.left.as_deref().unwrap_or("");
            let right = row.right.as_deref().unwrap_or("");
            match row.status {
                DiffStatus::Equal => writeln!(out, "  {left}")?,
                DiffStatus::Removed => writeln!(out, "- {left}")?,
                DiffStatus::Added => writeln!(out, "+ {right}")?,
                DiffStatus::Changed => {
                    writeln!(out, "- {left}")?;
                    writeln!(out, "+ {right}")?;
                }
            }
        }
        Ok(())
    })
}

fn do_score(
    ctx: &mut Ctx,
    username: Option<&str>,
    change: Option<i64>,
    operation: Option<&str>,
) -> anyhow::Result<()> {
    let author = match username {
        Some(name) => find_author(ctx, name)?,
        None => ctx.user()?,
    };
    if let Some(change) = change {
        let operation = operation.unwrap_or("Manual adjustment");
        scoring::score_change(&mut ctx.db_conn, author.id, change, operation)?;
    }
    let author = profile::get_author(&ctx.db_conn, author.id)?;
    let ledger = scoring::transactions_for(&ctx.db_conn, author.id)?;
    let value = serde_json::json!({ "author": &author, "transactions": &ledger });
    ctx.emit(&value, |out| {
        print_author(out, &author)?;
        for t in &ledger {
            writeln!(
                out,
                "{:>+6}  {}  {}",
                t.change,
                t.happened_at.format("%Y-%m-%d %H:%M"),
                t.operation
            )?;
        }
        Ok(())
    })
}
