// MIT License
// Copyright (c) 2024 Graham King

use std::io::Write;

use devcharm::article;
use devcharm::tags::{self, TagCount, TagType};
use devcharm::{Error, Id};

use super::Ctx;
use crate::term;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Tag an article, creating the tag if needed
    Set { article_id: Id, title: String },

    /// Untag an article
    Remove { article_id: Id, title: String },

    /// Create a tag. Taken titles get a -N suffix.
    Create {
        title: String,
        /// technology, field, status or category
        #[arg(long = "type", default_value = "category")]
        tag_type: TagType,
    },

    Rename { id: Id, title: String },

    Describe {
        id: Id,
        #[arg(long, default_value = "")]
        verbose_title: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    Delete { id: Id },

    /// All tags, alphabetically
    List,

    /// Tags by number of articles using them, over the given articles or all
    Counts { article_ids: Vec<Id> },
}

pub fn run(ctx: &mut Ctx, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Set { article_id, title } => {
            let a = editable(ctx, article_id)?;
            let tag = tags::set_tag(&mut ctx.db_conn, &a, title.as_str())?;
            ctx.emit(&tag, |out| writeln!(out, "Tagged {} with {}", a.id, tag.title))
        }
        Commands::Remove { article_id, title } => {
            let a = editable(ctx, article_id)?;
            if !tags::remove_tag(&ctx.db_conn, &a, &title)? {
                eprintln!("Article {article_id} was not tagged {title}");
            }
            Ok(())
        }
        Commands::Create { title, tag_type } => {
            let tag = tags::create_tag(&mut ctx.db_conn, &title, tag_type)?;
            ctx.emit(&tag, |out| writeln!(out, "{} {} ({})", tag.id, tag.title, tag.tag_type))
        }
        Commands::Rename { id, title } => {
            let tag = tags::rename_tag(&mut ctx.db_conn, id, &title)?;
            ctx.emit(&tag, |out| writeln!(out, "{} is now {}", tag.id, tag.title))
        }
        Commands::Describe {
            id,
            verbose_title,
            description,
        } => {
            let tag = tags::update_tag_details(&ctx.db_conn, id, &verbose_title, &description)?;
            ctx.emit(&tag, |out| writeln!(out, "{} {}", tag.id, tag.display_title()))
        }
        Commands::Delete { id } => {
            tags::delete_tag(&ctx.db_conn, id)?;
            Ok(())
        }
        Commands::List => {
            let all = tags::list_tags(&ctx.db_conn)?;
            ctx.emit(&all, |out| {
                for t in &all {
                    writeln!(out, "{:>5} {:<30} {}", t.id, t.title, t.tag_type)?;
                }
                Ok(())
            })
        }
        Commands::Counts { article_ids } => {
            let subset = if article_ids.is_empty() {
                None
            } else {
                Some(article_ids.as_slice())
            };
            let counts = article::tags_by_count(&ctx.db_conn, subset)?;
            print_counts(ctx, &counts)
        }
    }
}

pub(crate) fn print_counts(ctx: &Ctx, counts: &[TagCount]) -> anyhow::Result<()> {
    let width = term::width();
    ctx.emit(&counts, |out| {
        for tc in counts {
            term::row(out, width, tc.tag.display_title(), &tc.uses_count.to_string())?;
        }
        Ok(())
    })
}

fn editable(ctx: &Ctx, article_id: Id) -> anyhow::Result<article::Article> {
    let user = ctx.user()?;
    let a = article::find_visible(&ctx.db_conn, article_id)?;
    if !a.is_editable_by(Some(&user)) {
        return Err(Error::Forbidden(format!("{} may not edit article {article_id}", user.username)).into());
    }
    Ok(a)
}
