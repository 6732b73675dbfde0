// MIT License
// Copyright (c) 2024 Graham King

use std::io::Write;

use anyhow::Context;
use chrono::{DateTime, Utc};

use devcharm::groups;
use devcharm::{Error, Id};

use super::{print_articles, Ctx};

#[derive(clap::Subcommand)]
pub enum Commands {
    /// New group for a block (editors_picks, wip)
    Create {
        block: String,
        /// RFC 3339 date, or 'now'. Without it the group is never shown.
        #[arg(long)]
        start: Option<String>,
    },

    Add {
        group_id: Id,
        #[arg(required = true)]
        article_ids: Vec<Id>,
    },

    /// What the block shows right now
    Show { block: String },
}

pub fn run(ctx: &mut Ctx, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Create { block, start } => {
            require_superuser(ctx)?;
            let start = start.as_deref().map(parse_start).transpose()?;
            let group = groups::create_group(&ctx.db_conn, &block, start)?;
            ctx.emit(&group, |out| writeln!(out, "Group {} for {}", group.id, group.target_block))
        }
        Commands::Add {
            group_id,
            article_ids,
        } => {
            require_superuser(ctx)?;
            groups::add_to_group(&mut ctx.db_conn, group_id, &article_ids)?;
            Ok(())
        }
        Commands::Show { block } => {
            let articles = groups::current_articles(&ctx.db_conn, &block, ctx.user_id())?;
            ctx.emit(&articles, |out| print_articles(out, &articles))
        }
    }
}

fn parse_start(s: &str) -> anyhow::Result<DateTime<Utc>> {
    if s == "now" {
        return Ok(Utc::now());
    }
    let start = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad start date '{s}'"))?;
    Ok(start.with_timezone(&Utc))
}

fn require_superuser(ctx: &Ctx) -> anyhow::Result<()> {
    let user = ctx.user()?;
    if !user.is_superuser {
        return Err(Error::Forbidden(format!("{} is not a superuser", user.username)).into());
    }
    Ok(())
}
