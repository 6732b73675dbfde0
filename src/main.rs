// MIT License
// Copyright (c) 2024 Graham King

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devcharm::config::Config;
use devcharm::{db, profile};

mod cli;
mod term;

const DB_NAME: &str = "devcharm.db";
const CFG_NAME: &str = "config.yaml";
const CFG_DIR: &str = ".config/devcharm";

#[derive(Parser)]
#[command(version, about = "Write, edit and rank Devcharm articles")]
struct Cli {
    /// Sets a custom database path
    #[arg(long, value_name = "PATH")]
    db_path: Option<String>,

    /// Activity points config, yaml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Act as this user
    #[arg(long, short, value_name = "USERNAME")]
    user: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: cli::Commands,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devcharm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg_dir = match env::var("HOME") {
        Ok(user_home) => PathBuf::from(format!("{user_home}/{CFG_DIR}")),
        Err(_) if cli.db_path.is_some() && cli.config.is_some() => PathBuf::new(),
        Err(_) => {
            eprintln!("$HOME not set, pass --db-path and --config");
            process::exit(1);
        }
    };
    let db_path = match cli.db_path {
        Some(db) => db,
        None => {
            fs::create_dir_all(&cfg_dir)
                .with_context(|| format!("creating {}", cfg_dir.display()))?;
            cfg_dir.join(DB_NAME).display().to_string()
        }
    };
    let config_path = cli.config.unwrap_or_else(|| cfg_dir.join(CFG_NAME));
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let db_conn = db::open(&db_path).with_context(|| format!("opening database {db_path}"))?;
    let user = match cli.user {
        Some(username) => Some(
            profile::find_by_username(&db_conn, &username)?
                .with_context(|| format!("no such user '{username}', create it with 'author add'"))?,
        ),
        None => None,
    };
    tracing::debug!(%db_path, user = ?user.as_ref().map(|u| u.id), "starting");

    let mut ctx = cli::Ctx {
        db_conn,
        db_path,
        config,
        user,
        json: cli.json,
    };
    cli::run(&mut ctx, cli.command)
}
