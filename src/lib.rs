// MIT License
// Copyright (c) 2024 Graham King

//! Core of the Devcharm publishing platform: markdown extraction, article
//! revisions, tags, hotness ranking and the score ledger, all persisted in
//! SQLite.

pub mod article;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod groups;
pub mod listing;
pub mod profile;
pub mod ranking;
pub mod revision;
pub mod scoring;
pub mod slug;
pub mod tags;

pub use error::{Error, Result};

/// Primary key of every table
pub type Id = i64;
