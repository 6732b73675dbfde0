// MIT License
// Copyright (c) 2024 Graham King

use std::fs;
use std::io;
use std::path;

/// Points awarded (or spent) for each tracked activity
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ActivityPoints {
    pub editing_article: i64,
    pub adding_links: i64,
    pub creating_article: i64,
    pub receiving_kudos_as_author: i64,
    pub receiving_kudos_as_editor: i64,
}

impl Default for ActivityPoints {
    fn default() -> Self {
        ActivityPoints {
            editing_article: 2,
            adding_links: 10,
            creating_article: 50,
            receiving_kudos_as_author: 5,
            receiving_kudos_as_editor: 1,
        }
    }
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub activity_points: ActivityPoints,
}

impl Config {
    /// Read the yaml config file. A missing file means defaults.
    pub fn load(filepath: &path::Path) -> crate::Result<Config> {
        let s = match fs::read_to_string(filepath) {
            Ok(s) => s,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %filepath.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(err) => return Err(err.into()),
        };
        Self::parse(&s)
    }

    pub fn parse(s: &str) -> crate::Result<Config> {
        if s.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }
}
