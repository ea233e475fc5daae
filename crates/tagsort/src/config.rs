//! Configuration loading and resolution.
//!
//! Command-line flags win over the optional TOML file, which wins over built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Args;

/// File name looked up next to the executable when `--config` is not given.
pub const DEFAULT_CONFIG_NAME: &str = "tagsort.toml";

/// Optional settings loaded from TOML.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Worker pool size.
    pub jobs: Option<usize>,
    /// Plan moves without touching the filesystem.
    pub dry_run: Option<bool>,
}

impl FileConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg =
            toml::from_str::<FileConfig>(&raw).with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }

    /// Load `--config` when given, otherwise `tagsort.toml` beside the executable if present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let auto_path = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_NAME)));
        match auto_path {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganizeConfig {
    /// Library root; scanned recursively and used as the destination base.
    pub root: PathBuf,
    /// Number of worker threads.
    pub jobs: usize,
    /// Report destinations without creating directories or renaming.
    pub dry_run: bool,
}

impl OrganizeConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            jobs: default_jobs(),
            dry_run: false,
        }
    }

    /// Merge CLI arguments over file settings.
    pub fn resolve(args: &Args, file: &FileConfig) -> Result<Self> {
        let jobs = args.jobs.or(file.jobs).unwrap_or_else(default_jobs);
        if jobs == 0 {
            return Err(anyhow::anyhow!("jobs must be at least 1"));
        }
        Ok(Self {
            root: args.directory.clone(),
            jobs,
            dry_run: args.dry_run || file.dry_run.unwrap_or(false),
        })
    }
}

/// One worker per CPU, leaving one for the rest of the system, never fewer than one.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}
