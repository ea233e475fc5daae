use std::path::PathBuf;

use clap::Parser;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TAGSORT_GIT_SHA"),
    ", ",
    env!("TAGSORT_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "tagsort",
    version = VERSION,
    about = "Move audio files into Artist/Album/Track -- Title.ext using their tags"
)]
pub struct Args {
    /// Root of the music library to reorganize (scanned recursively)
    pub directory: PathBuf,

    /// Worker pool size (default: number of CPUs minus one, at least one)
    #[arg(short = 'j', long = "jobs")]
    pub jobs: Option<usize>,

    /// Report where files would go without creating directories or moving anything
    #[arg(long)]
    pub dry_run: bool,

    /// Optional config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log debug details (overridden by RUST_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}
