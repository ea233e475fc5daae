//! Run orchestration: validate the root, snapshot it, drain the pool, report.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

use crate::config::OrganizeConfig;
use crate::organize::Organizer;
use crate::pool::{self, CancelFlag, Summary};
use crate::scan;
use crate::tags::{LoftyTagSource, TagSource};

/// Conditions that end a run as a whole.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),
    #[error("worker pool: {0:#}")]
    Pool(anyhow::Error),
    #[error("interrupted after {} of {} files", .0.processed(), .0.discovered)]
    Interrupted(Summary),
}

/// Organize `config.root` using the `lofty` tag reader.
pub fn run(config: &OrganizeConfig, cancel: &CancelFlag) -> Result<Summary, RunError> {
    run_with(config, Arc::new(LoftyTagSource), cancel)
}

/// Organize `config.root` using `tags` to decode files.
pub fn run_with(
    config: &OrganizeConfig,
    tags: Arc<dyn TagSource>,
    cancel: &CancelFlag,
) -> Result<Summary, RunError> {
    let root = &config.root;
    if !root.is_dir() {
        return Err(RunError::InvalidRoot(root.clone()));
    }

    let tasks = scan::collect_tasks(root);
    tracing::info!(
        files = tasks.len(),
        workers = config.jobs,
        dry_run = config.dry_run,
        root = %root.display(),
        "scanned library"
    );

    let organizer = Organizer::new(tags, config.dry_run);
    let summary =
        pool::process_all(tasks, config.jobs, organizer, cancel).map_err(RunError::Pool)?;

    if cancel.is_cancelled() {
        return Err(RunError::Interrupted(summary));
    }

    tracing::info!(
        moved = summary.moved,
        planned = summary.planned,
        skipped = summary.skipped,
        failed = summary.failed,
        "Finished"
    );
    Ok(summary)
}

/// Process status for a run ended by Ctrl-C, matching the invalid-root failure status.
pub const INTERRUPT_EXIT_CODE: i32 = 1;

/// Route Ctrl-C into `cancel`. A second interrupt exits immediately with status 1.
pub fn install_interrupt_handler(cancel: CancelFlag) -> anyhow::Result<()> {
    let hits = AtomicUsize::new(0);
    ctrlc::set_handler(move || {
        if hits.fetch_add(1, Ordering::SeqCst) > 0 {
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
        tracing::warn!("interrupt received; finishing in-flight files");
        cancel.cancel();
    })?;
    Ok(())
}
