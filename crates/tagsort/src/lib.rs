//! tagsort: move audio files into an `Artist/Album/Track -- Title.ext` layout driven by
//! their embedded tags.
//!
//! ## Pipeline
//! 1. **Scan**: one recursive walk of the library root, filtered by extension.
//! 2. **Dispatch**: a fixed pool of worker threads pulls files from a bounded queue.
//! 3. **Organize**: each worker reads tags, sanitizes them into path segments, and renames the
//!    file into place, logging exactly one line per file.

pub mod cli;
pub mod config;
pub mod logging;
pub mod organize;
pub mod pool;
pub mod runtime;
pub mod sanitize;
pub mod scan;
pub mod tags;
