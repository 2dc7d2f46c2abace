//! # blameline-core
//!
//! Core library for blameline - inline git blame annotations for editors.
//!
//! This library provides:
//! - A parser for `git blame --line-porcelain` output
//! - A TTL cache of per-document annotations
//! - Remote URL resolution to commit and author links
//! - Decoration and hover rendering
//! - A debounced controller that keeps many editors in sync
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Work flows from editor events down to git and back out as decorations:
//! - **Controller:** receives [`controller::EditorEvent`]s, debounces cursor
//!   movement and decides which editors to recompute
//! - **Source:** resolves a document to a [`CacheKey`], serves annotations from
//!   the cache or runs `git blame`
//! - **Render:** turns annotations into trailing line text and hover markdown
//!
//! Nothing in the annotation path surfaces errors to the editor. Failures are
//! logged and the affected editor simply shows no annotations.
//!
//! ## Example
//!
//! ```rust,no_run
//! use blameline_core::blame::{AnnotationCache, AnnotationSource};
//! use blameline_core::git::GitCli;
//! use blameline_core::{Config, DocumentInfo, Revision};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let config = Config::load().expect("failed to load config");
//! let source = AnnotationSource::new(
//!     Arc::new(GitCli::from_config(&config.annotation)),
//!     Arc::new(AnnotationCache::with_defaults()),
//! );
//!
//! let info = DocumentInfo::new("/work/app".into(), "src/main.rs".into(), Revision::WorkingTree);
//! if let Some(map) = source.annotations(&info).await {
//!     println!("{} annotated lines", map.len());
//! }
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use blame::{AnnotationCache, AnnotationSource};
pub use config::Config;
pub use controller::BlameController;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod blame;
pub mod config;
pub mod controller;
pub mod diff;
pub mod document;
pub mod error;
pub mod format;
pub mod git;
pub mod logging;
pub mod remote;
pub mod render;
pub mod settings;
pub mod types;
