//! # folio
//!
//! A markdown page renderer: content documents are fetched, parsed, and
//! composed into a chain of nested page templates, with generated
//! table-of-contents structures and injected metadata.
//!
//! ## Features
//!
//! - Recursive template composition with per-pass fetch deduplication and
//!   cycle detection
//! - Heading scan with stable unique anchors and nested TOC generation at
//!   any depth
//! - YAML front matter merged over site-wide defaults
//! - Pluggable [`Fetcher`] transport (HTTP, local files, in-memory)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use folio::{FileFetcher, Site, SiteConfig};
//!
//! # async fn run() -> folio::Result<()> {
//! let config = SiteConfig {
//!     template: Some("/templates/base.html".into()),
//!     target: Some("main".into()),
//!     ..Default::default()
//! };
//!
//! let site = Site::new(config, Arc::new(FileFetcher::new("site")));
//! let page = site.render("/docs/intro").await?;
//! println!("{}", page.document.to_html());
//! # Ok(())
//! # }
//! ```
//!
//! ## Documents and markers
//!
//! Templates are ordinary HTML documents. An element carrying a
//! `folio-template` attribute is a substitution point for another template
//! (optionally narrowed by `folio-selector`); an element carrying
//! `folio-toc` is replaced by the generated table of contents for the page's
//! headings, up to the depth given by the attribute value.

pub mod compose;
pub mod config;
pub mod dom;
pub mod error;
pub mod fetch;
pub mod markdown;
pub mod page;
pub mod toc;

pub use compose::{Composer, SELECTOR_ATTR, TEMPLATE_ATTR, TemplateRef};
pub use config::{PageConfig, SiteConfig};
pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use fetch::{Fetcher, FileFetcher, HttpFetcher, StaticFetcher, TemplateCache};
pub use page::{RenderedPage, Site};
pub use toc::{HeadingRecord, TOC_ATTR, TOC_CLASS, Toc};
