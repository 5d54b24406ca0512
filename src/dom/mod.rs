//! Structural document trees.
//!
//! HTML text is parsed with html5ever into an arena-allocated [`Document`];
//! the composer and TOC builder operate on it through tree mutation and
//! selector queries, and [`serialize`] turns the finished tree back into
//! HTML text.

mod arena;
mod select;
mod serialize;
mod tree_sink;

pub use arena::{Attribute, ChildrenIter, DescendantsIter, Document, Node, NodeData, NodeId};
pub use select::{ElementRef, FolioSelectors, select_all, select_first};
pub use serialize::{serialize_children, serialize_node};

use html5ever::driver::ParseOpts;
use html5ever::parse_document as html5_parse_document;
use html5ever::tendril::TendrilSink;

use tree_sink::Sink;

/// Parse HTML text into a [`Document`].
///
/// Deterministic and lenient: malformed markup is repaired the way browsers
/// repair it, and bare fragments receive the implied `html`/`head`/`body`
/// wrapping.
pub fn parse_document(html: &str) -> Document {
    let sink = Sink::new();
    let result = html5_parse_document(sink, ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    result.into_document()
}
