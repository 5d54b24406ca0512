//! Table-of-contents generation.
//!
//! [`Toc::scan`] walks a finished fragment once, anchors every heading, and
//! records what it saw; [`Toc::build`] is a pure projection that turns those
//! records into a nested ordered-list structure for any requested depth.

use std::collections::HashSet;

use crate::dom::{Document, NodeId};

/// Attribute marking an element as a TOC insertion point; its value is the
/// maximum heading depth (default 6 when absent or invalid).
pub const TOC_ATTR: &str = "folio-toc";

/// Class tagged onto a generated TOC's top-level list.
pub const TOC_CLASS: &str = "folio-toc";

/// One heading found during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingRecord {
    /// 1-based position in scan order.
    pub index: usize,
    /// Heading level (1-6).
    pub level: u8,
    /// Heading text, whitespace-normalized.
    pub text: String,
    /// Anchor name, unique within the scan.
    pub anchor: String,
}

/// Scan state for one fragment; holds the heading records backing
/// [`Toc::build`].
#[derive(Debug, Clone)]
pub struct Toc {
    headings: Vec<HeadingRecord>,
}

/// Derive an anchor name from heading text.
///
/// Lower-cases and trims the text, collapses each run of characters outside
/// `[a-z0-9_-]` to a single hyphen, and strips trailing hyphens.
///
/// # Examples
///
/// ```
/// use folio::toc::anchor_name;
///
/// assert_eq!(anchor_name("Getting Started"), "getting-started");
/// assert_eq!(anchor_name("Hello, World!"), "hello-world");
/// assert_eq!(anchor_name("snake_case stays"), "snake_case-stays");
/// ```
pub fn anchor_name(text: &str) -> String {
    let mut out = String::new();
    let mut in_run = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c.to_ascii_lowercase());
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }

    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

impl Toc {
    /// Scan a fragment for headings in document order.
    ///
    /// Inserts an empty named anchor element immediately before every
    /// heading and records `(index, level, text, anchor)` per heading. A
    /// derived anchor that collides with an earlier one gets the heading's
    /// scan index appended, which keeps names unique and deterministic for a
    /// fixed input order.
    pub fn scan(doc: &mut Document, root: NodeId) -> Toc {
        let found: Vec<(NodeId, u8)> = doc
            .descendants(root)
            .filter_map(|id| {
                doc.element_name(id)
                    .and_then(|name| heading_level(name.as_ref()))
                    .map(|level| (id, level))
            })
            .collect();

        let mut names: HashSet<String> = HashSet::new();
        let mut headings = Vec::with_capacity(found.len());

        for (i, (node, level)) in found.into_iter().enumerate() {
            let index = i + 1;
            let text = doc.collect_text(node).trim().to_string();
            let mut anchor = anchor_name(&text);
            // A literal "x-4" heading can occupy a suffixed name, so keep
            // appending until the name is free.
            while names.contains(&anchor) {
                anchor = format!("{anchor}-{index}");
            }
            names.insert(anchor.clone());

            let a = doc.create_html_element("a", &[("name", &anchor)]);
            doc.insert_before(node, a);

            headings.push(HeadingRecord {
                index,
                level,
                text,
                anchor,
            });
        }

        Toc { headings }
    }

    /// The records collected by the scan, in document order.
    pub fn headings(&self) -> &[HeadingRecord] {
        &self.headings
    }

    /// Build a nested ordered-list structure of anchor links for headings
    /// with `level <= max_level`, allocating fresh nodes in `doc`.
    ///
    /// Returns `None` when no heading is within the depth — the caller is
    /// expected to drop its placeholder entirely. A pure projection: the
    /// scan state is untouched, and repeated calls yield isomorphic trees.
    pub fn build(&self, doc: &mut Document, max_level: u8) -> Option<NodeId> {
        let filtered: Vec<&HeadingRecord> =
            self.headings.iter().filter(|h| h.level <= max_level).collect();
        if filtered.is_empty() {
            return None;
        }

        let top = doc.create_html_element("ol", &[]);
        // Nesting cursor: (list, depth) pairs, pushed on descent, popped on
        // ascent. The bottom entry is the top-level list at depth 1.
        let mut stack: Vec<(NodeId, u8)> = vec![(top, 1)];

        for heading in filtered {
            // Descend one level at a time, creating an empty-parent item per
            // skipped level.
            while let Some(&(list, depth)) = stack.last() {
                if heading.level <= depth {
                    break;
                }
                let item = match doc.children(list).filter(|&c| doc.is_element(c)).last() {
                    Some(item) => item,
                    None => {
                        let item = doc.create_html_element("li", &[]);
                        doc.append(list, item);
                        item
                    }
                };
                let nested = doc.create_html_element("ol", &[]);
                doc.append(item, nested);
                stack.push((nested, depth + 1));
            }

            while stack.len() > 1 && stack.last().is_some_and(|&(_, depth)| heading.level < depth)
            {
                stack.pop();
            }

            if let Some(&(list, _)) = stack.last() {
                let item = doc.create_html_element("li", &[]);
                let href = format!("#{}", heading.anchor);
                let link = doc.create_html_element("a", &[("href", &href)]);
                doc.append_text(link, &heading.text);
                doc.append(item, link);
                doc.append(list, item);
            }
        }

        // Collapse redundant single-child wrapper levels left behind when the
        // shallowest visible heading is deeper than level 1.
        let mut top = top;
        loop {
            let children: Vec<NodeId> = doc
                .children(top)
                .filter(|&c| doc.is_element(c))
                .collect();
            if children.len() != 1 {
                break;
            }
            let item_children: Vec<NodeId> = doc.children(children[0]).collect();
            match item_children.as_slice() {
                [only] if doc.element_name(*only).is_some_and(|n| n.as_ref() == "ol") => {
                    top = *only;
                }
                _ => break,
            }
        }

        doc.detach(top);
        doc.set_attr(top, "class", TOC_CLASS);
        Some(top)
    }
}
