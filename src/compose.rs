//! Template composition.
//!
//! A page document is composed by recursively replacing placeholder elements
//! with fragments extracted from fetched template documents. Resolution runs
//! level by level over an explicit worklist: all fetches for a level are
//! awaited together through a deduplicating cache, substitutions are applied
//! in pending order, and the newly inserted subtrees are scanned for the
//! next level's placeholders. The recursion terminates when a level yields
//! no new references.

use tracing::debug;

use crate::dom::{self, Document, NodeId};
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, TemplateCache};

/// Attribute marking an element as a template substitution point.
pub const TEMPLATE_ATTR: &str = "folio-template";

/// Attribute narrowing which element of the fetched template is spliced in.
/// When absent, or when it matches nothing, the template's root element is
/// used.
pub const SELECTOR_ATTR: &str = "folio-selector";

/// One pending substitution: fetch `url`, select a fragment, replace `node`.
#[derive(Debug, Clone)]
pub struct TemplateRef {
    pub url: String,
    pub node: NodeId,
    pub selector: Option<String>,
    /// Urls of the ancestor substitutions on this branch. Re-entering one of
    /// them means the template chain cycles.
    trail: Vec<String>,
}

impl TemplateRef {
    pub fn new(url: impl Into<String>, node: NodeId, selector: Option<String>) -> Self {
        Self {
            url: url.into(),
            node,
            selector,
            trail: Vec::new(),
        }
    }
}

/// Resolves template placeholder chains against a [`Fetcher`].
///
/// One composer holds one [`TemplateCache`], so it is scoped to a single
/// render pass: each distinct template url is fetched at most once no matter
/// how many placeholders reference it.
pub struct Composer<'a> {
    fetcher: &'a dyn Fetcher,
    cache: TemplateCache,
}

impl<'a> Composer<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            cache: TemplateCache::new(),
        }
    }

    /// Replace the document's root element with the fully composed template
    /// chain rooted at `root_template`.
    pub async fn resolve(&mut self, doc: &mut Document, root_template: &str) -> Result<()> {
        let root = doc
            .root_element()
            .ok_or_else(|| Error::Parse("document has no root element".into()))?;
        self.resolve_refs(doc, vec![TemplateRef::new(root_template, root, None)])
            .await
    }

    /// Level-by-level worklist resolution. Fetch completion order is
    /// immaterial; substitution effects are applied in pending order, so the
    /// result is deterministic.
    pub async fn resolve_refs(
        &mut self,
        doc: &mut Document,
        mut pending: Vec<TemplateRef>,
    ) -> Result<()> {
        let mut level = 0usize;

        while !pending.is_empty() {
            for reference in &pending {
                if reference.trail.iter().any(|url| *url == reference.url) {
                    return Err(Error::TemplateCycle {
                        url: reference.url.clone(),
                    });
                }
            }

            let urls: Vec<String> = pending.iter().map(|r| r.url.clone()).collect();
            self.cache.fetch_all(self.fetcher, &urls).await?;
            debug!(level, pending = pending.len(), "substituting template level");

            let mut next = Vec::new();
            for reference in pending {
                // fetch_all populated every pending url above
                let Some(text) = self.cache.get(&reference.url) else {
                    continue;
                };

                // Each occurrence parses its own instance: two placeholders
                // sharing a url must not share a mutable tree.
                let fragment = dom::parse_document(text);
                let selected = reference
                    .selector
                    .as_deref()
                    .and_then(|sel| dom::select_first(&fragment, fragment.document(), sel))
                    .or_else(|| fragment.root_element())
                    .ok_or_else(|| {
                        Error::Parse(format!("template has no root element: {}", reference.url))
                    })?;

                let grafted = doc.adopt_from(&fragment, selected);
                doc.replace_with(reference.node, grafted);

                for element in doc.descendants(grafted) {
                    let Some(url) = doc.get_attr(element, TEMPLATE_ATTR) else {
                        continue;
                    };
                    let mut trail = reference.trail.clone();
                    trail.push(reference.url.clone());
                    next.push(TemplateRef {
                        url: url.to_string(),
                        node: element,
                        selector: doc.get_attr(element, SELECTOR_ATTR).map(str::to_string),
                        trail,
                    });
                }
            }

            pending = next;
            level += 1;
        }

        Ok(())
    }
}
