//! Page rendering pipeline.
//!
//! [`Site`] is the composition root: it owns the site configuration and the
//! fetcher and is passed explicitly to everything that needs them. A render
//! fetches the page's markdown, resolves front matter, parses the body,
//! composes the template chain, and finishes the tree with TOC structures,
//! metadata, re-activated scripts, and image captions.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::compose::Composer;
use crate::config::{PageConfig, SiteConfig, split_front_matter};
use crate::dom::{self, Document, NodeData, NodeId};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::markdown;
use crate::toc::{TOC_ATTR, Toc};

/// A site: configuration plus the fetcher used for content and templates.
pub struct Site {
    config: SiteConfig,
    fetcher: Arc<dyn Fetcher>,
}

/// Result of rendering one page.
#[derive(Debug)]
pub struct RenderedPage {
    /// The fully composed document, ready to serialize or inject.
    pub document: Document,
    /// The effective page configuration (front matter over site defaults).
    pub config: PageConfig,
}

impl Site {
    pub fn new(config: SiteConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Map a page path to its markdown document url: `{path}.md`, with a
    /// trailing slash (or empty path) mapping to `index.md`.
    pub fn content_url(path: &str) -> String {
        if path.is_empty() || path.ends_with('/') {
            format!("{path}index.md")
        } else {
            format!("{path}.md")
        }
    }

    /// Render the page at `path` into a finished document tree.
    pub async fn render(&self, path: &str) -> Result<RenderedPage> {
        let url = Self::content_url(path);
        debug!(%url, "fetching content");
        let md = self.fetcher.fetch(&url).await?;

        let (front_matter, body) = split_front_matter(&md);
        let config = PageConfig::resolve(&self.config, front_matter)?;

        let html = markdown::to_html(body);
        let mut content = dom::parse_document(&html);
        let content_body = content
            .body()
            .ok_or_else(|| Error::Parse(format!("content document has no body: {url}")))?;

        caption_images(&mut content, content_body);
        let toc = Toc::scan(&mut content, content_body);

        let mut document = match &config.template {
            Some(template) => {
                debug!(%template, "composing template chain");
                let mut host = dom::parse_document("");
                let mut composer = Composer::new(self.fetcher.as_ref());
                composer.resolve(&mut host, template).await?;

                match &config.target {
                    Some(selector) => {
                        inject_content(&mut host, selector, &content, content_body);
                        host
                    }
                    None => {
                        warn!("template configured without target; content replaces the composed page");
                        content
                    }
                }
            }
            // No configured template just means no composition is needed.
            None => content,
        };

        apply_toc_placeholders(&mut document, &toc);
        inject_title(&mut document, &config.full_title());
        if let Some(description) = &config.description {
            inject_description(&mut document, description.trim());
        }
        refresh_scripts(&mut document);

        Ok(RenderedPage { document, config })
    }
}

/// Move the content body's children into the host's target element
/// (fallback `body`), clearing whatever the template put there.
fn inject_content(host: &mut Document, selector: &str, content: &Document, content_body: NodeId) {
    let target = dom::select_first(host, host.document(), selector)
        .or_else(|| host.body())
        .or_else(|| host.root_element());
    let Some(target) = target else {
        warn!(selector, "no target element in composed page; content dropped");
        return;
    };

    let old: Vec<NodeId> = host.children(target).collect();
    for child in old {
        host.detach(child);
    }
    let children: Vec<NodeId> = content.children(content_body).collect();
    for child in children {
        let copy = host.adopt_from(content, child);
        host.append(target, copy);
    }
}

/// Replace `[folio-toc]` placeholders with generated structures; a
/// placeholder whose depth excludes every heading is removed entirely.
fn apply_toc_placeholders(doc: &mut Document, toc: &Toc) {
    let placeholders = dom::select_all(doc, doc.document(), &format!("[{TOC_ATTR}]"));
    for placeholder in placeholders {
        let max_level = doc
            .get_attr(placeholder, TOC_ATTR)
            .and_then(|value| value.trim().parse::<u8>().ok())
            .filter(|level| (1..=6).contains(level))
            .unwrap_or(6);

        match toc.build(doc, max_level) {
            Some(list) => doc.replace_with(placeholder, list),
            None => {
                debug!(max_level, "no headings within depth; removing TOC placeholder");
                doc.detach(placeholder);
            }
        }
    }
}

/// Set the document title, creating the `title` element when the template
/// chain did not provide one.
fn inject_title(doc: &mut Document, title: &str) {
    let title_node = match doc.find_by_tag("title") {
        Some(node) => node,
        None => {
            let node = doc.create_html_element("title", &[]);
            if let Some(parent) = doc.head().or_else(|| doc.root_element()) {
                doc.append(parent, node);
            }
            node
        }
    };
    doc.set_text(title_node, title);
}

/// Set `meta[name="description"]`, creating it in `head` when missing.
fn inject_description(doc: &mut Document, description: &str) {
    let meta = match dom::select_first(doc, doc.document(), r#"meta[name="description"]"#) {
        Some(node) => node,
        None => {
            let node = doc.create_html_element("meta", &[("name", "description")]);
            if let Some(parent) = doc.head().or_else(|| doc.root_element()) {
                doc.append(parent, node);
            }
            node
        }
    };
    doc.set_attr(meta, "content", description);
}

/// Replace every script element with a freshly created equivalent (same
/// attributes, same content). Injected scripts are inert in a live DOM until
/// recreated this way.
fn refresh_scripts(doc: &mut Document) {
    let scripts = dom::select_all(doc, doc.document(), "script");
    for script in scripts {
        let (name, attrs) = match doc.get(script).map(|n| &n.data) {
            Some(NodeData::Element { name, attrs, .. }) => (name.clone(), attrs.clone()),
            _ => continue,
        };
        let replacement = doc.create_element(name, attrs);
        let children: Vec<NodeId> = doc.children(script).collect();
        for child in children {
            doc.append(replacement, child);
        }
        doc.replace_with(script, replacement);
    }
}

/// Wrap a paragraph consisting solely of a titled image into a
/// `figure`/`figcaption` pair.
fn caption_images(doc: &mut Document, root: NodeId) {
    let images = dom::select_all(doc, root, "p > img[title]");
    for img in images {
        let Some(paragraph) = doc.get(img).map(|n| n.parent) else {
            continue;
        };
        let alone = doc.children(paragraph).all(|child| {
            child == img
                || doc
                    .text_content(child)
                    .is_some_and(|text| text.trim().is_empty())
        });
        let title = doc.get_attr(img, "title").unwrap_or("").trim().to_string();
        if !alone || title.is_empty() {
            continue;
        }

        let figure = doc.create_html_element("figure", &[]);
        let caption = doc.create_html_element("figcaption", &[]);
        doc.append_text(caption, &title);
        doc.replace_with(paragraph, figure);
        doc.append(figure, img);
        doc.append(figure, caption);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_document, serialize_node};

    #[test]
    fn test_content_url_mapping() {
        assert_eq!(Site::content_url("/docs/guide"), "/docs/guide.md");
        assert_eq!(Site::content_url("/docs/"), "/docs/index.md");
        assert_eq!(Site::content_url("/"), "/index.md");
        assert_eq!(Site::content_url(""), "index.md");
    }

    #[test]
    fn test_inject_title_creates_missing() {
        let mut doc = parse_document("<html><head></head><body></body></html>");
        inject_title(&mut doc, "My Page");
        let title = doc.find_by_tag("title").expect("title created");
        assert_eq!(doc.collect_text(title), "My Page");
        assert_eq!(doc.get(title).unwrap().parent, doc.head().unwrap());
    }

    #[test]
    fn test_inject_title_replaces_existing() {
        let mut doc = parse_document("<head><title>Old</title></head><body></body>");
        inject_title(&mut doc, "New");
        let title = doc.find_by_tag("title").unwrap();
        assert_eq!(doc.collect_text(title), "New");
    }

    #[test]
    fn test_inject_description() {
        let mut doc = parse_document("<head></head><body></body>");
        inject_description(&mut doc, "About this page");
        let meta = doc.find_by_tag("meta").expect("meta created");
        assert_eq!(doc.get_attr(meta, "name"), Some("description"));
        assert_eq!(doc.get_attr(meta, "content"), Some("About this page"));

        inject_description(&mut doc, "Updated");
        assert_eq!(doc.get_attr(meta, "content"), Some("Updated"));
        assert_eq!(dom::select_all(&doc, doc.document(), "meta").len(), 1);
    }

    #[test]
    fn test_refresh_scripts_recreates_nodes() {
        let mut doc = parse_document(r#"<body><script src="app.js">boot();</script></body>"#);
        let before = doc.find_by_tag("script").unwrap();
        refresh_scripts(&mut doc);
        let after = doc.find_by_tag("script").unwrap();

        assert_ne!(before, after);
        assert_eq!(doc.get_attr(after, "src"), Some("app.js"));
        assert_eq!(doc.collect_text(after), "boot();");
    }

    #[test]
    fn test_caption_images_wraps_sole_titled_image() {
        let mut doc = parse_document(r#"<body><p><img src="x.png" title="A caption"></p></body>"#);
        let body = doc.body().unwrap();
        caption_images(&mut doc, body);

        let figure = doc.find_by_tag("figure").expect("figure");
        assert_eq!(
            serialize_node(&doc, figure),
            r#"<figure><img src="x.png" title="A caption"><figcaption>A caption</figcaption></figure>"#
        );
        assert!(doc.find_by_tag("p").is_none());
    }

    #[test]
    fn test_caption_images_leaves_inline_images() {
        let mut doc =
            parse_document(r#"<body><p>text <img src="x.png" title="cap"> more</p></body>"#);
        let body = doc.body().unwrap();
        caption_images(&mut doc, body);
        assert!(doc.find_by_tag("figure").is_none());
    }

    #[test]
    fn test_apply_toc_placeholder_default_depth() {
        let mut doc = parse_document(
            r#"<body><div folio-toc="not-a-number"></div><h1>A</h1><h2>B</h2></body>"#,
        );
        let body = doc.body().unwrap();
        let toc = Toc::scan(&mut doc, body);
        apply_toc_placeholders(&mut doc, &toc);

        let ol = doc.find_by_tag("ol").expect("toc list inserted");
        let html = serialize_node(&doc, ol);
        assert!(html.contains("#a") && html.contains("#b"));
        assert!(dom::select_first(&doc, doc.document(), "[folio-toc]").is_none());
    }

    #[test]
    fn test_apply_toc_placeholder_removed_when_empty() {
        let mut doc = parse_document(r#"<body><div folio-toc="1"></div><h3>Deep only</h3></body>"#);
        let body = doc.body().unwrap();
        let toc = Toc::scan(&mut doc, body);
        apply_toc_placeholders(&mut doc, &toc);

        assert!(dom::select_first(&doc, doc.document(), "div").is_none());
        assert!(doc.find_by_tag("ol").is_none());
    }
}
