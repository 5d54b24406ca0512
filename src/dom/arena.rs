//! Arena-based document tree.
//!
//! All nodes live in a contiguous vector owned by a [`Document`]; parent,
//! child, and sibling links are indices into that vector. Subtrees are moved
//! by relinking (within one document) or by [`Document::adopt_from`] (across
//! documents), which is how template fragments change ownership during
//! composition.

use html5ever::{LocalName, Namespace, QualName, ns};

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_some(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Pre-extracted id for fast matching.
        id: Option<String>,
        /// Pre-extracted classes for fast matching.
        classes: Vec<String>,
    },
    /// Text content.
    Text(String),
    /// Comment (preserved but inert).
    Comment(String),
    /// Document type declaration.
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// HTML attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// A node in the document tree.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub prev_sibling: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// An ownership-exclusive structural document tree.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    document: NodeId,
}

impl Document {
    /// Create a new empty document with only a document root node.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            document: NodeId::NONE,
        };
        doc.document = doc.alloc(Node::new(NodeData::Document));
        doc
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a new element node from a qualified name and attribute list.
    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        // Pre-extract id and class for fast selector matching
        let mut id = None;
        let mut classes = Vec::new();

        for attr in &attrs {
            if attr.name.local.as_ref() == "id" {
                id = Some(attr.value.clone());
            } else if attr.name.local.as_ref() == "class" {
                classes = attr
                    .value
                    .split_whitespace()
                    .map(|s| s.to_string())
                    .collect();
            }
        }

        self.alloc(Node::new(NodeData::Element {
            name,
            attrs,
            id,
            classes,
        }))
    }

    /// Create an HTML element from a tag name and `(attr, value)` pairs.
    pub fn create_html_element(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let name = QualName::new(None, ns!(html), LocalName::from(tag));
        let attrs = attrs
            .iter()
            .map(|(n, v)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*n)),
                value: (*v).to_string(),
            })
            .collect();
        self.create_element(name, attrs)
    }

    /// Create a new text node.
    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Text(text)))
    }

    /// Create a new comment node.
    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(Node::new(NodeData::Comment(text)))
    }

    /// Create a doctype node.
    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> NodeId {
        self.alloc(Node::new(NodeData::Doctype {
            name,
            public_id,
            system_id,
        }))
    }

    /// Append a child to a parent node, detaching it from any previous parent.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
            child_node.prev_sibling = last_child;
        }

        if last_child.is_some() {
            if let Some(last_node) = self.get_mut(last_child) {
                last_node.next_sibling = child;
            }
        }

        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Insert a node immediately before a sibling, detaching it first.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        self.detach(new_node);

        let parent = self.get(sibling).map(|n| n.parent).unwrap_or(NodeId::NONE);
        let prev = self
            .get(sibling)
            .map(|n| n.prev_sibling)
            .unwrap_or(NodeId::NONE);

        if let Some(new) = self.get_mut(new_node) {
            new.parent = parent;
            new.prev_sibling = prev;
            new.next_sibling = sibling;
        }

        if let Some(sib) = self.get_mut(sibling) {
            sib.prev_sibling = new_node;
        }

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = new_node;
            }
        } else if let Some(par) = self.get_mut(parent) {
            par.first_child = new_node;
        }
    }

    /// Unlink a node from its parent and siblings. The subtree below it stays
    /// intact and can be re-attached elsewhere.
    pub fn detach(&mut self, target: NodeId) {
        let (parent, prev, next) = {
            let node = match self.get(target) {
                Some(n) => n,
                None => return,
            };
            (node.parent, node.prev_sibling, node.next_sibling)
        };

        if prev.is_some() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.first_child = next;
            }
        }

        if next.is_some() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        } else if parent.is_some() {
            if let Some(p) = self.get_mut(parent) {
                p.last_child = prev;
            }
        }

        if let Some(node) = self.get_mut(target) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Replace `old` with `new` in the tree. `old` is detached; its subtree
    /// remains owned by the arena but unreferenced.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        let parent = self.get(old).map(|n| n.parent).unwrap_or(NodeId::NONE);
        if parent.is_none() {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Deep-copy a subtree from another document into this arena, returning
    /// the root of the copy (detached; attach with [`Document::append`] or
    /// friends). This is the cross-document ownership transfer used when a
    /// fetched template fragment is spliced into the page being composed.
    pub fn adopt_from(&mut self, other: &Document, node: NodeId) -> NodeId {
        let data = match other.get(node) {
            Some(n) => n.data.clone(),
            None => return NodeId::NONE,
        };
        let copy = self.alloc(Node::new(data));
        let children: Vec<NodeId> = other.children(node).collect();
        for child in children {
            let child_copy = self.adopt_from(other, child);
            if child_copy.is_some() {
                self.append(copy, child_copy);
            }
        }
        copy
    }

    /// Append text to an existing trailing text node, or create a new one.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child) {
            if let NodeData::Text(ref mut existing) = last.data {
                existing.push_str(text);
                return;
            }
        }

        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Replace a node's children with a single text node.
    pub fn set_text(&mut self, parent: NodeId, text: &str) {
        let children: Vec<NodeId> = self.children(parent).collect();
        for child in children {
            self.detach(child);
        }
        let text_node = self.create_text(text.to_string());
        self.append(parent, text_node);
    }

    /// Iterate over children of a node.
    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self.get(parent).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        ChildrenIter {
            doc: self,
            current: first,
        }
    }

    /// Iterate over all descendants of a node in document order (pre-order
    /// DFS, excluding the node itself).
    pub fn descendants(&self, node: NodeId) -> DescendantsIter<'_> {
        let mut stack: Vec<NodeId> = self.children(node).collect();
        stack.reverse();
        DescendantsIter { doc: self, stack }
    }

    /// Find the first node matching a predicate (document order).
    pub fn find<F>(&self, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        if let Some(root) = self.get(self.document) {
            if predicate(root) {
                return Some(self.document);
            }
        }
        self.descendants(self.document)
            .find(|&id| self.get(id).is_some_and(|n| predicate(n)))
    }

    /// Find the first element with the given tag name.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(|node| {
            if let NodeData::Element { name, .. } = &node.data {
                name.local.as_ref() == tag
            } else {
                false
            }
        })
    }

    /// The document's root element (first element child of the document
    /// node), if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.document).find(|&id| self.is_element(id))
    }

    /// The `<body>` element, if present.
    pub fn body(&self) -> Option<NodeId> {
        self.find_by_tag("body")
    }

    /// The `<head>` element, if present.
    pub fn head(&self) -> Option<NodeId> {
        self.find_by_tag("head")
    }

    /// Number of allocated nodes (including detached ones).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the document holds only its root node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Element accessors.
impl Document {
    /// Get element's local name (tag).
    pub fn element_name(&self, id: NodeId) -> Option<&LocalName> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.local),
            _ => None,
        })
    }

    /// Get element's namespace.
    pub fn element_namespace(&self, id: NodeId) -> Option<&Namespace> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { name, .. } => Some(&name.ns),
            _ => None,
        })
    }

    /// Get an attribute value.
    pub fn get_attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        })
    }

    /// Set (or add) an attribute, keeping the pre-extracted id/class caches
    /// in sync.
    pub fn set_attr(&mut self, id: NodeId, attr_name: &str, value: &str) {
        let Some(node) = self.get_mut(id) else { return };
        let NodeData::Element {
            attrs,
            id: elem_id,
            classes,
            ..
        } = &mut node.data
        else {
            return;
        };

        match attrs.iter_mut().find(|a| a.name.local.as_ref() == attr_name) {
            Some(attr) => attr.value = value.to_string(),
            None => attrs.push(Attribute {
                name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                value: value.to_string(),
            }),
        }

        match attr_name {
            "id" => *elem_id = Some(value.to_string()),
            "class" => {
                *classes = value.split_whitespace().map(|s| s.to_string()).collect();
            }
            _ => {}
        }
    }

    /// Get element's id attribute.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        })
    }

    /// Get element's classes.
    pub fn element_classes(&self, id: NodeId) -> &[String] {
        static EMPTY: &[String] = &[];
        self.get(id)
            .and_then(|n| match &n.data {
                NodeData::Element { classes, .. } => Some(classes.as_slice()),
                _ => None,
            })
            .unwrap_or(EMPTY)
    }

    /// Check if node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Element { .. }))
    }

    /// Check if node is a text node.
    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id)
            .is_some_and(|n| matches!(n.data, NodeData::Text(_)))
    }

    /// Get text content of a text node.
    pub fn text_content(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.data {
            NodeData::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Collect the text of a subtree with normalized whitespace: interior
    /// runs collapse to single spaces, boundary whitespace is preserved as a
    /// single separating space.
    pub fn collect_text(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text_recursive(id, &mut result);
        result
    }

    fn collect_text_recursive(&self, id: NodeId, result: &mut String) {
        if let Some(text) = self.text_content(id) {
            let has_leading = text.starts_with(char::is_whitespace);
            let has_trailing = text.ends_with(char::is_whitespace);
            let words: Vec<&str> = text.split_whitespace().collect();

            if !words.is_empty() {
                if has_leading && !result.is_empty() && !result.ends_with(' ') {
                    result.push(' ');
                }
                result.push_str(&words.join(" "));
                if has_trailing {
                    result.push(' ');
                }
            } else if !text.is_empty() && !result.is_empty() && !result.ends_with(' ') {
                result.push(' ');
            }
            return;
        }

        let mut child = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        while child.is_some() {
            self.collect_text_recursive(child, result);
            child = self.get(child).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        }
    }
}

/// Iterator over children of a node.
pub struct ChildrenIter<'a> {
    doc: &'a Document,
    current: NodeId,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .doc
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Pre-order DFS iterator over a subtree.
pub struct DescendantsIter<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for DescendantsIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let mut children: Vec<NodeId> = self.doc.children(id).collect();
        children.reverse();
        self.stack.extend(children);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_qname(local: &str) -> QualName {
        QualName::new(None, ns!(html), LocalName::from(local))
    }

    #[test]
    fn test_create_elements() {
        let mut doc = Document::new();

        let div = doc.create_html_element("div", &[("id", "main")]);
        doc.append(doc.document(), div);

        assert_eq!(doc.element_name(div).unwrap().as_ref(), "div");
        assert_eq!(doc.element_id(div), Some("main"));
        assert_eq!(doc.root_element(), Some(div));
    }

    #[test]
    fn test_append_children() {
        let mut doc = Document::new();

        let parent = doc.create_element(make_qname("div"), vec![]);
        let child1 = doc.create_element(make_qname("p"), vec![]);
        let child2 = doc.create_element(make_qname("p"), vec![]);

        doc.append(doc.document(), parent);
        doc.append(parent, child1);
        doc.append(parent, child2);

        let children: Vec<_> = doc.children(parent).collect();
        assert_eq!(children, vec![child1, child2]);
    }

    #[test]
    fn test_text_merging() {
        let mut doc = Document::new();

        let p = doc.create_html_element("p", &[]);
        doc.append(doc.document(), p);

        doc.append_text(p, "Hello, ");
        doc.append_text(p, "World!");

        let children: Vec<_> = doc.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(doc.text_content(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_detach_middle_child() {
        let mut doc = Document::new();

        let parent = doc.create_html_element("ul", &[]);
        let a = doc.create_html_element("li", &[]);
        let b = doc.create_html_element("li", &[]);
        let c = doc.create_html_element("li", &[]);
        doc.append(doc.document(), parent);
        doc.append(parent, a);
        doc.append(parent, b);
        doc.append(parent, c);

        doc.detach(b);

        let children: Vec<_> = doc.children(parent).collect();
        assert_eq!(children, vec![a, c]);
        assert!(doc.get(b).unwrap().parent.is_none());
    }

    #[test]
    fn test_replace_with() {
        let mut doc = Document::new();

        let parent = doc.create_html_element("div", &[]);
        let old = doc.create_html_element("span", &[]);
        let new = doc.create_html_element("em", &[]);
        doc.append(doc.document(), parent);
        doc.append(parent, old);

        doc.replace_with(old, new);

        let children: Vec<_> = doc.children(parent).collect();
        assert_eq!(children, vec![new]);
        assert!(doc.get(old).unwrap().parent.is_none());
    }

    #[test]
    fn test_append_relocates() {
        let mut doc = Document::new();

        let first = doc.create_html_element("div", &[]);
        let second = doc.create_html_element("div", &[]);
        let child = doc.create_html_element("p", &[]);
        doc.append(doc.document(), first);
        doc.append(doc.document(), second);
        doc.append(first, child);

        doc.append(second, child);

        assert_eq!(doc.children(first).count(), 0);
        assert_eq!(doc.children(second).collect::<Vec<_>>(), vec![child]);
    }

    #[test]
    fn test_adopt_from() {
        let mut src = Document::new();
        let div = src.create_html_element("div", &[("class", "box")]);
        let p = src.create_html_element("p", &[]);
        src.append(src.document(), div);
        src.append(div, p);
        src.append_text(p, "content");

        let mut dst = Document::new();
        let copy = dst.adopt_from(&src, div);
        dst.append(dst.document(), copy);

        assert_eq!(dst.element_name(copy).unwrap().as_ref(), "div");
        assert_eq!(dst.element_classes(copy), ["box".to_string()]);
        assert_eq!(dst.collect_text(copy), "content");
        // The source is untouched
        assert_eq!(src.collect_text(div), "content");
    }

    #[test]
    fn test_set_attr_updates_caches() {
        let mut doc = Document::new();
        let div = doc.create_html_element("div", &[]);

        doc.set_attr(div, "class", "a b");
        doc.set_attr(div, "id", "x");
        doc.set_attr(div, "class", "c");

        assert_eq!(doc.get_attr(div, "class"), Some("c"));
        assert_eq!(doc.element_classes(div), ["c".to_string()]);
        assert_eq!(doc.element_id(div), Some("x"));
    }

    #[test]
    fn test_collect_text_normalizes() {
        let mut doc = Document::new();
        let p = doc.create_html_element("p", &[]);
        let em = doc.create_html_element("em", &[]);
        doc.append(doc.document(), p);
        doc.append_text(p, "  Hello \n ");
        doc.append(p, em);
        doc.append_text(em, "big   world");

        assert_eq!(doc.collect_text(p), "Hello big world");
    }

    #[test]
    fn test_descendants_document_order() {
        let mut doc = Document::new();
        let div = doc.create_html_element("div", &[]);
        let p1 = doc.create_html_element("p", &[]);
        let em = doc.create_html_element("em", &[]);
        let p2 = doc.create_html_element("p", &[]);
        doc.append(doc.document(), div);
        doc.append(div, p1);
        doc.append(p1, em);
        doc.append(div, p2);

        let order: Vec<_> = doc.descendants(doc.document()).collect();
        assert_eq!(order, vec![div, p1, em, p2]);
    }
}
