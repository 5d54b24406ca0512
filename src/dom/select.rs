//! selectors-crate integration for [`Document`].
//!
//! Template markers and config targets address elements with ordinary CSS
//! selectors; this module provides the `Element` implementation plus the
//! [`select_first`]/[`select_all`] entry points used by the composer and the
//! page pipeline.

use std::fmt;

use html5ever::{LocalName, Namespace};
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::context::{MatchingContext, QuirksMode, SelectorCaches};
use selectors::matching::{
    ElementSelectorFlags, MatchingForInvalidation, MatchingMode, NeedsSelectorFlags,
    matches_selector,
};
use selectors::parser::SelectorParseErrorKind;
use selectors::{OpaqueElement, SelectorImpl};

use super::arena::{Document, NodeData, NodeId};

/// Our selector implementation for the selectors crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolioSelectors;

/// Identifier string type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Ident(pub String);

impl precomputed_hash::PrecomputedHash for Ident {
    fn precomputed_hash(&self) -> u32 {
        let mut h: u32 = 0;
        for byte in self.0.bytes() {
            h = h.wrapping_mul(31).wrapping_add(byte as u32);
        }
        h
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Ident {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'a> From<&'a str> for Ident {
    fn from(s: &'a str) -> Self {
        Self(s.to_string())
    }
}

impl cssparser::ToCss for Ident {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(&self.0)
    }
}

/// Wrapper type for LocalName that implements ToCss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CssLocalName(pub LocalName);

impl precomputed_hash::PrecomputedHash for CssLocalName {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl cssparser::ToCss for CssLocalName {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(self.0.as_ref())
    }
}

impl From<String> for CssLocalName {
    fn from(s: String) -> Self {
        Self(LocalName::from(s))
    }
}

impl<'a> From<&'a str> for CssLocalName {
    fn from(s: &'a str) -> Self {
        Self(LocalName::from(s))
    }
}

impl AsRef<str> for CssLocalName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

/// Wrapper type for Namespace that implements ToCss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CssNamespace(pub Namespace);

impl precomputed_hash::PrecomputedHash for CssNamespace {
    fn precomputed_hash(&self) -> u32 {
        self.0.precomputed_hash()
    }
}

impl cssparser::ToCss for CssNamespace {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(self.0.as_ref())
    }
}

impl From<String> for CssNamespace {
    fn from(s: String) -> Self {
        Self(Namespace::from(s))
    }
}

impl<'a> From<&'a str> for CssNamespace {
    fn from(s: &'a str) -> Self {
        Self(Namespace::from(s))
    }
}

/// Pseudo-element type. Static documents have none, so selectors using one
/// simply fail to parse and the caller falls back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoElement {}

impl cssparser::ToCss for PseudoElement {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl selectors::parser::PseudoElement for PseudoElement {
    type Impl = FolioSelectors;

    fn accepts_state_pseudo_classes(&self) -> bool {
        match *self {}
    }

    fn valid_after_slotted(&self) -> bool {
        match *self {}
    }
}

/// Non-tree-structural pseudo-class type. None are supported in a static
/// document context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NonTSPseudoClass {}

impl selectors::parser::NonTSPseudoClass for NonTSPseudoClass {
    type Impl = FolioSelectors;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl cssparser::ToCss for NonTSPseudoClass {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl<'i> selectors::parser::Parser<'i> for FolioSelectors {
    type Impl = FolioSelectors;
    type Error = SelectorParseErrorKind<'i>;
}

impl SelectorImpl for FolioSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = Ident;
    type Identifier = Ident;
    type LocalName = CssLocalName;
    type NamespaceUrl = CssNamespace;
    type NamespacePrefix = Ident;
    type BorrowedLocalName = CssLocalName;
    type BorrowedNamespaceUrl = CssNamespace;
    type NonTSPseudoClass = NonTSPseudoClass;
    type PseudoElement = PseudoElement;
}

/// Reference to an element in a [`Document`] for selector matching.
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    pub doc: &'a Document,
    pub id: NodeId,
}

impl<'a> ElementRef<'a> {
    pub fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }
}

impl fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.doc.element_name(self.id))
            .finish()
    }
}

impl<'a> selectors::Element for ElementRef<'a> {
    type Impl = FolioSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self)
    }

    fn parent_element(&self) -> Option<Self> {
        let node = self.doc.get(self.id)?;
        if node.parent.is_none() {
            return None;
        }
        if self.doc.is_element(node.parent) {
            Some(Self::new(self.doc, node.parent))
        } else {
            None
        }
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        let node = self.doc.get(self.id)?;
        let mut current = node.prev_sibling;
        while current.is_some() {
            if self.doc.is_element(current) {
                return Some(Self::new(self.doc, current));
            }
            current = self.doc.get(current)?.prev_sibling;
        }
        None
    }

    fn next_sibling_element(&self) -> Option<Self> {
        let node = self.doc.get(self.id)?;
        let mut current = node.next_sibling;
        while current.is_some() {
            if self.doc.is_element(current) {
                return Some(Self::new(self.doc, current));
            }
            current = self.doc.get(current)?.next_sibling;
        }
        None
    }

    fn first_element_child(&self) -> Option<Self> {
        self.doc
            .children(self.id)
            .find(|&child| self.doc.is_element(child))
            .map(|child| Self::new(self.doc, child))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssLocalName) -> bool {
        self.doc
            .element_name(self.id)
            .is_some_and(|n| n == &name.0)
    }

    fn has_namespace(&self, ns: &CssNamespace) -> bool {
        self.doc
            .element_namespace(self.id)
            .is_some_and(|n| n == &ns.0)
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.doc.element_name(self.id) == other.doc.element_name(other.id)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&CssNamespace>,
        local_name: &CssLocalName,
        operation: &AttrSelectorOperation<&Ident>,
    ) -> bool {
        let node = match self.doc.get(self.id) {
            Some(n) => n,
            None => return false,
        };

        let attrs = match &node.data {
            NodeData::Element { attrs, .. } => attrs,
            _ => return false,
        };

        for attr in attrs {
            let ns_match = match ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(ns) => attr.name.ns == ns.0,
            };
            if !ns_match || attr.name.local != local_name.0 {
                continue;
            }
            return operation.eval_str(&attr.value);
        }
        false
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &NonTSPseudoClass,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match *pc {}
    }

    fn match_pseudo_element(
        &self,
        pe: &PseudoElement,
        _context: &mut MatchingContext<'_, Self::Impl>,
    ) -> bool {
        match *pe {}
    }

    fn is_link(&self) -> bool {
        let is_anchor = self
            .doc
            .element_name(self.id)
            .is_some_and(|n| n.as_ref() == "a");
        is_anchor && self.doc.get_attr(self.id, "href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &Ident, case_sensitivity: CaseSensitivity) -> bool {
        match self.doc.element_id(self.id) {
            Some(elem_id) => case_sensitivity.eq(elem_id.as_bytes(), id.0.as_bytes()),
            None => false,
        }
    }

    fn has_class(&self, name: &Ident, case_sensitivity: CaseSensitivity) -> bool {
        self.doc
            .element_classes(self.id)
            .iter()
            .any(|c| case_sensitivity.eq(c.as_bytes(), name.0.as_bytes()))
    }

    fn imported_part(&self, _name: &Ident) -> Option<Ident> {
        None
    }

    fn is_part(&self, _name: &Ident) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        for child in self.doc.children(self.id) {
            let node = match self.doc.get(child) {
                Some(n) => n,
                None => continue,
            };
            match &node.data {
                NodeData::Element { .. } => return false,
                NodeData::Text(t) if !t.trim().is_empty() => return false,
                _ => {}
            }
        }
        true
    }

    fn is_root(&self) -> bool {
        let parent = self.doc.get(self.id).map(|n| n.parent);
        if let Some(parent) = parent
            && let Some(parent_node) = self.doc.get(parent)
        {
            return matches!(parent_node.data, NodeData::Document);
        }
        false
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn add_element_unique_hashes(&self, _filter: &mut selectors::bloom::BloomFilter) -> bool {
        false
    }

    fn has_custom_state(&self, _name: &Ident) -> bool {
        false
    }
}

/// Parse a selector string. Returns `None` on invalid input; callers treat
/// that the same as "matched nothing" and fall back.
pub fn parse_selector(input: &str) -> Option<selectors::parser::Selector<FolioSelectors>> {
    let mut parser_input = cssparser::ParserInput::new(input);
    let mut parser = cssparser::Parser::new(&mut parser_input);
    match selectors::parser::Selector::parse(&FolioSelectors, &mut parser) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::debug!(selector = input, ?err, "ignoring unparsable selector");
            None
        }
    }
}

/// Find the first descendant of `scope` matching `selector`, in document
/// order. Invalid selectors match nothing.
pub fn select_first(doc: &Document, scope: NodeId, selector: &str) -> Option<NodeId> {
    let selector = parse_selector(selector)?;
    let mut caches = SelectorCaches::default();
    let mut context = MatchingContext::new(
        MatchingMode::Normal,
        None,
        &mut caches,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        MatchingForInvalidation::No,
    );

    doc.descendants(scope)
        .filter(|&id| doc.is_element(id))
        .find(|&id| {
            matches_selector(
                &selector,
                0,
                None,
                &ElementRef::new(doc, id),
                &mut context,
            )
        })
}

/// Find all descendants of `scope` matching `selector`, in document order.
pub fn select_all(doc: &Document, scope: NodeId, selector: &str) -> Vec<NodeId> {
    let Some(selector) = parse_selector(selector) else {
        return Vec::new();
    };
    let mut caches = SelectorCaches::default();
    let mut context = MatchingContext::new(
        MatchingMode::Normal,
        None,
        &mut caches,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        MatchingForInvalidation::No,
    );

    doc.descendants(scope)
        .filter(|&id| doc.is_element(id))
        .filter(|&id| {
            matches_selector(
                &selector,
                0,
                None,
                &ElementRef::new(doc, id),
                &mut context,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_document;

    #[test]
    fn test_tag_selector() {
        let doc = parse_document("<div><p>Hello</p></div>");
        let p = doc.find_by_tag("p").unwrap();

        assert_eq!(select_first(&doc, doc.document(), "p"), Some(p));
        assert_eq!(select_first(&doc, p, "p"), None);
    }

    #[test]
    fn test_class_selector() {
        let doc = parse_document(r#"<p class="intro highlight">Hello</p>"#);
        let p = doc.find_by_tag("p").unwrap();

        assert_eq!(select_first(&doc, doc.document(), ".intro"), Some(p));
        assert_eq!(select_first(&doc, doc.document(), "p.highlight"), Some(p));
        assert_eq!(select_first(&doc, doc.document(), ".missing"), None);
    }

    #[test]
    fn test_id_selector() {
        let doc = parse_document(r#"<p id="main">Hello</p>"#);
        let p = doc.find_by_tag("p").unwrap();

        assert_eq!(select_first(&doc, doc.document(), "#main"), Some(p));
        assert_eq!(select_first(&doc, doc.document(), "p#main"), Some(p));
        assert_eq!(select_first(&doc, doc.document(), "#other"), None);
    }

    #[test]
    fn test_descendant_and_child_selectors() {
        let doc = parse_document("<div><span><p>Hello</p></span></div>");
        let p = doc.find_by_tag("p").unwrap();

        assert_eq!(select_first(&doc, doc.document(), "div p"), Some(p));
        assert_eq!(select_first(&doc, doc.document(), "span > p"), Some(p));
        assert_eq!(select_first(&doc, doc.document(), "div > p"), None);
    }

    #[test]
    fn test_attribute_selector() {
        let doc = parse_document(r#"<section folio-template="nav.html">x</section>"#);
        let section = doc.find_by_tag("section").unwrap();

        assert_eq!(
            select_first(&doc, doc.document(), "[folio-template]"),
            Some(section)
        );
        assert_eq!(
            select_first(&doc, doc.document(), r#"[folio-template="nav.html"]"#),
            Some(section)
        );
    }

    #[test]
    fn test_select_all_document_order() {
        let doc = parse_document("<ul><li>a</li><li>b</li></ul><p><li>c</li></p>");
        let all = select_all(&doc, doc.document(), "li");
        assert_eq!(all.len(), 3);
        let texts: Vec<String> = all.iter().map(|&id| doc.collect_text(id)).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = parse_document("<p>Hello</p>");
        assert_eq!(select_first(&doc, doc.document(), "p:::"), None);
        assert!(select_all(&doc, doc.document(), "[").is_empty());
    }
}
